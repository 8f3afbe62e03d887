//! Blocking test harness: runs a `Reactor<H>` plus `WorkerPool` on background
//! threads bound to an OS-assigned port, and hands the test a plain
//! `std::net::TcpStream` to drive it.
//!
//! `Drop` follows the caller-responsibility ordering: workers drain and
//! join before the reactor is told to stop, so a response already handed to
//! a worker is still flushed to the socket before teardown completes.

use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use switchboard::queue::WorkQueue;
use switchboard::reactor::{Reactor, WorkItem};
use switchboard::session::ProtocolHandler;
use switchboard::stats::{ReactorStats, WorkerStats};
use switchboard::worker::WorkerPool;

const MAX_SLOTS: usize = 64;

pub struct TestServer<H: ProtocolHandler + 'static> {
    pub port: u16,
    pub stats: Arc<ReactorStats>,
    pub worker_stats: Arc<WorkerStats>,
    stop: Arc<AtomicBool>,
    work_queue: Arc<WorkQueue<WorkItem<H>>>,
    workers: Option<WorkerPool>,
    reactor_thread: Option<JoinHandle<()>>,
}

impl<H: ProtocolHandler + 'static> TestServer<H> {
    /// Binds port `0` (OS-assigned) and runs the reactor plus `n` workers on
    /// background threads until dropped.
    pub fn start(n_workers: usize, factory: impl Fn() -> H + Send + Sync + 'static) -> Self {
        let mut reactor: Reactor<H> = Reactor::init(MAX_SLOTS).expect("reactor init");
        let token = reactor
            .start_listen("test", "127.0.0.1", 0, Arc::new(factory))
            .expect("start_listen");
        let port = reactor
            .listener_local_addr(token)
            .expect("listener bound")
            .port();

        let stats = reactor.stats();
        let stop = reactor.stop_flag();
        let work_queue = reactor.work_queue();
        let workers = WorkerPool::start(n_workers, work_queue.clone(), reactor.pipe_write_fd());
        let worker_stats = workers.stats();

        let reactor_thread = thread::spawn(move || {
            reactor.run(20).expect("reactor run");
        });

        Self {
            port,
            stats,
            worker_stats,
            stop,
            work_queue,
            workers: Some(workers),
            reactor_thread: Some(reactor_thread),
        }
    }

    pub fn connect(&self) -> TcpStream {
        for _ in 0..50 {
            if let Ok(stream) = TcpStream::connect(("127.0.0.1", self.port)) {
                stream.set_nodelay(true).unwrap();
                return stream;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("failed to connect to test server on port {}", self.port);
    }
}

impl<H: ProtocolHandler + 'static> Drop for TestServer<H> {
    fn drop(&mut self) {
        // Workers drain and join first, while the reactor is still running
        // to flush whatever they hand back; only then does the reactor stop.
        self.work_queue.shutdown();
        if let Some(workers) = self.workers.take() {
            workers.join();
        }
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reactor_thread.take() {
            let _ = handle.join();
        }
    }
}
