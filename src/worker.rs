//! The worker pool: a fixed set of threads draining the work queue and
//! running application logic against whatever session they popped. Each
//! worker locks the session, runs its queued requests, and decides whether
//! to requeue it immediately or hand it back to the reactor with a
//! notification.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{error, warn};

use crate::notify::{Notification, NotificationKind, NotifySender};
use crate::queue::WorkQueue;
use crate::reactor::WorkItem;
use crate::session::{HandlerStatus, ProtocolHandler};
use crate::stats::WorkerStats;

/// A fixed-size pool of threads, each running `while let Some(item) =
/// queue.pop() { process(item) }` until the queue is shut down.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl WorkerPool {
    /// Launches `n` threads draining `queue` and notifying the reactor
    /// through `notify` as each session's request batch is decided.
    pub fn start<H>(n: usize, queue: Arc<WorkQueue<WorkItem<H>>>, notify: NotifySender) -> Self
    where
        H: ProtocolHandler + 'static,
    {
        let stats = Arc::new(WorkerStats::default());
        let handles = (0..n)
            .map(|id| {
                let queue = queue.clone();
                let notify = notify.clone();
                let stats = stats.clone();
                thread::Builder::new()
                    .name(format!("switchboard-worker-{id}"))
                    .spawn(move || run(queue, notify, stats))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self { handles, stats }
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        self.stats.clone()
    }

    /// Waits for every worker to exit. Workers exit once the queue has been
    /// shut down and drained; call `queue.shutdown()` before this.
    pub fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.join() {
                error!(?e, "worker thread panicked");
            }
        }
    }
}

fn run<H>(queue: Arc<WorkQueue<WorkItem<H>>>, notify: NotifySender, stats: Arc<WorkerStats>)
where
    H: ProtocolHandler + 'static,
{
    while let Some((session_id, session)) = queue.pop() {
        let decision = {
            let mut session = session.lock().unwrap();
            let mut last_status = HandlerStatus::Ok;
            let mut processed = 0u64;

            while let Some(request) = session.next_request() {
                last_status = session.process_one(request);
                processed += 1;
                if last_status != HandlerStatus::Ok {
                    break;
                }
            }
            stats.processed_count.fetch_add(processed, Ordering::Relaxed);

            if session.is_failed() || session.has_no_more_requests() || last_status != HandlerStatus::Ok {
                if last_status == HandlerStatus::IncompleteSend {
                    Decision::Notify(NotificationKind::MoreData)
                } else {
                    Decision::Notify(NotificationKind::SessionReleased)
                }
            } else {
                Decision::Requeue
            }
        };

        match decision {
            Decision::Requeue => queue.push((session_id, session)),
            Decision::Notify(kind) => {
                if let Err(e) = notify.send(Notification { kind, session: session_id }) {
                    warn!(error = %e, "failed to notify reactor");
                }
            }
        }
    }
}

enum Decision {
    Requeue,
    Notify(NotificationKind),
}
