//! The reactor: a single I/O thread owning every socket, multiplexed
//! through `mio`'s readiness facility, with listeners, connectors, and
//! connections kept in a `Slab`-keyed handle table. Sessions are shared
//! with worker threads via an `Arc<Mutex<_>>` per session rather than
//! field-level synchronization, so a session can be read from and written
//! to by whichever thread currently holds it.

use std::io::{self, ErrorKind, Read, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mio::{Events, Interest, Poll, Token};
use slab::Slab;
use tracing::{debug, error, warn};

use crate::error::{FatalError, StartupError};
use crate::handle::{SessionId, SessionTable};
use crate::net::{TcpListener as _, TcpStream as _};
use crate::notify::{self, NotificationKind, NotifyReceiver, NotifySender};
use crate::queue::WorkQueue;
use crate::session::{ProtocolHandler, Session, SessionState};
use crate::stats::ReactorStats;

const NOTIFY_TOKEN: Token = Token(usize::MAX);

/// Batch size for one `NotifyPipe` drain per `NotifyPipeEnd` readiness
/// event; amortizes syscalls without letting one bursty worker starve other
/// bookkeeping in the same `step`.
const NOTIFY_BATCH: usize = 256;

/// How many bytes the read pump asks for per `reserve` call.
const READ_CHUNK: usize = 8192;

type SessionFactory<H> = Arc<dyn Fn() -> H + Send + Sync>;

/// A session plus its id, handed to a worker through the work queue. The
/// worker needs the id only to name itself in notifications; it never
/// consults the reactor's session table directly.
pub type WorkItem<H> = (SessionId, Arc<Mutex<Session<H>>>);

enum HandleSlot<H: ProtocolHandler> {
    Listener {
        inner: mio::net::TcpListener,
        factory: SessionFactory<H>,
        #[allow(dead_code)]
        name: String,
    },
    Connector {
        inner: mio::net::TcpStream,
        factory: SessionFactory<H>,
        #[allow(dead_code)]
        name: String,
    },
    Connection {
        stream: mio::net::TcpStream,
        session_id: SessionId,
        session: Arc<Mutex<Session<H>>>,
        interest: Interest,
        dead: bool,
    },
}

/// Owns the readiness facility, the handle table, the session table, and
/// the notify pipe. Runs entirely on one thread.
pub struct Reactor<H: ProtocolHandler> {
    poll: Poll,
    handles: Slab<HandleSlot<H>>,
    sessions: SessionTable<Arc<Mutex<Session<H>>>>,
    notify_tx: NotifySender,
    notify_rx: NotifyReceiver,
    work_queue: Arc<WorkQueue<WorkItem<H>>>,
    stats: Arc<ReactorStats>,
    stopping: Arc<AtomicBool>,
    max_slots: usize,
}

fn resolve_bind_addr(bind_ip: &str, port: u16) -> Result<SocketAddr, StartupError> {
    let host = if bind_ip.is_empty() || bind_ip == "*" {
        "0.0.0.0"
    } else {
        bind_ip
    };
    format!("{host}:{port}")
        .parse()
        .map_err(|_| StartupError::InvalidAddress(format!("{host}:{port}")))
}

impl<H: ProtocolHandler + 'static> Reactor<H> {
    /// Creates the readiness facility and the notify pipe, and registers
    /// the pipe's read end for read interest.
    pub fn init(max_slots: usize) -> Result<Self, StartupError> {
        let poll = Poll::new().map_err(StartupError::Registration)?;
        let (notify_tx, mut notify_rx) = notify::notify_pipe().map_err(StartupError::Registration)?;
        poll.registry()
            .register(notify_rx.inner_mut(), NOTIFY_TOKEN, Interest::READABLE)
            .map_err(StartupError::Registration)?;

        let stats = Arc::new(ReactorStats::default());
        stats.pipes_count.fetch_add(1, Ordering::Relaxed);

        Ok(Self {
            poll,
            handles: Slab::with_capacity(max_slots),
            sessions: SessionTable::new(),
            notify_tx,
            notify_rx,
            work_queue: Arc::new(WorkQueue::new()),
            stats,
            stopping: Arc::new(AtomicBool::new(false)),
            max_slots,
        })
    }

    pub fn work_queue(&self) -> Arc<WorkQueue<WorkItem<H>>> {
        self.work_queue.clone()
    }

    /// The local address a listener handle is bound to. Useful for tests
    /// that bind port `0` and need the OS-assigned port back.
    pub fn listener_local_addr(&self, token: Token) -> Option<SocketAddr> {
        match self.handles.get(token.0) {
            Some(HandleSlot::Listener { inner, .. }) => inner.local_addr().ok(),
            _ => None,
        }
    }

    pub fn stats(&self) -> Arc<ReactorStats> {
        self.stats.clone()
    }

    /// A clone of the notify pipe's write end, for the worker pool to hold.
    pub fn pipe_write_fd(&self) -> NotifySender {
        self.notify_tx.clone()
    }

    /// An atomic flag the worker pool (or any thread) can use to trigger
    /// shutdown via `stop`, without holding a reference to the reactor.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stopping.clone()
    }

    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    /// Binds a listening socket and registers it for read interest.
    /// `bind_ip` of `""` or `"*"` binds `0.0.0.0`.
    pub fn start_listen(
        &mut self,
        name: &str,
        bind_ip: &str,
        port: u16,
        session_factory: SessionFactory<H>,
    ) -> Result<Token, StartupError> {
        let addr = resolve_bind_addr(bind_ip, port)?;
        let mut listener = mio::net::TcpListener::bind(addr).map_err(|e| StartupError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;

        let entry = self.handles.vacant_entry();
        let token = Token(entry.key());
        self.poll
            .registry()
            .register(&mut listener, token, Interest::READABLE)
            .map_err(StartupError::Registration)?;
        entry.insert(HandleSlot::Listener {
            inner: listener,
            factory: session_factory,
            name: name.to_owned(),
        });
        self.stats.listeners_count.fetch_add(1, Ordering::Relaxed);
        debug!(name, %addr, "listening");
        Ok(token)
    }

    /// Starts a non-blocking connect. Promotes straight to a Connection if
    /// the socket reports a peer address immediately (rare, but possible
    /// for local addresses); otherwise registers a Connector for write
    /// interest and promotes on the writable event.
    pub fn start_connect(
        &mut self,
        name: &str,
        ip: &str,
        port: u16,
        session_factory: SessionFactory<H>,
    ) -> Result<Token, StartupError> {
        let addr: SocketAddr = format!("{ip}:{port}")
            .parse()
            .map_err(|_| StartupError::InvalidAddress(format!("{ip}:{port}")))?;
        let stream = mio::net::TcpStream::connect(addr).map_err(|e| StartupError::Connect {
            addr: addr.to_string(),
            source: e,
        })?;

        if stream.peer_addr().is_ok() {
            return self.promote_connector(name, stream, session_factory);
        }

        let entry = self.handles.vacant_entry();
        let token = Token(entry.key());
        let mut stream = stream;
        self.poll
            .registry()
            .register(&mut stream, token, Interest::WRITABLE)
            .map_err(StartupError::Registration)?;
        entry.insert(HandleSlot::Connector {
            inner: stream,
            factory: session_factory,
            name: name.to_owned(),
        });
        self.stats.connectors_count.fetch_add(1, Ordering::Relaxed);
        Ok(token)
    }

    fn promote_connector(
        &mut self,
        name: &str,
        mut stream: mio::net::TcpStream,
        factory: SessionFactory<H>,
    ) -> Result<Token, StartupError> {
        let entry = self.handles.vacant_entry();
        let token = Token(entry.key());
        self.poll
            .registry()
            .register(&mut stream, token, Interest::READABLE)
            .map_err(StartupError::Registration)?;

        let session = Arc::new(Mutex::new(Session::new(factory(), token)));
        let session_id = self.sessions.insert(session.clone());
        entry.insert(HandleSlot::Connection {
            stream,
            session_id,
            session,
            interest: Interest::READABLE,
            dead: false,
        });
        self.stats.connections_count.fetch_add(1, Ordering::Relaxed);
        debug!(name, "connector promoted to connection");
        self.run_write_pump(token);
        self.run_read_pump(token);
        Ok(token)
    }

    /// Runs `step` until `stop` is observed.
    pub fn run(&mut self, step_timeout_ms: u64) -> Result<(), FatalError> {
        self.stats.running.store(1, Ordering::Relaxed);
        while !self.stopping.load(Ordering::SeqCst) {
            self.step(step_timeout_ms)?;
        }
        self.stats.running.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// One iteration of the event loop.
    pub fn step(&mut self, timeout_ms: u64) -> Result<(), FatalError> {
        let mut events = Events::with_capacity(self.max_slots.max(128));
        loop {
            match self.poll.poll(&mut events, Some(Duration::from_millis(timeout_ms))) {
                Ok(()) => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(FatalError::PollFailed(e)),
            }
        }
        self.stats.ready.fetch_add(events.iter().count() as u64, Ordering::Relaxed);

        let tokens: Vec<(Token, bool, bool, bool)> = events
            .iter()
            .map(|e| (e.token(), e.is_error() || e.is_read_closed(), e.is_readable(), e.is_writable()))
            .collect();

        for (token, errored, readable, writable) in tokens {
            if token == NOTIFY_TOKEN {
                self.drain_notify_pipe();
                continue;
            }

            if errored {
                self.teardown_connection(token, "error or hangup event");
                continue;
            }

            if readable {
                self.dispatch_readable(token);
            }
            if writable {
                self.dispatch_writable(token);
            }
        }
        Ok(())
    }

    fn dispatch_readable(&mut self, token: Token) {
        let is_listener = matches!(self.handles.get(token.0), Some(HandleSlot::Listener { .. }));
        if is_listener {
            self.accept_loop(token);
        } else if matches!(self.handles.get(token.0), Some(HandleSlot::Connection { .. })) {
            self.run_read_pump(token);
        }
    }

    fn dispatch_writable(&mut self, token: Token) {
        let is_connector = matches!(self.handles.get(token.0), Some(HandleSlot::Connector { .. }));
        if is_connector {
            self.complete_connector(token);
        } else if matches!(self.handles.get(token.0), Some(HandleSlot::Connection { .. })) {
            self.run_write_pump(token);
        }
    }

    fn accept_loop(&mut self, listener_token: Token) {
        loop {
            let (factory, accepted) = match self.handles.get(listener_token.0) {
                Some(HandleSlot::Listener { inner, factory, .. }) => (factory.clone(), inner.accept()),
                _ => return,
            };

            let (mut stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) => {
                    error!(error = %e, "accept failed");
                    return;
                }
            };

            let entry = self.handles.vacant_entry();
            let token = Token(entry.key());
            if let Err(e) = self
                .poll
                .registry()
                .register(&mut stream, token, Interest::READABLE)
            {
                warn!(error = %e, %peer, "failed to register accepted connection");
                continue;
            }

            let session = Arc::new(Mutex::new(Session::new(factory(), token)));
            let session_id = self.sessions.insert(session.clone());
            entry.insert(HandleSlot::Connection {
                stream,
                session_id,
                session,
                interest: Interest::READABLE,
                dead: false,
            });
            self.stats.connections_count.fetch_add(1, Ordering::Relaxed);
            debug!(%peer, "accepted connection");
            self.run_write_pump(token);
            self.run_read_pump(token);
        }
    }

    fn complete_connector(&mut self, token: Token) {
        let slot = self.handles.try_remove(token.0);
        let Some(HandleSlot::Connector { mut inner, factory, name }) = slot else {
            return;
        };
        self.stats.connectors_count.fetch_sub(1, Ordering::Relaxed);

        match inner.take_error() {
            Ok(None) => {}
            _ => {
                let _ = self.poll.registry().deregister(&mut inner);
                return;
            }
        }

        let entry = self.handles.vacant_entry();
        let new_token = Token(entry.key());
        let mut stream = inner;
        if self
            .poll
            .registry()
            .reregister(&mut stream, new_token, Interest::READABLE)
            .is_err()
        {
            return;
        }

        let session = Arc::new(Mutex::new(Session::new(factory(), new_token)));
        let session_id = self.sessions.insert(session.clone());
        entry.insert(HandleSlot::Connection {
            stream,
            session_id,
            session,
            interest: Interest::READABLE,
            dead: false,
        });
        self.stats.connections_count.fetch_add(1, Ordering::Relaxed);
        debug!(name, "connector promoted to connection");
        self.run_write_pump(new_token);
        self.run_read_pump(new_token);
    }

    /// Reads until `WouldBlock`, runs framing, and enqueues the session if
    /// it transitioned to `InProcessing`.
    fn run_read_pump(&mut self, token: Token) {
        let (session_id, session_arc) = match self.handles.get(token.0) {
            Some(HandleSlot::Connection { session_id, session, .. }) => (*session_id, session.clone()),
            _ => return,
        };

        let mut peer_closed = false;
        loop {
            let mut session = session_arc.lock().unwrap();
            let slice = session.reserve_read(READ_CHUNK);
            let stream = match self.handles.get_mut(token.0) {
                Some(HandleSlot::Connection { stream, .. }) => stream,
                _ => return,
            };

            match stream.read(slice) {
                Ok(0) => {
                    peer_closed = true;
                    break;
                }
                Ok(n) => {
                    let full = n == slice.len();
                    session.advance_read(n);
                    drop(session);
                    if !full {
                        break;
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    drop(session);
                    warn!(error = %e, "read failed");
                    self.teardown_connection(token, "read error");
                    return;
                }
            }
        }

        let outcome = session_arc.lock().unwrap().on_read();
        match outcome {
            Ok(true) => self.work_queue.push((session_id, session_arc.clone())),
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "protocol error, tearing down connection");
                self.teardown_connection(token, "protocol error");
                return;
            }
        }

        if peer_closed {
            debug!("peer closed connection");
            self.teardown_connection(token, "peer closed");
        }
    }

    /// Drains the session's write arena to the socket, switching interest
    /// to write-ready on `EAGAIN` and back to read-ready once flushed.
    fn run_write_pump(&mut self, token: Token) {
        let session_arc = match self.handles.get(token.0) {
            Some(HandleSlot::Connection { session, .. }) => session.clone(),
            _ => return,
        };

        loop {
            let mut session = session_arc.lock().unwrap();
            if session.pending_write().is_empty() {
                break;
            }

            let stream = match self.handles.get_mut(token.0) {
                Some(HandleSlot::Connection { stream, .. }) => stream,
                _ => return,
            };

            match stream.write(session.pending_write()) {
                Ok(n) => session.consume_write(n),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    drop(session);
                    self.ensure_write_interest(token);
                    return;
                }
                Err(e) => {
                    drop(session);
                    warn!(error = %e, "write failed");
                    self.teardown_connection(token, "write error");
                    return;
                }
            }
        }

        if session_arc.lock().unwrap().write_fully_flushed() {
            self.ensure_read_interest(token);
        }
    }

    fn ensure_write_interest(&mut self, token: Token) {
        if let Some(HandleSlot::Connection { stream, interest, .. }) = self.handles.get_mut(token.0) {
            if *interest != Interest::WRITABLE {
                *interest = Interest::WRITABLE;
                let _ = self.poll.registry().reregister(stream, token, Interest::WRITABLE);
            }
        }
    }

    fn ensure_read_interest(&mut self, token: Token) {
        if let Some(HandleSlot::Connection { stream, interest, .. }) = self.handles.get_mut(token.0) {
            if *interest != Interest::READABLE {
                *interest = Interest::READABLE;
                let _ = self.poll.registry().reregister(stream, token, Interest::READABLE);
            }
        }
    }

    fn drain_notify_pipe(&mut self) {
        let notifications = match self.notify_rx.drain(NOTIFY_BATCH) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "failed to drain notify pipe");
                return;
            }
        };

        for notification in notifications {
            let session_id = notification.session;
            let (token, session_arc) = match self.sessions.get(session_id) {
                Some(session) => (session.lock().unwrap().token(), session.clone()),
                None => continue,
            };

            let is_dead = matches!(self.handles.get(token.0), Some(HandleSlot::Connection { dead: true, .. }));
            if is_dead {
                self.remove_connection(token);
                continue;
            }

            match notification.kind {
                NotificationKind::SessionReleased => {
                    let requeue = session_arc.lock().unwrap().release();
                    self.run_write_pump(token);
                    if requeue {
                        self.work_queue.push((session_id, session_arc));
                    }
                }
                NotificationKind::MoreData => {
                    self.run_write_pump(token);
                }
            }
        }
    }

    /// Marks a connection dead on error/EOF/stop, destroying it immediately
    /// if its session is `Released`, otherwise deferring destruction until
    /// the `SessionReleased` notification (invariant I4).
    fn teardown_connection(&mut self, token: Token, reason: &str) {
        let in_processing = match self.handles.get(token.0) {
            Some(HandleSlot::Connection { session, .. }) => {
                session.lock().unwrap().state() == SessionState::InProcessing
            }
            _ => return,
        };

        if in_processing {
            debug!(reason, "deferring teardown until session released");
            if let Some(HandleSlot::Connection { dead, .. }) = self.handles.get_mut(token.0) {
                *dead = true;
            }
            return;
        }

        debug!(reason, "tearing down connection");
        self.remove_connection(token);
    }

    fn remove_connection(&mut self, token: Token) {
        if let Some(HandleSlot::Connection { mut stream, session_id, .. }) = self.handles.try_remove(token.0) {
            let _ = self.poll.registry().deregister(&mut stream);
            self.sessions.remove(session_id);
            self.stats.connections_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn io_error_is_peer_closed(err: &io::Error) -> bool {
        matches!(
            err.kind(),
            ErrorKind::ConnectionReset | ErrorKind::BrokenPipe | ErrorKind::ConnectionAborted
        )
    }
}
