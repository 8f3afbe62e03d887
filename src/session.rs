//! The session state machine: per-connection buffers, framing, and the
//! `Released`/`InProcessing` ownership tag that decides which thread may
//! touch what.
//!
//! One generic `Session<H>` provides the mechanics (arenas, input queue,
//! state) plus a small [`ProtocolHandler`] trait the application implements —
//! five methods and one state enum, rather than a base class per protocol.

use std::collections::VecDeque;
use std::sync::Mutex;

use mio::Token;

use crate::arena::ByteArena;
use crate::error::ProtocolError;
use crate::framer::{self, FramerPolicy, InputMessage};

/// Ownership tag. A session is `Released` when no worker holds it, and
/// `InProcessing` exactly while it is enqueued on the work queue or held by
/// one worker thread (invariant I2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Released,
    InProcessing,
}

/// Result of handing one parsed request to the application handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerStatus {
    Ok,
    Failed,
    IncompleteSend,
}

/// The only application-facing extension point. An implementation owns the
/// framing policy and the request/response types; the reactor and worker
/// pool only ever see a `Session<H>`.
pub trait ProtocolHandler: Send {
    type Request;
    type Response;

    fn framer_policy(&self) -> FramerPolicy;

    fn max_body_size(&self) -> usize;

    /// Interprets a frame's header bytes as a body length.
    fn parse_size(&self, header: &[u8]) -> usize;

    /// Turns a framed message into an application request. `None` drops the
    /// message without producing work (e.g. a protocol-level ping).
    fn parse_message(&mut self, message: InputMessage) -> Option<Self::Request>;

    /// Runs application logic for one request, producing a response.
    fn handle_request(&mut self, request: Self::Request) -> Self::Response;

    /// Serializes `response` into `out`. `IncompleteSend` tells the worker
    /// pool to emit `MoreData` instead of `SessionReleased` so the reactor
    /// resumes the write pump once the socket can take more.
    fn send_response(&mut self, response: Self::Response, out: &mut ByteArena) -> HandlerStatus;

    /// Called once at session creation, before any bytes are read. The
    /// default does nothing; a session that must speak first (e.g. a
    /// greeting) writes into `out` here.
    fn init(&mut self, _out: &mut ByteArena) {}
}

/// A connection's protocol state: two arenas, a framing policy borrowed from
/// the handler, a mutex-protected input queue, and the ownership tag.
pub struct Session<H: ProtocolHandler> {
    handler: H,
    read_arena: ByteArena,
    write_arena: ByteArena,
    input_queue: Mutex<VecDeque<InputMessage>>,
    state: SessionState,
    failed: bool,
    /// Back-reference to the reactor's handle table slot. Non-owning: the
    /// session never reaches across into the handle's interest mask.
    token: Token,
}

impl<H: ProtocolHandler> Session<H> {
    pub fn new(mut handler: H, token: Token) -> Self {
        let mut write_arena = ByteArena::new();
        handler.init(&mut write_arena);
        Self {
            handler,
            read_arena: ByteArena::new(),
            write_arena,
            input_queue: Mutex::new(VecDeque::new()),
            state: SessionState::Released,
            failed: false,
            token,
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// True iff the input queue is non-empty.
    pub fn has_request(&self) -> bool {
        !self.input_queue.lock().unwrap().is_empty()
    }

    pub fn has_no_more_requests(&self) -> bool {
        !self.has_request()
    }

    /// The writable tail of the read arena, sized at least `n`.
    pub fn reserve_read(&mut self, n: usize) -> &mut [u8] {
        self.read_arena.reserve(n)
    }

    pub fn advance_read(&mut self, n: usize) {
        self.read_arena.advance_write(n);
    }

    /// Runs framing over whatever bytes the read pump just deposited, and
    /// enqueues any produced messages. Returns `true` if this transitioned
    /// the session `Released -> InProcessing`, in which case the caller
    /// (the reactor's read pump) must push this session's id onto the work
    /// queue.
    pub fn on_read(&mut self) -> Result<bool, ProtocolError> {
        let policy = self.handler.framer_policy();
        let max_body = self.handler.max_body_size();
        let messages = framer::frame(&mut self.read_arena, &policy, max_body, |header| {
            self.handler.parse_size(header)
        })?;

        if messages.is_empty() {
            return Ok(false);
        }

        let mut queue = self.input_queue.lock().unwrap();
        queue.extend(messages);
        drop(queue);

        if self.state == SessionState::Released {
            self.state = SessionState::InProcessing;
            return Ok(true);
        }
        Ok(false)
    }

    /// Pops and parses queued messages until one yields a request, skipping
    /// any that the handler drops.
    pub fn next_request(&mut self) -> Option<H::Request> {
        loop {
            let message = self.input_queue.lock().unwrap().pop_front()?;
            if let Some(request) = self.handler.parse_message(message) {
                return Some(request);
            }
        }
    }

    /// Runs the handler on one request and serializes its response into the
    /// write arena.
    pub fn process_one(&mut self, request: H::Request) -> HandlerStatus {
        let response = self.handler.handle_request(request);
        let status = self.handler.send_response(response, &mut self.write_arena);
        if status == HandlerStatus::Failed {
            self.failed = true;
        }
        status
    }

    pub fn pending_write(&self) -> &[u8] {
        self.write_arena.data()
    }

    pub fn consume_write(&mut self, n: usize) {
        self.write_arena.consume(n);
    }

    pub fn write_fully_flushed(&self) -> bool {
        self.write_arena.is_empty()
    }

    /// Called by the notify-pipe drain handler after a `SessionReleased`
    /// notification. Returns `true` if messages arrived while the session
    /// was being processed, meaning it must immediately re-enter
    /// `InProcessing` and be re-pushed onto the work queue.
    pub fn release(&mut self) -> bool {
        self.state = SessionState::Released;
        if self.has_request() {
            self.state = SessionState::InProcessing;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::FramerPolicy;

    struct Echo;

    impl ProtocolHandler for Echo {
        type Request = Vec<u8>;
        type Response = Vec<u8>;

        fn framer_policy(&self) -> FramerPolicy {
            FramerPolicy::Fixed { header_size: 4 }
        }

        fn max_body_size(&self) -> usize {
            128
        }

        fn parse_size(&self, header: &[u8]) -> usize {
            u32::from_le_bytes(header.try_into().unwrap()) as usize
        }

        fn parse_message(&mut self, message: InputMessage) -> Option<Self::Request> {
            Some(message.body)
        }

        fn handle_request(&mut self, request: Self::Request) -> Self::Response {
            request
        }

        fn send_response(&mut self, response: Self::Response, out: &mut ByteArena) -> HandlerStatus {
            use std::io::Write;
            out.write_all(&(response.len() as u32).to_le_bytes()).unwrap();
            out.write_all(&response).unwrap();
            HandlerStatus::Ok
        }
    }

    fn push_bytes(session: &mut Session<Echo>, bytes: &[u8]) {
        let dst = session.reserve_read(bytes.len());
        dst[..bytes.len()].copy_from_slice(bytes);
        session.advance_read(bytes.len());
    }

    #[test]
    fn on_read_transitions_released_to_in_processing() {
        let mut session = Session::new(Echo, Token(0));
        push_bytes(&mut session, &3u32.to_le_bytes());
        push_bytes(&mut session, b"abc");

        assert_eq!(session.state(), SessionState::Released);
        let transitioned = session.on_read().unwrap();
        assert!(transitioned);
        assert_eq!(session.state(), SessionState::InProcessing);
        assert!(session.has_request());
    }

    #[test]
    fn partial_frame_does_not_transition() {
        let mut session = Session::new(Echo, Token(0));
        push_bytes(&mut session, &3u32.to_le_bytes());
        push_bytes(&mut session, b"a");

        let transitioned = session.on_read().unwrap();
        assert!(!transitioned);
        assert_eq!(session.state(), SessionState::Released);
    }

    #[test]
    fn process_one_writes_framed_response() {
        let mut session = Session::new(Echo, Token(0));
        push_bytes(&mut session, &3u32.to_le_bytes());
        push_bytes(&mut session, b"abc");
        session.on_read().unwrap();

        let request = session.next_request().unwrap();
        let status = session.process_one(request);
        assert_eq!(status, HandlerStatus::Ok);
        assert_eq!(session.pending_write(), [3, 0, 0, 0, b'a', b'b', b'c']);
    }

    #[test]
    fn release_requeues_if_more_requests_landed() {
        let mut session = Session::new(Echo, Token(0));
        push_bytes(&mut session, &3u32.to_le_bytes());
        push_bytes(&mut session, b"abc");
        session.on_read().unwrap();
        session.next_request().unwrap();

        // Another frame arrives while the first is being processed.
        push_bytes(&mut session, &3u32.to_le_bytes());
        push_bytes(&mut session, b"xyz");
        session.on_read().unwrap();

        let requeue = session.release();
        assert!(requeue);
        assert_eq!(session.state(), SessionState::InProcessing);
    }

    #[test]
    fn release_returns_to_released_when_queue_drained() {
        let mut session = Session::new(Echo, Token(0));
        push_bytes(&mut session, &3u32.to_le_bytes());
        push_bytes(&mut session, b"abc");
        session.on_read().unwrap();
        session.next_request().unwrap();

        let requeue = session.release();
        assert!(!requeue);
        assert_eq!(session.state(), SessionState::Released);
    }
}
