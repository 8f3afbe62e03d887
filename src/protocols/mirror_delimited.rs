//! Delimited mirror: an ASCII decimal body length followed by `\r\n`, then
//! the body. Mirrors the frame back unchanged, in the same wire format.

use crate::arena::ByteArena;
use crate::framer::{FramerPolicy, InputMessage};
use crate::session::{HandlerStatus, ProtocolHandler};

pub const MARKER: &[u8] = b"\r\n";
pub const MAX_HEADER: usize = 32;
pub const MAX_BODY: usize = 128;

#[derive(Debug, Default)]
pub struct MirrorDelimited;

impl ProtocolHandler for MirrorDelimited {
    type Request = Vec<u8>;
    type Response = Vec<u8>;

    fn framer_policy(&self) -> FramerPolicy {
        FramerPolicy::Delimited {
            marker: MARKER.to_vec(),
            max_header: MAX_HEADER,
        }
    }

    fn max_body_size(&self) -> usize {
        MAX_BODY
    }

    fn parse_size(&self, header: &[u8]) -> usize {
        let digits = &header[..header.len() - MARKER.len()];
        std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    fn parse_message(&mut self, message: InputMessage) -> Option<Self::Request> {
        Some(message.body)
    }

    fn handle_request(&mut self, request: Self::Request) -> Self::Response {
        request
    }

    fn send_response(&mut self, response: Self::Response, out: &mut ByteArena) -> HandlerStatus {
        use std::io::Write;
        let header = format!("{}\r\n", response.len());
        if out.write_all(header.as_bytes()).is_err() || out.write_all(&response).is_err() {
            return HandlerStatus::Failed;
        }
        HandlerStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use mio::Token;

    fn frame_of(body: &[u8]) -> Vec<u8> {
        let mut out = format!("{}\r\n", body.len()).into_bytes();
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn round_trips_a_body() {
        let mut session = Session::new(MirrorDelimited, Token(0));
        let frame = frame_of(b"hello world");
        let dst = session.reserve_read(frame.len());
        dst[..frame.len()].copy_from_slice(&frame);
        session.advance_read(frame.len());

        session.on_read().unwrap();
        let request = session.next_request().unwrap();
        session.process_one(request);
        assert_eq!(session.pending_write(), frame.as_slice());
    }

    #[test]
    fn header_without_marker_past_max_is_a_protocol_error() {
        let mut session = Session::new(MirrorDelimited, Token(0));
        let junk = vec![b'9'; MAX_HEADER + 8];
        let dst = session.reserve_read(junk.len());
        dst.copy_from_slice(&junk);
        session.advance_read(junk.len());

        assert!(session.on_read().is_err());
    }

    #[test]
    fn oversized_body_is_a_protocol_error() {
        let mut session = Session::new(MirrorDelimited, Token(0));
        let header = format!("{}\r\n", MAX_BODY + 1);
        let dst = session.reserve_read(header.len());
        dst.copy_from_slice(header.as_bytes());
        session.advance_read(header.len());

        assert!(session.on_read().is_err());
    }
}
