//! Raw byte-stream echo: whatever arrives is written straight back, with no
//! header at all.

use crate::arena::ByteArena;
use crate::framer::{FramerPolicy, InputMessage};
use crate::session::{HandlerStatus, ProtocolHandler};

#[derive(Debug, Default)]
pub struct Echo;

impl ProtocolHandler for Echo {
    type Request = Vec<u8>;
    type Response = Vec<u8>;

    fn framer_policy(&self) -> FramerPolicy {
        FramerPolicy::Fixed { header_size: 0 }
    }

    fn max_body_size(&self) -> usize {
        usize::MAX
    }

    fn parse_size(&self, _header: &[u8]) -> usize {
        0
    }

    fn parse_message(&mut self, message: InputMessage) -> Option<Self::Request> {
        Some(message.body)
    }

    fn handle_request(&mut self, request: Self::Request) -> Self::Response {
        request
    }

    fn send_response(&mut self, response: Self::Response, out: &mut ByteArena) -> HandlerStatus {
        use std::io::Write;
        match out.write_all(&response) {
            Ok(()) => HandlerStatus::Ok,
            Err(_) => HandlerStatus::Failed,
        }
    }
}
