//! Fixed-header mirror: a 4-byte little-endian `u32` body length, then the
//! body. Mirrors the frame back unchanged.

use crate::arena::ByteArena;
use crate::framer::{FramerPolicy, InputMessage};
use crate::session::{HandlerStatus, ProtocolHandler};

pub const HEADER_SIZE: usize = 4;
pub const MAX_BODY: usize = 128;

#[derive(Debug, Default)]
pub struct MirrorFixed;

impl ProtocolHandler for MirrorFixed {
    type Request = Vec<u8>;
    type Response = Vec<u8>;

    fn framer_policy(&self) -> FramerPolicy {
        FramerPolicy::Fixed {
            header_size: HEADER_SIZE,
        }
    }

    fn max_body_size(&self) -> usize {
        MAX_BODY
    }

    fn parse_size(&self, header: &[u8]) -> usize {
        u32::from_le_bytes(header.try_into().expect("4-byte header")) as usize
    }

    fn parse_message(&mut self, message: InputMessage) -> Option<Self::Request> {
        Some(message.body)
    }

    fn handle_request(&mut self, request: Self::Request) -> Self::Response {
        request
    }

    fn send_response(&mut self, response: Self::Response, out: &mut ByteArena) -> HandlerStatus {
        use std::io::Write;
        let len = response.len() as u32;
        if out.write_all(&len.to_le_bytes()).is_err() || out.write_all(&response).is_err() {
            return HandlerStatus::Failed;
        }
        HandlerStatus::Ok
    }
}
