//! A minimal HTTP-ish protocol: a request line and headers terminated by
//! `\r\n\r\n`, an optional `Content-Length` body, and a 200 response that
//! echoes the request body back.

use crate::arena::ByteArena;
use crate::framer::{FramerPolicy, InputMessage};
use crate::session::{HandlerStatus, ProtocolHandler};

pub const MARKER: &[u8] = b"\r\n\r\n";
pub const MAX_HEADER: usize = 8 * 1024;
pub const MAX_BODY: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub head: Vec<u8>,
    pub body: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct HttpIsh;

impl ProtocolHandler for HttpIsh {
    type Request = Request;
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
        content_length(header).unwrap_or(0)
    }

    fn parse_message(&mut self, message: InputMessage) -> Option<Self::Request> {
        Some(Request {
            head: message.header,
            body: message.body,
        })
    }

    fn handle_request(&mut self, request: Self::Request) -> Self::Response {
        request.body
    }

    fn send_response(&mut self, response: Self::Response, out: &mut ByteArena) -> HandlerStatus {
        use std::io::Write;
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n",
            response.len()
        );
        if out.write_all(head.as_bytes()).is_err() || out.write_all(&response).is_err() {
            return HandlerStatus::Failed;
        }
        HandlerStatus::Ok
    }
}

/// Finds a `Content-Length` header, case-insensitively, among CRLF-separated
/// header lines. `None` if absent or unparseable.
fn content_length(head: &[u8]) -> Option<usize> {
    let head = std::str::from_utf8(head).ok()?;
    for line in head.split("\r\n") {
        let mut parts = line.splitn(2, ':');
        let name = parts.next()?.trim();
        let value = parts.next()?.trim();
        if name.eq_ignore_ascii_case("content-length") {
            return value.parse().ok();
        }
    }
    None
}
