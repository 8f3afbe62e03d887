//! Converts a prefix of a [`ByteArena`] into zero or more framed messages.
//!
//! Framing is a pure function over the arena plus a policy; it never owns a
//! socket and never blocks. `parse_size` is supplied by the concrete
//! session, since the core has no opinion on header encoding beyond "a
//! non-negative integer bounded by `max_body`".

use crate::arena::ByteArena;
use crate::error::ProtocolError;

/// An immutable `(header, body)` pair produced by [`frame`]. Owned by the
/// session's input queue until a worker pops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMessage {
    pub header: Vec<u8>,
    pub body: Vec<u8>,
}

/// Which framing algorithm a session uses.
#[derive(Debug, Clone)]
pub enum FramerPolicy {
    /// A fixed-size header precedes the body.
    Fixed { header_size: usize },
    /// A marker terminates a variable-length header; the header encodes the
    /// body length in a session-defined way.
    Delimited {
        marker: Vec<u8>,
        max_header: usize,
    },
}

/// Repeatedly frames messages out of `arena`'s populated region, consuming
/// bytes as whole frames are produced. Stops when no more complete frames
/// are available; never blocks, never grows the arena itself.
pub fn frame<F>(
    arena: &mut ByteArena,
    policy: &FramerPolicy,
    max_body: usize,
    parse_size: F,
) -> Result<Vec<InputMessage>, ProtocolError>
where
    F: Fn(&[u8]) -> usize,
{
    let mut messages = Vec::new();

    loop {
        let (header_size, body_size) = match policy {
            // `header_size == 0` means there is no header to parse: the
            // whole currently-buffered region is one frame. Used by
            // header-less passthrough protocols (e.g. a raw echo).
            FramerPolicy::Fixed { header_size: 0 } => {
                let body_size = arena.len();
                if body_size == 0 {
                    break;
                }
                (0, body_size)
            }
            FramerPolicy::Fixed { header_size } => {
                let header_size = *header_size;
                if arena.len() < header_size {
                    break;
                }
                let body_size = parse_size(&arena.data()[..header_size]);
                if body_size > max_body {
                    return Err(ProtocolError::BodyTooLarge {
                        size: body_size,
                        max: max_body,
                    });
                }
                (header_size, body_size)
            }
            FramerPolicy::Delimited { marker, max_header } => {
                let data = arena.data();
                let pos = find_marker(data, marker);
                let pos = match pos {
                    Some(pos) => pos,
                    None => {
                        if data.len() > *max_header {
                            return Err(ProtocolError::HeaderTooLarge { max: *max_header });
                        }
                        break;
                    }
                };
                let header_size = pos + marker.len();
                let body_size = parse_size(&arena.data()[..header_size]);
                if body_size > max_body {
                    return Err(ProtocolError::BodyTooLarge {
                        size: body_size,
                        max: max_body,
                    });
                }
                (header_size, body_size)
            }
        };

        if arena.len() < header_size + body_size {
            break;
        }

        let data = arena.data();
        let header = data[..header_size].to_vec();
        let body = data[header_size..header_size + body_size].to_vec();
        arena.consume(header_size + body_size);
        messages.push(InputMessage { header, body });
    }

    Ok(messages)
}

fn find_marker(haystack: &[u8], marker: &[u8]) -> Option<usize> {
    if marker.is_empty() || haystack.len() < marker.len() {
        return None;
    }
    haystack
        .windows(marker.len())
        .position(|window| window == marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn le_u32_header(header: &[u8]) -> usize {
        u32::from_le_bytes(header.try_into().unwrap()) as usize
    }

    fn decimal_header(header: &[u8]) -> usize {
        let digits = &header[..header.len() - 2]; // strip CRLF
        std::str::from_utf8(digits).unwrap().parse().unwrap()
    }

    #[test]
    fn fixed_header_emits_message_once_body_arrives() {
        let mut arena = ByteArena::new();
        arena.write_all(&5u32.to_le_bytes()).unwrap();
        arena.write_all(b"hello").unwrap();

        let policy = FramerPolicy::Fixed { header_size: 4 };
        let msgs = frame(&mut arena, &policy, 128, le_u32_header).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].body, b"hello");
        assert!(arena.is_empty());
    }

    #[test]
    fn fixed_header_stops_on_partial_body() {
        let mut arena = ByteArena::new();
        arena.write_all(&5u32.to_le_bytes()).unwrap();
        arena.write_all(b"he").unwrap();

        let policy = FramerPolicy::Fixed { header_size: 4 };
        let msgs = frame(&mut arena, &policy, 128, le_u32_header).unwrap();
        assert!(msgs.is_empty());
        assert_eq!(arena.len(), 6);
    }

    #[test]
    fn fixed_header_rejects_oversized_body() {
        let mut arena = ByteArena::new();
        arena.write_all(&200u32.to_le_bytes()).unwrap();

        let policy = FramerPolicy::Fixed { header_size: 4 };
        let err = frame(&mut arena, &policy, 128, le_u32_header).unwrap_err();
        assert!(matches!(err, ProtocolError::BodyTooLarge { size: 200, max: 128 }));
    }

    #[test]
    fn delimited_header_emits_message() {
        let mut arena = ByteArena::new();
        arena.write_all(b"5\r\nhello").unwrap();

        let policy = FramerPolicy::Delimited {
            marker: b"\r\n".to_vec(),
            max_header: 32,
        };
        let msgs = frame(&mut arena, &policy, 128, decimal_header).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].body, b"hello");
    }

    #[test]
    fn delimited_header_without_marker_stays_below_max_waits() {
        let mut arena = ByteArena::new();
        arena.write_all(b"5").unwrap();

        let policy = FramerPolicy::Delimited {
            marker: b"\r\n".to_vec(),
            max_header: 32,
        };
        let msgs = frame(&mut arena, &policy, 128, decimal_header).unwrap();
        assert!(msgs.is_empty());
    }

    #[test]
    fn delimited_header_without_marker_past_max_is_protocol_error() {
        let mut arena = ByteArena::new();
        arena.write_all(&[b'9'; 40]).unwrap();

        let policy = FramerPolicy::Delimited {
            marker: b"\r\n".to_vec(),
            max_header: 32,
        };
        let err = frame(&mut arena, &policy, 128, decimal_header).unwrap_err();
        assert!(matches!(err, ProtocolError::HeaderTooLarge { max: 32 }));
    }

    #[test]
    fn zero_header_size_passes_through_whole_buffer() {
        let mut arena = ByteArena::new();
        arena.write_all(b"raw bytes, no header").unwrap();

        let policy = FramerPolicy::Fixed { header_size: 0 };
        let msgs = frame(&mut arena, &policy, 128, |_| 0).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].body, b"raw bytes, no header");
        assert!(msgs[0].header.is_empty());
        assert!(arena.is_empty());
    }

    #[test]
    fn multiple_frames_in_one_buffer_are_all_emitted() {
        let mut arena = ByteArena::new();
        arena.write_all(&3u32.to_le_bytes()).unwrap();
        arena.write_all(b"abc").unwrap();
        arena.write_all(&3u32.to_le_bytes()).unwrap();
        arena.write_all(b"def").unwrap();

        let policy = FramerPolicy::Fixed { header_size: 4 };
        let msgs = frame(&mut arena, &policy, 128, le_u32_header).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].body, b"abc");
        assert_eq!(msgs[1].body, b"def");
    }
}
