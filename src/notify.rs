//! A kernel pipe carrying fixed-size notification records from worker
//! threads back to the I/O thread, built on `mio::unix::pipe` for a
//! poll-registrable kernel object. Records carry a [`SessionId`] (see
//! `handle.rs`) rather than a pointer.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use mio::unix::pipe;

use crate::handle::SessionId;

/// What a notification is telling the reactor to do with the referenced
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// The worker is done with the session; it may return to `Released`.
    SessionReleased,
    /// The worker appended to the session's write arena; resume the write
    /// pump.
    MoreData,
}

/// A single record carried through the pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub session: SessionId,
}

/// Byte layout of one record: 1 tag byte, 7 bytes padding, then the
/// `SessionId`'s index and generation as little-endian `u64`s. Fixed size
/// keeps writes atomic (well under `PIPE_BUF`) and batched reads trivial to
/// chunk.
const RECORD_LEN: usize = 24;

impl Notification {
    fn to_bytes(self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        buf[0] = match self.kind {
            NotificationKind::SessionReleased => 0,
            NotificationKind::MoreData => 1,
        };
        let (index, generation) = self.session.raw_parts();
        buf[8..16].copy_from_slice(&(index as u64).to_le_bytes());
        buf[16..24].copy_from_slice(&generation.to_le_bytes());
        buf
    }

    fn from_bytes(buf: [u8; RECORD_LEN]) -> Self {
        let kind = match buf[0] {
            0 => NotificationKind::SessionReleased,
            _ => NotificationKind::MoreData,
        };
        let index = u64::from_le_bytes(buf[8..16].try_into().unwrap()) as usize;
        let generation = u64::from_le_bytes(buf[16..24].try_into().unwrap());
        Notification {
            kind,
            session: SessionId::from_raw_parts(index, generation),
        }
    }
}

/// Write end, cheaply cloneable so every worker thread can hold one.
#[derive(Clone)]
pub struct NotifySender {
    inner: Arc<Mutex<pipe::Sender>>,
}

impl NotifySender {
    /// Writes one notification. A short write would corrupt framing, but at
    /// `RECORD_LEN` bytes this stays well under `PIPE_BUF` and is atomic.
    pub fn send(&self, notification: Notification) -> io::Result<()> {
        let bytes = notification.to_bytes();
        let mut sender = self.inner.lock().unwrap();
        sender.write_all(&bytes)
    }
}

/// Read end. Owned by the reactor and registered with the readiness
/// facility for read interest.
pub struct NotifyReceiver {
    inner: pipe::Receiver,
    carry: Vec<u8>,
}

impl NotifyReceiver {
    pub fn inner_mut(&mut self) -> &mut pipe::Receiver {
        &mut self.inner
    }

    /// Drains everything currently readable, returning whole records. Up to
    /// `max` records are returned per call so one very bursty worker can't
    /// starve other reactor bookkeeping; call again if the pipe still has
    /// data.
    pub fn drain(&mut self, max: usize) -> io::Result<Vec<Notification>> {
        let mut chunk = [0u8; 4096];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.carry.extend_from_slice(&chunk[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
            if self.carry.len() / RECORD_LEN >= max {
                break;
            }
        }

        let available = self.carry.len() / RECORD_LEN;
        let take = available.min(max);
        let mut out = Vec::with_capacity(take);
        for i in 0..take {
            let start = i * RECORD_LEN;
            let mut record = [0u8; RECORD_LEN];
            record.copy_from_slice(&self.carry[start..start + RECORD_LEN]);
            out.push(Notification::from_bytes(record));
        }
        self.carry.drain(..take * RECORD_LEN);
        Ok(out)
    }
}

/// Creates a connected pipe: a sender cloneable across worker threads, and
/// a receiver the reactor registers with its readiness facility.
pub fn notify_pipe() -> io::Result<(NotifySender, NotifyReceiver)> {
    let (sender, receiver) = pipe::new()?;
    Ok((
        NotifySender {
            inner: Arc::new(Mutex::new(sender)),
        },
        NotifyReceiver {
            inner: receiver,
            carry: Vec::new(),
        },
    ))
}
