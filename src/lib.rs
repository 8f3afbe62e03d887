// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A reusable foundation for single-process, multi-threaded, TCP-based
//! request/response servers.
//!
//! One I/O thread ([`reactor::Reactor`]) owns every socket and multiplexes
//! them through `mio`'s readiness facility. A pool of worker threads
//! ([`worker::WorkerPool`]) runs application logic pulled off a
//! condition-variable-backed queue ([`queue::WorkQueue`]). The two planes
//! hand sessions back and forth: the reactor pushes a session onto the
//! queue once framing produces a request, and a worker tells the reactor
//! it's done (or has more to write) through a small kernel pipe
//! ([`notify::NotifyPipe`] equivalent — see [`notify`]).
//!
//! Applications plug in by implementing [`session::ProtocolHandler`]; see
//! [`protocols`] for runnable examples (echo, two framing styles, an
//! HTTP-ish request line parser, and a request/response burst protocol).

pub mod arena;
pub mod config;
pub mod error;
pub mod framer;
pub mod handle;
pub mod net;
pub mod notify;
pub mod protocols;
pub mod queue;
pub mod reactor;
pub mod session;
pub mod stats;
pub mod worker;

pub use arena::ByteArena;
pub use config::{Config, Protocol};
pub use error::{FatalError, ProtocolError, StartupError};
pub use framer::{FramerPolicy, InputMessage};
pub use handle::SessionId;
pub use reactor::Reactor;
pub use session::{HandlerStatus, ProtocolHandler, Session, SessionState};
pub use worker::WorkerPool;
