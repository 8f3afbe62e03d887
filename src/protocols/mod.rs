//! Demo protocols. Each is a small [`crate::session::ProtocolHandler`]
//! implementation — an instance of the abstract session contract, not part
//! of the core.

pub mod echo;
pub mod httpish;
pub mod mirror_delimited;
pub mod mirror_fixed;
pub mod reqresp;
