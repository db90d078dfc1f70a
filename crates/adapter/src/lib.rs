//! Adapter crate - networked play between two devices
//!
//! This crate carries a checkers session over the network. The turn rules live
//! in `checkers-link-core`; everything here is I/O and plumbing around them.
//!
//! # Architecture
//!
//! ```text
//!  GameFrontend  <--callbacks--  Session  --enqueue-->  SenderWorker --send--> Transport
//!      ^                           |  ^                                            |
//!      |                           |  +------------ receive task <--receive--------+
//!      +------ Link (sync) --------+
//! ```
//!
//! - [`session::Session`] owns the turn machine behind one lock and applies
//!   local operations, inbound payloads and send completions in order.
//! - [`sender::SenderWorker`] is a single-slot mailbox; a newer payload
//!   replaces one that has not gone out yet.
//! - [`transport`] has the UDP ([`DatagramTransport`]) and TCP
//!   ([`StreamTransport`]) carriers, both locked to the first peer.
//! - [`runtime::Link`] owns a tokio runtime so a synchronous game loop can
//!   drive a session without being async itself.
//!
//! # Environment Variables
//!
//! - `CHECKERS_LINK_TRANSPORT`: `datagram`/`udp` (default) or `stream`/`tcp`
//! - `CHECKERS_LINK_HOST`: Bind address (default: "0.0.0.0")
//! - `CHECKERS_LINK_PORT`: Local port (default: 16474)
//! - `CHECKERS_LINK_PEER_PORT`: Port for peers given without one (default: local port)
//! - `CHECKERS_LINK_LOG_PATH`: Append every payload to this file as JSON lines
//! - `CHECKERS_LINK_DISABLED`: Set to "1" or "true" to disable networking
//!
//! # Testing
//!
//! Two links on one machine, both over UDP:
//!
//! ```bash
//! CHECKERS_LINK_PORT=16474 checkers-link listen
//! CHECKERS_LINK_PORT=16475 checkers-link invite 127.0.0.1:16474 "good luck"
//! ```

pub mod config;
pub mod error;
pub mod frontend;
pub mod runtime;
pub mod sender;
pub mod session;
pub mod transport;
pub mod wire_log;

pub use checkers_link_core as core;
pub use checkers_link_types as types;

pub use config::LinkConfig;
pub use error::{LinkError, TransportError};
pub use frontend::GameFrontend;
pub use runtime::Link;
pub use sender::SenderWorker;
pub use session::{Session, WIN_TAUNT};
pub use transport::{DatagramTransport, PeerLock, StreamTransport, Transport};
pub use wire_log::WireLog;
