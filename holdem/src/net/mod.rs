//! Networking layer for client-server communication.
//!
//! This module provides TCP-based networking with a custom binary
//! protocol using bincode serialization. The server uses `mio` for
//! non-blocking I/O and runs every table on one thread.

/// Blocking TCP client for connecting to a server.
pub mod client;

/// Wire message types: the frozen client-server contract.
pub mod messages;

/// Session router and the readiness-driven server loop.
pub mod server;

/// Length-prefixed framing and payload serialization.
pub mod utils;
