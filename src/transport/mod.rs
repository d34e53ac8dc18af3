//! WebSocket transport layer.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`discovery`] | Candidate-port probing |
//! | [`connection`] | One connection's event loop and correlator |
//! | [`router`] | Inbound frame classification and dispatch |

pub mod connection;
pub mod discovery;
pub mod router;

pub use connection::Connection;
pub use discovery::discover_port;
