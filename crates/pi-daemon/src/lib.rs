//! Server process for podintel: wires configuration, the upstream client
//! and the HTTP API together and runs them until shutdown.

pub mod server;
pub mod shutdown;
