//! Address resolution and listener creation

pub mod address;
pub mod socket_builder;

pub use address::{resolve, service_port};
pub use socket_builder::{ListenOptions, bind_listener, into_tokio};
