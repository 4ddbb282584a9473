//! The TCP line echo server and the interactive duplex client

pub mod client;
pub mod config;
pub mod server;
#[cfg(test)]
mod tests;

pub use client::{DuplexClient, Termination, connect};
pub use config::{ClientConfig, ServerConfig};
pub use server::{Accept, LineEchoServer, handle_session};
