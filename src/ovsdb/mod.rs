pub mod client;
pub mod connection;
pub mod types;

pub use client::OvsdbClient;
pub use connection::{ConnectionManager, Endpoint};
