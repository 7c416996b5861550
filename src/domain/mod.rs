//! Domain types and the ports the application layer talks through.

pub mod config;
pub mod ports;
pub mod registration;
