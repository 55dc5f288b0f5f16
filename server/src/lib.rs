//! Bootstrap pieces of the CARTA object server.

pub mod config;
pub mod connector;
