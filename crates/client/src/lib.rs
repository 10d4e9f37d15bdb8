//! `client` crate: typed HTTP access to the evaluation platform's public API.
//!
//! Provides the connection handle, wire models, and one module of request
//! functions per API area. No workflow logic lives here.

pub mod api;
pub mod connection;
pub mod error;
pub mod models;

pub use connection::{ClientConfig, PlatformClient};
pub use error::ClientError;
