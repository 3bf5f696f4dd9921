//! # auth-server
//!
//! HTTP front end for the auth service: login, registration, identity lookup
//! and the admin user listing.

mod server;
pub mod transport;

pub use server::AuthServer;
pub use transport::{router, ApiError, HttpTransport};
