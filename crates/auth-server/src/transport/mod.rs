//! Transport implementations for the auth server

mod http;

pub use http::{router, ApiError, HttpTransport};
