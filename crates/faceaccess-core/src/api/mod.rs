//! REST API client module for the access-control service.
//!
//! This module provides the `ApiClient` used for every call to the
//! service: the login exchange and the protected employee, log and
//! statistics endpoints.
//!
//! Protected endpoints use bearer token authentication; the token is
//! obtained from `POST /auth/login` and attached by the session manager.

pub mod client;
pub mod error;

pub use client::{ApiClient, DEFAULT_TIMEOUT_SECS};
pub use error::{ApiError, ErrorBody};
