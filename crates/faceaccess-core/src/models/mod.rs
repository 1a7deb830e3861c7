//! Data models for the access-control service.
//!
//! This module contains the wire types exchanged with the HTTP API:
//!
//! - `LoginRequest`, `TokenResponse`: the login exchange
//! - `Employee`: enrolled employee records
//! - `AccessLog`, `Decision`, `LogQuery`: the access-attempt log and its filters
//! - `AccessStats`, `DashboardStats`: aggregate statistics

pub mod auth;
pub mod employee;
pub mod log;

pub use auth::{LoginRequest, TokenResponse};
pub use employee::Employee;
pub use log::{AccessLog, AccessStats, DashboardStats, Decision, LogQuery, DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT};
