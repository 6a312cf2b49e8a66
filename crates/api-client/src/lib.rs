//! Authenticated HTTP client for the Lumen backend
//!
//! This crate provides the HTTP layer that attaches bearer credentials from
//! the shared [`auth_store::AuthStore`], coordinates token refresh so that
//! concurrent expired requests trigger exactly one refresh call, and exposes
//! the authentication operations (login, register, password reset) on top.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod error;
pub mod http;

pub use auth::{AuthService, LoginOutcome};
pub use client::{ApiClient, SessionCallback, SessionEvent};
pub use error::{ApiError, Result};
pub use http::{ApiRequest, ClientConfig, HttpMethod};
