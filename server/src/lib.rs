// Life of a request:
// 1. The host catches panics that escape everything below
// 2. Development: panics become a detailed error page
//    Otherwise: HTTPS responses get the HSTS header
// 3. Plain-HTTP requests are redirected to HTTPS
// 4. Responses are compressed when the client accepts it
// 5. Routes authenticate with the scheme their policy names
//
// System components:
//  - Configuration source and host settings
//  - Logger with two filtered sinks
//  - Authentication scheme registry (bearer tokens, cookie sessions)
//  - Request pipeline

#![cfg_attr(test, allow(clippy::expect_used, clippy::disallowed_methods))]

pub mod auth;
pub mod config;
pub mod configuration;
pub mod logging;
pub mod mvc;
pub mod pipeline;
pub mod startup;
#[cfg(test)]
mod testing;

mod e2e_tests;

pub use startup::{Services, Startup, StartupError};
