//! End-to-end tests at the HTTP request/response level.
//!
//! Each test file covers a specific scenario, sending requests through the
//! fully composed router: configuration, services, pipeline and routes.

#![cfg(test)]

mod helpers;

mod test_bearer_token;
mod test_compression;
mod test_cookie_challenge;
mod test_exception_detail;
mod test_https_redirection;
mod test_log_filtering;
