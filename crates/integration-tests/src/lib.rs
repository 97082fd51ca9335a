//! Integration tests for Moorline.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the Moorline API backend, then the web app
//! cargo run -p moorline-web
//!
//! # Run integration tests against the live servers
//! cargo test -p moorline-integration-tests -- --ignored
//! ```
//!
//! Tests are `#[ignore]`d by default because they need a running web app
//! (and usually a running backend) plus a signed-in session. Each test
//! file documents what it needs.
