//! Moorline Core - Shared types library.
//!
//! This crate provides common types used across the Moorline web components:
//! - `web` - User-facing web application
//! - `integration-tests` - Live-server test harness
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, roles, and statuses
//! - [`billing`] - Billing override and plan entitlement predicates

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod billing;
pub mod types;

pub use billing::*;
pub use types::*;
