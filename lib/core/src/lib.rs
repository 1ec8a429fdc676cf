//! Core domain types and utilities for the agrokart storefront.
//!
//! This crate provides the foundational identifier types and the error
//! handling alias shared by the agrokart crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{AuthAttemptId, IdentityId, ParseIdError};
