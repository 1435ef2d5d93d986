//! # Term Sheet Validation Common Library
//!
//! Shared code for the term sheet validation client including:
//! - Validation Service wire types (request fields, response body, error body)
//! - Service endpoint derivation
//! - Configuration loading
//! - Common error type

pub mod api;
pub mod config;
pub mod error;

pub use api::{ServiceEndpoints, TermStatus};
pub use error::{Error, Result};
