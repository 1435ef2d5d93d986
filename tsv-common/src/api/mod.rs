//! Validation Service HTTP contract
//!
//! The OCR, extraction and matching work runs in a remote Validation Service.
//! This module holds everything the client needs to talk to it:
//! - Fixed endpoint paths and multipart field identifiers
//! - Response body and error body wire types
//! - The closed term status enumeration and its wire markers
//!
//! # Design Principle
//!
//! This module contains ONLY shared types and pure functions.
//! No HTTP client dependencies - the transport lives in tsv-client.

pub mod endpoints;
pub mod types;

pub use endpoints::{ReportKind, ServiceEndpoints, MASTER_SHEET_FIELD, TERM_SHEET_FIELD};
pub use types::{
    ServiceErrorBody, SummaryStats, TermResultRecord, TermStatus, ValidationResponseBody,
};
