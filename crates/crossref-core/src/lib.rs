//! Core types, target sets, and shared utilities for Crossref dump extraction.
//!
//! This crate provides:
//! - Accessors for the two record fields the pipeline interprets
//!   (`container-title` and `DOI`)
//! - The target set of publications and its lookup trait
//! - The record predicate deciding which records get extracted
//! - Prometheus metrics helpers
//! - Shared error types

mod error;
pub mod metrics;
mod predicate;
mod record;
mod targets;

pub use error::{Error, Result};
pub use predicate::{Match, evaluate};
pub use record::{CONTAINER_TITLE_FIELD, DOI_FIELD, Record, doi, publication_name};
pub use targets::{AnyPublication, BUILTIN_JOURNALS, TargetLookup, TargetSet};
