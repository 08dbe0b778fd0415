//! Foundation types and utilities for atoforge.
//!
//! This crate holds the shared vocabulary of the generation core: document
//! types, job and step records, request/response payloads, compliance
//! entities, the error taxonomy, the tracing bootstrap, and the static
//! NIST control to STIG rule mapping table.

pub mod context;
pub mod entities;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod types;

pub use error::AtoForgeError;
pub use types::{DocumentType, GenerationRequest, JobStatus, StepStatus};
