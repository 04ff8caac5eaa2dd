//! Compliance-table exporter for the TOSA operator specification.
//!
//! The crate loads the specification XML into an immutable model
//! ([`spec::Spec`]), aggregates each operator's type-support rows by the
//! profiles or extensions that gate them, emits the bracketed compliance
//! tables consumed by the downstream validator, and re-verifies emitted
//! tables against closed vocabularies.

pub mod compliance;
pub mod diagnostics;
pub mod report;
pub mod spec;

pub type Result<T> = anyhow::Result<T>;
