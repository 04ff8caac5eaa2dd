//! Summaries of an export or verification run, serialized as JSON for CI.

use crate::Result;
use crate::compliance::PrintMode;
use crate::diagnostics;

use anyhow::Context;
use serde::Serialize;
use std::fs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorSummary {
    pub name: String,
    pub groups: usize,
    pub tuples: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub mode: PrintMode,
    pub file: String,
    pub total_groups: usize,
    pub total_tuples: usize,
    /// Contributing operators in emission order.
    pub operators: Vec<OperatorSummary>,
}

impl TableSummary {
    pub fn new(mode: PrintMode, file: &str, operators: Vec<OperatorSummary>) -> Self {
        Self {
            mode,
            file: file.to_string(),
            total_groups: operators.iter().map(|o| o.groups).sum(),
            total_tuples: operators.iter().map(|o| o.tuples).sum(),
            operators,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub spec_version: String,
    pub tables: Vec<TableSummary>,
}

/// Totals gathered while verifying one emitted table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub operations: usize,
    pub compliance_entries: usize,
    pub type_tuples: usize,
    /// Operations whose entries carry the `invalid` combinator.
    pub invalid_conditions: Vec<String>,
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json + "\n")
        .with_context(|| diagnostics::error_message(format!("write {}", path)))
}
