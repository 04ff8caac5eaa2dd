//! Compliance tables: aggregation, emission and verification.
//!
//! Two tables are produced from one spec, one per [`PrintMode`]. The
//! verifier reads emitted text only, never the model.

pub mod aggregate;
pub mod brackets;
pub mod emit;
pub mod verify;
pub mod vocab;

use crate::Result;
use crate::diagnostics;

use anyhow::bail;
use serde::Serialize;
use std::fmt;

pub use aggregate::{ComplianceGroups, aggregate, compliance_arguments};
pub use emit::{export_tables, write_table};
pub use verify::{VerifyError, self_test, verify_entry, verify_table};

/// Which family of tokens a table is filtered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintMode {
    Profile,
    Extension,
}

impl PrintMode {
    pub const ALL: [PrintMode; 2] = [PrintMode::Profile, PrintMode::Extension];

    /// Whether `token` belongs to this mode's vocabulary.
    ///
    /// Every token is either a profile (`PRO-`) or an extension (`EXT-`);
    /// anything else is rejected rather than guessed.
    pub fn matches(self, token: &str) -> Result<bool> {
        let is_extension = token.starts_with(vocab::EXTENSION_MARKER);
        let is_profile = token.starts_with(vocab::PROFILE_MARKER);
        if is_extension == is_profile {
            bail!(
                "{}",
                diagnostics::error_message(format!("cannot classify profile token {}", token))
            );
        }
        Ok(match self {
            PrintMode::Profile => is_profile,
            PrintMode::Extension => is_extension,
        })
    }

    /// Combinator appended to groups with more than one token.
    pub fn combinator(self) -> &'static str {
        match self {
            PrintMode::Profile => "anyOf",
            PrintMode::Extension => "allOf",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            PrintMode::Profile => "compliance.profile.meta",
            PrintMode::Extension => "compliance.extension.meta",
        }
    }

    pub(crate) fn table_header(self) -> &'static str {
        match self {
            PrintMode::Profile => {
                "const OperationProfileComplianceMap profileComplianceMap = {\n"
            }
            PrintMode::Extension => {
                "const OperationExtensionComplianceMap extensionComplianceMap = {\n"
            }
        }
    }

    pub(crate) fn table_footer(self) -> &'static str {
        match self {
            PrintMode::Profile => "};\n\n",
            PrintMode::Extension => "};\n",
        }
    }
}

impl fmt::Display for PrintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintMode::Profile => f.write_str("profile"),
            PrintMode::Extension => f.write_str("extension"),
        }
    }
}
