//! Independent re-parse of emitted compliance tables.
//!
//! The format of one operation, as the verifier sees it:
//! ```text
//! "tosa.add", {
//!     {{Profile::pro_int,Profile::pro_fp}, {{i32T,i32T,i32T}}, anyOf},
//!     {{Profile::pro_fp}, {{fp16T,fp16T,fp16T}, {fp32T,fp32T,fp32T}}}}
//! ```
//! Tuples may also carry a version tag, `{{i32T,i32T},SpecificationVersion::V_1_0}`;
//! the tag is skipped.
//!
//! Whitespace is insignificant and removed before parsing. Brackets are
//! checked before any vocabulary lookup.

use crate::compliance::brackets::{check_balance, top_level_groups};
use crate::compliance::vocab::{
    INVALID_CONDITION, KNOWN_CONDITIONS, KNOWN_OPERATIONS, KNOWN_PROFILES, KNOWN_TYPES,
};
use crate::report::VerifyReport;

use regex::Regex;
use std::sync::LazyLock;

static OPERATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""tosa\.([^"]*)""#).expect("operation name pattern"));

/// Start and end markers of the aggregate declaration's body.
const TABLE_BODY_START: &str = "={";
const TABLE_BODY_END: &str = "};";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("syntax error: curly bracket pair mismatch")]
    BracketMismatch,

    #[error("syntax error: unexpected structure, expected {expected} substructures but found {found} in {context}")]
    UnexpectedStructure {
        expected: usize,
        found: usize,
        context: String,
    },

    #[error("missing tosa operation name in {0}")]
    MissingOperation(String),

    #[error("invalid tosa operation name {0}")]
    InvalidOperation(String),

    #[error("invalid profile name {0}")]
    InvalidProfile(String),

    #[error("invalid type name {0}")]
    InvalidType(String),

    #[error("invalid condition name {0}")]
    InvalidCondition(String),

    #[error("compliance table body not found")]
    MissingTableBody,
}

/// What one verified operation contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub operation: String,
    pub compliance_entries: usize,
    pub type_tuples: usize,
    pub invalid_condition: bool,
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Verify one operation, e.g. `"tosa.add",{{{Profile::pro_int},{{i8T,i32T}}}}`.
pub fn verify_entry(entry: &str) -> Result<EntryReport, VerifyError> {
    let entry = compact(entry);
    check_balance(&entry)?;

    let names: Vec<&str> = OPERATION_RE
        .captures_iter(&entry)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();
    let operation = match names.as_slice() {
        [] => return Err(VerifyError::MissingOperation(entry.clone())),
        [name] => name.to_string(),
        _ => {
            return Err(VerifyError::UnexpectedStructure {
                expected: 1,
                found: names.len(),
                context: entry.clone(),
            });
        }
    };
    if !KNOWN_OPERATIONS.contains(&operation.as_str()) {
        return Err(VerifyError::InvalidOperation(operation));
    }

    let groups = top_level_groups(&entry)?;
    let [body] = groups.as_slice() else {
        return Err(VerifyError::UnexpectedStructure {
            expected: 1,
            found: groups.len(),
            context: operation,
        });
    };

    let mut report = EntryReport {
        operation,
        compliance_entries: 0,
        type_tuples: 0,
        invalid_condition: false,
    };

    for compliance in top_level_groups(body)? {
        if verify_condition_if_present(compliance)? == Some(INVALID_CONDITION) {
            report.invalid_condition = true;
        }

        let parts = top_level_groups(compliance)?;
        let [profiles, type_sets] = parts.as_slice() else {
            return Err(VerifyError::UnexpectedStructure {
                expected: 2,
                found: parts.len(),
                context: compliance.to_string(),
            });
        };

        for profile in profiles.split(',') {
            if !KNOWN_PROFILES.contains(&profile) {
                return Err(VerifyError::InvalidProfile(profile.to_string()));
            }
        }

        for tuple in top_level_groups(type_sets)? {
            verify_type_tuple(tuple)?;
            report.type_tuples += 1;
        }
        report.compliance_entries += 1;
    }

    Ok(report)
}

/// Check the text after the last `}` of a compliance entry, if any.
fn verify_condition_if_present(compliance: &str) -> Result<Option<&str>, VerifyError> {
    let tail = match compliance.rfind('}') {
        Some(last) => &compliance[last + 1..],
        None => compliance,
    };
    if tail.is_empty() {
        return Ok(None);
    }
    let condition = tail.strip_prefix(',').unwrap_or(tail);
    match KNOWN_CONDITIONS.iter().copied().find(|c| *c == condition) {
        Some(known) => Ok(Some(known)),
        None => Err(VerifyError::InvalidCondition(condition.to_string())),
    }
}

/// `i8T,i32T` or the versioned form `{i8T,i32T},SpecificationVersion::V_1_0`.
fn verify_type_tuple(tuple: &str) -> Result<(), VerifyError> {
    let types = if tuple.contains('{') {
        let inner = top_level_groups(tuple)?;
        match inner.as_slice() {
            [types] => *types,
            _ => {
                return Err(VerifyError::UnexpectedStructure {
                    expected: 1,
                    found: inner.len(),
                    context: tuple.to_string(),
                });
            }
        }
    } else {
        tuple
    };

    for ty in types.split(',') {
        if !KNOWN_TYPES.contains(&ty) {
            return Err(VerifyError::InvalidType(ty.to_string()));
        }
    }
    Ok(())
}

/// Verify a whole emitted table, `const T name = { ... };`.
pub fn verify_table(text: &str) -> Result<VerifyReport, VerifyError> {
    let text = compact(text);
    let start = text
        .find(TABLE_BODY_START)
        .map(|i| i + TABLE_BODY_START.len())
        .ok_or(VerifyError::MissingTableBody)?;
    let end = text[start..]
        .find(TABLE_BODY_END)
        .map(|i| start + i)
        .ok_or(VerifyError::MissingTableBody)?;
    let core = &text[start..end];

    check_balance(core)?;

    let mut report = VerifyReport::default();
    for operation in top_level_groups(core)? {
        let entry = verify_entry(operation)?;
        report.operations += 1;
        report.compliance_entries += entry.compliance_entries;
        report.type_tuples += entry.type_tuples;
        if entry.invalid_condition {
            report.invalid_conditions.push(entry.operation);
        }
    }
    Ok(report)
}

/// A known-bad fragment and the error it must produce.
#[derive(Debug, Clone)]
pub struct SelfTestCase {
    pub name: &'static str,
    pub fragment: &'static str,
    pub expected: VerifyError,
}

#[derive(Debug, thiserror::Error)]
pub enum SelfTestError {
    #[error("verifier self-test `{case}` accepted a known-bad fragment")]
    Accepted { case: &'static str },

    #[error("verifier self-test `{case}` expected `{expected}` but got `{actual}`")]
    WrongError {
        case: &'static str,
        expected: VerifyError,
        actual: VerifyError,
    },
}

pub fn self_test_cases() -> Vec<SelfTestCase> {
    vec![
        SelfTestCase {
            name: "unknown operation",
            fragment: r#""tosa.dummy",{{{Profile::pro_int},{{i8T,i32T}}}}"#,
            expected: VerifyError::InvalidOperation("dummy".to_string()),
        },
        SelfTestCase {
            name: "unknown profile",
            fragment: r#""tosa.add",{{{Profile::dummy},{{i8T,i32T}}}}"#,
            expected: VerifyError::InvalidProfile("Profile::dummy".to_string()),
        },
        SelfTestCase {
            name: "unknown extension",
            fragment: r#""tosa.add",{{{Extension::bf16, Extension::dummy},{{i8T,i32T}}}}"#,
            expected: VerifyError::InvalidProfile("Extension::dummy".to_string()),
        },
        SelfTestCase {
            name: "unknown type",
            fragment: r#""tosa.add",{{{Profile::pro_fp},{{i128T,i32T}}}}"#,
            expected: VerifyError::InvalidType("i128T".to_string()),
        },
        SelfTestCase {
            name: "unknown condition",
            fragment: r#""tosa.dim",{{{Extension::bf16,Extension::fp8e4m3},{{bf16T}},dummy}}"#,
            expected: VerifyError::InvalidCondition("dummy".to_string()),
        },
        SelfTestCase {
            name: "extra closing bracket",
            fragment: r#""tosa.sub",{{{Profile::pro_fp},{{i8T,i32T}}}}}"#,
            expected: VerifyError::BracketMismatch,
        },
        SelfTestCase {
            name: "extra opening bracket",
            fragment: r#""tosa.mul",{{{{Profile::pro_fp},{{i8T,i32T}}}}"#,
            expected: VerifyError::BracketMismatch,
        },
    ]
}

/// Run the known-bad battery. Any case that is accepted, or rejected for
/// the wrong reason, means the verifier itself is broken.
pub fn self_test() -> Result<usize, SelfTestError> {
    let cases = self_test_cases();
    for case in &cases {
        match verify_entry(case.fragment) {
            Ok(_) => return Err(SelfTestError::Accepted { case: case.name }),
            Err(actual) if actual != case.expected => {
                return Err(SelfTestError::WrongError {
                    case: case.name,
                    expected: case.expected.clone(),
                    actual,
                });
            }
            Err(_) => {}
        }
    }
    Ok(cases.len())
}
