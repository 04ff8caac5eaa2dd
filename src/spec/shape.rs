//! Rank implied by an argument's shape descriptor.
//!
//! Shapes come in three forms: a named shape (`shape1`), a fixed count
//! (`[2]`, always rank 1), and a bracketed dimension list (`[N,H,W,C]`).
//! Only the bracketed forms say anything about rank.

use crate::Result;
use crate::diagnostics;

use anyhow::bail;
use regex::Regex;
use std::sync::LazyLock;

static FIXED_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(\d+)\]").expect("fixed count shape pattern"));

static DIM_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(.*)\]").expect("dimension list shape pattern"));

/// Returns the rank a shape descriptor implies, or `None` when the shape
/// is not rank-checkable (no brackets, or an empty `[]`).
pub fn implied_rank(shape: &str) -> Result<Option<u32>> {
    if !shape.contains('[') || shape.contains("[]") {
        return Ok(None);
    }
    if FIXED_COUNT_RE.is_match(shape) {
        return Ok(Some(1));
    }
    match DIM_LIST_RE.captures(shape).and_then(|c| c.get(1)) {
        Some(dims) => Ok(Some(dims.as_str().split(',').count() as u32)),
        None => bail!(
            "{}",
            diagnostics::error_message(format!("unable to parse shape {}", shape))
        ),
    }
}
