//! Balanced curly-bracket extraction.
//!
//! Table entries nest several levels deep (operation, entry, token set,
//! tuple), so extraction counts depth instead of pattern matching.

use crate::compliance::verify::VerifyError;

/// Fails unless every `}` closes an earlier `{` and nothing is left open.
pub fn check_balance(text: &str) -> Result<(), VerifyError> {
    let mut depth = 0usize;
    for b in text.bytes() {
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.checked_sub(1).ok_or(VerifyError::BracketMismatch)?,
            _ => {}
        }
    }
    if depth != 0 {
        return Err(VerifyError::BracketMismatch);
    }
    Ok(())
}

/// Contents of every top-level `{...}` group, without the outer brackets.
/// Text outside the groups is skipped.
///
/// `a,{x,{y}},{z}` yields `["x,{y}", "z"]`.
pub fn top_level_groups(text: &str) -> Result<Vec<&str>, VerifyError> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, b) in text.bytes().enumerate() {
        match b {
            b'{' => {
                if depth == 0 {
                    start = i + 1;
                }
                depth += 1;
            }
            b'}' => {
                depth = depth.checked_sub(1).ok_or(VerifyError::BracketMismatch)?;
                if depth == 0 {
                    groups.push(&text[start..i]);
                }
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(VerifyError::BracketMismatch);
    }
    Ok(groups)
}
