use std::sync::LazyLock;

use regex::Regex;

use crate::error::GapFillError;

/// Labels and relationship types are interpolated into Cypher text, so they
/// are restricted to plain identifiers.
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

/// Return `value` unchanged if it is a safe Cypher label or relationship type.
pub fn cypher_identifier(value: &str) -> Result<&str, GapFillError> {
    if IDENTIFIER.is_match(value) {
        Ok(value)
    } else {
        Err(GapFillError::InvalidIdentifier(value.to_string()))
    }
}
