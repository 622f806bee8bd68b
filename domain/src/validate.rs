//! Lightweight input validation helpers. Keep logic minimal and deterministic.

use crate::CoreError;

/// Largest batch a single fetch may ask for.
pub const MAX_COUNT: i64 = 100_000;

/// Reject negative counts and counts above `MAX_COUNT`. Zero is allowed and
/// means "no users".
pub fn validate_count(count: i64) -> Result<usize, CoreError> {
    if count > MAX_COUNT {
        return Err(CoreError::InvalidArgument(format!(
            "count must be at most {}, got {}",
            MAX_COUNT, count
        )));
    }
    usize::try_from(count)
        .map_err(|_| CoreError::InvalidArgument(format!("count must not be negative, got {}", count)))
}

/// Reject counts that are zero or negative.
pub fn validate_positive_count(count: i64) -> Result<usize, CoreError> {
    if count <= 0 {
        return Err(CoreError::InvalidArgument(format!(
            "count must be a positive integer, got {}",
            count
        )));
    }
    validate_count(count)
}

/// Table names cannot be bound as parameters, so only plain identifiers
/// (`[A-Za-z_][A-Za-z0-9_]*`) are accepted.
pub fn validate_table_name(name: &str) -> Result<(), CoreError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(CoreError::InvalidArgument("table name is empty".into()));
    };
    if !(first.is_ascii_alphabetic() || first == '_')
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(CoreError::InvalidArgument(format!(
            "invalid table name '{}'",
            name
        )));
    }
    Ok(())
}
