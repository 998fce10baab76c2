//! Blank-value checks for optional text inputs.

/// Returns whether `value` is absent or has zero length.
pub fn is_null_or_empty(value: Option<&str>) -> bool {
    value.map_or(true, str::is_empty)
}

/// Returns whether `value` is absent or contains only whitespace.
pub fn is_null_or_white_space(value: Option<&str>) -> bool {
    value.map_or(true, |text| text.trim().is_empty())
}
