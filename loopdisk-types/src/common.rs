// SPDX-License-Identifier: GPL-3.0-only

//! Small string-normalization helpers shared across the workspace.

/// Trim a value and discard it entirely when nothing is left.
pub fn non_empty_trimmed(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Normalize a volume label: trimmed and lower-cased, or dropped when blank.
pub fn normalize_label(raw: &str) -> Option<String> {
    non_empty_trimmed(raw).map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::{non_empty_trimmed, normalize_label};

    #[test]
    fn blank_strings_are_dropped() {
        assert_eq!(non_empty_trimmed("  "), None);
        assert_eq!(non_empty_trimmed(""), None);
        assert_eq!(non_empty_trimmed(" x "), Some("x"));
    }

    #[test]
    fn labels_are_trimmed_and_lowered() {
        assert_eq!(normalize_label(" Service Data "), Some("service data".to_string()));
        assert_eq!(normalize_label("\t"), None);
    }
}
