// SPDX-License-Identifier: GPL-3.0-only

//! Tri-state result of a counting inventory query.

/// Outcome of a "how many matches" inventory query.
///
/// A failed query and a query with zero matches are different states and
/// callers must branch on the variant, not on zero-ness. `sentinel` preserves
/// the historical -1 / 0 / N wire encoding for logs and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCount {
    /// The underlying query failed; the true count is unknown.
    Unknown,
    /// The query succeeded and matched this many devices.
    Known(usize),
}

impl DeviceCount {
    /// Historical encoding: -1 for unknown, otherwise the match count.
    pub fn sentinel(self) -> i64 {
        match self {
            DeviceCount::Unknown => -1,
            DeviceCount::Known(count) => count as i64,
        }
    }

    /// True only for a successful query with zero matches.
    pub fn is_none_found(self) -> bool {
        self == DeviceCount::Known(0)
    }
}

#[cfg(test)]
mod tests {
    use super::DeviceCount;

    #[test]
    fn sentinel_is_negative_only_for_unknown() {
        assert_eq!(DeviceCount::Unknown.sentinel(), -1);
        assert_eq!(DeviceCount::Known(0).sentinel(), 0);
        assert_eq!(DeviceCount::Known(3).sentinel(), 3);
    }

    #[test]
    fn zero_matches_is_not_unknown() {
        assert!(DeviceCount::Known(0).is_none_found());
        assert!(!DeviceCount::Unknown.is_none_found());
        assert_ne!(DeviceCount::Unknown, DeviceCount::Known(0));
    }
}
