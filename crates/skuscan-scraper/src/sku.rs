//! Normalized SKU keys used for catalog lookups.
//!
//! Keys are never shown to users; the catalog keeps each variant's original
//! SKU for display.

/// How raw SKUs are folded into catalog keys.
///
/// Leading-zero stripping reconciles spreadsheets that dropped the zeros
/// (`"073302"` vs `"73302"`). It is a heuristic: two distinct SKUs such as
/// `"0123"` and `"123"` collapse to one key, and the catalog keeps the one
/// indexed last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkuKeyPolicy {
    pub strip_leading_zeros: bool,
}

impl Default for SkuKeyPolicy {
    fn default() -> Self {
        Self {
            strip_leading_zeros: true,
        }
    }
}

impl SkuKeyPolicy {
    /// Exact matching after trimming and lowercasing only.
    pub const EXACT: Self = Self {
        strip_leading_zeros: false,
    };

    /// Trims, lowercases, and (when enabled) strips leading `'0'`s.
    ///
    /// If stripping would empty the key (`"0"`, `"000"`), the lowercased
    /// form is kept.
    #[must_use]
    pub fn key(self, raw: &str) -> String {
        let lowered = raw.trim().to_lowercase();
        if !self.strip_leading_zeros {
            return lowered;
        }
        let stripped = lowered.trim_start_matches('0');
        if stripped.is_empty() {
            lowered
        } else {
            stripped.to_owned()
        }
    }
}

/// [`SkuKeyPolicy::key`] under the default policy.
#[must_use]
pub fn normalize_sku_key(raw: &str) -> String {
    SkuKeyPolicy::default().key(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_zeros() {
        assert_eq!(normalize_sku_key("073302"), "73302");
        assert_eq!(normalize_sku_key("073302"), normalize_sku_key("73302"));
    }

    #[test]
    fn key_is_stable_under_zero_stripping() {
        for raw in ["073302", "0007", "ABC-1", " 00x9 ", "10", "0A0"] {
            let stripped = raw.trim().trim_start_matches('0');
            assert_eq!(
                normalize_sku_key(raw),
                normalize_sku_key(stripped),
                "raw = {raw:?}"
            );
        }
    }

    #[test]
    fn trims_and_lowercases() {
        assert_eq!(normalize_sku_key("  ABC-1\t"), "abc-1");
    }

    #[test]
    fn all_zero_sku_keeps_lowercased_form() {
        assert_eq!(normalize_sku_key("0"), "0");
        assert_eq!(normalize_sku_key("000"), "000");
    }

    #[test]
    fn only_leading_zeros_are_stripped() {
        assert_eq!(normalize_sku_key("00100"), "100");
    }

    #[test]
    fn exact_policy_keeps_zeros() {
        assert_eq!(SkuKeyPolicy::EXACT.key(" 073302 "), "073302");
        assert_ne!(SkuKeyPolicy::EXACT.key("073302"), SkuKeyPolicy::EXACT.key("73302"));
    }

    #[test]
    fn default_policy_collides_distinct_skus() {
        // Accepted risk of the heuristic: these are different SKUs upstream.
        assert_eq!(normalize_sku_key("0123"), normalize_sku_key("123"));
    }
}
