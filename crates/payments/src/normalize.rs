/// Prefixes collapsed to the domestic trunk prefix, checked in order.
const MOBILE_PREFIXES: [&str; 3] = ["+628", "628", "08"];

/// Rewrites an Indonesian mobile number to start with `08`.
///
/// Only the first matching prefix is replaced; numbers without a known
/// prefix are returned unchanged.
pub fn normalize_mobile(number: &str) -> String {
    MOBILE_PREFIXES
        .iter()
        .find_map(|prefix| number.strip_prefix(prefix))
        .map(|rest| format!("08{rest}"))
        .unwrap_or_else(|| number.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn international_and_trunk_forms_normalize_alike() {
        for number in ["+628119621992", "628119621992", "08119621992"] {
            assert_eq!(normalize_mobile(number), "08119621992", "{number}");
        }
    }

    #[test]
    fn only_the_leading_prefix_is_replaced() {
        assert_eq!(normalize_mobile("+62808628"), "0808628");
    }

    #[test]
    fn unknown_prefix_is_untouched() {
        assert_eq!(normalize_mobile("021555123"), "021555123");
        assert_eq!(normalize_mobile(""), "");
    }
}
