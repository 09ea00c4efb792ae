use regex::Regex;
use std::sync::OnceLock;

fn non_numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\d.\-]").expect("invalid numeric filter regex"))
}

/// Coerces free text to a number with a permissive digit/sign/decimal filter.
///
/// Thousands separators and currency glyphs ("1,234,567원", "₩1,000",
/// "$1,234.56") are stripped before parsing. Anything that still fails to
/// parse yields 0.0; this function never errors.
pub fn coerce_number(text: &str) -> f64 {
    let cleaned = non_numeric_re().replace_all(text.trim(), "");
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Like [`coerce_number`] but keeps `None` for text with no digits at all,
/// so callers can tell "missing" apart from a genuine zero.
pub fn coerce_number_opt(text: &str) -> Option<f64> {
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(coerce_number(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_separators_and_glyphs() {
        assert_eq!(coerce_number("1,234,567"), 1_234_567.0);
        assert_eq!(coerce_number("1,234,567원"), 1_234_567.0);
        assert_eq!(coerce_number("₩1,000"), 1_000.0);
        assert_eq!(coerce_number("$1,234.56"), 1_234.56);
        assert_eq!(coerce_number("  42  "), 42.0);
    }

    #[test]
    fn keeps_sign() {
        assert_eq!(coerce_number("-1,000"), -1_000.0);
        assert_eq!(coerce_number("-500원"), -500.0);
    }

    #[test]
    fn unparsable_yields_zero_and_never_panics() {
        assert_eq!(coerce_number(""), 0.0);
        assert_eq!(coerce_number("n/a"), 0.0);
        assert_eq!(coerce_number("--"), 0.0);
        assert_eq!(coerce_number("1.2.3.4-5"), 0.0);
    }

    #[test]
    fn opt_distinguishes_missing_from_zero() {
        assert_eq!(coerce_number_opt("없음"), None);
        assert_eq!(coerce_number_opt("0"), Some(0.0));
        assert_eq!(coerce_number_opt("0원"), Some(0.0));
    }
}
