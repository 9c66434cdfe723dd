//! Keystroke-level filtering for numeric amount fields.

/// Returns `true` if `s` is an acceptable in-progress numeric entry.
///
/// An acceptable entry is zero or more ASCII digits, optionally followed by a single `.` and zero
/// or more ASCII digits. This is deliberately looser than [`crate::EthAmount::parse_ether`]: the
/// empty string, `"."` and `"12."` are all valid intermediate states while typing.
pub fn is_numeric_entry(s: &str) -> bool {
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    whole.bytes().all(|b| b.is_ascii_digit()) && frac.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_partial_numbers() {
        for s in ["", "12", "12.5", "12.", ".5", ".", "007"] {
            assert!(is_numeric_entry(s), "{s:?} should be accepted");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for s in ["12.5.6", "abc", "-1", "1e5", " 1", "1,5", "+2", "١٢"] {
            assert!(!is_numeric_entry(s), "{s:?} should be rejected");
        }
    }
}
