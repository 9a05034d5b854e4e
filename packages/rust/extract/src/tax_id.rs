//! 14-digit company tax identifiers and their mod-11 check digits.

use std::sync::LazyLock;

use regex::Regex;

const FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// 2-3-3-4-2 digit groups with optional `.`, `/`, and `-` separators.
static TAX_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{2}\.?[0-9]{3}\.?[0-9]{3}/?[0-9]{4}-?[0-9]{2}").expect("valid regex")
});

fn check_digit(digits: &[u8], weights: &[u32]) -> u8 {
    let sum: u32 = digits
        .iter()
        .zip(weights)
        .map(|(&d, &w)| u32::from(d) * w)
        .sum();
    let rem = sum % 11;
    if rem < 2 { 0 } else { (11 - rem) as u8 }
}

/// Compute both verification digits for a 12-digit base.
///
/// Each element of `base` must be in `0..=9`.
pub fn check_digits(base: &[u8; 12]) -> (u8, u8) {
    let first = check_digit(base, &FIRST_WEIGHTS);

    let mut extended = [0u8; 13];
    extended[..12].copy_from_slice(base);
    extended[12] = first;
    let second = check_digit(&extended, &SECOND_WEIGHTS);

    (first, second)
}

/// Whether `candidate` is exactly 14 ASCII digits with valid check digits.
///
/// Strings of one repeated digit are rejected even though some of them
/// satisfy the arithmetic.
pub fn is_valid_tax_id(candidate: &str) -> bool {
    if candidate.len() != 14 || !candidate.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let digits: Vec<u8> = candidate.bytes().map(|b| b - b'0').collect();
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let mut base = [0u8; 12];
    base.copy_from_slice(&digits[..12]);
    let (first, second) = check_digits(&base);

    first == digits[12] && second == digits[13]
}

/// Find every validated tax identifier in `text`, in order of appearance.
///
/// Matches are reduced to bare digits. Repeats are kept.
pub(crate) fn find_tax_ids(text: &str) -> Vec<String> {
    TAX_ID_RE
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .chars()
                .filter(char::is_ascii_digit)
                .collect::<String>()
        })
        .filter(|digits| is_valid_tax_id(digits))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic stream of 12-digit bases.
    fn bases(count: usize) -> Vec<[u8; 12]> {
        let mut state: u64 = 0x5EED_CAFE_F00D_1234;
        (0..count)
            .map(|_| {
                let mut base = [0u8; 12];
                for digit in &mut base {
                    state = state
                        .wrapping_mul(6_364_136_223_846_793_005)
                        .wrapping_add(1_442_695_040_888_963_407);
                    *digit = ((state >> 33) % 10) as u8;
                }
                base
            })
            .collect()
    }

    fn assemble(base: &[u8; 12]) -> String {
        let (first, second) = check_digits(base);
        base.iter()
            .chain([first, second].iter())
            .map(|d| char::from(b'0' + d))
            .collect()
    }

    #[test]
    fn known_identifiers() {
        assert!(is_valid_tax_id("11222333000181"));
        assert!(is_valid_tax_id("11444777000161"));
        assert!(!is_valid_tax_id("11222333000182"));
        assert!(!is_valid_tax_id("11444777000160"));
    }

    #[test]
    fn wrong_length_or_non_digits_rejected() {
        assert!(!is_valid_tax_id(""));
        assert!(!is_valid_tax_id("1122233300018"));
        assert!(!is_valid_tax_id("112223330001811"));
        assert!(!is_valid_tax_id("11.222.333/0001-81"));
        assert!(!is_valid_tax_id("1122233300018a"));
    }

    #[test]
    fn repeated_digit_strings_rejected() {
        for d in 0..=9u8 {
            let candidate: String = std::iter::repeat_n(char::from(b'0' + d), 14).collect();
            assert!(!is_valid_tax_id(&candidate), "{candidate} accepted");
        }
    }

    #[test]
    fn computed_check_digits_always_validate() {
        for base in bases(2_000) {
            if base.iter().all(|&d| d == base[0]) {
                continue;
            }
            let id = assemble(&base);
            assert!(is_valid_tax_id(&id), "{id} rejected");
        }
    }

    #[test]
    fn flipping_a_check_digit_always_rejects() {
        for base in bases(500) {
            let id = assemble(&base);
            for pos in [12, 13] {
                for replacement in b'0'..=b'9' {
                    let mut bytes = id.clone().into_bytes();
                    if bytes[pos] == replacement {
                        continue;
                    }
                    bytes[pos] = replacement;
                    let flipped = String::from_utf8(bytes).unwrap();
                    assert!(!is_valid_tax_id(&flipped), "{flipped} accepted");
                }
            }
        }
    }

    #[test]
    fn flipping_a_base_digit_almost_always_rejects() {
        // Remainders 0 and 1 share check digit 0, so a flip that moves both
        // sums between them goes unnoticed. That is rare, not impossible.
        let mut flips = 0usize;
        let mut rejected = 0usize;

        for base in bases(500) {
            let id = assemble(&base);
            for pos in 0..12 {
                for replacement in b'0'..=b'9' {
                    let mut bytes = id.clone().into_bytes();
                    if bytes[pos] == replacement {
                        continue;
                    }
                    bytes[pos] = replacement;
                    let flipped = String::from_utf8(bytes).unwrap();
                    flips += 1;
                    if !is_valid_tax_id(&flipped) {
                        rejected += 1;
                    }
                }
            }
        }

        assert!(rejected * 100 >= flips * 99, "{rejected}/{flips} rejected");
    }

    #[test]
    fn finds_punctuated_and_bare_identifiers() {
        let text = "CNPJ: 11.222.333/0001-81 e também 11444777000161. Inválido: 11.222.333/0001-80";
        assert_eq!(find_tax_ids(text), vec!["11222333000181", "11444777000161"]);
    }

    #[test]
    fn repeated_identifiers_are_kept() {
        let text = "11.222.333/0001-81 ... rodapé 11.222.333/0001-81";
        assert_eq!(find_tax_ids(text).len(), 2);
    }
}
