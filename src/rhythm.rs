//! # Recip Rhythm Conversion
//!
//! Converts Humdrum reciprocal rhythm notation ("recip") to and from exact
//! durations. All durations are in whole-note units.
//!
//! ## Grammar
//! ```text
//! 4      quarter note           1/4
//! 4.     dotted quarter         3/8
//! 8..    double-dotted eighth   7/32
//! 0      breve                  2
//! 00     long                   4
//! 3%2    two thirds of a whole  2/3   (denominator % numerator)
//! 8q     grace note             0
//! ```
//!
//! Only the first space-separated sub-token is examined, so a chord such as
//! `4c 4e 4g` has the duration of `4c`.

use crate::rational::Rational;

/// Duration of a recip string in whole notes.
///
/// Grace notes (any `q`) and tokens without digits have zero duration.
pub fn recip_to_duration(recip: &str) -> Rational {
    let subtoken = recip.split(' ').next().unwrap_or("");
    if subtoken.contains('q') {
        return Rational::zero();
    }

    let base = match ratio_form(subtoken) {
        Some((denominator, numerator)) => Rational::new(numerator, denominator),
        None => match first_digit_run(subtoken) {
            None => return Rational::zero(),
            Some(digits) => {
                if digits.starts_with('0') && digits.bytes().all(|b| b == b'0') {
                    // Each zero doubles the breve.
                    let zeros = digits.len().min(62) as u32;
                    Rational::from_integer(1i64 << zeros)
                } else {
                    match digits.parse::<i64>() {
                        Ok(denominator) => Rational::new(1, denominator),
                        Err(_) => Rational::non_finite(),
                    }
                }
            }
        },
    };

    &base * &dot_factor(dot_count(subtoken))
}

/// Number of augmentation dots in the first sub-token.
pub fn dot_count(recip: &str) -> usize {
    recip
        .split(' ')
        .next()
        .map(|s| s.chars().filter(|&c| c == '.').count())
        .unwrap_or(0)
}

/// Multiplier applied by `dots` augmentation dots: `(2^(d+1) - 1) / 2^d`.
pub fn dot_factor(dots: usize) -> Rational {
    if dots == 0 {
        return Rational::one();
    }
    let dots = dots.min(60) as u32;
    let denominator = 1i64 << dots;
    Rational::new(2 * denominator - 1, denominator)
}

/// Recip string for a duration in whole notes, preferring simple and
/// dotted forms and falling back to `denominator%numerator`.
///
/// Returns `None` for negative or non-finite durations.
pub fn duration_to_recip(duration: &Rational) -> Option<String> {
    if !duration.is_non_negative() {
        return None;
    }
    if duration.is_zero() {
        return Some("q".to_string());
    }
    if let Some(text) = simple_recip(duration) {
        return Some(text);
    }
    for dots in 1..=3 {
        let undotted = duration / &dot_factor(dots);
        if let Some(text) = simple_recip(&undotted) {
            return Some(format!("{}{}", text, ".".repeat(dots)));
        }
    }
    let numerator = duration.numerator()?;
    let denominator = duration.denominator()?;
    Some(format!("{}%{}", denominator, numerator))
}

fn simple_recip(duration: &Rational) -> Option<String> {
    let numerator = duration.numerator()?;
    let denominator = duration.denominator()?;
    if numerator == 1 {
        return Some(denominator.to_string());
    }
    if denominator == 1 && numerator > 1 && (numerator & (numerator - 1)) == 0 {
        let zeros = numerator.trailing_zeros() as usize;
        return Some("0".repeat(zeros));
    }
    None
}

fn ratio_form(text: &str) -> Option<(i64, i64)> {
    let percent = text.find('%')?;
    let before = &text[..percent];
    let after = &text[percent + 1..];
    let start = before
        .rfind(|c: char| !c.is_ascii_digit())
        .map_or(0, |i| i + 1);
    let denominator = before[start..].parse::<i64>().ok()?;
    let numerator = first_digit_run(after)
        .filter(|_| after.starts_with(|c: char| c.is_ascii_digit()))?
        .parse::<i64>()
        .ok()?;
    Some((denominator, numerator))
}

fn first_digit_run(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_recip() {
        assert_eq!(recip_to_duration("4c"), Rational::new(1, 4));
        assert_eq!(recip_to_duration("16"), Rational::new(1, 16));
        assert_eq!(recip_to_duration("1r"), Rational::one());
    }

    #[test]
    fn test_dotted_recip() {
        assert_eq!(recip_to_duration("4.c"), Rational::new(3, 8));
        assert_eq!(recip_to_duration("8..d"), Rational::new(7, 32));
        assert_eq!(dot_count("4..c 8.d"), 2);
    }

    #[test]
    fn test_breve_and_long() {
        assert_eq!(recip_to_duration("0C"), Rational::from_integer(2));
        assert_eq!(recip_to_duration("00C"), Rational::from_integer(4));
        assert_eq!(recip_to_duration("0.C"), Rational::from_integer(3));
    }

    #[test]
    fn test_ratio_recip() {
        assert_eq!(recip_to_duration("3%2"), Rational::new(2, 3));
        assert_eq!(recip_to_duration("3%2.c"), Rational::new(1, 1));
    }

    #[test]
    fn test_grace_and_digitless() {
        assert!(recip_to_duration("8qc").is_zero());
        assert!(recip_to_duration("qq").is_zero());
        assert!(recip_to_duration("cc#").is_zero());
    }

    #[test]
    fn test_chord_uses_first_subtoken() {
        assert_eq!(recip_to_duration("4c 8e 2g"), Rational::new(1, 4));
    }

    #[test]
    fn test_duration_to_recip() {
        assert_eq!(duration_to_recip(&Rational::new(1, 4)).as_deref(), Some("4"));
        assert_eq!(duration_to_recip(&Rational::new(3, 8)).as_deref(), Some("4."));
        assert_eq!(duration_to_recip(&Rational::new(7, 16)).as_deref(), Some("4.."));
        assert_eq!(duration_to_recip(&Rational::from_integer(2)).as_deref(), Some("0"));
        assert_eq!(duration_to_recip(&Rational::from_integer(4)).as_deref(), Some("00"));
        assert_eq!(duration_to_recip(&Rational::new(2, 5)).as_deref(), Some("5%2"));
        assert_eq!(duration_to_recip(&Rational::zero()).as_deref(), Some("q"));
        assert_eq!(duration_to_recip(&Rational::non_finite()), None);
    }
}
