// Utility helpers for cell parsing, quantiles, and number formatting.
//
// This module centralizes all the "dirty" CSV cell handling so the rest of
// the code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};

/// Parse a survey cell into `f64`, treating anything unparseable as missing.
///
/// Thousands separators are dropped first, so `1,250.5` and `2.5e3` both
/// parse. `NaN` and infinities come back as `None`.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Missing or negative currency amounts count as zero.
pub fn non_negative_amount(s: Option<&str>) -> f64 {
    parse_f64_safe(s).unwrap_or(0.0).max(0.0)
}

/// Normalise a household id so both tables agree on the join key.
///
/// Survey exports sometimes write integral ids as floats (`1001.0`) in one
/// table and as integers in the other.
pub fn normalize_household_id(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<f64>() {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
            return Some(format!("{}", v as i64));
        }
    }
    Some(s.to_string())
}

/// Quantile of an already sorted slice using linear interpolation between
/// the two nearest ranks. `None` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

// `tabled` display hooks for the report rows.

pub fn display_amount(v: &f64) -> String {
    format_number(*v, 2)
}

pub fn display_optional(v: &Option<f64>) -> String {
    match v {
        Some(v) => format_number(*v, 2),
        None => "n/a".to_string(),
    }
}

pub fn display_blank(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_text_and_strips_separators() {
        assert_eq!(parse_f64_safe(Some(" 1,250.5 ")), Some(1250.5));
        assert_eq!(parse_f64_safe(Some("-30")), Some(-30.0));
        assert_eq!(parse_f64_safe(Some("2.5e3")), Some(2500.0));
        assert_eq!(parse_f64_safe(Some("1.2E5")), Some(120000.0));
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(Some("inf")), None);
        assert_eq!(parse_f64_safe(Some("abc")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn amounts_are_clamped_and_defaulted() {
        assert_eq!(non_negative_amount(Some("-5")), 0.0);
        assert_eq!(non_negative_amount(None), 0.0);
        assert_eq!(non_negative_amount(Some("12")), 12.0);
    }

    #[test]
    fn household_ids_join_across_float_and_int_forms() {
        assert_eq!(normalize_household_id(Some("1001.0")), Some("1001".to_string()));
        assert_eq!(normalize_household_id(Some(" 1001 ")), Some("1001".to_string()));
        assert_eq!(normalize_household_id(Some("A-17")), Some("A-17".to_string()));
        assert_eq!(normalize_household_id(Some("  ")), None);
    }

    #[test]
    fn quartiles_interpolate() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.5), Some(2.5));
        assert_eq!(quantile(&v, 0.25), Some(1.75));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn numbers_get_thousands_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.0, 1), "-42.0");
        assert_eq!(display_optional(&None), "n/a");
    }
}
