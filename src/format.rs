//! Compact human-readable renderings of prices and large magnitudes.

/// Rendered for values that cannot be displayed (NaN, infinities).
pub const NOT_AVAILABLE: &str = "N/A";

/// Rendered for optional supply figures the source omits.
pub const MISSING: &str = "not available";

/// Abbreviation scale, smallest first.
const SCALES: [(f64, &str); 5] = [
    (1.0, ""),
    (1e3, "K"),
    (1e6, "M"),
    (1e9, "B"),
    (1e12, "T"),
];

/// Abbreviate a magnitude: `1_500_000.0` → `"1.5M"`, `-2_000.0` → `"-2K"`.
///
/// At most two decimals are kept and trailing zeros are trimmed. A value that
/// rounds up to 1000 of one unit is promoted to the next (`999_999` → `"1M"`).
pub fn format_magnitude(value: f64) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }

    let abs = value.abs();
    let mut idx = SCALES
        .iter()
        .rposition(|(scale, _)| abs >= *scale)
        .unwrap_or(0);
    if round2(abs / SCALES[idx].0) >= 1000.0 && idx + 1 < SCALES.len() {
        idx += 1;
    }

    let (scale, suffix) = SCALES[idx];
    let digits = trim_decimals(abs / scale);
    if digits == "0" {
        return digits;
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{digits}{suffix}")
}

/// Dollar price with thousands separators: `67123.4` → `"$67,123.40"`.
///
/// Sub-dollar prices keep six decimals so small-cap tokens stay readable.
pub fn format_price(value: f64) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    let abs = value.abs();
    let decimals = if abs >= 1.0 || abs == 0.0 { 2 } else { 6 };
    let fixed = format!("{abs:.decimals$}");
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let sign = if value < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    format!("{sign}${}.{frac}", group_thousands(int))
}

/// Signed percentage with two decimals: `Some(1.234)` → `"+1.23%"`.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let sign = if v > 0.0 { "+" } else { "" };
            format!("{sign}{v:.2}%")
        }
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Abbreviated magnitude, or "not available" when the source omitted it.
pub fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), format_magnitude)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn trim_decimals(x: f64) -> String {
    let fixed = format!("{x:.2}");
    fixed
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
