pub const MISSING: &str = "—";

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

pub fn bytes_to_human(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", BYTE_UNITS[unit])
}

pub fn fmt_optional(value: Option<f64>, digits: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.digits$}"),
        _ => MISSING.to_string(),
    }
}

pub fn fmt_trend(trend: f64) -> String {
    // Adding +0.0 turns -0.0 into 0.0.
    let trend = trend + 0.0;
    let sign = if trend.is_finite() && trend.is_sign_positive() { "+" } else { "" };
    format!("{sign}{}", fmt_optional(Some(trend), 1))
}

/// `Evaluation OK. Mean=201.3 (200.0, 202.6)`
pub fn evaluation_summary(mean: f64, scores: &[f64]) -> String {
    let scores = scores
        .iter()
        .map(|s| format!("{s:.1}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Evaluation OK. Mean={mean:.1} ({scores})")
}

#[cfg(test)]
mod tests {
    use super::{bytes_to_human, evaluation_summary, fmt_optional, fmt_trend, MISSING};

    #[test]
    fn bytes_use_binary_units() {
        assert_eq!(bytes_to_human(0), "0.0 B");
        assert_eq!(bytes_to_human(1023), "1023.0 B");
        assert_eq!(bytes_to_human(1024), "1.0 KB");
        assert_eq!(bytes_to_human(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
    }

    #[test]
    fn bytes_cap_at_terabytes() {
        assert_eq!(bytes_to_human(2048 * 1024u64.pow(4)), "2048.0 TB");
    }

    #[test]
    fn optional_values_fall_back_to_dash() {
        assert_eq!(fmt_optional(None, 1), MISSING);
        assert_eq!(fmt_optional(Some(f64::NAN), 1), MISSING);
        assert_eq!(fmt_optional(Some(0.05), 3), "0.050");
    }

    #[test]
    fn trend_has_explicit_plus() {
        assert_eq!(fmt_trend(20.5), "+20.5");
        assert_eq!(fmt_trend(0.0), "+0.0");
        assert_eq!(fmt_trend(-3.24), "-3.2");
        assert_eq!(fmt_trend(-0.0), "+0.0");
    }

    #[test]
    fn evaluation_summary_lists_scores() {
        assert_eq!(
            evaluation_summary(201.3, &[200.0, 202.6]),
            "Evaluation OK. Mean=201.3 (200.0, 202.6)"
        );
    }
}
