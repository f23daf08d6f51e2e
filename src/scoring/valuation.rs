/// Floor for any valuation. Degenerate and non-positive scores land here.
pub const MIN_VALUE: f64 = 90.0;

/// Hard global cap shared by Items and Composites.
pub const MAX_VALUE: f64 = 964_590_650_869_860_860.97;

/// Linear bands: `(upper bound exclusive, offset, slope)`.
const LINEAR_BANDS: &[(f64, f64, f64)] = &[
    (100.0, MIN_VALUE, 0.5),
    (500.0, 100.0, 2.0),
    (2_000.0, 1_000.0, 10.0),
    (10_000.0, 20_000.0, 100.0),
    (100_000.0, 1_000_000.0, 5_000.0),
];

const TAIL_BASE: f64 = 100_000_000_000.0;
const TAIL_UNIT: f64 = 100_000_000_000.0;
const TAIL_SCALE: f64 = 1_000_000.0;

/// Index of the band `score` falls in, 0-based. The tail band is
/// `LINEAR_BANDS.len()`.
pub fn band_index(score: f64) -> usize {
    if score.is_nan() || score <= 0.0 {
        return 0;
    }
    LINEAR_BANDS
        .iter()
        .position(|(upper, _, _)| score < *upper)
        .unwrap_or(LINEAR_BANDS.len())
}

/// Map a score onto the valuation schedule.
///
/// Strictly increasing for positive scores below the cap, total over all `f64`
/// (NaN and non-positive scores yield `MIN_VALUE`), clamped to
/// `[MIN_VALUE, MAX_VALUE]`.
pub fn value_for_score(score: f64) -> f64 {
    if score.is_nan() || score <= 0.0 {
        return MIN_VALUE;
    }

    let raw = match LINEAR_BANDS.get(band_index(score)) {
        Some((_, offset, slope)) => offset + score * slope,
        None => TAIL_BASE + score.log10() * TAIL_UNIT * (score / TAIL_SCALE),
    };

    if raw.is_nan() {
        return MAX_VALUE;
    }
    raw.clamp(MIN_VALUE, MAX_VALUE)
}

/// Human-readable currency rendering.
pub fn format_value(value: f64) -> String {
    if value >= 1_000_000_000_000.0 {
        format!("${}", group_thousands(value))
    } else if value >= 1_000_000_000.0 {
        format!("${:.2}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("${:.2}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("${:.2}K", value / 1_000.0)
    } else {
        format!("${value:.2}")
    }
}

fn group_thousands(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }
    format!("{grouped}.{frac_part}")
}
