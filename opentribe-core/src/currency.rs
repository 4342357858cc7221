//! Compact USD formatting for headline figures.

/// Format an amount as compact USD.
///
/// - `>= 1,000,000` renders as `$X.XM` (one decimal)
/// - `>= 1,000` renders as `$XK` (rounded, no decimal)
/// - otherwise `$X` rounded to whole dollars, with thousands separators
///
/// Halves round away from zero. The unit is chosen after rounding, so
/// `999_999.6` is `$1.0M` rather than `$1000K`.
///
/// Non-finite and negative inputs render as `$0`.
pub fn format_compact_usd(amount: f64) -> String {
    let amount = if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    };

    let dollars = amount.round();
    if dollars < 1_000.0 {
        return format!("${}", group_thousands(dollars as u64));
    }

    let thousands = (amount / 1_000.0).round();
    if thousands < 1_000.0 {
        return format!("${}K", thousands as u64);
    }

    let tenths_of_million = (amount / 100_000.0).round();
    format!("${:.1}M", tenths_of_million / 10.0)
}

/// Insert `,` every three digits (`1234567` -> `1,234,567`).
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
