// Price inputs use the es-CO convention: `.` groups thousands, `,` marks
// decimals. Grouping only kicks in from five integer digits on
// (`1000` stays `1000`, `10000` becomes `10.000`).

/// A price input after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceInput {
    /// Non-negative amount, or `None` when the text did not parse.
    pub value: Option<f64>,
    /// Text to show back in the input.
    pub display: String,
}

/// Parse an es-CO formatted amount (`"$ 25.000,50"` -> `25000.5`).
pub fn parse_price(raw: &str) -> Option<f64> {
    let sanitized: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .filter(|c| *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if sanitized.is_empty() {
        return None;
    }
    sanitized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse, clamp to zero, round to `decimals` and re-format.
pub fn normalize_price_input(raw: &str, decimals: u8) -> PriceInput {
    let Some(parsed) = parse_price(raw) else {
        return PriceInput {
            value: None,
            display: raw.to_owned(),
        };
    };

    let factor = 10f64.powi(i32::from(decimals));
    let value = ((parsed * factor).round() / factor).max(0.0);

    PriceInput {
        value: Some(value),
        display: format_price(value, decimals),
    }
}

/// Format a non-negative amount with exactly `decimals` fraction digits.
pub fn format_price(value: f64, decimals: u8) -> String {
    let fixed = format!("{:.*}", usize::from(decimals), value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if !frac_part.is_empty() {
        out.push(',');
        out.push_str(frac_part);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    if digits.len() < 5 {
        return digits.to_owned();
    }
    let lead = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - lead) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
