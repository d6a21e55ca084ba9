/// Currency suffix shown after prices
const CURRENCY: &str = "Rwf";

/// Format a price with thousands separators, e.g. `15,000 Rwf`
pub fn format_price(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative {
        format!("-{} {}", grouped, CURRENCY)
    } else {
        format!("{} {}", grouped, CURRENCY)
    }
}

/// Format a rating to one decimal, or `N/A` when there is none
pub fn format_rating(rating: Option<f64>) -> String {
    match rating {
        Some(r) if r > 0.0 => format!("{:.1}", r),
        _ => "N/A".to_string(),
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.0), "0 Rwf");
        assert_eq!(format_price(950.0), "950 Rwf");
        assert_eq!(format_price(15000.0), "15,000 Rwf");
        assert_eq!(format_price(1234567.0), "1,234,567 Rwf");
        assert_eq!(format_price(-2500.0), "-2,500 Rwf");
    }

    #[test]
    fn test_format_rating() {
        assert_eq!(format_rating(Some(4.56)), "4.6");
        assert_eq!(format_rating(Some(0.0)), "N/A");
        assert_eq!(format_rating(None), "N/A");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Ikiringo cyiza", 3), "Iki");
    }
}
