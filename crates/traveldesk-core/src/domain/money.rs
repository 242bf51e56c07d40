//! Currency formatting

use rust_decimal::{Decimal, RoundingStrategy};

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Whole-dollar rendering with thousands separators, e.g. `$12,500`.
pub fn format_usd(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let grouped = group_thousands(&rounded.abs().trunc().to_string());

    if negative {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Rendering with cents, e.g. `$1,234.50`. Used on invoices and reminders.
pub fn format_usd_cents(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let abs = rounded.abs();
    let dollars = group_thousands(&abs.trunc().to_string());
    let cents = ((abs.fract() * Decimal::ONE_HUNDRED).round()).to_string();

    format!("{}${}.{:0>2}", if negative { "-" } else { "" }, dollars, cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(dec!(0)), "$0");
        assert_eq!(format_usd(dec!(950)), "$950");
        assert_eq!(format_usd(dec!(1500)), "$1,500");
        assert_eq!(format_usd(dec!(1234567.40)), "$1,234,567");
        assert_eq!(format_usd(dec!(-2500)), "-$2,500");
    }

    #[test]
    fn test_format_usd_cents() {
        assert_eq!(format_usd_cents(dec!(0)), "$0.00");
        assert_eq!(format_usd_cents(dec!(1234.5)), "$1,234.50");
        assert_eq!(format_usd_cents(dec!(99.999)), "$100.00");
        assert_eq!(format_usd_cents(dec!(-12.05)), "-$12.05");
    }
}
