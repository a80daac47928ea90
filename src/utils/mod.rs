//! Utility functions for formatting and common operations
//!
//! This module provides centralized formatting utilities for consistent
//! display of monetary and percentage values throughout the application.
//! Amounts are assumed already normalized to the caller's base currency,
//! so no currency symbol is attached.

use rust_decimal::Decimal;

/// Core formatting function with full control over output.
///
/// Formats a Decimal value with `,` as the thousands separator and `.` as
/// the decimal separator, rounded to two places.
///
/// # Arguments
/// * `value` - The decimal value to format
/// * `width` - Minimum width for padding (0 for no padding, right-aligned)
///
/// # Examples
/// ```
/// use drift::utils::format_amount_with_width;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_amount_with_width(dec!(1234.56), 0), "1,234.56");
/// assert_eq!(format_amount_with_width(dec!(1234), 12), "    1,234.00");
/// ```
pub fn format_amount_with_width(value: Decimal, width: usize) -> String {
    let is_negative = value < Decimal::ZERO;
    let abs_value = value.abs();

    let formatted = format!("{:.2}", abs_value);
    let parts: Vec<&str> = formatted.split('.').collect();

    let integer_part = parts[0];
    let decimal_part = parts.get(1).unwrap_or(&"00");

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let result = format!("{}{}.{}", sign, with_separators, decimal_part);

    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// Format an amount in the base currency: "1,234.56"
///
/// # Examples
/// ```
/// use drift::utils::format_amount;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_amount(dec!(1234.56)), "1,234.56");
/// assert_eq!(format_amount(dec!(-500)), "-500.00");
/// ```
pub fn format_amount(value: Decimal) -> String {
    format_amount_with_width(value, 0)
}

/// Format an amount right-aligned to the specified width.
pub fn format_amount_aligned(value: Decimal, width: usize) -> String {
    format_amount_with_width(value, width)
}

/// Format a percentage with a trailing percent sign: "12.34%"
///
/// # Examples
/// ```
/// use drift::utils::format_percent;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_percent(dec!(12.345)), "12.35%");
/// assert_eq!(format_percent(dec!(-3)), "-3.00%");
/// ```
pub fn format_percent(value: Decimal) -> String {
    format!("{:.2}%", value.round_dp(2))
}

/// Format a signed percentage, keeping an explicit plus sign on gains.
pub fn format_signed_percent(value: Decimal) -> String {
    if value > Decimal::ZERO {
        format!("+{}", format_percent(value))
    } else {
        format_percent(value)
    }
}

/// Format a fractional rate (0.1 = 10%) coming out of the solvers.
pub fn format_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_amount_basic() {
        assert_eq!(format_amount(dec!(1234.56)), "1,234.56");
        assert_eq!(format_amount(dec!(0.99)), "0.99");
        assert_eq!(format_amount(dec!(1000000)), "1,000,000.00");
    }

    #[test]
    fn test_format_amount_small_values() {
        assert_eq!(format_amount(dec!(0)), "0.00");
        assert_eq!(format_amount(dec!(0.01)), "0.01");
        assert_eq!(format_amount(dec!(12)), "12.00");
        assert_eq!(format_amount(dec!(999.99)), "999.99");
    }

    #[test]
    fn test_format_amount_large_values() {
        assert_eq!(format_amount(dec!(1000)), "1,000.00");
        assert_eq!(format_amount(dec!(123456)), "123,456.00");
        assert_eq!(format_amount(dec!(12345678.90)), "12,345,678.90");
    }

    #[test]
    fn test_format_amount_negative() {
        assert_eq!(format_amount(dec!(-1234.56)), "-1,234.56");
        assert_eq!(format_amount(dec!(-0.01)), "-0.01");
    }

    #[test]
    fn test_format_with_width() {
        let result = format_amount_aligned(dec!(100), 10);
        assert_eq!(result.len(), 10);
        assert_eq!(result, "    100.00");
    }

    #[test]
    fn test_format_with_width_no_padding_needed() {
        let result = format_amount_aligned(dec!(1000000), 5);
        assert_eq!(result, "1,000,000.00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(dec!(10)), "10.00%");
        assert_eq!(format_percent(dec!(-2.345)), "-2.35%");
        assert_eq!(format_signed_percent(dec!(1.5)), "+1.50%");
        assert_eq!(format_signed_percent(dec!(-1.5)), "-1.50%");
        assert_eq!(format_signed_percent(dec!(0)), "0.00%");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(0.1), "10.00%");
        assert_eq!(format_rate(-0.0512), "-5.12%");
    }
}
