//! Base-unit to display-unit conversion

/// Convert an integer amount of base units into display units
///
/// The whole and fractional parts are converted separately so large balances
/// keep their fractional digits and a nonzero amount never becomes `0.0`.
pub fn to_display_units(amount: u128, decimals: u32) -> f64 {
    if amount == 0 {
        return 0.0;
    }
    let value = match 10u128.checked_pow(decimals) {
        Some(divisor) => {
            let whole = amount / divisor;
            let fraction = amount % divisor;
            whole as f64 + fraction as f64 / divisor as f64
        }
        None => amount as f64 / 10f64.powi(decimals as i32),
    };

    if value == 0.0 {
        f64::MIN_POSITIVE
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_units() {
        assert_eq!(to_display_units(100_000_000, 8), 1.0);
        assert_eq!(to_display_units(1_500_000, 6), 1.5);
        assert_eq!(to_display_units(2_000_000_000_000_000_000, 18), 2.0);
        assert_eq!(to_display_units(0, 9), 0.0);
    }

    #[test]
    fn test_one_wei_is_nonzero() {
        let v = to_display_units(1, 18);
        assert!(v > 0.0);
        assert!((v - 1e-18).abs() < 1e-30);
    }

    #[test]
    fn test_twelve_decimal_digits_survive() {
        // 1.000000000001 ETH
        let v = to_display_units(1_000_000_000_001_000_000, 18);
        assert!(v > 1.0);
        assert!((v - 1.000000000001).abs() < 1e-13);

        // 123.456789012345 SOL in lamports keeps its fraction
        let v = to_display_units(123_456_789_012, 9);
        assert!((v - 123.456789012).abs() < 1e-9);
    }

    #[test]
    fn test_huge_decimals_do_not_panic() {
        assert!(to_display_units(1, 60) > 0.0);
    }
}
