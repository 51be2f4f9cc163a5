//! Number rendering shared by price levels and display output.

/// Render a price with five decimals, dropping trailing zeros and a bare
/// trailing decimal point: `1.10000` -> `"1.1"`, `100.0` -> `"100"`.
pub fn format_price(price: f64) -> String {
    let fixed = format!("{price:.5}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Round a price to its five-decimal canonical value.
///
/// Two prices that only differ beyond the fifth decimal map to the same value.
pub fn canonical_price(price: f64) -> Option<f64> {
    if !price.is_finite() {
        return None;
    }
    format_price(price).parse().ok()
}
