pub mod analytics;
pub mod catalog;
pub mod customers;
pub mod employees;
pub mod inventory;
pub mod kitchen;
pub mod order_status;
pub mod orders;

use rust_decimal::Decimal;

/// Money is kept to cents everywhere it leaves the service layer, always
/// with two decimal places so an empty day reads `0.00`.
pub(crate) fn money(amount: Decimal) -> Decimal {
    let mut cents = amount.round_dp(2);
    cents.rescale(2);
    cents
}

/// Maps an empty or whitespace-only optional string to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_always_prints_cents() {
        assert_eq!(money(Decimal::ZERO).to_string(), "0.00");
        assert_eq!(money(dec!(9.99) * dec!(2)).to_string(), "19.98");
        assert_eq!(money(dec!(7)).to_string(), "7.00");
        assert_eq!(money(dec!(1.005)).to_string(), "1.00");
    }

    #[test]
    fn blank_strings_become_none() {
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(Some(" Extra sauce ".into())), Some("Extra sauce".into()));
        assert_eq!(non_blank(None), None);
    }
}
