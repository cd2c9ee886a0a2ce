//! Position sizing

/// Quantity for a margin of `order_usdt` at `leverage`
///
/// Notional is `order_usdt * leverage`; the quantity is rounded to six
/// decimals. Returns 0 when the margin or the price is not positive.
pub fn qty_from_order_usdt(order_usdt: f64, leverage: u32, price: f64) -> f64 {
    if !(order_usdt > 0.0) || !(price > 0.0) {
        return 0.0;
    }
    let qty = order_usdt * leverage as f64 / price;
    (qty * 1e6).round() / 1e6
}

/// Quantity worth `notional` at `price`, 0 on non-positive inputs
pub fn qty_for_notional(notional: f64, price: f64) -> f64 {
    if !(notional > 0.0) || !(price > 0.0) {
        return 0.0;
    }
    notional / price
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qty_from_order_usdt() {
        // 5 USDT margin at 3x on a 50_000 contract
        assert_eq!(qty_from_order_usdt(5.0, 3, 50_000.0), 0.0003);
        assert_eq!(qty_from_order_usdt(0.0, 3, 50_000.0), 0.0);
        assert_eq!(qty_from_order_usdt(5.0, 3, 0.0), 0.0);
    }

    #[test]
    fn test_qty_for_notional() {
        assert_eq!(qty_for_notional(100.0, 20.0), 5.0);
        assert_eq!(qty_for_notional(100.0, -1.0), 0.0);
    }
}
