// ===============================
// src/inventory.rs (inventory skew & rebalance target)
// ===============================
//
// Target desain: 50/50 nilai antara base dan quote (dalam quote).
// - *_pct          : porsi nilai saat ini (0 kalau total 0)
// - *_order_adjust : multiplier % untuk sizing order berikutnya (100 kalau nilai sisi = 0)
// - is_balanced    : 1 kalau base_pct di [31, 69] inklusif
//
use crate::domain::{Balance, InventoryReport};

pub const INVENTORY_MIN_PCT: f64 = 31.0;
pub const INVENTORY_MAX_PCT: f64 = 69.0;

fn find<'a>(balances: &'a [Balance], token: &str) -> Option<&'a Balance> {
    balances.iter().find(|b| b.token == token)
}

fn pct(part: f64, total: f64) -> f64 {
    if total > 0.0 { part / total * 100.0 } else { 0.0 }
}

fn order_adjust(target: f64, value: f64) -> f64 {
    if value > 0.0 { target / value * 100.0 } else { 100.0 }
}

pub fn is_balanced(base_pct: f64) -> bool {
    (INVENTORY_MIN_PCT..=INVENTORY_MAX_PCT).contains(&base_pct)
}

pub fn compute_inventory(
    balances: &[Balance],
    mid_price: f64,
    base_token: &str,
    quote_token: &str,
) -> InventoryReport {
    let zero = Balance::default();
    let base = find(balances, base_token).unwrap_or(&zero);
    let quote = find(balances, quote_token).unwrap_or(&zero);

    let base_value = base.units * mid_price;
    let quote_value = quote.units;
    let total_value = base_value + quote_value;

    let base_pct = pct(base_value, total_value);
    let target = total_value / 2.0;

    InventoryReport {
        base_value,
        quote_value,
        total_value,
        base_pct,
        quote_pct: pct(quote_value, total_value),
        base_order_adjust: order_adjust(target, base_value),
        quote_order_adjust: order_adjust(target, quote_value),
        is_balanced: is_balanced(base_pct) as u8,
        base_total: base.units,
        base_available: base.available_units,
        quote_total: quote.units,
        quote_available: quote.available_units,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bal(token: &str, units: f64, available: f64) -> Balance {
        Balance { token: token.into(), units, available_units: available }
    }

    #[test]
    fn even_split_is_balanced() {
        let r = compute_inventory(&[bal("EQTY", 100.0, 100.0), bal("USDT", 100.0, 100.0)], 1.0, "EQTY", "USDT");
        assert_eq!(r.base_value, 100.0);
        assert_eq!(r.quote_value, 100.0);
        assert_eq!(r.total_value, 200.0);
        assert_eq!(r.base_pct, 50.0);
        assert_eq!(r.quote_pct, 50.0);
        assert_eq!(r.is_balanced, 1);
        assert_eq!(r.base_order_adjust, 100.0);
        assert_eq!(r.quote_order_adjust, 100.0);
    }

    #[test]
    fn empty_balances_default_to_zero() {
        let r = compute_inventory(&[], 1.0, "EQTY", "USDT");
        assert_eq!(r.base_pct, 0.0);
        assert_eq!(r.quote_pct, 0.0);
        assert_eq!(r.total_value, 0.0);
        assert_eq!(r.is_balanced, 0);
        assert_eq!(r.base_order_adjust, 100.0);
        assert_eq!(r.quote_order_adjust, 100.0);
        assert_eq!(r, InventoryReport { base_order_adjust: 100.0, quote_order_adjust: 100.0, ..Default::default() });
        assert_eq!(r, InventoryReport::error_state());
    }

    #[test]
    fn skewed_inventory_scales_orders_toward_target() {
        // 3 BTC at mid 100.0 = 300 vs quote 100
        let r = compute_inventory(&[bal("BTC", 3.0, 1.0), bal("USDT", 100.0, 80.0)], 100.0, "BTC", "USDT");
        assert_eq!(r.total_value, 400.0);
        assert_eq!(r.base_pct, 75.0);
        assert_eq!(r.quote_pct, 25.0);
        assert_eq!(r.is_balanced, 0);
        assert!((r.base_order_adjust - 200.0 / 300.0 * 100.0).abs() < 1e-9);
        assert_eq!(r.quote_order_adjust, 200.0);
        assert_eq!(r.base_available, 1.0);
        assert_eq!(r.quote_available, 80.0);
    }

    #[test]
    fn only_quote_held() {
        let r = compute_inventory(&[bal("USDT", 50.0, 50.0)], 2.0, "EQTY", "USDT");
        assert_eq!(r.base_pct, 0.0);
        assert_eq!(r.quote_pct, 100.0);
        assert_eq!(r.base_order_adjust, 100.0);
        assert_eq!(r.quote_order_adjust, 50.0);
    }

    #[test]
    fn token_match_is_exact() {
        let r = compute_inventory(&[bal("eqty", 100.0, 100.0), bal("USDT", 1.0, 1.0)], 1.0, "EQTY", "USDT");
        assert_eq!(r.base_total, 0.0);
    }

    #[test]
    fn balance_band_is_inclusive() {
        assert!(is_balanced(31.0));
        assert!(is_balanced(69.0));
        assert!(is_balanced(50.0));
        assert!(!is_balanced(30.999_999));
        assert!(!is_balanced(69.000_000_1));
        assert!(!is_balanced(0.0));
    }

    #[test]
    fn band_edges_through_compute() {
        // 31 base vs 69 quote at mid 1.0
        let r = compute_inventory(&[bal("EQTY", 31.0, 0.0), bal("USDT", 69.0, 0.0)], 1.0, "EQTY", "USDT");
        assert_eq!(r.base_pct, 31.0);
        assert_eq!(r.is_balanced, 1);
        let r = compute_inventory(&[bal("EQTY", 69.0, 0.0), bal("USDT", 31.0, 0.0)], 1.0, "EQTY", "USDT");
        assert_eq!(r.base_pct, 69.0);
        assert_eq!(r.is_balanced, 1);
    }
}
