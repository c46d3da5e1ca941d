// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

use crate::config::ExchangeCfg;
use crate::domain::ExchangeMetrics;

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

fn gauge_vec(name: &str, help: &str) -> GaugeVec {
    GaugeVec::new(Opts::new(name, help), &["exchange"]).unwrap()
}

// -------- Inventory (per exchange) --------
pub static BASE_PCT: Lazy<GaugeVec> =
    Lazy::new(|| gauge_vec("mm_inventory_base_pct", "base share of total value (%)"));
pub static QUOTE_PCT: Lazy<GaugeVec> =
    Lazy::new(|| gauge_vec("mm_inventory_quote_pct", "quote share of total value (%)"));
pub static BASE_ADJUST: Lazy<GaugeVec> =
    Lazy::new(|| gauge_vec("mm_base_order_adjust", "base order size multiplier toward 50/50 (%)"));
pub static QUOTE_ADJUST: Lazy<GaugeVec> =
    Lazy::new(|| gauge_vec("mm_quote_order_adjust", "quote order size multiplier toward 50/50 (%)"));
pub static IS_BALANCED: Lazy<GaugeVec> =
    Lazy::new(|| gauge_vec("mm_inventory_balanced", "1 if base share within [31, 69]"));
pub static TOTAL_VALUE: Lazy<GaugeVec> =
    Lazy::new(|| gauge_vec("mm_inventory_total_value", "total inventory value in quote"));

pub static BALANCE: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("mm_balance_units", "balances (labels: exchange, asset=base|quote, kind=total|available)"),
        &["exchange", "asset", "kind"],
    )
    .unwrap()
});

// -------- Market --------
pub static MID_PRICE: Lazy<GaugeVec> = Lazy::new(|| gauge_vec("mm_mid_price", "order book mid price"));
pub static BEST_BID: Lazy<GaugeVec> = Lazy::new(|| gauge_vec("mm_best_bid", "best bid"));
pub static BEST_ASK: Lazy<GaugeVec> = Lazy::new(|| gauge_vec("mm_best_ask", "best ask"));

// -------- Orders & liveness --------
pub static ACTIVE_ORDERS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("mm_active_orders", "reconstructed active orders (labels: exchange, side)"),
        &["exchange", "side"],
    )
    .unwrap()
});

pub static BOT_RUNNING: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("mm_bot_running", "1 if any active order"), &["exchange"]).unwrap()
});

pub static RECENTLY_ACTIVE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("mm_bot_recently_active", "upstream recently_active flag"),
        &["exchange"],
    )
    .unwrap()
});

// -------- Collection health --------
pub static COLLECTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mm_collect_total", "per-exchange collections (labels: exchange, status)"),
        &["exchange", "status"],
    )
    .unwrap()
});

pub static COLLECT_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(HistogramOpts::new(
        "mm_collect_latency_ms",
        "Latency of one exchange collection (ms)",
    ))
    .unwrap()
});

// ---- Config visibility ----
pub static CONFIG_EXCHANGE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("config_exchange", "configured exchanges (labels: exchange, pair, reconcile)"),
        &["exchange", "pair", "reconcile"],
    )
    .unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(BASE_PCT.clone())),
        REGISTRY.register(Box::new(QUOTE_PCT.clone())),
        REGISTRY.register(Box::new(BASE_ADJUST.clone())),
        REGISTRY.register(Box::new(QUOTE_ADJUST.clone())),
        REGISTRY.register(Box::new(IS_BALANCED.clone())),
        REGISTRY.register(Box::new(TOTAL_VALUE.clone())),
        REGISTRY.register(Box::new(BALANCE.clone())),
        REGISTRY.register(Box::new(MID_PRICE.clone())),
        REGISTRY.register(Box::new(BEST_BID.clone())),
        REGISTRY.register(Box::new(BEST_ASK.clone())),
        REGISTRY.register(Box::new(ACTIVE_ORDERS.clone())),
        REGISTRY.register(Box::new(BOT_RUNNING.clone())),
        REGISTRY.register(Box::new(RECENTLY_ACTIVE.clone())),
        REGISTRY.register(Box::new(COLLECTS.clone())),
        REGISTRY.register(Box::new(COLLECT_LATENCY.clone())),
        REGISTRY.register(Box::new(CONFIG_EXCHANGE.clone())),
    ] {
        let _ = m;
    }
}

pub fn export_config(exchanges: &[ExchangeCfg]) {
    for e in exchanges {
        CONFIG_EXCHANGE
            .with_label_values(&[&e.name, &e.pair, e.reconcile.as_str()])
            .set(1);
    }
}

/// Mirror one exchange snapshot into the gauges.
pub fn record_exchange(exchange: &str, m: &ExchangeMetrics) {
    let inv = &m.inventory;
    BASE_PCT.with_label_values(&[exchange]).set(inv.base_pct);
    QUOTE_PCT.with_label_values(&[exchange]).set(inv.quote_pct);
    BASE_ADJUST.with_label_values(&[exchange]).set(inv.base_order_adjust);
    QUOTE_ADJUST.with_label_values(&[exchange]).set(inv.quote_order_adjust);
    IS_BALANCED.with_label_values(&[exchange]).set(inv.is_balanced as f64);
    TOTAL_VALUE.with_label_values(&[exchange]).set(inv.total_value);

    for (asset, kind, v) in [
        ("base", "total", inv.base_total),
        ("base", "available", inv.base_available),
        ("quote", "total", inv.quote_total),
        ("quote", "available", inv.quote_available),
    ] {
        BALANCE.with_label_values(&[exchange, asset, kind]).set(v);
    }

    MID_PRICE.with_label_values(&[exchange]).set(m.mid_price);
    BEST_BID.with_label_values(&[exchange]).set(m.best_bid);
    BEST_ASK.with_label_values(&[exchange]).set(m.best_ask);

    ACTIVE_ORDERS.with_label_values(&[exchange, "buy"]).set(m.buy_orders_count as i64);
    ACTIVE_ORDERS.with_label_values(&[exchange, "sell"]).set(m.sell_orders_count as i64);
    BOT_RUNNING.with_label_values(&[exchange]).set(m.bot_running as i64);
    RECENTLY_ACTIVE.with_label_values(&[exchange]).set(m.recently_active as i64);
}

// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sets_labelled_gauges() {
        let mut m = ExchangeMetrics::error_state();
        m.inventory.base_pct = 42.5;
        m.buy_orders_count = 3;
        m.sell_orders_count = 2;
        record_exchange("test_ex", &m);
        assert_eq!(BASE_PCT.with_label_values(&["test_ex"]).get(), 42.5);
        assert_eq!(BASE_ADJUST.with_label_values(&["test_ex"]).get(), 100.0);
        assert_eq!(ACTIVE_ORDERS.with_label_values(&["test_ex", "buy"]).get(), 3);
        assert_eq!(ACTIVE_ORDERS.with_label_values(&["test_ex", "sell"]).get(), 2);
    }

    #[test]
    fn encoded_text_contains_registered_families() {
        init();
        record_exchange("enc_ex", &ExchangeMetrics::error_state());
        let text = String::from_utf8(encode_metrics()).unwrap();
        assert!(text.contains("mm_inventory_base_pct{exchange=\"enc_ex\"} 0"));
        assert!(text.contains("mm_base_order_adjust{exchange=\"enc_ex\"} 100"));
    }
}
