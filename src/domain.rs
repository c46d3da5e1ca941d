// ===============================
// src/domain.rs
// ===============================
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side { Buy, Sell }

impl Side {
    /// Exchange casing differs ("BUY", "buy", "Buy"), so match case-insensitively.
    pub fn parse(s: &str) -> Option<Side> {
        if s.eq_ignore_ascii_case("buy") {
            Some(Side::Buy)
        } else if s.eq_ignore_ascii_case("sell") {
            Some(Side::Sell)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str { match self { Side::Buy => "BUY", Side::Sell => "SELL" } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind { LimitMaker, Limit }

impl OrderKind {
    pub fn parse(s: &str) -> Option<OrderKind> {
        match s {
            "LIMIT_MAKER" => Some(OrderKind::LimitMaker),
            "LIMIT" => Some(OrderKind::Limit),
            _ => None,
        }
    }
}

/// Satu baris log bot. Upstream menamai field-nya `msg`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(alias = "msg", default)]
    pub message: String,
}

impl LogRecord {
    pub fn new(message: impl Into<String>) -> Self { Self { message: message.into() } }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    Created { side: Side, kind: OrderKind, order_id: String, amount: f64, price: f64 },
    Cancelled { order_id: String },
    Filled { order_id: String, side: Side, filled_amount: f64, total_amount: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveOrder {
    pub order_id: String,
    pub side: Side,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Balance { pub token: String, pub units: f64, pub available_units: f64 }

// Inventory structures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryReport {
    pub base_value: f64,
    pub quote_value: f64,
    pub total_value: f64,
    pub base_pct: f64,
    pub quote_pct: f64,
    pub base_order_adjust: f64,
    pub quote_order_adjust: f64,
    pub is_balanced: u8,
    pub base_total: f64,
    pub base_available: f64,
    pub quote_total: f64,
    pub quote_available: f64,
}

impl InventoryReport {
    /// Same shape as a real report with no position: zeros, adjust factors at 100.
    pub fn error_state() -> Self {
        Self { base_order_adjust: 100.0, quote_order_adjust: 100.0, ..Default::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeMetrics {
    #[serde(flatten)]
    pub inventory: InventoryReport,
    pub mid_price: f64,
    pub best_bid: f64,
    pub best_ask: f64,
    pub active_orders_count: u32,
    pub buy_orders_count: u32,
    pub sell_orders_count: u32,
    pub bot_running: u8,
    pub recently_active: u8,
}

impl ExchangeMetrics {
    pub fn error_state() -> Self {
        Self { inventory: InventoryReport::error_state(), ..Default::default() }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: i64,
    #[serde(flatten)]
    pub exchanges: BTreeMap<String, ExchangeMetrics>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}
