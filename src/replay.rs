// ===============================
// src/replay.rs (order-state reconstruction dari log bot)
// ===============================
//
// Bot hanya memberi kita tail log berupa teks bebas. Dari situ kita rekonstruksi
// order limit yang (diduga) masih resting di book:
//
//   Created LIMIT_MAKER BUY order <id> for <amount> <PAIR> at <price>
//   Cancelled order <id>
//   Filled <filled> out of <total> of the SELL order <id>
//
// Dua strategi rekonsiliasi:
// - OrderId    : terminated set dari SELURUH log, lalu konstruksi dari window
//                terakhir (newest first) dengan cap jumlah order.
// - PriceLevel : legacy, forward scan, key = SIDE + harga 6 desimal.
//
// Baris yang tidak cocok di-skip diam-diam. Angka yang gagal di-parse = 0.
//
use ahash::AHashSet;
use tracing::debug;

use crate::domain::{ActiveOrder, LogRecord, OrderEvent, OrderKind, Side};

pub const DEFAULT_WINDOW: usize = 50;
pub const DEFAULT_MAX_ACTIVE: usize = 15;

/// How an active order is identified while replaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Keyed by order id; termination from full history, construction from the tail window.
    #[default]
    OrderId,
    /// Keyed by side + price level, full forward replay.
    PriceLevel,
}

impl ReconcileMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "order_id" | "orderid" | "id" => Some(ReconcileMode::OrderId),
            "price_level" | "pricelevel" | "legacy" => Some(ReconcileMode::PriceLevel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileMode::OrderId => "order_id",
            ReconcileMode::PriceLevel => "price_level",
        }
    }
}

// -----------------------------------------------------------------------------
// Parsing
// -----------------------------------------------------------------------------

/// `parseFloat`-style read of a `[0-9.]+` run: everything after a second dot is ignored.
fn lenient_f64(run: &str) -> f64 {
    let cut = run.match_indices('.').nth(1).map(|(i, _)| i).unwrap_or(run.len());
    run[..cut].parse().unwrap_or(0.0)
}

/// Tiny left-to-right matcher over one message.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(rest: &'a str) -> Self { Self { rest } }

    fn lit(&mut self, s: &str) -> Option<()> {
        self.rest = self.rest.strip_prefix(s)?;
        Some(())
    }

    // \S+
    fn word(&mut self) -> Option<&'a str> {
        let end = self.rest.find(char::is_whitespace).unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (w, r) = self.rest.split_at(end);
        self.rest = r;
        Some(w)
    }

    // [\d.]+
    fn number(&mut self) -> Option<f64> {
        let end = self
            .rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (n, r) = self.rest.split_at(end);
        self.rest = r;
        Some(lenient_f64(n))
    }
}

fn created_at(rest: &str, pair: &str) -> Option<OrderEvent> {
    let mut c = Cursor::new(rest);
    let kind = OrderKind::parse(c.word()?)?;
    c.lit(" ")?;
    let side = Side::parse(c.word()?)?;
    c.lit(" order ")?;
    let order_id = c.word()?.to_string();
    c.lit(" for ")?;
    let amount = c.number()?;
    c.lit(" ")?;
    c.lit(pair)?;
    c.lit(" at ")?;
    let price = c.number()?;
    Some(OrderEvent::Created { side, kind, order_id, amount, price })
}

fn cancelled_at(rest: &str) -> Option<OrderEvent> {
    let order_id = Cursor::new(rest).word()?.to_string();
    Some(OrderEvent::Cancelled { order_id })
}

fn filled_at(rest: &str) -> Option<OrderEvent> {
    let mut c = Cursor::new(rest);
    let filled_amount = c.number()?;
    c.lit(" out of ")?;
    let total_amount = c.number()?;
    c.lit(" of the ")?;
    let side = Side::parse(c.word()?)?;
    c.lit(" order ")?;
    let order_id = c.word()?.to_string();
    Some(OrderEvent::Filled { order_id, side, filled_amount, total_amount })
}

/// First position in `msg` where `anchor` is followed by something `f` accepts.
fn scan<F>(msg: &str, anchor: &str, f: F) -> Option<OrderEvent>
where
    F: Fn(&str) -> Option<OrderEvent>,
{
    msg.match_indices(anchor).find_map(|(i, _)| f(&msg[i + anchor.len()..]))
}

/// Parse one log message into an order event. Creation lines must mention `pair`
/// literally; cancellations and fills are pair-agnostic.
pub fn parse_event(msg: &str, pair: &str) -> Option<OrderEvent> {
    scan(msg, "Created ", |r| created_at(r, pair))
        .or_else(|| scan(msg, "Cancelled order ", cancelled_at))
        .or_else(|| scan(msg, "Filled ", filled_at))
}

/// Order id terminated by this event, if any. Only an exact full fill counts.
fn terminated_id(ev: &OrderEvent) -> Option<&str> {
    match ev {
        OrderEvent::Cancelled { order_id } => Some(order_id.as_str()),
        OrderEvent::Filled { order_id, filled_amount, total_amount, .. }
            if filled_amount == total_amount =>
        {
            Some(order_id.as_str())
        }
        _ => None,
    }
}

/// Every id a message terminates. Cancellation and fill are looked up independently,
/// so a line carrying both contributes both ids.
fn terminations(msg: &str) -> impl Iterator<Item = String> {
    [scan(msg, "Cancelled order ", cancelled_at), scan(msg, "Filled ", filled_at)]
        .into_iter()
        .flatten()
        .filter_map(|ev| terminated_id(&ev).map(str::to_string))
}

// -----------------------------------------------------------------------------
// Replayer
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Replayer {
    pair: String,
    mode: ReconcileMode,
    window: usize,
    max_results: usize,
}

impl Replayer {
    pub fn new(pair: impl Into<String>) -> Self {
        Self {
            pair: pair.into(),
            mode: ReconcileMode::default(),
            window: DEFAULT_WINDOW,
            max_results: DEFAULT_MAX_ACTIVE,
        }
    }

    pub fn with_mode(mut self, mode: ReconcileMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn replay(&self, logs: &[LogRecord]) -> Vec<ActiveOrder> {
        let out = match self.mode {
            ReconcileMode::OrderId => self.replay_by_order_id(logs),
            ReconcileMode::PriceLevel => self.replay_by_price_level(logs),
        };
        debug!(pair = %self.pair, mode = self.mode.as_str(), lines = logs.len(), active = out.len(), "replay");
        out
    }

    /// Pass 1: ids cancelled or fully filled anywhere in the supplied history.
    fn terminated_ids(&self, logs: &[LogRecord]) -> AHashSet<String> {
        logs.iter().flat_map(|r| terminations(&r.message)).collect()
    }

    fn replay_by_order_id(&self, logs: &[LogRecord]) -> Vec<ActiveOrder> {
        let terminated = self.terminated_ids(logs);

        // Pass 2: tail window, newest first
        let start = logs.len().saturating_sub(self.window);
        let mut seen: AHashSet<String> = AHashSet::new();
        let mut active = Vec::new();
        for rec in logs[start..].iter().rev() {
            if active.len() >= self.max_results {
                break;
            }
            if let Some(OrderEvent::Created { side, order_id, amount, price, .. }) =
                parse_event(&rec.message, &self.pair)
            {
                if terminated.contains(&order_id) || seen.contains(&order_id) {
                    continue;
                }
                seen.insert(order_id.clone());
                active.push(ActiveOrder { order_id, side, price, amount: Some(amount) });
            }
        }
        active
    }

    fn replay_by_price_level(&self, logs: &[LogRecord]) -> Vec<ActiveOrder> {
        // urutan insert dipertahankan; key lama yang ditimpa tetap di posisinya
        let mut book: Vec<(String, ActiveOrder)> = Vec::new();
        for rec in logs {
            match parse_event(&rec.message, &self.pair) {
                Some(OrderEvent::Created { side, order_id, price, .. }) => {
                    let key = format!("{}_{:.6}", side.as_str(), price);
                    let order = ActiveOrder { order_id, side, price, amount: None };
                    match book.iter_mut().find(|(k, _)| *k == key) {
                        Some(slot) => slot.1 = order,
                        None => book.push((key, order)),
                    }
                }
                Some(ev) => {
                    if let Some(id) = terminated_id(&ev) {
                        if let Some(pos) = book.iter().position(|(_, o)| o.order_id == id) {
                            book.remove(pos);
                        }
                    }
                }
                None => {}
            }
        }
        book.into_iter().map(|(_, o)| o).collect()
    }
}

/// Order-id reconciliation over the default tail window.
pub fn reconstruct_active_orders(logs: &[LogRecord], pair: &str, max_results: usize) -> Vec<ActiveOrder> {
    Replayer::new(pair).with_max_results(max_results).replay(logs)
}
