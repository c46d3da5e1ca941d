// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : mm_monitor — market-making bot monitor in Rust
Module  : config.rs
Version : 0.5.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
Email   : kukuhtw@gmail.com
WhatsApp: https://wa.me/628129893706
LinkedIn: https://id.linkedin.com/in/kukuhtw
License : MIT (see LICENSE)

Summary : Replays market-making bot logs into active orders, derives
          inventory skew / rebalance targets per exchange, and serves the
          snapshot as JSON and Prometheus metrics.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::env;
use dotenvy::dotenv;

use crate::replay::{ReconcileMode, DEFAULT_MAX_ACTIVE, DEFAULT_WINDOW};

pub const DEFAULT_API_BASE: &str = "https://hummingbot-api.eqty.pro";
pub const DEFAULT_PAIR: &str = "EQTY-USDT";
pub const DEFAULT_QUOTE: &str = "USDT";
pub const DEFAULT_ORIGINS: &str = "https://zolpho.github.io,https://eqty-dao.github.io,https://eqty.me";

/// Satu bot market-making di satu exchange
#[derive(Clone, Debug, PartialEq)]
pub struct ExchangeCfg {
    pub name: String,          // key di snapshot JSON (mis. "kucoin")
    pub bot_id: String,
    pub connector: String,     // connector order book (mis. "gate_io")
    pub pair: String,          // "EQTY-USDT"
    pub account: String,       // account portfolio (mis. "cex_mm_kucoin")
    pub portfolio_key: String, // connector key di portfolio state
    pub base_token: String,
    pub quote_token: String,
    pub reconcile: ReconcileMode,
}

impl ExchangeCfg {
    /// Baca `<NAME>_BOT_ID`, `<NAME>_PAIR`, dst. Tanpa bot id -> None.
    pub fn from_env(name: &str) -> Option<ExchangeCfg> {
        Self::from_lookup(name, |k| env::var(k).ok())
    }

    fn from_lookup<F>(name: &str, get: F) -> Option<ExchangeCfg>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = name.trim().to_ascii_lowercase();
        let prefix = name.to_ascii_uppercase();
        let var = |suffix: &str| get(&format!("{prefix}_{suffix}")).filter(|v| !v.trim().is_empty());

        let bot_id = var("BOT_ID")?;
        let connector = var("CONNECTOR").unwrap_or_else(|| name.clone());
        let pair = var("PAIR").unwrap_or_else(|| DEFAULT_PAIR.to_string());
        let account = var("ACCOUNT").unwrap_or_else(|| format!("cex_mm_{name}"));
        let portfolio_key = var("PORTFOLIO_KEY").unwrap_or_else(|| connector.clone());
        let reconcile = var("RECONCILE")
            .and_then(|s| ReconcileMode::parse(&s))
            .unwrap_or_default();
        let (base_token, quote_token) = split_pair(&pair);

        Some(ExchangeCfg {
            name,
            bot_id,
            connector,
            pair,
            account,
            portfolio_key,
            base_token,
            quote_token,
            reconcile,
        })
    }
}

/// "EQTY-USDT" -> ("EQTY", "USDT"); tanpa '-' seluruh pair dianggap base.
pub fn split_pair(pair: &str) -> (String, String) {
    match pair.split_once('-') {
        Some((b, q)) if !b.is_empty() && !q.is_empty() => (b.to_string(), q.to_string()),
        _ => (pair.to_string(), DEFAULT_QUOTE.to_string()),
    }
}

#[derive(Clone, Debug)]
pub struct Args {
    // upstream bot API
    pub api_base: String,
    pub api_user: Option<String>,
    pub api_pass: Option<String>,
    pub http_timeout_ms: u64,

    // http
    pub metrics_port: u16,
    pub allowed_origins: Vec<String>,

    // bots
    pub exchanges: Vec<ExchangeCfg>,

    // replay
    pub replay_window: usize,
    pub replay_max_active: usize,
}

impl Args {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.api_user.as_deref(), self.api_pass.as_deref()) {
            (Some(u), Some(p)) => Some((u, p)),
            _ => None,
        }
    }
}

fn csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(|x| x.to_string())
        .collect()
}

pub fn load() -> Args {
    // Pastikan .env dibaca (agar API_USERNAME, EXCHANGES, dll ter-load)
    let _ = dotenv();

    // ===== Upstream =====
    let api_base = env::var("API_BASE")
        .unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
        .trim_end_matches('/')
        .to_string();
    let api_user = env::var("API_USERNAME").ok().filter(|s| !s.is_empty());
    let api_pass = env::var("API_PASSWORD").ok().filter(|s| !s.is_empty());
    let http_timeout_ms = env::var("HTTP_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10_000);

    // ===== HTTP =====
    let metrics_port = env::var("METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9898);
    let allowed_origins = env::var("ALLOWED_ORIGINS")
        .ok()
        .map(|s| csv(&s))
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| csv(DEFAULT_ORIGINS));

    // ===== Exchanges =====
    // Contoh:
    //   EXCHANGES=kucoin,gateio
    //   KUCOIN_BOT_ID=ea5d...   GATEIO_BOT_ID=da61...   GATEIO_CONNECTOR=gate_io
    //   GATEIO_RECONCILE=price_level
    let names = env::var("EXCHANGES")
        .ok()
        .map(|s| csv(&s))
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| vec!["kucoin".to_string(), "gateio".to_string()]);
    let mut exchanges: Vec<ExchangeCfg> = Vec::new();
    for n in &names {
        match ExchangeCfg::from_env(n) {
            Some(cfg) if !exchanges.iter().any(|e| e.name == cfg.name) => exchanges.push(cfg),
            Some(_) => {}
            None => tracing::warn!(exchange = %n, "no {}_BOT_ID set, exchange skipped", n.to_ascii_uppercase()),
        }
    }

    // ===== Replay =====
    let replay_window = env::var("REPLAY_WINDOW")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_WINDOW);
    let replay_max_active = env::var("REPLAY_MAX_ACTIVE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MAX_ACTIVE);

    Args {
        api_base,
        api_user,
        api_pass,
        http_timeout_ms,
        metrics_port,
        allowed_origins,
        exchanges,
        replay_window,
        replay_max_active,
    }
}
