// ===============================
// src/hummingbot.rs
// ===============================
//
// Client untuk bot-management API (Basic auth):
// - GET  /bot-orchestration/{bot_id}/status  -> general_logs + recently_active
// - POST /market-data/order-book             -> top of book
// - POST /portfolio/state                    -> balances per account/connector
//
// Payload upstream longgar: angka kadang string, field kadang hilang.
// Semua dibaca lewat serde_json::Value dan di-default ke 0 / kosong.
//
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::Args;
use crate::domain::{Balance, LogRecord};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("API credentials not configured")]
    MissingCredentials,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotStatus {
    pub logs: Vec<LogRecord>,
    pub recently_active: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BookTop {
    pub best_bid: f64,
    pub best_ask: f64,
}

impl BookTop {
    pub fn mid(&self) -> f64 { (self.best_bid + self.best_ask) / 2.0 }
}

// ---- Lenient JSON readers ----

/// Number or numeric string; anything else is 0.
pub fn num(v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn truthy(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|x| x != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        _ => false,
    }
}

fn log_record(v: &Value) -> LogRecord {
    let msg = v
        .get("msg")
        .or_else(|| v.get("message"))
        .and_then(|x| x.as_str())
        .unwrap_or_default();
    LogRecord::new(msg)
}

pub fn parse_bot_status(v: &Value) -> BotStatus {
    let logs = v
        .pointer("/data/general_logs")
        .and_then(|x| x.as_array())
        .map(|arr| arr.iter().map(log_record).collect())
        .unwrap_or_default();
    BotStatus { logs, recently_active: truthy(v.pointer("/data/recently_active")) }
}

pub fn parse_book_top(v: &Value) -> BookTop {
    BookTop {
        best_bid: num(v.pointer("/bids/0/price")),
        best_ask: num(v.pointer("/asks/0/price")),
    }
}

pub fn parse_balances(v: &Value, account: &str, portfolio_key: &str) -> Vec<Balance> {
    v.get(account)
        .and_then(|a| a.get(portfolio_key))
        .and_then(|x| x.as_array())
        .map(|arr| {
            arr.iter()
                .map(|b| Balance {
                    token: b.get("token").and_then(|t| t.as_str()).unwrap_or_default().to_string(),
                    units: num(b.get("units")),
                    available_units: num(b.get("available_units")),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Saved log dump -> records. Accepts a bot status document, a JSON array of
/// records, a single record, or line-oriented text (JSONL or plain messages).
pub fn log_records_from_text(text: &str) -> Vec<LogRecord> {
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        match &v {
            Value::Array(arr) => return arr.iter().map(log_record).collect(),
            Value::Object(_) if v.get("data").is_some() => return parse_bot_status(&v).logs,
            Value::Object(_) => return vec![log_record(&v)],
            _ => {}
        }
    }
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| match serde_json::from_str::<Value>(l) {
            Ok(v @ Value::Object(_)) => log_record(&v),
            _ => LogRecord::new(l),
        })
        .collect()
}

// ---- Client ----

#[derive(Debug, Clone)]
pub struct BotApi {
    http: reqwest::Client,
    base: String,
    user: String,
    pass: String,
}

impl BotApi {
    pub fn new(args: &Args) -> Result<Self, CollectError> {
        let (user, pass) = args.credentials().ok_or(CollectError::MissingCredentials)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(args.http_timeout_ms))
            .build()?;
        Ok(Self {
            http,
            base: args.api_base.clone(),
            user: user.to_string(),
            pass: pass.to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base, endpoint.trim_start_matches('/'))
    }

    async fn call(&self, method: Method, endpoint: &str, body: Option<Value>) -> Result<Value, CollectError> {
        let mut rb = self
            .http
            .request(method, self.url(endpoint))
            .basic_auth(&self.user, Some(&self.pass));
        if let Some(b) = body {
            rb = rb.json(&b);
        }
        let rsp = rb.send().await?;
        let status = rsp.status();
        if !status.is_success() {
            return Err(CollectError::Status { endpoint: endpoint.to_string(), status: status.as_u16() });
        }
        Ok(rsp.json::<Value>().await?)
    }

    pub async fn bot_status(&self, bot_id: &str) -> Result<BotStatus, CollectError> {
        let v = self
            .call(Method::GET, &format!("/bot-orchestration/{bot_id}/status"), None)
            .await?;
        Ok(parse_bot_status(&v))
    }

    pub async fn order_book(&self, connector: &str, pair: &str) -> Result<BookTop, CollectError> {
        let body = json!({ "connector_name": connector, "trading_pair": pair });
        let v = self.call(Method::POST, "/market-data/order-book", Some(body)).await?;
        Ok(parse_book_top(&v))
    }

    pub async fn portfolio(&self, account: &str, portfolio_key: &str) -> Result<Vec<Balance>, CollectError> {
        let body = json!({
            "account_names": [account],
            "connector_names": [portfolio_key],
            "skip_gateway": false,
            "refresh": true,
        });
        let v = self.call(Method::POST, "/portfolio/state", Some(body)).await?;
        Ok(parse_balances(&v, account, portfolio_key))
    }

    /// Raw pass-through: status code and JSON body relayed as-is.
    pub async fn forward(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(u16, Value), CollectError> {
        let mut rb = self
            .http
            .request(method, self.url(endpoint))
            .basic_auth(&self.user, Some(&self.pass))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json");
        if let Some(b) = body {
            rb = rb.body(b);
        }
        let rsp = rb.send().await?;
        let status = rsp.status().as_u16();
        Ok((status, rsp.json::<Value>().await?))
    }
}
