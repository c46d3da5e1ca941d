// ===============================
// src/collector.rs (orchestrator per exchange)
// ===============================
//
// Per exchange: status + order book + portfolio diambil paralel (tokio::join!),
// lalu log di-replay dan inventory dihitung. Semua exchange jalan paralel dan
// independen: kalau satu gagal, hasilnya diganti error-state dan yang lain
// tetap jalan.
//
use chrono::Utc;
use futures_util::future::join_all;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::{Args, ExchangeCfg};
use crate::domain::{ActiveOrder, Balance, ExchangeMetrics, MetricsSnapshot, Side};
use crate::hummingbot::{BookTop, BotApi, BotStatus, CollectError};
use crate::inventory::compute_inventory;
use crate::metrics::{record_exchange, COLLECTS, COLLECT_LATENCY};
use crate::replay::Replayer;

/// Merge replayed orders, book top and balances into one flat record.
pub fn build_metrics(
    cfg: &ExchangeCfg,
    orders: &[ActiveOrder],
    status: &BotStatus,
    book: &BookTop,
    balances: &[Balance],
) -> ExchangeMetrics {
    let mid = book.mid();
    let inventory = compute_inventory(balances, mid, &cfg.base_token, &cfg.quote_token);

    let buy = orders.iter().filter(|o| o.side == Side::Buy).count() as u32;
    let sell = orders.iter().filter(|o| o.side == Side::Sell).count() as u32;

    ExchangeMetrics {
        inventory,
        mid_price: mid,
        best_bid: book.best_bid,
        best_ask: book.best_ask,
        active_orders_count: buy + sell,
        buy_orders_count: buy,
        sell_orders_count: sell,
        bot_running: (buy + sell > 0) as u8,
        recently_active: status.recently_active as u8,
    }
}

#[derive(Debug, Clone)]
pub struct Collector {
    api: BotApi,
    exchanges: Vec<ExchangeCfg>,
    window: usize,
    max_active: usize,
}

impl Collector {
    pub fn new(args: &Args) -> Result<Self, CollectError> {
        Ok(Self {
            api: BotApi::new(args)?,
            exchanges: args.exchanges.clone(),
            window: args.replay_window,
            max_active: args.replay_max_active,
        })
    }

    pub fn api(&self) -> &BotApi { &self.api }

    fn replayer(&self, cfg: &ExchangeCfg) -> Replayer {
        Replayer::new(cfg.pair.clone())
            .with_mode(cfg.reconcile)
            .with_window(self.window)
            .with_max_results(self.max_active)
    }

    pub async fn collect_exchange(&self, cfg: &ExchangeCfg) -> Result<ExchangeMetrics, CollectError> {
        let (status, book, balances) = tokio::join!(
            self.api.bot_status(&cfg.bot_id),
            self.api.order_book(&cfg.connector, &cfg.pair),
            self.api.portfolio(&cfg.account, &cfg.portfolio_key),
        );
        let (status, book, balances) = (status?, book?, balances?);

        let orders = self.replayer(cfg).replay(&status.logs);
        Ok(build_metrics(cfg, &orders, &status, &book, &balances))
    }

    async fn collect_timed(&self, cfg: &ExchangeCfg) -> Result<ExchangeMetrics, CollectError> {
        let t0 = Instant::now();
        let res = self.collect_exchange(cfg).await;
        COLLECT_LATENCY.observe(t0.elapsed().as_secs_f64() * 1000.0);
        res
    }

    /// One fresh snapshot across all configured exchanges. Never fails.
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let results = join_all(self.exchanges.iter().map(|cfg| self.collect_timed(cfg))).await;

        let mut snap = MetricsSnapshot { timestamp: Utc::now().timestamp(), ..Default::default() };
        for (cfg, res) in self.exchanges.iter().zip(results) {
            let m = match res {
                Ok(m) => {
                    debug!(exchange = %cfg.name, active = m.active_orders_count, base_pct = m.inventory.base_pct, "collected");
                    COLLECTS.with_label_values(&[&cfg.name, "ok"]).inc();
                    m
                }
                Err(e) => {
                    warn!(exchange = %cfg.name, error = %e, "collect failed, using error-state metrics");
                    COLLECTS.with_label_values(&[&cfg.name, "error"]).inc();
                    snap.errors.insert(cfg.name.clone(), e.to_string());
                    ExchangeMetrics::error_state()
                }
            };
            record_exchange(&cfg.name, &m);
            snap.exchanges.insert(cfg.name.clone(), m);
        }
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::split_pair;
    use crate::domain::LogRecord;
    use crate::replay::ReconcileMode;
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};
    use serde_json::{json, Value};
    use std::convert::Infallible;
    use std::net::SocketAddr;

    fn cfg(name: &str) -> ExchangeCfg {
        let (base_token, quote_token) = split_pair("EQTY-USDT");
        ExchangeCfg {
            name: name.into(),
            bot_id: "bot".into(),
            connector: name.into(),
            pair: "EQTY-USDT".into(),
            account: format!("cex_mm_{name}"),
            portfolio_key: name.into(),
            base_token,
            quote_token,
            reconcile: ReconcileMode::OrderId,
        }
    }

    fn args(api_base: &str, exchanges: Vec<ExchangeCfg>) -> Args {
        Args {
            api_base: api_base.into(),
            api_user: Some("u".into()),
            api_pass: Some("p".into()),
            http_timeout_ms: 2_000,
            metrics_port: 0,
            allowed_origins: vec![],
            exchanges,
            replay_window: 50,
            replay_max_active: 15,
        }
    }

    #[test]
    fn merges_orders_book_and_inventory() {
        let c = cfg("kucoin");
        let status = BotStatus {
            logs: vec![
                LogRecord::new("Created LIMIT BUY order A1 for 10 EQTY-USDT at 0.9"),
                LogRecord::new("Created LIMIT_MAKER SELL order S1 for 10 EQTY-USDT at 1.1"),
                LogRecord::new("Created LIMIT SELL order S2 for 10 EQTY-USDT at 1.2"),
                LogRecord::new("Cancelled order S2"),
            ],
            recently_active: false,
        };
        let orders = Replayer::new("EQTY-USDT").replay(&status.logs);
        let book = BookTop { best_bid: 0.9, best_ask: 1.1 };
        let balances = vec![
            Balance { token: "EQTY".into(), units: 100.0, available_units: 50.0 },
            Balance { token: "USDT".into(), units: 100.0, available_units: 100.0 },
        ];
        let m = build_metrics(&c, &orders, &status, &book, &balances);
        assert_eq!(m.active_orders_count, 2);
        assert_eq!(m.buy_orders_count, 1);
        assert_eq!(m.sell_orders_count, 1);
        assert_eq!(m.bot_running, 1);
        assert_eq!(m.recently_active, 0);
        assert!((m.mid_price - 1.0).abs() < 1e-12);
        assert_eq!(m.inventory.is_balanced, 1);
        assert_eq!(m.inventory.base_available, 50.0);
    }

    #[test]
    fn no_orders_means_not_running() {
        let m = build_metrics(
            &cfg("gateio"),
            &[],
            &BotStatus { logs: vec![], recently_active: true },
            &BookTop::default(),
            &[],
        );
        assert_eq!(m.bot_running, 0);
        assert_eq!(m.recently_active, 1);
        assert_eq!(m.inventory, crate::domain::InventoryReport::error_state());
    }

    #[test]
    fn collector_requires_credentials() {
        let mut a = args("http://127.0.0.1:1", vec![]);
        a.api_pass = None;
        assert!(matches!(Collector::new(&a), Err(CollectError::MissingCredentials)));
    }

    #[tokio::test]
    async fn unreachable_upstream_yields_error_state_for_every_exchange() {
        // port 1 refuses connections, so both pipelines fail fast
        let a = args("http://127.0.0.1:1", vec![cfg("kucoin"), cfg("gateio")]);
        let collector = Collector::new(&a).unwrap();
        let snap = collector.snapshot().await;
        assert_eq!(snap.exchanges.len(), 2);
        for name in ["kucoin", "gateio"] {
            assert_eq!(snap.exchanges[name], ExchangeMetrics::error_state());
            assert!(snap.errors.contains_key(name));
        }
        assert!(snap.timestamp > 0);
    }

    fn json_rsp(status: StatusCode, v: &Value) -> Response<Body> {
        let mut rsp = Response::new(Body::from(v.to_string()));
        *rsp.status_mut() = status;
        rsp
    }

    /// Bot API stand-in: serves "good-bot" and answers 500 for any other bot status.
    async fn fake_bot_api(req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let path = req.uri().path().to_string();
        let body: Value = hyper::body::to_bytes(req.into_body())
            .await
            .ok()
            .and_then(|b| serde_json::from_slice(&b).ok())
            .unwrap_or(Value::Null);

        let rsp = match path.as_str() {
            "/bot-orchestration/good-bot/status" => json_rsp(
                StatusCode::OK,
                &json!({
                    "status": "success",
                    "data": {
                        "recently_active": true,
                        "general_logs": [
                            {"msg": "Created LIMIT BUY order A1 for 10 EQTY-USDT at 0.9"},
                            {"msg": "Created LIMIT SELL order S1 for 10 EQTY-USDT at 1.1"},
                            {"msg": "Cancelled order S1"}
                        ]
                    }
                }),
            ),
            "/market-data/order-book" if body["trading_pair"] == "EQTY-USDT" => json_rsp(
                StatusCode::OK,
                &json!({"bids": [{"price": "0.9"}], "asks": [{"price": 1.1}]}),
            ),
            "/portfolio/state" => {
                let account = body["account_names"][0].as_str().unwrap_or_default().to_string();
                let key = body["connector_names"][0].as_str().unwrap_or_default().to_string();
                let holdings = json!([
                    {"token": "EQTY", "units": 100, "available_units": 100},
                    {"token": "USDT", "units": "100", "available_units": "100"}
                ]);
                let mut per_connector = serde_json::Map::new();
                per_connector.insert(key, holdings);
                let mut state = serde_json::Map::new();
                state.insert(account, Value::Object(per_connector));
                json_rsp(StatusCode::OK, &Value::Object(state))
            }
            _ => json_rsp(StatusCode::INTERNAL_SERVER_ERROR, &json!({"detail": "boom"})),
        };
        Ok(rsp)
    }

    async fn spawn_fake_bot_api() -> SocketAddr {
        let make = make_service_fn(|_conn| async { Ok::<_, Infallible>(service_fn(fake_bot_api)) });
        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make);
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    #[tokio::test]
    async fn failing_bot_does_not_disturb_healthy_one() {
        let addr = spawn_fake_bot_api().await;
        let mut good = cfg("good");
        good.bot_id = "good-bot".into();
        let mut bad = cfg("badex");
        bad.bot_id = "bad-bot".into();

        let collector = Collector::new(&args(&format!("http://{addr}"), vec![good, bad])).unwrap();
        let snap = collector.snapshot().await;

        let m = &snap.exchanges["good"];
        assert_eq!(m.active_orders_count, 1);
        assert_eq!(m.buy_orders_count, 1);
        assert_eq!(m.sell_orders_count, 0);
        assert_eq!(m.bot_running, 1);
        assert_eq!(m.recently_active, 1);
        assert!((m.mid_price - 1.0).abs() < 1e-12);
        assert_eq!(m.inventory.base_total, 100.0);
        assert_eq!(m.inventory.quote_total, 100.0);
        assert_eq!(m.inventory.is_balanced, 1);

        assert_eq!(snap.exchanges["badex"], ExchangeMetrics::error_state());
        assert_eq!(snap.errors.keys().collect::<Vec<_>>(), vec!["badex"]);
        assert!(snap.errors["badex"].contains("HTTP 500"), "{}", snap.errors["badex"]);
    }
}
