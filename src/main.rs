// ===============================
// src/main.rs
// ===============================
/*
 cd /home/kukuhtw/rust/mm_monitor

 # snapshot JSON (kucoin, gateio, ...)
curl -s localhost:9898/api/metrics | jq .

# inventory & order gauges
curl -s localhost:9898/metrics | egrep '^mm_(inventory_base_pct|active_orders|bot_running)'

# replay dump log offline
cargo run -- replay status.json --pair EQTY-USDT

*/
/*
=============================================================================
Project : mm_monitor — market-making bot monitor in Rust
Module  : main.rs
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
mod domain;
mod config;
mod metrics;
mod replay;           // log -> active orders (pure)
mod inventory;        // balances + mid -> skew/adjust (pure)
mod hummingbot;       // bot API client (status, order book, portfolio)
mod collector;        // per-exchange orchestration
mod server;           // hyper: /api/metrics, /metrics, /api/proxy

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::replay::{ReconcileMode, Replayer, DEFAULT_MAX_ACTIVE, DEFAULT_WINDOW};

#[derive(Debug, Parser)]
#[command(version, about = "Market-making bot monitor: log replay + inventory metrics")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Serve JSON snapshot + Prometheus metrics over HTTP (default)
    Serve {
        /// Override METRICS_PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Collect once and print the snapshot as JSON
    Snapshot,
    /// Replay a saved log dump and print the active orders as JSON
    Replay {
        /// Bot status JSON, JSON array of records, JSONL, or plain log lines
        file: PathBuf,
        #[arg(long, default_value = config::DEFAULT_PAIR)]
        pair: String,
        /// order_id | price_level
        #[arg(long, default_value = "order_id", value_parser = parse_mode)]
        mode: ReconcileMode,
        #[arg(long, env = "REPLAY_WINDOW", default_value_t = DEFAULT_WINDOW)]
        window: usize,
        #[arg(long, env = "REPLAY_MAX_ACTIVE", default_value_t = DEFAULT_MAX_ACTIVE)]
        max_active: usize,
    },
}

fn parse_mode(s: &str) -> Result<ReconcileMode, String> {
    ReconcileMode::parse(s).ok_or_else(|| format!("unknown reconcile mode '{s}' (order_id | price_level)"))
}

fn print_json<T: serde::Serialize>(v: &T) {
    match serde_json::to_string_pretty(v) {
        Ok(s) => println!("{s}"),
        Err(e) => error!(?e, "serialize failed"),
    }
}

#[tokio::main]
async fn main() {
    // ---- Logging ---- (stderr: stdout dipakai untuk output JSON)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // ---- Load config ----
    let args = config::load();

    match cli.cmd.unwrap_or(Cmd::Serve { port: None }) {
        Cmd::Serve { port } => {
            // ---- Metrics ----
            metrics::init();
            metrics::export_config(&args.exchanges);

            let port = port.unwrap_or(args.metrics_port);
            let exchanges: Vec<String> = args
                .exchanges
                .iter()
                .map(|e| format!("{}:{}:{}", e.name, e.pair, e.reconcile.as_str()))
                .collect();
            info!(
                api_base = %args.api_base,
                credentials = args.credentials().is_some(),
                exchanges = ?exchanges,
                replay_window = args.replay_window,
                replay_max_active = args.replay_max_active,
                port,
                "startup config"
            );

            let state = Arc::new(server::AppState::from_args(&args));
            if let Err(e) = server::serve(state, port).await {
                error!(?e, "http server stopped");
                std::process::exit(1);
            }
        }
        Cmd::Snapshot => match collector::Collector::new(&args) {
            Ok(c) => print_json(&c.snapshot().await),
            Err(e) => {
                error!(error = %e, "cannot collect");
                std::process::exit(1);
            }
        },
        Cmd::Replay { file, pair, mode, window, max_active } => {
            let text = match std::fs::read_to_string(&file) {
                Ok(t) => t,
                Err(e) => {
                    error!(?e, path = %file.display(), "read failed");
                    std::process::exit(1);
                }
            };
            let logs = hummingbot::log_records_from_text(&text);
            let orders = Replayer::new(pair)
                .with_mode(mode)
                .with_window(window)
                .with_max_results(max_active)
                .replay(&logs);
            info!(lines = logs.len(), active = orders.len(), mode = mode.as_str(), "replayed");
            print_json(&orders);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_replay() {
        let cli = Cli::try_parse_from(["mm_monitor", "replay", "dump.json", "--mode", "price_level", "--window", "10"]).unwrap();
        match cli.cmd {
            Some(Cmd::Replay { file, pair, mode, window, .. }) => {
                assert_eq!(file, PathBuf::from("dump.json"));
                assert_eq!(pair, "EQTY-USDT");
                assert_eq!(mode, ReconcileMode::PriceLevel);
                assert_eq!(window, 10);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cli_defaults_to_serve() {
        let cli = Cli::try_parse_from(["mm_monitor"]).unwrap();
        assert!(cli.cmd.is_none());
        assert!(Cli::try_parse_from(["mm_monitor", "replay", "f", "--mode", "bogus"]).is_err());
    }
}
