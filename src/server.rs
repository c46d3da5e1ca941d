// ===============================
// src/server.rs (HTTP: JSON snapshot, Prometheus, proxy)
// ===============================
//
// Routes:
//   GET  /api/metrics           -> snapshot JSON (fresh collection)
//   GET  /metrics  (dan /)      -> Prometheus text (fresh collection)
//   GET|POST /api/proxy?endpoint=/docker/running -> pass-through ke bot API
//   GET  /healthz               -> "ok"
//   OPTIONS *                   -> CORS preflight
//
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, ORIGIN};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::collector::Collector;
use crate::config::Args;
use crate::metrics::encode_metrics;

pub struct AppState {
    pub allowed_origins: Vec<String>,
    /// None kalau kredensial belum dikonfigurasi.
    pub collector: Option<Collector>,
}

impl AppState {
    pub fn from_args(args: &Args) -> Self {
        let collector = match Collector::new(args) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(error = %e, "collector disabled");
                None
            }
        };
        Self { allowed_origins: args.allowed_origins.clone(), collector }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let mut rsp = Response::new(Body::from(bytes));
    *rsp.status_mut() = status;
    rsp.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    rsp
}

fn text_response(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Response<Body> {
    let mut rsp = Response::new(Body::from(body));
    *rsp.status_mut() = status;
    rsp.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    rsp
}

fn no_credentials() -> Response<Body> {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &json!({ "error": "API credentials not configured" }),
    )
}

/// Echo the request origin when allowed, otherwise fall back to the first allowed origin.
fn apply_cors(rsp: &mut Response<Body>, allowed: &[String], origin: Option<&str>) {
    let chosen = origin
        .filter(|o| allowed.iter().any(|a| a == o))
        .or_else(|| allowed.first().map(String::as_str));
    let h = rsp.headers_mut();
    if let Some(v) = chosen.and_then(|o| HeaderValue::from_str(o).ok()) {
        h.insert(ACCESS_CONTROL_ALLOW_ORIGIN, v);
    }
    h.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS"));
    h.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
}

fn endpoint_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == "endpoint")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

async fn proxy(st: &AppState, req: Request<Body>) -> Response<Body> {
    let Some(endpoint) = endpoint_param(req.uri().query()) else {
        return json_response(
            StatusCode::BAD_REQUEST,
            &json!({ "error": "Missing endpoint parameter", "usage": "?endpoint=/docker/running" }),
        );
    };
    let Some(collector) = &st.collector else {
        return no_credentials();
    };

    let method = if req.method() == Method::POST { reqwest::Method::POST } else { reqwest::Method::GET };
    let body = if method == reqwest::Method::POST {
        match hyper::body::to_bytes(req.into_body()).await {
            Ok(b) => Some(b.to_vec()),
            Err(e) => {
                return json_response(
                    StatusCode::BAD_REQUEST,
                    &json!({ "error": "Failed to read request body", "message": e.to_string() }),
                )
            }
        }
    } else {
        None
    };

    match collector.api().forward(method, &endpoint, body).await {
        Ok((status, v)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            json_response(status, &v)
        }
        Err(e) => {
            error!(%endpoint, error = %e, "proxy failed");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": "Failed to fetch from Hummingbot API", "message": e.to_string() }),
            )
        }
    }
}

async fn route(st: &AppState, req: Request<Body>) -> Response<Body> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (method, path.as_str()) {
        (Method::OPTIONS, _) => text_response(StatusCode::OK, "text/plain", Vec::new()),
        (Method::GET, "/healthz") => text_response(StatusCode::OK, "text/plain", b"ok".to_vec()),
        (Method::GET, "/api/metrics") => match &st.collector {
            Some(c) => json_response(StatusCode::OK, &c.snapshot().await),
            None => no_credentials(),
        },
        (Method::GET, "/metrics") | (Method::GET, "/") => match &st.collector {
            Some(c) => {
                // gauges di-update oleh snapshot()
                let _ = c.snapshot().await;
                text_response(StatusCode::OK, "text/plain; version=0.0.4; charset=utf-8", encode_metrics())
            }
            None => no_credentials(),
        },
        (Method::GET, "/api/proxy") | (Method::POST, "/api/proxy") => proxy(st, req).await,
        _ => json_response(StatusCode::NOT_FOUND, &json!({ "error": "not found", "path": path })),
    }
}

pub async fn handle(st: Arc<AppState>, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let origin = req
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let mut rsp = route(&st, req).await;
    apply_cors(&mut rsp, &st.allowed_origins, origin.as_deref());
    Ok(rsp)
}

pub async fn serve(st: Arc<AppState>, port: u16) -> Result<(), hyper::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let make = make_service_fn(move |_conn| {
        let st = st.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(st.clone(), req))) }
    });
    info!(%addr, "http listening (/api/metrics, /metrics, /api/proxy)");
    Server::try_bind(&addr)?.serve(make).await
}
