use super::*;
use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

use crate::error::FetchErrorCategory;

#[derive(Clone)]
struct ServerState {
    trade_tx: Arc<Mutex<Option<oneshot::Sender<Value>>>>,
}

fn apple_quote() -> Value {
    json!({
        "symbol": "AAPL",
        "companyName": "Apple Inc.",
        "price": 172.50,
        "change": 2.75,
        "changePercent": 1.62,
        "marketCap": "2.81T",
        "peRatio": 28.5,
        "week52High": 198.23,
        "week52Low": 148.96
    })
}

async fn handle_stock(Path(ticker): Path<String>) -> impl IntoResponse {
    if ticker == "AAPL" {
        (StatusCode::OK, Json(apple_quote()))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!("Invalid ticker symbol '{ticker}' or no data available.")
            })),
        )
    }
}

async fn handle_chart(
    Path(ticker): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if query.get("period").map(String::as_str) != Some("6mo") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid time frame specified."})),
        );
    }
    (
        StatusCode::OK,
        Json(json!([{
            "date": "2024-03-01 00:00:00",
            "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5,
            "volume": 1000.0,
            "ticker": ticker
        }])),
    )
}

async fn handle_evaluate(
    Path(ticker): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(days) = query.get("test_days").and_then(|d| d.parse::<u32>().ok()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "test_days is required"})),
        );
    };
    // Slower than the one-second client timeout used below.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    (
        StatusCode::OK,
        Json(json!({
            "ticker": ticker,
            "test_period": { "start_date": "2026-09-01", "end_date": "2026-10-15", "days": days },
            "dates": ["2026-10-15"],
            "actuals": [200.0],
            "models": {
                "ensemble": {
                    "predictions": [201.0],
                    "metrics": {
                        "mae": 1.0, "rmse": 1.0, "mape": 0.5,
                        "r_squared": 0.9, "directional_accuracy": 55.0
                    }
                }
            },
            "returns": null,
            "best_model": "ensemble"
        })),
    )
}

async fn handle_triggered(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let all = query.get("all").map(String::as_str) == Some("true");
    Json(json!([{
        "id": 4,
        "ticker": "AAPL",
        "message": if all { "AAPL fell below $150.00" } else { "recent only" }
    }]))
}

async fn handle_dismiss(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({"message": format!("Triggered alert {id} dismissed.")}))
}

async fn handle_buy(State(state): State<ServerState>, Json(body): Json<Value>) -> Json<Value> {
    if let Some(tx) = state.trade_tx.lock().await.take() {
        let _ = tx.send(body);
    }
    Json(json!({"message": "Bought 5 AAPL at $172.50"}))
}

async fn handle_news() -> &'static str {
    "<html>maintenance</html>"
}

async fn spawn_api_server() -> anyhow::Result<(String, oneshot::Receiver<Value>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel();
    let state = ServerState {
        trade_tx: Arc::new(Mutex::new(Some(tx))),
    };
    let app = Router::new()
        .route("/stock/:ticker", get(handle_stock))
        .route("/chart/:ticker", get(handle_chart))
        .route("/evaluate/:ticker", get(handle_evaluate))
        .route("/watchlist", get(|| async { Json(json!(["AAPL", "TSLA"])) }))
        .route("/notifications/triggered", get(handle_triggered))
        .route("/notifications/triggered/:id", delete(handle_dismiss))
        .route("/paper/buy", post(handle_buy))
        .route("/api/news", get(handle_news))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), rx))
}

fn client_for(server_url: &str) -> HttpDashboardClient {
    HttpDashboardClient::new(server_url, Duration::from_secs(5)).expect("client")
}

fn ticker(raw: &str) -> Ticker {
    Ticker::parse(raw).expect("ticker")
}

#[tokio::test]
async fn stock_quote_decodes_backend_payload() {
    let (server_url, _trade_rx) = spawn_api_server().await.expect("spawn server");
    let client = client_for(&server_url);

    let quote = client.stock(&ticker("aapl")).await.expect("quote");
    assert_eq!(quote.symbol, "AAPL");
    assert_eq!(quote.company_name, "Apple Inc.");
    assert_eq!(quote.pe_ratio.as_f64(), Some(28.5));
}

#[tokio::test]
async fn unknown_ticker_surfaces_server_error_message() {
    let (server_url, _trade_rx) = spawn_api_server().await.expect("spawn server");
    let client = client_for(&server_url);

    let err = client.stock(&ticker("ZZZZ")).await.expect_err("must fail");
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.category(), FetchErrorCategory::NotFound);
    assert_eq!(
        err.user_message(),
        "Invalid ticker symbol 'ZZZZ' or no data available."
    );
}

#[tokio::test]
async fn chart_sends_period_query() {
    let (server_url, _trade_rx) = spawn_api_server().await.expect("spawn server");
    let client = client_for(&server_url);

    let points = client
        .chart(&ticker("AAPL"), ChartPeriod::SixMonths)
        .await
        .expect("chart");
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].close, 1.5);

    let err = client
        .chart(&ticker("AAPL"), ChartPeriod::OneDay)
        .await
        .expect_err("server rejects other periods");
    assert_eq!(err.category(), FetchErrorCategory::Validation);
}

#[tokio::test]
async fn evaluate_sends_window_and_waits_past_request_timeout() {
    let (server_url, _trade_rx) = spawn_api_server().await.expect("spawn server");
    let client = HttpDashboardClient::new(&server_url, Duration::from_secs(1)).expect("client");

    let evaluation = client
        .evaluate(&ticker("AAPL"), EvaluationWindow::Days30)
        .await
        .expect("evaluation");
    assert_eq!(evaluation.ticker, "AAPL");
    assert_eq!(evaluation.test_period.days, 30);
    assert_eq!(evaluation.best_model, "ensemble");
    assert!(evaluation.returns.is_none());
}

#[tokio::test]
async fn triggered_alerts_request_full_history_when_asked() {
    let (server_url, _trade_rx) = spawn_api_server().await.expect("spawn server");
    let client = client_for(&server_url);

    let all = client.triggered_alerts(true).await.expect("alerts");
    assert_eq!(all[0].message, "AAPL fell below $150.00");

    let recent = client.triggered_alerts(false).await.expect("alerts");
    assert_eq!(recent[0].message, "recent only");

    let dismissed = client
        .dismiss_triggered_alert(TriggeredAlertId(4))
        .await
        .expect("dismiss");
    assert_eq!(dismissed.message, "Triggered alert 4 dismissed.");
}

#[tokio::test]
async fn trade_posts_json_body() {
    let (server_url, trade_rx) = spawn_api_server().await.expect("spawn server");
    let client = client_for(&server_url);

    let response = client
        .trade_stock(
            TradeSide::Buy,
            &StockTradeRequest {
                ticker: ticker("aapl"),
                shares: 5,
            },
        )
        .await
        .expect("trade");
    assert_eq!(response.message, "Bought 5 AAPL at $172.50");

    let body = trade_rx.await.expect("body");
    assert_eq!(body, json!({"ticker": "AAPL", "shares": 5}));
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let (server_url, _trade_rx) = spawn_api_server().await.expect("spawn server");
    let client = client_for(&server_url);

    let err = client.news().await.expect_err("must fail");
    assert_eq!(err.category(), FetchErrorCategory::Data);
}

#[tokio::test]
async fn watchlist_returns_plain_ticker_list() {
    let (server_url, _trade_rx) = spawn_api_server().await.expect("spawn server");
    let client = client_for(&server_url);

    assert_eq!(
        client.watchlist().await.expect("watchlist"),
        vec!["AAPL".to_string(), "TSLA".to_string()]
    );
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = client_for(&format!("http://{addr}"));
    let err = client.watchlist().await.expect_err("must fail");
    assert_eq!(err.category(), FetchErrorCategory::Transport);
}

#[test]
fn base_url_with_path_prefix_keeps_prefix() {
    let client = client_for("http://127.0.0.1:5001/backend/");
    let url = client.url(&["stock", "AAPL"]).expect("url");
    assert_eq!(url.as_str(), "http://127.0.0.1:5001/backend/stock/AAPL");
}

#[test]
fn rejects_non_http_base_url() {
    let err = HttpDashboardClient::new("ftp://example.com", Duration::from_secs(1))
        .expect_err("must reject");
    assert!(err.to_string().contains("unsupported scheme"));
}
