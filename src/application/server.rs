//! Relay HTTP surface

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

use super::bot_controller::BotController;
use super::responses::{
    BotStatusResponse, CreateSwapRequest, ErrorResponse, ExecuteSignedRequest, QuoteQuery, StartBotRequest,
    StartBotResponse, StopBotResponse, SwapTransactionRequest, TradeRecordDto,
};
use super::services::RelayService;

/// Everything the handlers need
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayService>,
    pub bot: BotController,
}

impl AppState {
    pub fn new(relay: Arc<RelayService>, bot: BotController) -> Self {
        Self { relay, bot }
    }
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// All relay routes with permissive CORS and JSON error bodies
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    let health = warp::path!("health")
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: AppState| warp::reply::json(&state.relay.health()));

    let balance = warp::path!("balance" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(balance_handler);

    let arb = warp::path!("arb")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(check_arbitrage_handler);

    let create = warp::path!("create-swap-transactions")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(create_swap_transactions_handler);

    let execute = warp::path!("execute-signed-transaction")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(execute_signed_transaction_handler);

    let quote = warp::path!("quote")
        .and(warp::get())
        .and(warp::query::<QuoteQuery>())
        .and(with_state(state.clone()))
        .and_then(quote_handler);

    let swap = warp::path!("swap-transaction")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(swap_transaction_handler);

    let bot_status = warp::path!("bot" / "status")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(bot_status_handler);

    let bot_start = warp::path!("bot" / "start")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .and_then(bot_start_handler);

    let bot_stop = warp::path!("bot" / "stop")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(bot_stop_handler);

    let bot_history = warp::path!("bot" / "history")
        .and(warp::get())
        .and(with_state(state))
        .and_then(bot_history_handler);

    health
        .or(balance)
        .or(arb)
        .or(create)
        .or(execute)
        .or(quote)
        .or(swap)
        .or(bot_status)
        .or(bot_start)
        .or(bot_stop)
        .or(bot_history)
        .recover(handle_rejection)
        .with(cors)
        .with(warp::trace::request())
}

/// Bind and serve until `shutdown` resolves
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), warp::Error> {
    let (bound, server) = warp::serve(routes(state)).try_bind_with_graceful_shutdown(addr, shutdown)?;
    info!("🌐 Relay listening on http://{}", bound);
    server.await;
    info!("🛑 Relay stopped");
    Ok(())
}

async fn balance_handler(address: String, state: AppState) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&state.relay.balance(&address).await))
}

async fn check_arbitrage_handler(state: AppState) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&state.relay.check_arbitrage().await))
}

async fn create_swap_transactions_handler(
    request: CreateSwapRequest,
    state: AppState,
) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&state.relay.create_swap_transactions(request).await))
}

async fn execute_signed_transaction_handler(
    request: ExecuteSignedRequest,
    state: AppState,
) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&state.relay.execute_signed_transaction(request).await))
}

async fn quote_handler(query: QuoteQuery, state: AppState) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&state.relay.quote(query).await))
}

async fn swap_transaction_handler(
    request: SwapTransactionRequest,
    state: AppState,
) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&state.relay.swap_transaction(request).await))
}

async fn bot_status_handler(state: AppState) -> Result<impl Reply, Infallible> {
    let status = BotStatusResponse::from(state.bot.status().await);
    Ok(warp::reply::json(&status))
}

async fn bot_start_handler(body: Bytes, state: AppState) -> Result<impl Reply, Infallible> {
    let request: StartBotRequest = if body.iter().all(u8::is_ascii_whitespace) {
        StartBotRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => return Ok(warp::reply::json(&refused(format!("Invalid request body: {}", e)))),
        }
    };

    let mut settings = state.bot.settings().await;
    if let Some(secs) = request.interval_secs {
        if secs == 0 {
            return Ok(warp::reply::json(&refused("intervalSecs must be positive")));
        }
        settings.interval = Duration::from_secs(secs);
    }
    if let Some(threshold) = request.min_profit_threshold {
        settings.min_profit_threshold = threshold;
    }
    if let Some(stop_on_error) = request.stop_on_error {
        settings.stop_on_error = stop_on_error;
    }

    let response = match state.bot.start(settings).await {
        Ok(()) => StartBotResponse {
            started: true,
            reason: None,
        },
        Err(e) => {
            warn!("⚠️ {}", e);
            refused(e.to_string())
        }
    };
    Ok(warp::reply::json(&response))
}

fn refused(reason: impl Into<String>) -> StartBotResponse {
    StartBotResponse {
        started: false,
        reason: Some(reason.into()),
    }
}

async fn bot_stop_handler(state: AppState) -> Result<impl Reply, Infallible> {
    state.bot.stop().await;
    Ok(warp::reply::json(&StopBotResponse { stopped: true }))
}

async fn bot_history_handler(state: AppState) -> Result<impl Reply, Infallible> {
    let history: Vec<TradeRecordDto> = state
        .bot
        .coordinator()
        .history()
        .await
        .into_iter()
        .map(TradeRecordDto::from)
        .collect();
    Ok(warp::reply::json(&history))
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, error) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        warn!("⚠️ Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };
    Ok(warp::reply::with_status(warp::reply::json(&ErrorResponse { error }), status))
}
