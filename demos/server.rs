//! Small server showing the error documents the exception layer produces.
//!
//! ```text
//! EXCEPTION_SHOW_STACK_TRACE=1 cargo run --example server
//! curl -i localhost:3000/orders/7
//! curl -i localhost:3000/games
//! ```

use axum::{error_handling::HandleErrorLayer, routing::get};
use json_exception_handler::prelude::*;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

#[derive(Debug, Error)]
#[error("order {0} does not exist")]
struct OrderMissing(u64);

#[derive(Debug, Error)]
#[error("Game request is invalid.")]
struct GameValidationError {
    failures: Vec<ValidationFailure>,
}

#[derive(Debug, Error)]
#[error("warehouse service did not answer")]
struct WarehouseUnavailable {
    #[source]
    cause: std::io::Error,
}

async fn order(Path(id): Path<u64>) -> Result<String, Failure> {
    if id == 1 {
        return Ok("order 1".to_string());
    }
    Err(OrderMissing(id).into())
}

async fn games() -> Result<Json<Vec<String>>, Failure> {
    Err(GameValidationError {
        failures: vec![
            ValidationFailure::new("Uno", "cards", "is not a game"),
            ValidationFailure::new("Players", 12, "must be between 2 and 10"),
        ],
    }
    .into())
}

async fn stock() -> Result<String, Failure> {
    Err(WarehouseUnavailable {
        cause: std::io::Error::new(std::io::ErrorKind::TimedOut, "connection timed out"),
    }
    .into())
}

async fn unfinished() -> Result<String, Failure> {
    Err(NotImplemented::default().into())
}

async fn crash() -> &'static str {
    panic!("inventory index out of sync")
}

fn classification() -> ClassificationTable {
    ClassificationTable::standard()
        .on::<OrderMissing, _>(|record, _| record.with_kind(ErrorKind::RequestError).with_status(404))
        .on::<GameValidationError, _>(|record, err| {
            record
                .with_kind(ErrorKind::DataValidationError)
                .with_status(400)
                .with_validation_failures(err.failures.clone())
        })
        .on::<WarehouseUnavailable, _>(|record, _| {
            record.with_kind(ErrorKind::ExternalError).with_status(502)
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = HandlerConfig::from_env().omit_source("/rustc/");
    tracing::info!("Stack traces in error documents: {}", config.show_stack_trace);

    let exceptions = ExceptionInterceptor::new(config).with_classifier(classification());

    let app = Router::new()
        .route("/orders/{id}", get(order))
        .route("/games", get(games))
        .route("/stock", get(stock))
        .route("/reports", get(unfinished))
        .route("/crash", get(crash))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(HandleErrorLayer::new(|err: BoxError| async move {
                    tracing::error!("Request failed after the response started: {}", err);
                    StatusCode::INTERNAL_SERVER_ERROR
                }))
                .layer(ExceptionLayer::new(exceptions)),
        );

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("Server running on http://127.0.0.1:3000");
    axum::serve(listener, app).await?;

    Ok(())
}
