//! HTTP grading service for AutoMark.
//!
//! | Route | Result |
//! |-------|--------|
//! | `GET /get_test_input/{user}/{assignment}` | `{username, ipd, input}` |
//! | `GET /check_answer/{user}/{assignment}/{ipd}/{answer}` | `{success}` |
//! | `GET /load_tests/{user}` | raw fixture bundle |
//! | `GET /check_sum/{digest}` | `{success}` |
//! | `GET /get_progress/{user}` | `{name, mail, progress}` |
//! | `GET /health` | `{status, bundle_digest}` |
//!
//! Rejected requests answer `{error}` with status 300.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use automark_core::GradingContext;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub mod error;
pub mod routes;

pub use error::{ApiError, ApiResult, ERROR_STATUS};
pub use routes::{router, SharedContext};

/// Install the global subscriber. `RUST_LOG` wins over the `info` default.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

/// Serve `ctx` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, ctx: Arc<GradingContext>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("listener has no local address")?;
    info!(%addr, bundle_digest = %ctx.bundle().digest(), "automark server listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;

    info!("automark server stopped");
    Ok(())
}
