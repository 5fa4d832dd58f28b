//! Route handlers.
//!
//! Handlers are thin: they decode path parameters, call into the shared
//! [`GradingContext`] and encode the result. Work that touches progress files
//! runs on the blocking pool.

use std::sync::Arc;

use automark_core::{Challenge, GradingContext, ProgressReport, BUNDLE_DIGEST_HEADER};
use axum::extract::{Path, State};
use axum::http::{header, HeaderName};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};

pub type SharedContext = Arc<GradingContext>;

pub fn router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/get_test_input/:user/:assignment", get(get_test_input))
        .route(
            "/check_answer/:user/:assignment/:ipd/:answer",
            get(check_answer),
        )
        .route("/load_tests/:user", get(load_tests))
        .route("/check_sum/:digest", get(check_sum))
        .route("/get_progress/:user", get(get_progress))
        .route("/health", get(health))
        .with_state(ctx)
}

async fn get_test_input(
    State(ctx): State<SharedContext>,
    Path((user, assignment)): Path<(String, String)>,
) -> ApiResult<Json<Challenge>> {
    Ok(Json(ctx.issue_challenge(&user, &assignment)?))
}

async fn check_answer(
    State(ctx): State<SharedContext>,
    Path((user, assignment, ipd, answer)): Path<(String, String, String, String)>,
) -> ApiResult<Json<Value>> {
    let token: u32 = ipd
        .parse()
        .map_err(|_| ApiError::InvalidChallengeId(ipd.clone()))?;

    let correct = tokio::task::spawn_blocking(move || {
        ctx.verify_answer(&user, &assignment, token, &answer)
            .map(|correct| {
                info!(%user, %assignment, ipd = token, correct, "answer graded");
                correct
            })
    })
    .await??;

    Ok(Json(json!({ "success": correct })))
}

async fn load_tests(
    State(ctx): State<SharedContext>,
    Path(user): Path<String>,
) -> ApiResult<Response> {
    let artifact = ctx.load_tests(&user)?;
    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            HeaderName::from_static(BUNDLE_DIGEST_HEADER),
            artifact.digest().to_string(),
        ),
    ];
    Ok((headers, artifact.bytes().to_vec()).into_response())
}

async fn check_sum(
    State(ctx): State<SharedContext>,
    Path(digest): Path<String>,
) -> Json<Value> {
    let success = ctx.check_sum(&digest);
    debug!(%digest, success, "checksum queried");
    Json(json!({ "success": success }))
}

async fn get_progress(
    State(ctx): State<SharedContext>,
    Path(user): Path<String>,
) -> ApiResult<Json<ProgressReport>> {
    let report = tokio::task::spawn_blocking(move || ctx.progress_report(&user)).await??;
    Ok(Json(report))
}

async fn health(State(ctx): State<SharedContext>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "bundle_digest": ctx.bundle().digest(),
    }))
}
