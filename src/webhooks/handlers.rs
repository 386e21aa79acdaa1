use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{AppError, AppResult},
    state::AppState,
    users::dto::PublicUser,
    utils::handle_error,
    webhooks::{
        dto::{WebhookEvent, WebhookResponse, USER_CREATED, USER_DELETED, USER_UPDATED},
        signature::SvixHeaders,
    },
};

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/api/webhooks/clerk", post(clerk_webhook))
}

/// Clerk user sync. Deliveries are not deduplicated: a repeated
/// `user.created` fails on the unique indexes.
#[instrument(skip(state, headers, body))]
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let svix = SvixHeaders::from_headers(&headers).inspect_err(|_| {
        warn!("webhook without svix headers");
    })?;

    state
        .verifier
        .verify(&svix, &body, OffsetDateTime::now_utc())
        .inspect_err(|e| warn!(error = %e, svix_id = svix.id, "error verifying webhook"))?;

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, svix_id = svix.id, "verified webhook has an unreadable body");
        AppError::InvalidPayload(e.to_string())
    })?;
    info!(kind = %event.kind, data_id = event.data_id(), svix_id = svix.id, "webhook received");

    let read_user = || {
        event.user().inspect_err(|e| {
            warn!(error = %e, svix_id = svix.id, "user event with unreadable data");
        })
    };

    match event.kind.as_str() {
        USER_CREATED => {
            let data = read_user()?;
            let user = state.users.create_user(data.to_create_params()).await?;
            state
                .identity
                .update_public_metadata(&user.clerk_id, &user.id.to_hex())
                .await
                .map_err(handle_error)?;
            Ok(Json(WebhookResponse::ok(Some(user.into()))).into_response())
        }
        USER_UPDATED => {
            let data = read_user()?;
            let user = state
                .users
                .update_user(data.clerk_id(), data.to_update_params())
                .await?;
            Ok(Json(WebhookResponse::ok(Some(user.into()))).into_response())
        }
        USER_DELETED => {
            let data = read_user()?;
            let deleted = state.users.delete_user(data.clerk_id()).await?;
            Ok(Json(WebhookResponse::ok(deleted.map(PublicUser::from))).into_response())
        }
        other => {
            debug!(kind = other, "ignoring webhook event");
            Ok(StatusCode::OK.into_response())
        }
    }
}
