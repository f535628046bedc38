//! Webhook handler
//!
//! Entry point for pull-request events delivered by the code-hosting
//! platform's dispatcher. A PR event triggers reconciliation directly; a
//! comment event triggers it only when the comment carries the `/check-cla`
//! command.

use std::collections::HashSet;

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;
use crate::error::AppError;
use crate::models::PrInfo;
use crate::services::{ReconcileError, is_check_cla_command};

/// A pull-request event, normalized by the dispatcher in front of this
/// service. `comment` is present only for comment events.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub org: String,
    pub repo: String,
    pub number: u64,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileResponse {
    all_signed: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IgnoredResponse {
    ignored: bool,
}

/// POST /v1/webhook
///
/// Reconcile the pull request named by the event. The response carries
/// whether every commit identity has signed, which the merge-gating caller
/// keys on.
pub async fn handle_webhook(
    state: web::Data<AppState>,
    body: web::Json<WebhookEvent>,
) -> Result<HttpResponse, AppError> {
    let event = body.into_inner();

    // Comment events only matter when they carry the re-check command.
    if let Some(comment) = &event.comment {
        if !is_check_cla_command(comment) {
            return Ok(HttpResponse::Ok().json(IgnoredResponse { ignored: true }));
        }
    }

    let pr = PrInfo::new(&event.org, &event.repo, event.number);
    let labels: HashSet<String> = event.labels.into_iter().collect();

    let all_signed = state
        .cla
        .reconcile(&pr, &labels, &state.repo_config)
        .await
        .map_err(map_reconcile_error)?;

    info!(pr = %pr, all_signed = all_signed, "reconciled cla status");
    Ok(HttpResponse::Ok().json(ReconcileResponse { all_signed }))
}

/// Map reconciliation errors to application errors
fn map_reconcile_error(e: ReconcileError) -> AppError {
    match e {
        ReconcileError::NoRepoConfig { .. } => AppError::NotFound(e.to_string()),
        ReconcileError::Tracker(err) => AppError::Internal(err.to_string()),
    }
}

/// Configure webhook routes
pub fn configure_webhook_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/webhook").route(web::post().to(handle_webhook)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_event_deserializes_with_defaults() {
        let raw = r#"{"org":"orgA","repo":"repo1","number":7}"#;
        let event: WebhookEvent = serde_json::from_str(raw).expect("valid event");
        assert_eq!(event.number, 7);
        assert!(event.labels.is_empty());
        assert!(event.comment.is_none());
    }

    #[test]
    fn webhook_event_carries_labels_and_comment() {
        let raw = r#"{
            "org": "orgA",
            "repo": "repo1",
            "number": 7,
            "labels": ["cla/no"],
            "comment": "/check-cla"
        }"#;
        let event: WebhookEvent = serde_json::from_str(raw).expect("valid event");
        assert_eq!(event.labels, vec!["cla/no".to_string()]);
        assert!(is_check_cla_command(event.comment.as_deref().unwrap()));
    }
}
