//! Link handlers
//!
//! HTTP surface for creating and removing CLA links. The acting user is
//! resolved by the authentication middleware in front of this service and
//! handed down in the `X-Actor` header.

use actix_web::{HttpRequest, HttpResponse, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::AppError;
use crate::models::LinkCreateOption;
use crate::services::LinkError;

/// Standard API response wrapper
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    data: T,
    meta: ResponseMeta,
}

#[derive(Serialize)]
struct ResponseMeta {
    request_id: String,
}

impl<T: Serialize> ApiResponse<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta {
                request_id: uuid::Uuid::new_v4().to_string(),
            },
        }
    }
}

/// Request payload for link creation: the creation option plus the
/// base64-encoded countersignature image for the corporate CLA.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    #[serde(flatten)]
    pub option: LinkCreateOption,
    #[serde(default)]
    pub org_signature: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLinkResponse {
    link_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnlinkResponse {
    link_id: String,
    deleted: bool,
}

fn actor_from(req: &HttpRequest) -> Result<String, AppError> {
    req.headers()
        .get("X-Actor")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Unauthorized("missing X-Actor header".to_string()))
}

/// POST /v1/link
///
/// Create a link between an org/repo scope and its CLA documents.
pub async fn create_link(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateLinkRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let request = body.into_inner();

    let org_signature = request
        .org_signature
        .map(|encoded| STANDARD.decode(encoded))
        .transpose()
        .map_err(|err| AppError::Validation(format!("orgSignature is not valid base64: {err}")))?;

    let link_id = state
        .links
        .create_link(request.option, org_signature, &actor)
        .await
        .map_err(map_link_error)?;

    Ok(HttpResponse::Created().json(ApiResponse::new(CreateLinkResponse { link_id })))
}

/// DELETE /v1/link/{link_id}
///
/// Remove a link.
pub async fn unlink(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let link_id = path.into_inner();

    state
        .links
        .unlink(&link_id, &actor)
        .await
        .map_err(map_link_error)?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(UnlinkResponse {
        link_id,
        deleted: true,
    })))
}

/// Map link errors to application errors
fn map_link_error(e: LinkError) -> AppError {
    match e {
        LinkError::Validation(err) => AppError::Validation(err.to_string()),
        LinkError::NotOrgOwner { .. } => AppError::Forbidden(e.to_string()),
        LinkError::LinkExists(scope) => {
            AppError::Conflict(format!("a link already exists for {scope}"))
        }
        LinkError::LinkNotFound(id) => AppError::NotFound(format!("link not found: {id}")),
        LinkError::Auth(err) => AppError::Internal(err.to_string()),
        LinkError::Lock(err) => AppError::Internal(format!("scope lock: {err}")),
        LinkError::Document(err) => AppError::Internal(format!("document storage: {err}")),
        LinkError::Store(err) => AppError::Internal(err.to_string()),
    }
}

/// Configure link routes
pub fn configure_link_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/link").route(web::post().to(create_link)));
    cfg.service(web::resource("/link/{link_id}").route(web::delete().to(unlink)));
}
