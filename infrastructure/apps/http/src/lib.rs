use app_credentials::CredentialStore;
use app_errors::ApplicationError;
use app_models::{AppResponse, IssuedAppResponse, RegisterAppRequest};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::post,
};
use common_errors::AppError;
use serde::Deserialize;
use sql_connection::SqlConnect;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppServices {
    pub credentials: CredentialStore,
}

impl AppServices {
    pub fn new(db: SqlConnect) -> Self {
        Self {
            credentials: CredentialStore::new(db),
        }
    }
}

pub struct AppHandlers;

impl AppHandlers {
    pub fn routes() -> Router<AppServices> {
        Router::new()
            .route("/", post(register_app))
            .route("/{id}/revoke", post(revoke_app))
            .route("/{id}/regenerate", post(regenerate_key))
    }
}

fn map_error(err: ApplicationError) -> AppError {
    match err {
        ApplicationError::NotFound { .. } => {
            AppError::not_found("APP_NOT_FOUND", "Application not found")
        }
        ApplicationError::Connection(_) => AppError::storage_unavailable(
            "Application store is unreachable, try again shortly",
        ),
        err => AppError::from_error(err),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OwnerRequest {
    #[serde(rename = "ownerId")]
    pub owner_id: Uuid,
}

#[utoipa::path(
    post,
    path = "/api/apps",
    request_body = RegisterAppRequest,
    responses(
        (status = 201, description = "Application registered; the key in this response is shown exactly once", body = IssuedAppResponse),
        (status = 400, description = "Invalid request data"),
        (status = 500, description = "Internal server error")
    ),
    tag = "apps"
)]
#[instrument(skip_all)]
pub async fn register_app(
    State(services): State<AppServices>,
    Json(request): Json<RegisterAppRequest>,
) -> Result<(StatusCode, Json<IssuedAppResponse>), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::bad_request(
            "INVALID_APP_NAME",
            "Application name must not be empty",
        ));
    }

    let issued =
        services.credentials.issue(request).await.map_err(map_error)?;
    Ok((
        StatusCode::CREATED,
        Json(IssuedAppResponse {
            app: issued.app.into(),
            api_key: issued.plaintext_key,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/apps/{id}/revoke",
    request_body = OwnerRequest,
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Key revoked", body = AppResponse),
        (status = 404, description = "Application not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "apps"
)]
#[instrument(skip_all, fields(app.id = %id))]
pub async fn revoke_app(
    State(services): State<AppServices>, Path(id): Path<Uuid>,
    Json(request): Json<OwnerRequest>,
) -> Result<Json<AppResponse>, AppError> {
    let app = services
        .credentials
        .revoke(id, request.owner_id)
        .await
        .map_err(map_error)?;
    Ok(Json(app.into()))
}

#[utoipa::path(
    post,
    path = "/api/apps/{id}/regenerate",
    request_body = OwnerRequest,
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "New key issued; shown exactly once", body = IssuedAppResponse),
        (status = 404, description = "Application not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "apps"
)]
#[instrument(skip_all, fields(app.id = %id))]
pub async fn regenerate_key(
    State(services): State<AppServices>, Path(id): Path<Uuid>,
    Json(request): Json<OwnerRequest>,
) -> Result<Json<IssuedAppResponse>, AppError> {
    let issued = services
        .credentials
        .regenerate(id, request.owner_id)
        .await
        .map_err(map_error)?;
    Ok(Json(IssuedAppResponse {
        app: issued.app.into(),
        api_key: issued.plaintext_key,
    }))
}
