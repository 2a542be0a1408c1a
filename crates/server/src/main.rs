use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use cluster::{HelmInstaller, KubectlControlPlane};
use provisioner::{DeleteOutcome, ProvisionError, Provisioner, TeardownError};
use shared::{
    domain::{StoreId, StoreRecord},
    error::{ApiError, ErrorCode},
    protocol::{DeleteStoreResponse, HealthResponse},
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::load_settings;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let cluster = Arc::new(KubectlControlPlane::new(
        settings.kubectl_bin.clone(),
        settings.kube_context.clone(),
    ));
    let installer = Arc::new(HelmInstaller::new(
        settings.helm_bin.clone(),
        settings.chart_path.clone(),
        settings.kube_context.clone(),
    ));
    let (provisioner, reconciler) =
        Provisioner::new(settings.provisioner_config(), cluster, installer);
    tokio::spawn(reconciler.run());

    let app = build_router(Arc::new(AppState { provisioner }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, chart = %settings.chart_path, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stores", get(list_stores).post(create_store))
        .route("/stores/:id", get(get_store).delete(delete_store))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn create_store(State(state): State<Arc<AppState>>) -> ApiResult<Json<StoreRecord>> {
    let record = state.provisioner.create_store().await.map_err(|e| {
        error!(error = %e, "store creation rejected");
        provision_error(e)
    })?;
    Ok(Json(record))
}

async fn list_stores(State(state): State<Arc<AppState>>) -> Json<Vec<StoreRecord>> {
    Json(state.provisioner.list_stores().await)
}

async fn get_store(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<StoreRecord>> {
    let id = parse_id(&id)?;
    state
        .provisioner
        .get_store(&id)
        .await
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

async fn delete_store(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let outcome = state
        .provisioner
        .delete_store(&id)
        .await
        .map_err(teardown_error)?;
    Ok(match outcome {
        DeleteOutcome::Removed(_) => {
            (StatusCode::OK, Json(DeleteStoreResponse::deleted())).into_response()
        }
        DeleteOutcome::InProgress(record) => (StatusCode::ACCEPTED, Json(record)).into_response(),
    })
}

fn parse_id(raw: &str) -> Result<StoreId, (StatusCode, Json<ApiError>)> {
    StoreId::parse(raw).map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(ErrorCode::Validation, err.to_string())),
        )
    })
}

fn not_found(id: &StoreId) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(
            ErrorCode::NotFound,
            format!("store '{id}' not found"),
        )),
    )
}

fn provision_error(err: ProvisionError) -> (StatusCode, Json<ApiError>) {
    match err {
        ProvisionError::NamespaceCollision(_)
        | ProvisionError::IdExhausted { .. }
        | ProvisionError::DeletedDuringCreation(_) => (
            StatusCode::CONFLICT,
            Json(ApiError::new(ErrorCode::Conflict, err.to_string())),
        ),
        ProvisionError::Registry(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(ErrorCode::Internal, err.to_string())),
        ),
    }
}

fn teardown_error(err: TeardownError) -> (StatusCode, Json<ApiError>) {
    match err {
        TeardownError::NotFound(id) => not_found(&id),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(ErrorCode::Internal, other.to_string())),
        ),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
