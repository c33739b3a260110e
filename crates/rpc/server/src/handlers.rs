//! Status API handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use hyrule_primitives::{Fingerprint, RepoId, RepositoryObject, unix_millis};
use hyrule_storage::{DeleteOutcome, PutOutcome};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::{NodeApi, NodeStatus, PutObjectResponse, RepoObjects, RepoSummary, RpcError};

pub(crate) type ApiState = Arc<dyn NodeApi>;

/// Headers describing a served object.
pub(crate) const REPO_HEADER: &str = "x-hyrule-repo";
pub(crate) const PATH_HEADER: &str = "x-hyrule-path";

pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn status(State(api): State<ApiState>) -> Json<NodeStatus> {
    Json(api.status())
}

pub(crate) async fn list_repos(State(api): State<ApiState>) -> Json<Vec<RepoSummary>> {
    Json(RepoSummary::from_manifest(&api.store().manifest()))
}

pub(crate) async fn list_objects(
    State(api): State<ApiState>,
    Path(repo): Path<String>,
) -> Json<RepoObjects> {
    let repo = RepoId::new(repo);
    let fingerprints = api.store().list(&repo);
    Json(RepoObjects { repo, fingerprints })
}

#[derive(Debug, Deserialize)]
pub(crate) struct PutQuery {
    path: Option<String>,
}

/// Store the raw request body as an object of `repo` at `?path=`.
pub(crate) async fn put_object(
    State(api): State<ApiState>,
    Path(repo): Path<String>,
    Query(query): Query<PutQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, RpcError> {
    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or(RpcError::MissingParam("path"))?;
    let object = RepositoryObject::new(repo.as_str(), path, body, unix_millis());
    let fingerprint = object.fingerprint();

    let response = match api.store().blocking(move |store| store.put(object)).await? {
        PutOutcome::Stored { evicted } => {
            info!(%repo, %fingerprint, evicted = evicted.len(), "Object stored");
            PutObjectResponse {
                fingerprint,
                stored: true,
                evicted,
            }
        }
        PutOutcome::AlreadyPresent => {
            debug!(%repo, %fingerprint, "Object already stored");
            PutObjectResponse {
                fingerprint,
                stored: false,
                evicted: Vec::new(),
            }
        }
    };
    let status = if response.stored {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

pub(crate) async fn get_object(
    State(api): State<ApiState>,
    Path(fingerprint): Path<String>,
) -> Result<impl IntoResponse, RpcError> {
    let fingerprint: Fingerprint = fingerprint.parse()?;
    let object = api
        .store()
        .blocking(move |store| store.get(&fingerprint))
        .await?
        .ok_or(RpcError::NotFound)?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (header::HeaderName::from_static(REPO_HEADER), object.repo().to_string()),
        (header::HeaderName::from_static(PATH_HEADER), object.path().to_string()),
    ];
    Ok((headers, object.payload().clone()))
}

pub(crate) async fn delete_object(
    State(api): State<ApiState>,
    Path(fingerprint): Path<String>,
) -> Result<StatusCode, RpcError> {
    let fingerprint: Fingerprint = fingerprint.parse()?;
    match api.store().blocking(move |store| store.delete(&fingerprint)).await? {
        DeleteOutcome::Removed => {
            info!(%fingerprint, "Object deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        DeleteOutcome::NotFound => Err(RpcError::NotFound),
    }
}
