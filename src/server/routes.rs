//! HTTP routes.

use crate::server::handler::{
    AnalyzeReply, AnalyzeRequest, RequestFailure, RequestHandler, UploadedAudio,
};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Build the server router.
pub fn router(handler: Arc<RequestHandler>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

async fn healthcheck() -> Json<Value> {
    Json(json!({ "msg": "Server is healthy." }))
}

async fn analyze(
    State(handler): State<Arc<RequestHandler>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<AnalyzeReply> {
    let request = match multipart {
        Ok(multipart) => match read_form(multipart).await {
            Ok(request) => request,
            Err(e) => {
                warn!("Failed to read upload: {e}");
                return Json(RequestFailure::Storage.into());
            }
        },
        Err(rejection) => {
            warn!("Rejected analyze request: {rejection}");
            AnalyzeRequest::default()
        }
    };

    let reply = tokio::task::spawn_blocking(move || handler.handle(request))
        .await
        .unwrap_or_else(|e| {
            error!("Analysis task failed: {e}");
            RequestFailure::Analysis("worker failed".to_string()).into()
        });

    Json(reply)
}

/// Collect the `audio` and `meta` fields; other fields are ignored.
async fn read_form(mut multipart: Multipart) -> Result<AnalyzeRequest, MultipartError> {
    let mut request = AnalyzeRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("audio") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?.to_vec();
                request.audio = Some(UploadedAudio { file_name, data });
            }
            Some("meta") => request.meta = Some(field.text().await?),
            _ => {}
        }
    }

    Ok(request)
}
