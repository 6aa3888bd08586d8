use std::sync::Arc;

use log::{debug, error, info};
use percent_encoding::percent_decode_str;
use warp::http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::hyper::Body;
use warp::{reply, Filter, Rejection, Reply};

use super::types::{ApiError, SyncQuery, SyncResponse};
use crate::catalog::CatalogService;
use crate::error_handling::types::CatalogError;
use crate::sync_coordinator::{SyncCoordinator, TriggerOutcome};

const DASHBOARD: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Recordings</title>
  <style>
    body { font-family: sans-serif; margin: 2em; background: #111; color: #eee; }
    video { width: 100%; max-width: 960px; background: #000; display: block; margin-top: 1em; }
    #status { color: #999; margin-left: 1em; }
  </style>
</head>
<body>
  <h1>Recordings</h1>
  <select id="videos"></select>
  <button id="sync">Sync</button>
  <span id="status"></span>
  <video id="player" controls></video>
  <script>
    const select = document.getElementById("videos");
    const status = document.getElementById("status");
    const player = document.getElementById("player");

    async function load() {
      const res = await fetch("/videos");
      const body = await res.json();
      if (!res.ok) {
        status.textContent = body.message;
        return;
      }
      select.innerHTML = "";
      for (const video of body) {
        const option = document.createElement("option");
        option.value = video.path;
        option.textContent = video.name;
        select.appendChild(option);
      }
      status.textContent = body.length + " video(s)";
      if (body.length > 0) player.src = select.value;
    }

    select.addEventListener("change", () => { player.src = select.value; });
    document.getElementById("sync").addEventListener("click", async () => {
      const res = await fetch("/sync", { method: "POST" });
      status.textContent = (await res.json()).message;
    });
    load();
  </script>
</body>
</html>
"#;

fn api_error(message: impl Into<String>, status: StatusCode) -> reply::Response {
    reply::with_status(reply::json(&ApiError::new(message)), status).into_response()
}

fn catalog_error(err: &CatalogError) -> reply::Response {
    let status = match err {
        CatalogError::Busy => StatusCode::CONFLICT,
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Io(_) => {
            error!("Catalog request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(err.to_string(), status)
}

/// GET /
pub fn dashboard_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .and_then(|| async move { Ok::<_, Rejection>(reply::html(DASHBOARD)) })
}

/// GET /videos
pub fn list_videos_route(
    catalog: Arc<CatalogService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("videos")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let catalog = catalog.clone();
            async move {
                let res = match catalog.list_videos().await {
                    Ok(videos) => reply::with_status(reply::json(&videos), StatusCode::OK).into_response(),
                    Err(e) => catalog_error(&e),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// GET /video-cache/:name
pub fn stream_artifact_route(
    catalog: Arc<CatalogService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("video-cache" / String)
        .and(warp::get())
        .and_then(move |raw_name: String| {
            let catalog = catalog.clone();
            async move {
                let Ok(name) = percent_decode_str(&raw_name).decode_utf8() else {
                    return Ok::<_, Rejection>(api_error("Artifact not found", StatusCode::NOT_FOUND));
                };
                let stream = match catalog.stream_artifact(&name).await {
                    Ok(stream) => stream,
                    Err(e) => return Ok::<_, Rejection>(catalog_error(&e)),
                };

                let content_type = mime_guess::from_path(&*name).first_or_octet_stream();
                let len = stream.len();
                let mut res = reply::Response::new(Body::wrap_stream(stream));
                if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
                    res.headers_mut().insert(CONTENT_TYPE, value);
                }
                res.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(len));
                Ok::<_, Rejection>(res)
            }
        })
}

/// POST /sync?mode=incremental|full
pub fn trigger_sync_route(
    coordinator: Arc<SyncCoordinator>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("sync")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::query::<SyncQuery>())
        .and_then(move |query: SyncQuery| {
            let coordinator = coordinator.clone();
            async move {
                let Some(mode) = query.sync_mode() else {
                    return Ok::<_, Rejection>(api_error(
                        format!("Unknown sync mode {:?}", query.mode.unwrap_or_default()),
                        StatusCode::BAD_REQUEST,
                    ));
                };

                let outcome = coordinator.trigger(mode);
                info!("Sync requested over HTTP ({:?}): {:?}", mode, outcome);
                let status = match outcome {
                    TriggerOutcome::Accepted => StatusCode::ACCEPTED,
                    TriggerOutcome::AlreadyInProgress => StatusCode::CONFLICT,
                    TriggerOutcome::Disabled => StatusCode::SERVICE_UNAVAILABLE,
                };
                Ok::<_, Rejection>(
                    reply::with_status(reply::json(&SyncResponse::from(outcome)), status).into_response(),
                )
            }
        })
}

/// GET /sync-status
pub fn sync_status_route(
    coordinator: Arc<SyncCoordinator>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("sync-status")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let coordinator = coordinator.clone();
            async move {
                let status = coordinator.status();
                debug!("Sync status requested: syncing={}", status.syncing);
                Ok::<_, Rejection>(reply::json(&status))
            }
        })
}

/// Every route, with CORS open to any origin.
pub fn routes(
    catalog: Arc<CatalogService>,
    coordinator: Arc<SyncCoordinator>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    dashboard_route()
        .or(list_videos_route(catalog.clone()))
        .or(stream_artifact_route(catalog))
        .or(trigger_sync_route(coordinator.clone()))
        .or(sync_status_route(coordinator))
        .with(cors)
}
