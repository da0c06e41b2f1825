use std::future::Future;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path as KeyPath, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::service::{parse_limit, KeyService, Stats};
use crate::{KvsEngine, KvsError, Record, Result};

// the name of the page served at `/`, looked up in the templates directory
const INDEX_PAGE: &str = "index.html";

/// The JSON body returned by every failed API request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// a description of the error
    pub error: String,
}

/// reads the index page from the `templates` directory.
///
/// # Errors
/// returns [`KvsError::Io`] if the page could not be read. The server can not start without it.
pub fn load_page(templates: &Path) -> Result<Bytes> {
    let path = templates.join(INDEX_PAGE);
    let page = std::fs::read(&path)?;
    debug!("loaded {} bytes from {:?}", page.len(), path);
    Ok(Bytes::from(page))
}

/// An HTTP server over a key value storage engine.
///
/// It serves the JSON API under `/api`, the index page at `/` and static assets under
/// `/static/`. Requests are handled on the async runtime, but their storage work runs on the
/// runtime's blocking threads, one engine transaction per request.
///
/// # Example
/// ```rust,no_run
/// use std::path::Path;
/// use kvs_web::{load_page, KvsServer, SledKvsEngine};
/// # fn main() -> kvs_web::Result<()> {
/// let engine = SledKvsEngine::open(Path::new("./badger-data"))?;
/// let page = load_page(Path::new("templates"))?;
/// let server = KvsServer::new(engine, page, "static");
/// let runtime = tokio::runtime::Runtime::new()?;
/// runtime.block_on(async move {
///     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
///     server.run(listener).await
/// })
/// # }
/// ```
pub struct KvsServer<E: KvsEngine> {
    state: AppState<E>,
    /// directory static assets are served from
    static_dir: PathBuf,
}

impl<E: KvsEngine> KvsServer<E> {
    /// Create a new `KvsServer` using the given [`KvsEngine`], index `page` and static asset
    /// directory.
    pub fn new(engine: E, page: Bytes, static_dir: impl Into<PathBuf>) -> Self {
        KvsServer {
            state: AppState {
                service: KeyService::new(engine),
                page,
            },
            static_dir: static_dir.into(),
        }
    }

    /// builds the axum [`Router`] for this server
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index::<E>))
            .route("/api/keys", get(list_keys::<E>).post(create_key::<E>))
            .route(
                "/api/keys/:key",
                get(get_key::<E>)
                    .put(update_key::<E>)
                    .delete(delete_key::<E>),
            )
            .route("/api/stats", get(stats::<E>))
            .route("/api/search", get(search_keys::<E>))
            .nest_service("/static", ServeDir::new(&self.static_dir))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// serves requests arriving on `listener` until the process receives Ctrl-C
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// serves requests arriving on `listener` until `signal` completes. In flight requests
    /// are allowed to finish and the engine is flushed before returning.
    pub async fn run_until<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await?;

        info!("server stopped, flushing engine");
        self.state.service.engine().flush()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// state shared by every request handler
#[derive(Clone)]
struct AppState<E: KvsEngine> {
    service: KeyService<E>,
    page: Bytes,
}

impl<E: KvsEngine> AppState<E> {
    /// runs `job` on a blocking thread and waits for its result.
    /// A job that panics is reported as an internal error.
    async fn run<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&KeyService<E>) -> Result<T> + Send + 'static,
    {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || job(&service))
            .await
            .map_err(|e| KvsError::StringErr(format!("storage task failed: {}", e)))?
    }
}

impl IntoResponse for KvsError {
    fn into_response(self) -> Response {
        let status = match &self {
            KvsError::KeyNotFound => StatusCode::NOT_FOUND,
            KvsError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if self.is_client_error() {
            debug!(%status, "rejected request: {}", self);
        } else {
            error!(%status, "request failed: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// decodes a JSON request body. Malformed bodies are a validation error.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| KvsError::Validation(format!("Invalid JSON: {}", e)))
}

/// the query string as decoded pairs, in order. Repeated names are kept.
type QueryPairs = std::result::Result<Query<Vec<(String, String)>>, QueryRejection>;

/// the first value of the `name` query parameter. An undecodable query string has none.
fn first_param(query: QueryPairs, name: &str) -> Option<String> {
    let Query(pairs) = query.ok()?;
    pairs.into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

/// the decoded `{key}` path segment
fn key_param(path: std::result::Result<KeyPath<String>, PathRejection>) -> Result<String> {
    path.map(|KeyPath(key)| key)
        .map_err(|e| KvsError::Validation(format!("Invalid key: {}", e.body_text())))
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    #[serde(default)]
    value: String,
}

async fn index<E: KvsEngine>(State(state): State<AppState<E>>) -> Html<Bytes> {
    Html(state.page.clone())
}

async fn list_keys<E: KvsEngine>(
    State(state): State<AppState<E>>,
    query: QueryPairs,
) -> Result<Json<Vec<Record>>> {
    let limit = parse_limit(first_param(query, "limit").as_deref());
    let records = state.run(move |svc| svc.list(limit)).await?;
    Ok(Json(records))
}

async fn create_key<E: KvsEngine>(
    State(state): State<AppState<E>>,
    body: Bytes,
) -> Result<Json<Record>> {
    let req: CreateRequest = parse_body(&body)?;
    let record = state
        .run(move |svc| svc.create(&req.key, &req.value))
        .await?;
    Ok(Json(record))
}

async fn get_key<E: KvsEngine>(
    State(state): State<AppState<E>>,
    path: std::result::Result<KeyPath<String>, PathRejection>,
) -> Result<Json<Record>> {
    let key = key_param(path)?;
    let record = state.run(move |svc| svc.get(&key)).await?;
    Ok(Json(record))
}

async fn update_key<E: KvsEngine>(
    State(state): State<AppState<E>>,
    path: std::result::Result<KeyPath<String>, PathRejection>,
    body: Bytes,
) -> Result<Json<Record>> {
    let key = key_param(path)?;
    let req: UpdateRequest = parse_body(&body)?;
    let record = state
        .run(move |svc| svc.update(&key, &req.value))
        .await?;
    Ok(Json(record))
}

async fn delete_key<E: KvsEngine>(
    State(state): State<AppState<E>>,
    path: std::result::Result<KeyPath<String>, PathRejection>,
) -> Result<StatusCode> {
    let key = key_param(path)?;
    state.run(move |svc| svc.delete(&key)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stats<E: KvsEngine>(
    State(state): State<AppState<E>>,
) -> Result<Json<Stats>> {
    let stats = state.run(|svc| svc.stats()).await?;
    Ok(Json(stats))
}

async fn search_keys<E: KvsEngine>(
    State(state): State<AppState<E>>,
    query: QueryPairs,
) -> Result<Json<Vec<Record>>> {
    let query = first_param(query, "q").unwrap_or_default();
    let records = state.run(move |svc| svc.search(&query)).await?;
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SledKvsEngine;
    use tempfile::TempDir;

    fn state(dir: &TempDir) -> AppState<SledKvsEngine> {
        let engine = SledKvsEngine::open(dir.path()).unwrap();
        AppState {
            service: KeyService::new(engine),
            page: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn panicking_job_is_an_internal_error() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        let result = state
            .run(|_: &KeyService<SledKvsEngine>| -> Result<()> { panic!("job failed") })
            .await;
        assert!(matches!(result, Err(KvsError::StringErr(_))));

        // the process and the engine are still serving
        let record = state.run(|svc| svc.create("k", "v")).await.unwrap();
        assert_eq!(record.value, "v");
    }

    #[test]
    fn first_value_of_a_repeated_parameter_wins() {
        let pairs = vec![
            ("limit".to_owned(), "1".to_owned()),
            ("limit".to_owned(), "2".to_owned()),
        ];
        assert_eq!(first_param(Ok(Query(pairs)), "limit").as_deref(), Some("1"));
        assert_eq!(first_param(Ok(Query(Vec::new())), "limit"), None);
    }
}
