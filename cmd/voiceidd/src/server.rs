//! HTTP surface of the voice identity registry.
//!
//! API endpoints (mounted under /api/voice):
//! - GET  /profiles | /profiles/session?sessionId=   - summaries
//! - GET  /registry | /registry/session?sessionId=   - full profiles + settings
//! - GET  /settings | /embeddings | /stats
//! - POST /sync {profiles[], settings?}              - upsert + count
//! - POST /identify {testEmbedding, threshold?} | /identify/session
//! - POST /search {embedding, topK?} | /search/session
//! - DELETE /clear                                   - wipe store
//!
//! Every response is `{success, data}` or `{success: false, error, details}`.
//! Missing required param -> 400, unknown sub-route -> 404, internal
//! failure -> 500.

use std::collections::HashMap;
use std::net::SocketAddr;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use voiceid_profile::{VoiceProfile, VoiceSettings};
use voiceid_registry::{Registry, RegistryError, RegistryStore};

/// Start the registry HTTP server.
pub async fn serve(addr: &str, registry: Registry) -> Result<()> {
    let app = router(registry);

    let addr = parse_addr(addr)?;
    println!("voiceidd listening on http://{}", addr);
    println!("  - GET    /api/voice/profiles[/session]  Profile summaries");
    println!("  - GET    /api/voice/registry[/session]  Full registry");
    println!("  - GET    /api/voice/settings            Identification settings");
    println!("  - GET    /api/voice/embeddings          Stored centroids");
    println!("  - GET    /api/voice/stats               Counters");
    println!("  - POST   /api/voice/sync                Upsert profiles");
    println!("  - POST   /api/voice/identify[/session]  Nearest-match identify");
    println!("  - POST   /api/voice/search[/session]    Top-K search");
    println!("  - DELETE /api/voice/clear               Wipe registry");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router. Split out so tests can drive it directly.
pub fn router(registry: Registry) -> Router {
    let api = Router::new()
        .route("/profiles", get(get_profiles))
        .route("/profiles/session", get(get_profiles_session))
        .route("/registry", get(get_registry))
        .route("/registry/session", get(get_registry_session))
        .route("/settings", get(get_settings))
        .route("/embeddings", get(get_embeddings))
        .route("/stats", get(get_stats))
        .route("/sync", post(post_sync))
        .route("/identify", post(post_identify))
        .route("/identify/session", post(post_identify_session))
        .route("/search", post(post_search))
        .route("/search/session", post(post_search_session))
        .route("/clear", delete(delete_clear))
        .with_state(registry);

    Router::new()
        .nest("/api/voice", api)
        .fallback(not_found)
        .layer(CorsLayer::permissive())
}

fn parse_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    Ok(addr.parse()?)
}

// --- response envelope ---

fn ok<T: serde::Serialize>(data: T) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn fail(status: StatusCode, error: &str, details: Option<String>) -> Response {
    let mut body = json!({ "success": false, "error": error });
    if let Some(details) = details {
        body["details"] = json!(details);
    }
    (status, Json(body)).into_response()
}

fn internal(err: RegistryError) -> Response {
    fail(
        StatusCode::INTERNAL_SERVER_ERROR,
        "registry operation failed",
        Some(err.to_string()),
    )
}

fn missing_param(name: &str) -> Response {
    fail(
        StatusCode::BAD_REQUEST,
        "missing required parameter",
        Some(name.to_string()),
    )
}

async fn not_found() -> Response {
    fail(StatusCode::NOT_FOUND, "not found", None)
}

fn session_param(params: &HashMap<String, String>) -> Option<&str> {
    params.get("sessionId").map(String::as_str).filter(|s| !s.is_empty())
}

// --- request bodies ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncBody {
    profiles: Option<Vec<VoiceProfile>>,
    settings: Option<VoiceSettings>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentifyBody {
    test_embedding: Option<Vec<f32>>,
    threshold: Option<f32>,
    browser_session_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody {
    embedding: Option<Vec<f32>>,
    top_k: Option<usize>,
    browser_session_id: Option<String>,
}

// --- handlers ---

async fn get_profiles(State(registry): State<Registry>) -> Response {
    match registry.summaries(None) {
        Ok(summaries) => ok(summaries),
        Err(e) => internal(e),
    }
}

async fn get_profiles_session(
    State(registry): State<Registry>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(session) = session_param(&params) else {
        return missing_param("sessionId");
    };
    match registry.summaries(Some(session)) {
        Ok(summaries) => ok(summaries),
        Err(e) => internal(e),
    }
}

async fn get_registry(State(registry): State<Registry>) -> Response {
    match registry.snapshot(None) {
        Ok(snapshot) => ok(snapshot),
        Err(e) => internal(e),
    }
}

async fn get_registry_session(
    State(registry): State<Registry>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(session) = session_param(&params) else {
        return missing_param("sessionId");
    };
    match registry.snapshot(Some(session)) {
        Ok(snapshot) => ok(snapshot),
        Err(e) => internal(e),
    }
}

async fn get_settings(State(registry): State<Registry>) -> Response {
    match registry.store().settings() {
        Ok(settings) => ok(settings),
        Err(e) => internal(e),
    }
}

async fn get_embeddings(State(registry): State<Registry>) -> Response {
    match registry.embeddings() {
        Ok(rows) => ok(rows),
        Err(e) => internal(e),
    }
}

async fn get_stats(State(registry): State<Registry>) -> Response {
    match registry.stats() {
        Ok(stats) => ok(stats),
        Err(e) => internal(e),
    }
}

async fn post_sync(State(registry): State<Registry>, Json(body): Json<SyncBody>) -> Response {
    let Some(profiles) = body.profiles else {
        return missing_param("profiles");
    };
    if let Some(settings) = &body.settings {
        if let Err(e) = registry.store().set_settings(settings) {
            return internal(e);
        }
    }
    match registry.upsert_batch(&profiles) {
        Ok(count) => ok(json!({ "count": count })),
        Err(e) => internal(e),
    }
}

async fn post_identify(
    State(registry): State<Registry>,
    Json(body): Json<IdentifyBody>,
) -> Response {
    let Some(probe) = body.test_embedding else {
        return missing_param("testEmbedding");
    };
    match registry.identify(&probe, body.threshold, None) {
        Ok(result) => ok(result),
        Err(e) => internal(e),
    }
}

async fn post_identify_session(
    State(registry): State<Registry>,
    Json(body): Json<IdentifyBody>,
) -> Response {
    let Some(probe) = body.test_embedding else {
        return missing_param("testEmbedding");
    };
    let Some(session) = body.browser_session_id.as_deref().filter(|s| !s.is_empty()) else {
        return missing_param("browserSessionId");
    };
    match registry.identify(&probe, body.threshold, Some(session)) {
        Ok(result) => ok(result),
        Err(e) => internal(e),
    }
}

async fn post_search(State(registry): State<Registry>, Json(body): Json<SearchBody>) -> Response {
    let Some(probe) = body.embedding else {
        return missing_param("embedding");
    };
    match registry.search(&probe, body.top_k, None) {
        Ok(hits) => ok(hits),
        Err(e) => internal(e),
    }
}

async fn post_search_session(
    State(registry): State<Registry>,
    Json(body): Json<SearchBody>,
) -> Response {
    let Some(probe) = body.embedding else {
        return missing_param("embedding");
    };
    let Some(session) = body.browser_session_id.as_deref().filter(|s| !s.is_empty()) else {
        return missing_param("browserSessionId");
    };
    match registry.search(&probe, body.top_k, Some(session)) {
        Ok(hits) => ok(hits),
        Err(e) => internal(e),
    }
}

async fn delete_clear(State(registry): State<Registry>) -> Response {
    match registry.store().clear() {
        Ok(()) => ok(json!({ "cleared": true })),
        Err(e) => internal(e),
    }
}
