use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use log::info;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::archive::ArchiveClient;
use crate::backfill;
use crate::config::AppConfig;
use crate::constants::{
    HISTORY_DEFAULT_LIMIT, HISTORY_MAX_LIMIT, SEARCH_DEFAULT_LIMIT, SEARCH_MAX_LIMIT,
};
use crate::db::{self, now_timestamp};
use crate::error::ApiError;
use crate::history::{self, RecordProgressRequest};
use crate::proxy;
use crate::queries::{chapters, stories};

/// State shared by all request handlers
pub struct AppState {
    pub pool: SqlitePool,
    pub archive: ArchiveClient,
    pub http: reqwest::Client,
    pub admin_token: String,
}

/// Build the full API router over the given state
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/api/stories", get(list_stories_handler))
        .route("/api/stories", post(create_story_handler))
        .route("/api/stories/search", get(search_stories_handler))
        .route("/api/stories/id/{id}", get(get_story_handler))
        .route("/api/history", post(record_history_handler))
        .route("/api/history", delete(delete_history_handler))
        .route("/api/history/user/{user_id}", get(list_history_handler))
        .route("/audio/proxy", get(proxy::audio_proxy_handler))
        .layer(cors)
        .with_state(state)
}

/// Start the API server (blocking entry point for the CLI)
pub fn serve_api(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let pool = db::open_database(&config.database_path).await?;
        db::init_database_schema(&pool).await?;

        let state = Arc::new(AppState {
            pool,
            archive: ArchiveClient::new(&config.archive),
            http: reqwest::Client::new(),
            admin_token: config.admin_token.clone(),
        });

        let app = build_router(state);

        println!("Database: {}", config.database_path.display());
        println!("Listening on: http://[::]:{} (IPv4 + IPv6)", config.port);
        println!("Endpoints:");
        println!("  GET    /api/stories  - List stories");
        println!("  POST   /api/stories  - Create a story with chapters (bearer token)");
        println!("  GET    /api/stories/search?q=<term>  - Search stories");
        println!("  GET    /api/stories/id/:id  - Story detail with chapters");
        println!("  POST   /api/history  - Record listening progress");
        println!("  GET    /api/history/user/:userId  - Listening history");
        println!("  DELETE /api/history  - Clear progress for a story");
        println!("  GET    /audio/proxy?url=<https url>  - Audio passthrough");

        let listener = tokio::net::TcpListener::bind(format!("[::]:{}", config.port))
            .await
            .map_err(|e| format!("Failed to bind to port {}: {}", config.port, e))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| format!("Server error: {}", e))?;

        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

async fn root_handler() -> impl IntoResponse {
    "Story Audio API Running..."
}

// Stored story row, shared by the list/detail/search handlers
struct StoryRow {
    id: i64,
    title: String,
    slug: String,
    description: Option<String>,
    cover_image: Option<String>,
    author: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
}

fn map_story_row(row: &sqlx::sqlite::SqliteRow) -> StoryRow {
    let tags_json: String = row.get(7);
    StoryRow {
        id: row.get(0),
        title: row.get(1),
        slug: row.get(2),
        description: row.get(3),
        cover_image: row.get(4),
        author: row.get(5),
        category: row.get(6),
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StorySummary {
    id: i64,
    slug: String,
    title: String,
    author: String,
    category: String,
    image_url: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
}

impl From<StoryRow> for StorySummary {
    fn from(row: StoryRow) -> Self {
        StorySummary {
            id: row.id,
            slug: row.slug,
            title: row.title,
            author: row.author.unwrap_or_else(|| "Unknown".to_string()),
            category: row.category.unwrap_or_else(|| "Audio".to_string()),
            image_url: row.cover_image,
            description: row.description,
            tags: row.tags,
        }
    }
}

async fn list_stories_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StorySummary>>, ApiError> {
    let sql = stories::select_all();
    let rows = sqlx::query(&sql).fetch_all(&state.pool).await?;
    let formatted = rows
        .iter()
        .map(|row| StorySummary::from(map_story_row(row)))
        .collect();
    Ok(Json(formatted))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoryDetail {
    id: i64,
    slug: String,
    title: String,
    author: String,
    category: String,
    image_url: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
    chapters: Vec<backfill::ResolvedChapter>,
}

/// Story detail with the duration-backfilled chapter list
async fn get_story_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<StoryDetail>, ApiError> {
    let sql = stories::select_by_id(id);
    let row = sqlx::query(&sql)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;
    let story = map_story_row(&row);

    let chapter_rows = backfill::load_chapters(&state.pool, story.id).await?;
    let resolved =
        backfill::resolve_durations(&state.pool, &state.archive, &story.slug, &chapter_rows).await;

    Ok(Json(StoryDetail {
        id: story.id,
        slug: story.slug,
        title: story.title,
        author: story.author.unwrap_or_else(|| "Unknown".to_string()),
        category: story.category.unwrap_or_else(|| "Audio".to_string()),
        image_url: story.cover_image,
        description: story.description,
        tags: story.tags,
        chapters: resolved,
    }))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Serialize)]
struct SearchResponse {
    total: i64,
    page: u32,
    limit: u32,
    results: Vec<StorySummary>,
}

async fn search_stories_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let term = query.q.unwrap_or_default();
    let term = term.trim();
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(SEARCH_DEFAULT_LIMIT)
        .clamp(1, SEARCH_MAX_LIMIT);
    // Widen before multiplying: page and limit are client-controlled and
    // u32::MAX * 100 does not fit in u32
    let offset = (page as u64 - 1) * limit as u64;

    let sql = stories::count_search(term);
    let total: i64 = sqlx::query_scalar(&sql).fetch_one(&state.pool).await?;

    let sql = stories::select_search(term, limit, offset);
    let rows = sqlx::query(&sql).fetch_all(&state.pool).await?;
    let results = rows
        .iter()
        .map(|row| StorySummary::from(map_story_row(row)))
        .collect();

    Ok(Json(SearchResponse {
        total,
        page,
        limit,
        results,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateChapterRequest {
    title: String,
    order: i64,
    #[serde(default)]
    content: Option<String>,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateStoryRequest {
    title: String,
    slug: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    cover_image: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    chapters: Vec<CreateChapterRequest>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateStoryResponse {
    id: i64,
    slug: String,
    chapter_count: usize,
}

fn check_bearer_token(headers: &HeaderMap, admin_token: &str) -> Result<(), ApiError> {
    let provided = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing token".to_string()))?;
    if provided != admin_token {
        return Err(ApiError::Unauthorized("Invalid token".to_string()));
    }
    Ok(())
}

fn validate_create_story(request: &CreateStoryRequest) -> Result<(), ApiError> {
    if request.title.trim().is_empty() || request.slug.trim().is_empty() {
        return Err(ApiError::Validation(
            "title and slug are required".to_string(),
        ));
    }
    let mut orders: Vec<i64> = request.chapters.iter().map(|c| c.order).collect();
    orders.sort_unstable();
    orders.dedup();
    if orders.len() != request.chapters.len() {
        return Err(ApiError::Validation(
            "chapter orders must be unique within a story".to_string(),
        ));
    }
    if request
        .chapters
        .iter()
        .any(|c| c.order < 1 || c.name.trim().is_empty())
    {
        return Err(ApiError::Validation(
            "chapters require a positive order and a file name".to_string(),
        ));
    }
    Ok(())
}

/// Create a story together with its chapters in one transaction.
/// Chapters start with duration unset; the backfill fills them in lazily.
async fn create_story_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateStoryRequest>,
) -> Result<(StatusCode, Json<CreateStoryResponse>), ApiError> {
    check_bearer_token(&headers, &state.admin_token)?;
    validate_create_story(&request)?;

    let sql = stories::select_id_by_slug(&request.slug);
    let existing: Option<i64> = sqlx::query_scalar(&sql).fetch_optional(&state.pool).await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(format!(
            "Story with slug '{}' already exists",
            request.slug
        )));
    }

    let tags_json = serde_json::to_string(&request.tags)
        .map_err(|e| ApiError::Internal(format!("Failed to encode tags: {}", e)))?;
    let now = now_timestamp();

    let mut tx = state.pool.begin().await?;

    let sql = stories::insert(
        &request.title,
        &request.slug,
        request.description.as_deref(),
        request.cover_image.as_deref(),
        request.author.as_deref(),
        request.category.as_deref(),
        &tags_json,
        &now,
    );
    let result = sqlx::query(&sql).execute(&mut *tx).await?;
    let story_id = result.last_insert_rowid();

    if !request.chapters.is_empty() {
        let new_chapters: Vec<chapters::NewChapter<'_>> = request
            .chapters
            .iter()
            .map(|c| chapters::NewChapter {
                title: &c.title,
                order: c.order,
                content: c.content.as_deref(),
                name: &c.name,
            })
            .collect();
        let sql = chapters::insert_bulk(story_id, &new_chapters, &now);
        sqlx::query(&sql).execute(&mut *tx).await?;
    }

    tx.commit().await?;

    info!(
        "Created story '{}' with {} chapters",
        request.slug,
        request.chapters.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateStoryResponse {
            id: story_id,
            slug: request.slug,
            chapter_count: request.chapters.len(),
        }),
    ))
}

async fn record_history_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecordProgressRequest>,
) -> Result<Json<history::ProgressRecord>, ApiError> {
    let record = history::record_progress(&state.pool, &request).await?;
    Ok(Json(record))
}

#[derive(Deserialize)]
struct HistoryListQuery {
    #[serde(default)]
    limit: Option<u32>,
}

async fn list_history_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryListQuery>,
) -> Result<Json<Vec<history::HistoryEntry>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(HISTORY_DEFAULT_LIMIT)
        .clamp(1, HISTORY_MAX_LIMIT);
    let entries = history::list_history(&state.pool, &user_id, limit).await?;
    Ok(Json(entries))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteHistoryRequest {
    user_id: Option<String>,
    story_id: Option<i64>,
}

#[derive(Serialize)]
struct DeleteHistoryResponse {
    message: String,
    removed: u64,
}

/// Clears every chapter-progress row for the given story. The deletion key is
/// coarser than the upsert key on purpose: "remove from history" in a client
/// means the whole story, not one chapter.
async fn delete_history_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeleteHistoryRequest>,
) -> Result<Json<DeleteHistoryResponse>, ApiError> {
    let user_id = request
        .user_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("userId and storyId required".to_string()))?;
    let story_id = request
        .story_id
        .ok_or_else(|| ApiError::Validation("userId and storyId required".to_string()))?;

    let removed = history::delete_progress(&state.pool, user_id, story_id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("History not found".to_string()));
    }

    Ok(Json(DeleteHistoryResponse {
        message: "Removed".to_string(),
        removed,
    }))
}
