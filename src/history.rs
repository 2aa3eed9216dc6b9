//! Listening-progress tracking
//!
//! At most one progress row exists per (user, story, chapter); repeated
//! reports overwrite in place via an atomic upsert on the composite unique
//! index. No history of past positions is kept.

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::db::now_timestamp;
use crate::error::ApiError;
use crate::queries::{history, stories};

/// JSON body of a progress report. Everything is optional at the serde layer
/// so that missing required fields surface as a 400, not a decode failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordProgressRequest {
    pub user_id: Option<String>,
    pub story_id: Option<i64>,
    pub chapter_id: Option<i64>,
    pub last_position: Option<f64>,
    pub duration: Option<f64>,
    pub progress_percent: Option<f64>,
    pub is_completed: Option<bool>,
}

/// Stored progress record as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: i64,
    pub user_id: String,
    pub story_id: i64,
    pub chapter_id: i64,
    pub last_position: i64,
    pub duration: Option<i64>,
    pub progress_percent: Option<i64>,
    pub is_completed: bool,
    pub updated_at: String,
}

/// Narrow story projection joined onto a history entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStory {
    pub title: String,
    pub slug: String,
    pub cover_image: Option<String>,
    pub description: Option<String>,
}

/// Narrow chapter projection joined onto a history entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryChapter {
    pub title: String,
    pub order: i64,
    pub duration: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: ProgressRecord,
    pub story: HistoryStory,
    pub chapter: HistoryChapter,
}

/// Validate and durably record one playback-progress report.
///
/// Numeric normalization matches the stored types: lastPosition and duration
/// are floored, progressPercent is rounded. The referenced story must exist.
pub async fn record_progress(
    pool: &SqlitePool,
    request: &RecordProgressRequest,
) -> Result<ProgressRecord, ApiError> {
    let user_id = request
        .user_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(required_ids_error)?;
    let story_id = request.story_id.ok_or_else(required_ids_error)?;
    let chapter_id = request.chapter_id.ok_or_else(required_ids_error)?;

    if let Some(percent) = request.progress_percent {
        if !(0.0..=100.0).contains(&percent) {
            return Err(ApiError::Validation(
                "progressPercent must be between 0 and 100".to_string(),
            ));
        }
    }
    if let Some(position) = request.last_position {
        if position < 0.0 {
            return Err(ApiError::Validation(
                "lastPosition must not be negative".to_string(),
            ));
        }
    }

    let sql = stories::exists(story_id);
    let story_exists: Option<i32> = sqlx::query_scalar(&sql).fetch_optional(pool).await?;
    if story_exists.is_none() {
        return Err(ApiError::NotFound("Story not found".to_string()));
    }

    let report = history::ProgressUpsert {
        user_id,
        story_id,
        chapter_id,
        last_position: request.last_position.unwrap_or(0.0).floor() as i64,
        duration: request.duration.map(|d| d.floor() as i64),
        progress_percent: request.progress_percent.map(|p| p.round() as i64),
        is_completed: request.is_completed.unwrap_or(false),
    };

    let now = now_timestamp();
    let sql = history::upsert(&report, &now);
    sqlx::query(&sql).execute(pool).await?;

    let sql = history::select_by_key(user_id, story_id, chapter_id);
    let row = sqlx::query(&sql).fetch_one(pool).await?;

    Ok(ProgressRecord {
        id: row.get(0),
        user_id: row.get(1),
        story_id: row.get(2),
        chapter_id: row.get(3),
        last_position: row.get(4),
        duration: row.get(5),
        progress_percent: row.get(6),
        is_completed: row.get::<i32, _>(7) != 0,
        updated_at: row.get(8),
    })
}

/// List a user's progress records, most recently updated first, capped at
/// `limit`, each joined with its story and chapter projections
pub async fn list_history(
    pool: &SqlitePool,
    user_id: &str,
    limit: u32,
) -> Result<Vec<HistoryEntry>, ApiError> {
    let sql = history::select_for_user(user_id, limit);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|row| HistoryEntry {
            record: ProgressRecord {
                id: row.get(0),
                user_id: row.get(1),
                story_id: row.get(2),
                chapter_id: row.get(3),
                last_position: row.get(4),
                duration: row.get(5),
                progress_percent: row.get(6),
                is_completed: row.get::<i32, _>(7) != 0,
                updated_at: row.get(8),
            },
            story: HistoryStory {
                title: row.get("story_title"),
                slug: row.get("story_slug"),
                cover_image: row.get("story_cover_image"),
                description: row.get("story_description"),
            },
            chapter: HistoryChapter {
                title: row.get("chapter_title"),
                order: row.get("chapter_order"),
                duration: row.get("chapter_duration"),
            },
        })
        .collect())
}

/// Remove all chapter-progress rows for one (user, story) pair.
/// Returns the number of removed rows; zero maps to NotFound at the caller.
pub async fn delete_progress(
    pool: &SqlitePool,
    user_id: &str,
    story_id: i64,
) -> Result<u64, ApiError> {
    let sql = history::delete_for_story(user_id, story_id);
    let result = sqlx::query(&sql).execute(pool).await?;
    Ok(result.rows_affected())
}

fn required_ids_error() -> ApiError {
    ApiError::Validation("userId, storyId and chapterId are required".to_string())
}
