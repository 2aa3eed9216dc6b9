//! Lazy duration backfill
//!
//! Chapter durations live on the external archive, not in the seed data. The
//! first read of a story with unknown durations triggers exactly one metadata
//! fetch; discovered values are persisted in a single batched write so later
//! reads skip the network entirely. The persist step is detached from the
//! request: its failure is logged, never returned.

use log::{info, warn};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::archive::{ArchiveClient, DurationMap};
use crate::constants::DURATION_PLACEHOLDER;
use crate::queries::chapters;

/// Chapter row as stored, before duration resolution
#[derive(Debug, Clone)]
pub struct ChapterRow {
    pub id: i64,
    pub title: String,
    pub order: i64,
    pub content: Option<String>,
    pub name: String,
    pub duration: Option<String>,
}

/// Chapter as served: duration always present (placeholder when unresolved)
/// and a playable audio URL
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedChapter {
    pub id: i64,
    pub number: String,
    pub title: String,
    pub order: i64,
    pub duration: String,
    pub audio_url: String,
}

/// Load a story's chapters ordered by their 1-based position
pub async fn load_chapters(pool: &SqlitePool, story_id: i64) -> Result<Vec<ChapterRow>, sqlx::Error> {
    let sql = chapters::select_by_story(story_id);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|row| ChapterRow {
            id: row.get(0),
            title: row.get(1),
            order: row.get(2),
            content: row.get(3),
            name: row.get(4),
            duration: row.get(5),
        })
        .collect())
}

/// Resolve every chapter's effective duration: stored value, else the value
/// discovered from one archive fetch, else the placeholder.
///
/// When the fetch discovered durations for chapters that lack one, they are
/// persisted as a detached best-effort task; the response never waits on it.
pub async fn resolve_durations(
    pool: &SqlitePool,
    archive: &ArchiveClient,
    slug: &str,
    chapter_rows: &[ChapterRow],
) -> Vec<ResolvedChapter> {
    let needs_fetch = chapter_rows.iter().any(|c| c.duration.is_none());

    let duration_map = if needs_fetch {
        archive.fetch_duration_map(slug).await
    } else {
        // Cache hit: every duration is known, no external call
        DurationMap::new()
    };

    let discovered: Vec<(i64, String)> = chapter_rows
        .iter()
        .filter(|c| c.duration.is_none())
        .filter_map(|c| duration_map.get(&c.name).map(|d| (c.id, d.clone())))
        .collect();

    if !discovered.is_empty() {
        spawn_persist_durations(pool.clone(), discovered);
    }

    chapter_rows
        .iter()
        .map(|c| {
            let duration = c
                .duration
                .clone()
                .or_else(|| duration_map.get(&c.name).cloned())
                .unwrap_or_else(|| DURATION_PLACEHOLDER.to_string());
            ResolvedChapter {
                id: c.id,
                number: format!("{:02}", c.order),
                title: c.title.clone(),
                order: c.order,
                duration,
                audio_url: archive.audio_url(slug, &c.name),
            }
        })
        .collect()
}

/// Fire-and-forget batched persist of newly discovered durations.
///
/// A lost race between two concurrent requests is benign: both write the same
/// values, and the `duration IS NULL` guard in the update keeps a known
/// duration from ever being overwritten.
fn spawn_persist_durations(pool: SqlitePool, discovered: Vec<(i64, String)>) {
    tokio::spawn(async move {
        let now = crate::db::now_timestamp();
        let Some(sql) = chapters::update_durations_bulk(&discovered, &now) else {
            return;
        };
        match sqlx::query(&sql).execute(&pool).await {
            Ok(result) => {
                info!("Saved duration for {} chapters", result.rows_affected());
            }
            Err(e) => {
                warn!("Failed to persist backfilled durations: {}", e);
            }
        }
    });
}
