//! Seed-data loading
//!
//! Loads a TOML file of stories and their chapters and inserts them in bulk.
//! Chapters are created with duration unset; the backfill discovers durations
//! on first read.

use log::{info, warn};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::path::Path;

use crate::config::AppConfig;
use crate::db::{self, now_timestamp};
use crate::queries::{chapters, stories};

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub stories: Vec<SeedStory>,
}

#[derive(Debug, Deserialize)]
pub struct SeedStory {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub chapters: Vec<SeedChapter>,
}

#[derive(Debug, Deserialize)]
pub struct SeedChapter {
    pub title: String,
    pub order: i64,
    pub content: Option<String>,
    pub name: String,
}

/// CLI entry point: parse the seed file and load it into the database
pub fn run_seed(config: &AppConfig, data_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(data_path)
        .map_err(|e| format!("Failed to read seed file '{}': {}", data_path.display(), e))?;
    let seed: SeedFile = toml::from_str(&content)
        .map_err(|e| format!("Failed to parse seed file '{}': {}", data_path.display(), e))?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let pool = db::open_database(&config.database_path).await?;
        db::init_database_schema(&pool).await?;
        let inserted = insert_seed(&pool, &seed).await?;
        println!("Seeded {} stories", inserted);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Insert every story from the seed file, skipping slugs that already exist
/// so reseeding never duplicates or clobbers data
pub async fn insert_seed(pool: &SqlitePool, seed: &SeedFile) -> Result<usize, sqlx::Error> {
    let mut inserted = 0;

    for story in &seed.stories {
        let sql = stories::select_id_by_slug(&story.slug);
        let existing: Option<i64> = sqlx::query_scalar(&sql).fetch_optional(pool).await?;
        if existing.is_some() {
            warn!("Skipping seed story '{}': slug already exists", story.slug);
            continue;
        }

        let tags_json = serde_json::to_string(&story.tags).unwrap_or_else(|_| "[]".to_string());
        let now = now_timestamp();

        let mut tx = pool.begin().await?;

        let sql = stories::insert(
            &story.title,
            &story.slug,
            story.description.as_deref(),
            story.cover_image.as_deref(),
            story.author.as_deref(),
            story.category.as_deref(),
            &tags_json,
            &now,
        );
        let result = sqlx::query(&sql).execute(&mut *tx).await?;
        let story_id = result.last_insert_rowid();

        if !story.chapters.is_empty() {
            let new_chapters: Vec<chapters::NewChapter<'_>> = story
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
            "Seeded story '{}' with {} chapters",
            story.slug,
            story.chapters.len()
        );
        inserted += 1;
    }

    Ok(inserted)
}
