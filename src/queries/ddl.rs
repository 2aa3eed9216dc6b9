use sea_query::{
    ColumnDef, ForeignKey, ForeignKeyAction, Index, SqliteQueryBuilder, Table,
};

use crate::schema::{Chapters, History, Stories};

/// CREATE TABLE IF NOT EXISTS stories (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     title TEXT NOT NULL,
///     slug TEXT NOT NULL UNIQUE,
///     description TEXT,
///     cover_image TEXT,
///     author TEXT,
///     category TEXT,
///     tags TEXT NOT NULL DEFAULT '[]',
///     views INTEGER NOT NULL DEFAULT 0,
///     likes INTEGER NOT NULL DEFAULT 0,
///     status TEXT NOT NULL DEFAULT 'published',
///     created_at TEXT NOT NULL,
///     updated_at TEXT NOT NULL
/// )
pub fn create_stories_table() -> String {
    Table::create()
        .table(Stories::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Stories::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(Stories::Title).string().not_null())
        .col(
            ColumnDef::new(Stories::Slug)
                .string()
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(Stories::Description).string())
        .col(ColumnDef::new(Stories::CoverImage).string())
        .col(ColumnDef::new(Stories::Author).string())
        .col(ColumnDef::new(Stories::Category).string())
        .col(
            ColumnDef::new(Stories::Tags)
                .string()
                .not_null()
                .default("[]"),
        )
        .col(ColumnDef::new(Stories::Views).big_integer().not_null().default(0))
        .col(ColumnDef::new(Stories::Likes).big_integer().not_null().default(0))
        .col(
            ColumnDef::new(Stories::Status)
                .string()
                .not_null()
                .default("published"),
        )
        .col(ColumnDef::new(Stories::CreatedAt).string().not_null())
        .col(ColumnDef::new(Stories::UpdatedAt).string().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS chapters (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     story_id INTEGER NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     "order" INTEGER NOT NULL,
///     content TEXT,
///     name TEXT NOT NULL,
///     duration TEXT,
///     created_at TEXT NOT NULL,
///     updated_at TEXT NOT NULL
/// )
pub fn create_chapters_table() -> String {
    Table::create()
        .table(Chapters::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Chapters::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(Chapters::StoryId).big_integer().not_null())
        .col(ColumnDef::new(Chapters::Title).string().not_null())
        .col(ColumnDef::new(Chapters::Order).big_integer().not_null())
        .col(ColumnDef::new(Chapters::Content).string())
        .col(ColumnDef::new(Chapters::Name).string().not_null())
        .col(ColumnDef::new(Chapters::Duration).string())
        .col(ColumnDef::new(Chapters::CreatedAt).string().not_null())
        .col(ColumnDef::new(Chapters::UpdatedAt).string().not_null())
        .foreign_key(
            ForeignKey::create()
                .from(Chapters::Table, Chapters::StoryId)
                .to(Stories::Table, Stories::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS history (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     user_id TEXT NOT NULL,
///     story_id INTEGER NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
///     chapter_id INTEGER NOT NULL REFERENCES chapters(id) ON DELETE CASCADE,
///     last_position INTEGER NOT NULL DEFAULT 0,
///     duration INTEGER,
///     progress_percent INTEGER,
///     is_completed INTEGER NOT NULL DEFAULT 0,
///     created_at TEXT NOT NULL,
///     updated_at TEXT NOT NULL
/// )
pub fn create_history_table() -> String {
    Table::create()
        .table(History::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(History::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(History::UserId).string().not_null())
        .col(ColumnDef::new(History::StoryId).big_integer().not_null())
        .col(ColumnDef::new(History::ChapterId).big_integer().not_null())
        .col(
            ColumnDef::new(History::LastPosition)
                .big_integer()
                .not_null()
                .default(0),
        )
        .col(ColumnDef::new(History::Duration).big_integer())
        .col(ColumnDef::new(History::ProgressPercent).big_integer())
        .col(
            ColumnDef::new(History::IsCompleted)
                .integer()
                .not_null()
                .default(0),
        )
        .col(ColumnDef::new(History::CreatedAt).string().not_null())
        .col(ColumnDef::new(History::UpdatedAt).string().not_null())
        .foreign_key(
            ForeignKey::create()
                .from(History::Table, History::StoryId)
                .to(Stories::Table, Stories::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .from(History::Table, History::ChapterId)
                .to(Chapters::Table, Chapters::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE UNIQUE INDEX IF NOT EXISTS idx_chapters_story_order ON chapters(story_id, "order")
pub fn create_chapters_story_order_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_chapters_story_order")
        .table(Chapters::Table)
        .col(Chapters::StoryId)
        .col(Chapters::Order)
        .unique()
        .to_string(SqliteQueryBuilder)
}

/// CREATE UNIQUE INDEX IF NOT EXISTS idx_history_user_story_chapter
/// ON history(user_id, story_id, chapter_id)
///
/// This is the uniqueness constraint the progress upsert relies on.
pub fn create_history_unique_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_history_user_story_chapter")
        .table(History::Table)
        .col(History::UserId)
        .col(History::StoryId)
        .col(History::ChapterId)
        .unique()
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_history_user_updated ON history(user_id, updated_at)
pub fn create_history_user_updated_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_history_user_updated")
        .table(History::Table)
        .col(History::UserId)
        .col(History::UpdatedAt)
        .to_string(SqliteQueryBuilder)
}
