use sea_query::{Alias, Expr, OnConflict, Order, Query, SqliteQueryBuilder};

use crate::schema::{Chapters, History, Stories};

/// Normalized field values for one progress report
pub struct ProgressUpsert<'a> {
    pub user_id: &'a str,
    pub story_id: i64,
    pub chapter_id: i64,
    pub last_position: i64,
    pub duration: Option<i64>,
    pub progress_percent: Option<i64>,
    pub is_completed: bool,
}

/// INSERT INTO history (user_id, story_id, chapter_id, last_position, duration,
/// progress_percent, is_completed, created_at, updated_at) VALUES (...)
/// ON CONFLICT (user_id, story_id, chapter_id) DO UPDATE SET ...
///
/// last_position, is_completed and updated_at are always overwritten; duration
/// and progress_percent only when the report provided them, so an existing
/// stored value survives a partial report.
pub fn upsert(report: &ProgressUpsert<'_>, now: &str) -> String {
    let mut update_columns = vec![
        History::LastPosition,
        History::IsCompleted,
        History::UpdatedAt,
    ];
    if report.duration.is_some() {
        update_columns.push(History::Duration);
    }
    if report.progress_percent.is_some() {
        update_columns.push(History::ProgressPercent);
    }

    Query::insert()
        .into_table(History::Table)
        .columns([
            History::UserId,
            History::StoryId,
            History::ChapterId,
            History::LastPosition,
            History::Duration,
            History::ProgressPercent,
            History::IsCompleted,
            History::CreatedAt,
            History::UpdatedAt,
        ])
        .values_panic([
            report.user_id.into(),
            report.story_id.into(),
            report.chapter_id.into(),
            report.last_position.into(),
            report.duration.into(),
            report.progress_percent.into(),
            (report.is_completed as i32).into(),
            now.into(),
            now.into(),
        ])
        .on_conflict(
            OnConflict::columns([History::UserId, History::StoryId, History::ChapterId])
                .update_columns(update_columns)
                .to_owned(),
        )
        .to_string(SqliteQueryBuilder)
}

fn history_columns() -> [History; 9] {
    [
        History::Id,
        History::UserId,
        History::StoryId,
        History::ChapterId,
        History::LastPosition,
        History::Duration,
        History::ProgressPercent,
        History::IsCompleted,
        History::UpdatedAt,
    ]
}

/// SELECT ... FROM history WHERE user_id = ? AND story_id = ? AND chapter_id = ?
pub fn select_by_key(user_id: &str, story_id: i64, chapter_id: i64) -> String {
    Query::select()
        .columns(history_columns())
        .from(History::Table)
        .and_where(Expr::col(History::UserId).eq(user_id))
        .and_where(Expr::col(History::StoryId).eq(story_id))
        .and_where(Expr::col(History::ChapterId).eq(chapter_id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT h.*, story projection, chapter projection
/// FROM history h JOIN stories s ON ... JOIN chapters c ON ...
/// WHERE h.user_id = ? ORDER BY h.updated_at DESC, h.id DESC LIMIT ?
///
/// The joined projections are the narrow story/chapter views the history
/// screen needs, not the full rows.
pub fn select_for_user(user_id: &str, limit: u32) -> String {
    Query::select()
        .columns([
            (History::Table, History::Id),
            (History::Table, History::UserId),
            (History::Table, History::StoryId),
            (History::Table, History::ChapterId),
            (History::Table, History::LastPosition),
            (History::Table, History::Duration),
            (History::Table, History::ProgressPercent),
            (History::Table, History::IsCompleted),
            (History::Table, History::UpdatedAt),
        ])
        .expr_as(Expr::col((Stories::Table, Stories::Title)), Alias::new("story_title"))
        .expr_as(Expr::col((Stories::Table, Stories::Slug)), Alias::new("story_slug"))
        .expr_as(
            Expr::col((Stories::Table, Stories::CoverImage)),
            Alias::new("story_cover_image"),
        )
        .expr_as(
            Expr::col((Stories::Table, Stories::Description)),
            Alias::new("story_description"),
        )
        .expr_as(
            Expr::col((Chapters::Table, Chapters::Title)),
            Alias::new("chapter_title"),
        )
        .expr_as(
            Expr::col((Chapters::Table, Chapters::Order)),
            Alias::new("chapter_order"),
        )
        .expr_as(
            Expr::col((Chapters::Table, Chapters::Duration)),
            Alias::new("chapter_duration"),
        )
        .from(History::Table)
        .inner_join(
            Stories::Table,
            Expr::col((History::Table, History::StoryId)).equals((Stories::Table, Stories::Id)),
        )
        .inner_join(
            Chapters::Table,
            Expr::col((History::Table, History::ChapterId)).equals((Chapters::Table, Chapters::Id)),
        )
        .and_where(Expr::col((History::Table, History::UserId)).eq(user_id))
        .order_by((History::Table, History::UpdatedAt), Order::Desc)
        .order_by((History::Table, History::Id), Order::Desc)
        .limit(limit as u64)
        .to_string(SqliteQueryBuilder)
}

/// DELETE FROM history WHERE user_id = ? AND story_id = ?
///
/// Removes progress for every chapter of the story; the deletion key is
/// deliberately coarser than the upsert key (clearing a story from the
/// history screen clears all of its chapters).
pub fn delete_for_story(user_id: &str, story_id: i64) -> String {
    Query::delete()
        .from_table(History::Table)
        .and_where(Expr::col(History::UserId).eq(user_id))
        .and_where(Expr::col(History::StoryId).eq(story_id))
        .to_string(SqliteQueryBuilder)
}
