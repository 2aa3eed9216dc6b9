use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use crate::schema::Chapters;

/// One chapter to insert at story-creation time; duration starts unset
pub struct NewChapter<'a> {
    pub title: &'a str,
    pub order: i64,
    pub content: Option<&'a str>,
    pub name: &'a str,
}

/// INSERT INTO chapters (story_id, title, "order", content, name, created_at, updated_at)
/// VALUES (?, ...), (?, ...), ...
///
/// One statement for the whole batch; chapters are always created in bulk
/// alongside their story.
pub fn insert_bulk(story_id: i64, chapters: &[NewChapter<'_>], now: &str) -> String {
    let mut insert = Query::insert();
    insert.into_table(Chapters::Table).columns([
        Chapters::StoryId,
        Chapters::Title,
        Chapters::Order,
        Chapters::Content,
        Chapters::Name,
        Chapters::CreatedAt,
        Chapters::UpdatedAt,
    ]);
    for chapter in chapters {
        insert.values_panic([
            story_id.into(),
            chapter.title.into(),
            chapter.order.into(),
            chapter.content.into(),
            chapter.name.into(),
            now.into(),
            now.into(),
        ]);
    }
    insert.to_string(SqliteQueryBuilder)
}

/// SELECT id, title, "order", content, name, duration FROM chapters
/// WHERE story_id = ? ORDER BY "order"
pub fn select_by_story(story_id: i64) -> String {
    Query::select()
        .columns([
            Chapters::Id,
            Chapters::Title,
            Chapters::Order,
            Chapters::Content,
            Chapters::Name,
            Chapters::Duration,
        ])
        .from(Chapters::Table)
        .and_where(Expr::col(Chapters::StoryId).eq(story_id))
        .order_by(Chapters::Order, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// UPDATE chapters
/// SET duration = CASE id WHEN ? THEN ? ... ELSE duration END, updated_at = ?
/// WHERE id IN (...) AND duration IS NULL
///
/// Single batched write for every duration discovered in one backfill pass.
/// The `duration IS NULL` guard keeps the backfill idempotent: a chapter with
/// a known duration is never overwritten, even by a racing request.
///
/// Returns `None` for an empty batch (nothing to write, no statement).
pub fn update_durations_bulk(discovered: &[(i64, String)], now: &str) -> Option<String> {
    let ((first_id, first_duration), rest) = discovered.split_first()?;
    let mut case = Expr::case(
        Expr::col(Chapters::Id).eq(*first_id),
        first_duration.as_str(),
    );
    for (id, duration) in rest {
        case = case.case(Expr::col(Chapters::Id).eq(*id), duration.as_str());
    }
    let ids: Vec<i64> = discovered.iter().map(|(id, _)| *id).collect();

    Some(
        Query::update()
            .table(Chapters::Table)
            .value(Chapters::Duration, case)
            .value(Chapters::UpdatedAt, now)
            .and_where(Expr::col(Chapters::Id).is_in(ids))
            .and_where(Expr::col(Chapters::Duration).is_null())
            .to_string(SqliteQueryBuilder),
    )
}

#[cfg(test)]
mod tests {
    use super::update_durations_bulk;

    #[test]
    fn empty_batch_builds_no_statement() {
        assert_eq!(update_durations_bulk(&[], "2026-01-01T00:00:00.000000Z"), None);
    }

    #[test]
    fn batch_builds_guarded_case_update() {
        let sql = update_durations_bulk(
            &[(1, "180".to_string()), (2, "03:01".to_string())],
            "2026-01-01T00:00:00.000000Z",
        )
        .unwrap();
        assert!(sql.contains("CASE"));
        assert!(sql.contains("IS NULL"));
    }
}
