use sea_query::{Expr, Func, LikeExpr, Order, Query, SqliteQueryBuilder};

use crate::schema::Stories;

/// Columns selected for every story row, in the order the row mappers expect
fn story_columns() -> [Stories; 8] {
    [
        Stories::Id,
        Stories::Title,
        Stories::Slug,
        Stories::Description,
        Stories::CoverImage,
        Stories::Author,
        Stories::Category,
        Stories::Tags,
    ]
}

/// INSERT INTO stories (title, slug, description, cover_image, author, category,
/// tags, created_at, updated_at) VALUES (?, ..., ?)
#[allow(clippy::too_many_arguments)]
pub fn insert(
    title: &str,
    slug: &str,
    description: Option<&str>,
    cover_image: Option<&str>,
    author: Option<&str>,
    category: Option<&str>,
    tags_json: &str,
    now: &str,
) -> String {
    Query::insert()
        .into_table(Stories::Table)
        .columns([
            Stories::Title,
            Stories::Slug,
            Stories::Description,
            Stories::CoverImage,
            Stories::Author,
            Stories::Category,
            Stories::Tags,
            Stories::CreatedAt,
            Stories::UpdatedAt,
        ])
        .values_panic([
            title.into(),
            slug.into(),
            description.into(),
            cover_image.into(),
            author.into(),
            category.into(),
            tags_json.into(),
            now.into(),
            now.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM stories ORDER BY id
pub fn select_all() -> String {
    Query::select()
        .columns(story_columns())
        .from(Stories::Table)
        .order_by(Stories::Id, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM stories WHERE id = ?
pub fn select_by_id(id: i64) -> String {
    Query::select()
        .columns(story_columns())
        .from(Stories::Table)
        .and_where(Expr::col(Stories::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT id FROM stories WHERE slug = ?
pub fn select_id_by_slug(slug: &str) -> String {
    Query::select()
        .column(Stories::Id)
        .from(Stories::Table)
        .and_where(Expr::col(Stories::Slug).eq(slug))
        .to_string(SqliteQueryBuilder)
}

/// SELECT 1 FROM stories WHERE id = ? (for existence check)
pub fn exists(id: i64) -> String {
    Query::select()
        .expr(Expr::val(1))
        .from(Stories::Table)
        .and_where(Expr::col(Stories::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// Escape LIKE wildcards in a user-supplied search term
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn search_pattern(term: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(&term.to_lowercase()))).escape('\\')
}

fn apply_search_filter(select: &mut sea_query::SelectStatement, term: &str) {
    if term.is_empty() {
        return;
    }
    select.cond_where(
        sea_query::Cond::any()
            .add(Expr::expr(Func::lower(Expr::col(Stories::Title))).like(search_pattern(term)))
            .add(
                Expr::expr(Func::lower(Expr::col(Stories::Description)))
                    .like(search_pattern(term)),
            )
            .add(Expr::expr(Func::lower(Expr::col(Stories::Tags))).like(search_pattern(term))),
    );
}

/// SELECT COUNT(*) FROM stories WHERE lower(title) LIKE ? OR lower(description)
/// LIKE ? OR lower(tags) LIKE ?
pub fn count_search(term: &str) -> String {
    let mut select = Query::select();
    select
        .expr(Expr::col(Stories::Id).count())
        .from(Stories::Table);
    apply_search_filter(&mut select, term);
    select.to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM stories WHERE <search filter> ORDER BY id LIMIT ? OFFSET ?
pub fn select_search(term: &str, limit: u32, offset: u64) -> String {
    let mut select = Query::select();
    select
        .columns(story_columns())
        .from(Stories::Table)
        .order_by(Stories::Id, Order::Asc)
        .limit(limit as u64)
        .offset(offset);
    apply_search_filter(&mut select, term);
    select.to_string(SqliteQueryBuilder)
}
