use sea_query::Iden;

/// Stories table - one row per audio story
#[derive(Iden)]
pub enum Stories {
    Table,
    Id,
    Title,
    Slug,
    Description,
    CoverImage,
    Author,
    Category,
    Tags,
    Views,
    Likes,
    Status,
    CreatedAt,
    UpdatedAt,
}

/// Chapters table - ordered audio chapters belonging to a story
#[derive(Iden)]
pub enum Chapters {
    Table,
    Id,
    StoryId,
    Title,
    Order,
    Content,
    Name,
    Duration,
    CreatedAt,
    UpdatedAt,
}

/// History table - at most one listening-progress row per (user, story, chapter)
#[derive(Iden)]
pub enum History {
    Table,
    Id,
    UserId,
    StoryId,
    ChapterId,
    LastPosition,
    Duration,
    ProgressPercent,
    IsCompleted,
    CreatedAt,
    UpdatedAt,
}
