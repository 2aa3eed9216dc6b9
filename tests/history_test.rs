//! # Listening-progress tests
//!
//! Exercise the progress upsert, its validation rules, history listing and
//! story-wide deletion through the real router.
//!
//! ## Running the Tests
//!
//! ```bash
//! cargo test --test history_test
//! ```

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

use story_audio_api::archive::ArchiveClient;
use story_audio_api::config::ArchiveConfig;
use story_audio_api::serve::{build_router, AppState};

/// Build app state over a fresh in-memory database. The archive endpoints
/// point at an unroutable address; none of these tests should ever fetch.
async fn test_state() -> Arc<AppState> {
    let pool = story_audio_api::db::create_test_connection_in_memory().await;
    let archive_config = ArchiveConfig {
        metadata_url: "http://127.0.0.1:1/metadata".to_string(),
        download_url: "http://127.0.0.1:1/download".to_string(),
        fetch_timeout_secs: 1,
    };
    Arc::new(AppState {
        pool,
        archive: ArchiveClient::new(&archive_config),
        http: reqwest::Client::new(),
        admin_token: "test-token".to_string(),
    })
}

/// Spawn the API on an ephemeral port and return its base URL
async fn spawn_server(state: Arc<AppState>) -> String {
    let app = build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Insert a story with `chapter_count` chapters; returns (story_id, chapter_ids)
async fn seed_story(state: &AppState, slug: &str, chapter_count: usize) -> (i64, Vec<i64>) {
    let seed = story_audio_api::seed::SeedFile {
        stories: vec![story_audio_api::seed::SeedStory {
            title: format!("Story {}", slug),
            slug: slug.to_string(),
            description: Some("A test story".to_string()),
            cover_image: Some("https://example.com/cover.jpg".to_string()),
            author: Some("tester".to_string()),
            category: Some("Audio".to_string()),
            tags: vec!["test".to_string()],
            chapters: (1..=chapter_count)
                .map(|i| story_audio_api::seed::SeedChapter {
                    title: format!("Chapter {}", i),
                    order: i as i64,
                    content: None,
                    name: format!("{:02}.m4a", i),
                })
                .collect(),
        }],
    };
    story_audio_api::seed::insert_seed(&state.pool, &seed)
        .await
        .unwrap();

    let sql = story_audio_api::queries::stories::select_id_by_slug(slug);
    let story_id: i64 = sqlx::query_scalar(&sql).fetch_one(&state.pool).await.unwrap();
    let chapters = story_audio_api::backfill::load_chapters(&state.pool, story_id)
        .await
        .unwrap();
    let chapter_ids = chapters.iter().map(|c| c.id).collect();
    (story_id, chapter_ids)
}

#[tokio::test]
async fn test_record_progress_upserts_in_place() {
    let state = test_state().await;
    let (story_id, chapter_ids) = seed_story(&state, "upsert-story", 2).await;
    let base = spawn_server(state.clone()).await;
    let client = reqwest::Client::new();

    // First report
    let resp = client
        .post(format!("{}/api/history", base))
        .json(&json!({
            "userId": "u1",
            "storyId": story_id,
            "chapterId": chapter_ids[0],
            "lastPosition": 42,
            "progressPercent": 10
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["lastPosition"], 42);
    assert_eq!(record["progressPercent"], 10);
    assert_eq!(record["isCompleted"], false);

    // Second report for the same triple overwrites, never duplicates
    let resp = client
        .post(format!("{}/api/history", base))
        .json(&json!({
            "userId": "u1",
            "storyId": story_id,
            "chapterId": chapter_ids[0],
            "lastPosition": 100,
            "progressPercent": 25
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["lastPosition"], 100);
    assert_eq!(record["progressPercent"], 25);

    let resp = client
        .get(format!("{}/api/history/user/u1", base))
        .send()
        .await
        .unwrap();
    let entries: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(entries.len(), 1, "only one record per (user, story, chapter)");
    assert_eq!(entries[0]["lastPosition"], 100);
}

#[tokio::test]
async fn test_partial_report_keeps_stored_optional_fields() {
    let state = test_state().await;
    let (story_id, chapter_ids) = seed_story(&state, "partial-story", 1).await;
    let base = spawn_server(state.clone()).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/history", base))
        .json(&json!({
            "userId": "u1",
            "storyId": story_id,
            "chapterId": chapter_ids[0],
            "lastPosition": 30,
            "duration": 600,
            "progressPercent": 5
        }))
        .send()
        .await
        .unwrap();

    // Report without duration/progressPercent: stored values survive
    let resp = client
        .post(format!("{}/api/history", base))
        .json(&json!({
            "userId": "u1",
            "storyId": story_id,
            "chapterId": chapter_ids[0],
            "lastPosition": 90
        }))
        .send()
        .await
        .unwrap();
    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["lastPosition"], 90);
    assert_eq!(record["duration"], 600);
    assert_eq!(record["progressPercent"], 5);
}

#[tokio::test]
async fn test_numeric_fields_are_normalized() {
    let state = test_state().await;
    let (story_id, chapter_ids) = seed_story(&state, "normalize-story", 1).await;
    let base = spawn_server(state.clone()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/history", base))
        .json(&json!({
            "userId": "u1",
            "storyId": story_id,
            "chapterId": chapter_ids[0],
            "lastPosition": 42.9,
            "duration": 300.7,
            "progressPercent": 24.6
        }))
        .send()
        .await
        .unwrap();
    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["lastPosition"], 42, "lastPosition is floored");
    assert_eq!(record["duration"], 300, "duration is floored");
    assert_eq!(record["progressPercent"], 25, "progressPercent is rounded");
}

#[tokio::test]
async fn test_validation_rejections() {
    let state = test_state().await;
    let (story_id, chapter_ids) = seed_story(&state, "validate-story", 1).await;
    let base = spawn_server(state.clone()).await;
    let client = reqwest::Client::new();

    // progressPercent outside [0, 100]
    for percent in [-1, 101] {
        let resp = client
            .post(format!("{}/api/history", base))
            .json(&json!({
                "userId": "u1",
                "storyId": story_id,
                "chapterId": chapter_ids[0],
                "progressPercent": percent
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "progressPercent {} must be rejected", percent);
    }

    // Negative lastPosition
    let resp = client
        .post(format!("{}/api/history", base))
        .json(&json!({
            "userId": "u1",
            "storyId": story_id,
            "chapterId": chapter_ids[0],
            "lastPosition": -1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Missing chapterId
    let resp = client
        .post(format!("{}/api/history", base))
        .json(&json!({"userId": "u1", "storyId": story_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn test_record_progress_missing_story_is_404() {
    let state = test_state().await;
    let base = spawn_server(state.clone()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/history", base))
        .json(&json!({"userId": "u1", "storyId": 9999, "chapterId": 1, "lastPosition": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_list_history_order_limit_and_projections() {
    let state = test_state().await;
    let (story_id, chapter_ids) = seed_story(&state, "list-story", 3).await;
    let base = spawn_server(state.clone()).await;
    let client = reqwest::Client::new();

    // Three reports against distinct chapters; updated_at strictly increases
    for (i, chapter_id) in chapter_ids.iter().enumerate() {
        client
            .post(format!("{}/api/history", base))
            .json(&json!({
                "userId": "u1",
                "storyId": story_id,
                "chapterId": chapter_id,
                "lastPosition": (i + 1) * 10
            }))
            .send()
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    // Most recently updated first
    let resp = client
        .get(format!("{}/api/history/user/u1", base))
        .send()
        .await
        .unwrap();
    let entries: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["chapterId"], chapter_ids[2]);
    assert_eq!(entries[2]["chapterId"], chapter_ids[0]);

    // Joined story/chapter projections
    assert_eq!(entries[0]["story"]["slug"], "list-story");
    assert_eq!(entries[0]["story"]["title"], "Story list-story");
    assert_eq!(entries[0]["chapter"]["order"], 3);

    // Never more than `limit` entries
    let resp = client
        .get(format!("{}/api/history/user/u1?limit=2", base))
        .send()
        .await
        .unwrap();
    let entries: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["chapterId"], chapter_ids[2]);

    // limit=0 is clamped, not an unbounded scan
    let resp = client
        .get(format!("{}/api/history/user/u1?limit=0", base))
        .send()
        .await
        .unwrap();
    let entries: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(entries.len(), 1);

    // Unknown user gets an empty list, not an error
    let resp = client
        .get(format!("{}/api/history/user/nobody", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let entries: Vec<Value> = resp.json().await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_delete_clears_all_chapter_rows_for_story() {
    let state = test_state().await;
    let (story_id, chapter_ids) = seed_story(&state, "delete-story", 2).await;
    let base = spawn_server(state.clone()).await;
    let client = reqwest::Client::new();

    for chapter_id in &chapter_ids {
        client
            .post(format!("{}/api/history", base))
            .json(&json!({
                "userId": "u1",
                "storyId": story_id,
                "chapterId": chapter_id,
                "lastPosition": 10
            }))
            .send()
            .await
            .unwrap();
    }

    let resp = client
        .delete(format!("{}/api/history", base))
        .json(&json!({"userId": "u1", "storyId": story_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["removed"], 2);

    let resp = client
        .get(format!("{}/api/history/user/u1", base))
        .send()
        .await
        .unwrap();
    let entries: Vec<Value> = resp.json().await.unwrap();
    assert!(entries.is_empty());

    // Deleting again finds nothing
    let resp = client
        .delete(format!("{}/api/history", base))
        .json(&json!({"userId": "u1", "storyId": story_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Missing keys are a validation error
    let resp = client
        .delete(format!("{}/api/history", base))
        .json(&json!({"userId": "u1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
