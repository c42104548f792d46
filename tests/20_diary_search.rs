mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn idxs(body: &Value) -> Vec<i64> {
    body["data"]["list"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|row| row["idx"].as_i64()).collect())
        .unwrap_or_default()
}

fn dates(body: &Value) -> Vec<String> {
    body["data"]["list"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|row| row["date"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn sort_two_is_ascending_by_date() -> Result<()> {
    if !common::database_configured() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let session = common::session(server).await?;

    session.diary("first", "2025-01-01", &[]).await?;
    session.diary("third", "2025-01-03", &[]).await?;
    session.diary("second", "2025-01-02", &[]).await?;

    let (status, body) = session.get("/diaries?sort=2").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dates(&body), vec!["2025-01-01", "2025-01-02", "2025-01-03"]);

    let (_, body) = session.get("/diaries").await?;
    assert_eq!(dates(&body), vec!["2025-01-03", "2025-01-02", "2025-01-01"]);
    Ok(())
}

#[tokio::test]
async fn tag_filter_matches_the_exact_set() -> Result<()> {
    if !common::database_configured() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let session = common::session(server).await?;

    let ab = session.diary("ab", "2025-02-01", &["a", "b"]).await?;
    let _abc = session.diary("abc", "2025-02-02", &["a", "b", "c"]).await?;
    let _abd = session.diary("abd", "2025-02-03", &["a", "b", "d"]).await?;

    let (status, body) = session.get("/diaries?tag=a&tag=%23b").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(idxs(&body), vec![ab]);

    let (_, body) = session.get("/diaries?tag=c&tag=b&tag=a").await?;
    assert_eq!(body["data"]["list"][0]["tag"], json!(["a", "b", "c"]));
    assert_eq!(idxs(&body).len(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_tag_is_bad_request() -> Result<()> {
    if !common::database_configured() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let session = common::session(server).await?;

    let (status, body) = session.get("/diaries?tag=ok&tag=no%20spaces").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["tag"].is_string());
    Ok(())
}

#[tokio::test]
async fn date_filters() -> Result<()> {
    if !common::database_configured() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let session = common::session(server).await?;

    session.diary("jan", "2025-01-15", &[]).await?;
    session.diary("feb", "2025-02-15", &[]).await?;
    session.diary("mar", "2025-03-15", &[]).await?;

    let (_, body) = session.get("/diaries?date=20250215").await?;
    assert_eq!(dates(&body), vec!["2025-02-15"]);

    let (_, body) = session.get("/diaries?start=2025-02-01&end=2025-03-31&sort=2").await?;
    assert_eq!(dates(&body), vec!["2025-02-15", "2025-03-15"]);

    let (status, _) = session.get("/diaries?start=2025-03-31&end=2025-02-01").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = session.get("/diaries?date=1999-01-01").await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn diaries_are_private() -> Result<()> {
    if !common::database_configured() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let owner = common::session(server).await?;
    let other = common::session(server).await?;

    let idx = owner.diary("mine", "2025-04-01", &["x"]).await?;

    let (status, _) = other.get(&format!("/diaries/{}", idx)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = other.delete(&format!("/diaries/{}", idx)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = owner
        .put(
            &format!("/diaries/{}", idx),
            json!({ "title": "edited", "content": "content", "emotion_idx": 1, "date": "2025-04-02" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (_, body) = owner.get(&format!("/diaries/{}", idx)).await?;
    assert_eq!(body["data"]["title"], "edited");
    assert_eq!(body["data"]["tag"], Value::Null);

    let (status, _) = owner.delete(&format!("/diaries/{}", idx)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    Ok(())
}
