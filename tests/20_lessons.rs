mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::TestApp;

fn titles(body: &Value) -> Vec<String> {
    body.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|l| l["title"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn create_takes_creator_from_the_principal() -> Result<()> {
    let app = TestApp::new()?;
    app.user("author@example.com", "Author").await?;
    let token = app.token("author@example.com");

    let (status, body) = app
        .post(
            "/lessons",
            Some(&token),
            json!({
                "title": "  Patience pays  ",
                "emotionalTone": "Reflective",
                "featured": true,
                "likes": ["sneaky@example.com"],
                "creator": {"email": "someone@else.com"}
            }),
        )
        .await?;

    assert_eq!(status, StatusCode::CREATED);
    let lesson = &body["data"]["lesson"];
    assert_eq!(body["data"]["insertedId"], lesson["id"]);
    assert_eq!(lesson["title"], "Patience pays");
    assert_eq!(lesson["creator"]["email"], "author@example.com");
    assert_eq!(lesson["creator"]["name"], "Author");
    assert_eq!(lesson["featured"], false);
    assert_eq!(lesson["likes"], json!([]));
    assert_eq!(lesson["accessLevel"], "free");
    assert_eq!(lesson["visibility"], "public");
    Ok(())
}

#[tokio::test]
async fn create_requires_a_title() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.token("author@example.com");

    let (status, _) = app.post("/lessons", Some(&token), json!({"title": "   "})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/lessons", None, json!({"title": "anon"})).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn public_listing_never_returns_private_lessons() -> Result<()> {
    let app = TestApp::new()?;
    app.lesson("a@example.com", json!({"title": "Open grief", "category": "Loss"})).await?;
    app.lesson("a@example.com", json!({"title": "Hidden grief", "category": "Loss", "visibility": "private"}))
        .await?;

    for query in [
        "/public-lessons",
        "/public-lessons?visibility=private",
        "/public-lessons?category=Loss&search=grief",
    ] {
        let (status, body) = app.get(query, None).await?;
        assert_eq!(status, StatusCode::OK, "{}", query);
        assert_eq!(body["data"]["total"], 1, "{}", query);
        assert_eq!(titles(&body["data"]["result"]), vec!["Open grief"], "{}", query);
    }
    Ok(())
}

#[tokio::test]
async fn public_listing_paginates_with_unpaginated_total() -> Result<()> {
    let app = TestApp::new()?;
    for i in 0..5 {
        app.lesson("a@example.com", json!({"title": format!("Lesson {}", i), "category": "Growth"}))
            .await?;
    }
    app.lesson("a@example.com", json!({"title": "Other", "category": "Career"})).await?;

    let (status, body) = app.get("/public-lessons?category=Growth&skip=2&limit=2", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 5);
    assert_eq!(body["data"]["result"].as_array().unwrap().len(), 2);

    let (_, body) = app.get("/public-lessons?category=Growth&skip=4&limit=2", None).await?;
    assert_eq!(body["data"]["result"].as_array().unwrap().len(), 1);

    let (_, body) = app.get("/public-lessons", None).await?;
    assert_eq!(body["data"]["total"], 6);
    assert_eq!(body["data"]["result"].as_array().unwrap().len(), 6);

    let (status, _) = app.get("/public-lessons?limit=0", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/public-lessons?skip=abc", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn search_matches_titles_case_insensitively() -> Result<()> {
    let app = TestApp::new()?;
    app.lesson("a@example.com", json!({"title": "Learning To Let Go"})).await?;
    app.lesson("a@example.com", json!({"title": "Holding on"})).await?;

    let (_, body) = app.get("/public-lessons?search=let%20go", None).await?;
    assert_eq!(titles(&body["data"]["result"]), vec!["Learning To Let Go"]);
    Ok(())
}

#[tokio::test]
async fn authenticated_listing_filters_by_creator_and_visibility() -> Result<()> {
    let app = TestApp::new()?;
    app.lesson("a@example.com", json!({"title": "A public"})).await?;
    app.lesson("a@example.com", json!({"title": "A private", "visibility": "private"})).await?;
    app.lesson("b@example.com", json!({"title": "B public"})).await?;
    let token = app.token("a@example.com");

    let (status, body) = app.get("/lessons?email=a@example.com", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body["data"]), vec!["A private", "A public"]);

    let (_, body) = app
        .get("/lessons?email=a@example.com&visibility=public", Some(&token))
        .await?;
    assert_eq!(titles(&body["data"]), vec!["A public"]);
    Ok(())
}

#[tokio::test]
async fn get_by_id_distinguishes_missing_and_malformed() -> Result<()> {
    let app = TestApp::new()?;
    let id = app.lesson("a@example.com", json!({"title": "Found"})).await?;
    let token = app.token("reader@example.com");

    let (status, body) = app.get(&format!("/lessons/{}", id), Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Found");

    let (status, _) = app
        .get(&format!("/lessons/{}", uuid::Uuid::new_v4()), Some(&token))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/lessons/not-an-id", Some(&token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn only_creator_or_admin_may_modify() -> Result<()> {
    let app = TestApp::new()?;
    let id = app.lesson("owner@example.com", json!({"title": "Mine"})).await?;
    let uri = format!("/lessons/{}", id);
    app.admin("admin@example.com").await?;

    let other = app.token("other@example.com");
    let (status, _) = app.patch(&uri, Some(&other), Some(json!({"title": "Stolen"}))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&uri, Some(&other)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = app.token("owner@example.com");
    let (status, body) = app
        .patch(&uri, Some(&owner), Some(json!({"title": "Still mine", "accessLevel": "premium", "featured": true})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Still mine");
    assert_eq!(body["data"]["accessLevel"], "premium");
    assert_eq!(body["data"]["featured"], false);

    let (status, _) = app.patch(&uri, Some(&owner), Some(json!({"likes": []}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let admin = app.token("admin@example.com");
    let (status, _) = app.patch(&uri, Some(&admin), Some(json!({"visibility": "private"}))).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.delete(&uri, Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&uri, Some(&admin)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn showcase_listings() -> Result<()> {
    let app = TestApp::new()?;
    app.admin("admin@example.com").await?;
    let admin = app.token("admin@example.com");

    let quiet = app.lesson("a@example.com", json!({"title": "Quiet"})).await?;
    let loved = app.lesson("a@example.com", json!({"title": "Loved"})).await?;
    let secret = app
        .lesson("b@example.com", json!({"title": "Secret", "visibility": "private"}))
        .await?;

    for fan in ["f1@example.com", "f2@example.com"] {
        let token = app.token(fan);
        app.patch(&format!("/lesson/{}/favorites", loved), Some(&token), None).await?;
        app.patch(&format!("/lesson/{}/favorites", secret), Some(&token), None).await?;
    }
    let token = app.token("f1@example.com");
    app.patch(&format!("/lesson/{}/favorites", quiet), Some(&token), None).await?;

    let (status, body) = app.get("/lessons/most-favorites", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body["data"]), vec!["Loved", "Quiet"]);

    let (status, _) = app
        .patch(&format!("/lessons/{}/featured", quiet), Some(&admin), Some(json!({"featured": true})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/lessons/featured", None).await?;
    assert_eq!(titles(&body["data"]), vec!["Quiet"]);

    let (_, body) = app.get("/users/top-contributors", None).await?;
    assert_eq!(body["data"][0]["email"], "a@example.com");
    assert_eq!(body["data"][0]["totalLessons"], 2);
    assert_eq!(body["data"][1]["totalLessons"], 1);
    Ok(())
}

#[tokio::test]
async fn featured_flag_is_admin_only_and_allow_listed() -> Result<()> {
    let app = TestApp::new()?;
    let id = app.lesson("owner@example.com", json!({"title": "Mine"})).await?;
    let uri = format!("/lessons/{}/featured", id);
    app.admin("admin@example.com").await?;

    let owner = app.token("owner@example.com");
    let (status, _) = app.patch(&uri, Some(&owner), Some(json!({"featured": true}))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.token("admin@example.com");
    let (status, _) = app
        .patch(&uri, Some(&admin), Some(json!({"featured": true, "title": "Renamed"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
