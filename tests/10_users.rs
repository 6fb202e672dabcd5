mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn registration_is_idempotent() -> Result<()> {
    let app = TestApp::new()?;

    let (status, first) = app
        .post("/users", None, json!({"email": "Reader@Example.com", "name": "Reader", "role": "admin"}))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["data"]["email"], "reader@example.com");
    assert_eq!(first["data"]["role"], "user", "role is never taken from the body");

    let (status, second) = app
        .post("/users", None, json!({"email": "reader@example.com", "name": "Someone Else"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["id"], first["data"]["id"]);
    assert_eq!(second["data"]["name"], "Reader");
    Ok(())
}

#[tokio::test]
async fn registration_requires_an_email() -> Result<()> {
    let app = TestApp::new()?;
    let (status, body) = app.post("/users", None, json!({"email": "  "})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);

    let (status, _) = app.post("/users", None, json!({"name": "no email"})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn role_lookup_defaults_for_unknown_emails() -> Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app.get("/users/nobody@example.com/role", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"role": "user", "isPremium": false}));

    app.admin("boss@example.com").await?;
    let (_, body) = app.get("/users/boss@example.com/role", None).await?;
    assert_eq!(body["data"]["role"], "admin");
    Ok(())
}

#[tokio::test]
async fn user_listing_excludes_the_caller() -> Result<()> {
    let app = TestApp::new()?;
    app.user("a@example.com", "a").await?;
    app.user("b@example.com", "b").await?;
    app.user("c@example.com", "c").await?;

    let token = app.token("a@example.com");
    let (status, body) = app.get("/users", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);

    let emails: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails.len(), 2);
    assert!(!emails.contains(&"a@example.com"));
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() -> Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app.get("/users", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.get("/users", Some("not-a-token")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn profile_update_only_touches_allowed_fields() -> Result<()> {
    let app = TestApp::new()?;
    app.user("me@example.com", "me").await?;
    let token = app.token("me@example.com");

    let (status, body) = app
        .patch(
            "/users",
            Some(&token),
            Some(json!({"name": "New Name", "role": "admin", "isPremium": true})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "New Name");
    assert_eq!(body["data"]["role"], "user");
    assert_eq!(body["data"]["isPremium"], false);

    let (status, _) = app.patch("/users", Some(&token), Some(json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stranger = app.token("stranger@example.com");
    let (status, _) = app.patch("/users", Some(&stranger), Some(json!({"name": "x"}))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn role_changes_require_an_admin() -> Result<()> {
    let app = TestApp::new()?;
    let target = app.user("target@example.com", "target").await?;
    app.user("plain@example.com", "plain").await?;
    app.admin("admin@example.com").await?;
    let uri = format!("/users/{}/role", target.id);

    let plain = app.token("plain@example.com");
    let (status, body) = app.patch(&uri, Some(&plain), Some(json!({"role": "admin"}))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    // Authenticated but unregistered principals are not admins either
    let ghost = app.token("ghost@example.com");
    let (status, _) = app.patch(&uri, Some(&ghost), Some(json!({"role": "admin"}))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.patch(&uri, None, Some(json!({"role": "admin"}))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = app.token("admin@example.com");
    let (status, body) = app.patch(&uri, Some(&admin), Some(json!({"role": "admin"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");

    let missing = format!("/users/{}/role", uuid::Uuid::new_v4());
    let (status, _) = app.patch(&missing, Some(&admin), Some(json!({"role": "user"}))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn admin_user_update_is_allow_listed() -> Result<()> {
    let app = TestApp::new()?;
    let target = app.user("member@example.com", "member").await?;
    app.admin("admin@example.com").await?;
    let admin = app.token("admin@example.com");

    let (status, body) = app
        .patch(
            &format!("/user/{}", target.id),
            Some(&admin),
            Some(json!({"isPremium": true, "email": "hijack@example.com"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isPremium"], true);
    assert_eq!(body["data"]["email"], "member@example.com");

    let (status, _) = app
        .patch(&format!("/user/{}", target.id), Some(&admin), Some(json!({"email": "x@y.z"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
