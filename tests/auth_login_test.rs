//! Login flow: credential verification and token issuance.

mod common;

use axum::http::{Method, StatusCode};
use common::{assert_status, response_json, TestApp};
use dispatch_api::entities::staff;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde_json::json;

#[tokio::test]
async fn login_issues_a_usable_token() {
    let app = TestApp::new().await;
    let buyer = app.seed_buyer("Login Buyer", 34.70, 135.50, 20).await;

    // Give the seeded buyer a real password hash.
    let hash = app.state.auth.hash_password("kaimono-pass").unwrap();
    let mut active: staff::ActiveModel = staff::Entity::find_by_id(buyer.staff_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap()
        .into();
    active.password_hash = Set(hash);
    active.update(&*app.db).await.unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({
                "email": "login.buyer@example.com",
                "password": "kaimono-pass"
            })),
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["staff_id"].as_i64().unwrap() as i32, buyer.staff_id);
    assert_eq!(body["role"], json!("buyer"));

    // The issued token authenticates API calls.
    let token = body["token"].as_str().unwrap().to_string();
    let response = app
        .request(Method::GET, "/api/v1/routes", Some(&token), None)
        .await;
    assert_status(&response, StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new().await;
    let buyer = app.seed_buyer("Strict Buyer", 34.70, 135.50, 20).await;

    let hash = app.state.auth.hash_password("correct").unwrap();
    let mut active: staff::ActiveModel = staff::Entity::find_by_id(buyer.staff_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap()
        .into();
    active.password_hash = Set(hash);
    active.update(&*app.db).await.unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({
                "email": "strict.buyer@example.com",
                "password": "wrong"
            })),
        )
        .await;
    assert_status(&response, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_email_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({
                "email": "nobody@example.com",
                "password": "whatever"
            })),
        )
        .await;
    assert_status(&response, StatusCode::UNAUTHORIZED);
}
