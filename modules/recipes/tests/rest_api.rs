mod common;

use axum::http::{header, Method, StatusCode};
use serde_json::json;

use common::{create_test_router, login, send, signup};

#[tokio::test]
async fn assigned_only_returns_tags_used_by_recipes() {
    let router = create_test_router().await;
    let token = signup(&router, "a@x.com", "pw12345").await;

    let vegan = send(
        &router,
        Method::POST,
        "/recipe/tags",
        Some(&token),
        Some(json!({ "name": "Vegan" })),
    )
    .await;
    assert_eq!(vegan.status, StatusCode::CREATED);
    let vegan_id = vegan.body["id"].as_i64().unwrap();

    // Present in the full listing, never referenced.
    send(
        &router,
        Method::POST,
        "/recipe/tags",
        Some(&token),
        Some(json!({ "name": "Dessert" })),
    )
    .await;

    let recipe = send(
        &router,
        Method::POST,
        "/recipe/recipes",
        Some(&token),
        Some(json!({
            "title": "Salad",
            "time_minutes": 10,
            "price": "5.00",
            "tags": [vegan_id]
        })),
    )
    .await;
    assert_eq!(recipe.status, StatusCode::CREATED);

    let all = send(&router, Method::GET, "/recipe/tags", Some(&token), None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().unwrap().len(), 2);

    let assigned = send(
        &router,
        Method::GET,
        "/recipe/tags?assigned_only=1",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(assigned.status, StatusCode::OK);
    assert_eq!(assigned.body, json!([{ "id": vegan_id, "name": "Vegan" }]));
}

#[tokio::test]
async fn assigned_only_collapses_duplicates() {
    let router = create_test_router().await;
    let token = signup(&router, "chef@example.com", "secret1").await;

    let salt = send(
        &router,
        Method::POST,
        "/recipe/ingredients",
        Some(&token),
        Some(json!({ "name": "Salt" })),
    )
    .await;
    let salt_id = salt.body["id"].as_i64().unwrap();

    for title in ["Soup", "Stew"] {
        let resp = send(
            &router,
            Method::POST,
            "/recipe/recipes",
            Some(&token),
            Some(json!({
                "title": title,
                "time_minutes": 30,
                "price": 4.5,
                "ingredients": [salt_id]
            })),
        )
        .await;
        assert_eq!(resp.status, StatusCode::CREATED);
    }

    let resp = send(
        &router,
        Method::GET,
        "/recipe/ingredients?assigned_only=1",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body.as_array().unwrap().len(), 1);

    let zero = send(
        &router,
        Method::GET,
        "/recipe/ingredients?assigned_only=0",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(zero.body.as_array().unwrap().len(), 1);

    let invalid = send(
        &router,
        Method::GET,
        "/recipe/ingredients?assigned_only=maybe",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.body["errors"][0]["pointer"], "/assigned_only");
}

#[tokio::test]
async fn tags_are_isolated_and_ordered_by_name() {
    let router = create_test_router().await;
    let alice = signup(&router, "alice@example.com", "password").await;
    let bob = signup(&router, "bob@example.com", "password").await;

    for name in ["Spicy", "Breakfast"] {
        send(
            &router,
            Method::POST,
            "/recipe/tags",
            Some(&alice),
            Some(json!({ "name": name })),
        )
        .await;
    }
    send(
        &router,
        Method::POST,
        "/recipe/tags",
        Some(&bob),
        Some(json!({ "name": "Lunch" })),
    )
    .await;

    let resp = send(&router, Method::GET, "/recipe/tags", Some(&alice), None).await;
    let names: Vec<&str> = resp
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Breakfast", "Spicy"]);

    let resp = send(&router, Method::GET, "/recipe/tags", Some(&bob), None).await;
    assert_eq!(resp.body.as_array().unwrap().len(), 1);
    assert_eq!(resp.body[0]["name"], "Lunch");
}

#[tokio::test]
async fn empty_tag_name_is_rejected_and_not_persisted() {
    let router = create_test_router().await;
    let token = signup(&router, "a@x.com", "pw12345").await;

    let resp = send(
        &router,
        Method::POST,
        "/recipe/tags",
        Some(&token),
        Some(json!({ "name": "" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["code"], "RECIPES_VALIDATION");
    assert_eq!(resp.body["errors"][0]["pointer"], "/name");

    let list = send(&router, Method::GET, "/recipe/tags", Some(&token), None).await;
    assert_eq!(list.body, json!([]));
}

#[tokio::test]
async fn ingredients_limited_to_owner() {
    let router = create_test_router().await;
    let alice = signup(&router, "alice@example.com", "password").await;
    let bob = signup(&router, "bob@example.com", "password").await;

    let created = send(
        &router,
        Method::POST,
        "/recipe/ingredients",
        Some(&alice),
        Some(json!({ "name": "Kale" })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["name"], "Kale");
    send(
        &router,
        Method::POST,
        "/recipe/ingredients",
        Some(&bob),
        Some(json!({ "name": "Salt" })),
    )
    .await;

    let resp = send(&router, Method::GET, "/recipe/ingredients", Some(&alice), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.body,
        json!([{ "id": created.body["id"], "name": "Kale" }])
    );

    let resp = send(&router, Method::GET, "/recipe/ingredients", Some(&bob), None).await;
    assert_eq!(resp.body.as_array().unwrap().len(), 1);
    assert_eq!(resp.body[0]["name"], "Salt");
}

#[tokio::test]
async fn empty_ingredient_name_is_rejected_and_not_persisted() {
    let router = create_test_router().await;
    let token = signup(&router, "a@x.com", "pw12345").await;

    let resp = send(
        &router,
        Method::POST,
        "/recipe/ingredients",
        Some(&token),
        Some(json!({ "name": "" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["code"], "RECIPES_VALIDATION");
    assert_eq!(resp.body["errors"][0]["pointer"], "/name");

    let list = send(&router, Method::GET, "/recipe/ingredients", Some(&token), None).await;
    assert_eq!(list.body, json!([]));
}

#[tokio::test]
async fn register_never_returns_password() {
    let router = create_test_router().await;

    let resp = send(
        &router,
        Method::POST,
        "/user/create",
        None,
        Some(json!({ "email": "New@Example.com", "password": "pw12345", "name": "New" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.body["email"], "new@example.com");
    assert_eq!(resp.body["name"], "New");
    assert!(resp.body.get("password").is_none());
    assert!(resp.body.get("password_hash").is_none());
}

#[tokio::test]
async fn register_validation_failures() {
    let router = create_test_router().await;

    let short = send(
        &router,
        Method::POST,
        "/user/create",
        None,
        Some(json!({ "email": "short@example.com", "password": "pw", "name": "S" })),
    )
    .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.body["errors"][0]["pointer"], "/password");

    // Nothing was stored, so the same email can still sign up.
    signup(&router, "short@example.com", "longer-pw").await;

    let duplicate = send(
        &router,
        Method::POST,
        "/user/create",
        None,
        Some(json!({ "email": "SHORT@example.com", "password": "pw12345", "name": "S" })),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.body["code"], "USERS_EMAIL_EXISTS");
}

#[tokio::test]
async fn token_failures_omit_token_field() {
    let router = create_test_router().await;
    signup(&router, "a@x.com", "pw12345").await;

    for body in [
        json!({ "email": "a@x.com", "password": "wrong-pw" }),
        json!({ "email": "nobody@x.com", "password": "pw12345" }),
        json!({ "email": "a@x.com" }),
    ] {
        let resp = send(&router, Method::POST, "/user/token", None, Some(body)).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.body.get("token").is_none());
    }
}

#[tokio::test]
async fn repeated_login_returns_same_token() {
    let router = create_test_router().await;
    let first = signup(&router, "a@x.com", "pw12345").await;
    let second = login(&router, "A@X.com", "pw12345").await;

    assert_eq!(first.len(), 40);
    assert_eq!(first, second);
}

#[tokio::test]
async fn profile_requires_token() {
    let router = create_test_router().await;

    let resp = send(&router, Method::GET, "/user/me", None, None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers.get(header::WWW_AUTHENTICATE).unwrap(), "Token");

    let resp = send(&router, Method::GET, "/user/me", Some("deadbeef"), None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = send(&router, Method::GET, "/recipe/recipes", None, None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_read_and_update() {
    let router = create_test_router().await;
    let token = signup(&router, "a@x.com", "pw12345").await;

    let me = send(&router, Method::GET, "/user/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body, json!({ "name": "Test", "email": "a@x.com" }));

    let post = send(&router, Method::POST, "/user/me", Some(&token), Some(json!({}))).await;
    assert_eq!(post.status, StatusCode::METHOD_NOT_ALLOWED);

    let patched = send(
        &router,
        Method::PATCH,
        "/user/me",
        Some(&token),
        Some(json!({ "name": "Renamed", "password": "new-password" })),
    )
    .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.body["name"], "Renamed");
    assert!(patched.body.get("password").is_none());

    // Old password no longer works, the new one does.
    let old = send(
        &router,
        Method::POST,
        "/user/token",
        None,
        Some(json!({ "email": "a@x.com", "password": "pw12345" })),
    )
    .await;
    assert_eq!(old.status, StatusCode::BAD_REQUEST);
    assert_eq!(login(&router, "a@x.com", "new-password").await, token);
}

#[tokio::test]
async fn recipe_crud_flow() {
    let router = create_test_router().await;
    let token = signup(&router, "a@x.com", "pw12345").await;

    let tag = send(
        &router,
        Method::POST,
        "/recipe/tags",
        Some(&token),
        Some(json!({ "name": "Quick" })),
    )
    .await;
    let tag_id = tag.body["id"].as_i64().unwrap();
    let ing = send(
        &router,
        Method::POST,
        "/recipe/ingredients",
        Some(&token),
        Some(json!({ "name": "Egg" })),
    )
    .await;
    let ing_id = ing.body["id"].as_i64().unwrap();

    let created = send(
        &router,
        Method::POST,
        "/recipe/recipes",
        Some(&token),
        Some(json!({
            "title": "Omelette",
            "time_minutes": 5,
            "price": "3.5",
            "link": "https://example.com/omelette",
            "tags": [tag_id],
            "ingredients": [ing_id]
        })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["price"], "3.50");
    assert_eq!(created.body["tags"], json!([tag_id]));
    let id = created.body["id"].as_i64().unwrap();
    let path = format!("/recipe/recipes/{id}");

    let detail = send(&router, Method::GET, &path, Some(&token), None).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["tags"], json!([{ "id": tag_id, "name": "Quick" }]));
    assert_eq!(detail.body["ingredients"], json!([{ "id": ing_id, "name": "Egg" }]));

    let list = send(&router, Method::GET, "/recipe/recipes", Some(&token), None).await;
    assert_eq!(list.body.as_array().unwrap().len(), 1);
    assert_eq!(list.body[0]["ingredients"], json!([ing_id]));

    // PATCH touches only the given fields.
    let patched = send(
        &router,
        Method::PATCH,
        &path,
        Some(&token),
        Some(json!({ "title": "Cheese omelette" })),
    )
    .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.body["title"], "Cheese omelette");
    assert_eq!(patched.body["tags"], json!([tag_id]));
    assert_eq!(patched.body["time_minutes"], 5);

    // PUT replaces everything; omitted relations are cleared.
    let replaced = send(
        &router,
        Method::PUT,
        &path,
        Some(&token),
        Some(json!({ "title": "Scrambled", "time_minutes": 7, "price": 2 })),
    )
    .await;
    assert_eq!(replaced.status, StatusCode::OK);
    assert_eq!(replaced.body["tags"], json!([]));
    assert_eq!(replaced.body["ingredients"], json!([]));
    assert_eq!(replaced.body["link"], "");
    assert_eq!(replaced.body["price"], "2.00");

    let incomplete = send(
        &router,
        Method::PUT,
        &path,
        Some(&token),
        Some(json!({ "title": "Only title" })),
    )
    .await;
    assert_eq!(incomplete.status, StatusCode::BAD_REQUEST);
    assert_eq!(incomplete.body["errors"].as_array().unwrap().len(), 2);

    let deleted = send(&router, Method::DELETE, &path, Some(&token), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = send(&router, Method::GET, &path, Some(&token), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["code"], "RECIPES_NOT_FOUND");

    // The tag survives its recipe.
    let tags = send(&router, Method::GET, "/recipe/tags", Some(&token), None).await;
    assert_eq!(tags.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn foreign_recipe_is_not_found() {
    let router = create_test_router().await;
    let alice = signup(&router, "alice@example.com", "password").await;
    let bob = signup(&router, "bob@example.com", "password").await;

    let created = send(
        &router,
        Method::POST,
        "/recipe/recipes",
        Some(&alice),
        Some(json!({ "title": "Pie", "time_minutes": 60, "price": "9.99" })),
    )
    .await;
    let path = format!("/recipe/recipes/{}", created.body["id"]);

    let get = send(&router, Method::GET, &path, Some(&bob), None).await;
    assert_eq!(get.status, StatusCode::NOT_FOUND);

    // 404 wins over missing fields on PUT.
    let put = send(&router, Method::PUT, &path, Some(&bob), Some(json!({}))).await;
    assert_eq!(put.status, StatusCode::NOT_FOUND);

    let patch = send(
        &router,
        Method::PATCH,
        &path,
        Some(&bob),
        Some(json!({ "title": "Stolen" })),
    )
    .await;
    assert_eq!(patch.status, StatusCode::NOT_FOUND);

    let delete = send(&router, Method::DELETE, &path, Some(&bob), None).await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);

    let list = send(&router, Method::GET, "/recipe/recipes", Some(&bob), None).await;
    assert_eq!(list.body, json!([]));

    let still_there = send(&router, Method::GET, &path, Some(&alice), None).await;
    assert_eq!(still_there.body["title"], "Pie");
}

#[tokio::test]
async fn recipe_rejects_foreign_tag_ids() {
    let router = create_test_router().await;
    let alice = signup(&router, "alice@example.com", "password").await;
    let bob = signup(&router, "bob@example.com", "password").await;

    let tag = send(
        &router,
        Method::POST,
        "/recipe/tags",
        Some(&alice),
        Some(json!({ "name": "Private" })),
    )
    .await;
    let tag_id = tag.body["id"].as_i64().unwrap();

    let resp = send(
        &router,
        Method::POST,
        "/recipe/recipes",
        Some(&bob),
        Some(json!({ "title": "Pie", "time_minutes": 60, "price": "9.99", "tags": [tag_id] })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["errors"][0]["pointer"], "/tags");

    let list = send(&router, Method::GET, "/recipe/recipes", Some(&bob), None).await;
    assert_eq!(list.body, json!([]));
}

#[tokio::test]
async fn recipe_field_validation() {
    let router = create_test_router().await;
    let token = signup(&router, "a@x.com", "pw12345").await;

    let missing = send(
        &router,
        Method::POST,
        "/recipe/recipes",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["errors"].as_array().unwrap().len(), 3);

    let bad_price = send(
        &router,
        Method::POST,
        "/recipe/recipes",
        Some(&token),
        Some(json!({ "title": "X", "time_minutes": 1, "price": "1.234" })),
    )
    .await;
    assert_eq!(bad_price.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_price.body["errors"][0]["pointer"], "/price");

    let malformed = router_send_raw(&router, &token, "{not json").await;
    assert_eq!(malformed, StatusCode::BAD_REQUEST);
}

async fn router_send_raw(router: &axum::Router, token: &str, body: &str) -> StatusCode {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    let req = Request::builder()
        .method(Method::POST)
        .uri("/recipe/recipes")
        .header(header::AUTHORIZATION, format!("Token {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    router.clone().oneshot(req).await.unwrap().status()
}
