mod common;

use std::net::TcpListener;

use actix_web::http::{header, StatusCode};
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{rt, test, App, HttpServer};
use jsonwebtoken::Algorithm;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::{bearer, configure, init_app, register_user, test_state};
use tasklist::auth::TokenService;
use tasklist::models::Task;

#[actix_rt::test]
async fn test_task_lifecycle() {
    let state = test_state().await;
    let app = init_app(&state).await;

    let token = register_user(&app, "Alice", "a@x.com", "pw1")
        .await
        .expect("Failed to register Alice");

    let req = test::TestRequest::post()
        .uri("/todos")
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "t1", "description": "d1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body_bytes = test::read_body(resp).await;
    assert_eq!(
        status,
        StatusCode::CREATED,
        "Create task failed. Body: {:?}",
        String::from_utf8_lossy(&body_bytes)
    );

    let created: Task = serde_json::from_slice(&body_bytes).expect("Failed to parse task");
    assert_eq!(created.task_id, 1);
    assert_eq!(created.title, "t1");
    assert_eq!(created.description, "d1");

    let req = test::TestRequest::get()
        .uri("/todos?page=1&limit=10")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list: Value = test::read_body_json(resp).await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["page"], 1);
    assert_eq!(list["limit"], 10);
    assert_eq!(list["data"][0]["task_id"], 1);

    let req = test::TestRequest::get()
        .uri("/todos/1")
        .insert_header(bearer(&token))
        .to_request();
    let fetched: Task = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched, created);

    let req = test::TestRequest::put()
        .uri("/todos/1")
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "t1 renamed", "description": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Task = test::read_body_json(resp).await;
    assert_eq!(updated.task_id, 1);
    assert_eq!(updated.title, "t1 renamed");
    assert_eq!(updated.description, "");
    assert!(updated.updated_at >= created.updated_at);

    let req = test::TestRequest::delete()
        .uri("/todos/1")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/todos/1")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri("/todos/1")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_todos_require_a_valid_token() {
    let state = test_state().await;
    let app = init_app(&state).await;
    register_user(&app, "Alice", "a@x.com", "pw1").await.unwrap();

    let forged = TokenService::new(
        b"some-other-secret",
        Algorithm::HS256,
        chrono::Duration::minutes(5),
    )
    .issue("a@x.com", None)
    .unwrap();
    let expired = state
        .auth
        .tokens()
        .issue("a@x.com", Some(chrono::Duration::seconds(-10)))
        .unwrap();

    let cases = vec![
        (None, "no header"),
        (Some("Basic YTpi".to_string()), "wrong scheme"),
        (Some("Bearer".to_string()), "empty bearer"),
        (Some("Bearer not.a.token".to_string()), "malformed token"),
        (Some(format!("Bearer {}", forged)), "foreign signature"),
        (Some(format!("Bearer {}", expired)), "expired token"),
    ];

    for (authorization, description) in cases {
        let mut req = test::TestRequest::get().uri("/todos");
        if let Some(value) = authorization {
            req = req.insert_header((header::AUTHORIZATION, value));
        }

        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(
            resp.status(),
            StatusCode::UNAUTHORIZED,
            "Test case failed: {}",
            description
        );
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Could not validate credentials" }));
    }

    assert_eq!(state.tasks.count_all().await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_token_of_deleted_user_is_rejected() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let token = register_user(&app, "Alice", "a@x.com", "pw1").await.unwrap();

    let user = state.auth.users().find_by_email("a@x.com").await.unwrap().unwrap();
    state.auth.users().delete(user.user_id).await.unwrap();

    let req = test::TestRequest::get()
        .uri("/todos")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_tasks_are_private_to_their_owner() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let alice = register_user(&app, "Alice", "a@x.com", "pw1").await.unwrap();
    let bob = register_user(&app, "Bob", "b@x.com", "pw2").await.unwrap();

    let req = test::TestRequest::post()
        .uri("/todos")
        .insert_header(bearer(&alice))
        .set_json(json!({ "title": "alice's", "description": "" }))
        .to_request();
    let created: Task = test::call_and_read_body_json(&app, req).await;

    let requests = vec![
        test::TestRequest::get().uri(&format!("/todos/{}", created.task_id)),
        test::TestRequest::put()
            .uri(&format!("/todos/{}", created.task_id))
            .set_json(json!({ "title": "bob's now", "description": "" })),
        test::TestRequest::delete().uri(&format!("/todos/{}", created.task_id)),
    ];
    for req in requests {
        let resp = test::call_service(&app, req.insert_header(bearer(&bob)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    let req = test::TestRequest::get()
        .uri("/todos")
        .insert_header(bearer(&bob))
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list["total"], 0);
    assert_eq!(list["data"], json!([]));

    let req = test::TestRequest::get()
        .uri(&format!("/todos/{}", created.task_id))
        .insert_header(bearer(&alice))
        .to_request();
    let fetched: Task = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched.title, "alice's");
}

#[actix_rt::test]
async fn test_list_pagination() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let token = register_user(&app, "Alice", "a@x.com", "pw1").await.unwrap();

    for i in 0..12 {
        let req = test::TestRequest::post()
            .uri("/todos")
            .insert_header(bearer(&token))
            .set_json(json!({ "title": format!("task {}", i), "description": "" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let mut seen = Vec::new();
    for (page, expected_len) in [(1, 5), (2, 5), (3, 2), (4, 0)] {
        let req = test::TestRequest::get()
            .uri(&format!("/todos?page={}&limit=5", page))
            .insert_header(bearer(&token))
            .to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(list["total"], 12);
        assert_eq!(list["page"], page);
        let data = list["data"].as_array().unwrap();
        assert_eq!(data.len(), expected_len, "page {}", page);
        seen.extend(data.iter().map(|t| t["task_id"].as_i64().unwrap()));
    }

    assert_eq!(seen, (1..=12).collect::<Vec<i64>>());

    // Defaults apply when the query string is absent
    let req = test::TestRequest::get()
        .uri("/todos")
        .insert_header(bearer(&token))
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list["page"], 1);
    assert_eq!(list["limit"], 10);
    assert_eq!(list["data"].as_array().unwrap().len(), 10);
}

#[actix_rt::test]
async fn test_bad_requests() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let token = register_user(&app, "Alice", "a@x.com", "pw1").await.unwrap();

    let cases = vec![
        (test::TestRequest::get().uri("/todos?page=0"), "page zero"),
        (test::TestRequest::get().uri("/todos?limit=0"), "limit zero"),
        (test::TestRequest::get().uri("/todos?page=-3"), "negative page"),
        (test::TestRequest::get().uri("/todos?page=abc"), "page not a number"),
        (test::TestRequest::get().uri("/todos/abc"), "id not a number"),
        (
            test::TestRequest::post()
                .uri("/todos")
                .set_json(json!({ "title": "", "description": "" })),
            "empty title",
        ),
        (
            test::TestRequest::post()
                .uri("/todos")
                .set_json(json!({ "title": "  ", "description": "" })),
            "blank title",
        ),
        (
            test::TestRequest::post()
                .uri("/todos")
                .set_json(json!({ "title": "a".repeat(201), "description": "" })),
            "title too long",
        ),
        (
            test::TestRequest::post()
                .uri("/todos")
                .set_json(json!({ "title": "t", "description": "d".repeat(1001) })),
            "description too long",
        ),
        (
            test::TestRequest::post()
                .uri("/todos")
                .set_json(json!({ "description": "no title" })),
            "missing title",
        ),
    ];

    for (req, description) in cases {
        let resp = test::call_service(&app, req.insert_header(bearer(&token)).to_request()).await;
        let status = resp.status();
        let body_bytes = test::read_body(resp).await;
        assert_eq!(
            status,
            StatusCode::BAD_REQUEST,
            "Test case failed: {}. Body: {:?}",
            description,
            String::from_utf8_lossy(&body_bytes)
        );
    }

    assert_eq!(state.tasks.count_all().await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_trailing_slash_is_ignored() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let token = register_user(&app, "Alice", "a@x.com", "pw1").await.unwrap();

    let req = test::TestRequest::post()
        .uri("/todos/")
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "t1", "description": "d1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/todos/")
        .insert_header(bearer(&token))
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list["total"], 1);
}

#[actix_rt::test]
async fn test_create_task_unauthorized_over_http() {
    let state = test_state().await;

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server_state = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(Logger::default())
            .configure(configure(&server_state))
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to listen")
    .run();
    let handle = server.handle();
    rt::spawn(server);

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{}", port);

    let resp = client
        .post(format!("{}/todos", base))
        .json(&json!({ "title": "Unauthorized Task", "description": "" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers()
            .get(reqwest::header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );

    let resp = client
        .post(format!("{}/register", base))
        .json(&json!({ "name": "Alice", "email": "a@x.com", "password": "pw1" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let body: Value = resp.json().await.expect("Failed to parse register response");
    let token = body["access_token"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{}/todos", base))
        .bearer_auth(&token)
        .json(&json!({ "title": "Authorized Task", "description": "" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let task: Task = resp.json().await.expect("Failed to parse task");
    assert_eq!(task.title, "Authorized Task");

    handle.stop(true).await;
}
