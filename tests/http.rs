mod support;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use fortview::infra::http::{RouterOptions, build_router};

use support::{ADMIN_TOKEN, Harness, StaticHealth};

const BOUNDARY: &str = "fortview-test-boundary";

fn router(harness: &Harness) -> Router {
    router_with_limit(harness, 1_000)
}

fn router_with_limit(harness: &Harness, limit: u32) -> Router {
    build_router(
        harness.http_state(limit),
        RouterOptions {
            body_limit_bytes: 1024 * 1024,
            media_dir: None,
        },
    )
}

fn bearer() -> String {
    format!("Bearer {ADMIN_TOKEN}")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn admin(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer())
        .body(Body::empty())
        .expect("request")
}

fn admin_json(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Multipart body with text fields and one PNG per `(field, file_name)` pair.
fn multipart(fields: &[(&str, &str)], files: &[(&str, &str)]) -> Body {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    for (name, file_name) in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Body::from(body)
}

fn admin_multipart(uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer())
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .expect("request")
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

async fn create_offer(router: &Router) -> Value {
    let (status, body) = send(
        router,
        admin_multipart("/api/offers", multipart(&[], &[("image", "offer.png")])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn public_listing_returns_envelope() {
    let harness = Harness::new();
    let router = router(&harness);
    create_offer(&router).await;

    let (status, body) = send(&router, get("/api/offers")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 1);
    assert_eq!(body["pagination"]["current_page"], 1);
    assert_eq!(body["pagination"]["limit"], 12);
    assert_eq!(body["pagination"]["total_count"], 1);
    assert!(body["data"][0]["image"]["url"].is_string());
}

#[tokio::test]
async fn multipart_create_uploads_and_flattens_media() {
    let harness = Harness::new();
    let router = router(&harness);

    let (status, body) = send(
        &router,
        admin_multipart(
            "/api/selfie-points",
            multipart(
                &[("title", "Fort wall"), ("description", "Best at sunset")],
                &[("image", "wall.png")],
            ),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["title"], "Fort wall");
    assert_eq!(body["data"]["order"], 1);
    assert_eq!(body["data"]["is_active"], true);
    assert!(
        body["data"]["image"]["external_ref"]
            .as_str()
            .is_some_and(|reference| reference.starts_with("fortview/selfie-points/"))
    );
    assert_eq!(harness.media.live().len(), 1);
}

#[tokio::test]
async fn writes_without_a_token_are_rejected() {
    let harness = Harness::new();
    let router = router(&harness);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/offers")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "No token, authorization denied");

    let request = Request::builder()
        .method(Method::PATCH)
        .uri(format!("/api/offers/{}/toggle", Uuid::new_v4()))
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Token is not valid");
}

#[tokio::test]
async fn validation_failures_list_every_field() {
    let harness = Harness::new();
    let router = router(&harness);

    let (status, body) = send(
        &router,
        admin_json(
            Method::POST,
            "/api/selfie-points",
            json!({ "title": "Fort wall" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_failed");
    let fields: Vec<&str> = body["error"]["details"]
        .as_array()
        .expect("details")
        .iter()
        .filter_map(|violation| violation["field"].as_str())
        .collect();
    assert!(fields.contains(&"description"), "{fields:?}");
    assert!(fields.contains(&"image"), "{fields:?}");
}

#[tokio::test]
async fn malformed_and_unknown_ids() {
    let harness = Harness::new();
    let router = router(&harness);

    let (status, body) = send(&router, get("/api/offers/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");

    let (status, body) = send(&router, get(&format!("/api/offers/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn kinds_do_not_see_each_other() {
    let harness = Harness::new();
    let router = router(&harness);
    let offer = create_offer(&router).await;
    let id = offer["id"].as_str().expect("id");

    let (status, _) = send(&router, get(&format!("/api/offers/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&router, get(&format!("/api/games/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reorder_then_list() {
    let harness = Harness::new();
    let router = router(&harness);
    let a = create_offer(&router).await;
    let b = create_offer(&router).await;

    let (status, body) = send(
        &router,
        admin_json(
            Method::PATCH,
            "/api/offers/reorder",
            json!({ "items": [
                { "id": a["id"], "order": 2 },
                { "id": b["id"], "order": 1 },
            ]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"][0]["id"], b["id"]);

    let (_, listing) = send(&router, get("/api/offers")).await;
    assert_eq!(listing["data"][0]["id"], b["id"]);
    assert_eq!(listing["data"][1]["id"], a["id"]);
}

#[tokio::test]
async fn reorder_without_items_is_invalid() {
    let harness = Harness::new();
    let router = router(&harness);

    let (status, body) = send(
        &router,
        admin_json(Method::PUT, "/api/offers/reorder", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn toggle_hides_from_active_listing() {
    let harness = Harness::new();
    let router = router(&harness);
    let a = create_offer(&router).await;
    create_offer(&router).await;
    let id = a["id"].as_str().expect("id");

    let (status, body) = send(
        &router,
        admin(Method::PATCH, &format!("/api/offers/{id}/toggle")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (_, active) = send(&router, get("/api/offers/active")).await;
    assert_eq!(active["count"], 1);
    let (_, filtered) = send(&router, get("/api/offers?isActive=false")).await;
    assert_eq!(filtered["count"], 1);
    assert_eq!(filtered["data"][0]["id"], a["id"]);
    let (_, all) = send(&router, get("/api/offers")).await;
    assert_eq!(all["count"], 2);
}

#[tokio::test]
async fn json_update_changes_only_sent_fields() {
    let harness = Harness::new();
    let router = router(&harness);
    let (_, created) = send(
        &router,
        admin_multipart(
            "/api/selfie-points",
            multipart(
                &[("title", "Fort wall"), ("description", "Best at sunset")],
                &[("image", "wall.png")],
            ),
        ),
    )
    .await;
    let id = created["data"]["id"].as_str().expect("id");

    let (status, body) = send(
        &router,
        admin_json(
            Method::PUT,
            &format!("/api/selfie-points/{id}"),
            json!({ "description": "Golden hour", "order": 4 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["title"], "Fort wall");
    assert_eq!(body["data"]["description"], "Golden hour");
    assert_eq!(body["data"]["order"], 4);
    assert_eq!(body["data"]["image"], created["data"]["image"]);
}

#[tokio::test]
async fn delete_reports_orphaned_media() {
    let harness = Harness::new();
    let router = router(&harness);
    let offer = create_offer(&router).await;
    let external_ref = offer["image"]["external_ref"].as_str().expect("ref");
    harness.media.refuse_delete(external_ref);

    let (status, body) = send(
        &router,
        admin(
            Method::DELETE,
            &format!("/api/offers/{}", offer["id"].as_str().expect("id")),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], offer["id"]);
    assert_eq!(
        body["warnings"]["orphaned_media"][0]["external_ref"],
        external_ref
    );

    let (_, listing) = send(&router, get("/api/offers")).await;
    assert_eq!(listing["count"], 0);
}

#[tokio::test]
async fn bad_pagination_is_rejected() {
    let harness = Harness::new();
    let router = router(&harness);

    let (status, body) = send(&router, get("/api/offers?limit=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");

    let (status, _) = send(&router, get("/api/offers?page=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn limit_is_clamped() {
    let harness = Harness::new();
    let router = router(&harness);

    let (status, body) = send(&router, get("/api/offers?limit=500")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["limit"], 100);
}

#[tokio::test]
async fn rate_limit_applies_per_client() {
    let harness = Harness::new();
    let router = router_with_limit(&harness, 2);

    let forwarded = |ip: &str| {
        Request::builder()
            .uri("/api/offers")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .expect("request")
    };

    for _ in 0..2 {
        let (status, _) = send(&router, forwarded("203.0.113.7")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let response = router
        .clone()
        .oneshot(forwarded("203.0.113.7, 10.0.0.1"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    let (status, _) = send(&router, forwarded("198.51.100.4")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_reflects_the_store() {
    let harness = Harness::new();

    let (status, body) = send(&router(&harness), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let mut state = harness.http_state(10);
    state.health = Arc::new(StaticHealth(false));
    let down = build_router(
        state,
        RouterOptions {
            body_limit_bytes: 1024,
            media_dir: None,
        },
    );
    let response = down.oneshot(get("/api/health")).await.expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn adventure_stats_route_is_public_and_grouped() {
    let harness = Harness::new();
    let router = router(&harness);
    let fields = [
        ("name", "Zipline"),
        ("description", "Across the moat"),
        ("detailed_description", "Two lines, 180 metres"),
        ("category", "outdoor"),
        ("icon", "wind"),
        ("age_group", "teens-adults"),
        ("difficulty", "moderate"),
        ("timing", "morning-evening"),
        ("duration", "10 minutes"),
        ("capacity", "2 riders"),
    ];
    let (status, body) = send(
        &router,
        admin_multipart(
            "/api/adventure-activities",
            multipart(&fields, &[("image", "zip.png")]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = send(&router, get("/api/adventure-activities/stats")).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["active"], 1);
    assert_eq!(body["data"]["inactive"], 0);
    assert_eq!(body["data"]["by_category"][0]["value"], "outdoor");
    assert_eq!(body["data"]["by_category"][0]["count"], 1);
    assert_eq!(body["data"]["by_difficulty"][0]["value"], "moderate");
    assert_eq!(body["data"]["by_age_group"][0]["value"], "teens-adults");
}

#[tokio::test]
async fn unknown_routes_are_json_not_found() {
    let harness = Harness::new();
    let (status, body) = send(&router(&harness), get("/api/nothing-here")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn contact_inquiries_round_trip() {
    let harness = Harness::new();
    let router = router(&harness);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/contacts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "name": "Meera",
                "email": "Meera@Example.com",
                "mobile": "9876543210",
                "message": "Is the pool open in December?",
            })
            .to_string(),
        ))
        .expect("request");
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["email"], "meera@example.com");
    let id = body["data"]["id"].as_str().expect("id").to_string();

    let (status, _) = send(&router, get("/api/contacts")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, listing) = send(&router, admin(Method::GET, "/api/contacts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["count"], 1);

    let (status, _) = send(
        &router,
        admin(Method::DELETE, &format!("/api/contacts/{id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&router, admin(Method::GET, &format!("/api/contacts/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_inquiry_is_rejected() {
    let harness = Harness::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/contacts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "name": "Meera", "email": "nope" }).to_string()))
        .expect("request");

    let (status, body) = send(&router(&harness), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_failed");
}
