use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).expect("serialize")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn send(api: &TestApi, request: Request<Body>) -> (StatusCode, Value) {
    let response = api
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return (status, Value::Null);
    }
    (status, read_json_body(response).await)
}

async fn create_decision(api: &TestApi, token: &str, title: &str) -> String {
    let (status, body) = send(
        api,
        request(
            Method::POST,
            "/decisions",
            Some(token),
            Some(json!({"title": title, "description": "Family car"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().expect("decision id").to_string()
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let api = build_api();

    let (status, body) = send(&api, request(Method::GET, "/decisions", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "auth");
    assert_eq!(body["code"], "unauthorized");

    let (status, _) = send(
        &api,
        request(Method::GET, "/decisions", Some("not-a-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn manual_entry_flow_recommends_sedan() {
    let api = build_api();
    let session = api.register("driver@example.com");
    let token = session.token.as_str();
    let id = create_decision(&api, token, "Buy a car").await;

    let mut options = Vec::new();
    for name in ["Sedan", "SUV"] {
        let (status, body) = send(
            &api,
            request(
                Method::POST,
                &format!("/decisions/{id}/options"),
                Some(token),
                Some(json!({"name": name})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        options.push(body["id"].as_str().expect("option id").to_string());
    }

    let mut criteria = Vec::new();
    for (name, weight) in [("Price", 5), ("Comfort", 3)] {
        let (status, body) = send(
            &api,
            request(
                Method::POST,
                &format!("/decisions/{id}/criteria"),
                Some(token),
                Some(json!({"name": name, "weight": weight})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["weight"], weight);
        criteria.push(body["id"].as_str().expect("criterion id").to_string());
    }

    let values = [[8.0, 6.0], [4.0, 9.0]];
    for (option, row) in options.iter().zip(values) {
        for (criterion, value) in criteria.iter().zip(row) {
            let (status, body) = send(
                &api,
                request(
                    Method::PUT,
                    &format!("/decisions/{id}/evaluations"),
                    Some(token),
                    Some(json!({"optionId": option, "criterionId": criterion, "value": value})),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["value"], value);
        }
    }

    let (status, detail) = send(
        &api,
        request(Method::GET, &format!("/decisions/{id}"), Some(token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["decision"]["title"], "Buy a car");
    assert_eq!(detail["options"].as_array().map(Vec::len), Some(2));
    assert!(detail.get("evaluations").is_none());

    let (status, analysis) = send(
        &api,
        request(
            Method::POST,
            &format!("/decisions/{id}/analyze"),
            Some(token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analysis["recommended"]["name"], "Sedan");
    assert_eq!(analysis["recommended"]["score"], 72.5);
    assert_eq!(analysis["results"][1]["weightedTotal"], 47.0);
    assert_eq!(analysis["results"][1]["risk"], "medium");
}

#[tokio::test]
async fn list_wraps_decisions_in_an_envelope() {
    let api = build_api();
    let token = api.register("lister@example.com").token;
    create_decision(&api, &token, "First").await;
    create_decision(&api, &token, "Second").await;

    let (status, body) = send(&api, request(Method::GET, "/decisions", Some(&token), None)).await;

    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = body["decisions"]
        .as_array()
        .expect("decisions array")
        .iter()
        .map(|decision| decision["title"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(titles, vec!["First", "Second"]);
}

#[tokio::test]
async fn analyze_without_options_returns_domain_error() {
    let api = build_api();
    let token = api.register("empty@example.com").token;
    let id = create_decision(&api, &token, "Nothing yet").await;

    let (status, body) = send(
        &api,
        request(
            Method::POST,
            &format!("/decisions/{id}/analyze"),
            Some(&token),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "domain");
    assert_eq!(body["code"], "no_options");
}

#[tokio::test]
async fn other_users_decisions_are_not_found() {
    let api = build_api();
    let owner_token = api.register("owner@example.com").token;
    let other_token = api.register("other@example.com").token;
    let id = create_decision(&api, &owner_token, "Private").await;

    let (status, body) = send(
        &api,
        request(
            Method::GET,
            &format!("/decisions/{id}"),
            Some(&other_token),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn invalid_input_returns_validation_error() {
    let api = build_api();
    let token = api.register("validator@example.com").token;
    let id = create_decision(&api, &token, "Buy a car").await;

    let (status, body) = send(
        &api,
        request(
            Method::POST,
            &format!("/decisions/{id}/criteria"),
            Some(&token),
            Some(json!({"name": "Price", "weight": 9})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
    assert_eq!(body["code"], "weight_out_of_range");
}

#[tokio::test]
async fn mistyped_bodies_use_the_error_envelope() {
    let api = build_api();
    let token = api.register("typo@example.com").token;
    let id = create_decision(&api, &token, "Buy a car").await;

    let (status, body) = send(
        &api,
        request(
            Method::POST,
            &format!("/decisions/{id}/criteria"),
            Some(&token),
            Some(json!({"name": "Price", "weight": "heavy"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
    assert_eq!(body["code"], "invalid_body");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

    let (status, body) = send(
        &api,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"name": "No Password", "email": "np@example.com"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");

    let (status, body) = send(
        &api,
        request(Method::POST, "/decisions", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");
}

#[tokio::test]
async fn suggest_then_apply_stores_generated_output() {
    let api = build_api();
    let token = api.register("ai@example.com").token;
    let id = create_decision(&api, &token, "Buy a car").await;
    for name in ["Sedan", "SUV"] {
        send(
            &api,
            request(
                Method::POST,
                &format!("/decisions/{id}/options"),
                Some(&token),
                Some(json!({"name": name})),
            ),
        )
        .await;
    }

    let (status, suggestion) = send(
        &api,
        request(
            Method::POST,
            "/ai/suggest",
            Some(&token),
            Some(json!({
                "decisionTitle": "Buy a car",
                "description": "Family car",
                "options": ["Sedan", "SUV"]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, applied) = send(
        &api,
        request(
            Method::POST,
            &format!("/decisions/{id}/apply-ai"),
            Some(&token),
            Some(suggestion["generated"].clone()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(applied["criteria"].as_array().map(Vec::len), Some(2));
    assert_eq!(applied["evaluations"].as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn apply_rejects_unknown_option_before_persisting() {
    let api = build_api();
    let token = api.register("guard@example.com").token;
    let id = create_decision(&api, &token, "Buy a car").await;
    send(
        &api,
        request(
            Method::POST,
            &format!("/decisions/{id}/options"),
            Some(&token),
            Some(json!({"name": "Sedan"})),
        ),
    )
    .await;

    let (status, body) = send(
        &api,
        request(
            Method::POST,
            &format!("/decisions/{id}/apply-ai"),
            Some(&token),
            Some(json!({
                "criteria": [{"name": "Price", "weight": 5}],
                "evaluations": [{"option": "Hovercraft", "criterion": "Price", "value": 9}]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unknown_option");

    let (_, detail) = send(
        &api,
        request(Method::GET, &format!("/decisions/{id}"), Some(&token), None),
    )
    .await;
    assert_eq!(detail["criteria"], json!([]));
}

#[tokio::test]
async fn suggest_requires_at_least_one_option() {
    let api = build_api();
    let token = api.register("hasty@example.com").token;

    let (status, body) = send(
        &api,
        request(
            Method::POST,
            "/ai/suggest",
            Some(&token),
            Some(json!({"decisionTitle": "Buy a car", "options": []})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "no_options");
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let api = build_api();
    let token = api.register("leaver@example.com").token;

    let (status, _) = send(
        &api,
        request(Method::POST, "/auth/logout", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&api, request(Method::GET, "/decisions", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
