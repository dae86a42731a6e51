//! End-to-end coverage of the HTTP adapter: authentication, payload
//! validation, and the error-code to status-code mapping.

mod support;

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{App, test, web};
use mockable::Clock;
use serde_json::{Value, json};

use backend::domain::user::Role;
use backend::domain::{
    IssueLifecycleService, ModerationService, NearbySearchService, Principal,
    StatusRequestService, UserRegistryService,
};
use backend::inbound::http;
use backend::inbound::http::state::HttpState;
use backend::test_support::{InMemoryStore, MutableClock, StaticTokenVerifier};

use support::{context, register, TestContext};

const CITIZEN_TOKEN: &str = "citizen-token";
const ADMIN_TOKEN: &str = "admin-token";

fn http_state(ctx: &TestContext, citizen: Principal, admin: Principal) -> HttpState {
    let store: InMemoryStore = ctx.store.clone();
    let clock: Arc<dyn Clock> = Arc::new(MutableClock::new(ctx.clock.utc()));
    let issues = Arc::new(store.clone());
    let verifier = StaticTokenVerifier::new()
        .with_token(CITIZEN_TOKEN, citizen)
        .with_token(ADMIN_TOKEN, admin);

    HttpState::new(
        Arc::new(IssueLifecycleService::new(issues.clone(), clock.clone())),
        Arc::new(ModerationService::new(
            Arc::new(store.clone()),
            issues.clone(),
            clock.clone(),
        )),
        Arc::new(StatusRequestService::new(
            Arc::new(store.clone()),
            issues.clone(),
            clock.clone(),
        )),
        Arc::new(NearbySearchService::new(issues)),
        Arc::new(UserRegistryService::new(Arc::new(store), clock)),
        Arc::new(verifier),
    )
}

fn issue_payload() -> Value {
    json!({
        "title": "Pothole on Main St",
        "description": "Large pothole near the crossing",
        "category": "road",
        "latitude": 40.7128,
        "longitude": -74.0060,
    })
}

#[actix_rt::test]
async fn requests_without_a_token_are_unauthorized() {
    let ctx = context();
    let (_, citizen) = register(&ctx, "citizen", Role::User).await;
    let (_, admin) = register(&ctx, "moderator", Role::Admin).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(http_state(&ctx, citizen, admin)))
            .configure(http::configure),
    )
    .await;

    let request = test::TestRequest::post()
        .uri("/api/v1/issues")
        .set_json(issue_payload())
        .to_request();
    let response = test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["code"], "unauthorized");
}

#[actix_rt::test]
async fn issues_round_trip_through_the_api() {
    let ctx = context();
    let (_, citizen) = register(&ctx, "citizen", Role::User).await;
    let (_, admin) = register(&ctx, "moderator", Role::Admin).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(http_state(&ctx, citizen, admin)))
            .configure(http::configure),
    )
    .await;

    let request = test::TestRequest::post()
        .uri("/api/v1/issues")
        .insert_header((AUTHORIZATION, format!("Bearer {CITIZEN_TOKEN}")))
        .set_json(issue_payload())
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(response).await;
    assert_eq!(created["status"], "reported");
    assert_eq!(created["logs"].as_array().map(Vec::len), Some(1));
    let issue_id = created["id"].as_str().expect("issue id").to_owned();

    let request = test::TestRequest::get()
        .uri(&format!("/api/v1/issues/{issue_id}"))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let request = test::TestRequest::put()
        .uri(&format!("/api/v1/issues/{issue_id}"))
        .insert_header((AUTHORIZATION, format!("Bearer {CITIZEN_TOKEN}")))
        .set_json(json!({ "status": "in_progress", "comment": "Crew dispatched" }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(response).await;
    assert_eq!(updated["status"], "in_progress");
    assert_eq!(updated["logs"].as_array().map(Vec::len), Some(2));
}

#[actix_rt::test]
async fn nearby_rejects_bad_parameters_and_finds_close_issues() {
    let ctx = context();
    let (_, citizen) = register(&ctx, "citizen", Role::User).await;
    let (_, admin) = register(&ctx, "moderator", Role::Admin).await;
    support::report_issue(&ctx, citizen, "Pothole in NYC", 40.7128, -74.0060).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(http_state(&ctx, citizen, admin)))
            .configure(http::configure),
    )
    .await;

    let request = test::TestRequest::get()
        .uri("/api/v1/issues/nearby?latitude=40.7128&longitude=-74.0060&radius=5")
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let request = test::TestRequest::get()
        .uri("/api/v1/issues/nearby?latitude=95&longitude=0&radius=5")
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = test::TestRequest::get()
        .uri("/api/v1/issues/nearby?latitude=40.7128&longitude=-74.0060")
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn moderation_errors_map_to_conflict_forbidden_and_not_found() {
    let ctx = context();
    let (_, citizen) = register(&ctx, "citizen", Role::User).await;
    let (_, admin) = register(&ctx, "moderator", Role::Admin).await;
    let reporter_detail =
        support::report_issue(&ctx, admin, "Pothole on Main St", 40.7128, -74.0060).await;
    let issue_id = reporter_detail.issue.id;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(http_state(&ctx, citizen, admin)))
            .configure(http::configure),
    )
    .await;

    // Duplicate flag: 201 then 409.
    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let request = test::TestRequest::post()
            .uri(&format!("/api/v1/issues/{issue_id}/flags"))
            .insert_header((AUTHORIZATION, format!("Bearer {CITIZEN_TOKEN}")))
            .set_json(json!({ "reason": "spam" }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), expected);
    }

    // Deleting someone else's issue: 403.
    let request = test::TestRequest::delete()
        .uri(&format!("/api/v1/issues/{issue_id}"))
        .insert_header((AUTHORIZATION, format!("Bearer {CITIZEN_TOKEN}")))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Unknown issue: 404.
    let request = test::TestRequest::get()
        .uri(&format!("/api/v1/issues/{}", uuid::Uuid::new_v4()))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Listing the moderation queue as a citizen: 403.
    let request = test::TestRequest::get()
        .uri("/api/v1/status-requests")
        .insert_header((AUTHORIZATION, format!("Bearer {CITIZEN_TOKEN}")))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn registration_conflicts_on_duplicate_username() {
    let ctx = context();
    let (_, citizen) = register(&ctx, "citizen", Role::User).await;
    let (_, admin) = register(&ctx, "moderator", Role::Admin).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(http_state(&ctx, citizen, admin)))
            .configure(http::configure),
    )
    .await;

    let payload = json!({
        "username": "new_citizen",
        "email": "new@example.com",
        "passwordHash": "argon2id$derived",
    });
    let request = test::TestRequest::post()
        .uri("/api/v1/users")
        .set_json(payload.clone())
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(response).await;
    assert!(body.get("passwordHash").is_none());

    let request = test::TestRequest::post()
        .uri("/api/v1/users")
        .set_json(payload)
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
