//! Integration tests for envelope normalization, caching, retry, session
//! expiry, cancellation and batches

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

mod common;

use common::{TEST_TOKEN, TestHarness, fixtures};
use naturalize_client::policy::{
    NETWORK_ERROR_NOTICE, NOT_FOUND_MESSAGE, SERVER_ERROR_MESSAGE, SESSION_EXPIRED_MESSAGE,
};
use naturalize_client::{
    ApiService, BatchRequest, CredentialProvider, FileCredentials, RecordingNotifier,
    RequestOptions,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_plans_example_returns_payload_verbatim() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/subscription_plans/")))
        .and(query_param("skip", "0"))
        .and(query_param("limit", "10"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::plans()))
        .expect(1)
        .mount(&harness.server)
        .await;

    let envelope = harness
        .api
        .get(
            "/subscription_plans/",
            RequestOptions::new().param("skip", 0).param("limit", 10),
        )
        .await;

    assert!(envelope.success);
    assert_eq!(envelope.data, Some(fixtures::plans()));
    assert_eq!(envelope.message, "Success");
    assert_eq!(envelope.status(), Some(200));
}

#[tokio::test]
async fn test_server_envelope_is_passed_through() {
    let harness = TestHarness::start().await;
    let body = fixtures::own_envelope(json!({"id": "u-1"}), "Profile fetched");
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/users/info/me")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&harness.server)
        .await;

    let envelope = harness.api.profile().await;

    assert!(envelope.success);
    assert_eq!(envelope.data, Some(json!({"id": "u-1"})));
    assert_eq!(envelope.message, "Profile fetched");
    assert!(harness.notices.notices().is_empty());
}

#[tokio::test]
async fn test_missing_token_sends_no_authorization() {
    let harness = TestHarness::start().await;
    harness.credentials.clear().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/user/all")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::users()))
        .mount(&harness.server)
        .await;

    let envelope = harness.api.get("/dashboard/user/all", RequestOptions::new()).await;
    assert!(envelope.success);

    let requests = harness.server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_not_found_becomes_failure_envelope() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/users/404")))
        .respond_with(ResponseTemplate::new(404).set_body_json(fixtures::message_body("User missing")))
        .mount(&harness.server)
        .await;

    let envelope = harness.api.get("/users/404", RequestOptions::new()).await;

    assert!(!envelope.success);
    assert!(envelope.data.is_none());
    assert_eq!(envelope.message, "User missing");
    assert_eq!(harness.errors(), vec![NOT_FOUND_MESSAGE]);
}

#[tokio::test]
async fn test_validation_errors_are_listed() {
    let harness = TestHarness::start().await;
    Mock::given(method("POST"))
        .and(path(TestHarness::path("/questions/")))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Invalid question",
            "errors": {"options": ["At least two options"]}
        })))
        .mount(&harness.server)
        .await;

    let envelope = harness
        .api
        .post("/questions/", Some(json!({})), RequestOptions::new())
        .await;

    assert!(!envelope.success);
    assert_eq!(envelope.message, "Invalid question");
    assert_eq!(harness.errors(), vec!["At least two options"]);
}

#[tokio::test]
async fn test_network_failure_envelope() {
    let api = ApiService::builder("http://127.0.0.1:9/api/v1")
        .notifier(RecordingNotifier::new())
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let envelope = api.get("/users/info/me", RequestOptions::new()).await;

    assert!(!envelope.success);
    assert!(envelope.meta.network_error);
    assert!(envelope.status().is_none());
    assert!(!envelope.message.is_empty());
}

#[tokio::test]
async fn test_network_failure_raises_notice() {
    let notices = Arc::new(RecordingNotifier::new());
    let api = ApiService::builder("http://127.0.0.1:9/api/v1")
        .shared_notifier(notices.clone())
        .build()
        .unwrap();

    api.get("/users/info/me", RequestOptions::new()).await;

    assert_eq!(
        notices.messages(naturalize_client::NoticeLevel::Error),
        vec![NETWORK_ERROR_NOTICE]
    );
}

#[tokio::test]
async fn test_cached_get_is_served_without_second_call() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/subscription_plans/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::plans()))
        .expect(1)
        .mount(&harness.server)
        .await;

    let options = RequestOptions::new().param("skip", 0).param("limit", 10).cached();
    let first = harness.api.get("/subscription_plans/", options.clone()).await;
    let second = harness.api.get("/subscription_plans/", options).await;

    assert_eq!(first, second);
    assert_eq!(first.timestamp, second.timestamp);
    assert_eq!(harness.api.cached_entries(), 1);
}

#[tokio::test]
async fn test_different_params_are_cached_separately() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/subscription_plans/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::plans()))
        .expect(2)
        .mount(&harness.server)
        .await;

    harness.api.list_plans(0, 10).await;
    harness.api.list_plans(10, 10).await;
    harness.api.list_plans(0, 10).await;

    assert_eq!(harness.api.cached_entries(), 2);
}

#[tokio::test]
async fn test_cache_entry_expires() {
    let harness = TestHarness::start_with(|b| b.cache_ttl(Duration::from_millis(50))).await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/all-courses-stats")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&harness.server)
        .await;

    let options = RequestOptions::new().cached();
    harness.api.get("/dashboard/all-courses-stats", options.clone()).await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    harness.api.get("/dashboard/all-courses-stats", options).await;
}

#[tokio::test]
async fn test_failed_get_is_not_cached() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/subscription_plans/")))
        .respond_with(ResponseTemplate::new(400).set_body_json(fixtures::message_body("Bad paging")))
        .expect(2)
        .mount(&harness.server)
        .await;

    let options = RequestOptions::new().cached();
    harness.api.get("/subscription_plans/", options.clone()).await;
    harness.api.get("/subscription_plans/", options).await;

    assert_eq!(harness.api.cached_entries(), 0);
}

#[tokio::test]
async fn test_successful_mutation_clears_cache() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/subscription_plans/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::plans()))
        .expect(2)
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestHarness::path("/subscription_plans/")))
        .respond_with(ResponseTemplate::new(201).set_body_json(fixtures::message_body("Plan created")))
        .expect(1)
        .mount(&harness.server)
        .await;

    let cached = RequestOptions::new().cached();
    harness.api.get("/subscription_plans/", cached.clone()).await;
    assert_eq!(harness.api.cached_entries(), 1);

    let created = harness
        .api
        .post("/subscription_plans/", Some(json!({"title": "Pro"})), RequestOptions::new())
        .await;
    assert!(created.success);
    assert_eq!(harness.api.cached_entries(), 0);
    assert_eq!(harness.successes(), vec!["Plan created"]);

    harness.api.get("/subscription_plans/", cached).await;
}

#[tokio::test]
async fn test_keep_cache_and_failed_mutation_leave_cache_alone() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/subscription_plans/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::plans()))
        .expect(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(TestHarness::path("/subscription_plans/1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::message_body("Updated")))
        .mount(&harness.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(TestHarness::path("/subscription_plans/1")))
        .respond_with(ResponseTemplate::new(400).set_body_json(fixtures::message_body("Plan in use")))
        .mount(&harness.server)
        .await;

    let cached = RequestOptions::new().cached();
    harness.api.get("/subscription_plans/", cached.clone()).await;

    harness
        .api
        .patch("/subscription_plans/1", Some(json!({})), RequestOptions::new().keep_cache().quiet())
        .await;
    assert_eq!(harness.api.cached_entries(), 1);

    let deleted = harness.api.delete("/subscription_plans/1", RequestOptions::new()).await;
    assert!(!deleted.success);
    assert_eq!(harness.api.cached_entries(), 1);
    assert_eq!(harness.errors(), vec!["Plan in use"]);
    assert!(harness.successes().is_empty());

    harness.api.get("/subscription_plans/", cached).await;
}

#[tokio::test]
async fn test_loose_failure_envelope_on_200_is_not_a_success() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/subscription_plans/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::plans()))
        .expect(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestHarness::path("/subscription_plans/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": null,
            "errors": {"price": ["Price must be positive"]},
        })))
        .expect(1)
        .mount(&harness.server)
        .await;

    let cached = RequestOptions::new().cached();
    harness.api.get("/subscription_plans/", cached.clone()).await;

    let created = harness
        .api
        .post("/subscription_plans/", Some(json!({"price": -1})), RequestOptions::new())
        .await;

    assert!(!created.success);
    assert_eq!(created.errors, Some(json!({"price": ["Price must be positive"]})));
    assert!(harness.successes().is_empty());
    assert_eq!(harness.api.cached_entries(), 1);

    harness.api.get("/subscription_plans/", cached).await;
}

#[tokio::test]
async fn test_delete_without_message_uses_fallback_notice() {
    let harness = TestHarness::start().await;
    Mock::given(method("DELETE"))
        .and(path(TestHarness::path("/questions/7")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": ""})))
        .mount(&harness.server)
        .await;

    let envelope = harness.api.delete("/questions/7", RequestOptions::new()).await;

    assert!(envelope.success);
    assert_eq!(harness.successes(), vec!["Successfully deleted."]);
}

#[tokio::test]
async fn test_delete_sends_body_from_options() {
    let harness = TestHarness::start().await;
    Mock::given(method("DELETE"))
        .and(path(TestHarness::path("/users/u-2")))
        .and(wiremock::matchers::body_json(json!({"reason": "spam"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&harness.server)
        .await;

    let envelope = harness
        .api
        .delete("/users/u-2", RequestOptions::new().with_body(json!({"reason": "spam"})))
        .await;

    assert!(envelope.success);
    assert!(envelope.data.is_none());
}

#[tokio::test]
async fn test_retry_succeeds_on_third_attempt() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/analytics/user-growth")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/analytics/user-growth")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&harness.server)
        .await;

    let envelope = harness
        .api
        .request_with_retry(
            "get",
            "/dashboard/analytics/user-growth",
            None,
            RequestOptions::new().retry(2, Duration::from_millis(10)),
        )
        .await
        .unwrap();

    assert!(envelope.success);
    assert_eq!(harness.request_count().await, 3);
    assert!(harness.errors().is_empty());
}

#[tokio::test]
async fn test_retry_exhausts_into_single_failure() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/all-courses-stats")))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&harness.server)
        .await;

    let envelope = harness
        .api
        .request_with_retry(
            "GET",
            "/dashboard/all-courses-stats",
            None,
            RequestOptions::new().retry(2, Duration::from_millis(5)),
        )
        .await
        .unwrap();

    assert!(!envelope.success);
    assert_eq!(envelope.status(), Some(500));
    assert_eq!(harness.errors(), vec![SERVER_ERROR_MESSAGE]);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let harness = TestHarness::start().await;
    Mock::given(method("POST"))
        .and(path(TestHarness::path("/subscription_plans/")))
        .respond_with(ResponseTemplate::new(400).set_body_json(fixtures::message_body("Duplicate title")))
        .expect(1)
        .mount(&harness.server)
        .await;

    let envelope = harness
        .api
        .request_with_retry(
            "post",
            "/subscription_plans/",
            Some(json!({"title": "Basic"})),
            RequestOptions::new().retry(3, Duration::from_millis(5)),
        )
        .await
        .unwrap();

    assert!(!envelope.success);
    assert_eq!(envelope.message, "Duplicate title");
}

#[tokio::test]
async fn test_unauthorized_clears_credentials_and_redirects_once() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/users/info/me")))
        .respond_with(ResponseTemplate::new(401).set_body_json(fixtures::message_body("Token expired")))
        .mount(&harness.server)
        .await;

    let envelope = harness.api.get("/users/info/me", RequestOptions::new()).await;

    assert!(!envelope.success);
    assert!(!harness.credentials.has_token());
    assert_eq!(harness.session.count(), 1);
    assert_eq!(harness.errors(), vec![SESSION_EXPIRED_MESSAGE]);
}

#[tokio::test]
async fn test_logout_forgets_token_and_cache() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/user/all")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::users()))
        .expect(2)
        .mount(&harness.server)
        .await;

    let cached = RequestOptions::new().cached();
    harness.api.get("/dashboard/user/all", cached.clone()).await;
    assert_eq!(harness.api.cached_entries(), 1);

    harness.api.logout().await;
    assert!(!harness.credentials.has_token());
    assert_eq!(harness.api.cached_entries(), 0);
    assert_eq!(harness.session.count(), 0);

    harness.api.get("/dashboard/user/all", cached).await;
    let requests = harness.server.received_requests().await.unwrap();
    assert!(!requests[1].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_logout_removes_credential_files() {
    let dir = tempfile::tempdir().unwrap();
    let files = FileCredentials::new(dir.path().join("token"), dir.path().join("user.json"));
    files.store("tok-1", Some(&json!({"id": "u-1"}))).await.unwrap();

    let api = ApiService::builder("http://localhost:9/api/v1")
        .credentials(files.clone())
        .notifier(RecordingNotifier::new())
        .build()
        .unwrap();
    api.logout().await;

    assert!(!files.token_file().exists());
    assert!(!files.user_file().exists());
    assert!(files.token().await.is_none());
}

#[tokio::test]
async fn test_background_unauthorized_skips_redirect() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/statistics/subscription-distribution")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&harness.server)
        .await;

    let envelope = harness.api.subscription_distribution().await;

    assert!(!envelope.success);
    assert!(!harness.credentials.has_token());
    assert_eq!(harness.session.count(), 0);
}

#[tokio::test]
async fn test_cancelled_request_leaves_no_trace() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/user/all")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixtures::users())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&harness.server)
        .await;

    let token = harness.api.cancel_token("users-table");
    let api = harness.api.clone();
    let pending = tokio::spawn(async move {
        api.get(
            "/dashboard/user/all",
            RequestOptions::new().cached().cancel_with(token),
        )
        .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(harness.api.cancel_request("users-table"));

    let envelope = pending.await.unwrap();
    assert!(envelope.is_cancelled());
    assert!(!envelope.success);
    assert!(envelope.data.is_none());
    assert_eq!(harness.api.cached_entries(), 0);
    assert!(harness.notices.notices().is_empty());
}

#[tokio::test]
async fn test_cancel_all_requests() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&harness.server)
        .await;

    let first = harness.api.cancel_token("growth");
    let second = harness.api.cancel_token("stats");
    let api = harness.api.clone();
    let pending = tokio::spawn(async move {
        futures::join!(
            api.get("/dashboard/analytics/user-growth", RequestOptions::new().cancel_with(first)),
            api.get("/dashboard/all-courses-stats", RequestOptions::new().cancel_with(second)),
        )
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.api.cancel_all_requests(), 2);

    let (a, b) = pending.await.unwrap();
    assert!(a.is_cancelled());
    assert!(b.is_cancelled());
}

#[tokio::test]
async fn test_finished_request_releases_its_name() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/user/all")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::users()))
        .mount(&harness.server)
        .await;

    let token = harness.api.cancel_token("users-table");
    let envelope = harness
        .api
        .get("/dashboard/user/all", RequestOptions::new().cancel_with(token.clone()))
        .await;

    assert!(envelope.success);
    assert!(!token.is_cancelled());
    assert!(!harness.api.cancel_request("users-table"));
}

#[tokio::test]
async fn test_finished_request_keeps_newer_registration() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&harness.server)
        .await;

    let stale = harness.api.cancel_token("search");
    let current = harness.api.cancel_token("search");
    let envelope = harness
        .api
        .get("/dashboard/user/all", RequestOptions::new().cancel_with(stale).quiet())
        .await;
    assert!(envelope.is_cancelled());

    assert!(harness.api.cancel_request("search"));
    assert!(current.is_cancelled());
}

#[tokio::test]
async fn test_finished_retry_releases_its_name() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/all-courses-stats")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&harness.server)
        .await;

    let token = harness.api.cancel_token("stats");
    let envelope = harness
        .api
        .request_with_retry(
            "get",
            "/dashboard/all-courses-stats",
            None,
            RequestOptions::new()
                .retry(1, Duration::from_millis(5))
                .cancel_with(token),
        )
        .await
        .unwrap();

    assert!(!envelope.success);
    assert!(!harness.api.cancel_request("stats"));
}

#[tokio::test]
async fn test_cancel_during_retry_backoff() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/all-courses-stats")))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&harness.server)
        .await;

    let token = harness.api.cancel_token("stats");
    let api = harness.api.clone();
    let pending = tokio::spawn(async move {
        api.request_with_retry(
            "get",
            "/dashboard/all-courses-stats",
            None,
            RequestOptions::new()
                .retry(3, Duration::from_secs(5))
                .cancel_with(token),
        )
        .await
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    harness.api.cancel_request("stats");

    let envelope = pending.await.unwrap().unwrap();
    assert!(envelope.is_cancelled());
    assert!(harness.errors().is_empty());
}

#[tokio::test]
async fn test_batch_success_requires_every_slot() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/analytics/user-growth")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/dashboard/all-courses-stats")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(path(TestHarness::path("/paymentss/payments/total-last-30days")))
        .respond_with(ResponseTemplate::new(502))
        .mount(&harness.server)
        .await;

    let all_good = harness
        .api
        .batch(vec![
            BatchRequest::get("/dashboard/analytics/user-growth"),
            BatchRequest::get("/dashboard/all-courses-stats"),
        ])
        .await;
    assert!(all_good.success);
    assert_eq!(all_good.results.len(), 2);

    let mixed = harness
        .api
        .batch(vec![
            BatchRequest::get("/dashboard/analytics/user-growth"),
            BatchRequest::get("/paymentss/payments/total-last-30days"),
        ])
        .await;
    assert!(!mixed.success);
    assert!(mixed.results[0].success);
    assert!(!mixed.results[1].success);
    assert_eq!(mixed.failures(), 1);
}
