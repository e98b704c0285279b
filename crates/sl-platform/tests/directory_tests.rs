//! Directory Client Tests
//!
//! Exercises the identity-management client against a mock API:
//! - Requests carry the SSWS token and target the documented endpoints
//! - Registration activates the new user
//! - Identity providers are collected across every page
//! - API rejections surface their error summary

use futures::TryStreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use sl_platform::directory::{
    CreateUserRequest, DirectoryError, OktaClient, UserDirectory, UserProfile, REWARDS_NUMBER,
};

/// Matches requests without a query string
struct NoQuery;

impl Match for NoQuery {
    fn matches(&self, request: &Request) -> bool {
        request.url.query().is_none()
    }
}

fn client(server: &MockServer) -> OktaClient {
    OktaClient::with_http_client(&server.uri(), "test-token", reqwest::Client::new()).unwrap()
}

fn user_json(id: &str, rewards_number: Option<&str>) -> serde_json::Value {
    let mut profile = json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.com",
        "login": "ada@example.com",
        "locale": "en_GB"
    });
    if let Some(number) = rewards_number {
        profile[REWARDS_NUMBER] = json!(number);
    }
    json!({
        "id": id,
        "status": "ACTIVE",
        "created": "2024-01-15T10:00:00.000Z",
        "profile": profile
    })
}

fn idp_json(id: &str, kind: &str) -> serde_json::Value {
    json!({ "id": id, "type": kind, "name": kind, "status": "ACTIVE" })
}

#[tokio::test]
async fn test_get_user_sends_api_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/00u1"))
        .and(header("authorization", "SSWS test-token"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("00u1", Some("RN123"))))
        .expect(1)
        .mount(&server)
        .await;

    let user = client(&server).get_user("00u1").await.unwrap();

    assert_eq!(user.id, "00u1");
    assert_eq!(user.profile.login, "ada@example.com");
    assert_eq!(user.profile.rewards_number(), Some("RN123"));
    assert_eq!(user.profile.attribute_str("locale"), Some("en_GB"));
}

#[tokio::test]
async fn test_unknown_user_reports_error_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errorCode": "E0000007",
            "errorSummary": "Not found: Resource not found: missing (User)",
            "errorCauses": []
        })))
        .mount(&server)
        .await;

    let err = client(&server).get_user("missing").await.unwrap_err();

    match &err {
        DirectoryError::Api { status, error_code, .. } => {
            assert_eq!(*status, 404);
            assert_eq!(error_code, "E0000007");
        }
        other => panic!("expected API error, got {:?}", other),
    }
    assert_eq!(
        err.error_summary(),
        Some("Not found: Resource not found: missing (User)")
    );
}

#[tokio::test]
async fn test_gateway_error_without_error_body_has_no_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/00u1"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server).get_user("00u1").await.unwrap_err();

    assert!(matches!(err, DirectoryError::UnexpectedStatus { status: 502 }));
    assert_eq!(err.error_summary(), None);
}

#[tokio::test]
async fn test_create_user_activates_and_sends_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/users"))
        .and(query_param("activate", "true"))
        .and(body_partial_json(json!({
            "profile": {
                "login": "ada@example.com",
                "email": "ada@example.com",
                "rewardsNumber": "RN123"
            },
            "credentials": {
                "password": { "value": "S3cret!pass" },
                "recovery_question": { "question": "ResetKey" }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("00unew", Some("RN123"))))
        .expect(1)
        .mount(&server)
        .await;

    let mut profile = UserProfile::new("Ada", "Lovelace", "ada@example.com", "ada@example.com");
    profile.set_attribute(REWARDS_NUMBER, "RN123");
    let request = CreateUserRequest::with_password(profile, "S3cret!pass");

    let user = client(&server).create_user(request, true).await.unwrap();
    assert_eq!(user.id, "00unew");
}

#[tokio::test]
async fn test_create_user_rejection_lists_causes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/users"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errorCode": "E0000001",
            "errorSummary": "Api validation failed: login",
            "errorCauses": [
                { "errorSummary": "login: An object with this field already exists in the current organization" }
            ]
        })))
        .mount(&server)
        .await;

    let profile = UserProfile::new("Ada", "Lovelace", "ada@example.com", "ada@example.com");
    let request = CreateUserRequest::with_password(profile, "S3cret!pass");
    let err = client(&server).create_user(request, true).await.unwrap_err();

    assert_eq!(err.error_summary(), Some("Api validation failed: login"));
    match err {
        DirectoryError::Api { causes, .. } => assert_eq!(causes.len(), 1),
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_profile_replaces_profile() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/users/00u1"))
        .and(body_partial_json(json!({
            "profile": { "rewardsNumber": "RN999", "locale": "en_GB" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("00u1", Some("RN999"))))
        .expect(1)
        .mount(&server)
        .await;

    let mut profile = UserProfile::new("Ada", "Lovelace", "ada@example.com", "ada@example.com");
    profile.set_attribute("locale", "en_GB");
    profile.set_attribute(REWARDS_NUMBER, "RN999");

    let user = client(&server)
        .update_user_profile("00u1", &profile)
        .await
        .unwrap();
    assert_eq!(user.profile.rewards_number(), Some("RN999"));
}

#[tokio::test]
async fn test_identity_providers_follow_next_links() {
    let server = MockServer::start().await;
    let next = format!("<{}/api/v1/users/00u1/idps?after=0oa2>; rel=\"next\"", server.uri());

    Mock::given(method("GET"))
        .and(path("/api/v1/users/00u1/idps"))
        .and(NoQuery)
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", next.as_str())
                .set_body_json(json!([idp_json("0oa1", "FACEBOOK"), idp_json("0oa2", "GOOGLE")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/00u1/idps"))
        .and(query_param("after", "0oa2"))
        .and(header("authorization", "SSWS test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([idp_json("0oa3", "LINKEDIN")])))
        .expect(1)
        .mount(&server)
        .await;

    let idps = client(&server).list_identity_providers("00u1").await.unwrap();

    let ids: Vec<_> = idps.iter().map(|idp| idp.id.as_str()).collect();
    assert_eq!(ids, vec!["0oa1", "0oa2", "0oa3"]);
    assert!(idps[0].is_kind("facebook"));
}

#[tokio::test]
async fn test_collection_stream_restarts_from_first_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/00u1/idps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([idp_json("0oa1", "GOOGLE")])))
        .expect(2)
        .mount(&server)
        .await;

    let collection = client(&server).identity_providers("00u1");
    let first: Vec<_> = collection.stream().try_collect().await.unwrap();
    let second = collection.collect_all().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[tokio::test]
async fn test_next_link_to_another_host_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/00u1/idps"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", "<https://attacker.example.com/steal>; rel=\"next\"")
                .set_body_json(json!([idp_json("0oa1", "FACEBOOK")])),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .list_identity_providers("00u1")
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::InvalidUrl(_)));
}

#[test]
fn test_org_url_must_be_http() {
    let err = OktaClient::with_http_client("dev-123.okta.com", "t", reqwest::Client::new())
        .unwrap_err();
    assert!(matches!(err, DirectoryError::InvalidUrl(_)));

    let client = OktaClient::with_http_client("https://dev-123.okta.com/", "t", reqwest::Client::new())
        .unwrap();
    assert_eq!(client.base_url(), "https://dev-123.okta.com");
}
