use chrono::{TimeZone, Utc};
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;
use url::Url;

use profile_sync::config::SanityStoreConfig;
use profile_sync::contract::model::{CourseRef, NewProfile, Role};
use profile_sync::domain::repo::{CoursesRepository, ProfilePatch, ProfilesRepository};
use profile_sync::infra::sanity::{SanityClient, SanityStore};

const QUERY_PATH: &str = "/v2024-01-01/data/query/production";
const MUTATE_PATH: &str = "/v2024-01-01/data/mutate/production";

fn store(server: &MockServer, token: Option<&str>) -> SanityStore {
    let cfg = SanityStoreConfig {
        project_id: "proj".into(),
        dataset: "production".into(),
        api_version: "2024-01-01".into(),
        token: token.map(str::to_string),
        api_host: Some(Url::parse(&server.base_url()).unwrap()),
        timeout: Duration::from_secs(5),
    };
    SanityStore::new(SanityClient::new(&cfg).unwrap())
}

fn profile_doc(uid: &str, courses: &[&str]) -> serde_json::Value {
    let refs: Vec<_> = courses
        .iter()
        .map(|c| json!({ "_type": "reference", "_ref": c, "_key": format!("k-{c}") }))
        .collect();
    json!({
        "_id": format!("userProfile-{uid}"),
        "_type": "userProfile",
        "_updatedAt": "2024-05-01T10:00:00Z",
        "firebaseUID": uid,
        "name": "Ann",
        "email": "ann@example.com",
        "role": "teacher",
        "enrolledCourses": refs,
    })
}

fn course_doc(id: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "_type": "course",
        "title": format!("Course {id}"),
        "slug": { "current": id },
        "courseImage": { "asset": { "_ref": format!("image-{id}") } },
        "instructors": [{ "_ref": "ins-1" }],
    })
}

#[tokio::test]
async fn finds_profile_by_identity_with_bearer_token() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(QUERY_PATH)
                .query_param("$uid", "\"u1\"")
                .header("authorization", "Bearer tok");
            then.status(200)
                .json_body(json!({ "result": profile_doc("u1", &["c1", "c2"]) }));
        })
        .await;

    let profile = store(&server, Some("tok"))
        .find_by_identity("u1")
        .await
        .unwrap()
        .unwrap();

    mock.assert_async().await;
    assert_eq!(profile.record_id, "userProfile-u1");
    assert_eq!(profile.role, Role::Teacher);
    assert_eq!(
        profile.enrolled_course_refs,
        vec![CourseRef::new("c1"), CourseRef::new("c2")]
    );
    assert_eq!(
        profile.updated_at,
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn missing_profile_is_none() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(QUERY_PATH).query_param_exists("$uid");
            then.status(200).json_body(json!({ "result": null }));
        })
        .await;

    assert!(store(&server, None).find_by_identity("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn create_uses_create_if_not_exists_with_deterministic_id() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(MUTATE_PATH)
                .query_param("returnDocuments", "true")
                .body_includes("createIfNotExists")
                .body_includes("\"_id\":\"userProfile-u1\"");
            then.status(200).json_body(json!({
                "transactionId": "tx1",
                "results": [{ "id": "userProfile-u1", "operation": "create", "document": profile_doc("u1", &[]) }],
            }));
        })
        .await;

    let profile = store(&server, None)
        .create(NewProfile {
            identity_ref: "u1".into(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            role: Role::Student,
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(profile.identity_ref, "u1");
    assert!(profile.enrolled_course_refs.is_empty());
}

#[tokio::test]
async fn create_of_existing_document_reads_it_back() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(MUTATE_PATH);
            then.status(200)
                .json_body(json!({ "transactionId": "tx1", "results": [] }));
        })
        .await;
    let read = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(QUERY_PATH)
                .query_param("$id", "\"userProfile-u1\"");
            then.status(200)
                .json_body(json!({ "result": profile_doc("u1", &["c1"]) }));
        })
        .await;

    let profile = store(&server, None)
        .create(NewProfile {
            identity_ref: "u1".into(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            role: Role::Student,
        })
        .await
        .unwrap();

    read.assert_async().await;
    assert_eq!(profile.enrolled_course_refs, vec![CourseRef::new("c1")]);
}

#[tokio::test]
async fn patch_appends_after_last_enrollment() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(QUERY_PATH).query_param_exists("$id");
            then.status(200)
                .json_body(json!({ "result": profile_doc("u1", &["c1"]) }));
        })
        .await;
    let mutate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(MUTATE_PATH)
                .body_includes("enrolledCourses[-1]")
                .body_includes("\"_ref\":\"c2\"")
                .body_includes("setIfMissing");
            then.status(200).json_body(json!({
                "transactionId": "tx2",
                "results": [{ "id": "userProfile-u1", "operation": "update", "document": profile_doc("u1", &["c1", "c2"]) }],
            }));
        })
        .await;

    let patch = ProfilePatch::append_course(CourseRef::new("c2"));
    let profile = store(&server, None)
        .patch("userProfile-u1", patch)
        .await
        .unwrap()
        .unwrap();

    mutate.assert_async().await;
    assert_eq!(
        profile.enrolled_course_refs,
        vec![CourseRef::new("c1"), CourseRef::new("c2")]
    );
}

#[tokio::test]
async fn patch_of_missing_record_sends_no_mutation() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(QUERY_PATH);
            then.status(200).json_body(json!({ "result": null }));
        })
        .await;
    let mutate = server
        .mock_async(|when, then| {
            when.method(POST).path(MUTATE_PATH);
            then.status(200)
                .json_body(json!({ "transactionId": "tx", "results": [] }));
        })
        .await;

    let patch = ProfilePatch::append_course(CourseRef::new("c1"));
    let result = store(&server, None).patch("userProfile-gone", patch).await.unwrap();

    assert!(result.is_none());
    assert_eq!(mutate.hits_async().await, 0);
}

#[tokio::test]
async fn counts_recent_enrollments_with_since_parameter() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(QUERY_PATH)
                .query_param("$courseId", "\"c1\"")
                .query_param("$since", "\"2024-04-01T00:00:00.000Z\"");
            then.status(200).json_body(json!({ "result": 4 }));
        })
        .await;

    let since = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
    let count = store(&server, None)
        .count_enrolled(&CourseRef::new("c1"), Some(since))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(count, 4);
}

#[tokio::test]
async fn find_many_answers_in_requested_order_and_skips_unknown() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(QUERY_PATH).query_param_exists("$ids");
            then.status(200)
                .json_body(json!({ "result": [course_doc("c1"), course_doc("c42")] }));
        })
        .await;

    let wanted = [
        CourseRef::new("c42"),
        CourseRef::new("gone"),
        CourseRef::new("c1"),
    ];
    let courses = store(&server, None).find_many(&wanted).await.unwrap();

    let ids: Vec<_> = courses.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c42", "c1"]);
    assert_eq!(courses[0].image_ref.as_deref(), Some("image-c42"));
    assert_eq!(courses[0].instructor_refs, vec!["ins-1".to_string()]);
}

#[tokio::test]
async fn non_success_status_is_an_error_with_context() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(QUERY_PATH);
            then.status(500).body("backend exploded");
        })
        .await;

    let err = store(&server, None).list_all().await.unwrap_err();

    let msg = format!("{err:#}");
    assert!(msg.contains("500"), "{msg}");
    assert!(msg.contains("backend exploded"), "{msg}");
}
