mod common;

use std::sync::Arc;
use std::time::Duration;

use profile_sync::contract::client::ProfileSyncApi;
use profile_sync::contract::error::ProfileSyncError;
use profile_sync::contract::model::{CourseRef, EnrollOutcome, ProfileHints, Role};
use profile_sync::gateways::local::ProfileSyncLocalClient;

use common::*;

fn client() -> Arc<dyn ProfileSyncApi> {
    Arc::new(ProfileSyncLocalClient::new(service(seeded_store(Duration::ZERO))))
}

fn hints() -> ProfileHints {
    ProfileHints {
        email: Some("a@x.com".into()),
        name: Some("Ann".into()),
        default_role: None,
    }
}

#[tokio::test]
async fn reconcile_enroll_and_list_through_the_client() {
    let client = client();

    let profile = client.reconcile("U1", Some(hints())).await.unwrap();
    assert_eq!(profile.role, Role::Student);

    let (enrolled, outcome) = client
        .enroll(&profile.record_id, CourseRef::new("c42"))
        .await
        .unwrap();
    assert_eq!(outcome, EnrollOutcome::Enrolled);
    assert_eq!(enrolled.enrolled_course_refs, vec![CourseRef::new("c42")]);

    let listing = client.list_courses("U1").await.unwrap();
    assert_eq!(ids(&listing.enrolled), vec!["c42"]);
    assert_eq!(ids(&listing.available), vec!["c1", "c2"]);
    assert!(client.has_access("U1", &CourseRef::new("c42")).await.unwrap());
}

#[tokio::test]
async fn domain_errors_arrive_as_contract_errors() {
    let client = client();

    let err = client.reconcile("nobody", None).await.unwrap_err();
    assert!(matches!(err, ProfileSyncError::NotFound { .. }));

    let profile = client.reconcile("U1", Some(hints())).await.unwrap();
    let err = client
        .enroll(&profile.record_id, CourseRef::new("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProfileSyncError::NotFound { message } if message.contains("missing")));

    let err = client
        .teaching_overview("U1", chrono::Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, ProfileSyncError::Forbidden { .. }));
}

#[tokio::test]
async fn sync_promotes_role_when_hinted() {
    let client = client();
    client.reconcile("U1", Some(hints())).await.unwrap();

    let updated = client
        .sync_profile(
            "U1",
            ProfileHints {
                default_role: Some(Role::Teacher),
                ..hints()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.role, Role::Teacher);
    assert_eq!(client.catalog().await.unwrap().len(), 3);
}
