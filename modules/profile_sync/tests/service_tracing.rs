mod common;

use profile_sync::contract::model::{CourseRef, SignUpRequest};
use std::time::Duration;
use tracing_test::traced_test;

use common::*;

fn form() -> SignUpRequest {
    SignUpRequest {
        name: "Ann".into(),
        email: "ann@example.com".into(),
        password: "secret1".into(),
        confirm_password: "secret1".into(),
    }
}

#[traced_test]
#[tokio::test]
async fn sign_up_logs_account_and_profile_creation() {
    // Arrange
    let svc = service(seeded_store(Duration::ZERO));

    // Act
    let result = svc.sign_up(&form()).await;

    // Assert
    assert!(result.is_ok());
    assert!(logs_contain("account created"));
    assert!(logs_contain("creating profile"));
}

#[traced_test]
#[tokio::test]
async fn exhausted_retries_are_logged() {
    // Arrange
    let svc = service(seeded_store(Duration::ZERO));

    // Act
    let result = svc.reconcile("ghost", None).await;

    // Assert
    assert!(result.is_err());
    assert!(logs_contain("profile not visible yet"));
    assert!(logs_contain("profile not found after retries"));
}

#[traced_test]
#[tokio::test]
async fn enrollment_emits_spans() {
    // Arrange
    let svc = service(seeded_store(Duration::ZERO));
    let (identity, _) = svc.sign_up(&form()).await.unwrap();

    // Act
    let first = svc
        .enroll_identity(&identity.identifier, CourseRef::new("c1"))
        .await;
    let second = svc
        .enroll_identity(&identity.identifier, CourseRef::new("c1"))
        .await;

    // Assert
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert!(logs_contain("enrolled"));
    assert!(logs_contain("already enrolled"));
    assert!(logs_contain("profile_sync.service.enroll_identity"));
}
