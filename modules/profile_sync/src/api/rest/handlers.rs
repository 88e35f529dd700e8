use axum::{extract::Path, http::StatusCode, response::Json, Extension};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::rest::dto::{
    outcome_str, CourseAccessDto, CourseDto, CourseListingDto, CourseStatsDto, EnrollReq,
    EnrollmentDto, ProfileDto, SessionDto, SignInReq, SignUpReq, SyncProfileReq,
    TeachingOverviewDto,
};
use crate::api::rest::error::map_domain_error;
use crate::api::rest::problem::{bad_request, Problem, ProblemResponse};
use crate::contract::model::{CourseRef, EnrollOutcome, ProfileHints, Role, SignUpRequest};
use crate::domain::service::Service;

type ApiResult<T> = Result<T, ProblemResponse>;

/// Create an account and its profile
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignUpReq,
    responses(
        (status = 201, description = "Account and profile created", body = SessionDto),
        (status = 400, description = "Invalid form", body = Problem),
        (status = 409, description = "Email already registered", body = Problem),
        (status = 503, description = "Backend unavailable", body = Problem),
    )
)]
pub async fn sign_up(
    Extension(svc): Extension<Arc<Service>>,
    Json(req): Json<SignUpReq>,
) -> ApiResult<(StatusCode, Json<SessionDto>)> {
    let req: SignUpRequest = req.into();
    info!("Signing up {}", req.email);

    let (identity, profile) = svc
        .sign_up(&req)
        .await
        .map_err(|e| map_domain_error(&e, "/auth/signup"))?;
    Ok((
        StatusCode::CREATED,
        Json(SessionDto {
            identity: identity.into(),
            profile: profile.into(),
        }),
    ))
}

/// Sign in and load the profile
#[utoipa::path(
    post,
    path = "/auth/signin",
    tag = "auth",
    request_body = SignInReq,
    responses(
        (status = 200, description = "Signed in", body = SessionDto),
        (status = 401, description = "Invalid credentials", body = Problem),
        (status = 404, description = "Profile not visible after retries", body = Problem),
        (status = 503, description = "Backend unavailable", body = Problem),
    )
)]
pub async fn sign_in(
    Extension(svc): Extension<Arc<Service>>,
    Json(req): Json<SignInReq>,
) -> ApiResult<Json<SessionDto>> {
    info!("Signing in {}", req.email);

    let (identity, profile) = svc
        .sign_in(&req.email, &req.password)
        .await
        .map_err(|e| map_domain_error(&e, "/auth/signin"))?;
    Ok(Json(SessionDto {
        identity: identity.into(),
        profile: profile.into(),
    }))
}

/// Reconcile the profile of an identity
#[utoipa::path(
    get,
    path = "/profiles/{identity}",
    tag = "profiles",
    params(("identity" = String, Path, description = "Identity identifier")),
    responses(
        (status = 200, description = "Profile found", body = ProfileDto),
        (status = 404, description = "Not found", body = Problem),
        (status = 503, description = "Store unavailable", body = Problem),
    )
)]
pub async fn get_profile(
    Extension(svc): Extension<Arc<Service>>,
    Path(identity): Path<String>,
) -> ApiResult<Json<ProfileDto>> {
    let profile = svc
        .reconcile(&identity, None)
        .await
        .map_err(|e| map_domain_error(&e, &format!("/profiles/{identity}")))?;
    Ok(Json(profile.into()))
}

/// Create or update the profile of an identity
#[utoipa::path(
    put,
    path = "/profiles/{identity}",
    tag = "profiles",
    params(("identity" = String, Path, description = "Identity identifier")),
    request_body = SyncProfileReq,
    responses(
        (status = 200, description = "Profile synchronized", body = ProfileDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 503, description = "Store unavailable", body = Problem),
    )
)]
pub async fn sync_profile(
    Extension(svc): Extension<Arc<Service>>,
    Path(identity): Path<String>,
    Json(req): Json<SyncProfileReq>,
) -> ApiResult<Json<ProfileDto>> {
    let instance = format!("/profiles/{identity}");
    let role = match req.role.as_deref() {
        Some(raw) => Some(
            raw.parse::<Role>()
                .map_err(|e| bad_request("INVALID_ROLE", e.to_string()))?,
        ),
        None => None,
    };
    info!("Synchronizing profile of {}", identity);

    let hints = ProfileHints {
        email: req.email,
        name: req.name,
        default_role: role,
    };
    let profile = svc
        .sync_profile(&identity, hints)
        .await
        .map_err(|e| map_domain_error(&e, &instance))?;
    Ok(Json(profile.into()))
}

/// Enroll an identity's profile in a course
#[utoipa::path(
    post,
    path = "/profiles/{identity}/enrollments",
    tag = "enrollments",
    params(("identity" = String, Path, description = "Identity identifier")),
    request_body = EnrollReq,
    responses(
        (status = 201, description = "Enrolled", body = EnrollmentDto),
        (status = 200, description = "Already enrolled", body = EnrollmentDto),
        (status = 404, description = "Profile or course not found", body = Problem),
        (status = 409, description = "Duplicate enrollment rejected", body = Problem),
    )
)]
pub async fn enroll(
    Extension(svc): Extension<Arc<Service>>,
    Path(identity): Path<String>,
    Json(req): Json<EnrollReq>,
) -> ApiResult<(StatusCode, Json<EnrollmentDto>)> {
    info!("Enrolling {} in {}", identity, req.course_id);

    let (profile, outcome) = svc
        .enroll_identity(&identity, CourseRef::new(req.course_id))
        .await
        .map_err(|e| map_domain_error(&e, &format!("/profiles/{identity}/enrollments")))?;
    let status = match outcome {
        EnrollOutcome::Enrolled => StatusCode::CREATED,
        EnrollOutcome::AlreadyEnrolled => StatusCode::OK,
    };
    Ok((
        status,
        Json(EnrollmentDto {
            outcome: outcome_str(outcome).to_string(),
            profile: profile.into(),
        }),
    ))
}

/// Enrolled and available courses of an identity
#[utoipa::path(
    get,
    path = "/profiles/{identity}/courses",
    tag = "enrollments",
    params(("identity" = String, Path, description = "Identity identifier")),
    responses(
        (status = 200, description = "Course partition", body = CourseListingDto),
        (status = 404, description = "Profile not found", body = Problem),
    )
)]
pub async fn list_courses(
    Extension(svc): Extension<Arc<Service>>,
    Path(identity): Path<String>,
) -> ApiResult<Json<CourseListingDto>> {
    let listing = svc
        .list_courses(&identity)
        .await
        .map_err(|e| map_domain_error(&e, &format!("/profiles/{identity}/courses")))?;
    Ok(Json(listing.into()))
}

/// Whether the identity may open a course
#[utoipa::path(
    get,
    path = "/profiles/{identity}/courses/{course_id}/access",
    tag = "enrollments",
    params(
        ("identity" = String, Path, description = "Identity identifier"),
        ("course_id" = String, Path, description = "Course document id"),
    ),
    responses(
        (status = 200, description = "Access decision", body = CourseAccessDto),
        (status = 404, description = "Profile not found", body = Problem),
    )
)]
pub async fn course_access(
    Extension(svc): Extension<Arc<Service>>,
    Path((identity, course_id)): Path<(String, String)>,
) -> ApiResult<Json<CourseAccessDto>> {
    let course = CourseRef::new(course_id);
    let has_access = svc
        .has_access(&identity, &course)
        .await
        .map_err(|e| map_domain_error(&e, &format!("/profiles/{identity}/courses/{course}/access")))?;
    if !has_access {
        warn!("{} has no access to {}", identity, course);
    }
    Ok(Json(CourseAccessDto {
        course_id: course.as_str().to_string(),
        has_access,
    }))
}

/// Course statistics for an instructor
#[utoipa::path(
    get,
    path = "/instructors/{identity}/overview",
    tag = "instructors",
    params(("identity" = String, Path, description = "Identity identifier of the instructor")),
    responses(
        (status = 200, description = "Overview", body = TeachingOverviewDto),
        (status = 403, description = "Not an instructor", body = Problem),
    )
)]
pub async fn teaching_overview(
    Extension(svc): Extension<Arc<Service>>,
    Path(identity): Path<String>,
) -> ApiResult<Json<TeachingOverviewDto>> {
    let now = Utc::now();
    let stats = svc
        .teaching_overview(&identity, now)
        .await
        .map_err(|e| map_domain_error(&e, &format!("/instructors/{identity}/overview")))?;
    Ok(Json(TeachingOverviewDto {
        generated_at: now,
        courses: stats.into_iter().map(CourseStatsDto::from).collect(),
    }))
}

/// Full course catalog
#[utoipa::path(
    get,
    path = "/courses",
    tag = "courses",
    responses(
        (status = 200, description = "Catalog", body = [CourseDto]),
        (status = 503, description = "Store unavailable", body = Problem),
    )
)]
pub async fn list_catalog(Extension(svc): Extension<Arc<Service>>) -> ApiResult<Json<Vec<CourseDto>>> {
    let courses = svc
        .catalog()
        .await
        .map_err(|e| map_domain_error(&e, "/courses"))?;
    Ok(Json(courses.into_iter().map(CourseDto::from).collect()))
}
