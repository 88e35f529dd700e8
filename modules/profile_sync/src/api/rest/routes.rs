use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::api::rest::{dto, handlers, problem};
use crate::domain::service::Service;

#[derive(OpenApi)]
#[openapi(
    info(title = "CourseHub profile sync API"),
    paths(
        handlers::sign_up,
        handlers::sign_in,
        handlers::get_profile,
        handlers::sync_profile,
        handlers::enroll,
        handlers::list_courses,
        handlers::course_access,
        handlers::teaching_overview,
        handlers::list_catalog,
    ),
    components(schemas(
        dto::ProfileDto,
        dto::IdentityDto,
        dto::SignUpReq,
        dto::SignInReq,
        dto::SessionDto,
        dto::SyncProfileReq,
        dto::EnrollReq,
        dto::EnrollmentDto,
        dto::CourseDto,
        dto::CourseListingDto,
        dto::CourseAccessDto,
        dto::CourseStatsDto,
        dto::TeachingOverviewDto,
        problem::Problem,
        problem::FieldError,
    )),
    tags(
        (name = "auth", description = "Sign-up and sign-in"),
        (name = "profiles", description = "Profile reconciliation"),
        (name = "enrollments", description = "Enrollment and course access"),
        (name = "instructors", description = "Instructor dashboard"),
        (name = "courses", description = "Course catalog"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    router
        .route("/auth/signup", post(handlers::sign_up))
        .route("/auth/signin", post(handlers::sign_in))
        .route(
            "/profiles/{identity}",
            get(handlers::get_profile).put(handlers::sync_profile),
        )
        .route("/profiles/{identity}/enrollments", post(handlers::enroll))
        .route("/profiles/{identity}/courses", get(handlers::list_courses))
        .route(
            "/profiles/{identity}/courses/{course_id}/access",
            get(handlers::course_access),
        )
        .route(
            "/instructors/{identity}/overview",
            get(handlers::teaching_overview),
        )
        .route("/courses", get(handlers::list_catalog))
        .route("/openapi.json", get(openapi_json))
        .layer(Extension(service))
}
