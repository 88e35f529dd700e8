use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::contract::model::{
    Course, CourseListing, CourseStats, EnrollOutcome, Identity, Profile, SignUpRequest,
};

/// REST DTO for profile representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileDto {
    pub record_id: String,
    pub identity: String,
    pub name: String,
    pub email: String,
    /// `student`, `teacher` or `admin`.
    pub role: String,
    pub bio: Option<String>,
    pub avatar_ref: Option<String>,
    pub enrolled_courses: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdentityDto {
    pub identifier: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct SignUpReq {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct SignInReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionDto {
    pub identity: IdentityDto,
    pub profile: ProfileDto,
}

/// Fields to bring in line with the identity; absent fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SyncProfileReq {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollReq {
    pub course_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentDto {
    /// `enrolled` or `already_enrolled`.
    pub outcome: String,
    pub profile: ProfileDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseDto {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub image_ref: Option<String>,
    pub instructors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseListingDto {
    pub enrolled: Vec<CourseDto>,
    pub available: Vec<CourseDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseAccessDto {
    pub course_id: String,
    pub has_access: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseStatsDto {
    pub course: CourseDto,
    pub total_students: u64,
    pub new_students: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeachingOverviewDto {
    pub generated_at: DateTime<Utc>,
    pub courses: Vec<CourseStatsDto>,
}

// Conversion implementations between REST DTOs and contract models

impl From<Profile> for ProfileDto {
    fn from(p: Profile) -> Self {
        Self {
            record_id: p.record_id,
            identity: p.identity_ref,
            name: p.name,
            email: p.email,
            role: p.role.to_string(),
            bio: p.bio,
            avatar_ref: p.avatar_ref,
            enrolled_courses: p
                .enrolled_course_refs
                .into_iter()
                .map(|r| r.as_str().to_string())
                .collect(),
            updated_at: p.updated_at,
        }
    }
}

impl From<Identity> for IdentityDto {
    fn from(i: Identity) -> Self {
        Self {
            identifier: i.identifier,
            email: i.email,
            display_name: i.display_name,
        }
    }
}

impl From<SignUpReq> for SignUpRequest {
    fn from(req: SignUpReq) -> Self {
        Self {
            name: req.name,
            email: req.email,
            password: req.password,
            confirm_password: req.confirm_password,
        }
    }
}

impl From<Course> for CourseDto {
    fn from(c: Course) -> Self {
        Self {
            id: c.id.as_str().to_string(),
            title: c.title,
            description: c.description,
            slug: c.slug,
            image_ref: c.image_ref,
            instructors: c.instructor_refs,
        }
    }
}

impl From<CourseListing> for CourseListingDto {
    fn from(l: CourseListing) -> Self {
        Self {
            enrolled: l.enrolled.into_iter().map(CourseDto::from).collect(),
            available: l.available.into_iter().map(CourseDto::from).collect(),
        }
    }
}

impl From<CourseStats> for CourseStatsDto {
    fn from(s: CourseStats) -> Self {
        Self {
            course: s.course.into(),
            total_students: s.total_students,
            new_students: s.new_students,
        }
    }
}

pub fn outcome_str(outcome: EnrollOutcome) -> &'static str {
    match outcome {
        EnrollOutcome::Enrolled => "enrolled",
        EnrollOutcome::AlreadyEnrolled => "already_enrolled",
    }
}
