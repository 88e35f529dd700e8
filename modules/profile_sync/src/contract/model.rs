use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authenticated account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque, immutable for the lifetime of the account.
    pub identifier: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}' (expected student, teacher or admin)")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// Weak reference from a profile to a course document. Never ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseRef(String);

impl CourseRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CourseRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CourseRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Application-owned record mirroring an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Assigned by the store.
    pub record_id: String,
    /// `Identity::identifier`; unique across profiles.
    pub identity_ref: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub bio: Option<String>,
    pub avatar_ref: Option<String>,
    pub enrolled_course_refs: Vec<CourseRef>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_enrolled_in(&self, course: &CourseRef) -> bool {
        self.enrolled_course_refs.contains(course)
    }
}

/// Data for a profile that does not exist yet. Enrollment starts empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub identity_ref: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// What the sign-up path knows about a fresh account. Their presence tells
/// the reconciler it may create the profile instead of waiting for it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileHints {
    pub email: Option<String>,
    pub name: Option<String>,
    pub default_role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: CourseRef,
    pub title: String,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub image_ref: Option<String>,
    pub instructor_refs: Vec<String>,
}

/// Instructor document bound to an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instructor {
    pub record_id: String,
    pub identity_ref: String,
    pub name: String,
}

/// Enrolled/available partition of the catalog for one profile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CourseListing {
    /// Enrollment order.
    pub enrolled: Vec<Course>,
    /// Catalog order, minus everything in `enrolled`.
    pub available: Vec<Course>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled,
    AlreadyEnrolled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseStats {
    pub course: Course,
    pub total_students: u64,
    /// Students whose profile changed inside the configured window.
    pub new_students: u64,
}

#[derive(Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// What the rest of the application sees of the current session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    pub identity: Option<Identity>,
    pub role: Option<Role>,
    pub loading: bool,
}
