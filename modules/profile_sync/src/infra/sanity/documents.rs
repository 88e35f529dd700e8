use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::contract::model::{Course, CourseRef, Instructor, NewProfile, Profile, Role};
use crate::domain::repo::ProfilePatch;

pub const PROFILE_TYPE: &str = "userProfile";

#[derive(Debug, Deserialize)]
pub struct Reference {
    #[serde(rename = "_ref")]
    pub target: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageField {
    pub asset: Option<Reference>,
}

#[derive(Debug, Deserialize)]
pub struct Slug {
    pub current: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDoc {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "firebaseUID")]
    pub firebase_uid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<ImageField>,
    #[serde(default)]
    pub enrolled_courses: Option<Vec<Reference>>,
}

impl ProfileDoc {
    pub fn into_profile(self) -> Profile {
        Profile {
            record_id: self.id,
            identity_ref: self.firebase_uid,
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            // unknown roles in hand-edited documents count as the least privileged
            role: self
                .role
                .as_deref()
                .and_then(|r| r.parse().ok())
                .unwrap_or(Role::Student),
            bio: self.bio,
            avatar_ref: self.avatar.and_then(|a| a.asset).map(|r| r.target),
            enrolled_course_refs: self
                .enrolled_courses
                .unwrap_or_default()
                .into_iter()
                .map(|r| CourseRef::new(r.target))
                .collect(),
            updated_at: self.updated_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDoc {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slug: Option<Slug>,
    #[serde(default)]
    pub course_image: Option<ImageField>,
    #[serde(default)]
    pub instructors: Option<Vec<Reference>>,
}

impl From<CourseDoc> for Course {
    fn from(doc: CourseDoc) -> Self {
        Course {
            id: CourseRef::new(doc.id),
            title: doc.title.unwrap_or_default(),
            description: doc.description,
            slug: doc.slug.and_then(|s| s.current),
            image_ref: doc.course_image.and_then(|i| i.asset).map(|r| r.target),
            instructor_refs: doc
                .instructors
                .unwrap_or_default()
                .into_iter()
                .map(|r| r.target)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InstructorDoc {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "firebaseUID", default)]
    pub firebase_uid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<InstructorDoc> for Instructor {
    fn from(doc: InstructorDoc) -> Self {
        Instructor {
            record_id: doc.id,
            identity_ref: doc.firebase_uid.unwrap_or_default(),
            name: doc.name.unwrap_or_default(),
        }
    }
}

/// Deterministic document id for an identity's profile. Characters outside
/// the store's id alphabet are replaced with `-`.
pub fn profile_document_id(identity_ref: &str) -> String {
    let safe: String = identity_ref
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect();
    format!("{PROFILE_TYPE}-{safe}")
}

pub fn create_profile_mutation(new_profile: &NewProfile) -> Value {
    json!({
        "createIfNotExists": {
            "_id": profile_document_id(&new_profile.identity_ref),
            "_type": PROFILE_TYPE,
            "firebaseUID": new_profile.identity_ref,
            "name": new_profile.name,
            "email": new_profile.email,
            "role": new_profile.role.as_str(),
            "enrolledCourses": [],
        }
    })
}

fn course_reference(course: &CourseRef) -> Value {
    let key = Uuid::new_v4().simple().to_string();
    json!({
        "_type": "reference",
        "_ref": course.as_str(),
        "_key": &key[..12],
    })
}

pub fn patch_profile_mutation(record_id: &str, patch: &ProfilePatch) -> Value {
    let mut body = serde_json::Map::new();
    body.insert("id".into(), json!(record_id));

    let mut set = serde_json::Map::new();
    if let Some(name) = &patch.name {
        set.insert("name".into(), json!(name));
    }
    if let Some(email) = &patch.email {
        set.insert("email".into(), json!(email));
    }
    if let Some(role) = patch.role {
        set.insert("role".into(), json!(role.as_str()));
    }
    if !set.is_empty() {
        body.insert("set".into(), Value::Object(set));
    }
    if patch.init_enrollments || !patch.append_enrollments.is_empty() {
        body.insert("setIfMissing".into(), json!({ "enrolledCourses": [] }));
    }
    if !patch.append_enrollments.is_empty() {
        let items: Vec<Value> = patch.append_enrollments.iter().map(course_reference).collect();
        body.insert(
            "insert".into(),
            json!({ "after": "enrolledCourses[-1]", "items": items }),
        );
    }

    json!({ "patch": Value::Object(body) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_raw_profile_document() {
        let doc: ProfileDoc = serde_json::from_value(json!({
            "_id": "userProfile-u1",
            "_type": "userProfile",
            "_updatedAt": "2025-03-01T10:00:00Z",
            "firebaseUID": "u1",
            "name": "Ann",
            "email": "a@x.com",
            "role": "teacher",
            "avatar": { "_type": "image", "asset": { "_ref": "image-abc-200x200-png" } },
            "enrolledCourses": [
                { "_type": "reference", "_ref": "c1", "_key": "k1" },
                { "_type": "reference", "_ref": "c2", "_key": "k2" }
            ]
        }))
        .unwrap();

        let p = doc.into_profile();
        assert_eq!(p.record_id, "userProfile-u1");
        assert_eq!(p.role, Role::Teacher);
        assert_eq!(p.avatar_ref.as_deref(), Some("image-abc-200x200-png"));
        assert_eq!(p.enrolled_course_refs, vec![CourseRef::new("c1"), CourseRef::new("c2")]);
    }

    #[test]
    fn missing_enrollments_and_unknown_role_have_defaults() {
        let doc: ProfileDoc = serde_json::from_value(json!({
            "_id": "p1", "firebaseUID": "u1", "role": "superuser"
        }))
        .unwrap();
        let p = doc.into_profile();
        assert!(p.enrolled_course_refs.is_empty());
        assert_eq!(p.role, Role::Student);
    }

    #[test]
    fn profile_ids_are_sanitized() {
        assert_eq!(profile_document_id("abc_DEF-1"), "userProfile-abc_DEF-1");
        assert_eq!(profile_document_id("a.b/c"), "userProfile-a-b-c");
    }

    #[test]
    fn enrollment_patch_initializes_then_inserts() {
        let m = patch_profile_mutation("p1", &ProfilePatch::append_course(CourseRef::new("c42")));
        let patch = &m["patch"];

        assert_eq!(patch["id"], "p1");
        assert_eq!(patch["setIfMissing"], json!({ "enrolledCourses": [] }));
        assert_eq!(patch["insert"]["after"], "enrolledCourses[-1]");
        assert_eq!(patch["insert"]["items"][0]["_ref"], "c42");
        assert_eq!(patch["insert"]["items"][0]["_key"].as_str().unwrap().len(), 12);
        assert!(patch.get("set").is_none());
    }

    #[test]
    fn field_patch_only_sets() {
        let patch = ProfilePatch {
            name: Some("Ann B".into()),
            role: Some(Role::Admin),
            ..Default::default()
        };
        let m = patch_profile_mutation("p1", &patch);
        assert_eq!(m["patch"]["set"], json!({ "name": "Ann B", "role": "admin" }));
        assert!(m["patch"].get("insert").is_none());
        assert!(m["patch"].get("setIfMissing").is_none());
    }
}
