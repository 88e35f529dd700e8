use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::instrument;

use crate::contract::model::{Course, CourseRef, Instructor, NewProfile, Profile};
use crate::domain::repo::{CoursesRepository, ProfilePatch, ProfilesRepository};

use super::client::SanityClient;
use super::documents::{
    create_profile_mutation, patch_profile_mutation, profile_document_id, CourseDoc, InstructorDoc,
    ProfileDoc,
};

const PROFILE_BY_IDENTITY: &str = r#"*[_type == "userProfile" && firebaseUID == $uid][0]"#;
const PROFILE_BY_ID: &str = r#"*[_type == "userProfile" && _id == $id][0]"#;
const COUNT_ENROLLED: &str = r#"count(*[_type == "userProfile" && references($courseId)])"#;
const COUNT_ENROLLED_SINCE: &str = r#"count(*[_type == "userProfile" && references($courseId) && dateTime(_updatedAt) > dateTime($since)])"#;
const ALL_COURSES: &str = r#"*[_type == "course"] | order(_createdAt asc)"#;
const COURSE_BY_ID: &str = r#"*[_type == "course" && _id == $id][0]"#;
const COURSES_BY_IDS: &str = r#"*[_type == "course" && _id in $ids]"#;
const INSTRUCTOR_BY_IDENTITY: &str = r#"*[_type == "instructor" && firebaseUID == $uid][0]"#;
const COURSES_BY_INSTRUCTOR: &str = r#"*[_type == "course" && $instructorId in instructors[]._ref] | order(_createdAt asc)"#;

/// Profiles and catalog stored in the hosted content store.
pub struct SanityStore {
    client: SanityClient,
}

impl SanityStore {
    pub fn new(client: SanityClient) -> Self {
        Self { client }
    }

    async fn profile_by_id(&self, record_id: &str) -> anyhow::Result<Option<Profile>> {
        let doc: Option<ProfileDoc> = self
            .client
            .query(PROFILE_BY_ID, &[("id", json!(record_id))])
            .await?;
        Ok(doc.map(ProfileDoc::into_profile))
    }

    fn parse_profile(doc: Value) -> anyhow::Result<Profile> {
        let doc: ProfileDoc =
            serde_json::from_value(doc).context("malformed profile document")?;
        Ok(doc.into_profile())
    }
}

#[async_trait]
impl ProfilesRepository for SanityStore {
    #[instrument(name = "profile_sync.sanity.find_profile", skip(self), level = "debug")]
    async fn find_by_identity(&self, identity_ref: &str) -> anyhow::Result<Option<Profile>> {
        let doc: Option<ProfileDoc> = self
            .client
            .query(PROFILE_BY_IDENTITY, &[("uid", json!(identity_ref))])
            .await?;
        Ok(doc.map(ProfileDoc::into_profile))
    }

    async fn find_by_id(&self, record_id: &str) -> anyhow::Result<Option<Profile>> {
        self.profile_by_id(record_id).await
    }

    #[instrument(name = "profile_sync.sanity.create_profile", skip_all, fields(identity = %new_profile.identity_ref))]
    async fn create(&self, new_profile: NewProfile) -> anyhow::Result<Profile> {
        let mutation = create_profile_mutation(&new_profile);
        let documents = self.client.mutate(vec![mutation]).await?;

        match documents.into_iter().next() {
            Some(doc) => Self::parse_profile(doc),
            // document already existed and was left untouched
            None => {
                let id = profile_document_id(&new_profile.identity_ref);
                self.profile_by_id(&id)
                    .await?
                    .with_context(|| format!("profile {id} neither created nor readable"))
            }
        }
    }

    #[instrument(name = "profile_sync.sanity.patch_profile", skip(self, patch))]
    async fn patch(&self, record_id: &str, patch: ProfilePatch) -> anyhow::Result<Option<Profile>> {
        if self.profile_by_id(record_id).await?.is_none() {
            return Ok(None);
        }
        if patch.is_empty() {
            return self.profile_by_id(record_id).await;
        }

        let documents = self
            .client
            .mutate(vec![patch_profile_mutation(record_id, &patch)])
            .await?;
        match documents.into_iter().next() {
            Some(doc) => Self::parse_profile(doc).map(Some),
            None => self.profile_by_id(record_id).await,
        }
    }

    async fn count_enrolled(
        &self,
        course: &CourseRef,
        since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<u64> {
        match since {
            None => {
                self.client
                    .query(COUNT_ENROLLED, &[("courseId", json!(course.as_str()))])
                    .await
            }
            Some(since) => {
                let since = since.to_rfc3339_opts(SecondsFormat::Millis, true);
                self.client
                    .query(
                        COUNT_ENROLLED_SINCE,
                        &[("courseId", json!(course.as_str())), ("since", json!(since))],
                    )
                    .await
            }
        }
    }
}

#[async_trait]
impl CoursesRepository for SanityStore {
    async fn list_all(&self) -> anyhow::Result<Vec<Course>> {
        let docs: Vec<CourseDoc> = self.client.query(ALL_COURSES, &[]).await?;
        Ok(docs.into_iter().map(Course::from).collect())
    }

    async fn find_by_id(&self, id: &CourseRef) -> anyhow::Result<Option<Course>> {
        let doc: Option<CourseDoc> = self
            .client
            .query(COURSE_BY_ID, &[("id", json!(id.as_str()))])
            .await?;
        Ok(doc.map(Course::from))
    }

    async fn find_many(&self, ids: &[CourseRef]) -> anyhow::Result<Vec<Course>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let wanted: Vec<&str> = ids.iter().map(CourseRef::as_str).collect();
        let docs: Vec<CourseDoc> = self
            .client
            .query(COURSES_BY_IDS, &[("ids", json!(wanted))])
            .await?;
        let found: Vec<Course> = docs.into_iter().map(Course::from).collect();

        // store order is arbitrary; answer in the order asked
        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|c| &c.id == id).cloned())
            .collect())
    }

    async fn find_instructor(&self, identity_ref: &str) -> anyhow::Result<Option<Instructor>> {
        let doc: Option<InstructorDoc> = self
            .client
            .query(INSTRUCTOR_BY_IDENTITY, &[("uid", json!(identity_ref))])
            .await?;
        Ok(doc.map(Instructor::from))
    }

    async fn list_by_instructor(&self, instructor_record_id: &str) -> anyhow::Result<Vec<Course>> {
        let docs: Vec<CourseDoc> = self
            .client
            .query(
                COURSES_BY_INSTRUCTOR,
                &[("instructorId", json!(instructor_record_id))],
            )
            .await?;
        Ok(docs.into_iter().map(Course::from).collect())
    }
}
