use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::contract::model::CourseStats;
use crate::domain::error::DomainError;
use crate::domain::repo::{CoursesRepository, ProfilesRepository};

/// Per-course student counts for an instructor's dashboard.
pub struct TeachingOverview {
    profiles: Arc<dyn ProfilesRepository>,
    courses: Arc<dyn CoursesRepository>,
    new_student_window: Duration,
}

impl TeachingOverview {
    pub fn new(
        profiles: Arc<dyn ProfilesRepository>,
        courses: Arc<dyn CoursesRepository>,
        new_student_window: Duration,
    ) -> Self {
        Self {
            profiles,
            courses,
            new_student_window,
        }
    }

    #[instrument(name = "profile_sync.teaching.overview", skip(self), fields(identity = %identity))]
    pub async fn overview(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<CourseStats>, DomainError> {
        let instructor = self
            .courses
            .find_instructor(identity)
            .await
            .map_err(DomainError::from_store)?
            .ok_or_else(|| DomainError::not_an_instructor(identity))?;

        let courses = self
            .courses
            .list_by_instructor(&instructor.record_id)
            .await
            .map_err(DomainError::from_store)?;
        debug!(instructor = %instructor.record_id, courses = courses.len(), "instructor courses");

        let since = self.window_start(now);
        let mut stats = Vec::with_capacity(courses.len());
        for course in courses {
            let total_students = self
                .profiles
                .count_enrolled(&course.id, None)
                .await
                .map_err(DomainError::from_store)?;
            let new_students = self
                .profiles
                .count_enrolled(&course.id, Some(since))
                .await
                .map_err(DomainError::from_store)?;
            stats.push(CourseStats {
                course,
                total_students,
                new_students,
            });
        }
        Ok(stats)
    }

    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.new_student_window)
            .ok()
            .and_then(|w| now.checked_sub_signed(w))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
