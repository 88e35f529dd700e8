use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

use crate::contract::model::{Course, CourseRef, Instructor};

/// Catalog YAML loaded into the in-memory store at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSeed {
    #[serde(default)]
    pub courses: Vec<CourseSeed>,
    #[serde(default)]
    pub instructors: Vec<InstructorSeed>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CourseSeed {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Instructor record ids.
    #[serde(default)]
    pub instructors: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstructorSeed {
    pub id: String,
    pub identity_ref: String,
    pub name: String,
}

impl CatalogSeed {
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(text).context("invalid catalog seed")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog seed {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn into_parts(self) -> (Vec<Course>, Vec<Instructor>) {
        let courses = self
            .courses
            .into_iter()
            .map(|c| Course {
                id: CourseRef::new(c.id),
                title: c.title,
                description: c.description,
                slug: c.slug,
                image_ref: c.image,
                instructor_refs: c.instructors,
            })
            .collect();
        let instructors = self
            .instructors
            .into_iter()
            .map(|i| Instructor {
                record_id: i.id,
                identity_ref: i.identity_ref,
                name: i.name,
            })
            .collect();
        (courses, instructors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_courses_and_instructors() {
        let seed = CatalogSeed::from_yaml(
            r#"
courses:
  - id: c-rust
    title: Rust for Beginners
    slug: rust-for-beginners
    instructors: [ins-1]
  - id: c-sql
    title: SQL Basics
instructors:
  - id: ins-1
    identity_ref: uid-teacher
    name: Grace
"#,
        )
        .unwrap();

        let (courses, instructors) = seed.into_parts();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].id, CourseRef::new("c-rust"));
        assert_eq!(courses[0].instructor_refs, vec!["ins-1".to_string()]);
        assert!(courses[1].instructor_refs.is_empty());
        assert_eq!(instructors[0].identity_ref, "uid-teacher");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CatalogSeed::from_yaml("courses:\n  - id: a\n    title: A\n    price: 10\n").unwrap_err();
        assert!(format!("{err:#}").contains("unknown field"));
    }
}
