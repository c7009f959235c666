//! Deterministic synthetic entities for demos and tests.
//!
//! Identifiers and emails derive from the 1-based index, so two runs with
//! the same counts produce the same keys. Only timestamps vary.

use crate::error::Result;
use crate::model::{Assignment, Course, Enrollment, EntityKind, Lesson, Profile, Role, User};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

pub const EMAIL_DOMAIN: &str = "edu.africa";

#[derive(Debug, Clone)]
pub struct SeedGenerator {
    now: DateTime<Utc>,
}

impl SeedGenerator {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Generator stamping every timestamp relative to `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        SeedGenerator { now }
    }

    /// `count` documents of the given kind, as stored.
    pub fn generate(&self, kind: EntityKind, count: usize) -> Result<Vec<Value>> {
        match kind {
            EntityKind::User => to_documents(&self.users(count)),
            EntityKind::Course => to_documents(&self.courses(count)),
            EntityKind::Lesson => to_documents(&self.lessons(count)),
            EntityKind::Enrollment => to_documents(&self.enrollments(count)),
            EntityKind::Assignment => to_documents(&self.assignments(count)),
        }
    }

    /// Even indices are students, odd indices instructors.
    pub fn users(&self, count: usize) -> Vec<User> {
        (1..=count)
            .map(|i| User {
                user_id: format!("user{i}"),
                email: format!("user{i}@{EMAIL_DOMAIN}"),
                first_name: format!("First{i}"),
                last_name: format!("Last{i}"),
                role: if i % 2 == 0 {
                    Role::Student
                } else {
                    Role::Instructor
                },
                date_joined: self.now,
                profile: Some(Profile {
                    bio: Some("Passionate about African culture.".into()),
                    avatar: Some(String::new()),
                    skills: vec!["storytelling".into(), "research".into()],
                }),
                is_active: Some(true),
            })
            .collect()
    }

    pub fn courses(&self, count: usize) -> Vec<Course> {
        (1..=count)
            .map(|i| Course {
                course_id: format!("course{i}"),
                title: format!("History of West African Empires {i}"),
                description: "Explore pre-colonial African civilizations.".into(),
                instructor_id: "user1".into(),
                category: "African History".into(),
                level: "beginner".into(),
                duration: 10.0,
                price: 49.99,
                tags: vec!["history".into(), "Africa".into(), "culture".into()],
                created_at: self.now,
                updated_at: self.now,
                is_published: true,
            })
            .collect()
    }

    /// Lessons of `course1`, ordered by index.
    pub fn lessons(&self, count: usize) -> Vec<Lesson> {
        (1..=count)
            .map(|i| Lesson {
                lesson_id: format!("lesson{i}"),
                course_id: "course1".into(),
                title: format!("Lesson {i}"),
                content: format!("Lesson {i} of the West African empires course."),
                order: i as i64,
                duration: 30.0,
                resources: Vec::new(),
            })
            .collect()
    }

    /// Student `user{2i}` enrolled in `course1`.
    pub fn enrollments(&self, count: usize) -> Vec<Enrollment> {
        (1..=count)
            .map(|i| Enrollment {
                student_id: format!("user{}", 2 * i),
                course_id: "course1".into(),
                enrolled_at: self.now,
                progress: 0.0,
                completed: false,
            })
            .collect()
    }

    /// Assignments of `course1`, due one day apart.
    pub fn assignments(&self, count: usize) -> Vec<Assignment> {
        (1..=count)
            .map(|i| Assignment {
                assignment_id: format!("assignment{i}"),
                course_id: "course1".into(),
                title: format!("Assignment {i}"),
                due_date: self.now + Duration::days(i as i64),
            })
            .collect()
    }
}

impl Default for SeedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn to_documents<T: Serialize>(entities: &[T]) -> Result<Vec<Value>> {
    entities
        .iter()
        .map(|e| Ok(serde_json::to_value(e)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::field_value;
    use crate::schema::SchemaRegistry;
    use pretty_assertions::assert_eq;

    fn keys(docs: &[Value], field: &str) -> Vec<Value> {
        docs.iter()
            .map(|d| field_value(d, field).cloned().unwrap_or(Value::Null))
            .collect()
    }

    #[test]
    fn test_users_are_deterministic() {
        let first = SeedGenerator::new().generate(EntityKind::User, 20).unwrap();
        let second = SeedGenerator::new().generate(EntityKind::User, 20).unwrap();
        assert_eq!(first.len(), 20);
        assert_eq!(keys(&first, "userId"), keys(&second, "userId"));
        assert_eq!(keys(&first, "email"), keys(&second, "email"));
        assert_eq!(first[0]["email"], "user1@edu.africa");
        assert_eq!(first[19]["userId"], "user20");
    }

    #[test]
    fn test_role_parity() {
        let users = SeedGenerator::new().users(4);
        let roles: Vec<Role> = users.iter().map(|u| u.role).collect();
        assert_eq!(
            roles,
            vec![Role::Instructor, Role::Student, Role::Instructor, Role::Student]
        );

        // Every seeded enrollment points at a student.
        let enrollments = SeedGenerator::new().enrollments(3);
        for e in &enrollments {
            let index: usize = e.student_id.trim_start_matches("user").parse().unwrap();
            assert_eq!(index % 2, 0);
        }
    }

    #[test]
    fn test_generated_documents_pass_schema() {
        let registry = SchemaRegistry::builtin().unwrap();
        let seed = SeedGenerator::new();
        for kind in EntityKind::ALL {
            for doc in seed.generate(kind, 5).unwrap() {
                let report = registry.validate_document(kind, &doc).unwrap();
                assert!(report.is_ok(), "{kind}: {:?}", report.violations);
            }
        }
    }

    #[test]
    fn test_timestamps_follow_clock() {
        let now = DateTime::parse_from_rfc3339("2026-02-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let seed = SeedGenerator::at(now);
        assert_eq!(seed.courses(1)[0].created_at, now);
        assert_eq!(seed.assignments(2)[1].due_date, now + Duration::days(2));
        assert_eq!(seed.lessons(3)[2].order, 3);
        assert!(seed.generate(EntityKind::Course, 0).unwrap().is_empty());
    }
}
