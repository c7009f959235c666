//! Typed EduHub entities and the collections they live in.
//!
//! Cross-entity identifiers (`instructorId`, `courseId`, `studentId`) are weak
//! references: plain strings with no existence check and no cascade.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The entity kinds, each mapped to one named collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Course,
    Lesson,
    Enrollment,
    Assignment,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::User,
        EntityKind::Course,
        EntityKind::Lesson,
        EntityKind::Enrollment,
        EntityKind::Assignment,
    ];

    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Course => "courses",
            EntityKind::Lesson => "lessons",
            EntityKind::Enrollment => "enrollments",
            EntityKind::Assignment => "assignments",
        }
    }

    pub fn from_collection(name: &str) -> Option<Self> {
        EntityKind::ALL.into_iter().find(|k| k.collection() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Accepts the singular kind or the collection name, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        EntityKind::ALL
            .into_iter()
            .find(|k| k.collection() == lower || k.collection().strip_suffix('s') == Some(lower.as_str()))
            .ok_or_else(|| format!("unknown entity kind '{s}'"))
    }
}

/// Binds a typed entity to the collection it is stored in.
pub trait Entity: Serialize + DeserializeOwned {
    const KIND: EntityKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Instructor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub date_joined: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_id: String,
    pub title: String,
    pub description: String,
    pub instructor_id: String,
    pub category: String,
    pub level: String,
    pub duration: f64,
    pub price: f64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_published: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub lesson_id: String,
    pub course_id: String,
    pub title: String,
    pub content: String,
    /// Position within the course's lesson sequence
    pub order: i64,
    pub duration: f64,
    #[serde(default)]
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub student_id: String,
    pub course_id: String,
    pub enrolled_at: DateTime<Utc>,
    pub progress: f64,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub assignment_id: String,
    pub course_id: String,
    pub title: String,
    pub due_date: DateTime<Utc>,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;
}

impl Entity for Course {
    const KIND: EntityKind = EntityKind::Course;
}

impl Entity for Lesson {
    const KIND: EntityKind = EntityKind::Lesson;
}

impl Entity for Enrollment {
    const KIND: EntityKind = EntityKind::Enrollment;
}

impl Entity for Assignment {
    const KIND: EntityKind = EntityKind::Assignment;
}
