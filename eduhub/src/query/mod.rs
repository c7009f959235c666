//! Read paths over the EduHub collections.

use crate::document::Document;
use crate::error::Result;
use crate::index::SortOrder;
use crate::model::{Course, Entity, EntityKind, Lesson, Role, User};
use crate::store::{DocumentStore, Filter, QueryPlanDescription};
use serde_json::Value;
use std::collections::BTreeMap;

pub struct QueryService<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> QueryService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        QueryService { store }
    }

    /// Users with role student and `isActive` true, in store order.
    pub fn find_active_students(&self) -> Result<Vec<Document<User>>> {
        let filter = Filter::new()
            .eq("role", Role::Student.as_str())
            .eq("isActive", true);
        self.find_typed(&filter)
    }

    /// The plan the store would use to look a user up by email.
    pub fn explain_email_lookup(&self, email: &str) -> Result<QueryPlanDescription> {
        let plan = self
            .store
            .explain(EntityKind::User.collection(), &Filter::new().eq("email", email))?;
        log::debug!(
            "Email lookup plan selects {}",
            plan.selected_index.as_deref().unwrap_or("no index")
        );
        Ok(plan)
    }

    /// Enrollment count per course id. Courses without enrollments are absent.
    pub fn course_enrollment_stats(&self) -> Result<BTreeMap<String, u64>> {
        let groups = self
            .store
            .aggregate_count(EntityKind::Enrollment.collection(), "courseId")?;

        let mut stats = BTreeMap::new();
        for group in groups {
            match group.key {
                Value::String(course_id) => {
                    *stats.entry(course_id).or_insert(0) += group.count;
                }
                other => {
                    log::warn!(
                        "Skipping {} enrollments with non-string courseId {other}",
                        group.count
                    );
                }
            }
        }
        Ok(stats)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<Document<User>>> {
        let mut users = self.find_typed::<User>(&Filter::new().eq("email", email))?;
        Ok(if users.is_empty() {
            None
        } else {
            Some(users.swap_remove(0))
        })
    }

    /// A course's lessons in sequence order.
    pub fn lessons_for_course(&self, course_id: &str) -> Result<Vec<Document<Lesson>>> {
        let filter = Filter::new()
            .eq("courseId", course_id)
            .sort_by("order", SortOrder::Ascending);
        self.find_typed(&filter)
    }

    pub fn courses_by_title_and_category(
        &self,
        title: &str,
        category: &str,
    ) -> Result<Vec<Document<Course>>> {
        let filter = Filter::new().eq("title", title).eq("category", category);
        self.find_typed(&filter)
    }

    fn find_typed<T: Entity>(&self, filter: &Filter) -> Result<Vec<Document<T>>> {
        self.store
            .find(T::KIND.collection(), filter)?
            .into_iter()
            .map(|doc| doc.into_typed())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::WriteGateway;
    use crate::index::IndexPlan;
    use crate::schema::SchemaRegistry;
    use crate::seed::SeedGenerator;
    use crate::setup::bootstrap;
    use crate::store::SqliteStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        let registry = SchemaRegistry::builtin().unwrap();
        let plan = IndexPlan::default();
        bootstrap(&store, &registry, &plan).unwrap();

        let seed = SeedGenerator::new();
        let gateway = WriteGateway::new(&store, &registry, &plan);
        gateway.insert_entities(&seed.users(6)).unwrap();
        gateway.insert_entities(&seed.courses(2)).unwrap();
        store
    }

    fn enrollment(student: &str, course: &str) -> Value {
        json!({
            "studentId": student,
            "courseId": course,
            "enrolledAt": "2026-03-01T08:00:00Z",
            "progress": 0,
            "completed": false
        })
    }

    #[test]
    fn test_find_active_students() {
        let store = seeded_store();
        store
            .insert_one(
                "users",
                &json!({
                    "userId": "user100",
                    "email": "user100@edu.africa",
                    "firstName": "First100",
                    "lastName": "Last100",
                    "role": "student",
                    "dateJoined": "2026-01-01T00:00:00Z",
                    "isActive": false
                }),
            )
            .unwrap();

        let queries = QueryService::new(&store);
        let mut ids: Vec<String> = queries
            .find_active_students()
            .unwrap()
            .into_iter()
            .map(|d| d.data.user_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["user2", "user4", "user6"]);
    }

    #[test]
    fn test_course_enrollment_stats() {
        let store = seeded_store();
        store
            .insert_many(
                "enrollments",
                &[
                    enrollment("userA", "course1"),
                    enrollment("userB", "course1"),
                    enrollment("userC", "course2"),
                ],
            )
            .unwrap();

        let stats = QueryService::new(&store).course_enrollment_stats().unwrap();
        let expected: BTreeMap<String, u64> =
            [("course1".to_string(), 2), ("course2".to_string(), 1)].into();
        assert_eq!(stats, expected);
        assert!(!stats.contains_key("course3"));
    }

    #[test]
    fn test_stats_empty_without_enrollments() {
        let store = seeded_store();
        assert!(QueryService::new(&store).course_enrollment_stats().unwrap().is_empty());
    }

    #[test]
    fn test_explain_email_lookup_uses_index() {
        let store = seeded_store();
        let plan = QueryService::new(&store)
            .explain_email_lookup("user1@edu.africa")
            .unwrap();
        assert_eq!(plan.collection, "users");
        assert!(plan.uses_index("email_1"), "plan: {:?}", plan.steps);
    }

    #[test]
    fn test_find_user_by_email() {
        let store = seeded_store();
        let queries = QueryService::new(&store);

        let user = queries.find_user_by_email("user3@edu.africa").unwrap().unwrap();
        assert_eq!(user.data.user_id, "user3");
        assert_eq!(user.data.role, Role::Instructor);
        assert!(queries.find_user_by_email("nobody@edu.africa").unwrap().is_none());
    }

    #[test]
    fn test_lessons_in_order() {
        let store = seeded_store();
        for (id, order) in [("lesson-b", 2), ("lesson-c", 3), ("lesson-a", 1)] {
            store
                .insert_one(
                    "lessons",
                    &json!({
                        "lessonId": id,
                        "courseId": "course1",
                        "title": "Mali under Mansa Musa",
                        "content": "...",
                        "order": order,
                        "duration": 30
                    }),
                )
                .unwrap();
        }

        let lessons = QueryService::new(&store).lessons_for_course("course1").unwrap();
        let ids: Vec<&str> = lessons.iter().map(|l| l.data.lesson_id.as_str()).collect();
        assert_eq!(ids, vec!["lesson-a", "lesson-b", "lesson-c"]);
        assert!(QueryService::new(&store).lessons_for_course("course2").unwrap().is_empty());
    }

    #[test]
    fn test_null_collections_never_reach_typed_reads() {
        let store = seeded_store();
        let registry = SchemaRegistry::builtin().unwrap();
        let plan = IndexPlan::default();
        let gateway = WriteGateway::new(&store, &registry, &plan);

        let err = gateway
            .insert(
                EntityKind::User,
                &json!({
                    "userId": "user50",
                    "email": "user50@edu.africa",
                    "firstName": "First50",
                    "lastName": "Last50",
                    "role": "student",
                    "dateJoined": "2026-01-01T00:00:00Z",
                    "profile": { "skills": null },
                    "isActive": true
                }),
            )
            .unwrap_err();
        assert_eq!(err.violation().unwrap().field, "profile.skills");

        let lesson = json!({
            "lessonId": "lesson1",
            "courseId": "course1",
            "title": "The Mali Empire",
            "content": "...",
            "order": 1,
            "duration": 30,
            "resources": null
        });
        assert!(gateway.insert(EntityKind::Lesson, &lesson).is_err());
        assert!(store.insert_one("lessons", &lesson).is_err());

        let queries = QueryService::new(&store);
        assert_eq!(queries.find_active_students().unwrap().len(), 3);
        assert!(queries.lessons_for_course("course1").unwrap().is_empty());
    }

    #[test]
    fn test_courses_by_title_and_category() {
        let store = seeded_store();
        let queries = QueryService::new(&store);

        let found = queries
            .courses_by_title_and_category("History of West African Empires 2", "African History")
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].data.course_id, "course2");

        let plan = store
            .explain(
                "courses",
                &Filter::new()
                    .eq("title", "History of West African Empires 2")
                    .eq("category", "African History"),
            )
            .unwrap();
        assert!(plan.uses_index("title_1_category_1"), "plan: {:?}", plan.steps);
    }
}
