#![allow(dead_code)]

use std::sync::Arc;

use filterlayer::{memory::InMemoryStore, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FilterFields)]
pub struct Student {
    pub id: i32,
    pub name: String,
}

impl Student {
    pub fn new(id: i32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

impl Document for Student {
    type Id = i32;

    fn id(&self) -> &i32 {
        &self.id
    }

    fn collection_name() -> &'static str {
        "students"
    }
}

pub fn students() -> Vec<Student> {
    vec![
        Student::new(1, "John Doe"),
        Student::new(2, "Jane Doe"),
        Student::new(3, "John Smith"),
        Student::new(4, "Jane Smith"),
    ]
}

pub fn student_filters(distinct: bool) -> FilterSet<Student> {
    FilterSet::builder()
        .rules(|rules| if distinct { rules.has_distinct_fields() } else { rules })
        .with_filter(Student::ID, false, 1, 1, FilterOperator::EqualTo, |ids| Filter::eq("id", ids[0]))
        .with_filter(Student::ID, false, 1, 10, FilterOperator::In, |ids| {
            Filter::any_of("id", bson_array(ids))
        })
        .with_filter(Student::ID, false, 1, 10, FilterOperator::NotIn, |ids| {
            Filter::none_of("id", bson_array(ids))
        })
        .with_filter(Student::NAME, false, 1, 1, FilterOperator::StartsWith, |names| {
            Filter::starts_with("name", names[0].clone())
        })
        .build()
        .expect("valid student filters")
}

pub fn ids(students: &[Student]) -> Vec<i32> {
    students
        .iter()
        .map(|student| student.id)
        .collect()
}

pub async fn seeded_manager(distinct: bool) -> DataManager {
    let backend = Arc::new(InMemoryStore::builder().build().await.unwrap());
    let manager = DataManager::new()
        .with_collection(TypedCollection::<Student>::new(backend, student_filters(distinct)));

    manager
        .create_range(students(), None)
        .await
        .unwrap();

    manager
}
