use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use filterlayer::{memory::InMemoryStore, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FilterFields)]
struct Lecture {
    id: i32,
    starts_at: DateTime<Utc>,
}

impl Document for Lecture {
    type Id = i32;

    fn id(&self) -> &i32 {
        &self.id
    }

    fn collection_name() -> &'static str {
        "lectures"
    }
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn lectures() -> Vec<Lecture> {
    vec![
        Lecture { id: 1, starts_at: at(9) },
        Lecture { id: 2, starts_at: at(11) },
        Lecture { id: 3, starts_at: at(14) },
    ]
}

fn lecture_filters() -> FilterSet<Lecture> {
    FilterSet::builder()
        .with_filter(Lecture::STARTS_AT, false, 1, 1, FilterOperator::EqualTo, |times| {
            Filter::eq("starts_at", bson::DateTime::from_chrono(times[0]))
        })
        .with_filter(Lecture::STARTS_AT, false, 1, 1, FilterOperator::GreaterThanOrEqualTo, |times| {
            Filter::gte("starts_at", bson::DateTime::from_chrono(times[0]))
        })
        .build()
        .expect("valid lecture filters")
}

fn ids(lectures: &[Lecture]) -> Vec<i32> {
    lectures
        .iter()
        .map(|lecture| lecture.id)
        .collect()
}

#[test]
fn datetime_fields_filter_in_memory() {
    let filters = lecture_filters();

    let exact = filters
        .find_by_filter(lectures(), Some(&Lecture::STARTS_AT.equal_to(at(11))), None, None)
        .unwrap();
    let later = filters
        .find_by_filter(lectures(), Some(&Lecture::STARTS_AT.greater_than_or_equal_to(at(11))), None, None)
        .unwrap();

    assert_eq!(ids(&exact), vec![2]);
    assert_eq!(ids(&later), vec![2, 3]);
}

#[tokio::test]
async fn datetime_fields_filter_in_the_store() {
    let backend = Arc::new(InMemoryStore::new());
    let manager = DataManager::new()
        .with_collection(TypedCollection::<Lecture>::new(backend, lecture_filters()));
    manager
        .create_range(lectures(), None)
        .await
        .unwrap();

    let found = manager
        .find_by_filter::<Lecture>(Some(&Lecture::STARTS_AT.greater_than_or_equal_to(at(10))), None, None)
        .await
        .unwrap();

    assert_eq!(ids(&found), vec![2, 3]);
}
