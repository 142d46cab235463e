mod common;

use filterlayer::prelude::*;
use rstest::rstest;

use common::{Student, ids, seeded_manager, student_filters};

#[tokio::test]
async fn wrong_value_type_is_rejected() {
    let manager = seeded_manager(false).await;
    let filter = FilterNode::leaf("Id", FilterOperator::EqualTo, [1.1]);

    let result = manager.validate::<Student>(Some(&filter)).unwrap();
    assert!(!result.is_success);
    assert_eq!(result.message, "Id filter values must be of type Int32");

    let err = manager
        .find_by_filter::<Student>(Some(&filter), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DataLayerError::UnsupportedFilter(message) if message == "Id filter values must be of type Int32"));
}

#[tokio::test]
async fn and_narrows_matches() {
    let manager = seeded_manager(false).await;
    let filter = FilterNode::and([Student::ID.is_in([1, 2, 3]), Student::NAME.starts_with("Ja")]);

    let found = manager
        .find_by_filter::<Student>(Some(&filter), None, None)
        .await
        .unwrap();

    assert_eq!(found, vec![Student::new(2, "Jane Doe")]);
}

#[tokio::test]
async fn or_keeps_source_order() {
    let manager = seeded_manager(false).await;
    let filter = FilterNode::or([Student::ID.equal_to(1), Student::NAME.starts_with("Ja")]);

    let found = manager
        .find_by_filter::<Student>(Some(&filter), None, None)
        .await
        .unwrap();

    assert_eq!(ids(&found), vec![1, 2, 4]);
}

#[tokio::test]
async fn empty_or_is_rejected() {
    let manager = seeded_manager(false).await;
    let filter = FilterNode::or([]);

    let result = manager.validate::<Student>(Some(&filter)).unwrap();

    assert_eq!(result.message, "OrFilterChip values must contain at least 1 filter");
}

#[tokio::test]
async fn distinct_fields_apply_across_the_tree() {
    let manager = seeded_manager(true).await;
    let filter = FilterNode::and([Student::ID.is_in([1, 2, 3]), Student::ID.not_in([4, 5, 6])]);

    let result = manager.validate::<Student>(Some(&filter)).unwrap();
    assert_eq!(result.message, "Duplicate filter provided");

    // Without the distinct rule the same filter runs.
    let found = seeded_manager(false)
        .await
        .find_by_filter::<Student>(Some(&filter), None, None)
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![1, 2, 3]);
}

#[rstest]
#[case(Some(0), Some(2), vec![1, 2])]
#[case(Some(1), Some(2), vec![3, 4])]
#[case(Some(2), Some(2), vec![])]
#[case(Some(1), None, vec![1, 2, 3, 4])]
#[case(None, Some(1), vec![1, 2, 3, 4])]
#[tokio::test]
async fn pagination_needs_both_halves(
    #[case] page: Option<usize>,
    #[case] page_size: Option<usize>,
    #[case] expected: Vec<i32>,
) {
    let manager = seeded_manager(false).await;

    let found = manager
        .find_by_filter::<Student>(None, page, page_size)
        .await
        .unwrap();
    let count = manager
        .count_by_filter::<Student>(None, page, page_size)
        .await
        .unwrap();

    assert_eq!(ids(&found), expected);
    assert_eq!(count, expected.len() as u64);
}

#[test]
fn in_memory_filtering_matches_the_store() {
    let filter = FilterNode::or([Student::ID.equal_to(1), Student::NAME.starts_with("Ja")]);

    let found = student_filters(false)
        .find_by_filter(common::students(), Some(&filter), Some(0), Some(2))
        .unwrap();

    assert_eq!(ids(&found), vec![1, 2]);
}
