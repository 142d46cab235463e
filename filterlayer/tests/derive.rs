use filterlayer::{
    FilterFields,
    bson::Bson,
    filter::{FilterOperator, FilterValue},
};
use serde::Serialize;

#[derive(Serialize, FilterFields)]
#[serde(rename_all = "camelCase")]
struct Course {
    code: String,
    start_date: i64,
    #[serde(rename = "hours")]
    credits: i32,
    #[filter(name = "Open")]
    is_open: bool,
    #[filter(skip)]
    #[allow(dead_code)]
    notes: Vec<String>,
}

#[test]
fn descriptors_follow_serde_names() {
    assert_eq!(Course::CODE.name(), "Code");
    assert_eq!(Course::CODE.key(), "code");
    assert_eq!(Course::START_DATE.name(), "StartDate");
    assert_eq!(Course::START_DATE.key(), "startDate");
    assert_eq!(Course::CREDITS.key(), "hours");
    assert_eq!(Course::IS_OPEN.name(), "Open");
    assert_eq!(Course::IS_OPEN.key(), "isOpen");
}

#[test]
fn descriptors_build_typed_leaves() {
    let filter = Course::CREDITS.is_in([3, 4]);

    assert_eq!(filter.field(), "Credits");
    assert_eq!(filter.operator(), Some(FilterOperator::In));
    assert_eq!(
        filter.values(),
        Some(&[FilterValue::Value(Bson::Int32(3)), FilterValue::Value(Bson::Int32(4))][..])
    );
}
