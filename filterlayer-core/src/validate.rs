//! Filter validation against a per-entity rule set.
//!
//! A [`RuleSet`] declares which fields, operators and value shapes a caller may use,
//! plus tree-wide policies (null root, maximum depth, distinct fields, undefined
//! fields). Rule sets are assembled once with [`RuleSetBuilder`] and then shared
//! read-only; [`RuleSet::validate`] is pure.
//!
//! # Example
//!
//! ```ignore
//! use filterlayer::{filter::FilterOperator::*, validate::RuleSet};
//!
//! let rules = RuleSet::builder()
//!     .has_distinct_fields()
//!     .has_filter_type::<i32>("Id", false, 1, 1, [EqualTo, NotEqualTo])
//!     .has_filter_type::<i32>("Id", false, 1, 10, [In, NotIn])
//!     .has_filter_type::<String>("Name", false, 1, 1, [StartsWith, EndsWith])
//!     .build()?;
//!
//! // LessThan is not declared for Id, so nothing recognizes the leaf.
//! let result = rules.validate(Some(&FilterNode::leaf("Id", LessThan, [10])));
//! assert_eq!(result.message, "Undefined filter provided");
//! ```
//!
//! # Validation order
//!
//! 1. Null root, then maximum depth.
//! 2. Every `And`/`Or` node must hold at least one child.
//! 3. Field rules and the distinct-field check, in the order they were configured.
//!    Each rule sees the whole flattened tree, across all branches and depths.
//! 4. Unless undefined filters are allowed, every node must have been recognized by
//!    step 2 or a field rule.
//!
//! The first failure wins.

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::debug;

use crate::{
    error::ConfigError,
    filter::{Field, FilterNode, FilterOperator, FilterValue, FilterValueType, ValueType},
};

/// Outcome of validating one filter tree. A failed validation is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_success: bool,
    /// Empty on success.
    pub message: String,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            is_success: true,
            message: String::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            message: message.into(),
        }
    }

    /// Converts into a `Result`, carrying the failure message as the error.
    pub fn into_result(self) -> Result<(), String> {
        if self.is_success {
            Ok(())
        } else {
            Err(self.message)
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::success()
    }
}

/// One pluggable check run over the flattened filter tree.
///
/// `filters` lists every node of the tree (leaf and composite). A step that accepts a
/// node sets the matching entry of `recognized`; nodes left unrecognized fail the
/// undefined-filter sweep.
pub trait ValidationStep: Send + Sync + fmt::Debug {
    fn check(&self, filters: &[&FilterNode], recognized: &mut [bool]) -> ValidationResult;
}

/// Rejects `And`/`Or` nodes without children and recognizes the rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeCheck;

impl ValidationStep for CompositeCheck {
    fn check(&self, filters: &[&FilterNode], recognized: &mut [bool]) -> ValidationResult {
        for (index, filter) in filters.iter().enumerate() {
            let Some(kind) = filter.composite_kind() else {
                continue;
            };

            if !filter.is_composite() {
                return ValidationResult::failure(format!("{kind} values must contain at least 1 filter"));
            }
            recognized[index] = true;
        }

        ValidationResult::success()
    }
}

/// Rejects trees where the same field appears on more than one leaf, anywhere in the tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistinctFields;

impl ValidationStep for DistinctFields {
    fn check(&self, filters: &[&FilterNode], _recognized: &mut [bool]) -> ValidationResult {
        let mut counts = HashMap::<&str, usize>::new();

        for filter in filters.iter().filter(|filter| !filter.is_composite()) {
            let count = counts.entry(filter.field()).or_default();
            *count += 1;

            if *count > 1 {
                return ValidationResult::failure("Duplicate filter provided");
            }
        }

        ValidationResult::success()
    }
}

/// Declares one legal shape for leaves on a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    field: String,
    value_type: ValueType,
    required: bool,
    min_values: usize,
    max_values: usize,
    operators: Vec<FilterOperator>,
}

impl FilterRule {
    /// Creates a rule, checking the value-count bounds and operator list.
    pub fn new(
        field: impl Into<String>,
        value_type: ValueType,
        required: bool,
        min_values: usize,
        max_values: usize,
        operators: impl IntoIterator<Item = FilterOperator>,
    ) -> Result<Self, ConfigError> {
        let field = field.into();

        if min_values < 1 {
            return Err(ConfigError::MinValueCount);
        }
        if max_values < min_values {
            return Err(ConfigError::MaxValueCount(min_values));
        }

        let operators = operators.into_iter().collect::<Vec<_>>();
        if operators.is_empty() {
            return Err(ConfigError::NoOperators(field));
        }
        if let Some(operator) = operators.iter().find(|operator| operator.is_composite()) {
            return Err(ConfigError::CompositeOperator(operator.to_string(), field));
        }

        Ok(Self {
            field,
            value_type,
            required,
            min_values,
            max_values,
            operators,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn operators(&self) -> &[FilterOperator] {
        &self.operators
    }

    /// Rules never carry `And`/`Or`, so the operator check alone keeps composites out.
    fn applies_to(&self, filter: &FilterNode) -> bool {
        filter.field() == self.field
            && filter
                .operator()
                .is_some_and(|operator| self.operators.contains(&operator))
    }

    fn has_declared_type(&self, value: &FilterValue) -> bool {
        value
            .as_value()
            .and_then(ValueType::of)
            == Some(self.value_type)
    }
}

impl ValidationStep for FilterRule {
    fn check(&self, filters: &[&FilterNode], recognized: &mut [bool]) -> ValidationResult {
        let found = filters
            .iter()
            .enumerate()
            .filter(|(_, filter)| self.applies_to(filter))
            .collect::<Vec<_>>();

        if self.required && found.is_empty() {
            return ValidationResult::failure(format!("{} filter was not provided", self.field));
        }

        for (index, filter) in found {
            recognized[index] = true;

            let Some(values) = filter.values() else {
                return ValidationResult::failure(format!("{} filter values must not be null", self.field));
            };

            if values.len() < self.min_values || values.len() > self.max_values {
                return ValidationResult::failure(format!(
                    "{} filter values length must be greater than {} and less than {}",
                    self.field,
                    self.min_values - 1,
                    self.max_values + 1,
                ));
            }

            if !values.iter().all(|value| self.has_declared_type(value)) {
                return ValidationResult::failure(format!(
                    "{} filter values must be of type {}",
                    self.field, self.value_type,
                ));
            }
        }

        ValidationResult::success()
    }
}

/// An immutable, shareable set of validation steps and tree-wide policies.
#[derive(Debug, Clone)]
pub struct RuleSet {
    steps: Arc<[Box<dyn ValidationStep>]>,
    allow_null_filter: bool,
    allow_undefined_filters: bool,
    max_depth: Option<usize>,
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::new()
    }

    /// A rule set that accepts any filter, including a missing one.
    pub fn permissive() -> Self {
        Self {
            steps: Arc::from(Vec::<Box<dyn ValidationStep>>::new()),
            allow_null_filter: true,
            allow_undefined_filters: true,
            max_depth: None,
        }
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Validates a filter tree. `None` stands for "no filter supplied".
    pub fn validate(&self, filter: Option<&FilterNode>) -> ValidationResult {
        let result = self.run(filter);

        if !result.is_success {
            debug!(message = %result.message, "filter rejected");
        }

        result
    }

    fn run(&self, filter: Option<&FilterNode>) -> ValidationResult {
        let Some(filter) = filter else {
            return if self.allow_null_filter {
                ValidationResult::success()
            } else {
                ValidationResult::failure("Filter must not be null")
            };
        };

        let flattened = filter.flatten();

        if let Some(max_depth) = self.max_depth {
            let found = flattened
                .iter()
                .map(|(_, depth)| *depth)
                .max()
                .unwrap_or(1);

            if found > max_depth {
                return ValidationResult::failure(format!(
                    "Filter with depth of {found} found, max supported depth is {max_depth}"
                ));
            }
        }

        let filters = flattened
            .into_iter()
            .map(|(node, _)| node)
            .collect::<Vec<_>>();
        let mut recognized = vec![false; filters.len()];

        for step in self.steps.iter() {
            let result = step.check(&filters, &mut recognized);
            if !result.is_success {
                return result;
            }
        }

        if !self.allow_undefined_filters && recognized.iter().any(|hit| !hit) {
            return ValidationResult::failure("Undefined filter provided");
        }

        ValidationResult::success()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet::builder().finish()
    }
}

/// Fluent builder for [`RuleSet`]. Argument errors are held until [`RuleSetBuilder::build`].
#[derive(Debug)]
pub struct RuleSetBuilder {
    steps: Vec<Box<dyn ValidationStep>>,
    allow_null_filter: bool,
    allow_undefined_filters: bool,
    max_depth: Option<usize>,
    error: Option<ConfigError>,
}

impl RuleSetBuilder {
    pub fn new() -> Self {
        Self {
            steps: vec![Box::new(CompositeCheck)],
            allow_null_filter: true,
            allow_undefined_filters: false,
            max_depth: None,
            error: None,
        }
    }

    /// Fail validation when no filter is supplied.
    pub fn reject_null_filter(mut self) -> Self {
        self.allow_null_filter = false;
        self
    }

    /// Accept nodes that no rule recognizes.
    pub fn allow_undefined_filters(mut self) -> Self {
        self.allow_undefined_filters = true;
        self
    }

    /// Maximum nesting depth, counting the root as 1. Must be at least 1.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        if max_depth < 1 {
            return self.fail(ConfigError::MaxFilterDepth);
        }
        self.max_depth = Some(max_depth);
        self
    }

    /// Fail validation when a field appears on more than one leaf.
    pub fn has_distinct_fields(self) -> Self {
        self.with_step(DistinctFields)
    }

    /// Declares a legal filter shape for `field` with values of type `T`.
    pub fn has_filter_type<T: FilterValueType>(
        self,
        field: impl Into<String>,
        required: bool,
        min_values: usize,
        max_values: usize,
        operators: impl IntoIterator<Item = FilterOperator>,
    ) -> Self {
        match FilterRule::new(field, T::VALUE_TYPE, required, min_values, max_values, operators) {
            Ok(rule) => self.with_step(rule),
            Err(err) => self.fail(err),
        }
    }

    /// Same as [`RuleSetBuilder::has_filter_type`], taking the field from a descriptor.
    pub fn has_field<M, T: FilterValueType>(
        self,
        field: Field<M, T>,
        required: bool,
        min_values: usize,
        max_values: usize,
        operators: impl IntoIterator<Item = FilterOperator>,
    ) -> Self {
        self.has_filter_type::<T>(field.name(), required, min_values, max_values, operators)
    }

    /// Appends a custom step, run after the steps already configured.
    pub fn with_step(mut self, step: impl ValidationStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    fn fail(mut self, err: ConfigError) -> Self {
        self.error.get_or_insert(err);
        self
    }

    /// Freezes the configuration, or reports the first argument error encountered.
    pub fn build(self) -> Result<RuleSet, ConfigError> {
        match self.error.clone() {
            Some(err) => Err(err),
            None => Ok(self.finish()),
        }
    }

    fn finish(self) -> RuleSet {
        RuleSet {
            steps: Arc::from(self.steps),
            allow_null_filter: self.allow_null_filter,
            allow_undefined_filters: self.allow_undefined_filters,
            max_depth: self.max_depth,
        }
    }
}

impl Default for RuleSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;
    use rstest::rstest;
    use FilterOperator::*;

    fn student_rules() -> RuleSetBuilder {
        RuleSet::builder()
            .has_filter_type::<i32>("Id", false, 1, 1, [EqualTo, NotEqualTo])
            .has_filter_type::<i32>("Id", false, 2, 3, [In, NotIn])
            .has_filter_type::<String>(
                "Name",
                false,
                1,
                1,
                [EqualTo, NotEqualTo, StartsWith, NotStartsWith, EndsWith, NotEndsWith],
            )
            .has_filter_type::<bool>("IsEnrolled", false, 1, 1, [EqualTo, NotEqualTo])
    }

    fn validate(builder: RuleSetBuilder, filter: Option<&FilterNode>) -> ValidationResult {
        builder
            .build()
            .expect("valid rule set")
            .validate(filter)
    }

    fn id_equal_to(id: i32) -> FilterNode {
        FilterNode::leaf("Id", EqualTo, [id])
    }

    #[test]
    fn matching_leaf_passes() {
        let result = validate(student_rules(), Some(&FilterNode::leaf("Name", StartsWith, ["Ja"])));

        assert_eq!(result, ValidationResult::success());
        assert!(result.message.is_empty());
    }

    #[rstest]
    #[case(FilterNode::or([]), "OrFilterChip values must contain at least 1 filter")]
    #[case(FilterNode::and([]), "AndFilterChip values must contain at least 1 filter")]
    #[case(
        FilterNode::new("", Some(FilterOperator::Or), Some(vec![FilterValue::Value(Bson::Int32(1))])),
        "OrFilterChip values must contain at least 1 filter"
    )]
    fn empty_composites_fail(#[case] filter: FilterNode, #[case] message: &str) {
        assert_eq!(validate(student_rules(), Some(&filter)), ValidationResult::failure(message));
    }

    #[rstest]
    #[case(FilterNode::or([id_equal_to(1)]))]
    #[case(FilterNode::and([id_equal_to(1)]))]
    #[case(FilterNode::and([id_equal_to(1), FilterNode::or([FilterNode::leaf("Name", EndsWith, ["Doe"])])]))]
    fn valid_composites_pass(#[case] filter: FilterNode) {
        assert!(validate(student_rules(), Some(&filter)).is_success);
    }

    #[test]
    fn leaf_holding_nested_filters_reports_value_type() {
        let filter = FilterNode::new(
            "Id",
            Some(EqualTo),
            Some(vec![FilterValue::Filter(FilterNode::leaf("Name", StartsWith, ["Ja"]))]),
        );

        assert_eq!(
            validate(student_rules(), Some(&filter)),
            ValidationResult::failure("Id filter values must be of type Int32")
        );
    }

    #[test]
    fn zero_max_depth_is_a_config_error() {
        assert_eq!(
            student_rules().with_max_depth(0).build().unwrap_err(),
            ConfigError::MaxFilterDepth
        );
    }

    #[test]
    fn exceeding_max_depth_fails() {
        let result = validate(
            student_rules().with_max_depth(1),
            Some(&FilterNode::or([id_equal_to(1)])),
        );

        assert_eq!(result.message, "Filter with depth of 2 found, max supported depth is 1");
    }

    #[test]
    fn within_max_depth_passes() {
        assert!(validate(student_rules().with_max_depth(1), Some(&id_equal_to(1))).is_success);
    }

    #[test]
    fn null_filter_is_allowed_by_default() {
        assert!(validate(student_rules(), None).is_success);
    }

    #[test]
    fn rejected_null_filter_fails() {
        let result = validate(student_rules().reject_null_filter(), None);

        assert_eq!(result.message, "Filter must not be null");
    }

    #[test]
    fn undefined_filter_fails() {
        let result = validate(student_rules(), Some(&FilterNode::leaf("foo", EqualTo, ["bar"])));

        assert_eq!(result.message, "Undefined filter provided");
    }

    #[test]
    fn undeclared_operator_is_undefined() {
        let result = validate(student_rules(), Some(&FilterNode::leaf("Id", LessThan, [10])));

        assert_eq!(result.message, "Undefined filter provided");
    }

    #[test]
    fn allowed_undefined_filter_passes() {
        let result = validate(
            student_rules().allow_undefined_filters(),
            Some(&FilterNode::leaf("foo", EqualTo, ["bar"])),
        );

        assert!(result.is_success);
    }

    #[test]
    fn duplicate_fields_fail_when_distinct() {
        let filter = FilterNode::and([
            FilterNode::leaf("Id", In, [1, 2, 3]),
            FilterNode::leaf("Id", NotIn, [4, 5, 6]),
        ]);

        let result = validate(student_rules().has_distinct_fields(), Some(&filter));

        assert_eq!(result.message, "Duplicate filter provided");
    }

    #[test]
    fn duplicate_fields_in_unrelated_branches_fail_when_distinct() {
        let filter = FilterNode::or([
            FilterNode::and([id_equal_to(1), FilterNode::leaf("Name", EqualTo, ["John Doe"])]),
            FilterNode::or([FilterNode::leaf("Name", StartsWith, ["Ja"])]),
        ]);

        let result = validate(student_rules().has_distinct_fields(), Some(&filter));

        assert_eq!(result.message, "Duplicate filter provided");
    }

    #[test]
    fn duplicate_fields_pass_by_default() {
        let filter = FilterNode::and([
            FilterNode::leaf("Id", In, [1, 2, 3]),
            FilterNode::leaf("Id", NotIn, [4, 5, 6]),
        ]);

        assert!(validate(student_rules(), Some(&filter)).is_success);
    }

    #[test]
    fn missing_required_field_fails() {
        let result = validate(
            student_rules().has_filter_type::<String>("Degree", true, 1, 1, [EqualTo, NotEqualTo]),
            Some(&FilterNode::or([id_equal_to(1)])),
        );

        assert_eq!(result.message, "Degree filter was not provided");
    }

    #[test]
    fn required_field_found_in_nested_branch_passes() {
        let filter = FilterNode::or([
            id_equal_to(1),
            FilterNode::and([FilterNode::leaf("Degree", EqualTo, ["Math"])]),
        ]);

        let result = validate(
            student_rules().has_filter_type::<String>("Degree", true, 1, 1, [EqualTo]),
            Some(&filter),
        );

        assert!(result.is_success);
    }

    #[test]
    fn missing_values_fail() {
        let result = validate(student_rules(), Some(&FilterNode::without_values("Name", EqualTo)));

        assert_eq!(result.message, "Name filter values must not be null");
    }

    #[rstest]
    #[case(vec![1])]
    #[case(vec![1, 2, 3, 4])]
    fn value_count_out_of_range_fails(#[case] ids: Vec<i32>) {
        let result = validate(student_rules(), Some(&FilterNode::leaf("Id", In, ids)));

        assert_eq!(result.message, "Id filter values length must be greater than 1 and less than 4");
    }

    #[rstest]
    #[case(Bson::Double(1.1))]
    #[case(Bson::Int64(1))]
    #[case(Bson::String("1".into()))]
    #[case(Bson::Null)]
    fn wrong_value_type_fails(#[case] value: Bson) {
        let result = validate(student_rules(), Some(&FilterNode::leaf("Id", EqualTo, [value])));

        assert_eq!(result.message, "Id filter values must be of type Int32");
    }

    #[test]
    fn nested_filter_as_leaf_value_fails_type_check() {
        let filter = FilterNode::new(
            "Id",
            Some(EqualTo),
            Some(vec![
                FilterValue::Value(Bson::Int32(1)),
                FilterValue::Filter(id_equal_to(2)),
            ]),
        );

        let result = validate(
            RuleSet::builder().has_filter_type::<i32>("Id", false, 1, 2, [EqualTo]),
            Some(&filter),
        );

        assert_eq!(result.message, "Id filter values must be of type Int32");
    }

    #[rstest]
    #[case(0, 0, ConfigError::MinValueCount)]
    #[case(1, 0, ConfigError::MaxValueCount(1))]
    #[case(3, 2, ConfigError::MaxValueCount(3))]
    fn invalid_value_counts_are_config_errors(#[case] min: usize, #[case] max: usize, #[case] expected: ConfigError) {
        let err = RuleSet::builder()
            .has_filter_type::<i32>("foo", false, min, max, [In])
            .build()
            .unwrap_err();

        assert_eq!(err, expected);
    }

    #[test]
    fn composite_operator_in_rule_is_a_config_error() {
        let err = RuleSet::builder()
            .has_filter_type::<i32>("Id", false, 1, 1, [EqualTo, And])
            .build()
            .unwrap_err();

        assert_eq!(err, ConfigError::CompositeOperator("And".to_string(), "Id".to_string()));
    }

    #[test]
    fn rule_without_operators_is_a_config_error() {
        let err = RuleSet::builder()
            .has_filter_type::<i32>("Id", false, 1, 1, [])
            .build()
            .unwrap_err();

        assert_eq!(err, ConfigError::NoOperators("Id".to_string()));
    }

    #[test]
    fn first_config_error_wins() {
        let err = RuleSet::builder()
            .with_max_depth(0)
            .has_filter_type::<i32>("foo", false, 0, 1, [In])
            .build()
            .unwrap_err();

        assert_eq!(err, ConfigError::MaxFilterDepth);
    }

    #[test]
    fn rules_run_in_registration_order() {
        // Both steps fail; the one configured first reports.
        let filter = FilterNode::and([
            FilterNode::leaf("Id", In, [1, 2]),
            FilterNode::leaf("Id", NotIn, [Bson::Double(1.0), Bson::Double(2.0)]),
        ]);

        let distinct_first = RuleSet::builder()
            .has_distinct_fields()
            .has_filter_type::<i32>("Id", false, 1, 3, [In, NotIn]);
        let rule_first = RuleSet::builder()
            .has_filter_type::<i32>("Id", false, 1, 3, [In, NotIn])
            .has_distinct_fields();

        assert_eq!(validate(distinct_first, Some(&filter)).message, "Duplicate filter provided");
        assert_eq!(validate(rule_first, Some(&filter)).message, "Id filter values must be of type Int32");
    }

    #[derive(Debug)]
    struct RejectEverything;

    impl ValidationStep for RejectEverything {
        fn check(&self, _filters: &[&FilterNode], _recognized: &mut [bool]) -> ValidationResult {
            ValidationResult::failure("nope")
        }
    }

    #[test]
    fn custom_steps_participate() {
        let result = validate(student_rules().with_step(RejectEverything), Some(&id_equal_to(1)));

        assert_eq!(result.into_result(), Err("nope".to_string()));
    }

    #[test]
    fn permissive_accepts_anything() {
        let rules = RuleSet::permissive();

        assert!(rules.validate(None).is_success);
        assert!(rules.validate(Some(&FilterNode::leaf("foo", LessThan, [1.5]))).is_success);
    }
}
