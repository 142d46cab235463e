//! Validation rules and predicate constructors for one entity type, kept together.

use std::fmt;

use serde::Serialize;

use crate::{
    compile::{PredicateCompiler, PredicateCompilerBuilder},
    error::{ConfigError, DataLayerResult},
    filter::{Field, FilterNode, FilterOperator, FilterValueType},
    query::{Expr, Query},
    validate::{RuleSet, RuleSetBuilder, ValidationResult, ValidationStep},
};

/// A [`RuleSet`] paired with the [`PredicateCompiler`] that executes what it accepts.
pub struct FilterSet<M> {
    rules: RuleSet,
    compiler: PredicateCompiler<M>,
}

impl<M> FilterSet<M> {
    pub fn new(rules: RuleSet, compiler: PredicateCompiler<M>) -> Self {
        Self { rules, compiler }
    }

    pub fn builder() -> FilterSetBuilder<M> {
        FilterSetBuilder::new()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn compiler(&self) -> &PredicateCompiler<M> {
        &self.compiler
    }

    pub fn validate(&self, filter: Option<&FilterNode>) -> ValidationResult {
        self.rules.validate(filter)
    }

    pub fn compile(&self, filter: &FilterNode) -> DataLayerResult<Expr> {
        self.compiler.compile(filter)
    }

    pub fn to_query(
        &self,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<Query> {
        self.compiler.to_query(filter, page, page_size)
    }
}

impl<M: Serialize> FilterSet<M> {
    /// Filters an in-memory sequence. The filter is compiled without validation.
    pub fn find_by_filter<I>(
        &self,
        records: I,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<Vec<M>>
    where
        I: IntoIterator<Item = M>,
    {
        self.compiler
            .find_by_filter(records, filter, page, page_size)
    }
}

impl<M> Default for FilterSet<M> {
    /// Accepts any filter and supports none, so only a missing filter executes.
    fn default() -> Self {
        Self::new(RuleSet::permissive(), PredicateCompiler::default())
    }
}

impl<M> fmt::Debug for FilterSet<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSet")
            .field("rules", &self.rules)
            .field("compiler", &self.compiler)
            .finish()
    }
}

/// Builds the rule set and the compiler side by side.
pub struct FilterSetBuilder<M> {
    rules: RuleSetBuilder,
    compiler: PredicateCompilerBuilder<M>,
}

impl<M> FilterSetBuilder<M> {
    pub fn new() -> Self {
        Self {
            rules: RuleSetBuilder::new(),
            compiler: PredicateCompilerBuilder::new(),
        }
    }

    /// Adjusts the tree-wide policies or adds rules directly.
    pub fn rules(mut self, configure: impl FnOnce(RuleSetBuilder) -> RuleSetBuilder) -> Self {
        self.rules = configure(self.rules);
        self
    }

    /// Declares that `field` accepts `operator` with between `min_values` and
    /// `max_values` values, and registers the constructor that executes it.
    pub fn with_filter<T, F>(
        mut self,
        field: Field<M, T>,
        required: bool,
        min_values: usize,
        max_values: usize,
        operator: FilterOperator,
        constructor: F,
    ) -> Self
    where
        T: FilterValueType,
        F: Fn(Vec<T>) -> Expr + Send + Sync + 'static,
    {
        self.rules = self
            .rules
            .has_field(field, required, min_values, max_values, [operator]);
        self.compiler = self
            .compiler
            .with_filter(field, operator, constructor);
        self
    }

    pub fn with_step(mut self, step: impl ValidationStep + 'static) -> Self {
        self.rules = self.rules.with_step(step);
        self
    }

    /// Reports the first rule error, then the first compiler error.
    pub fn build(self) -> Result<FilterSet<M>, ConfigError> {
        Ok(FilterSet::new(self.rules.build()?, self.compiler.build()?))
    }
}

impl<M> Default for FilterSetBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}
