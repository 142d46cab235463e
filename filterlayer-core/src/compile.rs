//! Compiles filter trees into predicate expressions.
//!
//! A [`PredicateCompiler`] maps `(field, operator)` pairs to constructors that turn a
//! leaf's decoded values into an [`Expr`]. Composite nodes compile into n-ary
//! `And`/`Or` expressions over their compiled children.
//!
//! ```ignore
//! let compiler = PredicateCompiler::<Student>::builder()
//!     .with_filter(Student::ID, FilterOperator::In, |ids| Filter::any_of("id", ids))
//!     .with_filter(Student::NAME, FilterOperator::StartsWith, |names| {
//!         Filter::starts_with("name", names[0].clone())
//!     })
//!     .build()?;
//!
//! let expr = compiler.compile(&filter)?;
//! ```

use std::{collections::HashMap, fmt, marker::PhantomData, sync::Arc};

use bson::{Bson, ser::serialize_to_bson};
use serde::Serialize;
use tracing::{trace, warn};

use crate::{
    error::{ConfigError, DataLayerError, DataLayerResult},
    evaluator::DocumentEvaluator,
    filter::{Field, FilterNode, FilterOperator, FilterValue, FilterValueType},
    page::Pagination,
    query::{Expr, Query, QueryBuilder},
};

type Constructor = Arc<dyn Fn(&str, &[FilterValue]) -> DataLayerResult<Expr> + Send + Sync>;

/// A frozen registry of predicate constructors for model `M`.
pub struct PredicateCompiler<M> {
    registry: HashMap<(String, FilterOperator), Constructor>,
    _marker: PhantomData<fn() -> M>,
}

impl<M> PredicateCompiler<M> {
    pub fn builder() -> PredicateCompilerBuilder<M> {
        PredicateCompilerBuilder::new()
    }

    /// Returns `true` if a constructor is registered for `field` and `operator`.
    pub fn supports(&self, field: &str, operator: FilterOperator) -> bool {
        self.registry
            .contains_key(&(field.to_string(), operator))
    }

    /// Compiles a filter tree into one predicate expression.
    pub fn compile(&self, filter: &FilterNode) -> DataLayerResult<Expr> {
        match filter.operator() {
            Some(operator @ (FilterOperator::And | FilterOperator::Or)) => self.compile_composite(filter, operator),
            Some(operator) => self.compile_leaf(filter, operator),
            None => Err(DataLayerError::UnsupportedFilter(format!(
                "No {} filter definition found for null operator",
                filter.field()
            ))),
        }
    }

    fn compile_composite(&self, filter: &FilterNode, operator: FilterOperator) -> DataLayerResult<Expr> {
        if filter
            .values()
            .unwrap_or_default()
            .iter()
            .any(|value| value.as_filter().is_none())
        {
            return Err(DataLayerError::UnsupportedFilter(format!(
                "{} values must only contain filters",
                filter.composite_kind().unwrap_or("Composite"),
            )));
        }

        let mut children = filter
            .children()
            .map(|child| self.compile(child))
            .collect::<DataLayerResult<Vec<_>>>()?;

        if children.is_empty() {
            warn!(operator = %operator, "empty composite filter compiled to a match-all predicate");
            return Ok(Expr::always());
        }

        if children.len() == 1 {
            return Ok(children.remove(0));
        }

        Ok(match operator {
            FilterOperator::Or => Expr::Or(children),
            _ => Expr::And(children),
        })
    }

    fn compile_leaf(&self, filter: &FilterNode, operator: FilterOperator) -> DataLayerResult<Expr> {
        let constructor = self
            .registry
            .get(&(filter.field().to_string(), operator))
            .ok_or_else(|| {
                DataLayerError::UnsupportedFilter(format!(
                    "No {} filter definition found for {operator} operator",
                    filter.field()
                ))
            })?;

        let values = filter.values().ok_or_else(|| {
            DataLayerError::UnsupportedFilter(format!("{} filter values must not be null", filter.field()))
        })?;

        trace!(field = filter.field(), operator = %operator, values = values.len(), "compiling leaf filter");

        constructor(filter.field(), values)
    }

    /// Compiles an optional filter and a page window into a backend query.
    pub fn to_query(
        &self,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<Query> {
        let mut builder = QueryBuilder::new();

        if let Some(filter) = filter {
            builder = builder.filter(self.compile(filter)?);
        }
        if let Some(pagination) = Pagination::from_parts(page, page_size) {
            builder = pagination.apply(builder);
        }

        Ok(builder.build())
    }
}

impl<M: Serialize> PredicateCompiler<M> {
    /// Filters an in-memory sequence of records, then applies the page window.
    ///
    /// Records keep the order `records` yields them in. Without a filter every
    /// record matches.
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
        let expr = filter
            .map(|filter| self.compile(filter))
            .transpose()?;

        let mut matched = Vec::new();
        for record in records {
            let keep = match &expr {
                Some(expr) => DocumentEvaluator::matches(&serialize_to_bson(&record)?, expr)?,
                None => true,
            };

            if keep {
                matched.push(record);
            }
        }

        Ok(match Pagination::from_parts(page, page_size) {
            Some(pagination) => pagination.paginate(matched).collect(),
            None => matched,
        })
    }

    /// Counts the records [`PredicateCompiler::find_by_filter`] would return.
    pub fn count_by_filter<I>(
        &self,
        records: I,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<u64>
    where
        I: IntoIterator<Item = M>,
    {
        Ok(self
            .find_by_filter(records, filter, page, page_size)?
            .len() as u64)
    }
}

impl<M> Clone for PredicateCompiler<M> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            _marker: PhantomData,
        }
    }
}

impl<M> Default for PredicateCompiler<M> {
    fn default() -> Self {
        Self {
            registry: HashMap::new(),
            _marker: PhantomData,
        }
    }
}

impl<M> fmt::Debug for PredicateCompiler<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = self
            .registry
            .keys()
            .map(|(field, operator)| format!("{field} {operator}"))
            .collect::<Vec<_>>();
        keys.sort();

        f.debug_struct("PredicateCompiler")
            .field("registry", &keys)
            .finish()
    }
}

/// Builder for [`PredicateCompiler`].
pub struct PredicateCompilerBuilder<M> {
    registry: HashMap<(String, FilterOperator), Constructor>,
    error: Option<ConfigError>,
    _marker: PhantomData<fn() -> M>,
}

impl<M> PredicateCompilerBuilder<M> {
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
            error: None,
            _marker: PhantomData,
        }
    }

    /// Registers a constructor for leaves on `field` using `operator`.
    pub fn with_filter<T, F>(self, field: Field<M, T>, operator: FilterOperator, constructor: F) -> Self
    where
        T: FilterValueType,
        F: Fn(Vec<T>) -> Expr + Send + Sync + 'static,
    {
        self.with_named_filter(field.name(), operator, constructor)
    }

    /// Registers a constructor under a plain field name.
    pub fn with_named_filter<T, F>(mut self, field: impl Into<String>, operator: FilterOperator, constructor: F) -> Self
    where
        T: FilterValueType,
        F: Fn(Vec<T>) -> Expr + Send + Sync + 'static,
    {
        let field = field.into();

        if operator.is_composite() {
            self.error
                .get_or_insert(ConfigError::CompositeOperator(operator.to_string(), field));
            return self;
        }

        let key = (field, operator);
        if self.registry.contains_key(&key) {
            let (field, operator) = key;
            self.error
                .get_or_insert(ConfigError::DuplicateDefinition(field, operator.to_string()));
            return self;
        }

        let build: Constructor = Arc::new(move |field: &str, values: &[FilterValue]| {
            let decoded = values
                .iter()
                .map(|value| value.as_value().and_then(T::from_bson))
                .collect::<Option<Vec<T>>>()
                .ok_or_else(|| {
                    DataLayerError::UnsupportedFilter(format!(
                        "{field} filter values must be of type {}",
                        T::VALUE_TYPE
                    ))
                })?;

            Ok(constructor(decoded))
        });

        self.registry.insert(key, build);
        self
    }

    pub fn build(self) -> Result<PredicateCompiler<M>, ConfigError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        Ok(PredicateCompiler {
            registry: self.registry,
            _marker: PhantomData,
        })
    }
}

impl<M> Default for PredicateCompilerBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps scalar values for constructors that take a whole value list, such as `In`.
pub fn bson_array<T: FilterValueType>(values: Vec<T>) -> Bson {
    Bson::Array(
        values
            .into_iter()
            .map(T::into_bson)
            .collect(),
    )
}
