//! Backend-independent query option vocabulary.
//!
//! Every backend has to give a [`QueryOptions`] value the same meaning:
//! filters are ANDed together, results are sorted by sequence id
//! (ascending unless told otherwise), then the offset is skipped and the
//! limit applied. [`QueryOptions::apply`] is the reference evaluation; SQL
//! backends translate the same steps into their native query.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::record::Record;

/// A single record predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `aggregate_id == value`. Used by `load_by_aggregate`.
    Aggregate(String),
    /// `sequence_id > value`.
    SequenceIdAfter(String),
    /// `type == value`.
    TypeEquals(String),
    /// `timestamp > value`.
    TimestampAfter(i64),
}

impl Filter {
    /// Evaluates the predicate against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Aggregate(id) => record.aggregate_id == *id,
            Self::SequenceIdAfter(id) => record.sequence_id.as_str() > id.as_str(),
            Self::TypeEquals(name) => record.type_name == *name,
            Self::TimestampAfter(ts) => record.timestamp > *ts,
        }
    }
}

/// Sort direction by sequence id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

/// What a backend can evaluate natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub sequence_id_filter: bool,
    pub type_filter: bool,
    pub timestamp_filter: bool,
    pub limit: bool,
    pub offset: bool,
    pub descending: bool,
}

impl Capabilities {
    /// Every option in the vocabulary.
    pub const ALL: Self = Self {
        sequence_id_filter: true,
        type_filter: true,
        timestamp_filter: true,
        limit: true,
        offset: true,
        descending: true,
    };
}

/// Options narrowing a load: filters, limit, offset and direction.
///
/// ```
/// use eventsource_core::query::QueryOptions;
///
/// let options = QueryOptions::new()
///     .by_sequence_id("01H00000000000000000000000")
///     .by_type("AccountOpened")
///     .with_limit(10)
///     .descending();
/// assert_eq!(options.limit(), Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    filters: Vec<Filter>,
    limit: Option<usize>,
    offset: Option<usize>,
    order: Order,
}

impl QueryOptions {
    /// No filters, no limit, ascending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an arbitrary filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Only records with a sequence id strictly greater than `sequence_id`.
    #[must_use]
    pub fn by_sequence_id(self, sequence_id: impl Into<String>) -> Self {
        self.with_filter(Filter::SequenceIdAfter(sequence_id.into()))
    }

    /// Only records of the given type.
    #[must_use]
    pub fn by_type(self, type_name: impl Into<String>) -> Self {
        self.with_filter(Filter::TypeEquals(type_name.into()))
    }

    /// Only records with a timestamp strictly greater than `timestamp`.
    #[must_use]
    pub fn by_timestamp(self, timestamp: i64) -> Self {
        self.with_filter(Filter::TimestampAfter(timestamp))
    }

    /// Restricts to one aggregate.
    #[must_use]
    pub fn by_aggregate(self, aggregate_id: impl Into<String>) -> Self {
        self.with_filter(Filter::Aggregate(aggregate_id.into()))
    }

    /// Caps the number of returned records.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` matching records.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn ascending(mut self) -> Self {
        self.order = Order::Ascending;
        self
    }

    #[must_use]
    pub fn descending(mut self) -> Self {
        self.order = Order::Descending;
        self
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    #[must_use]
    pub fn order(&self) -> Order {
        self.order
    }

    /// `true` if the record passes every filter.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|filter| filter.matches(record))
    }

    /// Compares two records in the requested direction.
    #[must_use]
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ordering = a.sequence_id.cmp(&b.sequence_id);
        match self.order {
            Order::Ascending => ordering,
            Order::Descending => ordering.reverse(),
        }
    }

    /// Filters, sorts and pages `records`.
    #[must_use]
    pub fn apply<I>(&self, records: I) -> Vec<Record>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut matching: Vec<Record> = records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect();
        matching.sort_by(|a, b| self.compare(a, b));

        matching
            .into_iter()
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Verifies that `backend` can evaluate every requested option.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unsupported` naming the first unsupported option.
    pub fn check(&self, capabilities: Capabilities, backend: &'static str) -> Result<()> {
        let unsupported =
            |option: &'static str| -> Result<()> { Err(Error::Unsupported { backend, option }) };

        for filter in &self.filters {
            match filter {
                Filter::SequenceIdAfter(_) if !capabilities.sequence_id_filter => {
                    return unsupported("sequence id filter");
                }
                Filter::TypeEquals(_) if !capabilities.type_filter => {
                    return unsupported("type filter");
                }
                Filter::TimestampAfter(_) if !capabilities.timestamp_filter => {
                    return unsupported("timestamp filter");
                }
                _ => {}
            }
        }
        if self.limit.is_some() && !capabilities.limit {
            return unsupported("limit");
        }
        if self.offset.is_some() && !capabilities.offset {
            return unsupported("offset");
        }
        if self.order == Order::Descending && !capabilities.descending {
            return unsupported("descending order");
        }
        Ok(())
    }
}
