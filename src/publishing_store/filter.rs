//! Composable filter expressions for listing queries.
//!
//! A [`Filter`] is a small tagged tree that the SQLite store renders into a
//! parameterized `WHERE` clause and the in-memory store evaluates directly.
//! Caller-supplied text only ever travels as a bound parameter.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

/// Logical fields a filter can address.
///
/// Each store maps these onto its own columns; `Datestamp` is the last
/// modification date for live entries and the deletion date for tombstones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    RecordId,
    VenueId,
    SectionId,
    Datestamp,
    SetSpec,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl FilterValue {
    fn compare(&self, other: &FilterValue) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (FilterValue::Int(a), FilterValue::Int(b)) => Some(a.cmp(b)),
            (FilterValue::Text(a), FilterValue::Text(b)) => Some(a.cmp(b)),
            (FilterValue::Timestamp(a), FilterValue::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    Eq(Field, FilterValue),
    /// Inclusive on both ends; a missing bound is open.
    Range {
        field: Field,
        from: Option<FilterValue>,
        until: Option<FilterValue>,
    },
    /// An empty list matches nothing.
    In(Field, Vec<FilterValue>),
    /// An empty conjunction matches everything.
    And(Vec<Filter>),
}

/// Anything a [`Filter`] can be evaluated against in memory.
pub trait FilterTarget {
    fn field(&self, field: Field) -> Option<FilterValue>;
}

/// A rendered `WHERE` clause with its positional parameters.
#[derive(Debug, PartialEq)]
pub struct SqlFragment {
    pub clause: String,
    pub params: Vec<FilterValue>,
}

impl Filter {
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    pub fn eq(field: Field, value: impl Into<FilterValue>) -> Self {
        Filter::Eq(field, value.into())
    }

    /// Builds a range over timestamps, or `None` if both bounds are open.
    pub fn date_range(
        field: Field,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        if from.is_none() && until.is_none() {
            return None;
        }
        Some(Filter::Range {
            field,
            from: from.map(FilterValue::from),
            until: until.map(FilterValue::from),
        })
    }

    /// Conjunction that flattens nested `And`s.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut flat = Vec::new();
        for filter in filters {
            match filter {
                Filter::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Filter::And(flat)
    }

    pub fn matches(&self, target: &dyn FilterTarget) -> bool {
        match self {
            Filter::Eq(field, expected) => target.field(*field).as_ref() == Some(expected),
            Filter::Range { field, from, until } => {
                let Some(actual) = target.field(*field) else {
                    return false;
                };
                let after_from = from.as_ref().map_or(true, |from| {
                    matches!(
                        actual.compare(from),
                        Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
                    )
                });
                let before_until = until.as_ref().map_or(true, |until| {
                    matches!(
                        actual.compare(until),
                        Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                    )
                });
                after_from && before_until
            }
            Filter::In(field, values) => target
                .field(*field)
                .is_some_and(|actual| values.contains(&actual)),
            Filter::And(filters) => filters.iter().all(|f| f.matches(target)),
        }
    }

    /// Renders the filter against a column mapping.
    ///
    /// Fails if the filter references a field the mapping does not provide.
    pub fn to_sql(&self, column: &dyn Fn(Field) -> Option<&'static str>) -> Result<SqlFragment> {
        let mut params = Vec::new();
        let clause = self.render(column, &mut params)?;
        Ok(SqlFragment { clause, params })
    }

    fn render(
        &self,
        column: &dyn Fn(Field) -> Option<&'static str>,
        params: &mut Vec<FilterValue>,
    ) -> Result<String> {
        let resolve = |field: Field| match column(field) {
            Some(name) => Ok(name),
            None => bail!("Field {:?} is not available in this query", field),
        };

        match self {
            Filter::Eq(field, value) => {
                let name = resolve(*field)?;
                params.push(value.clone());
                Ok(format!("{} = ?{}", name, params.len()))
            }
            Filter::Range { field, from, until } => {
                let name = resolve(*field)?;
                let mut parts = Vec::new();
                if let Some(from) = from {
                    params.push(from.clone());
                    parts.push(format!("{} >= ?{}", name, params.len()));
                }
                if let Some(until) = until {
                    params.push(until.clone());
                    parts.push(format!("{} <= ?{}", name, params.len()));
                }
                if parts.is_empty() {
                    Ok("1 = 1".to_string())
                } else {
                    Ok(format!("({})", parts.join(" AND ")))
                }
            }
            Filter::In(field, values) => {
                let name = resolve(*field)?;
                if values.is_empty() {
                    return Ok("0 = 1".to_string());
                }
                let placeholders = values
                    .iter()
                    .map(|value| {
                        params.push(value.clone());
                        format!("?{}", params.len())
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                Ok(format!("{} IN ({})", name, placeholders))
            }
            Filter::And(filters) => {
                if filters.is_empty() {
                    return Ok("1 = 1".to_string());
                }
                let parts = filters
                    .iter()
                    .map(|f| f.render(column, params))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("({})", parts.join(" AND ")))
            }
        }
    }
}
