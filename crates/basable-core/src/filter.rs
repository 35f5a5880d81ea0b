//! Filter catalog and compiler
//!
//! Turns user-entered filter rows ([`FilterInput`]) into the wire-format
//! expressions ([`CompiledFilter`]) the backend evaluates. The first filter of
//! any list is the anchor and carries [`Combinator::Base`]; every later filter
//! joins the predicate before it with `AND` or `OR`.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{EnumString, IntoStaticStr};

use crate::error::{BasableError, Result};


/// Filter operators offered to the user, in display order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum FilterOperator {
    // Equality operators
    #[default]
    Equal,
    NotEqual,

    // Comparison operators
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,

    // Pattern operators
    Like,
    NotLike,
    LikeSingle,
    NotLikeSingle,
    Regex,
    NotRegex,

    // Range operators
    Range,
    NotRange,

    // List operators
    Contains,
    NotContains,

    // NULL operators
    Null,
    NotNull,
}

/// How an operator rewrites the raw value before it goes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTransform {
    PassThrough,
    /// `abc` becomes `abc%`
    PrefixMatch,
    /// `abc` becomes `_abc%`
    SingleCharPrefix,
    /// start and end become `('start' AND 'end')`
    Range,
}

impl ValueTransform {
    fn apply(self, column: &str, value: &str, end_value: Option<&str>) -> Result<String> {
        match self {
            Self::PassThrough => Ok(value.to_string()),
            Self::PrefixMatch => Ok(format!("{}%", value)),
            Self::SingleCharPrefix => Ok(format!("_{}%", value)),
            Self::Range => {
                let end = end_value
                    .filter(|end| !end.is_empty())
                    .ok_or_else(|| BasableError::MissingRangeEnd {
                        column: column.to_string(),
                    })?;
                if value.is_empty() {
                    return Err(BasableError::MissingRangeEnd {
                        column: column.to_string(),
                    });
                }
                Ok(format!("('{}' AND '{}')", value, end))
            }
        }
    }
}

impl FilterOperator {
    /// Label shown to the user and accepted from text input (`GREATER_THAN`)
    pub fn label(&self) -> &'static str {
        self.into()
    }

    /// Parse a label, ignoring ASCII case
    pub fn from_label(label: &str) -> Result<Self> {
        Self::from_str(label.trim()).map_err(|_| BasableError::UnknownOperator(label.to_string()))
    }

    /// Operator key understood by the backend
    pub fn key(&self) -> &'static str {
        match self {
            Self::Equal => "Eq",
            Self::NotEqual => "NotEq",
            Self::GreaterThan => "Gt",
            Self::LessThan => "Lt",
            Self::GreaterOrEqual => "Gte",
            Self::LessOrEqual => "Lte",
            Self::Like => "Like",
            Self::NotLike => "NotLike",
            Self::LikeSingle => "LikeSingle",
            Self::NotLikeSingle => "NotLikeSingle",
            Self::Regex => "Regex",
            Self::NotRegex => "NotRegex",
            Self::Range => "Btw",
            Self::NotRange => "NotBtw",
            Self::Contains => "Contains",
            Self::NotContains => "NotContains",
            Self::Null => "Null",
            Self::NotNull => "NotNull",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|op| op.key() == key)
    }

    /// SQL-like symbol, for display
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Like | Self::LikeSingle => "LIKE",
            Self::NotLike | Self::NotLikeSingle => "NOT LIKE",
            Self::Regex => "REGEXP",
            Self::NotRegex => "NOT REGEXP",
            Self::Range => "BETWEEN",
            Self::NotRange => "NOT BETWEEN",
            Self::Contains => "IN",
            Self::NotContains => "NOT IN",
            Self::Null => "IS NULL",
            Self::NotNull => "IS NOT NULL",
        }
    }

    pub fn transform(&self) -> ValueTransform {
        match self {
            Self::Like | Self::NotLike => ValueTransform::PrefixMatch,
            Self::LikeSingle | Self::NotLikeSingle => ValueTransform::SingleCharPrefix,
            Self::Range | Self::NotRange => ValueTransform::Range,
            _ => ValueTransform::PassThrough,
        }
    }

    /// Returns true if this operator requires a value input
    pub fn requires_value(&self) -> bool {
        !matches!(self, Self::Null | Self::NotNull)
    }

    /// Returns true if this operator requires two values (for ranges)
    pub fn requires_two_values(&self) -> bool {
        matches!(self, Self::Range | Self::NotRange)
    }

    /// Get all available operators in display order
    pub fn all() -> &'static [FilterOperator] {
        &[
            Self::Equal,
            Self::NotEqual,
            Self::GreaterThan,
            Self::LessThan,
            Self::GreaterOrEqual,
            Self::LessOrEqual,
            Self::Like,
            Self::NotLike,
            Self::LikeSingle,
            Self::NotLikeSingle,
            Self::Regex,
            Self::NotRegex,
            Self::Range,
            Self::NotRange,
            Self::Contains,
            Self::NotContains,
            Self::Null,
            Self::NotNull,
        ]
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Boolean joiner between a filter and the predicate before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Combinator {
    /// The anchor: first filter of a list, no joiner
    #[default]
    #[serde(rename = "BASE", alias = "base")]
    Base,
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

impl Combinator {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Base => "BASE",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            Self::Base => Self::Base,
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }
}

impl FromStr for Combinator {
    type Err = BasableError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(Self::Base),
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            other => Err(BasableError::UnknownOperator(other.to_string())),
        }
    }
}

/// A single filter condition as entered by the user
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterInput {
    pub column: String,
    pub combinator: Combinator,
    pub operator: FilterOperator,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_value: Option<String>,
}

impl FilterInput {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            combinator: Combinator::Base,
            operator,
            value: value.into(),
            end_value: None,
        }
    }

    pub fn and(mut self) -> Self {
        self.combinator = Combinator::And;
        self
    }

    pub fn or(mut self) -> Self {
        self.combinator = Combinator::Or;
        self
    }

    pub fn with_combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    pub fn with_end_value(mut self, end_value: impl Into<String>) -> Self {
        self.end_value = Some(end_value.into());
        self
    }
}

/// `{ <operator key>: <transformed value> }` on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpression {
    pub operator: FilterOperator,
    pub value: String,
}

impl Serialize for FilterExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.operator.key(), &self.value)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for FilterExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ExpressionVisitor;

        impl<'de> Visitor<'de> for ExpressionVisitor {
            type Value = FilterExpression;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a single-key map of operator key to value")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let (key, value): (String, String) = map
                    .next_entry()?
                    .ok_or_else(|| de::Error::custom("empty filter expression"))?;
                if map.next_key::<String>()?.is_some() {
                    return Err(de::Error::custom("filter expression must have exactly one key"));
                }
                let operator = FilterOperator::from_key(&key)
                    .ok_or_else(|| de::Error::custom(format!("unknown operator key `{}`", key)))?;
                Ok(FilterExpression { operator, value })
            }
        }

        deserializer.deserialize_map(ExpressionVisitor)
    }
}

/// Wire-format filter, only ever produced by [`compile`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledFilter {
    pub column: String,
    pub combinator: Combinator,
    pub expression: FilterExpression,
}

impl fmt::Display for CompiledFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.combinator != Combinator::Base {
            write!(f, "{} ", self.combinator.keyword())?;
        }
        let FilterExpression { operator, value } = &self.expression;
        match operator.transform() {
            _ if !operator.requires_value() => write!(f, "{} {}", self.column, operator.symbol()),
            ValueTransform::Range => write!(f, "{} {} {}", self.column, operator.symbol(), value),
            _ => write!(f, "{} {} '{}'", self.column, operator.symbol(), value),
        }
    }
}

/// Compile one filter row against the table's column names.
pub fn compile<S: AsRef<str>>(filter: &FilterInput, columns: &[S]) -> Result<CompiledFilter> {
    let column = filter.column.trim();
    if column.is_empty() {
        return Err(BasableError::EmptyFilterColumn);
    }
    if !columns.iter().any(|c| c.as_ref() == column) {
        return Err(BasableError::UnknownColumn(column.to_string()));
    }

    let value = filter.operator.transform().apply(
        column,
        &filter.value,
        filter.end_value.as_deref(),
    )?;

    Ok(CompiledFilter {
        column: column.to_string(),
        combinator: filter.combinator,
        expression: FilterExpression {
            operator: filter.operator,
            value,
        },
    })
}

/// Check the anchor invariant: index 0 is `Base`, every later filter is `And`/`Or`.
pub fn validate_sequence(filters: &[FilterInput]) -> Result<()> {
    for (index, filter) in filters.iter().enumerate() {
        let anchored = index == 0;
        if anchored != (filter.combinator == Combinator::Base) {
            return Err(BasableError::InvalidCombinator {
                index,
                combinator: filter.combinator,
            });
        }
    }
    Ok(())
}

/// Ordered filter rows that always satisfy the anchor invariant
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<FilterInput>", into = "Vec<FilterInput>")]
pub struct FilterList {
    filters: Vec<FilterInput>,
}

impl FilterList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter. The first filter becomes the anchor whatever its
    /// combinator; later filters must be `And` or `Or`.
    pub fn push(&mut self, mut filter: FilterInput) -> Result<()> {
        if self.filters.is_empty() {
            filter.combinator = Combinator::Base;
        } else if filter.combinator == Combinator::Base {
            return Err(BasableError::InvalidCombinator {
                index: self.filters.len(),
                combinator: filter.combinator,
            });
        }
        self.filters.push(filter);
        Ok(())
    }

    /// Remove the filter at `index`; the new first filter is promoted to anchor.
    pub fn remove_at(&mut self, index: usize) -> Option<FilterInput> {
        if index >= self.filters.len() {
            return None;
        }
        let removed = self.filters.remove(index);
        if let Some(first) = self.filters.first_mut() {
            first.combinator = Combinator::Base;
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterInput> {
        self.filters.iter()
    }

    pub fn as_slice(&self) -> &[FilterInput] {
        &self.filters
    }

    /// Compile every filter; fails on the first invalid row.
    pub fn compile<S: AsRef<str>>(&self, columns: &[S]) -> Result<Vec<CompiledFilter>> {
        validate_sequence(&self.filters)?;
        self.filters.iter().map(|f| compile(f, columns)).collect()
    }
}

impl TryFrom<Vec<FilterInput>> for FilterList {
    type Error = BasableError;

    fn try_from(filters: Vec<FilterInput>) -> Result<Self> {
        validate_sequence(&filters)?;
        Ok(Self { filters })
    }
}

impl From<FilterList> for Vec<FilterInput> {
    fn from(list: FilterList) -> Self {
        list.filters
    }
}

/// Render compiled filters as a readable predicate, e.g. `status = 'paid' AND total > '100'`
pub fn describe(filters: &[CompiledFilter]) -> String {
    filters
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
