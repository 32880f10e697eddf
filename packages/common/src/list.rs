//! Wire shapes for listing entities: filter, sort and context windows.
//!
//! These are shared between the HTTP layer, saved list presets (stored as
//! JSON) and the query builder.

use serde::{Deserialize, Serialize};

use crate::DataType;

/// Which entities a list should contain.
///
/// A missing filter means "everything the caller owns" (see [`ListFilter::default`]).
/// Fields missing from a supplied filter fall back to their zero value, so a
/// partial filter constrains instead of matching everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    /// Skip every predicate except ownership.
    #[serde(default)]
    pub include_all: bool,
    /// Entities without any tag also match the tag predicate.
    #[serde(default)]
    pub include_untagged: bool,
    /// Skip the tag predicate entirely.
    #[serde(default)]
    pub include_all_tagging: bool,
    #[serde(default)]
    pub tagging: TaggingFilter,
    #[serde(default)]
    pub time: TimeFilter,
    #[serde(default)]
    pub text: Vec<TextRule>,
    /// Restrict to these entity config ids. Empty means any type.
    #[serde(default)]
    pub include_types: Vec<i32>,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            include_all: true,
            include_untagged: true,
            include_all_tagging: true,
            tagging: TaggingFilter::default(),
            time: TimeFilter::AllTime,
            text: Vec::new(),
            include_types: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaggingFilter {
    #[serde(default)]
    pub contains_one_of: Vec<String>,
    #[serde(default)]
    pub contains_all_of: Vec<String>,
}

/// Constraint on the entity's `createdAt`.
///
/// Dates are `YYYY-MM-DD` (read as UTC midnight) or RFC 3339 instants. End
/// dates are padded by 24 hours so the whole calendar day is included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeFilter {
    #[default]
    #[serde(alias = "allTime")]
    AllTime,
    #[serde(alias = "exactDate")]
    ExactDate { date: String },
    #[serde(alias = "range")]
    Range { start: String, end: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextRule {
    #[serde(rename = "type")]
    pub kind: TextMatch,
    pub sub_str: String,
}

/// Case-insensitive comparison applied by a [`TextRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum TextMatch {
    #[serde(alias = "CONTAINS")]
    Contains,
    #[serde(alias = "STARTS_WITH")]
    StartsWith,
    #[serde(alias = "ENDS_WITH")]
    EndsWith,
    #[serde(alias = "EQUALS")]
    Equals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListSort {
    pub property: SortProperty,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Default for ListSort {
    fn default() -> Self {
        Self {
            property: SortProperty::Native(NativeSortProperty::CreatedAt),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum SortProperty {
    /// A fixed column on the entity row.
    Native(NativeSortProperty),
    /// The value of a user-defined property.
    Custom(CustomSortProperty),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum NativeSortProperty {
    #[serde(alias = "CREATED_AT", alias = "created_at")]
    CreatedAt,
    #[serde(alias = "UPDATED_AT", alias = "updated_at")]
    UpdatedAt,
    #[serde(alias = "ID")]
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomSortProperty {
    pub property_id: i32,
    pub data_type: DataType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum SortDirection {
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[default]
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

/// Neighbouring entities to fetch around every listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListContext {
    #[serde(rename = "type")]
    pub kind: ContextType,
    pub quantity: u32,
    pub unit: ContextUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextType {
    #[serde(alias = "before")]
    Before,
    #[serde(alias = "after")]
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextUnit {
    #[serde(alias = "minute")]
    Minute,
    #[serde(alias = "hour")]
    Hour,
    #[serde(alias = "day")]
    Day,
}

impl ContextUnit {
    /// Length of one unit in milliseconds. Calendar irregularities are ignored.
    pub fn millis(&self) -> i64 {
        match self {
            Self::Minute => 60_000,
            Self::Hour => 3_600_000,
            Self::Day => 86_400_000,
        }
    }
}

impl ListContext {
    pub fn span_millis(&self) -> i64 {
        i64::from(self.quantity) * self.unit.millis()
    }
}
