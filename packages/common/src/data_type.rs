#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Storage type of a user-defined property.
///
/// Every variant owns its own value table, entity link table and default
/// link table on the server. The variant is fixed when a property config is
/// created; stored values are keyed off it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "boolean"))]
    #[serde(alias = "BOOLEAN")]
    Boolean,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "int"))]
    #[serde(alias = "INT")]
    Int,
    /// An instant, stored in server time.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "date"))]
    #[serde(alias = "DATE")]
    Date,
    /// `{src, alt}` pair.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "image"))]
    #[serde(alias = "IMAGE")]
    Image,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "shortText"))]
    #[serde(alias = "SHORT_TEXT")]
    ShortText,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "longText"))]
    #[serde(alias = "LONG_TEXT")]
    LongText,
}

impl DataType {
    pub const ALL: &'static [DataType] = &[
        Self::Boolean,
        Self::Date,
        Self::Image,
        Self::Int,
        Self::LongText,
        Self::ShortText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Date => "date",
            Self::Image => "image",
            Self::ShortText => "shortText",
            Self::LongText => "longText",
        }
    }

    /// True for types whose values take part in free-text filtering.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::ShortText | Self::LongText)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid data type '{invalid}'. Valid values: boolean, int, date, image, shortText, longText")]
pub struct ParseDataTypeError {
    invalid: String,
}

impl FromStr for DataType {
    type Err = ParseDataTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" | "BOOLEAN" => Ok(Self::Boolean),
            "int" | "INT" => Ok(Self::Int),
            "date" | "DATE" => Ok(Self::Date),
            "image" | "IMAGE" => Ok(Self::Image),
            "shortText" | "SHORT_TEXT" => Ok(Self::ShortText),
            "longText" | "LONG_TEXT" => Ok(Self::LongText),
            _ => Err(ParseDataTypeError {
                invalid: s.to_string(),
            }),
        }
    }
}
