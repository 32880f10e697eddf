use chrono::{DateTime, Utc};
use common::DataType;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::utils::time::TimeZoneShift;

/// Longest accepted SHORT_TEXT value, in characters.
pub const SHORT_TEXT_MAX_CHARS: usize = 256;

/// `{src, alt}` pair stored for IMAGE properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ImageValue {
    #[schema(example = "https://example.com/cat.png")]
    pub src: String,
    #[serde(default)]
    #[schema(example = "A cat")]
    pub alt: String,
}

/// A typed property value. Serialized as the bare value, so the wire shape
/// depends on the property's data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Int(i64),
    Date(DateTime<Utc>),
    Image(ImageValue),
    ShortText(String),
    LongText(String),
}

impl PropertyValue {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Boolean(_) => DataType::Boolean,
            Self::Int(_) => DataType::Int,
            Self::Date(_) => DataType::Date,
            Self::Image(_) => DataType::Image,
            Self::ShortText(_) => DataType::ShortText,
            Self::LongText(_) => DataType::LongText,
        }
    }

    /// Validate a client-supplied JSON value against `data_type`.
    ///
    /// DATE values may be client-local; they are shifted with `shift`.
    pub fn from_json(data_type: DataType, value: &Json, shift: TimeZoneShift) -> Result<Self, String> {
        match data_type {
            DataType::Boolean => value
                .as_bool()
                .map(Self::Boolean)
                .ok_or_else(|| "expected a boolean".to_string()),
            DataType::Int => value
                .as_i64()
                .map(Self::Int)
                .ok_or_else(|| "expected an integer".to_string()),
            DataType::Date => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| "expected a date string".to_string())?;
                shift
                    .to_server_instant(raw)
                    .map(Self::Date)
                    .map_err(|e| e.to_string())
            }
            DataType::Image => serde_json::from_value::<ImageValue>(value.clone())
                .map(Self::Image)
                .map_err(|_| "expected an object with a string 'src'".to_string()),
            DataType::ShortText => {
                let text = value
                    .as_str()
                    .ok_or_else(|| "expected a string".to_string())?;
                if text.chars().count() > SHORT_TEXT_MAX_CHARS {
                    return Err(format!(
                        "short text must be at most {SHORT_TEXT_MAX_CHARS} characters"
                    ));
                }
                Ok(Self::ShortText(text.to_string()))
            }
            DataType::LongText => value
                .as_str()
                .map(|s| Self::LongText(s.to_string()))
                .ok_or_else(|| "expected a string".to_string()),
        }
    }

    /// Decode a value rendered by [`crate::services::tables::PropertyTables::value_json`].
    pub fn from_stored(data_type: DataType, value: Json) -> Result<Self, String> {
        let decoded = match data_type {
            DataType::Boolean => serde_json::from_value(value).map(Self::Boolean),
            DataType::Int => serde_json::from_value(value).map(Self::Int),
            DataType::Date => serde_json::from_value(value).map(Self::Date),
            DataType::Image => serde_json::from_value(value).map(Self::Image),
            DataType::ShortText => serde_json::from_value(value).map(Self::ShortText),
            DataType::LongText => serde_json::from_value(value).map(Self::LongText),
        };
        decoded.map_err(|e| format!("stored {data_type} value is malformed: {e}"))
    }

    /// Column/value pairs of the value table row holding this value.
    pub fn columns(&self) -> Vec<(&'static str, sea_orm::Value)> {
        match self {
            Self::Boolean(v) => vec![("value", (*v).into())],
            Self::Int(v) => vec![("value", (*v).into())],
            Self::Date(v) => vec![("value", (*v).into())],
            Self::Image(img) => vec![
                ("url", img.src.clone().into()),
                ("alt_text", img.alt.clone().into()),
            ],
            Self::ShortText(v) | Self::LongText(v) => vec![("value", v.clone().into())],
        }
    }
}
