use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::entity::validate_tags;

/// Most entities one bulk operation may touch.
pub const MAX_BULK_ENTITIES: usize = 500;

/// What a bulk operation does to every listed entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkAction {
    /// Delete the entities with their tags and property values.
    Delete,
    /// Link the tags, keeping existing ones.
    AddTags { tags: Vec<String> },
    /// Unlink the tags. Tags the entity does not carry are ignored.
    RemoveTags { tags: Vec<String> },
    /// Make the tags the entity's complete tag set.
    ReplaceTags { tags: Vec<String> },
}

impl BulkAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::AddTags { .. } => "ADD_TAGS",
            Self::RemoveTags { .. } => "REMOVE_TAGS",
            Self::ReplaceTags { .. } => "REPLACE_TAGS",
        }
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationRequest {
    /// Entity ids; duplicates are applied once.
    #[schema(example = json!([1, 2, 3]))]
    pub entities: Vec<i32>,
    #[schema(example = json!({"type": "ADD_TAGS", "tags": ["urgent"]}))]
    pub operation: BulkAction,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationResponse {
    #[schema(example = "ADD_TAGS")]
    pub operation: &'static str,
    /// Ids the operation was applied to, in request order.
    #[schema(example = json!([1, 2, 3]))]
    pub entities: Vec<i32>,
}

pub fn validate_bulk_operation(req: &BulkOperationRequest) -> Result<(), AppError> {
    if req.entities.is_empty() {
        return Err(AppError::Validation("entities must not be empty".into()));
    }
    if req.entities.len() > MAX_BULK_ENTITIES {
        return Err(AppError::Validation(format!(
            "At most {MAX_BULK_ENTITIES} entities per operation"
        )));
    }
    match &req.operation {
        BulkAction::Delete => Ok(()),
        BulkAction::AddTags { tags } | BulkAction::RemoveTags { tags } => {
            validate_tags(tags)?;
            if tags.iter().all(|t| t.trim().is_empty()) {
                return Err(AppError::Validation(format!(
                    "{} needs at least one tag",
                    req.operation.name()
                )));
            }
            Ok(())
        }
        BulkAction::ReplaceTags { tags } => validate_tags(tags),
    }
}
