use std::collections::BTreeSet;

use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{entity_tag, tag};

/// Trim labels, drop empty ones and deduplicate. Output is sorted.
pub fn normalize_labels(labels: &[String]) -> Vec<String> {
    labels
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Global tag table plus per-entity tag links.
pub struct TagStore<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> TagStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Create every missing tag. Existing tags are left untouched.
    pub async fn save_tags(&self, labels: &[String]) -> Result<Vec<String>, DbErr> {
        let labels = normalize_labels(labels);
        if labels.is_empty() {
            return Ok(labels);
        }

        let models = labels.iter().map(|label| tag::ActiveModel {
            label: Set(label.clone()),
        });
        let result = tag::Entity::insert_many(models)
            .on_conflict(
                OnConflict::column(tag::Column::Label)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(labels),
            Err(e) => Err(e),
        }
    }

    /// Replace the entity's tag set with `labels`.
    #[instrument(skip(self, labels), fields(entity_id, count = labels.len()))]
    pub async fn sync_entity_tags(
        &self,
        entity_id: i32,
        labels: &[String],
    ) -> Result<Vec<String>, DbErr> {
        self.delete_entity_tags(entity_id).await?;
        self.add_entity_tags(entity_id, labels).await
    }

    /// Link `labels` to the entity on top of its current tags.
    pub async fn add_entity_tags(
        &self,
        entity_id: i32,
        labels: &[String],
    ) -> Result<Vec<String>, DbErr> {
        let labels = self.save_tags(labels).await?;
        if labels.is_empty() {
            return Ok(labels);
        }

        let links = labels.iter().map(|label| entity_tag::ActiveModel {
            entity_id: Set(entity_id),
            label: Set(label.clone()),
        });
        let result = entity_tag::Entity::insert_many(links)
            .on_conflict(
                OnConflict::columns([entity_tag::Column::EntityId, entity_tag::Column::Label])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(labels),
            Err(e) => Err(e),
        }
    }

    /// Unlink `labels` from the entity. The tags themselves stay.
    pub async fn remove_entity_tags(&self, entity_id: i32, labels: &[String]) -> Result<u64, DbErr> {
        let labels = normalize_labels(labels);
        if labels.is_empty() {
            return Ok(0);
        }
        let res = entity_tag::Entity::delete_many()
            .filter(entity_tag::Column::EntityId.eq(entity_id))
            .filter(entity_tag::Column::Label.is_in(labels))
            .exec(self.conn)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn delete_entity_tags(&self, entity_id: i32) -> Result<u64, DbErr> {
        let res = entity_tag::Entity::delete_many()
            .filter(entity_tag::Column::EntityId.eq(entity_id))
            .exec(self.conn)
            .await?;
        Ok(res.rows_affected)
    }
}
