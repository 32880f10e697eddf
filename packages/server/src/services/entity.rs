use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::{info, instrument};

use crate::config::QueryConfig;
use crate::entity::{entity_config, entity_item};
use crate::error::AppError;
use crate::models::entity::{CreateEntityRequest, EntityResponse, UpdateEntityRequest};
use crate::models::operation::{BulkAction, BulkOperationRequest, BulkOperationResponse};
use crate::utils::time::TimeZoneShift;

use super::list::ListService;
use super::property_sync::PropertySyncEngine;
use super::tagging::TagStore;

/// Entity writes. Each operation runs in one transaction covering the entity
/// row, its tags and all of its property values.
pub struct EntityService<'a> {
    db: &'a DatabaseConnection,
    config: &'a QueryConfig,
}

impl<'a> EntityService<'a> {
    pub fn new(db: &'a DatabaseConnection, config: &'a QueryConfig) -> Self {
        Self { db, config }
    }

    fn created_at(&self, raw: Option<&str>, time_zone: i32) -> Result<Option<DateTime<Utc>>, AppError> {
        raw.map(|raw| {
            TimeZoneShift::new(self.config.server_utc_offset_minutes, time_zone)
                .to_server_instant(raw)
                .map_err(|e| AppError::Validation(format!("Invalid createdAt: {e}")))
        })
        .transpose()
    }

    #[instrument(skip(self, payload), fields(entity_config_id = payload.entity_config_id))]
    pub async fn create_entity(
        &self,
        user_id: i32,
        payload: CreateEntityRequest,
    ) -> Result<EntityResponse, AppError> {
        let now = Utc::now();
        let created_at = self
            .created_at(payload.created_at.as_deref(), payload.time_zone)?
            .unwrap_or(now);

        let txn = self.db.begin().await?;

        entity_config::Entity::find_by_id(payload.entity_config_id)
            .filter(entity_config::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Entity config {} not found",
                    payload.entity_config_id
                ))
            })?;

        let entity = entity_item::ActiveModel {
            user_id: Set(user_id),
            entity_config_id: Set(payload.entity_config_id),
            created_at: Set(created_at),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        TagStore::new(&txn)
            .sync_entity_tags(entity.id, &payload.tags)
            .await?;
        PropertySyncEngine::new(&txn, self.config.server_utc_offset_minutes)
            .sync_entity_properties(&entity, &payload.properties, payload.time_zone)
            .await?;

        let created = ListService::new(&txn, self.config)
            .get_entity(user_id, entity.id)
            .await?;
        txn.commit().await?;

        info!(entity_id = created.id, "Entity created");
        Ok(created)
    }

    #[instrument(skip(self, payload))]
    pub async fn update_entity(
        &self,
        user_id: i32,
        entity_id: i32,
        payload: UpdateEntityRequest,
    ) -> Result<EntityResponse, AppError> {
        let created_at = self.created_at(payload.created_at.as_deref(), payload.time_zone)?;

        let txn = self.db.begin().await?;
        let entity = find_owned(&txn, user_id, entity_id).await?;

        TagStore::new(&txn)
            .sync_entity_tags(entity.id, &payload.tags)
            .await?;
        PropertySyncEngine::new(&txn, self.config.server_utc_offset_minutes)
            .replace_entity_properties(&entity, &payload.properties, payload.time_zone)
            .await?;

        let mut active: entity_item::ActiveModel = entity.into();
        active.updated_at = Set(Utc::now());
        if let Some(created_at) = created_at {
            active.created_at = Set(created_at);
        }
        active.update(&txn).await?;

        let updated = ListService::new(&txn, self.config)
            .get_entity(user_id, entity_id)
            .await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Delete an entity and everything it owns; returns what was deleted.
    #[instrument(skip(self))]
    pub async fn delete_entity(&self, user_id: i32, entity_id: i32) -> Result<EntityResponse, AppError> {
        let txn = self.db.begin().await?;
        let entity = find_owned(&txn, user_id, entity_id).await?;
        let snapshot = ListService::new(&txn, self.config)
            .get_entity(user_id, entity_id)
            .await?;

        self.remove(&txn, entity.id).await?;

        txn.commit().await?;
        info!(entity_id, "Entity deleted");
        Ok(snapshot)
    }

    /// Apply one action to several entities of `user_id` in a single
    /// transaction. Any id the caller does not own aborts the whole batch.
    #[instrument(skip(self, request), fields(operation = request.operation.name(), count = request.entities.len()))]
    pub async fn apply_operation(
        &self,
        user_id: i32,
        request: BulkOperationRequest,
    ) -> Result<BulkOperationResponse, AppError> {
        let mut seen = HashSet::new();
        let ids: Vec<i32> = request
            .entities
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();

        let txn = self.db.begin().await?;

        let owned: HashSet<i32> = entity_item::Entity::find()
            .filter(entity_item::Column::Id.is_in(ids.clone()))
            .filter(entity_item::Column::UserId.eq(user_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect();
        if let Some(missing) = ids.iter().find(|id| !owned.contains(id)) {
            return Err(AppError::NotFound(format!("Entity {missing} not found")));
        }

        let store = TagStore::new(&txn);
        match &request.operation {
            BulkAction::Delete => {
                for id in &ids {
                    self.remove(&txn, *id).await?;
                }
            }
            BulkAction::AddTags { tags: labels } => {
                for id in &ids {
                    store.add_entity_tags(*id, labels).await?;
                }
            }
            BulkAction::RemoveTags { tags: labels } => {
                for id in &ids {
                    store.remove_entity_tags(*id, labels).await?;
                }
            }
            BulkAction::ReplaceTags { tags: labels } => {
                for id in &ids {
                    store.sync_entity_tags(*id, labels).await?;
                }
            }
        }

        if request.operation != BulkAction::Delete {
            entity_item::Entity::update_many()
                .col_expr(entity_item::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(entity_item::Column::Id.is_in(ids.clone()))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        info!(affected = ids.len(), "Bulk operation applied");
        Ok(BulkOperationResponse {
            operation: request.operation.name(),
            entities: ids,
        })
    }

    /// Delete the entity row after its property values and tag links.
    async fn remove<C>(&self, conn: &C, entity_id: i32) -> Result<(), AppError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        PropertySyncEngine::new(conn, self.config.server_utc_offset_minutes)
            .delete_entity_properties(entity_id)
            .await?;
        TagStore::new(conn).delete_entity_tags(entity_id).await?;
        entity_item::Entity::delete_by_id(entity_id).exec(conn).await?;
        Ok(())
    }

    pub async fn get_entity(&self, user_id: i32, entity_id: i32) -> Result<EntityResponse, AppError> {
        ListService::new(self.db, self.config)
            .get_entity(user_id, entity_id)
            .await
    }
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    entity_id: i32,
) -> Result<entity_item::Model, AppError> {
    entity_item::Entity::find_by_id(entity_id)
        .filter(entity_item::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Entity {entity_id} not found")))
}
