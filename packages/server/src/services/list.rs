use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use common::{ContextType, ListContext, ListFilter, ListSort, SortProperty};
use sea_orm::*;
use tracing::instrument;

use crate::config::QueryConfig;
use crate::entity::property_config;
use crate::error::AppError;
use crate::models::entity::{EntityListResponse, EntityResponse};

use super::assembler::{EntityRow, assemble};
use super::query_builder::{BuiltQuery, ListQueryBuilder};

#[derive(Debug, Clone)]
pub struct ListParams {
    pub user_id: i32,
    pub filter: ListFilter,
    pub sort: ListSort,
    pub context: Option<ListContext>,
    pub start: u64,
    pub per_page: u64,
}

/// Time window around `anchor` covered by a context request.
///
/// BEFORE ends one millisecond before the anchor, AFTER starts one
/// millisecond after it; both span `quantity * unit`. A window reaching past
/// the representable calendar is a validation error.
pub fn context_window(
    ctx: &ListContext,
    anchor: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let out_of_range = || {
        AppError::Validation(format!(
            "Context of {} {:?} around {anchor} is out of range",
            ctx.quantity, ctx.unit
        ))
    };
    let span = Duration::try_milliseconds(ctx.span_millis()).ok_or_else(out_of_range)?;
    let tick = Duration::milliseconds(1);
    let window = match ctx.kind {
        ContextType::Before => anchor
            .checked_sub_signed(tick)
            .and_then(|end| Some((end.checked_sub_signed(span)?, end))),
        ContextType::After => anchor
            .checked_add_signed(tick)
            .and_then(|start| Some((start, start.checked_add_signed(span)?))),
    };
    window.ok_or_else(out_of_range)
}

pub struct ListService<'a, C: ConnectionTrait> {
    conn: &'a C,
    config: &'a QueryConfig,
}

impl<'a, C: ConnectionTrait> ListService<'a, C> {
    pub fn new(conn: &'a C, config: &'a QueryConfig) -> Self {
        Self { conn, config }
    }

    #[instrument(skip(self, params), fields(user_id = params.user_id, start = params.start, per_page = params.per_page))]
    pub async fn get_list(&self, params: ListParams) -> Result<EntityListResponse, AppError> {
        self.check_sort(params.user_id, &params.sort).await?;

        let query = ListQueryBuilder::new(params.user_id)
            .filter(params.filter)
            .sort(params.sort.clone())
            .paginate(params.start, params.per_page);

        let items = self.fetch(query.build()?).await?;

        let count_row = self
            .conn
            .query_one_raw(query.build_count()?.into_statement())
            .await?
            .ok_or_else(|| AppError::Internal("COUNT returned no row".into()))?;
        let total = std::cmp::Ord::max(count_row.try_get::<i64>("", "total")?, 0) as u64;

        let context = match params.context {
            Some(ctx) => {
                self.context_entities(params.user_id, &ctx, &params.sort, &items)
                    .await?
            }
            None => BTreeMap::new(),
        };

        Ok(EntityListResponse {
            items,
            context,
            total,
        })
    }

    /// Neighbours of every item, keyed by item id.
    pub async fn context_entities(
        &self,
        user_id: i32,
        ctx: &ListContext,
        sort: &ListSort,
        items: &[EntityResponse],
    ) -> Result<BTreeMap<i32, Vec<EntityResponse>>, AppError> {
        let mut context = BTreeMap::new();
        for item in items {
            let (start, end) = context_window(ctx, item.created_at)?;
            let query = ListQueryBuilder::new(user_id)
                .sort(sort.clone())
                .created_between(start, end)
                .limit(self.config.context_limit);
            context.insert(item.id, self.fetch(query.build()?).await?);
        }
        Ok(context)
    }

    /// A single entity of `user_id`, or `NotFound`.
    pub async fn get_entity(&self, user_id: i32, entity_id: i32) -> Result<EntityResponse, AppError> {
        let query = ListQueryBuilder::new(user_id).entity(entity_id);
        self.fetch(query.build()?)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Entity {entity_id} not found")))
    }

    async fn fetch(&self, query: BuiltQuery) -> Result<Vec<EntityResponse>, AppError> {
        let rows = EntityRow::find_by_statement(query.into_statement())
            .all(self.conn)
            .await?;
        rows.into_iter().map(assemble).collect()
    }

    /// A custom sort must name a property config of the caller with that data type.
    async fn check_sort(&self, user_id: i32, sort: &ListSort) -> Result<(), AppError> {
        let SortProperty::Custom(custom) = &sort.property else {
            return Ok(());
        };
        let config = property_config::Entity::find_by_id(custom.property_id)
            .filter(property_config::Column::UserId.eq(user_id))
            .one(self.conn)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Sort property {} does not exist",
                    custom.property_id
                ))
            })?;
        if config.data_type != custom.data_type {
            return Err(AppError::Validation(format!(
                "Sort property {} is {}, not {}",
                config.id, config.data_type, custom.data_type
            )));
        }
        Ok(())
    }
}
