//! Writes typed property values for entities and property-config defaults.
//!
//! Every data type owns a value table and two link tables (see
//! [`PropertyTables`]). All dispatch goes through that lookup, so adding a
//! data type means adding one table triple rather than another code path.

use std::collections::{HashMap, HashSet};

use common::DataType;
use sea_orm::sea_query::{
    Alias, DeleteStatement, Expr, ExprTrait, Func, InsertStatement, JoinType, Query, UpdateStatement,
};
use sea_orm::*;
use serde_json::Value as Json;
use tracing::{debug, instrument};

use crate::entity::{entity_item, property_config};
use crate::error::AppError;
use crate::models::entity::PropertyAssignment;
use crate::models::property::PropertyValue;
use crate::utils::time::TimeZoneShift;

use super::tables::PropertyTables;

/// An assignment whose config, value shape and cardinality were checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAssignment {
    /// `None` creates a new value row.
    pub value_id: Option<i32>,
    pub property_config_id: i32,
    pub value: PropertyValue,
    pub order: i32,
}

/// Validate a full assignment set for one entity before anything is written.
///
/// `catalog` holds the property configs of the entity's config, keyed by id.
pub fn resolve_assignments(
    entity: &entity_item::Model,
    assignments: &[PropertyAssignment],
    catalog: &HashMap<i32, property_config::Model>,
    shift: TimeZoneShift,
) -> Result<Vec<ResolvedAssignment>, AppError> {
    let mut resolved = Vec::with_capacity(assignments.len());
    let mut orders = HashSet::new();
    let mut value_ids = HashSet::new();
    let mut occurrences: HashMap<i32, i32> = HashMap::new();

    for a in assignments {
        let config = catalog
            .get(&a.property_config_id)
            .filter(|c| {
                c.entity_config_id == entity.entity_config_id && c.user_id == entity.user_id
            })
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Unsupported data type for propertyConfigId {}",
                    a.property_config_id
                ))
            })?;

        let value = PropertyValue::from_json(config.data_type, &a.value, shift).map_err(|e| {
            AppError::Validation(format!(
                "Invalid value for propertyConfigId {}: {e}",
                a.property_config_id
            ))
        })?;

        if !orders.insert(a.order) {
            return Err(AppError::Validation(format!(
                "Duplicate property order {}",
                a.order
            )));
        }
        if let Some(id) = a.existing_id()
            && !value_ids.insert((config.data_type, id))
        {
            return Err(AppError::Validation(format!(
                "Value {id} is assigned more than once"
            )));
        }
        *occurrences.entry(config.id).or_default() += 1;

        resolved.push(ResolvedAssignment {
            value_id: a.existing_id(),
            property_config_id: config.id,
            value,
            order: a.order,
        });
    }

    for config in catalog.values() {
        let count = occurrences.get(&config.id).copied().unwrap_or(0);
        check_cardinality(config, count)?;
    }

    Ok(resolved)
}

fn check_cardinality(config: &property_config::Model, count: i32) -> Result<(), AppError> {
    if config.repeat == 0 && count > 1 {
        return Err(AppError::Validation(format!(
            "Property '{}' does not repeat but was given {count} values",
            config.name
        )));
    }
    if config.repeat != 0 && config.allowed > 0 && count > config.allowed {
        return Err(AppError::Validation(format!(
            "Property '{}' allows at most {} values, got {count}",
            config.name, config.allowed
        )));
    }
    if count < config.required {
        return Err(AppError::Validation(format!(
            "Property '{}' requires at least {} values, got {count}",
            config.name, config.required
        )));
    }
    Ok(())
}

pub struct PropertySyncEngine<'a, C> {
    conn: &'a C,
    server_offset_minutes: i32,
}

impl<'a, C> PropertySyncEngine<'a, C>
where
    C: ConnectionTrait + TransactionTrait,
{
    pub fn new(conn: &'a C, server_offset_minutes: i32) -> Self {
        Self {
            conn,
            server_offset_minutes,
        }
    }

    fn shift(&self, time_zone: i32) -> TimeZoneShift {
        TimeZoneShift::new(self.server_offset_minutes, time_zone)
    }

    /// Property configs of the entity's config, in one lookup.
    pub async fn load_catalog(
        &self,
        entity: &entity_item::Model,
    ) -> Result<HashMap<i32, property_config::Model>, AppError> {
        let configs = property_config::Entity::find()
            .filter(property_config::Column::EntityConfigId.eq(entity.entity_config_id))
            .filter(property_config::Column::UserId.eq(entity.user_id))
            .all(self.conn)
            .await?;
        Ok(configs.into_iter().map(|c| (c.id, c)).collect())
    }

    /// Validate and write `properties` for a freshly created entity, or on
    /// top of the entity's existing values.
    #[instrument(skip(self, entity, properties), fields(entity_id = entity.id, count = properties.len()))]
    pub async fn sync_entity_properties(
        &self,
        entity: &entity_item::Model,
        properties: &[PropertyAssignment],
        time_zone: i32,
    ) -> Result<(), AppError> {
        let catalog = self.load_catalog(entity).await?;
        let resolved = resolve_assignments(entity, properties, &catalog, self.shift(time_zone))?;
        for assignment in &resolved {
            self.sync_property(entity.id, assignment).await?;
        }
        Ok(())
    }

    /// Make `properties` the entity's complete property set. Stored values
    /// whose ids are not mentioned are removed.
    #[instrument(skip(self, entity, properties), fields(entity_id = entity.id, count = properties.len()))]
    pub async fn replace_entity_properties(
        &self,
        entity: &entity_item::Model,
        properties: &[PropertyAssignment],
        time_zone: i32,
    ) -> Result<(), AppError> {
        let catalog = self.load_catalog(entity).await?;
        let resolved = resolve_assignments(entity, properties, &catalog, self.shift(time_zone))?;

        for tables in PropertyTables::all() {
            let keep: Vec<i32> = resolved
                .iter()
                .filter(|r| r.value.data_type() == tables.data_type)
                .filter_map(|r| r.value_id)
                .collect();
            let removed = delete_entity_links(self.conn, tables, entity.id, &keep).await?;
            if removed > 0 {
                debug!(data_type = %tables.data_type, removed, "Pruned property values");
            }
        }

        for assignment in &resolved {
            self.sync_property(entity.id, assignment).await?;
        }
        Ok(())
    }

    /// Write one value+link pair in its own transaction (a savepoint when
    /// the connection is already a transaction). Returns the value id.
    pub async fn sync_property(
        &self,
        entity_id: i32,
        assignment: &ResolvedAssignment,
    ) -> Result<i32, AppError> {
        let tables = PropertyTables::of(assignment.value.data_type());
        let txn = self.conn.begin().await?;

        let value_id = match assignment.value_id {
            None => {
                let value_id = insert_value(&txn, tables, &assignment.value).await?;
                let link = Query::insert()
                    .into_table(Alias::new(tables.link_table))
                    .columns([
                        Alias::new("entity_id"),
                        Alias::new("property_config_id"),
                        Alias::new("property_value_id"),
                        Alias::new("order"),
                    ])
                    .values_panic([
                        entity_id.into(),
                        assignment.property_config_id.into(),
                        value_id.into(),
                        assignment.order.into(),
                    ])
                    .to_owned();
                exec(&txn, &link).await?;
                value_id
            }
            Some(value_id) => {
                update_entity_value(&txn, tables, entity_id, assignment, value_id).await?;
                value_id
            }
        };

        txn.commit().await?;
        Ok(value_id)
    }

    /// Remove every property value of an entity.
    pub async fn delete_entity_properties(&self, entity_id: i32) -> Result<u64, AppError> {
        let mut removed = 0;
        for tables in PropertyTables::all() {
            removed += delete_entity_links(self.conn, tables, entity_id, &[]).await?;
        }
        Ok(removed)
    }

    /// Number of entity values stored under a property config.
    pub async fn count_config_links(&self, config: &property_config::Model) -> Result<i64, AppError> {
        let tables = PropertyTables::of(config.data_type);
        let count = Query::select()
            .expr_as(
                Func::count(Expr::col(Alias::new("property_value_id"))),
                Alias::new("total"),
            )
            .from(Alias::new(tables.link_table))
            .and_where(Expr::col(Alias::new("property_config_id")).eq(config.id))
            .to_owned();
        let row = self
            .conn
            .query_one_raw(self.conn.get_database_backend().build(&count))
            .await?
            .ok_or_else(|| AppError::Internal("COUNT returned no row".into()))?;
        Ok(row.try_get::<i64>("", "total")?)
    }

    /// Replace the default value of a property config.
    pub async fn set_default_value(
        &self,
        config: &property_config::Model,
        value: &PropertyValue,
    ) -> Result<(), AppError> {
        if value.data_type() != config.data_type {
            return Err(AppError::Internal(format!(
                "default for property config {} has type {}",
                config.id,
                value.data_type()
            )));
        }
        let tables = PropertyTables::of(config.data_type);
        let txn = self.conn.begin().await?;

        delete_default(&txn, tables, config.id).await?;
        let value_id = insert_value(&txn, tables, value).await?;
        let link = Query::insert()
            .into_table(Alias::new(tables.default_table))
            .columns([Alias::new("property_config_id"), Alias::new("property_value_id")])
            .values_panic([config.id.into(), value_id.into()])
            .to_owned();
        exec(&txn, &link).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Validate a client default value and store it.
    pub async fn set_default_from_json(
        &self,
        config: &property_config::Model,
        value: &Json,
        time_zone: i32,
    ) -> Result<(), AppError> {
        let value = PropertyValue::from_json(config.data_type, value, self.shift(time_zone))
            .map_err(|e| AppError::Validation(format!("Invalid default value: {e}")))?;
        self.set_default_value(config, &value).await
    }

    pub async fn clear_default_value(&self, config: &property_config::Model) -> Result<(), AppError> {
        delete_default(self.conn, PropertyTables::of(config.data_type), config.id).await
    }

    /// Default values of the given configs, keyed by property config id.
    pub async fn default_values(
        &self,
        configs: &[property_config::Model],
    ) -> Result<HashMap<i32, PropertyValue>, AppError> {
        let mut by_type: HashMap<DataType, Vec<i32>> = HashMap::new();
        for c in configs {
            by_type.entry(c.data_type).or_default().push(c.id);
        }

        let mut defaults = HashMap::new();
        for (data_type, ids) in by_type {
            let tables = PropertyTables::of(data_type);
            let (d, v) = (Alias::new("d"), Alias::new("v"));
            let select = Query::select()
                .column((d.clone(), Alias::new("property_config_id")))
                .expr_as(Expr::cust(tables.value_json("v")), Alias::new("value"))
                .from_as(Alias::new(tables.default_table), d.clone())
                .join_as(
                    JoinType::InnerJoin,
                    Alias::new(tables.value_table),
                    v.clone(),
                    Expr::col((v, Alias::new("id")))
                        .equals((d.clone(), Alias::new("property_value_id"))),
                )
                .and_where(Expr::col((d, Alias::new("property_config_id"))).is_in(ids))
                .to_owned();
            let rows = self
                .conn
                .query_all_raw(self.conn.get_database_backend().build(&select))
                .await?;
            for row in rows {
                let config_id: i32 = row.try_get("", "property_config_id")?;
                let raw: Json = row.try_get("", "value")?;
                let value = PropertyValue::from_stored(data_type, raw).map_err(AppError::Internal)?;
                defaults.insert(config_id, value);
            }
        }
        Ok(defaults)
    }
}

async fn exec<C: ConnectionTrait, S: StatementBuilder>(conn: &C, stmt: &S) -> Result<u64, DbErr> {
    let stmt = conn.get_database_backend().build(stmt);
    Ok(conn.execute_raw(stmt).await?.rows_affected())
}

/// Run a statement ending in `RETURNING column` and collect that column.
async fn returning_ids<C: ConnectionTrait, S: StatementBuilder>(
    conn: &C,
    stmt: &S,
    column: &str,
) -> Result<Vec<i32>, DbErr> {
    let stmt = conn.get_database_backend().build(stmt);
    conn.query_all_raw(stmt)
        .await?
        .iter()
        .map(|row| row.try_get::<i32>("", column))
        .collect()
}

fn insert_value_query(tables: &PropertyTables, value: &PropertyValue) -> InsertStatement {
    let (columns, values): (Vec<_>, Vec<_>) = value
        .columns()
        .into_iter()
        .map(|(column, v)| (Alias::new(column), v))
        .unzip();
    Query::insert()
        .into_table(Alias::new(tables.value_table))
        .columns(columns)
        .values_panic(values.into_iter().map(Into::into))
        .returning_col(Alias::new("id"))
        .to_owned()
}

async fn insert_value<C: ConnectionTrait>(
    conn: &C,
    tables: &PropertyTables,
    value: &PropertyValue,
) -> Result<i32, AppError> {
    returning_ids(conn, &insert_value_query(tables, value), "id")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Internal(format!("insert into {} returned no id", tables.value_table)))
}

/// UPDATE of a value row that only matches while the row is linked to
/// `entity_id` under the assignment's property config.
fn update_value_query(
    tables: &PropertyTables,
    entity_id: i32,
    assignment: &ResolvedAssignment,
    value_id: i32,
) -> UpdateStatement {
    let link = Alias::new("l");
    let owned_link = Query::select()
        .expr(Expr::val(1))
        .from_as(Alias::new(tables.link_table), link.clone())
        .and_where(Expr::col((link.clone(), Alias::new("property_value_id"))).eq(value_id))
        .and_where(Expr::col((link.clone(), Alias::new("entity_id"))).eq(entity_id))
        .and_where(
            Expr::col((link, Alias::new("property_config_id"))).eq(assignment.property_config_id),
        )
        .to_owned();

    let mut update = Query::update();
    update.table(Alias::new(tables.value_table));
    for (column, v) in assignment.value.columns() {
        update.value(Alias::new(column), v);
    }
    update
        .and_where(Expr::col(Alias::new("id")).eq(value_id))
        .and_where(Expr::exists(owned_link))
        .to_owned()
}

/// Update a value row in place, then move its link to the new order.
async fn update_entity_value<C: ConnectionTrait>(
    conn: &C,
    tables: &PropertyTables,
    entity_id: i32,
    assignment: &ResolvedAssignment,
    value_id: i32,
) -> Result<(), AppError> {
    let update = update_value_query(tables, entity_id, assignment, value_id);
    if exec(conn, &update).await? == 0 {
        return Err(AppError::NotFound(format!(
            "Property value {value_id} not found for propertyConfigId {}",
            assignment.property_config_id
        )));
    }

    let reorder = Query::update()
        .table(Alias::new(tables.link_table))
        .value(Alias::new("order"), assignment.order)
        .and_where(Expr::col(Alias::new("entity_id")).eq(entity_id))
        .and_where(Expr::col(Alias::new("property_value_id")).eq(value_id))
        .to_owned();
    exec(conn, &reorder).await?;
    Ok(())
}

fn delete_links_query(tables: &PropertyTables, entity_id: i32, keep: &[i32]) -> DeleteStatement {
    let mut delete = Query::delete();
    delete
        .from_table(Alias::new(tables.link_table))
        .and_where(Expr::col(Alias::new("entity_id")).eq(entity_id));
    if !keep.is_empty() {
        delete.and_where(Expr::col(Alias::new("property_value_id")).is_not_in(keep.iter().copied()));
    }
    delete.returning_col(Alias::new("property_value_id")).to_owned()
}

/// Delete an entity's links of one type, except those pointing at `keep`,
/// together with their value rows.
async fn delete_entity_links<C: ConnectionTrait>(
    conn: &C,
    tables: &PropertyTables,
    entity_id: i32,
    keep: &[i32],
) -> Result<u64, AppError> {
    let delete = delete_links_query(tables, entity_id, keep);
    let value_ids = returning_ids(conn, &delete, "property_value_id").await?;
    delete_values(conn, tables, &value_ids).await?;
    Ok(value_ids.len() as u64)
}

async fn delete_default<C: ConnectionTrait>(
    conn: &C,
    tables: &PropertyTables,
    property_config_id: i32,
) -> Result<(), AppError> {
    let delete = Query::delete()
        .from_table(Alias::new(tables.default_table))
        .and_where(Expr::col(Alias::new("property_config_id")).eq(property_config_id))
        .returning_col(Alias::new("property_value_id"))
        .to_owned();
    let value_ids = returning_ids(conn, &delete, "property_value_id").await?;
    delete_values(conn, tables, &value_ids).await
}

async fn delete_values<C: ConnectionTrait>(
    conn: &C,
    tables: &PropertyTables,
    value_ids: &[i32],
) -> Result<(), AppError> {
    if value_ids.is_empty() {
        return Ok(());
    }
    let delete = Query::delete()
        .from_table(Alias::new(tables.value_table))
        .and_where(Expr::col(Alias::new("id")).is_in(value_ids.iter().copied()))
        .to_owned();
    exec(conn, &delete).await?;
    Ok(())
}
