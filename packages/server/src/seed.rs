use sea_orm::sea_query::{Alias, Index, PostgresQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::{entity_item, entity_tag};
use crate::services::tables::PropertyTables;

async fn create_index(db: &DatabaseConnection, name: &str, stmt: String) {
    match db.execute_unprepared(&stmt).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Every list query: WHERE user_id = ? ORDER BY created_at
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_entity_user_created")
        .table(entity_item::Entity)
        .col(entity_item::Column::UserId)
        .col(entity_item::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);
    create_index(db, "idx_entity_user_created", stmt).await;

    // Tag containment filters look links up by label.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_entity_tag_label")
        .table(entity_tag::Entity)
        .col(entity_tag::Column::Label)
        .to_string(PostgresQueryBuilder);
    create_index(db, "idx_entity_tag_label", stmt).await;

    // Lateral aggregation per entity, and in-use checks per property config.
    for tables in PropertyTables::all() {
        let name = format!("idx_{}_entity_order", tables.link_table);
        let stmt = Index::create()
            .if_not_exists()
            .name(&name)
            .table(Alias::new(tables.link_table))
            .col(Alias::new("entity_id"))
            .col(Alias::new("order"))
            .to_string(PostgresQueryBuilder);
        create_index(db, &name, stmt).await;

        let name = format!("idx_{}_config", tables.link_table);
        let stmt = Index::create()
            .if_not_exists()
            .name(&name)
            .table(Alias::new(tables.link_table))
            .col(Alias::new("property_config_id"))
            .to_string(PostgresQueryBuilder);
        create_index(db, &name, stmt).await;
    }

    Ok(())
}
