// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::database::entities::{scrape_result, scraper_key};
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};
use tracing::debug;

/// 自然键唯一索引名
pub const NATURAL_KEY_INDEX: &str = "idx_scrape_results_natural_key";

/// 创建缺失的数据表和自然键唯一索引
///
/// 可重复执行；不做任何迁移
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut keys = schema.create_table_from_entity(scraper_key::Entity);
    keys.if_not_exists();
    db.execute(backend.build(&keys)).await?;

    let mut results = schema.create_table_from_entity(scrape_result::Entity);
    results.if_not_exists();
    db.execute(backend.build(&results)).await?;

    let natural_key = Index::create()
        .if_not_exists()
        .name(NATURAL_KEY_INDEX)
        .table(scrape_result::Entity)
        .col(scrape_result::Column::Platform)
        .col(scrape_result::Column::Username)
        .col(scrape_result::Column::PostDate)
        .unique()
        .to_owned();
    db.execute(backend.build(&natural_key)).await?;

    debug!("Database schema ensured");
    Ok(())
}
