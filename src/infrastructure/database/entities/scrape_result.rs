// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

/// 抓取结果表
///
/// (platform, username, post_date) 上的唯一索引由 schema 引导创建
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "scrape_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub platform: String,
    pub username: String,
    pub followers: i64,
    pub post_date: Option<ChronoDateTimeUtc>,
    pub likes: i64,
    pub comments: i64,
    pub views: i64,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub raw_data: Option<Json>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
