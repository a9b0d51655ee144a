// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use crate::domain::models::scrape_result::{NaturalKey, ScrapeResult};
use crate::domain::repositories::scrape_result_repository::{
    InsertOutcome, ScrapeResultRepository,
};
use crate::infrastructure::database::entities::scrape_result as result_entity;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TryInsertResult,
};
use std::sync::Arc;

/// 抓取结果仓库实现
///
/// 依赖 (platform, username, post_date) 唯一索引与 `ON CONFLICT DO NOTHING`
/// 保证同一自然键最多插入一次
#[derive(Clone)]
pub struct ScrapeResultRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl ScrapeResultRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn to_column(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_column(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

impl TryFrom<result_entity::Model> for ScrapeResult {
    type Error = RepositoryError;

    fn try_from(model: result_entity::Model) -> Result<Self, Self::Error> {
        let platform: Platform = model
            .platform
            .parse()
            .map_err(|e: crate::domain::models::job::DomainError| {
                RepositoryError::InternalError(e.to_string())
            })?;
        Ok(Self {
            id: model.id,
            platform,
            username: model.username,
            followers: from_column(model.followers),
            post_date: model.post_date,
            likes: from_column(model.likes),
            comments: from_column(model.comments),
            views: from_column(model.views),
            description: model.description,
            raw_data: model.raw_data,
            created_at: model.created_at,
        })
    }
}

impl From<&ScrapeResult> for result_entity::ActiveModel {
    fn from(result: &ScrapeResult) -> Self {
        Self {
            id: Set(result.id),
            platform: Set(result.platform.code().to_string()),
            username: Set(result.username.clone()),
            followers: Set(to_column(result.followers)),
            post_date: Set(result.post_date),
            likes: Set(to_column(result.likes)),
            comments: Set(to_column(result.comments)),
            views: Set(to_column(result.views)),
            description: Set(result.description.clone()),
            raw_data: Set(result.raw_data.clone()),
            created_at: Set(result.created_at),
        }
    }
}

#[async_trait]
impl ScrapeResultRepository for ScrapeResultRepositoryImpl {
    async fn insert_if_absent(
        &self,
        result: &ScrapeResult,
    ) -> Result<InsertOutcome, RepositoryError> {
        let model: result_entity::ActiveModel = result.into();
        let outcome = result_entity::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    result_entity::Column::Platform,
                    result_entity::Column::Username,
                    result_entity::Column::PostDate,
                ])
                .do_nothing()
                .to_owned(),
            )
            .do_nothing()
            .exec(self.db.as_ref())
            .await?;

        match outcome {
            TryInsertResult::Inserted(_) => Ok(InsertOutcome::Inserted),
            TryInsertResult::Conflicted | TryInsertResult::Empty => Ok(InsertOutcome::Duplicate),
        }
    }

    async fn latest(&self, limit: u64) -> Result<Vec<ScrapeResult>, RepositoryError> {
        result_entity::Entity::find()
            .order_by_desc(result_entity::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(ScrapeResult::try_from)
            .collect()
    }

    async fn find_by_natural_key(
        &self,
        key: &NaturalKey,
    ) -> Result<Option<ScrapeResult>, RepositoryError> {
        let mut query = result_entity::Entity::find()
            .filter(result_entity::Column::Platform.eq(key.platform.code()))
            .filter(result_entity::Column::Username.eq(key.username.as_str()));
        query = match key.post_date {
            Some(date) => query.filter(result_entity::Column::PostDate.eq(date)),
            None => query.filter(result_entity::Column::PostDate.is_null()),
        };

        query
            .one(self.db.as_ref())
            .await?
            .map(ScrapeResult::try_from)
            .transpose()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(result_entity::Entity::find()
            .count(self.db.as_ref())
            .await?)
    }
}
