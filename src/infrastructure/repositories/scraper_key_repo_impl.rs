// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use crate::domain::models::scraper_key::ScraperKey;
use crate::domain::repositories::scraper_key_repository::ScraperKeyRepository;
use crate::infrastructure::crypto::KeyCipher;
use crate::infrastructure::database::entities::scraper_key as key_entity;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 抓取密钥仓库实现
///
/// 基于SeaORM实现的密钥数据访问层，密钥原文加密后存储
#[derive(Clone)]
pub struct ScraperKeyRepositoryImpl {
    db: Arc<DatabaseConnection>,
    cipher: KeyCipher,
}

impl ScraperKeyRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>, cipher: KeyCipher) -> Self {
        Self { db, cipher }
    }

    fn to_domain(&self, model: key_entity::Model) -> Result<ScraperKey, RepositoryError> {
        let platform: Platform = model
            .platform
            .parse()
            .map_err(|e: crate::domain::models::job::DomainError| {
                RepositoryError::InternalError(e.to_string())
            })?;
        Ok(ScraperKey {
            id: model.id,
            platform,
            key_value: self.cipher.decrypt(&model.key_value)?,
            purpose: model.purpose,
            is_active: model.is_active,
            last_used: model.last_used,
            created_at: model.created_at,
        })
    }

    fn to_active_model(&self, key: &ScraperKey) -> Result<key_entity::ActiveModel, RepositoryError> {
        Ok(key_entity::ActiveModel {
            id: Set(key.id),
            platform: Set(key.platform.code().to_string()),
            key_value: Set(self.cipher.encrypt(&key.key_value)?),
            purpose: Set(key.purpose.clone()),
            is_active: Set(key.is_active),
            last_used: Set(key.last_used),
            created_at: Set(key.created_at),
        })
    }

    fn to_keys(&self, models: Vec<key_entity::Model>) -> Result<Vec<ScraperKey>, RepositoryError> {
        models.into_iter().map(|m| self.to_domain(m)).collect()
    }
}

#[async_trait]
impl ScraperKeyRepository for ScraperKeyRepositoryImpl {
    async fn create(&self, key: &ScraperKey) -> Result<ScraperKey, RepositoryError> {
        let model = self.to_active_model(key)?;
        key_entity::Entity::insert(model)
            .exec(self.db.as_ref())
            .await?;
        Ok(key.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperKey>, RepositoryError> {
        key_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(|m| self.to_domain(m))
            .transpose()
    }

    async fn find_all(&self) -> Result<Vec<ScraperKey>, RepositoryError> {
        let models = key_entity::Entity::find()
            .order_by_asc(key_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        self.to_keys(models)
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = key_entity::Entity::update_many()
            .col_expr(key_entity::Column::LastUsed, Expr::value(at))
            .filter(key_entity::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), RepositoryError> {
        let result = key_entity::Entity::update_many()
            .col_expr(key_entity::Column::IsActive, Expr::value(active))
            .filter(key_entity::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
