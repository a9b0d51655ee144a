// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_key::ScraperKey;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 抓取密钥仓库特质
///
/// 定义抓取密钥的数据访问接口。密钥不提供删除操作。
#[async_trait]
pub trait ScraperKeyRepository: Send + Sync {
    /// 保存新密钥
    async fn create(&self, key: &ScraperKey) -> Result<ScraperKey, RepositoryError>;
    /// 根据ID查找密钥
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperKey>, RepositoryError>;
    /// 查找全部密钥
    async fn find_all(&self) -> Result<Vec<ScraperKey>, RepositoryError>;
    /// 更新最近使用时间
    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError>;
    /// 设置启用状态
    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), RepositoryError>;
}
