// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_result::{NaturalKey, ScrapeResult};
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;

/// 插入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// 新插入
    Inserted,
    /// 自然键已存在，未插入
    Duplicate,
}

/// 抓取结果仓库特质
///
/// 定义抓取结果数据访问接口
#[async_trait]
pub trait ScrapeResultRepository: Send + Sync {
    /// 当自然键不存在时插入结果
    ///
    /// 对同一自然键的并发调用必须是原子的：最多一个返回 Inserted
    async fn insert_if_absent(&self, result: &ScrapeResult)
        -> Result<InsertOutcome, RepositoryError>;
    /// 按创建时间倒序返回最近的结果
    async fn latest(&self, limit: u64) -> Result<Vec<ScrapeResult>, RepositoryError>;
    /// 根据自然键查找结果
    async fn find_by_natural_key(
        &self,
        key: &NaturalKey,
    ) -> Result<Option<ScrapeResult>, RepositoryError>;
    /// 结果总数
    async fn count(&self) -> Result<u64, RepositoryError>;
}
