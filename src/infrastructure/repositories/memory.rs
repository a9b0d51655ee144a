// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_result::{NaturalKey, ScrapeResult};
use crate::domain::models::scraper_key::ScraperKey;
use crate::domain::repositories::scrape_result_repository::{
    InsertOutcome, ScrapeResultRepository,
};
use crate::domain::repositories::scraper_key_repository::ScraperKeyRepository;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// 内存密钥仓库
///
/// 用于嵌入式场景和测试
#[derive(Default)]
pub struct InMemoryScraperKeyRepository {
    keys: RwLock<HashMap<Uuid, ScraperKey>>,
}

impl InMemoryScraperKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用给定密钥创建仓库
    pub fn with_keys(keys: impl IntoIterator<Item = ScraperKey>) -> Self {
        Self {
            keys: RwLock::new(keys.into_iter().map(|k| (k.id, k)).collect()),
        }
    }
}

#[async_trait]
impl ScraperKeyRepository for InMemoryScraperKeyRepository {
    async fn create(&self, key: &ScraperKey) -> Result<ScraperKey, RepositoryError> {
        let mut keys = self.keys.write();
        if keys.contains_key(&key.id) {
            return Err(RepositoryError::AlreadyExists);
        }
        keys.insert(key.id, key.clone());
        Ok(key.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperKey>, RepositoryError> {
        Ok(self.keys.read().get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<ScraperKey>, RepositoryError> {
        let mut keys: Vec<ScraperKey> = self.keys.read().values().cloned().collect();
        keys.sort_by_key(|k| k.created_at);
        Ok(keys)
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut keys = self.keys.write();
        let key = keys.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        key.last_used = Some(at);
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), RepositoryError> {
        let mut keys = self.keys.write();
        let key = keys.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        key.is_active = active;
        Ok(())
    }
}

#[derive(Default)]
struct ResultStore {
    rows: Vec<ScrapeResult>,
    natural_keys: HashSet<NaturalKey>,
}

/// 内存结果仓库
///
/// 自然键检查与插入在同一把锁下完成
#[derive(Default)]
pub struct InMemoryScrapeResultRepository {
    store: Mutex<ResultStore>,
    unavailable: AtomicBool,
}

impl InMemoryScrapeResultRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟存储不可用，之后的写入都返回数据库错误
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::DatabaseError(
                "storage unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ScrapeResultRepository for InMemoryScrapeResultRepository {
    async fn insert_if_absent(
        &self,
        result: &ScrapeResult,
    ) -> Result<InsertOutcome, RepositoryError> {
        self.check_available()?;
        let key = result.natural_key();
        let mut store = self.store.lock();

        if key.is_constrained() && !store.natural_keys.insert(key) {
            return Ok(InsertOutcome::Duplicate);
        }
        store.rows.push(result.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn latest(&self, limit: u64) -> Result<Vec<ScrapeResult>, RepositoryError> {
        let store = self.store.lock();
        let mut rows: Vec<ScrapeResult> = store.rows.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn find_by_natural_key(
        &self,
        key: &NaturalKey,
    ) -> Result<Option<ScrapeResult>, RepositoryError> {
        Ok(self
            .store
            .lock()
            .rows
            .iter()
            .find(|row| &row.natural_key() == key)
            .cloned())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.store.lock().rows.len() as u64)
    }
}
