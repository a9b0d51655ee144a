// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use crate::domain::models::scraper_key::{KeySummary, ScraperKey};
use crate::domain::repositories::scraper_key_repository::ScraperKeyRepository;
use crate::domain::services::rate_limiter::RateLimiter;
use crate::utils::errors::{OrchestratorError, RepositoryError};
use crate::utils::targets::parse_key_list;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 密钥使用结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// 抽取成功
    Success,
    /// 抽取失败，但与密钥本身无关
    Failed,
    /// 密钥被封锁
    Blocked,
    /// 密钥被封禁
    Banned,
    /// 未实际使用（例如任务在开始前被取消）
    Unused,
}

impl KeyOutcome {
    /// 该结果是否意味着密钥应被停用
    pub fn disables_key(&self) -> bool {
        matches!(self, KeyOutcome::Blocked | KeyOutcome::Banned)
    }
}

/// 密钥租约
///
/// 由 `acquire` 返回，必须通过 `release` 归还
#[derive(Clone)]
pub struct KeyHandle {
    pub key_id: Uuid,
    pub platform: Platform,
    pub purpose: String,
    pub key_value: String,
    pub fingerprint: String,
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyHandle")
            .field("key_id", &self.key_id)
            .field("platform", &self.platform)
            .field("purpose", &self.purpose)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// 批量导入结果
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    /// 新增的密钥
    pub added: Vec<KeySummary>,
    /// 因重复而跳过的数量
    pub skipped: usize,
}

struct KeySlot {
    key: ScraperKey,
    in_flight: usize,
    uses: u64,
}

impl KeySlot {
    fn new(key: ScraperKey) -> Self {
        Self {
            key,
            in_flight: 0,
            uses: 0,
        }
    }

    /// LRU 排序键：从未使用的在前，其次是最久未使用，
    /// 再按当前并发数和累计使用次数
    fn order(&self) -> (bool, Option<DateTime<Utc>>, usize, u64) {
        (
            self.key.last_used.is_some(),
            self.key.last_used,
            self.in_flight,
            self.uses,
        )
    }

    fn lease(&mut self) -> KeyHandle {
        self.in_flight += 1;
        self.uses += 1;
        KeyHandle {
            key_id: self.key.id,
            platform: self.key.platform,
            purpose: self.key.purpose.clone(),
            key_value: self.key.key_value.clone(),
            fingerprint: self.key.fingerprint(),
        }
    }
}

/// 凭据池
///
/// 按平台持有密钥，以最近最少使用的顺序出租，并在密钥被封锁或封禁时自动停用。
/// 所有租借与归还都在同一把锁下完成，同一密钥的并发租约数不超过
/// `per_key_concurrency`。
pub struct CredentialPool {
    repository: Arc<dyn ScraperKeyRepository>,
    slots: Mutex<HashMap<Platform, Vec<KeySlot>>>,
    /// 正在写入存储、尚未进入 slots 的密钥原文
    reserved: Mutex<HashSet<(Platform, String)>>,
    per_key_concurrency: usize,
}

/// 添加密钥期间对原文的占位，离开作用域时释放
struct Reservation<'a> {
    reserved: &'a Mutex<HashSet<(Platform, String)>>,
    entry: (Platform, String),
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.reserved.lock().remove(&self.entry);
    }
}

impl CredentialPool {
    /// 创建空的凭据池
    pub fn new(repository: Arc<dyn ScraperKeyRepository>, per_key_concurrency: usize) -> Self {
        Self {
            repository,
            slots: Mutex::new(HashMap::new()),
            reserved: Mutex::new(HashSet::new()),
            per_key_concurrency: per_key_concurrency.max(1),
        }
    }

    /// 创建凭据池并从存储加载全部密钥
    pub async fn load(
        repository: Arc<dyn ScraperKeyRepository>,
        per_key_concurrency: usize,
    ) -> Result<Self, RepositoryError> {
        let pool = Self::new(repository, per_key_concurrency);
        pool.refresh().await?;
        Ok(pool)
    }

    /// 重新从存储读取密钥
    ///
    /// 保留现有密钥的租约计数；内存中已停用的密钥保持停用
    pub async fn refresh(&self) -> Result<usize, RepositoryError> {
        let stored = self.repository.find_all().await?;
        let total = stored.len();

        let mut slots = self.slots.lock();
        let mut previous: HashMap<Uuid, KeySlot> = slots
            .drain()
            .flat_map(|(_, list)| list.into_iter())
            .map(|slot| (slot.key.id, slot))
            .collect();

        for mut key in stored {
            let slot = match previous.remove(&key.id) {
                Some(mut slot) => {
                    if !slot.key.is_active {
                        key.is_active = false;
                    }
                    if slot.key.last_used > key.last_used {
                        key.last_used = slot.key.last_used;
                    }
                    slot.key = key;
                    slot
                }
                None => KeySlot::new(key),
            };
            slots.entry(slot.key.platform).or_default().push(slot);
        }

        // 存储中已不存在但仍被租出的密钥保留到归还为止
        for (_, slot) in previous {
            if slot.in_flight > 0 {
                slots.entry(slot.key.platform).or_default().push(slot);
            }
        }

        debug!("Credential pool refreshed with {} keys", total);
        Ok(total)
    }

    /// 租借一个密钥
    ///
    /// # 返回值
    ///
    /// * `Ok(KeyHandle)` - 最近最少使用的可用密钥
    /// * `Err(OrchestratorError::NoKeyAvailable)` - 没有可用且空闲的密钥
    pub fn acquire(&self, platform: Platform, purpose: &str) -> Result<KeyHandle, OrchestratorError> {
        let mut slots = self.slots.lock();
        let candidates = self.candidates(&slots, platform, purpose);
        let Some(&index) = candidates.first() else {
            return Err(OrchestratorError::NoKeyAvailable {
                platform,
                purpose: purpose.to_string(),
            });
        };

        let handle = slots
            .get_mut(&platform)
            .map(|list| list[index].lease())
            .ok_or_else(|| OrchestratorError::NoKeyAvailable {
                platform,
                purpose: purpose.to_string(),
            })?;
        debug!("Leased key {} for platform {}", handle.fingerprint, platform);
        Ok(handle)
    }

    /// 在令牌预算内租借密钥
    ///
    /// 按 LRU 顺序依次检查，租出第一个令牌足够支付 `cost` 的密钥。
    /// 有候选密钥但都付不起时返回 `RateLimited`，并给出最短的等待提示。
    pub fn acquire_within_budget(
        &self,
        platform: Platform,
        purpose: &str,
        limiter: &RateLimiter,
        cost: f64,
    ) -> Result<KeyHandle, OrchestratorError> {
        let mut slots = self.slots.lock();
        let candidates = self.candidates(&slots, platform, purpose);
        if candidates.is_empty() {
            return Err(OrchestratorError::NoKeyAvailable {
                platform,
                purpose: purpose.to_string(),
            });
        }

        let Some(list) = slots.get_mut(&platform) else {
            return Err(OrchestratorError::NoKeyAvailable {
                platform,
                purpose: purpose.to_string(),
            });
        };

        let mut retry_after: Option<Duration> = None;
        for index in candidates {
            let key_id = list[index].key.id;
            if limiter.try_consume(platform, key_id, cost) {
                let handle = list[index].lease();
                debug!(
                    "Leased key {} for platform {} (cost {})",
                    handle.fingerprint, platform, cost
                );
                return Ok(handle);
            }
            if let Some(wait) = limiter.retry_after(platform, key_id, cost) {
                retry_after = Some(retry_after.map_or(wait, |current| current.min(wait)));
            }
        }

        Err(OrchestratorError::RateLimited {
            platform,
            retry_after,
        })
    }

    /// 归还密钥
    ///
    /// 除 `Unused` 外都会更新最近使用时间；`Blocked`/`Banned` 会停用该密钥
    /// 并持久化，其它密钥不受影响。
    pub async fn release(&self, handle: KeyHandle, outcome: KeyOutcome) -> Result<(), RepositoryError> {
        let now = Utc::now();
        {
            let mut slots = self.slots.lock();
            if let Some(slot) = slots
                .get_mut(&handle.platform)
                .and_then(|list| list.iter_mut().find(|s| s.key.id == handle.key_id))
            {
                slot.in_flight = slot.in_flight.saturating_sub(1);
                if outcome != KeyOutcome::Unused {
                    slot.key.last_used = Some(now);
                }
                if outcome.disables_key() {
                    slot.key.is_active = false;
                }
            }
        }

        if outcome == KeyOutcome::Unused {
            return Ok(());
        }

        self.repository.touch(handle.key_id, now).await?;
        if outcome.disables_key() {
            warn!(
                "Key {} for platform {} deactivated after {:?}",
                handle.fingerprint, handle.platform, outcome
            );
            self.repository.set_active(handle.key_id, false).await?;
        }
        Ok(())
    }

    /// 停用密钥（管理操作）
    pub async fn deactivate(&self, key_id: Uuid) -> Result<KeySummary, OrchestratorError> {
        let in_memory = {
            let mut slots = self.slots.lock();
            slots
                .values_mut()
                .flat_map(|list| list.iter_mut())
                .find(|slot| slot.key.id == key_id)
                .map(|slot| {
                    slot.key.is_active = false;
                    slot.key.summary()
                })
        };

        let summary = match in_memory {
            Some(summary) => summary,
            None => {
                let mut key = self
                    .repository
                    .find_by_id(key_id)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                key.is_active = false;
                key.summary()
            }
        };

        self.repository.set_active(key_id, false).await?;
        info!("Key {} deactivated", summary.fingerprint);
        Ok(summary)
    }

    /// 添加单个密钥
    ///
    /// 同一平台下已存在（或正被并发添加）相同原文的密钥时返回 `StorageConflict`
    pub async fn add_key(
        &self,
        platform: Platform,
        key_value: &str,
        purpose: &str,
    ) -> Result<KeySummary, OrchestratorError> {
        let key_value = key_value.trim();
        if key_value.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "key value must not be blank".to_string(),
            ));
        }
        let _reservation = self
            .reserve(platform, key_value)
            .ok_or(OrchestratorError::StorageConflict)?;

        let key = ScraperKey::new(platform, key_value, purpose);
        let stored = self.repository.create(&key).await?;
        let summary = stored.summary();

        self.slots
            .lock()
            .entry(platform)
            .or_default()
            .push(KeySlot::new(stored));
        info!(
            "Added key {} for platform {} (purpose '{}')",
            summary.fingerprint, platform, summary.purpose
        );
        Ok(summary)
    }

    /// 批量导入逗号分隔的密钥
    ///
    /// 空白项被忽略，已存在的密钥被跳过
    pub async fn import_keys(
        &self,
        platform: Platform,
        purpose: &str,
        keys: &str,
    ) -> Result<ImportOutcome, OrchestratorError> {
        let mut outcome = ImportOutcome::default();
        for secret in parse_key_list(keys) {
            match self.add_key(platform, &secret, purpose).await {
                Ok(summary) => outcome.added.push(summary),
                Err(OrchestratorError::StorageConflict) => {
                    outcome.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        info!(
            "Imported {} keys for platform {} ({} skipped)",
            outcome.added.len(),
            platform,
            outcome.skipped
        );
        Ok(outcome)
    }

    /// 列出全部密钥摘要
    pub fn list(&self) -> Vec<KeySummary> {
        let slots = self.slots.lock();
        let mut summaries: Vec<KeySummary> = slots
            .values()
            .flat_map(|list| list.iter())
            .map(|slot| slot.key.summary())
            .collect();
        summaries.sort_by(|a, b| {
            a.platform
                .code()
                .cmp(b.platform.code())
                .then_with(|| a.purpose.cmp(&b.purpose))
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });
        summaries
    }

    /// 指定密钥当前的租约数
    pub fn in_flight(&self, key_id: Uuid) -> usize {
        self.slots
            .lock()
            .values()
            .flat_map(|list| list.iter())
            .find(|slot| slot.key.id == key_id)
            .map_or(0, |slot| slot.in_flight)
    }

    /// 当前租出的租约总数
    pub fn leased(&self) -> usize {
        self.slots
            .lock()
            .values()
            .flat_map(|list| list.iter())
            .map(|slot| slot.in_flight)
            .sum()
    }

    /// 平台下的可用密钥数量
    pub fn active_count(&self, platform: Platform) -> usize {
        self.slots
            .lock()
            .get(&platform)
            .map_or(0, |list| list.iter().filter(|s| s.key.is_active).count())
    }

    /// 在 slots 锁内检查原文并占位；已存在或已被占位时返回 None
    fn reserve(&self, platform: Platform, secret: &str) -> Option<Reservation<'_>> {
        let slots = self.slots.lock();
        let exists = slots
            .get(&platform)
            .is_some_and(|list| list.iter().any(|s| s.key.key_value == secret));
        if exists {
            return None;
        }
        let entry = (platform, secret.to_string());
        if !self.reserved.lock().insert(entry.clone()) {
            return None;
        }
        drop(slots);
        Some(Reservation {
            reserved: &self.reserved,
            entry,
        })
    }

    /// 按 LRU 顺序返回可租借密钥的下标
    fn candidates(
        &self,
        slots: &HashMap<Platform, Vec<KeySlot>>,
        platform: Platform,
        purpose: &str,
    ) -> Vec<usize> {
        let Some(list) = slots.get(&platform) else {
            return Vec::new();
        };
        let mut indices: Vec<usize> = list
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                slot.key.is_active
                    && slot.key.serves(purpose)
                    && slot.in_flight < self.per_key_concurrency
            })
            .map(|(index, _)| index)
            .collect();
        indices.sort_by_key(|&index| list[index].order());
        indices
    }
}
