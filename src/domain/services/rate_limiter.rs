// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::{PlatformSettings, PlatformsSettings};
use crate::domain::models::platform::Platform;
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// 令牌桶配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketConfig {
    /// 桶容量
    pub capacity: f64,
    /// 每秒补充的令牌数
    pub refill_per_second: f64,
}

impl From<&PlatformSettings> for BucketConfig {
    fn from(settings: &PlatformSettings) -> Self {
        Self {
            capacity: settings.bucket_capacity,
            refill_per_second: settings.refill_per_second,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(config: &BucketConfig, now: Instant) -> Self {
        Self {
            tokens: config.capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, config: &BucketConfig, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * config.refill_per_second).min(config.capacity);
        self.last_refill = now;
    }
}

/// 令牌桶限流器
///
/// 按 (平台, 密钥) 维护令牌桶，容量与补充速率按平台配置。
/// 所有操作都不会阻塞等待，调用方自行退避。
pub struct RateLimiter {
    configs: HashMap<Platform, BucketConfig>,
    buckets: DashMap<(Platform, Uuid), TokenBucket>,
}

impl RateLimiter {
    /// 创建新的限流器实例
    ///
    /// 未配置的平台不限流
    pub fn new(configs: HashMap<Platform, BucketConfig>) -> Self {
        Self {
            configs,
            buckets: DashMap::new(),
        }
    }

    /// 从平台配置创建限流器
    pub fn from_settings(settings: &PlatformsSettings) -> Self {
        let configs = Platform::ALL
            .iter()
            .map(|p| (*p, BucketConfig::from(settings.get(*p))))
            .collect();
        Self::new(configs)
    }

    /// 获取平台的令牌桶配置
    pub fn config(&self, platform: Platform) -> Option<BucketConfig> {
        self.configs.get(&platform).copied()
    }

    /// 尝试消耗令牌
    ///
    /// # 返回值
    ///
    /// 令牌充足时扣除并返回 true；否则不做任何修改并返回 false。
    /// 超过桶容量的消耗永远无法满足。
    pub fn try_consume(&self, platform: Platform, key_id: Uuid, cost: f64) -> bool {
        let Some(config) = self.config(platform) else {
            return true;
        };
        if cost <= 0.0 {
            return true;
        }
        if cost > config.capacity {
            debug!(
                "Cost {} exceeds bucket capacity {} for platform {}",
                cost, config.capacity, platform
            );
            return false;
        }

        let now = Instant::now();
        let mut bucket = self
            .buckets
            .entry((platform, key_id))
            .or_insert_with(|| TokenBucket::full(&config, now));
        bucket.refill(&config, now);

        if bucket.tokens >= cost {
            bucket.tokens -= cost;
            true
        } else {
            false
        }
    }

    /// 估算令牌足够支付 `cost` 还需等待的时间
    ///
    /// 永远无法满足或等待时间无法表示时返回 None
    pub fn retry_after(&self, platform: Platform, key_id: Uuid, cost: f64) -> Option<Duration> {
        let config = self.config(platform)?;
        if cost > config.capacity || config.refill_per_second <= 0.0 {
            return None;
        }
        let available = self.available(platform, key_id);
        if available >= cost {
            return Some(Duration::ZERO);
        }
        Duration::try_from_secs_f64((cost - available) / config.refill_per_second).ok()
    }

    /// 当前可用令牌数
    pub fn available(&self, platform: Platform, key_id: Uuid) -> f64 {
        let Some(config) = self.config(platform) else {
            return f64::INFINITY;
        };
        let now = Instant::now();
        match self.buckets.get_mut(&(platform, key_id)) {
            Some(mut bucket) => {
                bucket.refill(&config, now);
                bucket.tokens
            }
            None => config.capacity,
        }
    }

    /// 移除密钥的令牌桶
    pub fn forget(&self, platform: Platform, key_id: Uuid) {
        self.buckets.remove(&(platform, key_id));
    }
}
