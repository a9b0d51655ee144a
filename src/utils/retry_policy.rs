// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::RetrySettings;
use std::time::Duration;

/// 重试策略配置
///
/// 同时用于抽取失败后的重试和无可用密钥时的暂存退避
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大抽取尝试次数（含首次）
    pub max_attempts: u32,
    /// 初始退避时间
    pub initial_backoff: Duration,
    /// 最大退避时间
    pub max_backoff: Duration,
    /// 退避乘数
    pub backoff_multiplier: f64,
    /// 抖动因子 (0.0-1.0)
    pub jitter_factor: f64,
    /// 是否启用指数退避
    pub exponential_backoff: bool,
    /// 是否启用抖动
    pub enable_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            exponential_backoff: true,
            enable_jitter: true,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            backoff_multiplier: settings.backoff_multiplier,
            jitter_factor: settings.jitter_factor.clamp(0.0, 1.0),
            exponential_backoff: true,
            enable_jitter: settings.jitter_factor > 0.0,
        }
    }
}

impl RetryPolicy {
    /// 创建标准重试策略
    pub fn standard() -> Self {
        Self::default()
    }

    /// 计算第 `attempt` 次重试（从 1 开始）的退避时间
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        if !self.exponential_backoff {
            return self.initial_backoff.min(self.max_backoff);
        }

        let exponent = attempt.max(1).saturating_sub(1).min(63) as i32;
        let backoff_secs = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        // 限制最大退避时间
        let capped_backoff = backoff_secs.min(self.max_backoff.as_secs_f64());

        let jitter_range = capped_backoff * self.jitter_factor;
        let final_backoff = if self.enable_jitter && jitter_range > 0.0 {
            let jitter = rand::random_range(-jitter_range..jitter_range);
            (capped_backoff + jitter).max(0.0)
        } else {
            capped_backoff
        };

        Duration::from_secs_f64(final_backoff)
    }
}
