// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use validator::Validate;

/// 应用程序配置设置
///
/// 包含数据库、各平台并发与限流、重试、抽取、凭据、作业跟踪等配置项
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 各平台配置
    #[validate(nested)]
    pub platforms: PlatformsSettings,
    /// 重试与退避配置
    #[validate(nested)]
    pub retry: RetrySettings,
    /// 抽取调用配置
    #[validate(nested)]
    pub extraction: ExtractionSettings,
    /// 凭据池配置
    #[validate(nested)]
    pub credentials: CredentialSettings,
    /// 作业跟踪配置
    #[validate(nested)]
    pub tracker: TrackerSettings,
    /// 结果查询配置
    #[validate(nested)]
    pub results: ResultSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
    /// 启动时是否创建缺失的数据表
    pub bootstrap_schema: bool,
}

/// 各平台配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlatformsSettings {
    #[validate(nested)]
    pub ig: PlatformSettings,
    #[validate(nested)]
    pub tk: PlatformSettings,
    #[validate(nested)]
    pub x: PlatformSettings,
}

impl PlatformsSettings {
    /// 获取指定平台的配置
    pub fn get(&self, platform: Platform) -> &PlatformSettings {
        match platform {
            Platform::Instagram => &self.ig,
            Platform::TikTok => &self.tk,
            Platform::X => &self.x,
        }
    }
}

/// 单个平台的并发与令牌桶配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlatformSettings {
    /// 工作池大小
    #[validate(range(min = 1, max = 1024))]
    pub concurrency: usize,
    /// 每个密钥的令牌桶容量
    #[validate(range(min = 0.001, max = 1_000_000.0))]
    pub bucket_capacity: f64,
    /// 每秒补充的令牌数
    #[validate(range(min = 0.000001, max = 1_000_000.0))]
    pub refill_per_second: f64,
}

/// 重试与退避配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RetrySettings {
    /// 最大抽取尝试次数（含首次）
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: u32,
    /// 初始退避（毫秒）
    #[validate(range(min = 1))]
    pub initial_backoff_ms: u64,
    /// 最大退避（毫秒）
    #[validate(range(min = 1))]
    pub max_backoff_ms: u64,
    /// 退避乘数
    #[validate(range(min = 1.0, max = 100.0))]
    pub backoff_multiplier: f64,
    /// 抖动因子
    #[validate(range(min = 0.0, max = 1.0))]
    pub jitter_factor: f64,
}

/// 抽取调用配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExtractionSettings {
    /// 单个任务的超时时间（毫秒）
    #[validate(range(min = 1))]
    pub timeout_ms: u64,
    /// 每个目标消耗的令牌数
    #[validate(range(min = 0.0, max = 1_000_000.0))]
    pub cost_per_target: f64,
}

/// 凭据池配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CredentialSettings {
    /// 同一密钥允许同时被租用的次数
    #[validate(range(min = 1))]
    pub per_key_concurrency: usize,
    /// 数据库中密钥原文的加密口令，使用数据库存储时必须设置
    pub encryption_key: Option<String>,
}

/// 作业跟踪配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TrackerSettings {
    /// 终止作业的保留时长（秒）
    pub retention_secs: u64,
    /// 维护任务间隔（秒）
    #[validate(range(min = 1))]
    pub maintenance_interval_secs: u64,
}

/// 结果查询配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResultSettings {
    /// 默认返回条数
    #[validate(range(min = 1))]
    pub default_limit: u64,
    /// 最大返回条数
    #[validate(range(min = 1))]
    pub max_limit: u64,
}

/// 指标导出配置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载默认值、config/default、config/{APP_ENVIRONMENT} 和
    /// 以 SOCIALRS__ 为前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败或取值超出范围
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let settings: Self = Self::with_defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("SOCIALRS").separator("__"))
            .build()?
            .try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    /// 仅使用内置默认值构建配置，便于测试和嵌入式使用
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::with_defaults()?.build()?.try_deserialize()
    }

    /// 校验各配置项的取值范围
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()
            .map_err(|e| ConfigError::Message(format!("invalid settings: {}", e)))?;
        for platform in Platform::ALL {
            let p = self.platforms.get(platform);
            if !p.bucket_capacity.is_finite() || !p.refill_per_second.is_finite() {
                return Err(ConfigError::Message(format!(
                    "invalid settings: token bucket of platform {} is not finite",
                    platform.code()
                )));
            }
        }
        if self.retry.max_backoff_ms < self.retry.initial_backoff_ms {
            return Err(ConfigError::Message(
                "invalid settings: retry.max_backoff_ms is below retry.initial_backoff_ms"
                    .to_string(),
            ));
        }
        if self.results.max_limit < self.results.default_limit {
            return Err(ConfigError::Message(
                "invalid settings: results.max_limit is below results.default_limit".to_string(),
            ));
        }
        Ok(())
    }

    fn with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            // Default DB settings
            .set_default("database.url", "sqlite://socialrs.db?mode=rwc")?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            .set_default("database.bootstrap_schema", true)?
            // Per-platform placeholders, override with product values
            .set_default("platforms.ig.concurrency", 2)?
            .set_default("platforms.ig.bucket_capacity", 10.0)?
            .set_default("platforms.ig.refill_per_second", 0.2)?
            .set_default("platforms.tk.concurrency", 4)?
            .set_default("platforms.tk.bucket_capacity", 20.0)?
            .set_default("platforms.tk.refill_per_second", 0.5)?
            .set_default("platforms.x.concurrency", 3)?
            .set_default("platforms.x.bucket_capacity", 15.0)?
            .set_default("platforms.x.refill_per_second", 0.25)?
            // Retry settings
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.initial_backoff_ms", 1000)?
            .set_default("retry.max_backoff_ms", 60000)?
            .set_default("retry.backoff_multiplier", 2.0)?
            .set_default("retry.jitter_factor", 0.1)?
            // Extraction settings
            .set_default("extraction.timeout_ms", 30000)?
            .set_default("extraction.cost_per_target", 1.0)?
            // Credential settings
            .set_default("credentials.per_key_concurrency", 1)?
            // Tracker settings
            .set_default("tracker.retention_secs", 86400)?
            .set_default("tracker.maintenance_interval_secs", 60)?
            // Result query settings
            .set_default("results.default_limit", 50)?
            .set_default("results.max_limit", 500)?
            // Metrics settings
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}
