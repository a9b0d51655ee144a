// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use crate::domain::models::scrape_result::RawRecord;
use crate::domain::services::credential_pool::KeyOutcome;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 抽取错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// 暂时性失败（网络错误、上游 5xx 等）
    #[error("Transient extraction failure: {0}")]
    Transient(String),
    /// 永久性失败（目标不存在、凭据无效等）
    #[error("Permanent extraction failure: {0}")]
    Permanent(String),
    /// 密钥被平台封锁
    #[error("Credential blocked: {0}")]
    CredentialBlocked(String),
    /// 密钥被平台封禁
    #[error("Credential banned: {0}")]
    CredentialBanned(String),
    /// 超时
    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),
}

impl ExtractionError {
    /// 判断错误是否可重试
    ///
    /// 密钥被封锁或封禁时目标本身没有问题，换一个密钥重试
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractionError::Transient(_)
            | ExtractionError::Timeout(_)
            | ExtractionError::CredentialBlocked(_)
            | ExtractionError::CredentialBanned(_) => true,
            ExtractionError::Permanent(_) => false,
        }
    }

    /// 释放密钥时应报告的结果
    pub fn key_outcome(&self) -> KeyOutcome {
        match self {
            ExtractionError::CredentialBlocked(_) => KeyOutcome::Blocked,
            ExtractionError::CredentialBanned(_) => KeyOutcome::Banned,
            _ => KeyOutcome::Failed,
        }
    }
}

/// 抽取适配器特质
///
/// 平台抓取逻辑由外部提供，编排核心只负责调用
#[async_trait]
pub trait ExtractionAdapter: Send + Sync {
    /// 使用给定密钥抽取目标数据
    async fn extract(
        &self,
        key_value: &str,
        targets: &[String],
    ) -> Result<Vec<RawRecord>, ExtractionError>;

    /// 适配器负责的平台
    fn platform(&self) -> Platform;

    /// 适配器名称
    fn name(&self) -> &'static str;

    /// 抽取指定数量目标所需的令牌数，`None` 表示使用全局配置
    fn cost(&self, _targets: usize) -> Option<f64> {
        None
    }
}
