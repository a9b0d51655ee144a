// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::adapters::traits::ExtractionError;
use crate::domain::models::job::DomainError;
use crate::domain::models::platform::Platform;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// 仓库层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("未找到数据")]
    NotFound,

    #[error("数据已存在")]
    AlreadyExists,

    #[error("无效参数: {0}")]
    InvalidParameter(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}

impl From<sea_orm::DbErr> for RepositoryError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::RecordNotFound(_) => RepositoryError::NotFound,
            sea_orm::DbErr::RecordNotInserted => RepositoryError::AlreadyExists,
            other => RepositoryError::DatabaseError(other.to_string()),
        }
    }
}

/// 编排错误类型
///
/// 调用方可见的错误分类。仓库层的 `AlreadyExists` 统一映射为
/// StorageConflict；结果汇入器把它视为重复记录，密钥导入把它视为跳过。
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// 请求参数无效，不重试
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 没有可用密钥，可退避后重试
    #[error("No key available for platform {platform} (purpose '{purpose}')")]
    NoKeyAvailable { platform: Platform, purpose: String },

    /// 所有候选密钥的令牌都不足，可退避后重试
    #[error("All keys for platform {platform} are rate limited")]
    RateLimited {
        platform: Platform,
        retry_after: Option<Duration>,
    },

    /// 抽取失败
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// 自然键冲突
    #[error("Storage conflict on natural key")]
    StorageConflict,

    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(RepositoryError),

    /// 领域错误
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// 作业不存在
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    /// 引擎正在关闭
    #[error("Orchestrator is shutting down")]
    ShuttingDown,
}

impl From<RepositoryError> for OrchestratorError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::AlreadyExists => OrchestratorError::StorageConflict,
            other => OrchestratorError::Repository(other),
        }
    }
}

impl OrchestratorError {
    /// 判断错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            OrchestratorError::NoKeyAvailable { .. } | OrchestratorError::RateLimited { .. } => {
                true
            }
            OrchestratorError::Extraction(e) => e.is_retryable(),
            OrchestratorError::Repository(RepositoryError::DatabaseError(_)) => true,
            _ => false,
        }
    }
}
