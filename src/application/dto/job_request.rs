// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{DomainError, JobState, JobStatus, TargetStatus};
use crate::domain::models::platform::Platform;
use crate::utils::targets::{parse_targets, parse_targets_csv};
use std::io::Read;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// 提交作业请求DTO
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SubmitJobRequest {
    /// 平台短代码（ig / tk / x）
    #[validate(length(min = 1, max = 8))]
    pub platform: String,

    /// 目标用户名或标识，保持提交顺序
    #[validate(length(min = 1, max = 1000))]
    pub targets: Vec<String>,

    /// 密钥用途，默认 general
    #[validate(length(max = 64))]
    pub purpose: Option<String>,
}

impl SubmitJobRequest {
    pub fn new(platform: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            platform: platform.into(),
            targets,
            purpose: None,
        }
    }

    /// 从手工输入的文本创建请求，目标为用户名或主页链接，以换行、逗号或空白分隔
    pub fn from_text(platform: impl Into<String>, text: &str) -> Self {
        Self::new(platform, parse_targets(text))
    }

    /// 从上传的 CSV 创建请求，自动识别 handle 或 link 列
    pub fn from_csv<R: Read>(platform: impl Into<String>, reader: R) -> Result<Self, DomainError> {
        Ok(Self::new(platform, parse_targets_csv(reader)?))
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }
}

/// 提交作业响应DTO
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    /// 固定为 "started"
    pub status: String,
    /// 接受的目标数量
    pub count: usize,
}

/// 单个目标状态DTO
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetStatusDto {
    pub target: String,
    pub state: JobState,
    pub attempts: u32,
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub parked: u32,
    pub last_error: Option<String>,
}

impl From<&TargetStatus> for TargetStatusDto {
    fn from(target: &TargetStatus) -> Self {
        Self {
            target: target.target.clone(),
            state: target.state,
            attempts: target.attempts,
            inserted: target.inserted,
            duplicates: target.duplicates,
            rejected: target.rejected,
            parked: target.parked,
            last_error: target.last_error.clone(),
        }
    }
}

/// 作业状态响应DTO
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub platform: Platform,
    pub purpose: String,
    pub state: JobState,
    pub requested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub attempt_count: u32,
    pub assigned_key_id: Option<Uuid>,
    pub cancel_requested: bool,
    pub targets: Vec<TargetStatusDto>,
}

impl From<&JobStatus> for JobStatusResponse {
    fn from(status: &JobStatus) -> Self {
        Self {
            job_id: status.job.id,
            platform: status.job.platform,
            purpose: status.job.purpose.clone(),
            state: status.job.state,
            requested_at: status.job.requested_at,
            updated_at: status.updated_at,
            finished_at: status.finished_at,
            attempt_count: status.job.attempt_count,
            assigned_key_id: status.job.assigned_key_id,
            cancel_requested: status.cancel_requested,
            targets: status.targets.iter().map(TargetStatusDto::from).collect(),
        }
    }
}

/// 取消作业响应DTO
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancelJobResponse {
    pub job_id: Uuid,
    /// 本次被取消的目标数量
    pub cancelled: usize,
}
