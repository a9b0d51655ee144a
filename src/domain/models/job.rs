// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 作业/任务状态枚举
///
/// 单个目标任务的状态转换遵循以下流程：
/// Pending → Running → Succeeded/Failed
/// Failed → Retrying → Running（未达到最大尝试次数时）
/// Pending/Retrying → Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// 等待执行（包括因无可用密钥而暂存的任务）
    #[default]
    Pending,
    /// 执行中
    Running,
    /// 等待重试
    Retrying,
    /// 已成功
    Succeeded,
    /// 已失败
    Failed,
    /// 已取消
    Cancelled,
}

impl JobState {
    /// 是否为终止状态
    ///
    /// Failed 只有在紧随其后的 Retrying 转换存在时才不是终态，
    /// 该组合由作业跟踪器原子地写入，读者不会观察到中间的 Failed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }

    /// 判断状态转换是否合法
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Pending, Pending)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Failed, Retrying)
                | (Retrying, Running)
                | (Retrying, Retrying)
                | (Retrying, Cancelled)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Running => write!(f, "running"),
            JobState::Retrying => write!(f, "retrying"),
            JobState::Succeeded => write!(f, "succeeded"),
            JobState::Failed => write!(f, "failed"),
            JobState::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for JobState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "running" => Ok(JobState::Running),
            "retrying" => Ok(JobState::Retrying),
            "succeeded" => Ok(JobState::Succeeded),
            "failed" => Ok(JobState::Failed),
            "cancelled" => Ok(JobState::Cancelled),
            _ => Err(()),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: JobState, to: JobState },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 未知平台
    #[error("Unknown platform: '{0}'")]
    UnknownPlatform(String),
}

/// 作业实体
///
/// 调用方提交的一次抽取请求，按目标拆分为多个任务执行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// 作业唯一标识符
    pub id: Uuid,
    /// 目标平台
    pub platform: Platform,
    /// 所需密钥用途
    pub purpose: String,
    /// 目标列表（保持提交顺序）
    pub targets: Vec<String>,
    /// 提交时间
    pub requested_at: DateTime<Utc>,
    /// 当前状态（由目标任务状态汇总得出）
    pub state: JobState,
    /// 最近一次分配的密钥
    pub assigned_key_id: Option<Uuid>,
    /// 累计抽取尝试次数
    pub attempt_count: u32,
}

impl Job {
    /// 创建一个新的待执行作业
    pub fn new(platform: Platform, purpose: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform,
            purpose: purpose.into(),
            targets,
            requested_at: Utc::now(),
            state: JobState::Pending,
            assigned_key_id: None,
            attempt_count: 0,
        }
    }

    /// 将作业拆分为按目标划分的任务
    pub fn tasks(&self) -> Vec<TargetTask> {
        self.targets
            .iter()
            .enumerate()
            .map(|(index, target)| TargetTask {
                job_id: self.id,
                platform: self.platform,
                purpose: self.purpose.clone(),
                index,
                target: target.clone(),
                attempt: 0,
                parked: 0,
            })
            .collect()
    }
}

/// 目标任务
///
/// 工作器一次完整处理的最小单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTask {
    pub job_id: Uuid,
    pub platform: Platform,
    pub purpose: String,
    /// 目标在作业中的位置
    pub index: usize,
    pub target: String,
    /// 已完成的抽取尝试次数
    pub attempt: u32,
    /// 因无可用密钥或限流被暂存的次数
    pub parked: u32,
}

impl TargetTask {
    /// 任务下一次开始执行前应处于的状态
    pub fn waiting_state(&self) -> JobState {
        if self.attempt == 0 {
            JobState::Pending
        } else {
            JobState::Retrying
        }
    }
}

/// 单个目标的状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetStatus {
    pub target: String,
    pub state: JobState,
    pub attempts: u32,
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub last_error: Option<String>,
    pub key_id: Option<Uuid>,
    /// 自上次状态变化以来被暂存的次数
    pub parked: u32,
}

impl TargetStatus {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: JobState::Pending,
            attempts: 0,
            inserted: 0,
            duplicates: 0,
            rejected: 0,
            last_error: None,
            key_id: None,
            parked: 0,
        }
    }
}

/// 作业状态快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job: Job,
    pub targets: Vec<TargetStatus>,
    /// 是否已请求取消
    pub cancel_requested: bool,
    pub updated_at: DateTime<Utc>,
    /// 进入终止状态的时间
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    pub fn new(job: Job) -> Self {
        let targets = job.targets.iter().map(TargetStatus::new).collect();
        Self {
            job,
            targets,
            cancel_requested: false,
            updated_at: Utc::now(),
            finished_at: None,
        }
    }

    /// 由目标状态汇总作业状态
    ///
    /// 只有全部目标都失败时作业才是 Failed；存在任意成功目标即为 Succeeded
    pub fn derive_state(&self) -> JobState {
        let count = |state: JobState| self.targets.iter().filter(|t| t.state == state).count();

        if self.targets.is_empty() {
            return self.job.state;
        }
        if count(JobState::Running) > 0 {
            return JobState::Running;
        }
        if count(JobState::Retrying) > 0 {
            return JobState::Retrying;
        }
        let pending = count(JobState::Pending);
        if pending == self.targets.len() {
            return JobState::Pending;
        }
        if pending > 0 {
            return JobState::Running;
        }
        if count(JobState::Succeeded) > 0 {
            JobState::Succeeded
        } else if count(JobState::Cancelled) > 0 {
            JobState::Cancelled
        } else {
            JobState::Failed
        }
    }

    /// 统计处于指定状态的目标数量
    pub fn count(&self, state: JobState) -> usize {
        self.targets.iter().filter(|t| t.state == state).count()
    }
}

/// 状态转换记录
///
/// `target` 为空时表示作业级别的转换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub job_id: Uuid,
    pub target: Option<usize>,
    pub from: Option<JobState>,
    pub to: JobState,
    pub detail: String,
    pub at: DateTime<Utc>,
}
