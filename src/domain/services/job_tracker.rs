// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{DomainError, Job, JobState, JobStatus, TransitionRecord};
use crate::domain::services::result_sink::StoreSummary;
use crate::utils::errors::OrchestratorError;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// 失败后的重试决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// 已转入 Retrying，应重新入队
    Retry,
    /// 尝试次数已用尽，目标终止于 Failed
    Exhausted,
    /// 作业已请求取消，目标终止于 Failed
    Cancelled,
}

/// 作业统计
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerStats {
    /// 已到达终态（成功或失败）的目标数
    pub total_processed: u64,
    /// 正在执行的目标数
    pub active_tasks: u64,
    /// 成功率（百分比）
    pub success_rate: f64,
}

/// 作业跟踪器
///
/// 按作业维护状态转换日志以及当前状态的投影。
/// 状态和日志都以 `Arc` 快照发布，写者写时复制，读者不会等待写操作。
/// 同一目标连续的暂存只保留最新一条记录，次数累计在 `TargetStatus::parked`。
pub struct JobTracker {
    jobs: DashMap<Uuid, Arc<JobStatus>>,
    logs: DashMap<Uuid, Arc<Vec<TransitionRecord>>>,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTracker {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
            logs: DashMap::new(),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// 登记新作业
    pub fn register(&self, job: Job) -> Arc<JobStatus> {
        let job_id = job.id;
        let snapshot = Arc::new(JobStatus::new(job));
        let submitted = TransitionRecord {
            job_id,
            target: None,
            from: None,
            to: JobState::Pending,
            detail: format!("submitted with {} targets", snapshot.targets.len()),
            at: Utc::now(),
        };
        self.logs.insert(job_id, Arc::new(vec![submitted]));
        self.jobs.insert(job_id, snapshot.clone());
        snapshot
    }

    /// 记录目标状态转换
    ///
    /// 转换必须符合状态机，并且目标当前状态必须等于 `from`（比较并设置）
    pub fn record_transition(
        &self,
        job_id: Uuid,
        index: usize,
        from: JobState,
        to: JobState,
        detail: impl Into<String>,
    ) -> Result<Arc<JobStatus>, OrchestratorError> {
        let detail = detail.into();
        self.update(job_id, |status, records| {
            apply_target(status, records, index, from, to, &detail)?;
            if to == JobState::Failed {
                set_error(status, index, &detail);
            }
            Ok(())
        })
    }

    /// 记录目标开始执行，并登记所用的密钥
    pub fn record_start(
        &self,
        job_id: Uuid,
        index: usize,
        from: JobState,
        key_id: Uuid,
    ) -> Result<Arc<JobStatus>, OrchestratorError> {
        self.update(job_id, |status, records| {
            apply_target(status, records, index, from, JobState::Running, "started")?;
            status.job.assigned_key_id = Some(key_id);
            if let Some(target) = status.targets.get_mut(index) {
                target.key_id = Some(key_id);
            }
            Ok(())
        })
    }

    /// 记录一次可重试的失败
    ///
    /// 未取消且尝试次数未达上限时，Running → Failed → Retrying 作为一个整体写入；
    /// 否则目标终止于 Failed
    pub fn record_retry(
        &self,
        job_id: Uuid,
        index: usize,
        error: &str,
        max_attempts: u32,
    ) -> Result<RetryDecision, OrchestratorError> {
        let mut decision = RetryDecision::Retry;
        self.update(job_id, |status, records| {
            let attempts = status.targets.get(index).map_or(0, |t| t.attempts);
            apply_target(status, records, index, JobState::Running, JobState::Failed, error)?;
            set_error(status, index, error);

            if status.cancel_requested {
                decision = RetryDecision::Cancelled;
            } else if attempts >= max_attempts {
                decision = RetryDecision::Exhausted;
            } else {
                apply_target(
                    status,
                    records,
                    index,
                    JobState::Failed,
                    JobState::Retrying,
                    &format!("retry after attempt {}", attempts),
                )?;
            }
            Ok(())
        })?;
        Ok(decision)
    }

    /// 记录任务因无可用密钥或限流而暂存
    ///
    /// # 返回值
    ///
    /// 目标仍在等待时返回 true；目标已被取消时返回 false，调用方应丢弃任务
    pub fn record_parked(
        &self,
        job_id: Uuid,
        index: usize,
        reason: &str,
    ) -> Result<bool, OrchestratorError> {
        let mut waiting = true;
        self.update(job_id, |status, records| {
            let current = current_state(status, index)?;
            match current {
                JobState::Pending | JobState::Retrying => {
                    apply_target(status, records, index, current, current, reason)?;
                    if let Some(target) = status.targets.get_mut(index) {
                        target.parked += 1;
                    }
                    Ok(())
                }
                _ => {
                    waiting = false;
                    Ok(())
                }
            }
        })?;
        Ok(waiting)
    }

    /// 累加目标的入库结果
    pub fn record_store_outcomes(
        &self,
        job_id: Uuid,
        index: usize,
        summary: StoreSummary,
    ) -> Result<Arc<JobStatus>, OrchestratorError> {
        self.update(job_id, |status, _| {
            let target = status
                .targets
                .get_mut(index)
                .ok_or_else(|| invalid_target(index))?;
            target.inserted += summary.inserted;
            target.duplicates += summary.duplicates;
            target.rejected += summary.rejected;
            Ok(())
        })
    }

    /// 取消作业中所有等待执行的目标
    ///
    /// 执行中的目标不受影响；返回被取消的目标数
    pub fn cancel_pending(&self, job_id: Uuid) -> Result<usize, OrchestratorError> {
        let mut cancelled = 0;
        self.update(job_id, |status, records| {
            status.cancel_requested = true;
            for index in 0..status.targets.len() {
                let current = status.targets[index].state;
                if matches!(current, JobState::Pending | JobState::Retrying) {
                    apply_target(
                        status,
                        records,
                        index,
                        current,
                        JobState::Cancelled,
                        "cancelled",
                    )?;
                    cancelled += 1;
                }
            }
            Ok(())
        })?;
        info!("Job {} cancelled ({} targets)", job_id, cancelled);
        Ok(cancelled)
    }

    /// 获取作业状态快照
    pub fn status(&self, job_id: Uuid) -> Option<Arc<JobStatus>> {
        self.jobs.get(&job_id).map(|entry| entry.value().clone())
    }

    /// 获取作业的状态转换历史
    pub fn history(&self, job_id: Uuid) -> Vec<TransitionRecord> {
        let log = self.logs.get(&job_id).map(|entry| entry.value().clone());
        log.map(|log| log.as_ref().clone()).unwrap_or_default()
    }

    /// 清理超过保留期的终止作业
    pub fn purge_expired(&self, retention: Duration) -> usize {
        let cutoff = match chrono::Duration::from_std(retention) {
            Ok(retention) => Utc::now() - retention,
            Err(_) => return 0,
        };

        let expired: Vec<Uuid> = self
            .jobs
            .iter()
            .filter(|entry| entry.finished_at.is_some_and(|at| at <= cutoff))
            .map(|entry| *entry.key())
            .collect();

        for job_id in &expired {
            self.jobs.remove(job_id);
            self.logs.remove(job_id);
        }
        if !expired.is_empty() {
            debug!("Purged {} expired jobs", expired.len());
        }
        expired.len()
    }

    /// 跟踪中的作业数
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// 统计信息
    pub fn stats(&self) -> TrackerStats {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let total_processed = succeeded + failed;
        let active_tasks = self
            .jobs
            .iter()
            .map(|entry| entry.count(JobState::Running) as u64)
            .sum();

        TrackerStats {
            total_processed,
            active_tasks,
            success_rate: if total_processed == 0 {
                0.0
            } else {
                succeeded as f64 * 100.0 / total_processed as f64
            },
        }
    }

    /// 写时复制地更新作业状态，并在作业级状态变化时追加记录
    fn update<F>(&self, job_id: Uuid, mutate: F) -> Result<Arc<JobStatus>, OrchestratorError>
    where
        F: FnOnce(&mut JobStatus, &mut Vec<TransitionRecord>) -> Result<(), OrchestratorError>,
    {
        let mut entry = self
            .jobs
            .get_mut(&job_id)
            .ok_or(OrchestratorError::JobNotFound(job_id))?;

        let mut draft = JobStatus::clone(entry.value());
        let mut records = Vec::new();
        mutate(&mut draft, &mut records)?;

        let now = Utc::now();
        let previous = draft.job.state;
        let derived = draft.derive_state();
        if derived != previous {
            draft.job.state = derived;
            records.push(TransitionRecord {
                job_id,
                target: None,
                from: Some(previous),
                to: derived,
                detail: "job state derived from targets".to_string(),
                at: now,
            });
            if derived.is_terminal() && draft.finished_at.is_none() {
                draft.finished_at = Some(now);
                info!("Job {} finished as {}", job_id, derived);
            }
        }
        draft.updated_at = now;

        for record in records.iter().filter(|r| r.target.is_some()) {
            match record.to {
                JobState::Succeeded => {
                    self.succeeded.fetch_add(1, Ordering::Relaxed);
                }
                JobState::Failed if !chained_retry(&records, record) => {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                }
                _ => {}
            }
        }

        let snapshot = Arc::new(draft);
        *entry.value_mut() = snapshot.clone();
        if let Some(mut log_entry) = self.logs.get_mut(&job_id) {
            let log = Arc::make_mut(log_entry.value_mut());
            for record in records {
                append_record(log, record);
            }
        }
        Ok(snapshot)
    }
}

/// 追加记录；暂存记录替换同一目标上一条尚未被状态变化隔开的暂存记录
fn append_record(log: &mut Vec<TransitionRecord>, record: TransitionRecord) {
    if record.target.is_some() && record.from == Some(record.to) {
        let previous = log.iter().rposition(|r| r.target == record.target);
        if let Some(position) = previous {
            if log[position].from == Some(log[position].to) {
                log.remove(position);
            }
        }
    }
    log.push(record);
}

fn current_state(status: &JobStatus, index: usize) -> Result<JobState, OrchestratorError> {
    status
        .targets
        .get(index)
        .map(|t| t.state)
        .ok_or_else(|| invalid_target(index))
}

fn apply_target(
    status: &mut JobStatus,
    records: &mut Vec<TransitionRecord>,
    index: usize,
    from: JobState,
    to: JobState,
    detail: &str,
) -> Result<(), OrchestratorError> {
    if !from.can_transition_to(to) {
        return Err(DomainError::InvalidStateTransition { from, to }.into());
    }
    let job_id = status.job.id;
    let target = status
        .targets
        .get_mut(index)
        .ok_or_else(|| invalid_target(index))?;
    if target.state != from {
        return Err(DomainError::InvalidStateTransition {
            from: target.state,
            to,
        }
        .into());
    }

    target.state = to;
    if from != to {
        target.parked = 0;
    }
    if to == JobState::Running {
        target.attempts += 1;
        status.job.attempt_count += 1;
    }
    records.push(TransitionRecord {
        job_id,
        target: Some(index),
        from: Some(from),
        to,
        detail: detail.to_string(),
        at: Utc::now(),
    });
    Ok(())
}

fn set_error(status: &mut JobStatus, index: usize, error: &str) {
    if let Some(target) = status.targets.get_mut(index) {
        target.last_error = Some(error.to_string());
    }
}

/// Failed 后紧跟同一目标的 Retrying 记录时，这次失败不是终态
fn chained_retry(records: &[TransitionRecord], failed: &TransitionRecord) -> bool {
    records.iter().any(|r| {
        r.target == failed.target
            && r.from == Some(JobState::Failed)
            && r.to == JobState::Retrying
    })
}

fn invalid_target(index: usize) -> OrchestratorError {
    OrchestratorError::InvalidRequest(format!("target index {} out of range", index))
}
