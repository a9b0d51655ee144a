// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::adapters::AdapterRegistry;
use crate::domain::models::job::{DomainError, Job, JobStatus, TargetTask};
use crate::domain::models::platform::Platform;
use crate::domain::models::scraper_key::DEFAULT_PURPOSE;
use crate::domain::services::credential_pool::CredentialPool;
use crate::domain::services::job_tracker::JobTracker;
use crate::queue::task_queue::{QueueError, TaskQueue};
use crate::utils::errors::OrchestratorError;
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::targets::normalize_targets;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info};
use uuid::Uuid;

impl From<QueueError> for OrchestratorError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Closed => OrchestratorError::ShuttingDown,
        }
    }
}

/// 作业调度器
///
/// 负责提交校验、按目标拆分入队、取消，以及重试与暂存的重新入队
pub struct Scheduler {
    registry: AdapterRegistry,
    tracker: Arc<JobTracker>,
    queue: Arc<dyn TaskQueue>,
    retry: RetryPolicy,
}

impl Scheduler {
    pub fn new(
        registry: AdapterRegistry,
        tracker: Arc<JobTracker>,
        queue: Arc<dyn TaskQueue>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            tracker,
            queue,
            retry,
        }
    }

    /// 重试策略
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// 提交作业
    ///
    /// 校验平台与目标后登记作业，并为每个目标入队一个任务。立即返回，不等待抽取。
    ///
    /// # 返回值
    ///
    /// * `Ok(Arc<JobStatus>)` - 已登记作业的初始快照
    /// * `Err(OrchestratorError::InvalidRequest)` - 平台为空、未知或没有适配器，或目标为空
    /// * `Err(OrchestratorError::ShuttingDown)` - 队列已关闭；入队中途关闭时作业被取消
    pub async fn submit(
        &self,
        platform: &str,
        targets: &[String],
        purpose: Option<&str>,
    ) -> Result<Arc<JobStatus>, OrchestratorError> {
        let platform = parse_platform(platform)?;
        if !self.registry.supports(platform) {
            return Err(OrchestratorError::InvalidRequest(format!(
                "no extraction adapter registered for platform '{}'",
                platform
            )));
        }

        let targets = normalize_targets(targets);
        if targets.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "at least one target is required".to_string(),
            ));
        }

        let purpose = purpose
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PURPOSE);

        if self.queue.is_closed() {
            return Err(OrchestratorError::ShuttingDown);
        }

        let job = Job::new(platform, purpose, targets);
        let job_id = job.id;
        let tasks = job.tasks();
        let snapshot = self.tracker.register(job);

        for task in tasks {
            if let Err(e) = self.queue.enqueue(task).await {
                // 已登记但未入队的目标不会再被处理
                self.tracker.cancel_pending(job_id)?;
                return Err(e.into());
            }
        }

        counter!("socialrs_jobs_submitted_total", "platform" => platform.code()).increment(1);
        info!(
            "Job {} submitted for {} with {} targets",
            snapshot.job.id,
            platform,
            snapshot.targets.len()
        );
        Ok(snapshot)
    }

    /// 取消作业中所有尚未开始或等待重试的目标
    pub fn cancel(&self, job_id: Uuid) -> Result<usize, OrchestratorError> {
        self.tracker.cancel_pending(job_id)
    }

    /// 暂存任务
    ///
    /// 按暂存次数计算指数退避；有限流提示时至少等待提示的时长，
    /// 但不超过最大退避。暂存不消耗尝试次数。
    /// 返回 false 表示目标已被取消，任务被丢弃。
    pub fn park(
        &self,
        mut task: TargetTask,
        reason: &str,
        hint: Option<Duration>,
    ) -> Result<bool, OrchestratorError> {
        if !self.tracker.record_parked(task.job_id, task.index, reason)? {
            debug!("Dropping parked task {}#{}: no longer waiting", task.job_id, task.index);
            return Ok(false);
        }

        task.parked += 1;
        let backoff = self.retry.calculate_backoff(task.parked);
        let delay = match hint {
            Some(hint) => backoff.max(hint).min(self.retry.max_backoff),
            None => backoff,
        };
        self.queue.requeue_after(task, delay)?;
        Ok(true)
    }

    /// 将等待重试的任务放回队列末尾
    pub async fn requeue_retry(&self, mut task: TargetTask) -> Result<(), OrchestratorError> {
        task.attempt += 1;
        task.parked = 0;
        self.queue.enqueue(task).await?;
        Ok(())
    }

    /// 启动维护任务
    ///
    /// 定期清理超过保留期的终止作业，并从存储刷新凭据池。
    /// `shutdown` 变为 true 时退出。
    pub fn start_maintenance(
        &self,
        pool: Arc<CredentialPool>,
        every: Duration,
        retention: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let tracker = self.tracker.clone();

        tokio::spawn(async move {
            let mut ticker = interval(every);
            // 第一次 tick 立即完成
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                let purged = tracker.purge_expired(retention);
                if purged > 0 {
                    info!("Purged {} expired jobs", purged);
                }

                if let Err(e) = pool.refresh().await {
                    error!("Failed to refresh credential pool: {}", e);
                }

                debug!("Scheduler maintenance tick");
            }
            debug!("Scheduler maintenance stopped");
        })
    }
}

/// 解析调用方提供的平台代码，空白或未知代码映射为 InvalidRequest
pub(crate) fn parse_platform(platform: &str) -> Result<Platform, OrchestratorError> {
    if platform.trim().is_empty() {
        return Err(OrchestratorError::InvalidRequest(
            "platform is required".to_string(),
        ));
    }
    platform.parse().map_err(|e: DomainError| match e {
        DomainError::UnknownPlatform(code) => {
            OrchestratorError::InvalidRequest(format!("unknown platform '{}'", code))
        }
        other => OrchestratorError::Domain(other),
    })
}
