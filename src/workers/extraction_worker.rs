// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::adapters::{AdapterRegistry, ExtractionError};
use crate::domain::models::job::{JobState, TargetTask};
use crate::domain::models::platform::Platform;
use crate::domain::services::credential_pool::{CredentialPool, KeyHandle, KeyOutcome};
use crate::domain::services::job_tracker::{JobTracker, RetryDecision};
use crate::domain::services::rate_limiter::RateLimiter;
use crate::domain::services::result_sink::{ResultSink, StoreSummary};
use crate::queue::scheduler::Scheduler;
use crate::queue::task_queue::TaskQueue;
use crate::utils::errors::OrchestratorError;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// 工作器共享的依赖
pub struct WorkerContext {
    pub scheduler: Arc<Scheduler>,
    pub queue: Arc<dyn TaskQueue>,
    pub pool: Arc<CredentialPool>,
    pub limiter: Arc<RateLimiter>,
    pub registry: AdapterRegistry,
    pub sink: ResultSink,
    pub tracker: Arc<JobTracker>,
    /// 单次抽取的超时时间
    pub extraction_timeout: Duration,
    /// 未由适配器指定时每个目标消耗的令牌数
    pub cost_per_target: f64,
}

/// 抽取工作器
///
/// 从平台队列取出任务并完整处理：租借密钥、限流检查、带超时调用适配器、
/// 入库、归还密钥、记录状态转换
pub struct ExtractionWorker {
    id: usize,
    platform: Platform,
    ctx: Arc<WorkerContext>,
}

impl ExtractionWorker {
    pub fn new(id: usize, platform: Platform, ctx: Arc<WorkerContext>) -> Self {
        Self { id, platform, ctx }
    }

    /// 运行工作器，直到队列关闭
    pub async fn run(self) {
        info!("Extraction worker {}#{} started", self.platform, self.id);

        while let Some(task) = self.ctx.queue.dequeue(self.platform).await {
            if let Err(e) = self.process_task(task).await {
                error!("Error processing task: {}", e);
            }
        }

        info!("Extraction worker {}#{} stopped", self.platform, self.id);
    }

    #[instrument(skip(self, task), fields(job_id = %task.job_id, platform = %task.platform, target = %task.target))]
    async fn process_task(&self, task: TargetTask) -> Result<(), OrchestratorError> {
        let waiting = task.waiting_state();
        if !self.still_waiting(&task, waiting) {
            debug!("Task no longer waiting, dropped");
            return Ok(());
        }

        let Some(adapter) = self.ctx.registry.get(task.platform) else {
            return Err(OrchestratorError::InvalidRequest(format!(
                "no extraction adapter registered for platform '{}'",
                task.platform
            )));
        };
        let cost = adapter
            .cost(1)
            .unwrap_or(self.ctx.cost_per_target);

        let handle = match self.ctx.pool.acquire_within_budget(
            task.platform,
            &task.purpose,
            &self.ctx.limiter,
            cost,
        ) {
            Ok(handle) => handle,
            Err(OrchestratorError::NoKeyAvailable { .. }) => {
                self.ctx.scheduler.park(task, "no key available", None)?;
                return Ok(());
            }
            Err(OrchestratorError::RateLimited { retry_after, .. }) => {
                self.ctx.scheduler.park(task, "rate limited", retry_after)?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if let Err(e) =
            self.ctx
                .tracker
                .record_start(task.job_id, task.index, waiting, handle.key_id)
        {
            // 领取密钥期间目标被取消
            debug!("Task could not start: {}", e);
            self.release(handle, KeyOutcome::Unused).await;
            return Ok(());
        }

        debug!("Extracting with key {}", handle.fingerprint);
        let started = Instant::now();
        let targets = std::slice::from_ref(&task.target);
        let result = match timeout(
            self.ctx.extraction_timeout,
            adapter.extract(&handle.key_value, targets),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout(self.ctx.extraction_timeout)),
        };
        histogram!(
            "socialrs_extraction_duration_seconds",
            "platform" => task.platform.code()
        )
        .record(started.elapsed().as_secs_f64());

        match result {
            Ok(records) => {
                let stored = self.ctx.sink.store(task.platform, &records).await;
                self.release(handle, KeyOutcome::Success).await;
                match stored {
                    Ok(outcomes) => {
                        let summary = StoreSummary::from_outcomes(&outcomes);
                        self.ctx
                            .tracker
                            .record_store_outcomes(task.job_id, task.index, summary)?;
                        self.ctx.tracker.record_transition(
                            task.job_id,
                            task.index,
                            JobState::Running,
                            JobState::Succeeded,
                            format!(
                                "{} inserted, {} duplicates, {} rejected",
                                summary.inserted, summary.duplicates, summary.rejected
                            ),
                        )?;
                        self.count("succeeded");
                        info!(
                            "Target succeeded ({} records, {} inserted)",
                            records.len(),
                            summary.inserted
                        );
                        Ok(())
                    }
                    Err(e) if e.is_retryable() => {
                        warn!("Failed to store results: {}", e);
                        self.fail_transient(task, &format!("storage error: {}", e))
                            .await
                    }
                    Err(e) => {
                        warn!("Failed to store results permanently: {}", e);
                        self.ctx.tracker.record_transition(
                            task.job_id,
                            task.index,
                            JobState::Running,
                            JobState::Failed,
                            format!("storage error: {}", e),
                        )?;
                        self.count("failed");
                        Ok(())
                    }
                }
            }
            Err(e) => {
                self.release(handle, e.key_outcome()).await;
                if e.is_retryable() {
                    warn!("Extraction failed: {}", e);
                    self.fail_transient(task, &e.to_string()).await
                } else {
                    warn!("Extraction failed permanently: {}", e);
                    self.ctx.tracker.record_transition(
                        task.job_id,
                        task.index,
                        JobState::Running,
                        JobState::Failed,
                        e.to_string(),
                    )?;
                    self.count("failed");
                    Ok(())
                }
            }
        }
    }

    /// 可重试的失败：还有尝试次数且未取消时放回队列末尾，否则终止于 Failed
    async fn fail_transient(&self, task: TargetTask, error: &str) -> Result<(), OrchestratorError> {
        let max_attempts = self.ctx.scheduler.retry_policy().max_attempts;
        match self
            .ctx
            .tracker
            .record_retry(task.job_id, task.index, error, max_attempts)?
        {
            RetryDecision::Retry => {
                self.count("retried");
                self.ctx.scheduler.requeue_retry(task).await
            }
            RetryDecision::Exhausted => {
                warn!("Target failed after {} attempts", max_attempts);
                self.count("failed");
                Ok(())
            }
            RetryDecision::Cancelled => {
                debug!("Job cancelled, target not retried");
                self.count("failed");
                Ok(())
            }
        }
    }

    fn still_waiting(&self, task: &TargetTask, waiting: JobState) -> bool {
        self.ctx
            .tracker
            .status(task.job_id)
            .and_then(|status| status.targets.get(task.index).map(|t| t.state))
            == Some(waiting)
    }

    async fn release(&self, handle: KeyHandle, outcome: KeyOutcome) {
        let fingerprint = handle.fingerprint.clone();
        if let Err(e) = self.ctx.pool.release(handle, outcome).await {
            warn!("Failed to persist release of key {}: {}", fingerprint, e);
        }
    }

    fn count(&self, outcome: &'static str) {
        counter!(
            "socialrs_tasks_total",
            "platform" => self.platform.code(),
            "outcome" => outcome
        )
        .increment(1);
    }
}
