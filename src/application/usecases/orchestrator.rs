// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::adapters::AdapterRegistry;
use crate::application::dto::job_request::{
    CancelJobResponse, JobStatusResponse, SubmitJobRequest, SubmitJobResponse,
};
use crate::application::dto::scrape_result_response::ScrapeResultResponse;
use crate::application::dto::scraper_key_response::{
    ImportKeysRequest, ImportKeysResponse, ScraperKeyResponse,
};
use crate::application::dto::stats_response::ScrapingStatsResponse;
use crate::config::settings::Settings;
use crate::domain::models::job::TransitionRecord;
use crate::domain::models::scraper_key::DEFAULT_PURPOSE;
use crate::domain::repositories::scrape_result_repository::ScrapeResultRepository;
use crate::domain::repositories::scraper_key_repository::ScraperKeyRepository;
use crate::domain::services::credential_pool::CredentialPool;
use crate::domain::services::job_tracker::JobTracker;
use crate::domain::services::rate_limiter::RateLimiter;
use crate::domain::services::result_sink::ResultSink;
use crate::infrastructure::crypto::KeyCipher;
use crate::infrastructure::database::connection::create_pool;
use crate::infrastructure::database::schema::ensure_schema;
use crate::infrastructure::metrics::init_metrics;
use crate::infrastructure::repositories::{
    InMemoryScrapeResultRepository, InMemoryScraperKeyRepository, ScrapeResultRepositoryImpl,
    ScraperKeyRepositoryImpl,
};
use crate::queue::scheduler::{parse_platform, Scheduler};
use crate::queue::task_queue::{InMemoryTaskQueue, TaskQueue};
use crate::utils::errors::OrchestratorError;
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::{WorkerContext, WorkerManager};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

struct Runtime {
    workers: WorkerManager,
    maintenance: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

/// 编排器
///
/// 根据配置组装凭据池、限流器、队列、调度器、工作池、结果汇入器与作业跟踪器，
/// 并对外提供提交、取消、查询与密钥管理操作
pub struct Orchestrator {
    settings: Settings,
    registry: AdapterRegistry,
    pool: Arc<CredentialPool>,
    limiter: Arc<RateLimiter>,
    tracker: Arc<JobTracker>,
    queue: Arc<dyn TaskQueue>,
    scheduler: Arc<Scheduler>,
    sink: ResultSink,
    runtime: Mutex<Option<Runtime>>,
}

impl Orchestrator {
    /// 使用给定仓库创建编排器，并从存储加载密钥
    pub async fn new(
        settings: Settings,
        registry: AdapterRegistry,
        keys: Arc<dyn ScraperKeyRepository>,
        results: Arc<dyn ScrapeResultRepository>,
    ) -> Result<Self, OrchestratorError> {
        let pool = Arc::new(
            CredentialPool::load(keys, settings.credentials.per_key_concurrency).await?,
        );
        let limiter = Arc::new(RateLimiter::from_settings(&settings.platforms));
        let tracker = Arc::new(JobTracker::new());
        let queue: Arc<dyn TaskQueue> = Arc::new(InMemoryTaskQueue::new());
        let scheduler = Arc::new(Scheduler::new(
            registry.clone(),
            tracker.clone(),
            queue.clone(),
            RetryPolicy::from(&settings.retry),
        ));

        Ok(Self {
            settings,
            registry,
            pool,
            limiter,
            tracker,
            queue,
            scheduler,
            sink: ResultSink::new(results),
            runtime: Mutex::new(None),
        })
    }

    /// 使用内存仓库创建编排器
    pub async fn in_memory(
        settings: Settings,
        registry: AdapterRegistry,
    ) -> Result<Self, OrchestratorError> {
        Self::new(
            settings,
            registry,
            Arc::new(InMemoryScraperKeyRepository::new()),
            Arc::new(InMemoryScrapeResultRepository::new()),
        )
        .await
    }

    /// 连接数据库并创建编排器
    ///
    /// 先校验配置取值范围；`database.bootstrap_schema` 为 true 时创建缺失的数据表；
    /// `metrics.enabled` 为 true 时安装 Prometheus 导出器
    pub async fn connect(settings: Settings, registry: AdapterRegistry) -> anyhow::Result<Self> {
        settings.check().context("Invalid settings")?;
        let passphrase = settings
            .credentials
            .encryption_key
            .as_deref()
            .context("credentials.encryption_key must be set to store keys in a database")?;
        let cipher = KeyCipher::from_passphrase(passphrase).context("Invalid encryption key")?;
        init_metrics(&settings.metrics);

        let db = create_pool(&settings.database)
            .await
            .context("Failed to connect to database")?;
        if settings.database.bootstrap_schema {
            ensure_schema(&db)
                .await
                .context("Failed to bootstrap database schema")?;
        }

        let db = Arc::new(db);
        let orchestrator = Self::new(
            settings,
            registry,
            Arc::new(ScraperKeyRepositoryImpl::new(db.clone(), cipher)),
            Arc::new(ScrapeResultRepositoryImpl::new(db)),
        )
        .await
        .context("Failed to initialize orchestrator")?;
        Ok(orchestrator)
    }

    /// 启动工作池和维护任务，重复调用无效果
    pub async fn start(&self) {
        let mut runtime = self.runtime.lock().await;
        if runtime.is_some() {
            return;
        }

        let ctx = Arc::new(WorkerContext {
            scheduler: self.scheduler.clone(),
            queue: self.queue.clone(),
            pool: self.pool.clone(),
            limiter: self.limiter.clone(),
            registry: self.registry.clone(),
            sink: self.sink.clone(),
            tracker: self.tracker.clone(),
            extraction_timeout: Duration::from_millis(self.settings.extraction.timeout_ms),
            cost_per_target: self.settings.extraction.cost_per_target,
        });
        let mut workers = WorkerManager::new(ctx);
        workers.start_workers(&self.settings.platforms);

        let (stop, stopped) = watch::channel(false);
        let maintenance = self.scheduler.start_maintenance(
            self.pool.clone(),
            Duration::from_secs(self.settings.tracker.maintenance_interval_secs.max(1)),
            Duration::from_secs(self.settings.tracker.retention_secs),
            stopped,
        );

        *runtime = Some(Runtime {
            workers,
            maintenance,
            stop,
        });
        info!("Orchestrator started");
    }

    /// 优雅关闭
    ///
    /// 关闭队列后等待工作器完成当前任务；暂存中的任务被丢弃
    pub async fn shutdown(&self) {
        self.queue.close();
        let runtime = self.runtime.lock().await.take();
        if let Some(mut runtime) = runtime {
            let _ = runtime.stop.send(true);
            runtime.workers.shutdown().await;
            if let Err(e) = runtime.maintenance.await {
                error!("Maintenance task terminated abnormally: {}", e);
            }
        }
        info!("Orchestrator shut down");
    }

    /// 提交抽取作业，立即返回
    pub async fn submit(
        &self,
        request: SubmitJobRequest,
    ) -> Result<SubmitJobResponse, OrchestratorError> {
        request
            .validate()
            .map_err(|e| OrchestratorError::InvalidRequest(e.to_string()))?;
        if self.queue.is_closed() {
            return Err(OrchestratorError::ShuttingDown);
        }

        let snapshot = self
            .scheduler
            .submit(
                &request.platform,
                &request.targets,
                request.purpose.as_deref(),
            )
            .await?;

        Ok(SubmitJobResponse {
            job_id: snapshot.job.id,
            status: "started".to_string(),
            count: snapshot.targets.len(),
        })
    }

    /// 取消作业中尚未开始的目标
    pub fn cancel(&self, job_id: Uuid) -> Result<CancelJobResponse, OrchestratorError> {
        let cancelled = self.scheduler.cancel(job_id)?;
        Ok(CancelJobResponse { job_id, cancelled })
    }

    /// 查询作业状态
    pub fn status(&self, job_id: Uuid) -> Result<JobStatusResponse, OrchestratorError> {
        self.tracker
            .status(job_id)
            .map(|status| JobStatusResponse::from(status.as_ref()))
            .ok_or(OrchestratorError::JobNotFound(job_id))
    }

    /// 查询作业的状态转换历史
    pub fn history(&self, job_id: Uuid) -> Vec<TransitionRecord> {
        self.tracker.history(job_id)
    }

    /// 最近的抓取结果，按创建时间倒序
    ///
    /// 未指定数量时使用 `results.default_limit`，并限制在 `results.max_limit` 以内
    pub async fn latest_results(
        &self,
        limit: Option<u64>,
    ) -> Result<Vec<ScrapeResultResponse>, OrchestratorError> {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(self.settings.results.default_limit)
            .min(self.settings.results.max_limit.max(1));

        let results = self.sink.latest(limit).await?;
        Ok(results.into_iter().map(ScrapeResultResponse::from).collect())
    }

    /// 列出全部密钥（不含密钥原文）
    pub fn list_keys(&self) -> Vec<ScraperKeyResponse> {
        self.pool
            .list()
            .into_iter()
            .map(ScraperKeyResponse::from)
            .collect()
    }

    /// 添加单个密钥
    pub async fn add_key(
        &self,
        platform: &str,
        key_value: &str,
        purpose: Option<&str>,
    ) -> Result<ScraperKeyResponse, OrchestratorError> {
        let platform = parse_platform(platform)?;
        let summary = self
            .pool
            .add_key(platform, key_value, purpose.unwrap_or(DEFAULT_PURPOSE))
            .await?;
        Ok(summary.into())
    }

    /// 批量导入逗号分隔的密钥
    pub async fn import_keys(
        &self,
        request: ImportKeysRequest,
    ) -> Result<ImportKeysResponse, OrchestratorError> {
        request
            .validate()
            .map_err(|e| OrchestratorError::InvalidRequest(e.to_string()))?;
        let platform = parse_platform(&request.platform)?;
        let purpose = request.purpose.as_deref().unwrap_or(DEFAULT_PURPOSE);

        let outcome = self
            .pool
            .import_keys(platform, purpose, &request.keys)
            .await?;
        Ok(outcome.into())
    }

    /// 停用密钥
    pub async fn deactivate_key(&self, key_id: Uuid) -> Result<ScraperKeyResponse, OrchestratorError> {
        let summary = self.pool.deactivate(key_id).await?;
        self.limiter.forget(summary.platform, key_id);
        Ok(summary.into())
    }

    /// 抓取统计
    pub fn stats(&self) -> ScrapingStatsResponse {
        self.tracker.stats().into()
    }

    /// 运行中的工作器数量，未启动时为 0
    pub async fn worker_count(&self) -> usize {
        self.runtime
            .lock()
            .await
            .as_ref()
            .map_or(0, |runtime| runtime.workers.worker_count())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn credential_pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    pub fn queue(&self) -> &Arc<dyn TaskQueue> {
        &self.queue
    }
}
