// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    start_orchestrator, test_settings, wait_for, wait_for_job, ScriptedAdapter, Step,
};
use chrono::{Duration as ChronoDuration, Utc};
use socialrs::adapters::{AdapterRegistry, ExtractionError};
use socialrs::application::dto::job_request::SubmitJobRequest;
use socialrs::application::dto::scraper_key_response::ImportKeysRequest;
use socialrs::application::usecases::Orchestrator;
use socialrs::domain::models::job::JobState;
use socialrs::domain::models::platform::Platform;
use socialrs::domain::models::scrape_result::{RawRecord, ScrapeResult};
use socialrs::domain::repositories::scrape_result_repository::ScrapeResultRepository;
use socialrs::infrastructure::repositories::{
    InMemoryScrapeResultRepository, InMemoryScraperKeyRepository,
};
use socialrs::utils::errors::OrchestratorError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

async fn submit(orchestrator: &Orchestrator, platform: &str, names: &[&str]) -> Uuid {
    orchestrator
        .submit(SubmitJobRequest::new(platform, targets(names)))
        .await
        .unwrap()
        .job_id
}

/// 提交立即返回，不等待抽取完成
#[tokio::test]
async fn test_submit_returns_immediately() {
    // Given: 抽取需要 1 秒的适配器
    let adapter = ScriptedAdapter::new(Platform::TikTok, Step::Succeed(Duration::from_secs(1)));
    let orchestrator = start_orchestrator(test_settings(), adapter).await;
    orchestrator.add_key("tk", "tk-key-1", None).await.unwrap();

    // When: 提交作业
    let started = Instant::now();
    let response = orchestrator
        .submit(SubmitJobRequest::new("tk", targets(&["alice", "bob"])))
        .await
        .unwrap();

    // Then: 立即返回作业ID
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(response.status, "started");
    assert_eq!(response.count, 2);
    let status = orchestrator.status(response.job_id).unwrap();
    assert!(!status.state.is_terminal());

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_invalid_submissions_are_rejected() {
    let adapter = ScriptedAdapter::new(Platform::TikTok, Step::ok());
    let orchestrator = start_orchestrator(test_settings(), adapter).await;

    let cases = vec![
        SubmitJobRequest::new("", targets(&["alice"])),
        SubmitJobRequest::new("myspace", targets(&["alice"])),
        SubmitJobRequest::new("tk", vec![]),
        SubmitJobRequest::new("tk", targets(&["  ", "@"])),
        // 平台合法但没有注册适配器
        SubmitJobRequest::new("ig", targets(&["alice"])),
    ];

    for request in cases {
        let result = orchestrator.submit(request.clone()).await;
        assert!(
            matches!(result, Err(OrchestratorError::InvalidRequest(_))),
            "expected InvalidRequest for {:?}",
            request
        );
    }

    orchestrator.shutdown().await;
}

/// 完整流程：租借密钥、抽取、入库、结果查询
#[tokio::test]
async fn test_job_succeeds_and_results_are_queryable() {
    // Given: 两个密钥
    let adapter = ScriptedAdapter::new(Platform::TikTok, Step::ok());
    let orchestrator = start_orchestrator(test_settings(), adapter.clone()).await;
    orchestrator.add_key("tk", "tk-key-1", None).await.unwrap();
    orchestrator.add_key("tk", "tk-key-2", None).await.unwrap();
    // 只为注册了适配器的平台启动工作池
    assert_eq!(orchestrator.worker_count().await, 4);

    // When: 提交三个目标
    let job_id = submit(&orchestrator, "tk", &["alice", "@bob", " carol "]).await;

    // Then: 作业成功，结果规范化后入库
    assert_eq!(wait_for_job(&orchestrator, job_id).await, JobState::Succeeded);
    let status = orchestrator.status(job_id).unwrap();
    assert!(status.targets.iter().all(|t| t.inserted == 1 && t.attempts == 1));
    assert_eq!(status.attempt_count, 3);
    assert!(status.assigned_key_id.is_some());

    let results = orchestrator.latest_results(None).await.unwrap();
    let mut usernames: Vec<String> = results.iter().map(|r| r.username.clone()).collect();
    usernames.sort();
    assert_eq!(usernames, vec!["alice", "bob", "carol"]);
    assert_eq!(adapter.calls(), 3);

    let stats = orchestrator.stats();
    assert_eq!(stats.total_processed, 3);
    assert_eq!(stats.active_tasks, 0);
    assert_eq!(stats.success_rate, 100.0);

    // 密钥全部归还
    assert_eq!(orchestrator.credential_pool().leased(), 0);
    orchestrator.shutdown().await;
}

/// 没有可用密钥时目标保持 Pending，密钥出现后继续执行
#[tokio::test]
async fn test_zero_keys_parks_until_key_added() {
    // Given: 没有任何密钥
    let adapter = ScriptedAdapter::new(Platform::X, Step::ok());
    let orchestrator = start_orchestrator(test_settings(), adapter.clone()).await;

    // When: 提交作业
    let job_id = submit(&orchestrator, "x", &["alice"]).await;
    let parked = wait_for(
        || {
            orchestrator
                .history(job_id)
                .iter()
                .any(|r| r.detail == "no key available")
        },
        Duration::from_secs(2),
    )
    .await;

    // Then: 任务被暂存而不是丢弃
    assert!(parked);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let status = orchestrator.status(job_id).unwrap();
    assert_eq!(status.state, JobState::Pending);
    assert_eq!(status.targets[0].state, JobState::Pending);
    assert_eq!(status.targets[0].attempts, 0);
    assert_eq!(adapter.calls(), 0);

    // When: 添加密钥
    orchestrator.add_key("x", "x-key-1", None).await.unwrap();

    // Then: 暂存的任务最终完成
    assert_eq!(wait_for_job(&orchestrator, job_id).await, JobState::Succeeded);
    orchestrator.shutdown().await;
}

/// 超时是暂时性失败：密钥被归还，总共尝试 max_attempts 次后终止于 Failed
#[tokio::test]
async fn test_timeout_retried_until_max_attempts() {
    // Given: 抽取总是超过超时时间
    let mut settings = test_settings();
    settings.extraction.timeout_ms = 50;
    settings.retry.max_attempts = 3;
    let adapter = ScriptedAdapter::new(
        Platform::Instagram,
        Step::Succeed(Duration::from_millis(500)),
    );
    let orchestrator = start_orchestrator(settings, adapter.clone()).await;
    orchestrator.add_key("ig", "ig-key-1", None).await.unwrap();

    // When: 提交作业
    let job_id = submit(&orchestrator, "ig", &["alice"]).await;

    // Then: 三次尝试后失败
    assert_eq!(wait_for_job(&orchestrator, job_id).await, JobState::Failed);
    let status = orchestrator.status(job_id).unwrap();
    assert_eq!(status.targets[0].attempts, 3);
    assert!(status.targets[0]
        .last_error
        .as_deref()
        .unwrap_or_default()
        .contains("timed out"));
    assert_eq!(adapter.calls(), 3);

    // 密钥已归还且仍然可用
    assert_eq!(orchestrator.credential_pool().leased(), 0);
    assert!(orchestrator.list_keys().iter().all(|k| k.is_active));

    let history = orchestrator.history(job_id);
    let retries = history
        .iter()
        .filter(|r| r.target == Some(0) && r.to == JobState::Retrying)
        .count();
    assert_eq!(retries, 2);
    orchestrator.shutdown().await;
}

/// 永久性失败不重试；只要有目标成功作业就是 Succeeded
#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    // Given: 第一次调用永久失败，之后成功
    let adapter = ScriptedAdapter::scripted(
        Platform::TikTok,
        vec![Step::fail(ExtractionError::Permanent("user not found".into()))],
        Step::ok(),
    );
    let orchestrator = start_orchestrator(test_settings(), adapter.clone()).await;
    orchestrator.add_key("tk", "tk-key-1", None).await.unwrap();

    // When: 提交两个目标
    let job_id = submit(&orchestrator, "tk", &["ghost", "alice"]).await;

    // Then: 一个失败一个成功，作业成功
    assert_eq!(wait_for_job(&orchestrator, job_id).await, JobState::Succeeded);
    let status = orchestrator.status(job_id).unwrap();
    let failed = status
        .targets
        .iter()
        .filter(|t| t.state == JobState::Failed)
        .count();
    assert_eq!(failed, 1);
    assert_eq!(adapter.calls(), 2);
    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_job_fails_when_every_target_fails() {
    let adapter = ScriptedAdapter::new(
        Platform::TikTok,
        Step::fail(ExtractionError::Permanent("private account".into())),
    );
    let orchestrator = start_orchestrator(test_settings(), adapter).await;
    orchestrator.add_key("tk", "tk-key-1", None).await.unwrap();

    let job_id = submit(&orchestrator, "tk", &["a", "b"]).await;

    assert_eq!(wait_for_job(&orchestrator, job_id).await, JobState::Failed);
    assert_eq!(orchestrator.stats().success_rate, 0.0);
    orchestrator.shutdown().await;
}

/// 密钥被封锁时只停用该密钥，目标换密钥重试
#[tokio::test]
async fn test_blocked_key_is_deactivated_and_target_retried() {
    // Given: 两个密钥，第一次调用报告密钥被封锁
    let mut settings = test_settings();
    settings.platforms.tk.concurrency = 1;
    let adapter = ScriptedAdapter::scripted(
        Platform::TikTok,
        vec![Step::fail(ExtractionError::CredentialBlocked("429 forever".into()))],
        Step::ok(),
    );
    let orchestrator = start_orchestrator(settings, adapter.clone()).await;
    orchestrator.add_key("tk", "tk-key-1", None).await.unwrap();
    orchestrator.add_key("tk", "tk-key-2", None).await.unwrap();

    // When: 提交作业
    let job_id = submit(&orchestrator, "tk", &["alice"]).await;

    // Then: 目标在另一个密钥上成功
    assert_eq!(wait_for_job(&orchestrator, job_id).await, JobState::Succeeded);
    let status = orchestrator.status(job_id).unwrap();
    assert_eq!(status.targets[0].attempts, 2);

    let used = adapter.keys_used();
    assert_eq!(used.len(), 2);
    assert_ne!(used[0], used[1]);

    let keys = orchestrator.list_keys();
    assert_eq!(keys.iter().filter(|k| !k.is_active).count(), 1);
    assert_eq!(keys.iter().filter(|k| k.is_active).count(), 1);
    orchestrator.shutdown().await;
}

/// 取消会把所有等待中的目标（包括暂存的）置为 Cancelled
#[tokio::test]
async fn test_cancel_pending_targets() {
    // Given: 没有密钥，任务全部暂存
    let adapter = ScriptedAdapter::new(Platform::X, Step::ok());
    let orchestrator = start_orchestrator(test_settings(), adapter.clone()).await;
    let job_id = submit(&orchestrator, "x", &["a", "b", "c"]).await;
    wait_for(
        || orchestrator.queue().parked_len(Platform::X) > 0,
        Duration::from_secs(2),
    )
    .await;

    // When: 取消作业
    let response = orchestrator.cancel(job_id).unwrap();

    // Then: 全部目标取消，作业取消
    assert_eq!(response.cancelled, 3);
    let status = orchestrator.status(job_id).unwrap();
    assert_eq!(status.state, JobState::Cancelled);
    assert!(status.cancel_requested);
    assert!(status.finished_at.is_some());

    // 之后添加密钥也不会执行已取消的任务
    orchestrator.add_key("x", "x-key-1", None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(adapter.calls(), 0);
    assert_eq!(orchestrator.status(job_id).unwrap().state, JobState::Cancelled);
    orchestrator.shutdown().await;
}

/// 取消后执行中的目标完成；其暂时性失败不再重试
#[tokio::test]
async fn test_cancel_does_not_interrupt_in_flight_target() {
    // Given: 一次较慢的暂时性失败
    let adapter = ScriptedAdapter::scripted(
        Platform::TikTok,
        vec![Step::Fail(
            Duration::from_millis(300),
            ExtractionError::Transient("connection reset".into()),
        )],
        Step::ok(),
    );
    let orchestrator = start_orchestrator(test_settings(), adapter.clone()).await;
    orchestrator.add_key("tk", "tk-key-1", None).await.unwrap();
    let job_id = submit(&orchestrator, "tk", &["alice"]).await;
    let running = wait_for(
        || {
            orchestrator
                .status(job_id)
                .map(|s| s.targets[0].state == JobState::Running)
                .unwrap_or(false)
        },
        Duration::from_secs(2),
    )
    .await;
    assert!(running);

    // When: 目标执行中取消
    let response = orchestrator.cancel(job_id).unwrap();
    assert_eq!(response.cancelled, 0);

    // Then: 失败成为终态，不再重试
    assert_eq!(wait_for_job(&orchestrator, job_id).await, JobState::Failed);
    assert_eq!(adapter.calls(), 1);
    orchestrator.shutdown().await;
}

/// K 个密钥、每个密钥并发 1 时最多同时持有 K 个租约
#[tokio::test]
async fn test_at_most_k_leases_are_held() {
    // Given: 两个密钥，工作池远大于密钥数
    let mut settings = test_settings();
    settings.platforms.tk.concurrency = 8;
    settings.credentials.per_key_concurrency = 1;
    let adapter = ScriptedAdapter::new(Platform::TikTok, Step::Succeed(Duration::from_millis(80)));
    let orchestrator = start_orchestrator(settings, adapter.clone()).await;
    orchestrator.add_key("tk", "tk-key-1", None).await.unwrap();
    orchestrator.add_key("tk", "tk-key-2", None).await.unwrap();

    // When: 提交六个目标
    let job_id = submit(&orchestrator, "tk", &["a", "b", "c", "d", "e", "f"]).await;

    // Then: 租约数从未超过密钥数
    let mut max_leased = 0;
    let finished = wait_for(
        || {
            max_leased = max_leased.max(orchestrator.credential_pool().leased());
            orchestrator
                .status(job_id)
                .map(|s| s.finished_at.is_some())
                .unwrap_or(false)
        },
        Duration::from_secs(10),
    )
    .await;
    assert!(finished);
    assert!(max_leased <= 2);
    assert!(adapter.peak_concurrency() <= 2);
    assert_eq!(orchestrator.status(job_id).unwrap().state, JobState::Succeeded);

    let mut used = adapter.keys_used();
    used.sort();
    used.dedup();
    assert_eq!(used.len(), 2);
    orchestrator.shutdown().await;
}

/// 令牌不足时任务以 "rate limited" 暂存
#[tokio::test]
async fn test_rate_limited_tasks_are_parked() {
    // Given: 令牌桶只够一次抽取且几乎不补充
    let mut settings = test_settings();
    settings.platforms.x.bucket_capacity = 1.0;
    settings.platforms.x.refill_per_second = 0.001;
    let adapter = ScriptedAdapter::new(Platform::X, Step::ok());
    let orchestrator = start_orchestrator(settings, adapter.clone()).await;
    orchestrator.add_key("x", "x-key-1", None).await.unwrap();

    // When: 提交两个目标
    let job_id = submit(&orchestrator, "x", &["alice", "bob"]).await;

    // Then: 一个成功，另一个被限流暂存
    let limited = wait_for(
        || {
            orchestrator
                .history(job_id)
                .iter()
                .any(|r| r.detail == "rate limited")
        },
        Duration::from_secs(2),
    )
    .await;
    assert!(limited);
    let status = orchestrator.status(job_id).unwrap();
    assert_eq!(status.state, JobState::Running);
    assert_eq!(adapter.calls(), 1);
    orchestrator.shutdown().await;
}

/// 同一自然键的结果只存储一次
#[tokio::test]
async fn test_duplicate_results_across_jobs() {
    let adapter = ScriptedAdapter::new(Platform::Instagram, Step::ok());
    let orchestrator = start_orchestrator(test_settings(), adapter).await;
    orchestrator.add_key("ig", "ig-key-1", None).await.unwrap();

    let first = submit(&orchestrator, "ig", &["alice"]).await;
    assert_eq!(wait_for_job(&orchestrator, first).await, JobState::Succeeded);
    let second = submit(&orchestrator, "ig", &["@Alice"]).await;
    assert_eq!(wait_for_job(&orchestrator, second).await, JobState::Succeeded);

    let status = orchestrator.status(second).unwrap();
    assert_eq!(status.targets[0].inserted, 0);
    assert_eq!(status.targets[0].duplicates, 1);
    assert_eq!(orchestrator.latest_results(None).await.unwrap().len(), 1);
    orchestrator.shutdown().await;
}

/// 主页链接与用户名指向同一目标
#[tokio::test]
async fn test_profile_link_and_handle_are_one_target() {
    let adapter = ScriptedAdapter::new(Platform::Instagram, Step::ok());
    let orchestrator = start_orchestrator(test_settings(), adapter.clone()).await;
    orchestrator.add_key("ig", "ig-key-1", None).await.unwrap();

    let request = SubmitJobRequest::from_text("ig", "https://www.instagram.com/alice/\n@alice");
    let job_id = orchestrator.submit(request).await.unwrap().job_id;

    assert_eq!(wait_for_job(&orchestrator, job_id).await, JobState::Succeeded);
    assert_eq!(adapter.targets_seen(), vec!["alice", "alice"]);
    let status = orchestrator.status(job_id).unwrap();
    let inserted: usize = status.targets.iter().map(|t| t.inserted).sum();
    let duplicates: usize = status.targets.iter().map(|t| t.duplicates).sum();
    assert_eq!((inserted, duplicates), (1, 1));
    orchestrator.shutdown().await;
}

/// 首次尝试按提交顺序执行，重试排在之后提交的任务后面
#[tokio::test]
async fn test_retry_goes_behind_later_submissions() {
    // Given: 单个工作线程，第一次调用在稍后暂时性失败
    let mut settings = test_settings();
    settings.platforms.ig.concurrency = 1;
    let adapter = ScriptedAdapter::scripted(
        Platform::Instagram,
        vec![Step::Fail(
            Duration::from_millis(200),
            ExtractionError::Transient("connection reset".into()),
        )],
        Step::ok(),
    );
    let orchestrator = start_orchestrator(settings, adapter.clone()).await;
    orchestrator.add_key("ig", "ig-key-1", None).await.unwrap();

    // When: 第一个作业执行中时提交第二个作业
    let first = submit(&orchestrator, "ig", &["a"]).await;
    assert!(wait_for(|| adapter.calls() == 1, Duration::from_secs(2)).await);
    let second = submit(&orchestrator, "ig", &["b"]).await;

    // Then: 重试没有插队
    assert_eq!(wait_for_job(&orchestrator, first).await, JobState::Succeeded);
    assert_eq!(wait_for_job(&orchestrator, second).await, JobState::Succeeded);
    assert_eq!(adapter.targets_seen(), vec!["a", "b", "a"]);
    assert_eq!(adapter.peak_concurrency(), 1);
    orchestrator.shutdown().await;
}

/// 首次尝试在平台内按提交顺序执行
#[tokio::test]
async fn test_first_attempts_run_in_submission_order() {
    // Given: 单个工作线程正忙于一个较慢的目标
    let mut settings = test_settings();
    settings.platforms.tk.concurrency = 1;
    let adapter = ScriptedAdapter::scripted(
        Platform::TikTok,
        vec![Step::Succeed(Duration::from_millis(200))],
        Step::ok(),
    );
    let orchestrator = start_orchestrator(settings, adapter.clone()).await;
    orchestrator.add_key("tk", "tk-key-1", None).await.unwrap();
    let busy = submit(&orchestrator, "tk", &["slow"]).await;
    assert!(wait_for(|| adapter.calls() == 1, Duration::from_secs(2)).await);

    // When: 依次提交两个作业
    let first = submit(&orchestrator, "tk", &["a", "b"]).await;
    let second = submit(&orchestrator, "tk", &["c"]).await;

    // Then: 按提交顺序执行
    for job_id in [busy, first, second] {
        assert_eq!(wait_for_job(&orchestrator, job_id).await, JobState::Succeeded);
    }
    assert_eq!(adapter.targets_seen(), vec!["slow", "a", "b", "c"]);
    orchestrator.shutdown().await;
}

/// 存储 60 条结果后最近查询返回 50 条，按时间倒序
#[tokio::test]
async fn test_latest_results_defaults_to_fifty_newest_first() {
    // Given: 60 条创建时间递增的结果
    let results = Arc::new(InMemoryScrapeResultRepository::new());
    let base = Utc::now() - ChronoDuration::hours(1);
    for i in 0..60 {
        let mut result =
            ScrapeResult::from_raw(Platform::X, &RawRecord::for_user(format!("user{}", i)))
                .unwrap();
        result.created_at = base + ChronoDuration::seconds(i);
        results.insert_if_absent(&result).await.unwrap();
    }
    let orchestrator = Orchestrator::new(
        test_settings(),
        AdapterRegistry::new(),
        Arc::new(InMemoryScraperKeyRepository::new()),
        results,
    )
    .await
    .unwrap();

    // When: 使用默认数量查询
    let latest = orchestrator.latest_results(None).await.unwrap();

    // Then: 50 条，最新的在前
    assert_eq!(latest.len(), 50);
    assert_eq!(latest[0].username, "user59");
    assert_eq!(latest[49].username, "user10");
    assert!(latest.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    // 超过上限的请求被截断到全部 60 条
    assert_eq!(orchestrator.latest_results(Some(10_000)).await.unwrap().len(), 60);
    assert_eq!(orchestrator.latest_results(Some(5)).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_key_administration_never_exposes_secrets() {
    let adapter = ScriptedAdapter::new(Platform::TikTok, Step::ok());
    let orchestrator = start_orchestrator(test_settings(), adapter).await;

    // 导入时丢弃空白项与重复项
    let imported = orchestrator
        .import_keys(ImportKeysRequest {
            platform: "tk".to_string(),
            purpose: Some("busqueda".to_string()),
            keys: "secret-alpha, secret-beta, ,secret-alpha".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(imported.added.len(), 2);
    assert_eq!(imported.skipped, 0);

    let again = orchestrator
        .import_keys(ImportKeysRequest {
            platform: "tk".to_string(),
            purpose: None,
            keys: "secret-beta,secret-gamma".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(again.added.len(), 1);
    assert_eq!(again.skipped, 1);

    let keys = orchestrator.list_keys();
    assert_eq!(keys.len(), 3);
    let listing = serde_json::to_string(&keys).unwrap();
    assert!(!listing.contains("secret-"));
    assert!(keys.iter().all(|k| k.fingerprint.len() == 12));

    let deactivated = orchestrator.deactivate_key(keys[0].id).await.unwrap();
    assert!(!deactivated.is_active);
    assert_eq!(
        orchestrator.list_keys().iter().filter(|k| k.is_active).count(),
        2
    );
    orchestrator.shutdown().await;
}

/// 作业提交与密钥管理对平台代码的校验一致
#[tokio::test]
async fn test_platform_codes_are_checked_alike() {
    let adapter = ScriptedAdapter::new(Platform::TikTok, Step::ok());
    let orchestrator = start_orchestrator(test_settings(), adapter).await;

    let message = |result: Result<_, OrchestratorError>| match result {
        Err(OrchestratorError::InvalidRequest(message)) => message,
        other => panic!("expected InvalidRequest, got {:?}", other.map(|_| ())),
    };

    let blank_key = message(orchestrator.add_key("  ", "k", None).await.map(|_| ()));
    let unknown_key = message(orchestrator.add_key("myspace", "k", None).await.map(|_| ()));
    let unknown_job = message(
        orchestrator
            .submit(SubmitJobRequest::new("myspace", targets(&["alice"])))
            .await
            .map(|_| ()),
    );

    assert_eq!(blank_key, "platform is required");
    assert_eq!(unknown_key, "unknown platform 'myspace'");
    assert_eq!(unknown_job, unknown_key);
    assert!(orchestrator.list_keys().is_empty());
    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_unknown_job_is_reported() {
    let adapter = ScriptedAdapter::new(Platform::TikTok, Step::ok());
    let orchestrator = start_orchestrator(test_settings(), adapter).await;
    let missing = Uuid::new_v4();

    assert!(matches!(
        orchestrator.status(missing),
        Err(OrchestratorError::JobNotFound(id)) if id == missing
    ));
    assert!(matches!(
        orchestrator.cancel(missing),
        Err(OrchestratorError::JobNotFound(_))
    ));
    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_rejects_new_jobs() {
    let adapter = ScriptedAdapter::new(Platform::TikTok, Step::ok());
    let orchestrator = start_orchestrator(test_settings(), adapter).await;

    orchestrator.shutdown().await;
    assert_eq!(orchestrator.worker_count().await, 0);

    let result = orchestrator
        .submit(SubmitJobRequest::new("tk", targets(&["alice"])))
        .await;
    assert!(matches!(result, Err(OrchestratorError::ShuttingDown)));
}
