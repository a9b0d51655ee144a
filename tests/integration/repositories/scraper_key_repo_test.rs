// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::scrape_result_repo_test::memory_db;
use crate::integration::helpers::{test_settings, wait_for_job, ScriptedAdapter, Step};
use chrono::Utc;
use socialrs::adapters::AdapterRegistry;
use socialrs::application::dto::job_request::SubmitJobRequest;
use socialrs::application::usecases::Orchestrator;
use socialrs::domain::models::job::JobState;
use socialrs::domain::models::platform::Platform;
use socialrs::domain::models::scraper_key::ScraperKey;
use socialrs::domain::repositories::scraper_key_repository::ScraperKeyRepository;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use socialrs::infrastructure::crypto::KeyCipher;
use socialrs::infrastructure::repositories::ScraperKeyRepositoryImpl;
use socialrs::utils::errors::RepositoryError;
use std::sync::Arc;
use uuid::Uuid;

fn key_repo(db: Arc<DatabaseConnection>) -> ScraperKeyRepositoryImpl {
    ScraperKeyRepositoryImpl::new(db, KeyCipher::from_passphrase("test-passphrase").unwrap())
}

#[tokio::test]
async fn test_key_repository_roundtrip() {
    // Given: 两个平台的密钥
    let repo = key_repo(memory_db().await);
    let ig = ScraperKey::new(Platform::Instagram, "ig-secret", "general");
    let tk = ScraperKey::new(Platform::TikTok, "tk-secret", "busqueda");
    repo.create(&ig).await.unwrap();
    repo.create(&tk).await.unwrap();

    // When: 读回全部密钥
    let all = repo.find_all().await.unwrap();

    // Then: 平台、用途和原文都被还原
    assert_eq!(all.len(), 2);
    let stored = all.iter().find(|k| k.platform == Platform::TikTok).unwrap();
    assert_eq!(stored.id, tk.id);
    assert_eq!(stored.purpose, "busqueda");
    assert_eq!(stored.key_value, "tk-secret");
    assert!(stored.is_active);
}

#[tokio::test]
async fn test_touch_and_deactivate() {
    let repo = key_repo(memory_db().await);
    let key = ScraperKey::new(Platform::X, "x-secret", "general");
    repo.create(&key).await.unwrap();

    let now = Utc::now();
    repo.touch(key.id, now).await.unwrap();
    repo.set_active(key.id, false).await.unwrap();

    let stored = repo.find_by_id(key.id).await.unwrap().unwrap();
    assert!(!stored.is_active);
    assert!(stored.last_used.is_some());
    assert!(!repo.find_all().await.unwrap().iter().any(|k| k.is_active));
}

#[tokio::test]
async fn test_unknown_key_is_not_found() {
    let repo = key_repo(memory_db().await);
    let missing = Uuid::new_v4();

    assert!(repo.find_by_id(missing).await.unwrap().is_none());
    assert!(matches!(
        repo.touch(missing, Utc::now()).await,
        Err(RepositoryError::NotFound)
    ));
    assert!(matches!(
        repo.set_active(missing, false).await,
        Err(RepositoryError::NotFound)
    ));
}

/// 使用数据库存储的完整流程
#[tokio::test]
async fn test_orchestrator_with_database_storage() {
    // Given: 连接内存数据库的编排器
    let adapter = ScriptedAdapter::new(Platform::Instagram, Step::ok());
    let registry = AdapterRegistry::new().with(adapter.clone());
    let orchestrator = Orchestrator::connect(test_settings(), registry)
        .await
        .unwrap();
    orchestrator.start().await;
    orchestrator.add_key("ig", "ig-secret", None).await.unwrap();

    // When: 同一目标提交两次
    for _ in 0..2 {
        let response = orchestrator
            .submit(SubmitJobRequest::new("ig", vec!["alice".to_string()]))
            .await
            .unwrap();
        assert_eq!(
            wait_for_job(&orchestrator, response.job_id).await,
            JobState::Succeeded
        );
    }

    // Then: 结果只存储一次，密钥记录了使用时间
    let results = orchestrator.latest_results(None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].username, "alice");
    assert_eq!(results[0].platform_name, "Instagram");
    assert!(orchestrator.list_keys()[0].last_used.is_some());
    orchestrator.shutdown().await;
}

/// 密钥及其停用状态在重新连接后保留
#[tokio::test]
async fn test_keys_survive_reconnect() {
    // Given: 临时文件数据库
    let path = std::env::temp_dir().join(format!("socialrs-{}.db", Uuid::new_v4()));
    let mut settings = test_settings();
    settings.database.url = format!("sqlite://{}?mode=rwc", path.display());

    let first = Orchestrator::connect(settings.clone(), AdapterRegistry::new())
        .await
        .unwrap();
    let kept = first.add_key("tk", "tk-kept", None).await.unwrap();
    let dropped = first.add_key("tk", "tk-dropped", None).await.unwrap();
    first.deactivate_key(dropped.id).await.unwrap();
    drop(first);

    // When: 重新连接
    let second = Orchestrator::connect(settings, AdapterRegistry::new())
        .await
        .unwrap();

    // Then: 只有仍然启用的密钥可被租借
    assert_eq!(second.credential_pool().active_count(Platform::TikTok), 1);
    let handle = second
        .credential_pool()
        .acquire(Platform::TikTok, "general")
        .unwrap();
    assert_eq!(handle.key_id, kept.id);

    drop(second);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_connect_rejects_out_of_range_settings() {
    // Given: 补充速率几乎为零的平台配置
    let mut settings = test_settings();
    settings.platforms.ig.refill_per_second = 1e-20;

    // When: 连接
    let result = Orchestrator::connect(settings, AdapterRegistry::new()).await;

    // Then: 在启动任何工作线程之前失败
    assert!(result.is_err());
}

/// 数据库中只保存密文
#[tokio::test]
async fn test_key_value_is_encrypted_at_rest() {
    // Given: 一个写入数据库的密钥
    let db = memory_db().await;
    let repo = key_repo(db.clone());
    let key = ScraperKey::new(Platform::Instagram, "ig-plain-secret", "general");
    repo.create(&key).await.unwrap();

    // When: 直接读取数据表
    let rows = db
        .query_all(Statement::from_string(
            db.get_database_backend(),
            "SELECT key_value FROM scraper_keys".to_string(),
        ))
        .await
        .unwrap();
    let stored: String = rows[0].try_get("", "key_value").unwrap();

    // Then: 表中没有原文，仓库读出的是原文
    assert!(!stored.contains("ig-plain-secret"));
    assert_eq!(
        repo.find_by_id(key.id).await.unwrap().unwrap().key_value,
        "ig-plain-secret"
    );

    // Then: 换用其它口令无法读取
    let other = ScraperKeyRepositoryImpl::new(db, KeyCipher::from_passphrase("other").unwrap());
    assert!(other.find_by_id(key.id).await.is_err());
}

#[tokio::test]
async fn test_connect_requires_encryption_key() {
    let mut settings = test_settings();
    settings.credentials.encryption_key = None;

    let result = Orchestrator::connect(settings, AdapterRegistry::new()).await;

    assert!(result.is_err());
}
