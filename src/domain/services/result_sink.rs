// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use crate::domain::models::scrape_result::{RawRecord, ScrapeResult};
use crate::domain::repositories::scrape_result_repository::{
    InsertOutcome, ScrapeResultRepository,
};
use crate::utils::errors::{OrchestratorError, RepositoryError};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 单条记录的入库结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// 新插入的结果
    Inserted(Uuid),
    /// 自然键已存在
    Duplicate,
    /// 校验失败
    Rejected(String),
}

impl StoreOutcome {
    fn label(&self) -> &'static str {
        match self {
            StoreOutcome::Inserted(_) => "inserted",
            StoreOutcome::Duplicate => "duplicate",
            StoreOutcome::Rejected(_) => "rejected",
        }
    }
}

/// 入库结果汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

impl StoreSummary {
    pub fn from_outcomes(outcomes: &[StoreOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, outcome| {
            match outcome {
                StoreOutcome::Inserted(_) => acc.inserted += 1,
                StoreOutcome::Duplicate => acc.duplicates += 1,
                StoreOutcome::Rejected(_) => acc.rejected += 1,
            }
            acc
        })
    }
}

/// 结果汇入器
///
/// 规范化、校验并按自然键去重地持久化适配器返回的记录
#[derive(Clone)]
pub struct ResultSink {
    repository: Arc<dyn ScrapeResultRepository>,
}

impl ResultSink {
    pub fn new(repository: Arc<dyn ScrapeResultRepository>) -> Self {
        Self { repository }
    }

    /// 存储一批记录
    ///
    /// 按输入顺序为每条记录返回一个结果。单条记录的校验失败不影响其它记录；
    /// 自然键冲突记为重复，其它存储层错误会中断整批并返回，重新执行是幂等的。
    pub async fn store(
        &self,
        platform: Platform,
        records: &[RawRecord],
    ) -> Result<Vec<StoreOutcome>, OrchestratorError> {
        let mut outcomes = Vec::with_capacity(records.len());

        for record in records {
            let outcome = match ScrapeResult::from_raw(platform, record) {
                Ok(result) => match self
                    .repository
                    .insert_if_absent(&result)
                    .await
                    .map_err(OrchestratorError::from)
                {
                    Ok(InsertOutcome::Inserted) => StoreOutcome::Inserted(result.id),
                    Ok(InsertOutcome::Duplicate) | Err(OrchestratorError::StorageConflict) => {
                        debug!(
                            "Duplicate result for {}/{} at {:?}",
                            platform, result.username, result.post_date
                        );
                        StoreOutcome::Duplicate
                    }
                    Err(e) => return Err(e),
                },
                Err(reason) => {
                    warn!("Rejected {} record: {}", platform, reason);
                    StoreOutcome::Rejected(reason)
                }
            };

            counter!(
                "socialrs_results_stored_total",
                "platform" => platform.code(),
                "outcome" => outcome.label()
            )
            .increment(1);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// 最近的结果，按创建时间倒序
    pub async fn latest(&self, limit: u64) -> Result<Vec<ScrapeResult>, RepositoryError> {
        self.repository.latest(limit).await
    }
}
