// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use crate::domain::models::scraper_key::KeySummary;
use crate::domain::services::credential_pool::ImportOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// 密钥列表项DTO
///
/// 只包含密钥指纹，永远不包含密钥原文
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScraperKeyResponse {
    pub id: Uuid,
    pub platform: Platform,
    pub purpose: String,
    pub is_active: bool,
    pub last_used: Option<DateTime<Utc>>,
    pub fingerprint: String,
}

impl From<KeySummary> for ScraperKeyResponse {
    fn from(summary: KeySummary) -> Self {
        Self {
            id: summary.id,
            platform: summary.platform,
            purpose: summary.purpose,
            is_active: summary.is_active,
            last_used: summary.last_used,
            fingerprint: summary.fingerprint,
        }
    }
}

/// 批量导入密钥请求DTO
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ImportKeysRequest {
    /// 平台短代码
    #[validate(length(min = 1, max = 8))]
    pub platform: String,

    /// 用途，默认 general
    #[validate(length(max = 64))]
    pub purpose: Option<String>,

    /// 逗号分隔的密钥列表
    #[validate(length(min = 1))]
    pub keys: String,
}

/// 批量导入密钥响应DTO
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportKeysResponse {
    pub added: Vec<ScraperKeyResponse>,
    pub skipped: usize,
}

impl From<ImportOutcome> for ImportKeysResponse {
    fn from(outcome: ImportOutcome) -> Self {
        Self {
            added: outcome
                .added
                .into_iter()
                .map(ScraperKeyResponse::from)
                .collect(),
            skipped: outcome.skipped,
        }
    }
}
