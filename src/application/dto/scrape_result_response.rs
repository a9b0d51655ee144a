// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use crate::domain::models::scrape_result::ScrapeResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 抓取结果响应DTO
///
/// 返回结果的完整字段集
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapeResultResponse {
    pub id: Uuid,
    pub platform: Platform,
    /// 平台展示名称
    pub platform_name: String,
    pub username: String,
    pub followers: u64,
    pub post_date: Option<DateTime<Utc>>,
    pub likes: u64,
    pub comments: u64,
    pub views: u64,
    pub description: String,
    pub raw_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<ScrapeResult> for ScrapeResultResponse {
    fn from(result: ScrapeResult) -> Self {
        Self {
            id: result.id,
            platform: result.platform,
            platform_name: result.platform.display_name().to_string(),
            username: result.username,
            followers: result.followers,
            post_date: result.post_date,
            likes: result.likes,
            comments: result.comments,
            views: result.views,
            description: result.description,
            raw_data: result.raw_data,
            created_at: result.created_at,
        }
    }
}
