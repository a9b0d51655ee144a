// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::job_tracker::TrackerStats;
use serde::{Deserialize, Serialize};

/// 抓取统计响应DTO
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScrapingStatsResponse {
    pub total_processed: u64,
    pub active_tasks: u64,
    /// 成功率（百分比）
    pub success_rate: f64,
}

impl From<TrackerStats> for ScrapingStatsResponse {
    fn from(stats: TrackerStats) -> Self {
        Self {
            total_processed: stats.total_processed,
            active_tasks: stats.active_tasks,
            success_rate: stats.success_rate,
        }
    }
}
