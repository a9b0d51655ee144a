// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 平台（platform）：受支持的社交平台
/// - 抓取密钥（scraper_key）：平台凭据及其只读摘要
/// - 抓取结果（scrape_result）：去重入库的结果与适配器原始记录
/// - 作业（job）：作业、目标任务、状态机与状态快照
pub mod job;
pub mod platform;
pub mod scrape_result;
pub mod scraper_key;
