// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据传输对象模块
///
/// 定义调用方与编排核心之间的显式数据契约
pub mod job_request;
pub mod scrape_result_response;
pub mod scraper_key_response;
pub mod stats_response;
