// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供领域仓库接口的具体实现：
/// - 基于 SeaORM 的数据库实现
/// - 进程内存实现，用于嵌入式场景与测试
pub mod memory;
pub mod scrape_result_repo_impl;
pub mod scraper_key_repo_impl;

pub use memory::{InMemoryScrapeResultRepository, InMemoryScraperKeyRepository};
pub use scrape_result_repo_impl::ScrapeResultRepositoryImpl;
pub use scraper_key_repo_impl::ScraperKeyRepositoryImpl;
