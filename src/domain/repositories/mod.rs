// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 具体实现由基础设施层提供（SeaORM 与内存实现）。
///
/// 包含的仓库接口：
/// - 抓取密钥仓库（scraper_key_repository）：管理平台凭据
/// - 抓取结果仓库（scrape_result_repository）：按自然键幂等地存储结果
pub mod scrape_result_repository;
pub mod scraper_key_repository;
