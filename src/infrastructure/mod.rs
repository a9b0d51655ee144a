// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节：
/// - 加密（crypto）：密钥原文的静态加密
/// - 数据库（database）：连接池、实体映射与表结构引导
/// - 指标（metrics）：Prometheus 导出器
/// - 仓库实现（repositories）：领域仓库接口的 SeaORM 与内存实现
///
/// 基础设施层依赖于领域层的抽象接口，领域层不感知具体存储。
pub mod crypto;
pub mod database;
pub mod metrics;
pub mod repositories;
