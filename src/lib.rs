// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 抽取适配器模块
///
/// 定义平台抓取能力的边界接口与按平台选择适配器的注册表
pub mod adapters;

/// 应用程序模块
///
/// 包含对外暴露的编排门面与数据传输对象
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 基础设施模块
///
/// 提供数据库连接、仓库实现和指标导出
pub mod infrastructure;

/// 队列模块
///
/// 实现按平台划分的任务队列和调度功能
pub mod queue;

/// 工具模块
///
/// 提供错误类型、重试策略、日志初始化等通用功能
pub mod utils;

/// 工作器模块
///
/// 实现按平台划分的抽取工作池
pub mod workers;
