// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提供错误类型、重试退避策略、目标解析与日志初始化
pub mod errors;
pub mod retry_policy;
pub mod targets;
pub mod telemetry;
