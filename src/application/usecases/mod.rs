// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 用例模块
///
/// 编排器是调用方使用引擎的唯一入口
pub mod orchestrator;

pub use orchestrator::Orchestrator;
