// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供按平台划分的有界工作池
/// 包括单个任务的完整处理流程和工作器生命周期管理
pub mod extraction_worker;
pub mod manager;

pub use extraction_worker::{ExtractionWorker, WorkerContext};
pub use manager::WorkerManager;
