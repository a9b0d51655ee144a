// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 提供按平台划分的任务队列与作业调度功能
/// 负责任务的排队、暂存重入、重试与维护
pub mod scheduler;
pub mod task_queue;

pub use scheduler::Scheduler;
pub use task_queue::{InMemoryTaskQueue, QueueError, TaskQueue};
