// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::PlatformsSettings;
use crate::workers::extraction_worker::{ExtractionWorker, WorkerContext};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 工作管理器
///
/// 为每个注册了适配器的平台启动固定大小的工作池
pub struct WorkerManager {
    ctx: Arc<WorkerContext>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        Self {
            ctx,
            handles: Vec::new(),
        }
    }

    /// 启动工作进程
    ///
    /// 每个平台的工作器数量取自 `platforms.<code>.concurrency`，至少为 1
    pub fn start_workers(&mut self, platforms: &PlatformsSettings) {
        for platform in self.ctx.registry.platforms() {
            let count = platforms.get(platform).concurrency.max(1);
            for id in 0..count {
                let worker = ExtractionWorker::new(id, platform, self.ctx.clone());
                self.handles.push(tokio::spawn(worker.run()));
            }
            info!("Started {} workers for platform {}", count, platform);
        }
    }

    /// 运行中的工作器数量
    pub fn worker_count(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// 关闭队列并等待所有工作器处理完当前任务后退出
    pub async fn shutdown(&mut self) {
        info!("Shutting down workers...");
        self.ctx.queue.close();

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!("Worker terminated abnormally: {}", e);
            }
        }

        info!("Workers shut down successfully");
    }
}
