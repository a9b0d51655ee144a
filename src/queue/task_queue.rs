// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::TargetTask;
use crate::domain::models::platform::Platform;
use async_trait::async_trait;
use metrics::gauge;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::debug;

/// 队列错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// 队列已关闭
    #[error("Queue closed")]
    Closed,
}

/// 任务队列特质
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// 将任务追加到所属平台队列的末尾
    async fn enqueue(&self, task: TargetTask) -> Result<(), QueueError>;

    /// 等待并取出平台队列头部的任务
    ///
    /// 队列关闭后返回 `None`
    async fn dequeue(&self, platform: Platform) -> Option<TargetTask>;

    /// 在 `delay` 之后把任务重新放回队列末尾，期间任务处于暂存状态
    fn requeue_after(&self, task: TargetTask, delay: Duration) -> Result<(), QueueError>;

    /// 关闭队列并唤醒所有等待者，暂存的任务随之丢弃
    fn close(&self);

    /// 平台队列中等待的任务数
    fn len(&self, platform: Platform) -> usize;

    /// 平台暂存中的任务数
    fn parked_len(&self, platform: Platform) -> usize;

    fn is_closed(&self) -> bool;
}

#[derive(Default)]
struct PlatformQueue {
    items: Mutex<VecDeque<TargetTask>>,
    notify: Notify,
    parked: AtomicUsize,
}

impl PlatformQueue {
    fn push(&self, task: TargetTask) {
        self.items.lock().push_back(task);
        self.notify.notify_one();
    }
}

/// 内存任务队列
///
/// 每个平台一个先进先出队列；延迟重入由后台定时任务完成，不做轮询
pub struct InMemoryTaskQueue {
    queues: HashMap<Platform, Arc<PlatformQueue>>,
    closed: Arc<AtomicBool>,
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskQueue {
    /// 为所有平台创建队列
    pub fn new() -> Self {
        Self {
            queues: Platform::ALL
                .iter()
                .map(|p| (*p, Arc::new(PlatformQueue::default())))
                .collect(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn queue(&self, platform: Platform) -> Option<&Arc<PlatformQueue>> {
        self.queues.get(&platform)
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, task: TargetTask) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        let queue = self.queue(task.platform).ok_or(QueueError::Closed)?;
        queue.push(task);
        Ok(())
    }

    async fn dequeue(&self, platform: Platform) -> Option<TargetTask> {
        let queue = self.queue(platform)?;
        loop {
            if self.is_closed() {
                return None;
            }

            let notified = queue.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(task) = queue.items.lock().pop_front() {
                return Some(task);
            }
            if self.is_closed() {
                return None;
            }

            notified.await;
        }
    }

    fn requeue_after(&self, task: TargetTask, delay: Duration) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        let platform = task.platform;
        let queue = self.queue(platform).ok_or(QueueError::Closed)?.clone();
        let closed = self.closed.clone();

        let parked = queue.parked.fetch_add(1, Ordering::SeqCst) + 1;
        gauge!("socialrs_tasks_parked", "platform" => platform.code()).set(parked as f64);
        debug!(
            "Parked task {}#{} for {:?}",
            task.job_id, task.index, delay
        );

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let parked = queue.parked.fetch_sub(1, Ordering::SeqCst) - 1;
            gauge!("socialrs_tasks_parked", "platform" => platform.code()).set(parked as f64);
            if !closed.load(Ordering::SeqCst) {
                queue.push(task);
            }
        });
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for queue in self.queues.values() {
            queue.notify.notify_waiters();
        }
    }

    fn len(&self, platform: Platform) -> usize {
        self.queue(platform).map_or(0, |q| q.items.lock().len())
    }

    fn parked_len(&self, platform: Platform) -> usize {
        self.queue(platform)
            .map_or(0, |q| q.parked.load(Ordering::SeqCst))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
