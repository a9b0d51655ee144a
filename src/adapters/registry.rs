// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::adapters::traits::ExtractionAdapter;
use crate::domain::models::platform::Platform;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// 适配器注册表
///
/// 每个平台至多注册一个适配器，按平台枚举选择
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Platform, Arc<dyn ExtractionAdapter>>,
}

impl AdapterRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 以构建器方式注册适配器
    pub fn with(mut self, adapter: Arc<dyn ExtractionAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// 注册适配器，返回被替换的旧适配器
    pub fn register(
        &mut self,
        adapter: Arc<dyn ExtractionAdapter>,
    ) -> Option<Arc<dyn ExtractionAdapter>> {
        let platform = adapter.platform();
        info!(
            "Registering extraction adapter '{}' for platform {}",
            adapter.name(),
            platform
        );
        let previous = self.adapters.insert(platform, adapter);
        if let Some(old) = &previous {
            warn!(
                "Adapter '{}' for platform {} replaced",
                old.name(),
                platform
            );
        }
        previous
    }

    /// 获取平台对应的适配器
    pub fn get(&self, platform: Platform) -> Option<Arc<dyn ExtractionAdapter>> {
        self.adapters.get(&platform).cloned()
    }

    /// 平台是否已注册适配器
    pub fn supports(&self, platform: Platform) -> bool {
        self.adapters.contains_key(&platform)
    }

    /// 已注册的平台，按平台顺序排列
    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.adapters.keys().copied().collect();
        platforms.sort();
        platforms
    }
}
