// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 抽取适配器模块
///
/// 编排核心只依赖这里定义的能力接口，各平台的实际抓取实现由外部注册
pub mod registry;
pub mod traits;

pub use registry::AdapterRegistry;
pub use traits::{ExtractionAdapter, ExtractionError};
