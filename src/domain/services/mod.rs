// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含编排核心的业务服务，它们只依赖领域模型与仓库接口：
/// - 凭据池（credential_pool）：按 LRU 顺序出租密钥，密钥被封时自动停用
/// - 限流器（rate_limiter）：按 (平台, 密钥) 维护令牌桶
/// - 结果汇入器（result_sink）：规范化、校验并幂等地持久化结果
/// - 作业跟踪器（job_tracker）：状态转换日志与作业状态投影
pub mod credential_pool;
pub mod job_tracker;
pub mod rate_limiter;
pub mod result_sink;
