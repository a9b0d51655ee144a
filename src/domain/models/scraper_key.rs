// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// 默认用途标签
pub const DEFAULT_PURPOSE: &str = "general";

/// 抓取密钥实体
///
/// 表示访问某个平台抓取服务的凭据。密钥只会被停用，不会被物理删除，
/// 以便历史记录仍能引用它。不实现序列化，对外只暴露 [`KeySummary`]。
#[derive(Clone)]
pub struct ScraperKey {
    /// 密钥唯一标识符
    pub id: Uuid,
    /// 所属平台
    pub platform: Platform,
    /// 密钥原文（敏感信息）
    pub key_value: String,
    /// 用途标签（general / busqueda / timeline 等）
    pub purpose: String,
    /// 是否可用
    pub is_active: bool,
    /// 最近一次使用时间，从未使用时为空
    pub last_used: Option<DateTime<Utc>>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl ScraperKey {
    /// 创建一个新的可用密钥
    pub fn new(platform: Platform, key_value: impl Into<String>, purpose: impl Into<String>) -> Self {
        let purpose = purpose.into();
        Self {
            id: Uuid::new_v4(),
            platform,
            key_value: key_value.into(),
            purpose: if purpose.trim().is_empty() {
                DEFAULT_PURPOSE.to_string()
            } else {
                purpose.trim().to_string()
            },
            is_active: true,
            last_used: None,
            created_at: Utc::now(),
        }
    }

    /// 密钥指纹
    ///
    /// 取密钥 SHA-256 摘要的前 12 位十六进制字符，用于日志和列表展示
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.key_value)
    }

    /// 判断密钥是否可服务于指定用途
    ///
    /// 请求 general 时任何密钥都可用；请求其它用途时，
    /// 用途完全一致或标记为 general 的密钥可用
    pub fn serves(&self, purpose: &str) -> bool {
        purpose == DEFAULT_PURPOSE || self.purpose == purpose || self.purpose == DEFAULT_PURPOSE
    }

    /// 生成不含密钥原文的摘要
    pub fn summary(&self) -> KeySummary {
        KeySummary {
            id: self.id,
            platform: self.platform,
            purpose: self.purpose.clone(),
            is_active: self.is_active,
            last_used: self.last_used,
            fingerprint: self.fingerprint(),
        }
    }
}

impl fmt::Debug for ScraperKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScraperKey")
            .field("id", &self.id)
            .field("platform", &self.platform)
            .field("key_value", &"<redacted>")
            .field("purpose", &self.purpose)
            .field("is_active", &self.is_active)
            .field("last_used", &self.last_used)
            .finish()
    }
}

/// 密钥摘要
///
/// 供管理界面只读展示，永远不包含密钥原文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySummary {
    pub id: Uuid,
    pub platform: Platform,
    pub purpose: String,
    pub is_active: bool,
    pub last_used: Option<DateTime<Utc>>,
    pub fingerprint: String,
}

/// 计算密钥指纹
pub fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(12);
    encoded
}
