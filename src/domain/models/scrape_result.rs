// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 用户名最大长度，与存储列宽一致
pub const MAX_USERNAME_LEN: usize = 255;

/// 抓取结果实体
///
/// 由结果汇入器独占创建，创建后不可修改（只追加的历史记录）。
/// 在 post_date 存在时，(platform, username, post_date) 唯一。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// 结果唯一标识符
    pub id: Uuid,
    /// 所属平台
    pub platform: Platform,
    /// 规范化后的用户名
    pub username: String,
    /// 粉丝数
    pub followers: u64,
    /// 帖子发布时间
    pub post_date: Option<DateTime<Utc>>,
    /// 点赞数
    pub likes: u64,
    /// 评论数
    pub comments: u64,
    /// 播放数
    pub views: u64,
    /// 描述文本
    pub description: String,
    /// 适配器返回的原始负载
    pub raw_data: Option<serde_json::Value>,
    /// 入库时间
    pub created_at: DateTime<Utc>,
}

/// 自然键
///
/// 用于结果去重的 (platform, username, post_date) 三元组
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    pub platform: Platform,
    pub username: String,
    pub post_date: Option<DateTime<Utc>>,
}

impl NaturalKey {
    /// 仅当 post_date 存在时自然键才参与唯一性约束
    pub fn is_constrained(&self) -> bool {
        self.post_date.is_some()
    }
}

/// 适配器原始记录
///
/// 计数字段使用有符号整数，汇入器负责校验其合法性
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub username: String,
    pub followers: i64,
    pub post_date: Option<DateTime<Utc>>,
    pub likes: i64,
    pub comments: i64,
    pub views: i64,
    pub description: String,
    pub raw_data: serde_json::Value,
}

impl RawRecord {
    /// 创建只包含用户名的记录，其余字段取默认值
    pub fn for_user(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }
}

impl ScrapeResult {
    /// 从适配器原始记录构建结果
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapeResult)` - 规范化后的结果
    /// * `Err(String)` - 拒绝原因
    pub fn from_raw(platform: Platform, raw: &RawRecord) -> Result<Self, String> {
        let username = normalize_username(&raw.username);
        if username.is_empty() {
            return Err("username is empty".to_string());
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(format!("username exceeds {} characters", MAX_USERNAME_LEN));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            platform,
            username,
            followers: non_negative("followers", raw.followers)?,
            post_date: raw.post_date.map(normalize_post_date),
            likes: non_negative("likes", raw.likes)?,
            comments: non_negative("comments", raw.comments)?,
            views: non_negative("views", raw.views)?,
            description: raw.description.clone(),
            raw_data: if raw.raw_data.is_null() {
                None
            } else {
                Some(raw.raw_data.clone())
            },
            created_at: Utc::now(),
        })
    }

    /// 获取自然键
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            platform: self.platform,
            username: self.username.clone(),
            post_date: self.post_date,
        }
    }
}

/// 规范化用户名：去除空白与前导 @，统一小写
pub fn normalize_username(raw: &str) -> String {
    raw.trim().trim_start_matches('@').trim().to_lowercase()
}

/// 规范化发布时间，截断到微秒以匹配数据库精度
pub fn normalize_post_date(date: DateTime<Utc>) -> DateTime<Utc> {
    date.trunc_subsecs(6)
}

fn non_negative(field: &str, value: i64) -> Result<u64, String> {
    u64::try_from(value).map_err(|_| format!("{} must be non-negative, got {}", field, value))
}
