// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 社交平台枚举
///
/// 平台代码与持久化存储中的取值保持一致（ig / tk / x）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    /// Instagram
    #[serde(rename = "ig")]
    Instagram,
    /// TikTok
    #[serde(rename = "tk")]
    TikTok,
    /// X（原 Twitter）
    #[serde(rename = "x")]
    X,
}

impl Platform {
    /// 所有受支持的平台
    pub const ALL: [Platform; 3] = [Platform::Instagram, Platform::TikTok, Platform::X];

    /// 平台短代码
    pub fn code(&self) -> &'static str {
        match self {
            Platform::Instagram => "ig",
            Platform::TikTok => "tk",
            Platform::X => "x",
        }
    }

    /// 平台展示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::TikTok => "TikTok",
            Platform::X => "X/Twitter",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Platform {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ig" => Ok(Platform::Instagram),
            "tk" => Ok(Platform::TikTok),
            "x" => Ok(Platform::X),
            other => Err(DomainError::UnknownPlatform(other.to_string())),
        }
    }
}
