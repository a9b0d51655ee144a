// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::DomainError;
use std::io::Read;
use url::Url;

/// CSV 中按优先级识别的目标列
const CSV_TARGET_COLUMNS: [&str; 2] = ["handle", "link"];

/// 链接首段不是用户名、需要取下一段的路径
const NESTED_PROFILE_SEGMENTS: [&str; 1] = ["stories"];

/// 链接首段表示内容而不是主页的路径
const NON_PROFILE_SEGMENTS: [&str; 8] = [
    "p", "reel", "reels", "tv", "explore", "hashtag", "search", "i",
];

/// 规范化单个目标
///
/// 去除两端空白与前导 @；主页链接替换为其中的用户名。
/// 空白项返回 None
pub fn normalize_target(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let target = handle_from_link(trimmed).unwrap_or_else(|| trimmed.to_string());
    let target = target.trim_start_matches('@').trim();
    if target.is_empty() {
        None
    } else {
        Some(target.to_string())
    }
}

/// 规范化目标列表
///
/// 丢弃空白项，保持原有顺序
pub fn normalize_targets<S: AsRef<str>>(targets: &[S]) -> Vec<String> {
    targets
        .iter()
        .filter_map(|t| normalize_target(t.as_ref()))
        .collect()
}

/// 解析手工输入的目标文本
///
/// 支持换行、逗号或空白分隔，目标可以是用户名或主页链接
pub fn parse_targets(text: &str) -> Vec<String> {
    let parts: Vec<&str> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .collect();
    normalize_targets(&parts)
}

/// 解析上传的 CSV 目标文件
///
/// 表头中名为 handle 或 link 的列（不区分大小写）被自动识别；
/// 两列都存在时优先取 handle，该行 handle 为空时取 link
pub fn parse_targets_csv<R: Read>(reader: R) -> Result<Vec<String>, DomainError> {
    let mut rows = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rows
        .headers()
        .map_err(|e| DomainError::ValidationError(format!("unreadable CSV header: {}", e)))?
        .clone();
    let columns: Vec<usize> = CSV_TARGET_COLUMNS
        .iter()
        .filter_map(|name| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        })
        .collect();
    if columns.is_empty() {
        return Err(DomainError::ValidationError(
            "CSV needs a column named \"handle\" or \"link\"".to_string(),
        ));
    }

    let mut targets = Vec::new();
    for (line, record) in rows.records().enumerate() {
        let record = record.map_err(|e| {
            DomainError::ValidationError(format!("unreadable CSV row {}: {}", line + 2, e))
        })?;
        let target = columns
            .iter()
            .filter_map(|&column| record.get(column))
            .find_map(normalize_target);
        if let Some(target) = target {
            targets.push(target);
        }
    }
    Ok(targets)
}

/// 从主页链接中取出用户名
///
/// 不是链接或链接指向具体内容时返回 None
fn handle_from_link(text: &str) -> Option<String> {
    let looks_like_link =
        text.contains("://") || text.starts_with("www.") || text.contains(".com/");
    if !looks_like_link {
        return None;
    }
    let url = if text.contains("://") {
        Url::parse(text).ok()?
    } else {
        Url::parse(&format!("https://{}", text)).ok()?
    };

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let mut first = segments.next()?;
    if NESTED_PROFILE_SEGMENTS.contains(&first) {
        first = segments.next()?;
    }
    if NON_PROFILE_SEGMENTS.contains(&first) {
        return None;
    }
    Some(first.to_string())
}

/// 解析逗号分隔的密钥列表，丢弃空白项与重复项
pub fn parse_key_list(text: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in text.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !keys.iter().any(|existing| existing == key) {
            keys.push(key.to_string());
        }
    }
    keys
}
