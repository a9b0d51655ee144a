// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::DatabaseSettings;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use std::time::Duration;
use tracing::info;

/// 创建数据库连接池
///
/// # 参数
///
/// * `settings` - 数据库配置
///
/// # 返回值
///
/// * `Ok(DatabaseConnection)` - 数据库连接
/// * `Err(DbErr)` - 连接过程中出现的错误
pub async fn create_pool(settings: &DatabaseSettings) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(settings.url.to_owned());

    // 内存 SQLite 每个连接都是独立的数据库，只能使用单连接
    let in_memory = settings.url.contains(":memory:");
    if in_memory {
        opt.max_connections(1).min_connections(1);
    } else {
        if let Some(max) = settings.max_connections {
            opt.max_connections(max);
        }
        if let Some(min) = settings.min_connections {
            opt.min_connections(min);
        }
    }

    if let Some(timeout) = settings.connect_timeout {
        opt.connect_timeout(Duration::from_secs(timeout));
        opt.acquire_timeout(Duration::from_secs(timeout));
    }

    if let Some(idle) = settings.idle_timeout {
        if !in_memory {
            opt.idle_timeout(Duration::from_secs(idle));
        }
    }

    opt.max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    info!("Connected to database ({:?})", db.get_database_backend());
    Ok(db)
}
