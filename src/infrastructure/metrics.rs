// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 初始化指标系统
///
/// 启用时安装 Prometheus 导出器并注册指标说明。
/// 地址无效或端口被占用时只记录警告，编排核心照常工作。
pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        return;
    }

    let addr: SocketAddr = match settings.listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address '{}': {}", settings.listen_addr, e);
            return;
        }
    };

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
        return;
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!(
        "socialrs_jobs_submitted_total",
        "Total number of extraction jobs accepted"
    );
    describe_counter!(
        "socialrs_tasks_total",
        "Per-target extraction attempts by platform and outcome"
    );
    describe_counter!(
        "socialrs_results_stored_total",
        "Records handled by the result sink by platform and outcome"
    );
    describe_gauge!(
        "socialrs_tasks_parked",
        "Tasks currently parked waiting for a key or tokens"
    );
    describe_histogram!(
        "socialrs_extraction_duration_seconds",
        "Duration of adapter extraction calls in seconds"
    );
}
