//! 心跳结果处理基准测试
//!
//! 测试结果分类、日志级别映射与配置验证的开销

use criterion::{criterion_group, criterion_main, Criterion};
use heartbeat_agent::config::{validate_config, ConfigOverrides, HeartbeatConfig};
use heartbeat_agent::heartbeat::{log_level, CheckOutcome, Step};
use std::hint::black_box;

/// 结果分类基准测试
fn outcome_benchmark(c: &mut Criterion) {
    c.bench_function("outcome_from_status", |b| {
        b.iter(|| {
            for status in [200u16, 204, 404, 500, 503] {
                black_box(CheckOutcome::from_status(black_box(status)));
            }
        });
    });

    c.bench_function("outcome_log_level", |b| {
        let outcomes = [
            CheckOutcome::Success,
            CheckOutcome::NonOkStatus { status: 503 },
        ];
        b.iter(|| {
            for outcome in &outcomes {
                black_box(log_level(Step::Precondition, outcome));
                black_box(log_level(Step::Report, outcome));
            }
        });
    });

    c.bench_function("cycle_outcome_serialization", |b| {
        let outcome = CheckOutcome::NonOkStatus { status: 500 };
        b.iter(|| black_box(serde_json::to_string(&outcome).unwrap()));
    });
}

/// 配置处理基准测试
fn config_benchmark(c: &mut Criterion) {
    c.bench_function("config_merge_and_validate", |b| {
        b.iter(|| {
            let config = HeartbeatConfig::default().with_overrides(ConfigOverrides {
                heartbeat_url: Some("https://status.example.com/api/push/abc".to_string()),
                test_url: Some("http://localhost:8080/health".to_string()),
                interval_seconds: Some(30),
                ..Default::default()
            });
            black_box(validate_config(&config).is_ok())
        });
    });
}

criterion_group!(benches, outcome_benchmark, config_benchmark);
criterion_main!(benches);
