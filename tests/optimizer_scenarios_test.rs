// ==========================================
// RelayOptimizer 场景测试
// ==========================================
// 职责: 使用 HiGHS 求解器验证端到端优化行为
// 场景: 容量内不移动 / 超载削峰 / 惩罚单调 / 降级路径 / 调整组同周 / 周对齐
// ==========================================

mod helpers;

use helpers::test_data_builder::{create_small_config, create_week_batch, d, RelayRecordBuilder};
use modular_balancing::config::OptimizerConfig;
use modular_balancing::domain::types::{FallbackReason, ImmovableMode, OutcomeStatus};
use modular_balancing::domain::week::CapacityConstraint;
use modular_balancing::domain::OptimizationOutcome;
use modular_balancing::engine::{
    AssignmentModel, MilpSolver, MoveReportEngine, OptimizationCache, RelayOptimizer, SolverError,
    SolverOutput,
};
use std::collections::HashSet;
use std::time::Duration;

// ==========================================
// 测试辅助函数
// ==========================================

struct InfeasibleSolver;

impl MilpSolver for InfeasibleSolver {
    fn name(&self) -> &str {
        "infeasible"
    }

    fn solve(&self, _model: &AssignmentModel, _time_limit: Duration) -> Result<SolverOutput, SolverError> {
        Ok(SolverOutput::infeasible())
    }
}

fn assert_each_instance_once(outcome: &OptimizationOutcome) {
    let ids: HashSet<&str> = outcome.assignments.iter().map(|a| a.instance_id.as_str()).collect();
    assert_eq!(ids.len(), outcome.assignments.len());
    assert_eq!(outcome.assignments.len(), outcome.instances_count);
}

// ==========================================
// 场景 A: 容量内不移动
// ==========================================

#[test]
fn test_within_capacity_keeps_original_weeks() {
    println!("\n=== 测试：容量内不移动 ===");
    let today = d(2026, 1, 4);
    let mut records = create_week_batch("A", today, 5, 10.0);
    records.extend(create_week_batch("B", d(2026, 1, 11), 5, 10.0));

    let optimizer = RelayOptimizer::with_highs(create_small_config()).unwrap();
    let outcome = optimizer.optimize(records, today).unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Optimal);
    assert_each_instance_once(&outcome);
    assert_eq!(outcome.moved_count(), 0);
    assert!(outcome.total_slack_h().abs() < 1e-6);
    assert!(outcome.objective_value.unwrap().abs() < 1e-6);
}

// ==========================================
// 场景 B/C: 超载削峰
// ==========================================

#[test]
fn test_overloaded_week_is_flattened() {
    println!("\n=== 测试：单周 1000 小时削峰到 500 ===");
    let today = d(2026, 1, 4);
    let records = create_week_batch("R", today, 50, 20.0);

    let optimizer = RelayOptimizer::with_highs(create_small_config()).unwrap();
    let resolver = optimizer.threshold_resolver(&records);
    let outcome = optimizer.optimize(records, today).unwrap();

    println!("状态: {}, 移动: {}", outcome.status, outcome.moved_count());
    assert!(outcome.status.is_solved());
    assert_each_instance_once(&outcome);
    assert_eq!(outcome.weeks_count, 13);
    assert!(outcome.total_slack_h() < 1e-6);
    if outcome.status == OutcomeStatus::Optimal {
        assert_eq!(outcome.moved_count(), 25);
    }

    let report = MoveReportEngine::new(optimizer.config(), &resolver).generate(&outcome.assignments);
    assert_eq!(report.weeks_over_before(), 1);
    assert_eq!(report.weeks_over_after(), 0);
    assert!(report.weekly.iter().all(|w| w.after.total_hours <= 500.0 + 1e-6));
}

#[test]
fn test_holiday_week_uses_lower_threshold() {
    println!("\n=== 测试：节假日周使用更低阈值 ===");
    let today = d(2026, 1, 4);
    let mut records = create_week_batch("R", today, 50, 20.0);
    records[0].is_holiday = true;

    let optimizer = RelayOptimizer::with_highs(create_small_config()).unwrap();
    let outcome = optimizer.optimize(records, today).unwrap();

    assert!(outcome.status.is_solved());
    let remaining = outcome
        .assignments
        .iter()
        .filter(|a| a.suggested_week == Some(today))
        .count();
    assert!(remaining <= 20);
    if outcome.status == OutcomeStatus::Optimal {
        assert_eq!(outcome.moved_count(), 30);
    }
}

#[test]
fn test_low_penalty_keeps_overage_as_slack() {
    println!("\n=== 测试：惩罚低于移动成本时保留超额 ===");
    let today = d(2026, 1, 4);
    let records = create_week_batch("R", today, 50, 20.0);
    let config = OptimizerConfig {
        total_overage_penalty_weight: 0.01,
        ..create_small_config()
    };

    let optimizer = RelayOptimizer::with_highs(config).unwrap();
    let outcome = optimizer.optimize(records, today).unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Optimal);
    assert_eq!(outcome.moved_count(), 0);
    assert!((outcome.total_slack_h() - 500.0).abs() < 1e-4);
}

#[test]
fn test_higher_penalty_never_increases_slack() {
    println!("\n=== 测试：超额惩罚越高，总松弛单调不增 ===");
    let today = d(2026, 1, 4);
    let mut slacks = Vec::new();
    for weight in [0.01, 0.5, 1000.0] {
        let config = OptimizerConfig {
            total_overage_penalty_weight: weight,
            ..create_small_config()
        };
        let optimizer = RelayOptimizer::with_highs(config).unwrap();
        let outcome = optimizer
            .optimize(create_week_batch("R", today, 50, 20.0), today)
            .unwrap();

        assert!(outcome.status.is_solved(), "权重 {} 未求解: {}", weight, outcome.status);
        assert_each_instance_once(&outcome);
        println!("权重 {}: 松弛 {:.2}, 移动 {}", weight, outcome.total_slack_h(), outcome.moved_count());
        slacks.push(outcome.total_slack_h());
    }

    for pair in slacks.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-6, "松弛随惩罚增大: {:?}", slacks);
    }
    assert!((slacks[0] - 500.0).abs() < 1e-4);
}

#[test]
fn test_subpool_cap_spreads_subpool_stores() {
    println!("\n=== 测试：子池工时上限 ===");
    let today = d(2026, 1, 4);
    let records: Vec<_> = (0..20)
        .map(|i| {
            RelayRecordBuilder::new(&format!("N{:03}", i), &format!("S{:03}", i))
                .week(today)
                .hours(20.0)
                .store_type("Neighborhood Market")
                .build()
        })
        .collect();
    let config = OptimizerConfig {
        max_subpool_stores_per_week: 5, // 40 × 5 = 200 小时
        ..create_small_config()
    };

    let optimizer = RelayOptimizer::with_highs(config).unwrap();
    let resolver = optimizer.threshold_resolver(&records);
    let outcome = optimizer.optimize(records, today).unwrap();

    assert!(outcome.status.is_solved());
    assert!(outcome.subpool_slack_h() < 1e-6);

    let report = MoveReportEngine::new(optimizer.config(), &resolver).generate(&outcome.assignments);
    for week in &report.weekly {
        assert!(week.after.subpool_hours <= 200.0 + 1e-6, "{} 子池超额", week.week);
        assert!(!week.after.is_overflow());
    }
}

// ==========================================
// 不可移动 / 调整组
// ==========================================

#[test]
fn test_hard_immovable_stays_put() {
    println!("\n=== 测试：Hard 模式不可移动实例 ===");
    let today = d(2026, 1, 4);
    let mut records = create_week_batch("R", today, 50, 20.0);
    for record in records.iter_mut().take(30) {
        record.immovable = true;
    }
    let config = OptimizerConfig {
        immovable_mode: ImmovableMode::Hard,
        ..create_small_config()
    };

    let optimizer = RelayOptimizer::with_highs(config).unwrap();
    let outcome = optimizer.optimize(records, today).unwrap();

    assert!(outcome.status.is_solved());
    assert!(outcome.assignments.iter().filter(|a| a.immovable).all(|a| !a.is_moved()));
    // 30 × 20 = 600 小时不可动，必然保留 100 小时超额
    assert!((outcome.total_slack_h() - 100.0).abs() < 1e-4);
    assert_eq!(outcome.moved_count(), 20);
}

#[test]
fn test_adjacency_group_lands_in_same_week() {
    println!("\n=== 测试：调整组同周 ===");
    let today = d(2026, 1, 4);
    let records = vec![
        RelayRecordBuilder::new("RA", "S1").week(today).hours(10.0).group("G1").build(),
        RelayRecordBuilder::new("RB", "S2").week(d(2026, 1, 18)).hours(10.0).group("G1").build(),
        RelayRecordBuilder::new("RC", "S3").week(d(2026, 1, 25)).hours(10.0).group("NO_GROUP").build(),
    ];

    let optimizer = RelayOptimizer::with_highs(create_small_config()).unwrap();
    let outcome = optimizer.optimize(records, today).unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Optimal);
    let week_of = |relay: &str| {
        outcome
            .assignments
            .iter()
            .find(|a| a.relay_id == relay)
            .and_then(|a| a.suggested_week)
    };
    assert_eq!(week_of("RA"), week_of("RB"));
    assert_eq!(week_of("RC"), Some(d(2026, 1, 25)));
    assert_eq!(outcome.moved_count(), 1);
}

#[test]
fn test_adjacency_moves_every_instance_of_grouped_relay() {
    println!("\n=== 测试：调整组覆盖 relay 的全部门店实例 ===");
    let today = d(2026, 1, 4);
    // RA 在 S2 的实例未标记调整组，仍须与 RB 同周
    let records = vec![
        RelayRecordBuilder::new("RA", "S1").week(d(2026, 1, 11)).hours(10.0).group("G1").build(),
        RelayRecordBuilder::new("RA", "S2").week(d(2026, 1, 25)).hours(10.0).build(),
        RelayRecordBuilder::new("RB", "S3").week(d(2026, 1, 11)).hours(10.0).group("G1").build(),
    ];

    let optimizer = RelayOptimizer::with_highs(create_small_config()).unwrap();
    let outcome = optimizer.optimize(records, today).unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Optimal);
    assert_each_instance_once(&outcome);
    for assignment in &outcome.assignments {
        assert_eq!(
            assignment.suggested_week,
            Some(d(2026, 1, 11)),
            "{} 未与调整组同周",
            assignment.instance_id
        );
    }
    assert_eq!(outcome.moved_count(), 1);
}

// ==========================================
// 范围与缺失周
// ==========================================

#[test]
fn test_off_weekday_dates_snap_to_week_ending() {
    println!("\n=== 测试：非周结束日日期对齐到周日 ===");
    let today = d(2026, 1, 4);
    // 周六日期，容量充足
    let records = vec![
        RelayRecordBuilder::new("R1", "S1").week(d(2026, 1, 3)).hours(10.0).build(),
        RelayRecordBuilder::new("R2", "S1").week(d(2026, 1, 10)).hours(10.0).build(),
        RelayRecordBuilder::new("R3", "S1").week(d(2026, 1, 17)).hours(10.0).build(),
    ];

    let optimizer = RelayOptimizer::with_highs(create_small_config()).unwrap();
    let outcome = optimizer.optimize(records, today).unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Optimal);
    assert_each_instance_once(&outcome);
    assert_eq!(outcome.moved_count(), 0);
    assert!(outcome.objective_value.unwrap().abs() < 1e-6);

    let suggested: Vec<_> = outcome.assignments.iter().map(|a| a.suggested_week).collect();
    assert_eq!(
        suggested,
        vec![Some(d(2026, 1, 4)), Some(d(2026, 1, 11)), Some(d(2026, 1, 18))]
    );
}

#[test]
fn test_out_of_scope_and_missing_week() {
    println!("\n=== 测试：回看边界外排除，缺失周实例可分配任意周 ===");
    let today = d(2026, 1, 4);
    let records = vec![
        RelayRecordBuilder::new("OLD", "S1").week(d(2024, 1, 7)).hours(10.0).build(),
        RelayRecordBuilder::new("NA", "S1").hours(10.0).build(),
        RelayRecordBuilder::new("OK", "S1").week(today).hours(10.0).build(),
    ];

    let optimizer = RelayOptimizer::with_highs(create_small_config()).unwrap();
    let outcome = optimizer.optimize(records, today).unwrap();

    assert_eq!(outcome.instances_count, 2);
    assert_each_instance_once(&outcome);
    let missing = outcome.assignments.iter().find(|a| a.relay_id == "NA").unwrap();
    assert_eq!(missing.original_week, None);
    assert!(missing.suggested_week.is_some());
    assert!(missing.instance_id.ends_with("_NA"));
}

// ==========================================
// 场景 D: 降级路径
// ==========================================

#[test]
fn test_no_eligible_weeks_falls_back() {
    println!("\n=== 测试：无候选周 → 恒等降级 ===");
    let today = d(2026, 1, 4);
    let records = create_week_batch("R", d(2026, 6, 7), 3, 10.0);
    let config = OptimizerConfig {
        future_buffer_weeks: 0,
        ..create_small_config()
    };

    let optimizer = RelayOptimizer::with_highs(config).unwrap();
    let outcome = optimizer.optimize(records, today).unwrap();

    assert_eq!(
        outcome.status,
        OutcomeStatus::Fallback {
            reason: FallbackReason::NoEligibleWeeks
        }
    );
    assert_each_instance_once(&outcome);
    assert_eq!(outcome.moved_count(), 0);
}

#[test]
fn test_infeasible_solver_falls_back() {
    println!("\n=== 测试：不可行 → 恒等降级 ===");
    let today = d(2026, 1, 4);
    let records = create_week_batch("R", today, 10, 80.0);

    let optimizer = RelayOptimizer::new(create_small_config(), InfeasibleSolver).unwrap();
    let outcome = optimizer.optimize(records, today).unwrap();

    assert_eq!(
        outcome.status,
        OutcomeStatus::Fallback {
            reason: FallbackReason::Infeasible
        }
    );
    assert_each_instance_once(&outcome);
    assert!(outcome.assignments.iter().all(|a| a.suggested_week == a.original_week));
    assert!(outcome.week_slacks.is_empty());
}

// ==========================================
// 缓存
// ==========================================

#[test]
fn test_cached_optimize_reuses_outcome() {
    println!("\n=== 测试：缓存命中 ===");
    let today = d(2026, 1, 4);
    let records = create_week_batch("R", today, 5, 10.0);
    let optimizer = RelayOptimizer::with_highs(create_small_config()).unwrap();
    let mut cache = OptimizationCache::with_default_ttl();

    let first = optimizer.optimize_cached(records.clone(), today, &mut cache).unwrap();
    let second = optimizer.optimize_cached(records, today, &mut cache).unwrap();

    assert_eq!(cache.len(), 1);
    assert_eq!(first.run_id, second.run_id);
}

#[test]
fn test_fallback_outcome_not_cached() {
    let today = d(2026, 1, 4);
    let records = create_week_batch("R", today, 5, 10.0);
    let optimizer = RelayOptimizer::new(create_small_config(), InfeasibleSolver).unwrap();
    let mut cache = OptimizationCache::with_default_ttl();

    let first = optimizer.optimize_cached(records.clone(), today, &mut cache).unwrap();
    let second = optimizer.optimize_cached(records, today, &mut cache).unwrap();

    assert!(cache.is_empty());
    assert_ne!(first.run_id, second.run_id);
}
