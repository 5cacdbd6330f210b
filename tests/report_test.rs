// ==========================================
// MoveReportEngine 集成测试
// ==========================================
// 职责: 验证优化结果的移动报表（部门汇总、逐周对比、请求关联）
// ==========================================

mod helpers;

use helpers::test_data_builder::{create_small_config, d, RelayRecordBuilder};
use modular_balancing::engine::{MoveReportEngine, RelayOptimizer};

#[test]
fn test_report_after_optimization() {
    println!("\n=== 测试：优化后移动报表 ===");
    let today = d(2026, 1, 4);
    let mut records: Vec<_> = (0..30)
        .map(|i| {
            let dept = if i % 2 == 0 { "Grocery" } else { "Apparel" };
            RelayRecordBuilder::new(&format!("R{:03}", i), "S1")
                .week(today)
                .hours(20.0)
                .dept(dept)
                .build()
        })
        .collect();
    records.push(
        RelayRecordBuilder::new("NODEPT", "S1")
            .week(d(2026, 1, 11))
            .hours(5.0)
            .requested("BRA", d(2026, 1, 18))
            .build(),
    );

    let optimizer = RelayOptimizer::with_highs(create_small_config()).unwrap();
    let resolver = optimizer.threshold_resolver(&records);
    let outcome = optimizer.optimize(records, today).unwrap();
    let report = MoveReportEngine::new(optimizer.config(), &resolver).generate(&outcome.assignments);

    println!("{}", report);
    assert_eq!(report.total_instances, 31);
    assert_eq!(report.moved_count, outcome.moved_count());
    let dept_total: usize = report.moves_by_department.values().map(|m| m.moved_count).sum();
    assert_eq!(dept_total, report.moved_count);
    assert_eq!(report.weeks_over_before(), 1);
    assert_eq!(report.weeks_over_after(), 0);

    // 总工时守恒
    let before: f64 = report.weekly.iter().map(|w| w.before.total_hours).sum();
    let after: f64 = report.weekly.iter().map(|w| w.after.total_hours).sum();
    assert!((before - after).abs() < 1e-9);

    assert_eq!(report.pending.with_request, 1);
    assert_eq!(report.pending.with_target_week, 1);
}

#[test]
fn test_report_on_empty_assignments() {
    let config = create_small_config();
    let optimizer = RelayOptimizer::with_highs(config).unwrap();
    let resolver = optimizer.threshold_resolver(&[]);

    let report = MoveReportEngine::new(optimizer.config(), &resolver).generate(&[]);

    assert_eq!(report.total_instances, 0);
    assert!(report.weekly.is_empty());
    assert!(report.moves_by_department.is_empty());
}
