// ==========================================
// Relay 调期排程 - 结果提取与降级策略
// ==========================================
// Optimal/Feasible: 每个实例取四舍五入后 assign = 1 的唯一一周
//                   任一实例不满足"恰好一周"即整体降级
//                   取整后的解须满足模型全部约束行
// 其它情况: 恒等方案（建议周 = 原始周）
// 红线: 两条路径都保证每个实例恰好出现一次
// ==========================================

use crate::domain::relay::RelayStoreInstance;
use crate::domain::schedule::SuggestedAssignment;
use crate::domain::types::FallbackReason;
use crate::domain::week::WeekSlack;
use crate::engine::model::{AssignmentModel, VarKind};
use crate::engine::solver::{SolveStatus, SolverOutput};
use tracing::{debug, warn};

/// 松弛量低于该值视为 0（求解器数值噪声）
const SLACK_EPSILON: f64 = 1e-6;

// ==========================================
// Extraction - 求解路径结果
// ==========================================
#[derive(Debug, Clone)]
pub struct Extraction {
    pub assignments: Vec<SuggestedAssignment>,
    pub week_slacks: Vec<WeekSlack>,
    pub objective_value: f64,
}

/// 恒等降级方案
pub fn identity_fallback(instances: &[RelayStoreInstance]) -> Vec<SuggestedAssignment> {
    instances
        .iter()
        .map(|inst| SuggestedAssignment::from_instance(inst, inst.original_week()))
        .collect()
}

/// 从求解输出提取建议排程
///
/// # 返回
/// - Ok(Extraction): 每个实例恰好一周
/// - Err(FallbackReason): 状态不可行或解不一致，由调用方走恒等方案
pub fn extract(
    instances: &[RelayStoreInstance],
    model: &AssignmentModel,
    output: &SolverOutput,
) -> Result<Extraction, FallbackReason> {
    if output.status == SolveStatus::Infeasible {
        return Err(FallbackReason::Infeasible);
    }

    let arena = model.arena;
    if output.values.len() != arena.len() {
        return Err(FallbackReason::InconsistentSolution(format!(
            "变量数不符: 期望 {}, 实际 {}",
            arena.len(),
            output.values.len()
        )));
    }

    let mut assignments = Vec::with_capacity(instances.len());
    for (i, instance) in instances.iter().enumerate() {
        let chosen: Vec<usize> = (0..arena.n_weeks())
            .filter(|&w| output.values[arena.assign(i, w)].round() == 1.0)
            .collect();

        match chosen.as_slice() {
            [w] => {
                let week = model.weeks[*w].week;
                assignments.push(SuggestedAssignment::from_instance(instance, Some(week)));
            }
            _ => {
                warn!(
                    instance = %instance.key,
                    selected_weeks = chosen.len(),
                    "实例未恰好分配到一周"
                );
                return Err(FallbackReason::InconsistentSolution(format!(
                    "实例 {} 分配到 {} 周",
                    instance.key,
                    chosen.len()
                )));
            }
        }
    }

    // ===== 取整后逐行复核 =====
    let rounded: Vec<f64> = output
        .values
        .iter()
        .enumerate()
        .map(|(idx, &v)| match arena.kind(idx) {
            VarKind::Binary => v.round(),
            VarKind::NonNegative => v,
        })
        .collect();
    if let Some(row) = model
        .rows
        .iter()
        .find(|row| !row.is_satisfied(&rounded, row_tolerance(&row.terms)))
    {
        warn!(row = %row.name, lhs = row.lhs(&rounded), rhs = row.rhs, "取整后约束不满足");
        return Err(FallbackReason::InconsistentSolution(format!(
            "约束 {} 不满足",
            row.name
        )));
    }

    let week_slacks: Vec<WeekSlack> = model
        .weeks
        .iter()
        .enumerate()
        .map(|(w, capacity)| WeekSlack {
            week: capacity.week,
            total_slack_h: clean_slack(output.values[arena.total_slack(w)]),
            subpool_slack_h: clean_slack(output.values[arena.subpool_slack(w)]),
        })
        .collect();

    let objective_value = model.objective_value(&output.values);
    debug!(objective_value, "解提取完成");

    Ok(Extraction {
        assignments,
        week_slacks,
        objective_value,
    })
}

/// 行容差随系数规模放大
fn row_tolerance(terms: &[(usize, f64)]) -> f64 {
    let scale: f64 = terms.iter().map(|(_, coef)| coef.abs()).sum();
    SLACK_EPSILON * (1.0 + scale)
}

fn clean_slack(value: f64) -> f64 {
    if value.is_finite() && value > SLACK_EPSILON {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerConfig;
    use crate::domain::relay::{InstanceKey, RawRelayRecord};
    use crate::domain::week::WeekCapacity;
    use crate::engine::model::ModelBuilder;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn create_test_setup() -> (Vec<RelayStoreInstance>, AssignmentModel) {
        create_test_setup_with_threshold(100.0)
    }

    fn create_test_setup_with_threshold(threshold: f64) -> (Vec<RelayStoreInstance>, AssignmentModel) {
        let instances: Vec<RelayStoreInstance> = ["R1", "R2"]
            .iter()
            .map(|relay| {
                let week = Some(d(2026, 1, 4));
                let record = RawRelayRecord::new(relay, "S1", week, 10.0);
                RelayStoreInstance::from_record(InstanceKey::from_parts(relay, "S1", week), record)
            })
            .collect();
        let weeks: Vec<WeekCapacity> = [d(2026, 1, 4), d(2026, 1, 11)]
            .iter()
            .map(|&week| WeekCapacity {
                week,
                is_holiday: false,
                total_hours_threshold: threshold,
                subpool_hours_threshold: 50.0,
            })
            .collect();
        let model = ModelBuilder::new(&OptimizerConfig::default()).build(&instances, &weeks);
        (instances, model)
    }

    #[test]
    fn test_extract_rounds_values() {
        let (instances, model) = create_test_setup();
        let arena = model.arena;
        let mut values = vec![0.0; arena.len()];
        values[arena.assign(0, 0)] = 0.9999997;
        values[arena.assign(1, 1)] = 1.0;
        values[arena.assign(1, 0)] = 1e-8;
        values[arena.total_slack(0)] = -1e-9;

        let output = SolverOutput {
            status: SolveStatus::Optimal,
            values,
        };
        let extraction = extract(&instances, &model, &output).unwrap();

        assert_eq!(extraction.assignments[0].suggested_week, Some(d(2026, 1, 4)));
        assert_eq!(extraction.assignments[1].suggested_week, Some(d(2026, 1, 11)));
        assert!(extraction.assignments[1].is_moved());
        assert_eq!(extraction.week_slacks[0].total_slack_h, 0.0);
        assert!((extraction.objective_value - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_extract_rejects_double_assignment() {
        let (instances, model) = create_test_setup();
        let arena = model.arena;
        let mut values = vec![0.0; arena.len()];
        values[arena.assign(0, 0)] = 1.0;
        values[arena.assign(0, 1)] = 1.0;
        values[arena.assign(1, 0)] = 1.0;

        let output = SolverOutput {
            status: SolveStatus::Feasible,
            values,
        };
        let reason = extract(&instances, &model, &output).unwrap_err();
        assert!(matches!(reason, FallbackReason::InconsistentSolution(_)));
    }

    #[test]
    fn test_extract_rejects_capacity_violation() {
        // 上限 5: 两个实例同在第 0 周需 15 小时松弛，解中松弛为 0
        let (instances, model) = create_test_setup_with_threshold(5.0);
        let arena = model.arena;
        let mut values = vec![0.0; arena.len()];
        values[arena.assign(0, 0)] = 1.0;
        values[arena.assign(1, 0)] = 1.0;

        let output = SolverOutput {
            status: SolveStatus::Optimal,
            values,
        };
        let reason = extract(&instances, &model, &output).unwrap_err();
        match reason {
            FallbackReason::InconsistentSolution(detail) => assert!(detail.contains("total_capacity")),
            other => panic!("unexpected reason: {:?}", other),
        }
    }

    #[test]
    fn test_infeasible_status_and_identity_fallback() {
        let (instances, model) = create_test_setup();
        let reason = extract(&instances, &model, &SolverOutput::infeasible()).unwrap_err();
        assert_eq!(reason, FallbackReason::Infeasible);

        let fallback = identity_fallback(&instances);
        assert_eq!(fallback.len(), instances.len());
        assert!(fallback.iter().all(|a| !a.is_moved()));
    }
}
