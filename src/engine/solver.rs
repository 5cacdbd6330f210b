// ==========================================
// Relay 调期排程 - MILP 求解器接口
// ==========================================
// 职责: 将 AssignmentModel 提交给通用 MILP 求解器
// 状态: Optimal / Feasible（时间上限内有可行解）/ Infeasible（含无解、无界）
// 红线: 同步阻塞调用，唯一挂起点，受时间上限约束
// ==========================================

use crate::engine::model::{AssignmentModel, RowSense, VarKind};
use good_lp::solvers::highs::highs;
use good_lp::{
    variable, Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus,
    SolverModel, Variable, WithTimeLimit,
};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

// ==========================================
// SolverError - 求解器调用失败
// ==========================================
// 编排器捕获后降级为恒等方案，不向调用方传播
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("求解器后端错误: {0}")]
    Backend(String),
}

// ==========================================
// SolveStatus / SolverOutput
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutput {
    pub status: SolveStatus,
    pub values: Vec<f64>, // 按 VariableArena 下标；Infeasible 时为空
}

impl SolverOutput {
    pub fn infeasible() -> Self {
        Self {
            status: SolveStatus::Infeasible,
            values: Vec::new(),
        }
    }
}

// ==========================================
// Trait: MilpSolver
// ==========================================
pub trait MilpSolver: Send + Sync {
    /// 求解器名称（日志用）
    fn name(&self) -> &str;

    /// 求解模型
    ///
    /// # 返回
    /// - Ok(SolverOutput): 含状态；Optimal/Feasible 时 values 长度 = arena.len()
    /// - Err(SolverError): 调用失败
    fn solve(&self, model: &AssignmentModel, time_limit: Duration) -> Result<SolverOutput, SolverError>;
}

// ==========================================
// HighsSolver - good_lp + HiGHS 实现
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct HighsSolver {
    verbose: bool,
}

impl HighsSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 输出 HiGHS 求解日志
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl MilpSolver for HighsSolver {
    fn name(&self) -> &str {
        "highs"
    }

    fn solve(&self, model: &AssignmentModel, time_limit: Duration) -> Result<SolverOutput, SolverError> {
        let start = Instant::now();
        let arena = model.arena;

        // ===== 变量 =====
        let mut vars = ProblemVariables::new();
        let handles: Vec<Variable> = (0..arena.len())
            .map(|idx| match arena.kind(idx) {
                VarKind::Binary => vars.add(variable().binary()),
                VarKind::NonNegative => vars.add(variable().min(0.0)),
            })
            .collect();

        // ===== 目标 =====
        let mut objective = Expression::default();
        for (idx, &coef) in model.objective.iter().enumerate() {
            if coef != 0.0 {
                objective.add_mul(coef, handles[idx]);
            }
        }

        let mut problem = vars
            .minimise(objective)
            .using(highs)
            .with_time_limit(time_limit.as_secs_f64());
        problem.set_verbose(self.verbose);

        // ===== 约束 =====
        for row in &model.rows {
            let mut expr = Expression::default();
            for &(idx, coef) in &row.terms {
                expr.add_mul(coef, handles[idx]);
            }
            let constraint = match row.sense {
                RowSense::Eq => expr.eq(row.rhs),
                RowSense::Le => expr.leq(row.rhs),
            };
            problem.add_constraint(constraint);
        }

        debug!(
            variables = arena.len(),
            rows = model.rows.len(),
            time_limit_s = time_limit.as_secs_f64(),
            "提交 HiGHS 求解"
        );

        let solution = match problem.solve() {
            Ok(solution) => solution,
            Err(ResolutionError::Infeasible) | Err(ResolutionError::Unbounded) => {
                warn!(elapsed_ms = start.elapsed().as_millis() as u64, "HiGHS 判定无可行解");
                return Ok(SolverOutput::infeasible());
            }
            Err(e) => return Err(SolverError::Backend(e.to_string())),
        };

        let status = match solution.status() {
            SolutionStatus::Optimal => SolveStatus::Optimal,
            SolutionStatus::TimeLimit | SolutionStatus::GapLimit => SolveStatus::Feasible,
        };
        let values: Vec<f64> = handles.iter().map(|&v| solution.value(v)).collect();

        info!(
            status = ?status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "HiGHS 求解完成"
        );
        Ok(SolverOutput { status, values })
    }
}
