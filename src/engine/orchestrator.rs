// ==========================================
// Relay 调期排程 - 优化编排器
// ==========================================
// 流程（严格单向）:
// 周对齐 → 范围过滤 → 实例归一化 → 候选周 → 周阈值 → 约束模型 → 求解 → 提取/降级
// 错误策略:
// - 身份重复 / 配置无效: Err
// - 无实例: EmptyScope
// - 无候选周 / 不可行 / 求解失败 / 解不一致: 恒等降级，不报错
// ==========================================

use crate::config::OptimizerConfig;
use crate::domain::relay::{RawRelayRecord, RelayStoreInstance};
use crate::domain::schedule::OptimizationOutcome;
use crate::domain::types::{FallbackReason, OutcomeStatus};
use crate::engine::cache::{fingerprint, Clock, OptimizationCache};
use crate::engine::error::OptimizerResult;
use crate::engine::extractor::{extract, identity_fallback};
use crate::engine::model::ModelBuilder;
use crate::engine::normalizer::InstanceNormalizer;
use crate::engine::solver::{HighsSolver, MilpSolver, SolveStatus};
use crate::engine::threshold::ThresholdResolver;
use crate::engine::week_universe::WeekUniverseBuilder;
use crate::perf::PerfGuard;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// RelayOptimizer - 优化编排器
// ==========================================
pub struct RelayOptimizer<S: MilpSolver = HighsSolver> {
    config: OptimizerConfig,
    solver: S,
    holidays: BTreeSet<NaiveDate>, // 显式节假日日历
    normalizer: InstanceNormalizer,
}

impl RelayOptimizer<HighsSolver> {
    /// 使用 HiGHS 求解器
    pub fn with_highs(config: OptimizerConfig) -> OptimizerResult<Self> {
        Self::new(config, HighsSolver::new())
    }
}

impl<S: MilpSolver> RelayOptimizer<S> {
    /// 创建编排器（配置先校验）
    ///
    /// # 参数
    /// - config: 优化器配置
    /// - solver: MILP 求解器实现
    pub fn new(config: OptimizerConfig, solver: S) -> OptimizerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            solver,
            holidays: BTreeSet::new(),
            normalizer: InstanceNormalizer::new(),
        })
    }

    /// 追加显式节假日日历
    pub fn with_holidays<I>(mut self, weeks: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.holidays.extend(weeks);
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// 本次输入对应的阈值解析器（显式日历 + 记录中的节假日标记）
    ///
    /// 节假日日期对齐到所在周的周末日期
    pub fn threshold_resolver(&self, records: &[RawRelayRecord]) -> ThresholdResolver {
        let universe = WeekUniverseBuilder::new(&self.config);
        let holidays: BTreeSet<NaiveDate> = self
            .holidays
            .iter()
            .copied()
            .chain(ThresholdResolver::holidays_from_records(records))
            .map(|week| universe.week_ending_on_or_after(week))
            .collect();
        ThresholdResolver::new(&self.config).with_holidays(holidays)
    }

    /// 执行一次优化
    ///
    /// # 参数
    /// - records: 当前快照的原始记录
    /// - today: 业务日期（决定候选周范围与回看边界）
    ///
    /// # 返回
    /// - Ok(OptimizationOutcome): 求解结果或降级结果
    /// - Err: 数据完整性错误
    #[instrument(skip(self, records), fields(run_id = tracing::field::Empty, records_count = records.len(), solver = self.solver.name()))]
    pub fn optimize(
        &self,
        records: Vec<RawRelayRecord>,
        today: NaiveDate,
    ) -> OptimizerResult<OptimizationOutcome> {
        let _perf = PerfGuard::new("optimize");
        let start_time = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        info!(today = %today, "开始执行 relay 调期优化");

        let universe = WeekUniverseBuilder::new(&self.config);
        let resolver = self.threshold_resolver(&records);

        // ==========================================
        // 步骤1: 周对齐 + 范围过滤 + 实例归一化
        // ==========================================
        debug!("步骤1: 周对齐、范围过滤与实例归一化");
        let instances = {
            let _perf = PerfGuard::new("normalize");
            let (records, _shifted) = universe.align_records(records);
            let (in_scope, _excluded) =
                self.normalizer.retain_in_scope(records, universe.horizon(today));
            self.normalizer.normalize(in_scope)?.instances
        };

        if instances.is_empty() {
            info!("无待优化实例，返回空结果");
            return Ok(self.finish(run_id, OutcomeStatus::EmptyScope, &instances, 0, start_time, None));
        }

        // ==========================================
        // 步骤2: 候选周
        // ==========================================
        debug!("步骤2: 构建候选周");
        let weeks = universe.build(&instances, today);
        if weeks.is_empty() {
            warn!(instances_count = instances.len(), "候选周为空，输出恒等方案");
            return Ok(self.fallback(run_id, FallbackReason::NoEligibleWeeks, &instances, 0, start_time));
        }

        // ==========================================
        // 步骤3: 周阈值
        // ==========================================
        debug!("步骤3: 解析周阈值");
        let capacities = resolver.resolve(&weeks);

        // ==========================================
        // 步骤4: 约束模型
        // ==========================================
        debug!("步骤4: 构建约束模型");
        let model = {
            let _perf = PerfGuard::new("build_model");
            ModelBuilder::new(&self.config).build(&instances, &capacities)
        };

        // ==========================================
        // 步骤5: 求解
        // ==========================================
        debug!("步骤5: 提交求解器");
        let output = {
            let _perf = PerfGuard::new("solve");
            self.solver.solve(&model, self.config.solver_time_limit())
        };
        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "求解器调用失败，输出恒等方案");
                return Ok(self.fallback(
                    run_id,
                    FallbackReason::SolverError(e.to_string()),
                    &instances,
                    weeks.len(),
                    start_time,
                ));
            }
        };

        // ==========================================
        // 步骤6: 提取结果 / 降级
        // ==========================================
        debug!("步骤6: 提取结果");
        match extract(&instances, &model, &output) {
            Ok(extraction) => {
                let status = match output.status {
                    SolveStatus::Optimal => OutcomeStatus::Optimal,
                    _ => OutcomeStatus::Feasible,
                };
                let mut outcome = self.finish(
                    run_id,
                    status,
                    &instances,
                    weeks.len(),
                    start_time,
                    Some(extraction.objective_value),
                );
                outcome.assignments = extraction.assignments;
                outcome.week_slacks = extraction.week_slacks;

                info!(
                    status = %outcome.status,
                    instances_count = outcome.instances_count,
                    weeks_count = outcome.weeks_count,
                    moved_count = outcome.moved_count(),
                    total_slack_h = outcome.total_slack_h(),
                    subpool_slack_h = outcome.subpool_slack_h(),
                    elapsed_ms = outcome.elapsed_ms,
                    "relay 调期优化完成"
                );
                Ok(outcome)
            }
            Err(reason) => {
                warn!(reason = %reason, "求解结果不可用，输出恒等方案");
                Ok(self.fallback(run_id, reason, &instances, weeks.len(), start_time))
            }
        }
    }

    /// 带缓存的优化
    ///
    /// 缓存命中直接返回；指纹计算失败时不使用缓存
    pub fn optimize_cached<C: Clock>(
        &self,
        records: Vec<RawRelayRecord>,
        today: NaiveDate,
        cache: &mut OptimizationCache<C>,
    ) -> OptimizerResult<OptimizationOutcome> {
        let key = match fingerprint(&self.config, today, &records) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "输入指纹计算失败，跳过缓存");
                return self.optimize(records, today);
            }
        };

        let purged = cache.purge_expired();
        if purged > 0 {
            debug!(purged, "清理过期缓存条目");
        }

        if let Some(outcome) = cache.get(&key) {
            info!(run_id = %outcome.run_id, "命中优化结果缓存");
            return Ok(outcome.clone());
        }

        let outcome = self.optimize(records, today)?;
        cache.put(key, outcome.clone());
        Ok(outcome)
    }

    // ==========================================
    // 结果组装
    // ==========================================

    fn fallback(
        &self,
        run_id: String,
        reason: FallbackReason,
        instances: &[RelayStoreInstance],
        weeks_count: usize,
        start_time: Instant,
    ) -> OptimizationOutcome {
        let mut outcome = self.finish(
            run_id,
            OutcomeStatus::Fallback { reason },
            instances,
            weeks_count,
            start_time,
            None,
        );
        outcome.assignments = identity_fallback(instances);
        info!(
            status = %outcome.status,
            instances_count = outcome.instances_count,
            elapsed_ms = outcome.elapsed_ms,
            "恒等降级方案已生成"
        );
        outcome
    }

    fn finish(
        &self,
        run_id: String,
        status: OutcomeStatus,
        instances: &[RelayStoreInstance],
        weeks_count: usize,
        start_time: Instant,
        objective_value: Option<f64>,
    ) -> OptimizationOutcome {
        OptimizationOutcome {
            run_id,
            status,
            assignments: Vec::new(),
            week_slacks: Vec::new(),
            objective_value,
            instances_count: instances.len(),
            weeks_count,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::AssignmentModel;
    use crate::engine::solver::{SolverError, SolverOutput};
    use crate::engine::OptimizerError;
    use chrono::{DateTime, Utc};
    use std::cell::Cell;
    use std::time::Duration;

    struct FailingSolver;

    impl MilpSolver for FailingSolver {
        fn name(&self) -> &str {
            "failing"
        }

        fn solve(&self, _model: &AssignmentModel, _time_limit: Duration) -> Result<SolverOutput, SolverError> {
            Err(SolverError::Backend("license expired".to_string()))
        }
    }

    struct ManualClock {
        now: Cell<DateTime<Utc>>,
    }

    impl Clock for &ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.now.get()
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = OptimizerConfig {
            solver_time_limit_seconds: 0,
            ..OptimizerConfig::default()
        };
        let result = RelayOptimizer::new(config, FailingSolver);
        assert!(matches!(result, Err(OptimizerError::Config(_))));
    }

    #[test]
    fn test_empty_scope() {
        let optimizer = RelayOptimizer::new(OptimizerConfig::default(), FailingSolver).unwrap();
        let outcome = optimizer.optimize(Vec::new(), d(2026, 1, 4)).unwrap();
        assert_eq!(outcome.status, OutcomeStatus::EmptyScope);
        assert!(outcome.assignments.is_empty());
    }

    #[test]
    fn test_solver_error_falls_back() {
        let optimizer = RelayOptimizer::new(OptimizerConfig::default(), FailingSolver).unwrap();
        let records = vec![
            RawRelayRecord::new("R1", "S1", Some(d(2026, 1, 4)), 5.0),
            RawRelayRecord::new("R2", "S1", None, 5.0),
        ];

        let outcome = optimizer.optimize(records, d(2026, 1, 4)).unwrap();

        assert!(matches!(
            outcome.status,
            OutcomeStatus::Fallback {
                reason: FallbackReason::SolverError(_)
            }
        ));
        assert_eq!(outcome.assignments.len(), 2);
        assert_eq!(outcome.moved_count(), 0);
        assert_eq!(outcome.assignments[1].suggested_week, None);
    }

    #[test]
    fn test_range_bounds_rejected_at_construction() {
        let config = OptimizerConfig {
            lookback_horizon_days: u32::MAX,
            ..OptimizerConfig::default()
        };
        let result = RelayOptimizer::new(config, FailingSolver);
        assert!(matches!(result, Err(OptimizerError::Config(_))));
    }

    #[test]
    fn test_cached_run_evicts_expired_entries() {
        let clock = ManualClock {
            now: Cell::new(Utc::now()),
        };
        let mut cache = OptimizationCache::new(&clock, chrono::Duration::minutes(10));
        let optimizer = RelayOptimizer::new(OptimizerConfig::default(), FailingSolver).unwrap();

        // 空输入得到 EmptyScope，可缓存
        optimizer.optimize_cached(Vec::new(), d(2026, 1, 4), &mut cache).unwrap();
        assert_eq!(cache.len(), 1);

        clock.now.set(clock.now.get() + chrono::Duration::minutes(11));
        optimizer.optimize_cached(Vec::new(), d(2026, 1, 11), &mut cache).unwrap();

        // 第一次的条目已过期被清理，仅保留第二次
        assert_eq!(cache.len(), 1);
    }
}
