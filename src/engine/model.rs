// ==========================================
// Relay 调期排程 - 约束模型构建
// ==========================================
// 决策变量（变量表按整数下标寻址）:
// - assign(i, w)        二元，实例 i 排入候选周 w
// - total_slack(w)      连续非负，周 w 总工时超额
// - subpool_slack(w)    连续非负，周 w 子池工时超额
// 目标（最小化）:
//   Σ 移动成本 × assign(i, w≠原始周) + Σ 惩罚 × 松弛
// 约束:
// 1. 每个实例恰好一周
// 2. 不可移动（Hard 模式）: assign(i, 原始周) = 1
// 3. 调整组同周: n_other × Σ ref(w) = n_ref × Σ other(w)
// 4. 总工时软上限: Σ hours × assign - total_slack ≤ 阈值
// 5. 子池工时软上限: 同上，仅子池门店
// 模型与具体求解器无关，由 MilpSolver 实现翻译
// ==========================================

use crate::config::OptimizerConfig;
use crate::domain::relay::RelayStoreInstance;
use crate::domain::schedule::AdjacencyGroup;
use crate::domain::types::ImmovableMode;
use crate::domain::week::WeekCapacity;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

// ==========================================
// 变量表
// ==========================================

/// 变量类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    NonNegative, // 连续，下界 0
}

/// 变量表：instance × week 二维块 + 两段每周松弛块
///
/// 布局: [assign: n_instances × n_weeks][total_slack: n_weeks][subpool_slack: n_weeks]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableArena {
    n_instances: usize,
    n_weeks: usize,
}

impl VariableArena {
    pub fn new(n_instances: usize, n_weeks: usize) -> Self {
        Self {
            n_instances,
            n_weeks,
        }
    }

    pub fn n_instances(&self) -> usize {
        self.n_instances
    }

    pub fn n_weeks(&self) -> usize {
        self.n_weeks
    }

    /// 变量总数
    pub fn len(&self) -> usize {
        self.n_instances * self.n_weeks + 2 * self.n_weeks
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn assign(&self, instance: usize, week: usize) -> usize {
        debug_assert!(instance < self.n_instances && week < self.n_weeks);
        instance * self.n_weeks + week
    }

    pub fn total_slack(&self, week: usize) -> usize {
        debug_assert!(week < self.n_weeks);
        self.n_instances * self.n_weeks + week
    }

    pub fn subpool_slack(&self, week: usize) -> usize {
        debug_assert!(week < self.n_weeks);
        self.n_instances * self.n_weeks + self.n_weeks + week
    }

    pub fn kind(&self, index: usize) -> VarKind {
        if index < self.n_instances * self.n_weeks {
            VarKind::Binary
        } else {
            VarKind::NonNegative
        }
    }
}

// ==========================================
// 线性约束行
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSense {
    Eq,
    Le,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearRow {
    pub name: String,
    pub terms: Vec<(usize, f64)>, // (变量下标, 系数)
    pub sense: RowSense,
    pub rhs: f64,
}

impl LinearRow {
    /// 左端取值
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(idx, coef)| coef * values.get(idx).copied().unwrap_or(0.0))
            .sum()
    }

    /// 给定容差下是否满足
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs(values);
        match self.sense {
            RowSense::Eq => (lhs - self.rhs).abs() <= tolerance,
            RowSense::Le => lhs <= self.rhs + tolerance,
        }
    }
}

// ==========================================
// AssignmentModel - 完整模型
// ==========================================
#[derive(Debug, Clone)]
pub struct AssignmentModel {
    pub arena: VariableArena,
    pub objective: Vec<f64>, // 稠密目标系数，长度 = arena.len()
    pub rows: Vec<LinearRow>,
    pub weeks: Vec<WeekCapacity>,
    pub week_index: HashMap<NaiveDate, usize>,
    pub enforced_groups: Vec<AdjacencyGroup>,
    pub hard_immovable_count: usize,
    pub skipped_immovable_count: usize, // Hard 模式下原始周缺失/不在候选周内
}

impl AssignmentModel {
    /// 目标值
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .zip(values.iter())
            .map(|(c, v)| c * v)
            .sum()
    }

    pub fn rows_named<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a LinearRow> + 'a {
        self.rows.iter().filter(move |r| r.name.starts_with(prefix))
    }
}

// ==========================================
// ModelBuilder - 模型构建器
// ==========================================
pub struct ModelBuilder<'a> {
    config: &'a OptimizerConfig,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(config: &'a OptimizerConfig) -> Self {
        Self { config }
    }

    /// 构建模型
    ///
    /// # 参数
    /// - instances: 归一化后实例（身份唯一）
    /// - weeks: 候选周阈值（非空，有序）
    #[instrument(skip_all, fields(instances_count = instances.len(), weeks_count = weeks.len()))]
    pub fn build(&self, instances: &[RelayStoreInstance], weeks: &[WeekCapacity]) -> AssignmentModel {
        let arena = VariableArena::new(instances.len(), weeks.len());
        let week_index: HashMap<NaiveDate, usize> =
            weeks.iter().enumerate().map(|(idx, c)| (c.week, idx)).collect();

        let mut model = AssignmentModel {
            arena,
            objective: vec![0.0; arena.len()],
            rows: Vec::new(),
            weeks: weeks.to_vec(),
            week_index,
            enforced_groups: Vec::new(),
            hard_immovable_count: 0,
            skipped_immovable_count: 0,
        };

        self.add_objective(&mut model, instances);
        self.add_exactly_one_rows(&mut model, instances);
        self.add_immovable_rows(&mut model, instances);
        self.add_adjacency_rows(&mut model, instances);
        self.add_capacity_rows(&mut model, instances);

        info!(
            variables = model.arena.len(),
            rows = model.rows.len(),
            enforced_groups = model.enforced_groups.len(),
            hard_immovable = model.hard_immovable_count,
            "约束模型构建完成"
        );
        model
    }

    /// 单实例移动成本
    fn move_cost(&self, instance: &RelayStoreInstance) -> f64 {
        if instance.immovable {
            self.config.immovable_move_cost
        } else {
            self.config.move_cost_per_instance
        }
    }

    // ==========================================
    // 目标函数
    // ==========================================
    fn add_objective(&self, model: &mut AssignmentModel, instances: &[RelayStoreInstance]) {
        let arena = model.arena;
        for (i, instance) in instances.iter().enumerate() {
            let cost = self.move_cost(instance);
            let original = instance.original_week();
            for (w, capacity) in model.weeks.iter().enumerate() {
                // 原始周缺失时任何周都计为移动
                if original != Some(capacity.week) {
                    model.objective[arena.assign(i, w)] = cost;
                }
            }
        }

        for w in 0..arena.n_weeks() {
            model.objective[arena.total_slack(w)] = self.config.total_overage_penalty_weight;
            model.objective[arena.subpool_slack(w)] = self.config.subpool_overage_penalty_weight;
        }
    }

    // ==========================================
    // 约束 1: 恰好一周
    // ==========================================
    fn add_exactly_one_rows(&self, model: &mut AssignmentModel, instances: &[RelayStoreInstance]) {
        let arena = model.arena;
        for (i, instance) in instances.iter().enumerate() {
            model.rows.push(LinearRow {
                name: format!("assign_once[{}]", instance.key),
                terms: (0..arena.n_weeks()).map(|w| (arena.assign(i, w), 1.0)).collect(),
                sense: RowSense::Eq,
                rhs: 1.0,
            });
        }
    }

    // ==========================================
    // 约束 2: 不可移动（仅 Hard 模式）
    // ==========================================
    fn add_immovable_rows(&self, model: &mut AssignmentModel, instances: &[RelayStoreInstance]) {
        if self.config.immovable_mode != ImmovableMode::Hard {
            return;
        }

        let arena = model.arena;
        for (i, instance) in instances.iter().enumerate().filter(|(_, inst)| inst.immovable) {
            let week = instance
                .original_week()
                .and_then(|orig| model.week_index.get(&orig).copied());
            match week {
                Some(w) => {
                    model.rows.push(LinearRow {
                        name: format!("immovable[{}]", instance.key),
                        terms: vec![(arena.assign(i, w), 1.0)],
                        sense: RowSense::Eq,
                        rhs: 1.0,
                    });
                    model.hard_immovable_count += 1;
                }
                None => {
                    warn!(
                        instance = %instance.key,
                        "不可移动实例的原始周缺失或不在候选周内，跳过硬约束"
                    );
                    model.skipped_immovable_count += 1;
                }
            }
        }
    }

    // ==========================================
    // 约束 3: 调整组同周
    // ==========================================
    fn add_adjacency_rows(&self, model: &mut AssignmentModel, instances: &[RelayStoreInstance]) {
        let groups = collect_adjacency_groups(instances);
        let effective: Vec<AdjacencyGroup> = groups.into_iter().filter(|g| g.is_effective()).collect();
        if effective.len() > self.config.adjacency_group_cap {
            warn!(
                effective_groups = effective.len(),
                cap = self.config.adjacency_group_cap,
                "调整组数量超过上限，仅约束前若干组"
            );
        }

        let arena = model.arena;
        for group in effective.into_iter().take(self.config.adjacency_group_cap) {
            // relay → 该 relay 的全部实例下标（含未标记调整组的门店）
            let members: Vec<Vec<usize>> = group
                .relay_ids
                .iter()
                .map(|relay| {
                    instances
                        .iter()
                        .enumerate()
                        .filter(|(_, inst)| inst.relay_id() == relay)
                        .map(|(i, _)| i)
                        .collect()
                })
                .collect();

            let (reference, others) = match members.split_first() {
                Some(split) => split,
                None => continue,
            };
            let n_ref = reference.len() as f64;

            for (other_pos, other) in others.iter().enumerate() {
                let n_other = other.len() as f64;
                for w in 0..arena.n_weeks() {
                    let mut terms: Vec<(usize, f64)> =
                        Vec::with_capacity(reference.len() + other.len());
                    terms.extend(reference.iter().map(|&i| (arena.assign(i, w), n_other)));
                    terms.extend(other.iter().map(|&i| (arena.assign(i, w), -n_ref)));
                    model.rows.push(LinearRow {
                        name: format!(
                            "adjacency[{}:{}][{}]",
                            group.group_id,
                            group.relay_ids[other_pos + 1],
                            model.weeks[w].week
                        ),
                        terms,
                        sense: RowSense::Eq,
                        rhs: 0.0,
                    });
                }
            }

            debug!(group_id = %group.group_id, relays = group.relay_ids.len(), "调整组约束已添加");
            model.enforced_groups.push(group);
        }
    }

    // ==========================================
    // 约束 4/5: 周工时软上限
    // ==========================================
    fn add_capacity_rows(&self, model: &mut AssignmentModel, instances: &[RelayStoreInstance]) {
        let arena = model.arena;
        let subpool: Vec<bool> = instances
            .iter()
            .map(|inst| self.config.is_subpool_store_type(&inst.store_type))
            .collect();
        let has_subpool = subpool.iter().any(|&s| s);

        for (w, capacity) in model.weeks.iter().enumerate() {
            let mut total_terms: Vec<(usize, f64)> = instances
                .iter()
                .enumerate()
                .filter(|(_, inst)| inst.hours > 0.0)
                .map(|(i, inst)| (arena.assign(i, w), inst.hours))
                .collect();
            total_terms.push((arena.total_slack(w), -1.0));
            model.rows.push(LinearRow {
                name: format!("total_capacity[{}]", capacity.week),
                terms: total_terms,
                sense: RowSense::Le,
                rhs: capacity.total_hours_threshold,
            });

            if has_subpool {
                let mut subpool_terms: Vec<(usize, f64)> = instances
                    .iter()
                    .enumerate()
                    .filter(|(i, inst)| subpool[*i] && inst.hours > 0.0)
                    .map(|(i, inst)| (arena.assign(i, w), inst.hours))
                    .collect();
                subpool_terms.push((arena.subpool_slack(w), -1.0));
                model.rows.push(LinearRow {
                    name: format!("subpool_capacity[{}]", capacity.week),
                    terms: subpool_terms,
                    sense: RowSense::Le,
                    rhs: capacity.subpool_hours_threshold,
                });
            }
        }
    }
}

/// 按出现顺序收集调整组（relay 去重）
pub fn collect_adjacency_groups(instances: &[RelayStoreInstance]) -> Vec<AdjacencyGroup> {
    let mut groups: Vec<AdjacencyGroup> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for instance in instances {
        let group_id = match instance.adjacency_group.as_deref() {
            Some(g) => g,
            None => continue,
        };
        let pos = *position.entry(group_id).or_insert_with(|| {
            groups.push(AdjacencyGroup {
                group_id: group_id.to_string(),
                relay_ids: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[pos];
        if !group.relay_ids.iter().any(|r| r == instance.relay_id()) {
            group.relay_ids.push(instance.relay_id().to_string());
        }
    }

    groups
}
