// ==========================================
// Relay 调期排程 - 实例归一化引擎
// ==========================================
// 职责: 原始记录 → 身份唯一的可调度实例
// 输入: RawRelayRecord 列表（快照）
// 输出: RelayStoreInstance 列表（保持输入相对顺序）
// ==========================================
// 规则:
// 1. 偏好排序（降序，缺失值排最后，稳定排序）:
//    请求目标周 → 当前周 → 变更幅度 → 工时
// 2. 原始周已知的重复键保留偏好最高的一条，其余丢弃并计数
// 3. 原始周缺失 (NA) 的重复键全部保留，按输入顺序追加序号后缀
// 4. 单次遍历后校验唯一性，失败即数据完整性错误
// ==========================================

use crate::domain::relay::{InstanceKey, RawRelayRecord, RelayStoreInstance};
use crate::engine::error::{OptimizerError, OptimizerResult};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

/// 重复键错误中最多列出的示例数
const DUPLICATE_EXAMPLE_LIMIT: usize = 10;

// ==========================================
// NormalizationReport - 归一化结果
// ==========================================
#[derive(Debug, Clone)]
pub struct NormalizationReport {
    pub instances: Vec<RelayStoreInstance>,
    pub input_count: usize,
    pub dropped_duplicates: usize, // 被丢弃的重复行
    pub suffixed_count: usize,     // 追加了序号后缀的实例
}

// ==========================================
// InstanceNormalizer - 实例归一化引擎
// ==========================================
pub struct InstanceNormalizer {
    // 无状态引擎
}

impl Default for InstanceNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceNormalizer {
    pub fn new() -> Self {
        Self {}
    }

    /// 范围过滤：原始周早于回看边界的记录不参与本次优化
    ///
    /// # 返回
    /// (保留记录, 被排除数量)；原始周缺失的记录保留
    pub fn retain_in_scope(
        &self,
        records: Vec<RawRelayRecord>,
        horizon: NaiveDate,
    ) -> (Vec<RawRelayRecord>, usize) {
        let before = records.len();
        let kept: Vec<RawRelayRecord> = records
            .into_iter()
            .filter(|r| r.original_week.map_or(true, |w| w >= horizon))
            .collect();
        let excluded = before - kept.len();

        if excluded > 0 {
            info!(excluded, horizon = %horizon, "原始周早于回看边界的记录已排除");
        }
        (kept, excluded)
    }

    /// 归一化
    ///
    /// # 返回
    /// - Ok(NormalizationReport)
    /// - Err(DuplicateIdentity): 单次遍历后仍存在重复身份
    #[instrument(skip(self, records), fields(input_count = records.len()))]
    pub fn normalize(&self, records: Vec<RawRelayRecord>) -> OptimizerResult<NormalizationReport> {
        let input_count = records.len();

        let keyed: Vec<(InstanceKey, RawRelayRecord)> = records
            .into_iter()
            .map(|r| {
                let key = InstanceKey::from_parts(&r.relay_id, &r.store_id, r.original_week);
                (key, r)
            })
            .collect();

        // ===== 1. 偏好排序（只排下标，稳定） =====
        let mut order: Vec<usize> = (0..keyed.len()).collect();
        order.sort_by(|&a, &b| compare_preference(&keyed[a].1, &keyed[b].1));

        // ===== 2. 已知原始周的重复键: 保留偏好最高者 =====
        let mut survivors = vec![false; keyed.len()];
        let mut seen: HashSet<&InstanceKey> = HashSet::new();
        let mut dropped_duplicates = 0usize;
        for idx in order {
            let key = &keyed[idx].0;
            if key.original_week.is_none() || seen.insert(key) {
                survivors[idx] = true;
            } else {
                dropped_duplicates += 1;
                debug!(key = %key, row_number = keyed[idx].1.row_number, "重复实例已丢弃");
            }
        }

        // ===== 3. 缺失原始周的重复键: 按输入顺序追加序号 =====
        let mut na_totals: HashMap<InstanceKey, u32> = HashMap::new();
        for (idx, (key, _)) in keyed.iter().enumerate() {
            if survivors[idx] && key.original_week.is_none() {
                *na_totals.entry(key.clone()).or_insert(0) += 1;
            }
        }

        let mut na_next: HashMap<InstanceKey, u32> = HashMap::new();
        let mut suffixed_count = 0usize;
        let mut instances = Vec::with_capacity(keyed.len() - dropped_duplicates);
        for (idx, (key, record)) in keyed.into_iter().enumerate() {
            if !survivors[idx] {
                continue;
            }
            let key = match na_totals.get(&key) {
                Some(&total) if total > 1 => {
                    let next = na_next.entry(key.clone()).or_insert(0);
                    *next += 1;
                    suffixed_count += 1;
                    let ordinal = *next;
                    key.with_ordinal(ordinal)
                }
                _ => key,
            };
            instances.push(RelayStoreInstance::from_record(key, record));
        }

        // ===== 4. 唯一性校验 =====
        self.verify_unique(&instances)?;

        if dropped_duplicates > 0 || suffixed_count > 0 {
            warn!(
                dropped_duplicates,
                suffixed_count, "归一化过程中处理了重复实例"
            );
        }
        info!(
            input_count,
            instances_count = instances.len(),
            dropped_duplicates,
            suffixed_count,
            "实例归一化完成"
        );

        Ok(NormalizationReport {
            instances,
            input_count,
            dropped_duplicates,
            suffixed_count,
        })
    }

    /// 校验实例身份唯一
    pub fn verify_unique(&self, instances: &[RelayStoreInstance]) -> OptimizerResult<()> {
        let mut seen: HashSet<&InstanceKey> = HashSet::with_capacity(instances.len());
        let mut duplicates: Vec<String> = Vec::new();
        for instance in instances {
            if !seen.insert(&instance.key) {
                duplicates.push(instance.key.to_string());
            }
        }

        if duplicates.is_empty() {
            return Ok(());
        }

        duplicates.sort();
        duplicates.dedup();
        let count = duplicates.len();
        duplicates.truncate(DUPLICATE_EXAMPLE_LIMIT);
        Err(OptimizerError::DuplicateIdentity {
            count,
            examples: duplicates,
        })
    }
}

// ==========================================
// 偏好比较
// ==========================================

/// 偏好高者排前（Ordering::Less）
fn compare_preference(a: &RawRelayRecord, b: &RawRelayRecord) -> Ordering {
    desc_none_last(a.requested_week(), b.requested_week())
        .then_with(|| desc_none_last(a.current_week, b.current_week))
        .then_with(|| desc_f64_none_last(a.relay_change_perc, b.relay_change_perc))
        .then_with(|| desc_f64_none_last(Some(a.relay_hours), Some(b.relay_hours)))
}

fn desc_none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn desc_f64_none_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    // NaN 视为缺失
    let a = a.filter(|v| !v.is_nan());
    let b = b.filter(|v| !v.is_nan());
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
