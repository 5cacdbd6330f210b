// ==========================================
// Relay 调期排程 - 优化结果缓存
// ==========================================
// 调用方持有的显式缓存对象（非全局状态）
// 键: SHA-256(配置 + 今天 + 输入记录) 的 base64 编码
// 过期: 注入时钟 + TTL；降级结果不入缓存
// ==========================================

use crate::config::OptimizerConfig;
use crate::domain::relay::RawRelayRecord;
use crate::domain::schedule::OptimizationOutcome;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

/// 默认 TTL（分钟）
pub const DEFAULT_CACHE_TTL_MINUTES: i64 = 60;

// ==========================================
// Trait: Clock
// ==========================================
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    config: &'a OptimizerConfig,
    today: NaiveDate,
    records: &'a [RawRelayRecord],
}

/// 输入指纹
pub fn fingerprint(
    config: &OptimizerConfig,
    today: NaiveDate,
    records: &[RawRelayRecord],
) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_vec(&FingerprintInput {
        config,
        today,
        records,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&payload);
    Ok(STANDARD_NO_PAD.encode(hasher.finalize()))
}

#[derive(Debug, Clone)]
struct CacheEntry {
    outcome: OptimizationOutcome,
    stored_at: DateTime<Utc>,
}

// ==========================================
// OptimizationCache - 结果缓存
// ==========================================
pub struct OptimizationCache<C: Clock = SystemClock> {
    clock: C,
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl OptimizationCache<SystemClock> {
    /// 系统时钟 + 默认 TTL
    pub fn with_default_ttl() -> Self {
        Self::new(SystemClock, Duration::minutes(DEFAULT_CACHE_TTL_MINUTES))
    }
}

impl<C: Clock> OptimizationCache<C> {
    pub fn new(clock: C, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            entries: HashMap::new(),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.stored_at < self.ttl
    }

    /// 读取未过期的缓存结果
    pub fn get(&self, key: &str) -> Option<&OptimizationOutcome> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| &entry.outcome)
    }

    /// 写入结果（降级结果忽略）
    ///
    /// # 返回
    /// 是否写入
    pub fn put(&mut self, key: String, outcome: OptimizationOutcome) -> bool {
        if outcome.status.is_fallback() {
            debug!(status = %outcome.status, "降级结果不写入缓存");
            return false;
        }
        let stored_at = self.clock.now();
        self.entries.insert(key, CacheEntry { outcome, stored_at });
        true
    }

    /// 清理过期条目
    ///
    /// # 返回
    /// 清理数量
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.stored_at < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
