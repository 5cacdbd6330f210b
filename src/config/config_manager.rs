// ==========================================
// Relay 调期排程 - 配置管理器
// ==========================================
// 职责: 优化器参数加载、覆写、快照
// 存储: config_kv 表 (key-value + scope)，缺省项取 OptimizerConfig::default()
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::optimizer_config::{config_keys, OptimizerConfig};
use crate::db::{configure_sqlite_connection, ensure_config_schema, open_sqlite_connection};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// 全局作用域
const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_config_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 与建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ConfigError::LockPoisoned(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            ensure_config_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    fn lock(&self) -> ConfigResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::LockPoisoned(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        debug!(key, value, "配置已写入");
        Ok(())
    }

    /// 加载优化器配置
    ///
    /// # 逻辑
    /// 1. 以 OptimizerConfig::default() 为基线
    /// 2. config_kv 中存在的键逐项覆写（格式错误直接报错，不静默回退）
    /// 3. 整体校验
    pub fn load_optimizer_config(&self) -> ConfigResult<OptimizerConfig> {
        use config_keys::*;

        let mut config = OptimizerConfig::default();
        let mut overridden = 0usize;

        macro_rules! override_field {
            ($key:expr, $field:ident) => {
                if let Some(raw) = self.get_config_value($key)? {
                    config.$field = parse_value($key, &raw)?;
                    overridden += 1;
                }
            };
        }

        override_field!(FUTURE_BUFFER_WEEKS, future_buffer_weeks);
        override_field!(LOOKBACK_HORIZON_DAYS, lookback_horizon_days);
        override_field!(WEEK_ENDING_WEEKDAY, week_ending_weekday);
        override_field!(TOTAL_HOURS_THRESHOLD, total_hours_threshold);
        override_field!(HOLIDAY_TOTAL_HOURS_THRESHOLD, holiday_total_hours_threshold);
        override_field!(SUBPOOL_AVG_HOURS_THRESHOLD, subpool_avg_hours_threshold);
        override_field!(
            HOLIDAY_SUBPOOL_AVG_HOURS_THRESHOLD,
            holiday_subpool_avg_hours_threshold
        );
        override_field!(MAX_SUBPOOL_STORES_PER_WEEK, max_subpool_stores_per_week);
        override_field!(MOVE_COST_PER_INSTANCE, move_cost_per_instance);
        override_field!(TOTAL_OVERAGE_PENALTY_WEIGHT, total_overage_penalty_weight);
        override_field!(SUBPOOL_OVERAGE_PENALTY_WEIGHT, subpool_overage_penalty_weight);
        override_field!(IMMOVABLE_MODE, immovable_mode);
        override_field!(IMMOVABLE_MOVE_COST, immovable_move_cost);
        override_field!(SOLVER_TIME_LIMIT_SECONDS, solver_time_limit_seconds);
        override_field!(ADJACENCY_GROUP_CAP, adjacency_group_cap);

        // 子池门店类型为 JSON 数组
        if let Some(raw) = self.get_config_value(SUBPOOL_STORE_TYPES)? {
            config.subpool_store_types =
                serde_json::from_str(&raw).map_err(|e| ConfigError::ValueFormat {
                    key: SUBPOOL_STORE_TYPES.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                })?;
            overridden += 1;
        }

        config.validate()?;
        info!(overridden, "优化器配置加载完成");
        Ok(config)
    }

    /// 获取所有 global 配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 优化运行时记录配置快照，保证结果可复现
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 覆盖现有 global 配置；`__meta_` 前缀的元信息不回写
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            if key.starts_with("__meta_") {
                continue;
            }
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
                params![GLOBAL_SCOPE, key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

/// 解析单个配置值
fn parse_value<T>(key: &str, raw: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: Debug,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::ValueFormat {
        key: key.to_string(),
        value: raw.to_string(),
        message: format!("{:?}", e),
    })
}
