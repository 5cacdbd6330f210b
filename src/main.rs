// ==========================================
// Relay 调期排程 - 命令行入口
// ==========================================
// 用法:
//   relay-balancer <input.csv|xlsx> <output.csv> [config.db] [today=YYYY-MM-DD]
//
// 流程: 导入 → 优化（失败降级恒等方案）→ 导出 CSV → 打印移动报表
// ==========================================

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use modular_balancing::config::{ConfigManager, OptimizerConfig};
use modular_balancing::engine::{MoveReportEngine, RelayOptimizer};
use modular_balancing::importer::{import_relay_file, write_assignments_csv};
use modular_balancing::logging;
use std::path::PathBuf;

fn main() -> Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let (input, output) = match (args.next(), args.next()) {
        (Some(input), Some(output)) => (PathBuf::from(input), PathBuf::from(output)),
        _ => bail!("用法: relay-balancer <input> <output.csv> [config.db] [today=YYYY-MM-DD]"),
    };
    let db_path = args.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let today = match args.next() {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("无法解析业务日期: {}", s))?,
        None => chrono::Local::now().date_naive(),
    };

    tracing::info!("==================================================");
    tracing::info!("{} v{}", modular_balancing::APP_NAME, modular_balancing::VERSION);
    tracing::info!("==================================================");

    // ===== 配置 =====
    let config = match &db_path {
        Some(path) => {
            tracing::info!("使用配置数据库: {}", path);
            ConfigManager::new(path)
                .and_then(|manager| manager.load_optimizer_config())
                .context("加载优化器配置失败")?
        }
        None => OptimizerConfig::default(),
    };

    // ===== 导入 =====
    let report = import_relay_file(&input)
        .with_context(|| format!("导入失败: {}", input.display()))?;
    for rejection in &report.rejected {
        tracing::warn!(row = rejection.row_number, reason = %rejection.reason, "行被拒绝");
    }

    // ===== 优化 =====
    let optimizer = RelayOptimizer::with_highs(config)?;
    let resolver = optimizer.threshold_resolver(&report.records);
    let outcome = optimizer.optimize(report.records, today)?;

    // ===== 导出 =====
    let written = write_assignments_csv(&output, &outcome.assignments)
        .with_context(|| format!("导出失败: {}", output.display()))?;

    let summary = MoveReportEngine::new(optimizer.config(), &resolver).generate(&outcome.assignments);
    println!("状态: {}", outcome.status);
    println!("已写入 {} 行 → {}", written, output.display());
    println!("{}", summary);

    Ok(())
}
