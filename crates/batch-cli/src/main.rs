//! Command-line interface for batch stock analysis

use anyhow::Context;
use batch_stock::{
    AnalysisType, BatchConfig, BatchError, BatchOrchestrator, BatchResult, DetailedReport,
    EmailNotifier, ReportFormat, ReportKind, ResultDir, Status, UserPosition, builtin_toolset,
    generate_reports,
};
use batch_utils::Settings;
use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Symbols analyzed when none are given on the command line
const WATCH_LIST: &[&str] = &["600519:贵州茅台", "000001:平安银行"];

#[derive(Parser, Debug)]
#[command(name = "stock-batch")]
#[command(about = "Batch stock analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Full analysis with artifacts, reports and optional email
    Run(RunArgs),
    /// Basic and technical analysis only, no reports
    Quick {
        /// Symbols as `code` or `code:name`
        #[arg(long, num_args = 1..)]
        stocks: Vec<String>,
        #[arg(long, num_args = 1.., value_parser = parse_analysis_type)]
        types: Vec<AnalysisType>,
    },
    /// Generate reports from an existing result directory
    Report {
        #[arg(long)]
        analysis_dir: PathBuf,
        #[arg(long, default_value = "markdown", value_parser = parse_format)]
        format: ReportFormat,
        #[arg(long, default_value = "individual", value_parser = parse_kind)]
        report_type: ReportKind,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Symbols as `code` or `code:name`
    #[arg(long, num_args = 1..)]
    stocks: Vec<String>,
    #[arg(long, num_args = 1.., value_parser = parse_analysis_type)]
    types: Vec<AnalysisType>,
    #[arg(long, default_value_t = 3)]
    workers: usize,
    #[arg(long)]
    no_cache: bool,
    #[arg(long)]
    force_refresh: bool,
    /// Skip LLM commentary on data payloads
    #[arg(long)]
    no_ai: bool,
    #[arg(long, default_value_t = 2)]
    max_retry: u32,
    #[arg(long, default_value = "")]
    opinion: String,
    #[arg(long, default_value = "unsure", value_parser = parse_position)]
    position: UserPosition,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long, default_value = "markdown", value_parser = parse_format)]
    format: ReportFormat,
    #[arg(long, default_value = "individual", value_parser = parse_kind)]
    report_type: ReportKind,
    #[arg(long)]
    no_reports: bool,
    /// Email the summary and generated reports
    #[arg(long)]
    email: bool,
}

fn parse_analysis_type(s: &str) -> Result<AnalysisType, String> {
    s.parse().map_err(|e: BatchError| e.to_string())
}

fn parse_position(s: &str) -> Result<UserPosition, String> {
    s.parse().map_err(|e: BatchError| e.to_string())
}

fn parse_format(s: &str) -> Result<ReportFormat, String> {
    s.parse().map_err(|e: BatchError| e.to_string())
}

fn parse_kind(s: &str) -> Result<ReportKind, String> {
    s.parse().map_err(|e: BatchError| e.to_string())
}

/// Split `code[:name]` entries into codes and a code-to-name map
fn parse_stocks(entries: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let entries: Vec<&str> = if entries.is_empty() {
        WATCH_LIST.to_vec()
    } else {
        entries.iter().map(String::as_str).collect()
    };

    let mut codes = Vec::new();
    let mut names = HashMap::new();
    for entry in entries {
        let (code, name) = match entry.split_once(':') {
            Some((code, name)) => (code.trim(), Some(name.trim())),
            None => (entry.trim(), None),
        };
        if code.is_empty() || codes.iter().any(|c| c == code) {
            continue;
        }
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            names.insert(code.to_string(), name.to_string());
        }
        codes.push(code.to_string());
    }
    (codes, names)
}

fn print_summary(batch: &BatchResult) {
    println!("\n{}", "=".repeat(50));
    println!("📊 分析结果摘要:");
    println!("✅ 成功: {} 只", batch.success_count);
    println!("❌ 失败: {} 只", batch.failed_count);
    println!("⏱️  总耗时: {:.2}秒", batch.total_duration);
    println!("📁 结果目录: {}", batch.config.output_dir.display());

    let failed: Vec<_> = batch.failed_results().filter(|r| r.status == Status::Failed).collect();
    if !failed.is_empty() {
        println!("\n❌ 失败的股票:");
        for r in failed {
            println!(
                "  - {} ({}): {}",
                r.symbol,
                r.name,
                r.error_message.as_deref().unwrap_or_default()
            );
        }
    }

    let analyzed: Vec<_> = batch
        .results
        .iter()
        .filter(|r| r.status != Status::Failed)
        .collect();
    if !analyzed.is_empty() {
        println!("\n✅ 成功分析的股票:");
        for r in analyzed {
            println!(
                "  - {} ({}): 价格 {:.2}, 涨跌 {:+.2}%, 行业 {}",
                r.symbol, r.name, r.summary.current_price, r.summary.change_percent, r.summary.industry
            );
        }
    }
}

fn write_reports(report: &DetailedReport, dir: &Path, format: ReportFormat, kind: ReportKind) -> Vec<PathBuf> {
    println!("\n📄 开始生成 {format} 格式报告...");
    match generate_reports(report, format, kind, dir) {
        Ok(paths) => {
            println!("✅ 报告生成成功: {} 个文件", paths.len());
            paths
        }
        Err(e) => {
            println!("❌ 报告生成失败: {e}");
            Vec::new()
        }
    }
}

async fn run(args: RunArgs, settings: Settings) -> anyhow::Result<()> {
    let (symbols, names) = parse_stocks(&args.stocks);
    let tools = builtin_toolset(&settings, names)?;

    let mut builder = BatchConfig::builder()
        .symbols(symbols)
        .worker_count(args.workers)
        .use_cache(!args.no_cache)
        .force_refresh(args.force_refresh)
        .include_ai_analysis(!args.no_ai)
        .max_retry(args.max_retry)
        .user_opinion(args.opinion)
        .user_position(args.position);
    if !args.types.is_empty() {
        builder = builder.analysis_types(args.types);
    }
    if let Some(dir) = args.output_dir {
        builder = builder.output_dir(dir);
    }
    let config = builder.build()?;

    println!("\n🚀 批量分析开始");
    println!("📊 股票数量: {}", config.symbols.len());
    println!(
        "🔍 分析类型: {}",
        config.analysis_types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    );
    println!("🔧 并发数: {}", config.worker_count);

    let batch = BatchOrchestrator::new(tools).run(config).await?;
    print_summary(&batch);

    let report = DetailedReport::from(&batch);
    let analyzed = batch.results.iter().any(|r| r.status != Status::Failed);
    let report_files = if !args.no_reports && analyzed {
        write_reports(&report, &batch.config.output_dir, args.format, args.report_type)
    } else {
        Vec::new()
    };

    if args.email {
        match EmailNotifier::from_settings(&settings) {
            Ok(Some(notifier)) => {
                println!("\n📧 开始发送邮件...");
                match notifier.send_report(&report, &report_files).await {
                    Ok(()) => println!("✅ 邮件发送成功"),
                    Err(e) => println!("❌ 邮件发送失败: {e}"),
                }
            }
            Ok(None) => println!("ℹ️  邮件功能未配置，跳过邮件发送"),
            Err(e) => warn!("Email notifier unavailable: {e}"),
        }
    }
    Ok(())
}

async fn quick(stocks: Vec<String>, types: Vec<AnalysisType>, settings: Settings) -> anyhow::Result<()> {
    let (symbols, names) = parse_stocks(&stocks);
    let types = if types.is_empty() {
        vec![AnalysisType::Basic, AnalysisType::Technical]
    } else {
        types
    };
    println!("\n⚡ 快速分析模式");
    println!("📊 股票: {}", symbols.join(", "));

    let config = BatchConfig::builder()
        .symbols(symbols)
        .analysis_types(types)
        .build()?;
    let batch = BatchOrchestrator::new(builtin_toolset(&settings, names)?)
        .run(config)
        .await?;

    print_summary(&batch);
    println!("\n✅ 快速分析完成: 成功 {}, 失败 {}", batch.success_count, batch.failed_count);
    Ok(())
}

fn report(analysis_dir: &Path, format: ReportFormat, kind: ReportKind) -> anyhow::Result<()> {
    println!("\n📄 从现有分析结果生成报告");
    println!("📁 分析目录: {}", analysis_dir.display());

    let loaded = ResultDir::load(analysis_dir)
        .with_context(|| format!("failed to load results from {}", analysis_dir.display()))?;
    let paths = generate_reports(&loaded.report, format, kind, analysis_dir)?;
    for path in &paths {
        println!("  - {}", path.display());
    }
    println!("✅ 报告生成成功: {} 个文件", paths.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    batch_utils::init_tracing();

    let cli = Cli::parse();
    info!("Starting stock-batch");

    match cli.command {
        Commands::Run(args) => run(args, Settings::from_env()?).await,
        Commands::Quick { stocks, types } => quick(stocks, types, Settings::from_env()?).await,
        Commands::Report {
            analysis_dir,
            format,
            report_type,
        } => report(&analysis_dir, format, report_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stocks_with_names() {
        let (codes, names) = parse_stocks(&[
            "600519:贵州茅台".to_string(),
            "000001".to_string(),
            "600519".to_string(),
        ]);
        assert_eq!(codes, vec!["600519", "000001"]);
        assert_eq!(names.get("600519").map(String::as_str), Some("贵州茅台"));
        assert!(!names.contains_key("000001"));
    }

    #[test]
    fn test_parse_stocks_defaults_to_watch_list() {
        let (codes, names) = parse_stocks(&[]);
        assert_eq!(codes, vec!["600519", "000001"]);
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "stock-batch",
            "run",
            "--stocks",
            "600519:贵州茅台",
            "000001",
            "--types",
            "basic",
            "technical",
            "--workers",
            "5",
            "--no-ai",
            "--position",
            "holding",
            "--format",
            "html",
            "--report-type",
            "both",
            "--email",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.stocks.len(), 2);
        assert_eq!(args.types, vec![AnalysisType::Basic, AnalysisType::Technical]);
        assert_eq!(args.workers, 5);
        assert!(args.no_ai);
        assert!(!args.no_cache);
        assert_eq!(args.position, UserPosition::Holding);
        assert_eq!(args.format, ReportFormat::Html);
        assert_eq!(args.report_type, ReportKind::Both);
        assert!(args.email);
    }

    #[test]
    fn test_invalid_type_is_rejected() {
        assert!(Cli::try_parse_from(["stock-batch", "quick", "--types", "fundamental"]).is_err());
        assert!(Cli::try_parse_from(["stock-batch", "report"]).is_err());
    }
}
