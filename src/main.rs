//! rstechscan CLI：扫描URL并输出检测结果
//! 进度事件按行输出JSON，最终结果为格式化JSON数组

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use rstechscan::{
    ConfigManager, HttpPageBackend, ProgressCallback, ProgressEvent, ScanOrchestrator,
};

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "rstechscan", version, about = "网页技术栈指纹识别")]
struct Cli {
    /// 目标URL（可多个）
    urls: Vec<String>,

    /// 页面导航超时（毫秒）
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// 仅包含指定分类（可重复）
    #[arg(long = "category")]
    categories: Vec<String>,

    /// 排除指定分类（可重复）
    #[arg(long = "exclude-category")]
    exclude_categories: Vec<String>,

    /// 自定义合并指纹文件（本地路径或http(s) URL）
    #[arg(long)]
    fingerprints_file: Option<String>,

    /// 自定义指纹目录（每技术一个同名子目录）
    #[arg(long)]
    fingerprints_dir: Option<PathBuf>,

    /// 关闭无头模式（仅对浏览器后端生效）
    #[arg(long)]
    no_headless: bool,

    /// 仅输出命中的技术
    #[arg(long)]
    detected_only: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.urls.is_empty() {
        eprintln!("用法：rstechscan <url>... （详见 --help）");
        process::exit(1);
    }

    if let Err(e) = run(cli).await {
        eprintln!("扫描失败：{:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut builder = ConfigManager::custom()
        .timeout_ms(cli.timeout_ms)
        .headless(!cli.no_headless);
    if !cli.categories.is_empty() {
        builder = builder.categories(cli.categories.clone());
    }
    if !cli.exclude_categories.is_empty() {
        builder = builder.exclude_categories(cli.exclude_categories.clone());
    }
    if let Some(file) = &cli.fingerprints_file {
        builder = builder.custom_fingerprints_file(file.clone());
    }
    if let Some(dir) = &cli.fingerprints_dir {
        builder = builder.custom_fingerprints_dir(dir.clone());
    }
    let options = builder.build();

    // 进度事件按行输出JSON（NDJSON）
    let progress: ProgressCallback = Arc::new(|event: &ProgressEvent| {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{}", line);
        }
    });

    let orchestrator =
        ScanOrchestrator::new(Arc::new(HttpPageBackend::new())).with_progress(progress);

    let results = orchestrator.scan_batch(&cli.urls, &options).await?;
    for mut outcomes in results {
        outcomes.sort_by(|a, b| a.name.cmp(&b.name));
        if cli.detected_only {
            outcomes.retain(|outcome| outcome.detected);
        }
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    }
    Ok(())
}
