//! `ashare`: interactive A-share analysis
//!
//! Asks for a stock code, lets the analyst agent write a report from live
//! market data, and saves it under `reports/` as PDF (when a PDF engine is
//! installed), HTML and Markdown.
//!
//! # Usage
//!
//! ```bash
//! # Optional: otherwise the key is asked for and saved to config/.env
//! export OPENROUTER_API_KEY="sk-or-..."
//!
//! cargo run --bin ashare
//! ```

mod events;
mod prompt;

use anyhow::{Context as _, Result, anyhow};
use ashare_analyst::config::{DEFAULT_ENV_PATH, DEFAULT_SETTINGS_PATH};
use ashare_analyst::{
    AnalystAgent, EastmoneyClient, MarketData, RenderOutcome, ReportRenderer, RetryingFallback,
    Settings, YahooClient, save_markdown_only,
};
use ashare_llm::LLMProvider;
use ashare_llm::providers::{OpenRouterConfig, OpenRouterProvider};
use ashare_utils::EnvFile;
use clap::Parser;
use events::ConsoleEvents;
use prompt::Prompter;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

const RULE_WIDTH: usize = 60;

#[derive(Parser, Debug)]
#[command(name = "ashare", version)]
#[command(about = "A股金融分析智能体：获取股票数据 -> AI分析 -> 生成PDF报告", long_about = None)]
struct Args {}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    ashare_utils::init_tracing("warn,ashare_cli=info,ashare_analyst=info");
    let _args = Args::parse();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("\n程序运行时发生错误: {e:#}");
            println!("请检查网络连接或配置是否正确。");
            ExitCode::FAILURE
        }
    }
}

fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

async fn run() -> Result<()> {
    let settings_path = Path::new(DEFAULT_SETTINGS_PATH);
    let mut settings = Settings::load(settings_path).context("加载配置文件失败")?;
    let mut env_file = EnvFile::load(DEFAULT_ENV_PATH)?;
    settings.apply_env_overrides(|key| env_file.get(key));
    settings.validate()?;

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    if settings.api_key().is_err() {
        let key = ask_and_save_api_key(&mut prompter, &mut env_file, &settings.model.api_key_env)?;
        settings.set_api_key(key);
    }
    info!("配置已加载\n{}", settings.summary(settings_path));

    let agent = build_agent(&settings)?;
    let renderer = ReportRenderer::new(&settings.report.output_dir);
    info!(engines = ?renderer.engine_names(), "PDF engines");

    println!("\n{}", rule('='));
    println!("A股金融分析智能体");
    println!("{}", rule('='));
    println!("功能: 获取股票数据 -> AI分析 -> 生成PDF报告");
    println!("{}", rule('='));

    loop {
        let Some(code) = prompter.ask_stock_code()? else {
            break;
        };
        analyse(&agent, &renderer, &code).await?;

        if prompter.ask_continue()? != Some(true) {
            break;
        }
    }

    println!("\n感谢使用 A股金融分析智能体！");
    println!("再见！");
    Ok(())
}

fn ask_and_save_api_key<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    env_file: &mut EnvFile,
    env_var: &str,
) -> Result<String> {
    prompter.say(&rule('='))?;
    prompter.say("欢迎使用 A股金融分析智能体")?;
    prompter.say(&rule('='))?;
    prompter.say("\n检测到未配置 OpenRouter API 密钥。")?;
    prompter.say("请前往 https://openrouter.ai/ 注册账号并获取API密钥。")?;

    let key = prompter
        .ask_api_key()?
        .ok_or_else(|| anyhow!("未输入API密钥，已取消"))?;
    env_file
        .upsert(env_var, &key)
        .context("保存API密钥失败")?;
    prompter.say(&format!("API密钥已保存到 {}", env_file.path().display()))?;
    Ok(key)
}

fn build_agent(settings: &Settings) -> Result<AnalystAgent> {
    if settings.model.provider != "openrouter" {
        warn!(
            provider = %settings.model.provider,
            "Unknown provider, treating base_url as an OpenAI-compatible endpoint"
        );
    }
    let config = OpenRouterConfig::new(settings.api_key()?).with_api_base(&settings.model.base_url);
    let provider: Arc<dyn LLMProvider> = Arc::new(OpenRouterProvider::with_config(config)?);

    let timeout = settings.primary_timeout();
    let primary = EastmoneyClient::new(timeout)?;
    let yahoo = YahooClient::new(timeout, settings.yfinance.proxy.active_url())?;
    let fallback = RetryingFallback::new(Arc::new(yahoo), settings.retry_policy());
    let market = Arc::new(MarketData::new(Arc::new(primary), fallback));

    Ok(AnalystAgent::new(settings, provider, &market).with_event_handler(Arc::new(ConsoleEvents)))
}

async fn analyse(agent: &AnalystAgent, renderer: &ReportRenderer, code: &str) -> Result<()> {
    println!("\n开始分析股票 {code}...");
    println!("正在获取数据并进行分析...");
    println!("{}", rule('-'));

    let report = agent
        .analyze(code)
        .await
        .with_context(|| format!("股票 {code} 分析失败"))?;

    println!("{}", rule('-'));
    println!("分析完成！正在生成报告...");

    let saved = match renderer.render(&report, code).await {
        Ok(outcome) => print_outcome(&outcome).await,
        Err(e) => {
            println!("生成报告时出错: {e}");
            println!("正在保存Markdown版本...");
            let path = save_markdown_only(renderer.output_dir(), code, &report).await?;
            println!("Markdown报告已保存到: {}", path.display());
            path
        }
    };

    println!("\n{}", rule('='));
    println!("分析完成！报告已保存到: {}", saved.display());
    println!("{}", rule('='));
    Ok(())
}

/// Print what was written; returns the main output file
async fn print_outcome(outcome: &RenderOutcome) -> PathBuf {
    if let (Some(pdf), Some(engine)) = (outcome.pdf(), outcome.engine.as_deref()) {
        println!("✓ PDF报告已生成: {} (引擎: {engine})", pdf.display());
        if let Ok(meta) = tokio::fs::metadata(pdf).await {
            let kb = meta.len() as f64 / 1024.0;
            println!("  文件大小: {kb:.1} KB");
        }
        return pdf.to_path_buf();
    }

    println!("✓ HTML报告已生成: {}", outcome.paths.html.display());
    println!("  注：由于PDF引擎不可用，已生成HTML格式报告");
    for attempt in &outcome.attempts {
        if let Some(error) = &attempt.error {
            println!("  - {}: {error}", attempt.engine);
        }
    }
    println!("  您可以打开此HTML文件，按Ctrl+P选择'保存为PDF'");
    println!("  原始Markdown文件: {}", outcome.paths.markdown.display());
    outcome.paths.html.clone()
}
