use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use podium_core::{
    AnalysisRequest, Config, Engine, PerformanceSummary, Provider, Stage, StageEvent, StageStatus,
    format_report_readable, format_score, init_tracing,
};
use tokio::sync::mpsc;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, ValueEnum)]
enum CliProvider {
    Gemini,
    Openai,
    Grok,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Gemini => Provider::Gemini,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Grok => Provider::Grok,
        }
    }
}

#[derive(Parser)]
#[command(name = "podium")]
#[command(
    about = "Score the delivery of a recorded lecture: body language, voice, content flow and interaction"
)]
struct Cli {
    /// Video file (mp4, avi, mov, mkv)
    video: PathBuf,

    /// Subject of the lecture, used to judge completeness
    #[arg(short, long)]
    topic: Option<String>,

    /// Spoken language (e.g., "en", "tr")
    #[arg(short, long)]
    lang: Option<String>,

    /// AI provider for content judgement and suggestions
    #[arg(short, long)]
    provider: Option<CliProvider>,

    /// Skip the AI provider and use local heuristics only
    #[arg(long)]
    offline: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the JSON result to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the JSON result instead of the readable report
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(lang) = &self.lang {
            config.audio.language = lang.clone();
            config.content.language = lang.clone();
        }
        if let Some(provider) = &self.provider {
            config.content.provider = Some(provider.clone().into());
        }
        if self.offline {
            config.content.offline = true;
        }
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::ExtractingVision => "Body language",
        Stage::ExtractingAudio => "Voice",
        Stage::ExtractingContent => "Content",
        Stage::Fusing => "Scoring",
        Stage::Idle | Stage::Done => "Analysis",
    }
}

/// One spinner per stage, finished when the stage completes or degrades.
async fn render_progress(mut events: mpsc::UnboundedReceiver<StageEvent>) {
    let mut spinners: HashMap<Stage, (ProgressBar, Instant)> = HashMap::new();

    while let Some(event) = events.recv().await {
        let label = stage_label(event.stage);
        match event.status {
            StageStatus::Started => {
                let spinner = create_spinner(&format!("{label}..."));
                spinners.insert(event.stage, (spinner, Instant::now()));
            }
            StageStatus::Completed => {
                if let Some((spinner, started)) = spinners.remove(&event.stage) {
                    spinner.finish_with_message(format!(
                        "{} {} {}",
                        style("✓").green().bold(),
                        label,
                        style(format!("[{}]", format_duration(started.elapsed()))).dim()
                    ));
                }
            }
            StageStatus::Degraded { reason } => {
                let message = format!(
                    "{} {} {}",
                    style("!").yellow().bold(),
                    label,
                    style(format!("(neutral defaults: {reason})")).dim()
                );
                match spinners.remove(&event.stage) {
                    Some((spinner, _)) => spinner.finish_with_message(message),
                    None => eprintln!("{message}"),
                }
            }
        }
    }

    for (spinner, _) in spinners.into_values() {
        spinner.finish_and_clear();
    }
}

extern "C" fn whisper_log_callback(
    _level: u32,
    _message: *const std::ffi::c_char,
    _user_data: *mut std::ffi::c_void,
) {
    // silent
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("warn");
    let cli = Cli::parse();

    unsafe {
        whisper_rs::set_log_callback(Some(whisper_log_callback), std::ptr::null_mut());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    if !cli.json {
        eprintln!(
            "\n{}  {}\n",
            style("podium").cyan().bold(),
            style("Lecture Delivery Analyzer").dim()
        );
    }

    let spinner = create_spinner("Loading models...");
    let engine = Engine::from_config(&config).await?;
    spinner.finish_with_message(format!("{} Models ready", style("✓").green().bold()));
    eprintln!("{}", style("─".repeat(60)).dim());

    let mut request = AnalysisRequest::new(&cli.video);
    if let Some(topic) = &cli.topic {
        request = request.with_topic(topic.clone());
    }

    let total_start = Instant::now();
    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(render_progress(rx));

    let outcome = engine.analyze_with_events(&request, Some(tx)).await;
    let _ = progress.await;

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    let summary = PerformanceSummary::from_result(&result);
    eprintln!(
        "\n{} {} / 100 ({})  {} {}\n",
        style("Total:").dim(),
        style(format_score(result.total_score)).cyan().bold(),
        summary.level.label(),
        style("in").dim(),
        style(format_duration(total_start.elapsed())).cyan()
    );

    let json = result.to_json_pretty()?;
    if let Some(output) = &cli.output {
        tokio::fs::write(output, &json)
            .await
            .with_context(|| format!("failed to write {}", output.display()))?;
        eprintln!(
            "{} {}\n",
            style("Saved:").dim(),
            style(output.display()).cyan()
        );
    }

    if cli.json {
        println!("{}", json);
    } else {
        println!("{}", style("─".repeat(60)).dim());
        println!("{}", format_report_readable(&result));
    }

    engine.shutdown();
    Ok(())
}
