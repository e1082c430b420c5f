use anyhow::{Context, Result};
use briefcast::audio::assembler::{TrackAssembler, episode_path};
use briefcast::cli::{Cli, Commands, ConfigAction};
use briefcast::config::Config;
use briefcast::diagnostics::check_dependencies;
use briefcast::error::BriefcastError;
use briefcast::publish::{EpisodeStore, FeedBuilder};
use briefcast::runner::{Runner, build_publisher, parse_time_of_day, run_daily};
use briefcast::script::segment;
use briefcast::tts::{RetryPolicy, SegmentSynthesizer, build_synthesizer};
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::io::Read;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Run { dry_run } => {
            let config = load_config(cli.config.as_deref())?;
            let runner = Runner::from_config(&config, dry_run).map_err(staged)?;
            let report = runner.run_once().await.map_err(staged)?;
            if !cli.quiet {
                println!("{} {}", "Published:".green(), report.title);
                println!("  {}  {}", "Episode:".dimmed(), report.episode.display());
                if let Some(script) = &report.script {
                    println!("  {}   {}", "Script:".dimmed(), script.display());
                }
                println!(
                    "  {} {} segments, {:.1}s",
                    "Duration:".dimmed(),
                    report.segments,
                    report.duration.as_secs_f32()
                );
            }
        }
        Commands::Schedule { at, dry_run } => {
            let config = load_config(cli.config.as_deref())?;
            let at = parse_time_of_day(&at).map_err(staged)?;
            run_daily(&config, at, dry_run).await.map_err(staged)?;
        }
        Commands::Publish {
            audio,
            title,
            description,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let store = EpisodeStore::new(&config.store.dir);
            let _lock = store.lock().map_err(staged)?;
            let publisher = build_publisher(&config, store.clone()).map_err(staged)?;
            let stored = publisher
                .publish(&audio, &title, &description)
                .await
                .map_err(staged)?;
            if !cli.quiet {
                println!("{} {}", "Published:".green(), stored.display());
            }
        }
        Commands::Feed => {
            let config = load_config(cli.config.as_deref())?;
            let path = FeedBuilder::from_config(&config).build().map_err(staged)?;
            if !cli.quiet {
                println!("{} {}", "Feed written:".green(), path.display());
            }
        }
        Commands::Segment { script } => {
            let text = read_script(&script)?;
            let segments = segment(&text).map_err(staged)?;
            for s in &segments {
                println!("{} {}", format!("[{:>3}]", s.index).dimmed(), s.text);
            }
        }
        Commands::Synthesize { script, output } => {
            let config = load_config(cli.config.as_deref())?;
            let text = read_script(&script)?;
            synthesize_to_file(&config, &text, output.as_deref(), cli.quiet).await?;
        }
        Commands::Check => {
            let config = load_config(cli.config.as_deref())?;
            if !check_dependencies(&config) {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(cli.config.as_deref())?;
                print!("{}", config.to_redacted_toml()?);
            }
            ConfigAction::Path => {
                let path = cli.config.clone().unwrap_or_else(Config::default_path);
                println!("{}", path.display());
            }
        },
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "briefcast",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over `-q`/`-v`.
fn init_tracing(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,briefcast={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .init();
}

fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        // Load from custom path
        Config::load(path).map_err(staged)?
    } else {
        // Try default path, fall back to defaults
        Config::load_or_default(&Config::default_path()).map_err(staged)?
    };

    // Apply environment variable overrides
    Ok(config.with_env_overrides())
}

/// Tag a library error with the pipeline stage it came from.
fn staged(e: BriefcastError) -> anyhow::Error {
    let stage = e.stage();
    anyhow::Error::new(e).context(format!("{} stage failed", stage))
}

fn read_script(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read script from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))
    }
}

/// Segment, speak and assemble `text` into `output` (or a generated path in
/// the store). Nothing is published.
async fn synthesize_to_file(
    config: &Config,
    text: &str,
    output: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let segments = segment(text).map_err(staged)?;
    let synthesizer = SegmentSynthesizer::new(build_synthesizer(config.tts.engine).map_err(staged)?)
        .with_policy(RetryPolicy {
            max_attempts: config.tts.max_attempts,
            backoff: config.tts.retry_backoff(),
        })
        .with_max_concurrent(config.tts.max_concurrent);

    let clips = synthesizer
        .synthesize_all(&segments, &config.tts.language)
        .await
        .map_err(staged)?;
    let track = TrackAssembler::new(config.tts.silence_ms)
        .assemble(clips)
        .map_err(staged)?;

    let path = match output {
        Some(p) => p.to_path_buf(),
        None => episode_path(&config.store.dir, chrono::Utc::now()).map_err(staged)?,
    };
    let (encoder, bitrate) = (config.tts.encoder, config.tts.bitrate_kbps);
    let export_path = path.clone();
    let duration = track.duration();
    tokio::task::spawn_blocking(move || track.export(&export_path, encoder, bitrate))
        .await
        .context("Export task panicked")?
        .map_err(staged)?;

    if !quiet {
        println!(
            "{} {} ({} segments, {:.1}s)",
            "Wrote".green(),
            path.display(),
            segments.len(),
            duration.as_secs_f32()
        );
    }
    Ok(())
}
