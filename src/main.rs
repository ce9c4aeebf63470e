//! rescomp CLI - KeyValues resource compiler
//!
//! Usage: rescomp [OPTIONS] <INPUTS>...
//!
//! Compiles each input (file or directory) into a flattened KeyValues
//! document, preserving directives whose targets are missing, or watches
//! the inputs and recompiles on change.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use is_terminal::IsTerminal;

use rescomp::batch::{pair_jobs, BatchEvent, BatchJob, BatchRunner};
use rescomp::compiler::CompileOptions;
use rescomp::config::Config;
use rescomp::directive::Directive;
use rescomp::watcher::{watch, WatchEvent, WatchOptions};

/// rescomp - KeyValues resource compiler
#[derive(Parser, Debug)]
#[command(name = "rescomp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input files or directories to compile
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output paths, one per input (omit entirely to print to console)
    #[arg(short, long)]
    output: Vec<PathBuf>,

    /// Fail when a directive target is missing instead of preserving it
    #[arg(long)]
    error_on_missing: bool,

    /// Suppress console notices
    #[arg(short, long)]
    silent: bool,

    /// Drop unresolved directives from the output entirely
    #[arg(long)]
    omit_missing_directives: bool,

    /// Watch inputs and recompile on change until interrupted
    #[arg(short, long)]
    watch: bool,

    /// Extra watched paths that force full recompilation on change
    #[arg(short, long)]
    trigger: Vec<PathBuf>,

    /// Emit NDJSON events for CI
    #[arg(long)]
    json: bool,

    /// Config file (defaults to ./rescomp.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let jobs = pair_jobs(&cli.inputs, &cli.output)?;
    let options = CompileOptions {
        error_on_missing: cli.error_on_missing,
        omit_missing_directives: cli.omit_missing_directives,
    };

    if cli.watch {
        cmd_watch(jobs, cli.trigger, options, config, cli.silent, cli.json)
    } else {
        cmd_compile(&jobs, options, &config, cli.silent, cli.json)
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().or_else(|| {
        let default = PathBuf::from("rescomp.toml");
        default.exists().then_some(default)
    });

    let Some(path) = path else {
        return Ok(Config::default().with_env_overrides());
    };

    let (config, warnings) = Config::load_with_warnings(&path)?;
    if !cli.silent && !cli.json {
        for warning in warnings {
            let suggestion = warning
                .suggestion
                .map(|s| format!(" (did you mean '{s}'?)"))
                .unwrap_or_default();
            eprintln!(
                "⚠ unknown config key '{}' in {}{}",
                warning.key,
                warning.file.display(),
                suggestion
            );
        }
    }
    Ok(config.with_env_overrides())
}

fn cmd_compile(
    jobs: &[BatchJob],
    options: CompileOptions,
    config: &Config,
    silent: bool,
    json: bool,
) -> Result<()> {
    // Console-mode compiled text always goes to stdout; the decorative
    // reporting only shows on an interactive terminal.
    let fancy = !silent && !json && std::io::stdout().is_terminal();

    if fancy {
        println!("📦 rescomp");
        for job in jobs {
            match &job.output {
                Some(output) => {
                    println!("  {} -> {}", job.input.display(), output.display())
                }
                None => println!("  {} -> console", job.input.display()),
            }
        }
        println!();
    }

    let runner = BatchRunner::new(jobs, options, config);
    let summary = runner.run(&|event| report_batch_event(&event, silent, json))?;

    if json {
        let line = serde_json::json!({
            "event": "done",
            "compiled": summary.compiled,
            "copied": summary.copied,
            "skipped_locked": summary.skipped_locked,
            "missing_directives": summary.missing_directives,
        });
        println!("{line}");
    } else if fancy {
        println!(
            "\n✓ {} compiled, {} copied, {} missing directive(s) preserved",
            summary.compiled, summary.copied, summary.missing_directives
        );
        if summary.skipped_locked > 0 {
            println!("⚠ {} locked file(s) skipped", summary.skipped_locked);
        }
    }

    Ok(())
}

fn report_batch_event(event: &BatchEvent, silent: bool, json: bool) {
    if json {
        let line = match event {
            BatchEvent::Compiled {
                input,
                output,
                missing,
            } => serde_json::json!({
                "event": "compiled",
                "input": input.display().to_string(),
                "output": output.as_ref().map(|o| o.display().to_string()),
                "missing": missing
                    .iter()
                    .map(|(path, kind)| Directive::render(*kind, path))
                    .collect::<Vec<_>>(),
            }),
            BatchEvent::Copied { input, output } => serde_json::json!({
                "event": "copied",
                "input": input.display().to_string(),
                "output": output.display().to_string(),
            }),
            BatchEvent::CopySkippedLocked { path } => serde_json::json!({
                "event": "copy_skipped_locked",
                "path": path.display().to_string(),
            }),
        };
        println!("{line}");
        return;
    }

    if silent {
        return;
    }

    // Missing targets are tolerated, but never silently.
    match event {
        BatchEvent::Compiled { input, missing, .. } => {
            for (path, kind) in missing {
                eprintln!(
                    "⚠ {}: preserved {} (target missing)",
                    input.display(),
                    Directive::render(*kind, path)
                );
            }
        }
        BatchEvent::CopySkippedLocked { path } => {
            eprintln!("⚠ skipped locked file: {}", path.display());
        }
        BatchEvent::Copied { .. } => {}
    }
}

fn cmd_watch(
    jobs: Vec<BatchJob>,
    triggers: Vec<PathBuf>,
    options: CompileOptions,
    config: Config,
    silent: bool,
    json: bool,
) -> Result<()> {
    let watch_options = WatchOptions {
        jobs,
        triggers,
        compile: options,
        config,
    };

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })?;

    if !json && !silent {
        println!("👀 rescomp watch");
        println!("Press Ctrl+C to stop\n");
    }

    watch(watch_options, running, |event| {
        if json {
            println!("{}", event.to_json());
        } else if !silent {
            match event {
                WatchEvent::WatchStarted { inputs } => {
                    println!("📂 Watching: {}", inputs.join(", "));
                }
                WatchEvent::FileChanged { path } => {
                    println!("[{}] 📝 Changed: {}", timestamp(), path);
                }
                WatchEvent::TriggerFired { path } => {
                    println!("[{}] 🔔 Trigger: {} - rebuilding all inputs", timestamp(), path);
                }
                WatchEvent::MissingDirective { line } => {
                    println!("[{}] ⚠ preserved: {}", timestamp(), line);
                }
                WatchEvent::PassComplete {
                    compiled,
                    copied,
                    missing,
                } => {
                    println!(
                        "[{}] ✓ {} compiled, {} copied, {} missing",
                        timestamp(),
                        compiled,
                        copied,
                        missing
                    );
                }
                WatchEvent::Error { message } => {
                    eprintln!("✗ Error: {message}");
                }
                WatchEvent::Shutdown => {
                    println!("\n👋 Shutting down...");
                }
            }
        }
    })?;

    Ok(())
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_single_input() {
        let cli = Cli::try_parse_from(["rescomp", "hud.res"]).unwrap();
        assert_eq!(cli.inputs, vec![PathBuf::from("hud.res")]);
        assert!(cli.output.is_empty());
        assert!(!cli.watch);
    }

    #[test]
    fn test_cli_parse_requires_an_input() {
        assert!(Cli::try_parse_from(["rescomp"]).is_err());
    }

    #[test]
    fn test_cli_parse_paired_outputs() {
        let cli = Cli::try_parse_from([
            "rescomp", "a.res", "b.res", "-o", "out/a.res", "-o", "out/b.res",
        ])
        .unwrap();
        assert_eq!(cli.inputs.len(), 2);
        assert_eq!(cli.output.len(), 2);
    }

    #[test]
    fn test_cli_parse_flags() {
        let cli = Cli::try_parse_from([
            "rescomp",
            "hud",
            "--error-on-missing",
            "--omit-missing-directives",
            "--silent",
            "--json",
        ])
        .unwrap();
        assert!(cli.error_on_missing);
        assert!(cli.omit_missing_directives);
        assert!(cli.silent);
        assert!(cli.json);
    }

    #[test]
    fn test_cli_parse_watch_with_triggers() {
        let cli = Cli::try_parse_from([
            "rescomp", "hud", "-o", "dist", "--watch", "-t", "shared/colors.res", "-t", "cfg",
        ])
        .unwrap();
        assert!(cli.watch);
        assert_eq!(cli.trigger.len(), 2);
    }

    #[test]
    fn test_cli_parse_config_path() {
        let cli = Cli::try_parse_from(["rescomp", "hud", "--config", "custom.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }
}
