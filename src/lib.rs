//! battyd - analysis server and batch runner for `BattyBirdNET` classifiers.
//!
//! The crate orchestrates analysis runs: it resolves region presets into run
//! configurations, fans files out to a classifier, pools the per-segment
//! predictions and serves the whole pipeline over HTTP.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod inference;
pub mod output;
pub mod pipeline;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

use clap::Parser;
use cli::{AnalyzeArgs, Cli, Command, ConfigAction, ServeArgs};
use config::{
    Config, ConfigResolver, Location, Profile, RunConfiguration, RunMode, config_file_path,
    load_config, save_config,
};
use inference::ExternalAnalyzer;
use output::{
    FileReport, ResultWriter, create_batch_progress, finish_progress, pool, update_progress,
};
use pipeline::{AnalysisResult, BatchOrchestrator, BatchResults, collect_input_files};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for the battyd CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let config = load_config(cli.config.as_deref())?;

    handle_command(cli.command, &config, cli.config.as_deref(), cli.quiet)
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info,tower_http=warn",
            1 => "debug,hyper=info",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn handle_command(
    command: Command,
    config: &Config,
    config_path: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    match command {
        Command::Serve(args) => serve(args, config),
        Command::Analyze(args) => analyze(&args, config, quiet),
        Command::Regions { server } => {
            list_regions(if server {
                Profile::Server
            } else {
                Profile::Desktop
            });
            Ok(())
        }
        Command::Config { action } => handle_config_command(action, config, config_path),
    }
}

fn serve(args: ServeArgs, config: &Config) -> Result<()> {
    let mut settings = config.server.clone();
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(spath) = args.spath {
        settings.storage_path = spath;
    }
    if let Some(threads) = args.threads {
        settings.threads = threads;
    }
    if let Some(locale) = args.locale {
        settings.locale = locale;
    }
    if let Some(area) = args.area {
        settings.area = area;
    }
    settings.no_noise |= args.no_noise;

    server::run(&settings, config)
}

/// Analyze a file or directory and print the results in path order.
fn analyze(args: &AnalyzeArgs, config: &Config, quiet: bool) -> Result<()> {
    let threads = args.threads.unwrap_or(config.defaults.threads);
    let mode = if args.input.is_dir() {
        RunMode::Directory { threads }
    } else {
        RunMode::SingleFile { threads }
    };

    let files = collect_input_files(std::slice::from_ref(&args.input))?;
    if files.is_empty() {
        return Err(Error::NoInputFiles);
    }
    info!("Found {} audio file(s) to analyze", files.len());

    let effective = apply_analyze_overrides(args, config);
    let selection = args
        .region
        .clone()
        .or_else(|| effective.defaults.region.clone())
        .unwrap_or_default();
    let locale = args
        .locale
        .clone()
        .unwrap_or_else(|| effective.defaults.locale.clone());

    let resolver = ConfigResolver::new(Profile::Desktop, &effective).high_accuracy(args.no_noise);
    let mut run_config = resolver.resolve(&selection, &locale, mode)?;
    if let (Some(latitude), Some(longitude)) = (args.lat, args.lon) {
        run_config.location = Some(Location {
            latitude,
            longitude,
        });
    }
    run_config.week = args.week;
    if let Some(overlap) = args.overlap {
        // An explicit overlap beats the preset's default.
        run_config.overlap = overlap;
    }

    let analyzer = Arc::new(ExternalAnalyzer::from_config(&config.analyzer));
    run_config.narrow_species(analyzer.as_ref())?;
    let run_config = Arc::new(run_config);

    let pb = create_batch_progress(files.len(), !quiet && !args.no_progress);
    let mut on_progress = |done: usize, total: usize| update_progress(pb.as_ref(), done, total);
    let results = BatchOrchestrator::new(analyzer).run(
        files,
        Arc::clone(&run_config),
        Some(&mut on_progress),
    )?;
    finish_progress(pb, "done");

    print_results(&results, &run_config, args)?;

    if matches!(mode, RunMode::SingleFile { .. })
        && let Some((path, AnalysisResult::Failure(reason))) = results.iter().next()
    {
        return Err(Error::Analysis {
            path: path.to_path_buf(),
            reason: reason.clone(),
        });
    }
    if results.failure_count() > 0 {
        warn!(
            "{} of {} files could not be analyzed",
            results.failure_count(),
            results.len()
        );
    }
    Ok(())
}

/// Layer analyze flags over the `[defaults]` section.
fn apply_analyze_overrides(args: &AnalyzeArgs, config: &Config) -> Config {
    let mut effective = config.clone();
    let defaults = &mut effective.defaults;

    if let Some(min_conf) = args.min_conf {
        defaults.min_confidence = min_conf;
    }
    if let Some(sensitivity) = args.sensitivity {
        defaults.sensitivity = sensitivity;
    }
    if let Some(overlap) = args.overlap {
        defaults.overlap = overlap;
    }
    if let Some(batch_size) = args.batch_size {
        defaults.batch_size = batch_size;
    }
    if let Some(sf_thresh) = args.sf_thresh {
        defaults.species_filter_threshold = sf_thresh;
    }
    if let Some(format) = args.format {
        defaults.result_format = format;
    }

    effective
}

fn print_results(
    results: &BatchResults,
    config: &RunConfiguration,
    args: &AnalyzeArgs,
) -> Result<()> {
    let mut out = std::io::stdout().lock();
    let sorted = results.sorted_by_path();
    let display_path = |path: &Path| -> PathBuf {
        path.strip_prefix(&args.input)
            .ok()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| path.to_path_buf(), Path::to_path_buf)
    };

    if args.json {
        let paths: Vec<PathBuf> = sorted.iter().map(|(path, _)| display_path(path)).collect();
        let reports: Vec<FileReport<'_>> = sorted
            .iter()
            .zip(&paths)
            .map(|((_, result), file)| match result {
                AnalysisResult::Success(segments) => FileReport {
                    file,
                    error: None,
                    results: segments,
                    summary: pool(segments, usize::from(args.top), args.summary),
                },
                AnalysisResult::Failure(reason) => FileReport {
                    file,
                    error: Some(reason.as_str()),
                    results: &[],
                    summary: Vec::new(),
                },
            })
            .collect();

        serde_json::to_writer_pretty(&mut out, &reports)
            .map_err(|source| Error::ResultSerialize { source })?;
        writeln!(out)?;
        return Ok(());
    }

    let mut writer = ResultWriter::new(&mut out, config.result_format);
    for (path, result) in sorted {
        if let AnalysisResult::Success(segments) = result {
            writer.write_file(&display_path(path), segments, config)?;
        }
    }
    writer.finish()
}

#[allow(clippy::print_stdout)]
fn list_regions(profile: Profile) {
    let default = profile.default_region();
    println!("Regions ({profile:?} profile):");
    for preset in profile.presets() {
        let model = preset.model.unwrap_or("built-in model");
        let marker = if preset.region == default {
            " [default]"
        } else {
            ""
        };
        let no_noise = if preset.high_accuracy_model.is_some() {
            ", no-noise variant"
        } else {
            ""
        };
        println!(
            "  {:<12} {model} ({} Hz{no_noise}){marker}",
            preset.region.name(),
            preset.signal.sample_rate
        );
    }
}

#[allow(clippy::print_stdout)]
fn handle_config_command(
    action: ConfigAction,
    config: &Config,
    explicit: Option<&Path>,
) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };

    match action {
        ConfigAction::Init => {
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                save_config(&Config::default(), &path)?;
                println!("Created configuration file: {}", path.display());
                println!("\nNext steps:");
                println!("  set [analyzer] classify_command and species_command");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let text = toml::to_string_pretty(config)
                .map_err(|source| Error::ConfigSerialize { source })?;
            println!("{text}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use clap::Parser;

    fn analyze_args(extra: &[&str]) -> AnalyzeArgs {
        let mut argv = vec!["battyd", "analyze", "recordings"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Analyze(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_analyze_overrides_layer_over_defaults() {
        let args = analyze_args(&["-c", "0.5", "--overlap", "1.0", "--format", "csv"]);
        let config = Config::default();

        let effective = apply_analyze_overrides(&args, &config);
        assert_eq!(effective.defaults.min_confidence, 0.5);
        assert_eq!(effective.defaults.overlap, 1.0);
        assert_eq!(effective.defaults.result_format, config::ResultFormat::Csv);
        assert_eq!(effective.defaults.sensitivity, config.defaults.sensitivity);
    }

    #[test]
    fn test_analyze_without_overrides_keeps_config() {
        let args = analyze_args(&[]);
        let mut config = Config::default();
        config.defaults.batch_size = 8;

        let effective = apply_analyze_overrides(&args, &config);
        assert_eq!(effective.defaults.batch_size, 8);
    }
}
