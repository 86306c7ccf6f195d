use anyhow::{Context, Result, bail};
use chartgate_core::config::{DEFAULT_CONFIG_PATH, expand_path};
use chartgate_core::{
    ChartData, Mediator, MediatorConfig, RequestContext, SanitizedHost, Translation,
};
use chartgate_loader::{LoadResult, Loader};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub fn print_banner() {
    eprintln!(
        "{} {}",
        "chartgate".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
    eprintln!("{}", "trust-boundary mediator for chart data requests".bright_black());
    eprintln!();
}

/// Logs go to stderr; `RUST_LOG` wins over the `-v` count.
pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

// Helper functions for the translate and fetch handlers

/// Load chart URLs from a file, one per line. Blank lines and `#` comments are skipped.
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read URL file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(format!("No URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Command-line URLs first, then the contents of `urls_file`.
pub fn collect_urls(urls: &[String], urls_file: Option<&Path>) -> Result<Vec<String>, String> {
    let mut collected = urls.to_vec();
    if let Some(path) = urls_file {
        collected.extend(load_urls_from_file(path)?);
    }
    if collected.is_empty() {
        return Err("Either URL arguments or --urls-file must be provided".to_string());
    }
    Ok(collected)
}

/// Reads the mediator configuration. A missing file at the default location falls back to
/// the built-in Wikimedia defaults; a missing file anywhere else is an error.
pub fn load_config(path: &str) -> Result<MediatorConfig> {
    let expanded = expand_path(path);
    if !expanded.exists() && path == DEFAULT_CONFIG_PATH {
        warn!(
            "No config at {}, using built-in defaults (run `chartgate init` to create one)",
            expanded.display()
        );
        return Ok(MediatorConfig::wikimedia_defaults());
    }

    MediatorConfig::load(&expanded)
        .with_context(|| format!("Could not load configuration from {}", expanded.display()))
}

pub fn build_context(domain: &str, lang: Option<&str>, navigate: bool) -> RequestContext {
    let context = if navigate {
        RequestContext::navigate(domain)
    } else {
        RequestContext::fetch(domain)
    };
    match lang {
        Some(lang) => context.with_site_language(lang),
        None => context,
    }
}

pub fn describe_translation(translation: &Translation) -> String {
    let mut line = translation.url();
    if translation.add_cors_origin {
        line.push_str("  [cors]");
    }
    for (name, value) in &translation.headers {
        line.push_str(&format!("  [{}: {}]", name, value));
    }
    line
}

pub fn describe_host(sanitized: &SanitizedHost) -> String {
    format!("{}://{}", sanitized.protocol, sanitized.host)
}

/// Writes the starter configuration. Returns `false` without touching an existing file unless
/// `overwrite` is set.
pub fn write_default_config(path: &Path, overwrite: bool) -> Result<bool> {
    if path.exists() && !overwrite {
        return Ok(false);
    }
    MediatorConfig::wikimedia_defaults()
        .save(path)
        .with_context(|| format!("Could not write configuration to {}", path.display()))?;
    Ok(true)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> io::Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

fn config_from_args(args: &ArgMatches) -> Result<MediatorConfig> {
    let config_path = args
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_PATH);
    load_config(config_path)
}

fn mediator_from_args(args: &ArgMatches) -> Result<Mediator> {
    let mut config = config_from_args(args)?;
    if args.get_flag("trusted") {
        config = config.with_trusted(true);
    }
    Ok(Mediator::new(config))
}

fn urls_from_args(args: &ArgMatches) -> Result<Vec<String>> {
    let urls: Vec<String> = args
        .get_many::<String>("URL")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let urls_file = args.get_one::<PathBuf>("urls-file").map(PathBuf::as_path);
    collect_urls(&urls, urls_file).map_err(anyhow::Error::msg)
}

fn context_from_args(args: &ArgMatches, navigate: bool) -> RequestContext {
    let domain = args
        .get_one::<String>("domain")
        .map(String::as_str)
        .unwrap_or("en.wikipedia.org");
    let lang = args.get_one::<String>("lang").map(String::as_str);
    build_context(domain, lang, navigate)
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_PATH);
    let force = args.get_flag("force");
    let config_path = expand_path(path);

    print_divider();
    println!("{}", "  CHARTGATE INITIALIZATION".bright_white().bold());
    print_divider();
    println!();
    println!(
        "{} Target: {}",
        "→".blue(),
        config_path.display().to_string().bright_white()
    );
    println!();

    let mut overwrite = force;
    if config_path.exists() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("A configuration already exists at this location.");
        println!();

        let response = print_prompt("Overwrite it? [y/N]:")?;
        println!();
        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return Ok(());
        }
        overwrite = true;
    }

    if write_default_config(&config_path, overwrite)? {
        info!("Initialized configuration at {}", config_path.display());
        println!(
            "{} Configuration written: {}",
            "✓".green().bold(),
            config_path.display().to_string().bright_white()
        );
        println!(
            "{} Edit the [domains] table to match the wikis and services you serve.",
            "ℹ".blue()
        );
    }
    println!();
    Ok(())
}

pub fn handle_translate(args: &ArgMatches) -> Result<()> {
    let mediator = mediator_from_args(args)?;
    let urls = urls_from_args(args)?;
    let context = context_from_args(args, args.get_flag("navigate"));
    let as_json = args.get_flag("json");

    let mut rejected = 0;
    let mut report = Vec::new();
    for url in &urls {
        match mediator.translate(url, &context) {
            Ok(translation) => {
                if as_json {
                    report.push(json!({
                        "source": url,
                        "url": translation.url(),
                        "protocol": translation.protocol,
                        "add_cors_origin": translation.add_cors_origin,
                        "headers": translation.headers,
                    }));
                } else {
                    println!("{} {}", "✓".green().bold(), url.bright_white());
                    println!("    {} {}", "→".blue(), describe_translation(&translation));
                }
            }
            Err(e) => {
                rejected += 1;
                if as_json {
                    report.push(json!({"source": url, "error": e.to_string()}));
                } else {
                    println!("{} {}", "✗".red().bold(), url.bright_white());
                    println!("    {}", e.to_string().red());
                }
            }
        }
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if rejected > 0 {
        bail!("{} of {} URLs rejected", rejected, urls.len());
    }
    Ok(())
}

pub fn handle_check_host(args: &ArgMatches) -> Result<()> {
    let mediator = Mediator::new(config_from_args(args)?);
    let hosts: Vec<&String> = args
        .get_many::<String>("HOST")
        .map(|values| values.collect())
        .unwrap_or_default();

    let mut rejected = 0;
    for host in &hosts {
        match mediator.sanitize_host(host) {
            Ok(sanitized) => println!(
                "{} {} {} {}",
                "✓".green().bold(),
                host.bright_white(),
                "→".blue(),
                describe_host(&sanitized)
            ),
            Err(e) => {
                rejected += 1;
                println!("{} {}  {}", "✗".red().bold(), host.bright_white(), e.to_string().red());
            }
        }
    }

    if rejected > 0 {
        bail!("{} of {} hosts not allowed", rejected, hosts.len());
    }
    Ok(())
}

pub async fn handle_fetch(args: &ArgMatches) -> Result<()> {
    let mediator = mediator_from_args(args)?;
    let urls = urls_from_args(args)?;
    let context = context_from_args(args, false);
    let timeout = args.get_one::<u64>("timeout").copied().unwrap_or(10);
    let as_json = args.get_flag("json");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Loading {} URLs", urls.len()));

    let total = urls.len();
    let spinner_clone = spinner.clone();
    let mut loader = Loader::with_timeout(Arc::new(mediator), timeout)?.with_progress_callback(
        Arc::new(move |done: usize, url: String| {
            spinner_clone.set_message(format!("[{}/{}] {}", done, total, url));
        }),
    );
    if let Some(origin) = args.get_one::<String>("origin") {
        loader = loader.with_cors_origin(origin.as_str());
    }

    let results = loader.load_all(&urls, &context).await;
    spinner.finish_and_clear();

    let mut failed = 0;
    let mut report = Vec::new();
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(loaded) => {
                if as_json {
                    report.push(serde_json::to_value(&loaded)?);
                } else {
                    print_load_result(&loaded)?;
                }
            }
            Err(e) => {
                failed += 1;
                if as_json {
                    report.push(json!({"source": url, "error": e.to_string()}));
                } else {
                    println!("{} {}", "✗".red().bold(), url.bright_white());
                    println!("    {}", e.to_string().red());
                    if e.is_transport() {
                        println!(
                            "    {}",
                            "network failure; the request itself was allowed".bright_black()
                        );
                    }
                }
            }
        }
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if failed > 0 {
        bail!("{} of {} loads failed", failed, urls.len());
    }
    Ok(())
}

fn print_load_result(loaded: &LoadResult) -> Result<()> {
    println!("{} {}", "✓".green().bold(), loaded.source.bright_white());
    println!(
        "    {} {} {}",
        "→".blue(),
        loaded.url,
        format!(
            "({} in {}ms)",
            loaded.status_code,
            loaded.response_time.as_millis()
        )
        .bright_black()
    );
    match &loaded.data {
        ChartData::Raw(text) => println!("{}", text),
        ChartData::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
    }
    println!();
    Ok(())
}
