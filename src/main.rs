use clap::{Arg, Command};
use log::LevelFilter;
use phishguard::config::Config;
use phishguard::engine::AnalysisEngine;
use phishguard::stats;
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("phishguard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rule-based URL phishing risk engine with optional ML inference")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/phishguard.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity and print a summary")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .help("Show collected analysis statistics")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Emit analysis results as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging with per-check detail")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("urls")
                .value_name("URL")
                .help("URLs to analyze")
                .num_args(0..),
        )
        .get_matches();

    // Initialize logger based on verbose flag
    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        test_config(&config);
        return;
    }

    if matches.get_flag("stats") {
        show_stats(&config);
        return;
    }

    let urls: Vec<&String> = matches
        .get_many::<String>("urls")
        .map(|values| values.collect())
        .unwrap_or_default();
    if urls.is_empty() {
        eprintln!("No URLs given. Pass one or more URLs to analyze, or see --help.");
        process::exit(2);
    }

    let engine = match AnalysisEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error building analysis engine: {e:#}");
            process::exit(1);
        }
    };

    let as_json = matches.get_flag("json");
    let mut any_blocked = false;
    for url in urls {
        match engine.analyze_url(url).await {
            Ok(result) => {
                any_blocked |= result.blocked;
                if as_json {
                    match serde_json::to_string_pretty(&result) {
                        Ok(json) => println!("{json}"),
                        Err(e) => eprintln!("Failed to serialize result for {url}: {e}"),
                    }
                } else {
                    print_result(&result);
                }
            }
            Err(e) => {
                eprintln!("Error analyzing {url}: {e:#}");
                process::exit(2);
            }
        }
    }

    // Scripting-friendly verdict: nonzero when anything was blocked
    if any_blocked {
        process::exit(1);
    }
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::info!("Config file {path} not found, using built-in defaults");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to {path}");
            println!("Edit the whitelist and ml endpoint before production use.");
        }
        Err(e) => {
            eprintln!("Failed to write configuration: {e:#}");
            process::exit(1);
        }
    }
}

fn test_config(config: &Config) {
    println!("Testing configuration...");
    println!();
    match config.validate() {
        Ok(()) => {
            println!("Configuration is valid");
            println!("  Whitelisted domains: {}", config.whitelist.len());
            println!("  Block threshold: {}", config.block_threshold);
            println!("  Cache TTL: {}s", config.cache_ttl_seconds);
            match &config.ml {
                Some(ml) => println!(
                    "  ML endpoint: {} (timeout {}s)",
                    ml.endpoint, ml.timeout_seconds
                ),
                None => println!("  ML endpoint: none (rule-based scoring only)"),
            }
            let h = &config.heuristics;
            println!(
                "  Heuristic tables: {} TLDs, {} keywords, {} brands, {} path patterns",
                h.suspicious_tlds.len(),
                h.phishing_keywords.len(),
                h.brand_domains.len(),
                h.login_paths.len()
            );
        }
        Err(e) => {
            eprintln!("Configuration is invalid: {e:#}");
            process::exit(1);
        }
    }
}

fn show_stats(config: &Config) {
    let Some(settings) = &config.statistics else {
        eprintln!("Statistics are not configured; set the statistics section in the config.");
        process::exit(1);
    };
    match stats::read_stats_file(&settings.output_path) {
        Ok(stats) => {
            println!("Analyses: {}", stats.total_analyses);
            println!("Blocked: {}", stats.total_blocked);
            println!("ML failures: {}", stats.ml_failures);
            let mut sources: Vec<_> = stats.by_source.iter().collect();
            sources.sort_by(|a, b| b.1.analyses.cmp(&a.1.analyses));
            for (source, counters) in sources {
                println!(
                    "  {source}: {} analyses, {} blocked",
                    counters.analyses, counters.blocked
                );
            }
        }
        Err(e) => {
            eprintln!("Failed to read statistics: {e:#}");
            process::exit(1);
        }
    }
}

fn print_result(result: &phishguard::CombinedAnalysisResult) {
    let verdict = if result.blocked { "BLOCKED" } else { "allowed" };
    println!(
        "{} [{}] risk {:.2} confidence {:.2} via {} ({} ms)",
        result.url,
        verdict,
        result.risk_score,
        result.confidence,
        result.source,
        result.processing_time_ms
    );
    println!(
        "  threats: phishing {:.2}, malware {:.2}, social {:.2}",
        result.threats.phishing, result.threats.malware, result.threats.social
    );
    println!("  {}", result.message);
    for flag in &result.flags {
        println!("    - {flag}");
    }
}
