#![allow(clippy::uninlined_format_args)]

use phishguard::config::Config;
use phishguard::engine::{AnalysisEngine, Source};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Exercising the scoring engine against known scenarios...");

    // Rule-based only: no ML endpoint configured
    let engine = AnalysisEngine::new(Config::default())?;

    println!("\n=== Scenario 1: raw IP host serving a login page ===");
    let result = engine.analyze_url("http://192.168.0.1/login").await?;
    println!("Risk: {:.2}  source: {}", result.risk_score, result.source);
    for flag in &result.flags {
        println!("  - {}", flag);
    }
    if (result.risk_score - 0.16).abs() < 0.005 && !result.blocked {
        println!("OK: moderate signal, below the blocking threshold");
    } else {
        println!("UNEXPECTED: wanted risk ~0.16, unblocked");
    }

    println!("\n=== Scenario 2: keyword-stuffed lookalike domain ===");
    let result = engine
        .analyze_url("https://paypal-secure-login-verify-account.xyz/confirm")
        .await?;
    println!(
        "Risk: {:.2}  blocked: {}  source: {}",
        result.risk_score, result.blocked, result.source
    );
    for flag in &result.flags {
        println!("  - {}", flag);
    }
    if result.blocked {
        println!("OK: lookalike domain would trigger the warning page");
    } else {
        println!("UNEXPECTED: lookalike domain was not blocked");
    }

    println!("\n=== Scenario 3: whitelisted domain with a scary-looking path ===");
    let result = engine
        .analyze_url("https://google.com/verify/account/login?user=paypal.com")
        .await?;
    println!(
        "Risk: {:.2}  blocked: {}  source: {}",
        result.risk_score, result.blocked, result.source
    );
    if result.source == Source::Whitelist && result.risk_score == 0.0 && !result.blocked {
        println!("OK: whitelist bypasses analysis regardless of the path");
    } else {
        println!("UNEXPECTED: whitelist did not short-circuit");
    }

    println!("\n=== Scenario 4: brand name smuggled into an unrelated host ===");
    let result = engine
        .analyze_url("http://real-paypal.com/paypal.com/login")
        .await?;
    println!(
        "Risk: {:.2}  blocked: {}  source: {}",
        result.risk_score, result.blocked, result.source
    );
    for flag in &result.flags {
        println!("  - {}", flag);
    }
    if result.blocked {
        println!("OK: spoofed brand reference dominates the weighted average");
    } else {
        println!("UNEXPECTED: brand spoof slipped through");
    }

    println!("\n=== Scenario 5: repeat analysis is served from cache ===");
    let url = "http://offers.tracking-site.click/deal";
    let first = engine.analyze_url(url).await?;
    let second = engine.analyze_url(url).await?;
    println!(
        "First: {}  second: {}  scores {:.2} / {:.2}",
        first.source, second.source, first.risk_score, second.risk_score
    );
    if second.source == Source::Cache && (first.risk_score - second.risk_score).abs() < 1e-9 {
        println!("OK: identical result without recomputation");
    } else {
        println!("UNEXPECTED: cache did not serve the repeat request");
    }

    Ok(())
}
