use anyhow::Result;

use provenance_core::{endpoints::NewEndpoint, AppConfig};

/// Print the loaded configuration. `config` has already passed
/// `AppConfig::validate` in `load_config`.
pub fn run(config: &AppConfig, extra: &[NewEndpoint]) -> Result<()> {
    let scheduler = &config.scheduler;
    println!("Configuration OK\n");
    println!("  Category:        {}", scheduler.category);
    println!("  Interval:        {} seconds", scheduler.interval_secs);
    println!("  Max concurrency: {}", scheduler.max_concurrency);
    if let Some(max) = scheduler.max_failures {
        println!("  Max failures:    {}", max);
    }
    if let Some(secs) = scheduler.rearm_after_secs {
        println!("  Re-arm after:    {} seconds", secs);
    }
    println!("  Article policy:  {:?}", config.articles.policy);
    println!("  Seed articles:   {}", config.articles.seed.len());

    let total = config.endpoints.len() + extra.len();
    if total == 0 {
        println!("\nNo endpoints configured.");
        return Ok(());
    }

    println!("\nEndpoints ({}):\n", total);
    for endpoint in &config.endpoints {
        println!("  {} ({})", endpoint.url, endpoint.accept);
    }
    for endpoint in extra {
        println!("  {} ({}) [opml]", endpoint.url, endpoint.accept);
    }

    Ok(())
}
