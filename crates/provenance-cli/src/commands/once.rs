use std::sync::Arc;

use anyhow::Result;

use provenance_core::{
    endpoints::NewEndpoint,
    feed::{ArticleInfo, HttpFetcher},
    pipeline::{build_scheduler, seed_store},
    storage::{ArticleRepository, Database},
    AppConfig,
};

pub async fn run(config: &AppConfig, extra: &[NewEndpoint], json: bool, available_only: bool) -> Result<()> {
    let db = Database::new_in_memory().await?;
    seed_store(&db, config, extra).await?;

    let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
    let scheduler = build_scheduler(&db, config, fetcher)?;
    let report = scheduler.run_once().await;

    let article_repo = ArticleRepository::new(&db);
    let articles = if available_only {
        article_repo.find_available().await?
    } else {
        article_repo.find_all().await?
    };

    if json {
        let infos: Vec<ArticleInfo> = articles.iter().map(ArticleInfo::from).collect();
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    println!(
        "Tick finished: {} endpoints, {} succeeded, {} failed\n",
        report.discovered,
        report.succeeded,
        report.failed + report.abandoned
    );

    if articles.is_empty() {
        println!("No articles.");
        return Ok(());
    }

    println!("Articles ({}):\n", articles.len());
    for article in &articles {
        let marker = if article.available { " " } else { "x" };
        println!("  [{}] {:>5}  {}", marker, article.id, article.title);
        if let Some(link) = &article.link {
            println!("             {}", link);
        }
    }

    Ok(())
}
