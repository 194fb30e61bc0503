use std::sync::Arc;

use clap::Parser;
use jokerank::cli::*;
use jokerank::config::AppConfig;
use jokerank::loader;
use jokerank::retrieval::JokeService;
use jokerank::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_layered(Some(path))?,
        None => AppConfig::load()?,
    };

    // Initialize logging
    if cli.verbose {
        jokerank::logging::init_logging_with_level("debug")?;
    } else {
        jokerank::logging::init_logging_with_config(&config.logging)?;
    }
    info!("Configuration loaded successfully");

    // Commands that never touch the corpus
    match &cli.command {
        Commands::Config => return handle_config_command(&config),
        Commands::SampleData { output } => return handle_sample_data_command(output),
        Commands::Init {
            force,
            skip_indexes,
        } => return handle_init_command(&config, *force, *skip_indexes).await,
        _ => {}
    }

    let service = Arc::new(JokeService::from_config(&config).await?);

    if let Some(seed) = cli.seed.as_deref() {
        let summary =
            loader::import_file(&service, seed, config.embeddings.batch_concurrency).await?;
        info!(
            "Seeded corpus from {}: {} inserted, {} skipped",
            seed.display(),
            summary.inserted,
            summary.skipped
        );
    } else if !config.uses_postgres() {
        print_warning("Using an empty in-memory corpus; pass --seed <file> to preload jokes");
    }

    // Execute the requested command
    match cli.command {
        Commands::Serve {
            host,
            port,
            no_cors,
        } => {
            handle_serve_api(&config, service, host, port, no_cors).await?;
        }
        Commands::Import { file, concurrency } => {
            let concurrency = concurrency.unwrap_or(config.embeddings.batch_concurrency);
            handle_import_command(&service, &file, concurrency).await?;
        }
        Commands::Search(args) => {
            handle_search_command(&service, args).await?;
        }
        Commands::Feedback {
            id,
            dislike,
            comment,
        } => {
            handle_feedback_command(&service, &id, !dislike, comment).await?;
        }
        Commands::Add {
            text,
            category,
            tags,
            source,
        } => {
            handle_add_command(&service, text, category, tags, source).await?;
        }
        Commands::Stats => {
            handle_stats_command(&service).await?;
        }
        Commands::Config | Commands::SampleData { .. } | Commands::Init { .. } => {}
    }

    Ok(())
}
