//! Data ingestion handlers (import, sample data, add)

use std::path::Path;

use crate::cli::output::*;
use crate::loader;
use crate::models::NewJoke;
use crate::retrieval::JokeService;
use crate::Result;

/// Import a JSON file and report the summary
pub async fn handle_import_command(
    service: &JokeService,
    file: &Path,
    concurrency: usize,
) -> Result<()> {
    print_info(&format!("📥 Importing jokes from {}", file.display()));

    let summary = loader::import_file(service, file, concurrency).await?;

    print_success(&format!(
        "Import complete: {} inserted, {} skipped, {} failed",
        summary.inserted, summary.skipped, summary.failed
    ));
    if summary.failed > 0 {
        print_warning("Some records failed; run with --verbose for details");
    }
    Ok(())
}

/// Write the bundled sample jokes to `output`
pub fn handle_sample_data_command(output: &Path) -> Result<()> {
    loader::write_sample_file(output)?;
    print_success(&format!("Sample jokes written to {}", output.display()));
    print_info(&format!("Import them with: jokerank import {}", output.display()));
    Ok(())
}

/// Add one joke and print the stored record
pub async fn handle_add_command(
    service: &JokeService,
    text: String,
    category: Option<String>,
    tags: Vec<String>,
    source: Option<String>,
) -> Result<()> {
    let joke = NewJoke {
        id: None,
        text,
        category,
        tags,
        source,
    };

    let stored = service.add_joke(joke).await?;
    print_success(&format!("Joke {} added", stored.id));
    print_joke(&stored);
    Ok(())
}
