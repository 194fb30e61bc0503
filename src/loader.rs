//! Bulk ingestion from JSON files

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::models::NewJoke;
use crate::retrieval::JokeService;
use crate::Result;

/// One entry of an import file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JokeRecord {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl JokeRecord {
    fn new(text: &str, category: &str, tags: &[&str]) -> Self {
        Self {
            text: text.to_string(),
            category: Some(category.to_string()),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            source: None,
        }
    }
}

impl From<JokeRecord> for NewJoke {
    fn from(record: JokeRecord) -> Self {
        Self {
            id: None,
            text: record.text,
            category: record.category,
            tags: record.tags,
            source: record.source,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Parse a JSON array of joke records
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<JokeRecord>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let records: Vec<JokeRecord> = serde_json::from_str(&content)?;
    info!(
        "Read {} joke records from {}",
        records.len(),
        path.as_ref().display()
    );
    Ok(records)
}

/// Import a JSON file through the service
pub async fn import_file<P: AsRef<Path>>(
    service: &JokeService,
    path: P,
    batch_concurrency: usize,
) -> Result<ImportSummary> {
    let records = read_records(path)?;
    import_records(service, records, batch_concurrency).await
}

/// Insert records whose text is not already stored
///
/// Per-record failures are counted and logged; they never abort the import.
pub async fn import_records(
    service: &JokeService,
    records: Vec<JokeRecord>,
    batch_concurrency: usize,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut pending: Vec<NewJoke> = Vec::new();

    for record in records {
        let joke = match NewJoke::from(record).normalized() {
            Ok(joke) => joke,
            Err(e) => {
                warn!("Skipping invalid record: {}", e);
                summary.failed += 1;
                continue;
            }
        };

        if !seen.insert(joke.text.clone()) || service.find_by_text(&joke.text).await?.is_some() {
            info!("Joke already exists: {}", preview(&joke.text));
            summary.skipped += 1;
            continue;
        }
        pending.push(joke);
    }

    let texts: Vec<String> = pending.iter().map(|j| j.text.clone()).collect();
    let embeddings = service
        .embedder()
        .embed_batch(&texts, batch_concurrency)
        .await;

    for (joke, embedding) in pending.into_iter().zip(embeddings) {
        let text = preview(&joke.text);
        let result = match embedding {
            Ok(embedding) => service.insert_embedded(joke, embedding).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(stored) => {
                info!("Adding new joke {}: {}", stored.id, text);
                summary.inserted += 1;
            }
            Err(e) => {
                warn!("Failed to import '{}': {}", text, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Import finished: {} inserted, {} skipped, {} failed",
        summary.inserted, summary.skipped, summary.failed
    );
    Ok(summary)
}

/// The five jokes written by `sample-data`
pub fn sample_records() -> Vec<JokeRecord> {
    vec![
        JokeRecord::new(
            "Why did the chicken cross the road? To get to the other side!",
            "classic",
            &["animals", "classic", "short"],
        ),
        JokeRecord::new(
            "I told my wife she was drawing her eyebrows too high. She looked surprised.",
            "pun",
            &["pun", "one-liner", "appearance"],
        ),
        JokeRecord::new(
            "What do you call a fake noodle? An impasta!",
            "pun",
            &["pun", "food", "short"],
        ),
        JokeRecord::new(
            "How many software engineers does it take to change a light bulb? None, that's a hardware problem.",
            "professional",
            &["tech", "programming", "profession"],
        ),
        JokeRecord::new(
            "Why don't scientists trust atoms? Because they make up everything!",
            "science",
            &["science", "pun", "short"],
        ),
    ]
}

/// Write the sample records as pretty JSON, creating parent directories
pub fn write_sample_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&sample_records())?;
    std::fs::write(path, json)?;
    info!("Created sample jokes JSON file at {}", path.display());
    Ok(())
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(50).collect();
    if text.chars().count() > 50 {
        out.push_str("...");
    }
    out
}
