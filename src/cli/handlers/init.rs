//! Database initialization handlers

use crate::cli::output::print_info;
use crate::cli::output::print_success;
use crate::cli::output::print_warning;
use crate::database::Database;
use crate::AppConfig;
use crate::Result;

/// Handle database initialization command
///
/// Creation is idempotent; `force` drops the joke tables first.
pub async fn handle_init_command(config: &AppConfig, force: bool, skip_indexes: bool) -> Result<()> {
    if !config.uses_postgres() {
        print_warning("database.backend is 'memory'; there is no schema to initialize.");
        println!("Set database.backend = \"postgres\" to use a persistent corpus.");
        return Ok(());
    }

    print_info("🗄️  Initializing joke database...");
    println!();

    let database = Database::from_config(config).await?;

    if force {
        print_warning("Dropping existing joke tables (--force)");
        database.drop_schema().await?;
    }

    let dimension = config.embedding_dimension();
    match database.init_schema(dimension).await {
        Ok(()) => {
            print_success(&format!("Tables created (VECTOR({dimension}))"));
        }
        Err(e) => {
            if e.to_string().contains("vector") || e.to_string().contains("extension") {
                print_warning(&format!("Could not enable pgvector extension: {e}"));
                println!("Please run on the database server:");
                println!("  psql -d <database> -c 'CREATE EXTENSION IF NOT EXISTS vector;'");
                println!();
                println!("Then run: jokerank init");
            }
            return Err(e);
        }
    }

    if skip_indexes || !config.vector_indexes_enabled() {
        print_info("⏭️  Skipping vector index creation");
    } else {
        print_info("📊 Creating vector index...");
        database
            .create_vector_index(config.vector_index_lists())
            .await?;
        print_success("Vector index created");
    }

    println!();
    print_success("Database initialization complete");
    print_info("Next: jokerank sample-data && jokerank import data/sample_jokes.json");
    Ok(())
}
