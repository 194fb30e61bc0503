//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(name = "jokerank")]
#[command(about = "Semantic joke retrieval with clarification and feedback-weighted ranking")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (default: config.toml, then config.example.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON file loaded into the in-memory store before the command runs
    #[arg(long, global = true)]
    pub seed: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP and MCP server
    Serve {
        /// Host to bind (default: server.host from config)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (default: server.port from config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Disable CORS
        #[arg(long)]
        no_cors: bool,
    },
    /// Initialize database schema and indexes
    Init {
        /// Drop existing joke tables first
        #[arg(short, long)]
        force: bool,
        /// Skip creating the vector index (build it after the first import)
        #[arg(long)]
        skip_indexes: bool,
    },
    /// Import jokes from a JSON file
    Import {
        /// JSON array of {text, category?, tags?, source?}
        file: PathBuf,
        /// Embedding calls in flight (default: embeddings.batch_concurrency)
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Write a sample jokes file
    SampleData {
        /// Output path
        #[arg(short, long, default_value = "data/sample_jokes.json")]
        output: PathBuf,
    },
    /// Search for jokes
    Search(SearchArgs),
    /// Like or dislike a joke
    Feedback {
        /// Joke id
        id: String,
        /// Record a dislike instead of a like
        #[arg(long)]
        dislike: bool,
        /// Optional comment
        #[arg(long)]
        comment: Option<String>,
    },
    /// Add a single joke
    Add {
        /// Joke text
        text: String,
        /// Category (default: general)
        #[arg(long)]
        category: Option<String>,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Source attribution
        #[arg(long)]
        source: Option<String>,
    },
    /// Show corpus statistics
    Stats,
    /// Show current configuration
    Config,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Free-text query
    pub query: String,
    /// Optional context matched against tags and categories
    #[arg(long)]
    pub context: Option<String>,
    /// Maximum number of results
    #[arg(short = 'n', long, default_value = "1")]
    pub max_results: usize,
    /// Print the raw JSON response
    #[arg(long)]
    pub json: bool,
}
