use super::Database;
use crate::JokeError;
use crate::Result;

const REQUIRED_TABLES: [&str; 5] = ["jokes", "tags", "joke_tags", "joke_feedback", "query_logs"];

impl Database {
    /// Check if database schema is initialized
    /// Returns true if all required tables exist
    pub async fn is_schema_initialized(&self) -> Result<bool> {
        for table_name in REQUIRED_TABLES {
            let exists = sqlx::query_scalar::<_, bool>(
                r"
                SELECT EXISTS (
                    SELECT FROM information_schema.tables
                    WHERE table_schema = 'public'
                    AND table_name = $1
                )
                ",
            )
            .bind(table_name)
            .fetch_one(&self.pool)
            .await?;

            if !exists {
                tracing::debug!("Missing required table: {}", table_name);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Verify database schema or return helpful error
    pub async fn verify_schema_or_error(&self) -> Result<()> {
        if !self.is_schema_initialized().await? {
            return Err(JokeError::Config(
                "❌ Database schema not initialized!\n\n\
                 Please run the following command to initialize the database:\n\n\
                 \x1b[1;32mjokerank init\x1b[0m"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Enable pgvector and create the joke tables
    ///
    /// `dimension` fixes the `VECTOR(D)` column width; it must match the
    /// embedding model used for ingestion and queries.
    pub async fn init_schema(&self, dimension: usize) -> Result<()> {
        if dimension == 0 {
            return Err(JokeError::Config(
                "embedding dimension must be positive".to_string(),
            ));
        }

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS jokes (
                id BIGSERIAL PRIMARY KEY,
                text TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'general',
                source TEXT,
                embedding VECTOR({dimension}) NOT NULL,
                like_count BIGINT NOT NULL DEFAULT 0 CHECK (like_count >= 0),
                dislike_count BIGINT NOT NULL DEFAULT 0 CHECK (dislike_count >= 0),
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS tags (
                id BIGSERIAL PRIMARY KEY,
                name TEXT UNIQUE NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Schemas from earlier releases capped these columns
        sqlx::query(
            r"
            ALTER TABLE jokes
                ALTER COLUMN category TYPE TEXT,
                ALTER COLUMN source TYPE TEXT
            ",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("ALTER TABLE tags ALTER COLUMN name TYPE TEXT")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS joke_tags (
                joke_id BIGINT NOT NULL REFERENCES jokes(id),
                tag_id BIGINT NOT NULL REFERENCES tags(id),
                PRIMARY KEY (joke_id, tag_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS joke_feedback (
                id BIGSERIAL PRIMARY KEY,
                joke_id BIGINT NOT NULL REFERENCES jokes(id),
                liked BOOLEAN NOT NULL,
                comment TEXT,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS query_logs (
                id BIGSERIAL PRIMARY KEY,
                query TEXT NOT NULL,
                context TEXT,
                returned_ids BIGINT[] NOT NULL DEFAULT '{}',
                clarification_needed BOOLEAN NOT NULL DEFAULT FALSE,
                relevance_score REAL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        self.create_indexes().await?;

        tracing::info!("Joke schema ready (embedding dimension {})", dimension);
        Ok(())
    }

    /// Create the ivfflat index over embeddings
    ///
    /// ivfflat clusters are fixed at build time, so build it after the
    /// initial bulk load rather than on an empty table.
    pub async fn create_vector_index(&self, lists: usize) -> Result<()> {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_jokes_embedding ON jokes \
             USING ivfflat (embedding vector_cosine_ops) WITH (lists = {})",
            lists.max(1)
        ))
        .execute(&self.pool)
        .await?;

        tracing::info!("Vector index ensured (lists = {})", lists.max(1));
        Ok(())
    }

    /// Drop every joke table; used by `init --force`
    pub async fn drop_schema(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS query_logs, joke_feedback, joke_tags, tags, jokes CASCADE")
            .execute(&self.pool)
            .await?;
        tracing::warn!("Dropped joke tables");
        Ok(())
    }

    async fn create_indexes(&self) -> Result<()> {
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jokes_category ON jokes(category)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jokes_text ON jokes(md5(text))")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_joke_feedback_joke_id ON joke_feedback(joke_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_query_logs_created_at ON query_logs(created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        tracing::debug!("Essential indexes ensured");
        Ok(())
    }
}
