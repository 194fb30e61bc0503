use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use pgvector::Vector;

use super::is_unique_violation;
use super::Database;
use crate::corpus::sort_neighbors;
use crate::corpus::CorpusStore;
use crate::corpus::Neighbor;
use crate::models::CorpusStats;
use crate::models::FeedbackEvent;
use crate::models::FeedbackStats;
use crate::models::Joke;
use crate::models::JokeId;
use crate::models::NewJoke;
use crate::models::QueryLog;
use crate::JokeError;
use crate::Result;

/// Joke columns plus aggregated tag names; callers append WHERE/GROUP BY
const JOKE_SELECT: &str = r"
    SELECT
        j.id, j.text, j.category, j.source, j.embedding,
        j.like_count, j.dislike_count, j.created_at,
        COALESCE(
            array_agg(t.name::text ORDER BY t.name) FILTER (WHERE t.name IS NOT NULL),
            '{}'::text[]
        ) AS tags
    FROM jokes j
    LEFT JOIN joke_tags jt ON jt.joke_id = j.id
    LEFT JOIN tags t ON t.id = jt.tag_id
";

const LIKE_SQL: &str = r"
    UPDATE jokes SET like_count = like_count + 1, updated_at = NOW()
    WHERE id = $1
    RETURNING like_count, dislike_count
";

const DISLIKE_SQL: &str = r"
    UPDATE jokes SET dislike_count = dislike_count + 1, updated_at = NOW()
    WHERE id = $1
    RETURNING like_count, dislike_count
";

#[derive(sqlx::FromRow)]
struct JokeRow {
    id: i64,
    text: String,
    category: String,
    source: Option<String>,
    embedding: Vector,
    like_count: i64,
    dislike_count: i64,
    created_at: DateTime<Utc>,
    tags: Vec<String>,
}

impl From<JokeRow> for Joke {
    fn from(row: JokeRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            category: row.category,
            tags: row.tags,
            source: row.source,
            embedding: row.embedding.to_vec(),
            like_count: row.like_count.max(0) as u64,
            dislike_count: row.dislike_count.max(0) as u64,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NeighborRow {
    #[sqlx(flatten)]
    joke: JokeRow,
    distance: f64,
}

fn counters(row: (i64, i64)) -> FeedbackStats {
    FeedbackStats {
        like_count: row.0.max(0) as u64,
        dislike_count: row.1.max(0) as u64,
    }
}

#[async_trait]
impl CorpusStore for Database {
    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(JokeError::InvalidInput("k must be positive".to_string()));
        }

        let rows = sqlx::query_as::<_, NeighborRow>(
            r"
            WITH nearest AS (
                SELECT id, embedding <=> $1 AS distance
                FROM jokes
                ORDER BY embedding <=> $1, id
                LIMIT $2
            )
            SELECT
                j.id, j.text, j.category, j.source, j.embedding,
                j.like_count, j.dislike_count, j.created_at,
                COALESCE(
                    array_agg(t.name::text ORDER BY t.name) FILTER (WHERE t.name IS NOT NULL),
                    '{}'::text[]
                ) AS tags,
                n.distance
            FROM nearest n
            JOIN jokes j ON j.id = n.id
            LEFT JOIN joke_tags jt ON jt.joke_id = j.id
            LEFT JOIN tags t ON t.id = jt.tag_id
            GROUP BY j.id, n.distance
            ORDER BY n.distance, j.id
            ",
        )
        .bind(Vector::from(query.to_vec()))
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut neighbors: Vec<Neighbor> = rows
            .into_iter()
            .map(|row| (Joke::from(row.joke), row.distance as f32))
            .collect();
        // f64 -> f32 can collapse distinct distances; restore the id tie-break
        sort_neighbors(&mut neighbors);

        tracing::debug!("pgvector returned {} neighbours", neighbors.len());
        Ok(neighbors)
    }

    async fn insert(&self, joke: NewJoke, embedding: Vec<f32>) -> Result<Joke> {
        let mut tx = self.pool.begin().await?;
        let category = joke.category_or_default().to_string();

        let inserted = match joke.id {
            Some(id) => {
                sqlx::query_scalar::<_, i64>(
                    r"
                    INSERT INTO jokes (id, text, category, source, embedding)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    ",
                )
                .bind(id)
                .bind(&joke.text)
                .bind(&category)
                .bind(&joke.source)
                .bind(Vector::from(embedding))
                .fetch_one(&mut *tx)
                .await
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    r"
                    INSERT INTO jokes (text, category, source, embedding)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id
                    ",
                )
                .bind(&joke.text)
                .bind(&category)
                .bind(&joke.source)
                .bind(Vector::from(embedding))
                .fetch_one(&mut *tx)
                .await
            }
        };

        let id = match inserted {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => {
                return Err(JokeError::DuplicateId(joke.id.unwrap_or_default()));
            }
            Err(e) => return Err(e.into()),
        };

        if joke.id.is_some() {
            // Keep BIGSERIAL ahead of explicitly chosen ids
            sqlx::query(
                "SELECT setval(pg_get_serial_sequence('jokes', 'id'), GREATEST((SELECT MAX(id) FROM jokes), 1))",
            )
            .execute(&mut *tx)
            .await?;
        }

        for tag in &joke.tags {
            let tag_id = sqlx::query_scalar::<_, i64>(
                r"
                INSERT INTO tags (name) VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                ",
            )
            .bind(tag)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO joke_tags (joke_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Inserted joke {} with {} tags", id, joke.tags.len());

        self.get(id).await
    }

    async fn get(&self, id: JokeId) -> Result<Joke> {
        let row = sqlx::query_as::<_, JokeRow>(&format!("{JOKE_SELECT} WHERE j.id = $1 GROUP BY j.id"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Joke::from).ok_or(JokeError::NotFound(id))
    }

    async fn record_feedback(&self, event: &FeedbackEvent) -> Result<FeedbackStats> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, (i64, i64)>(if event.liked { LIKE_SQL } else { DISLIKE_SQL })
            .bind(event.joke_id)
            .fetch_optional(&mut *tx)
            .await?;

        // Dropping the transaction rolls it back
        let Some(row) = updated else {
            return Err(JokeError::NotFound(event.joke_id));
        };

        sqlx::query(
            r"
            INSERT INTO joke_feedback (joke_id, liked, comment, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(event.joke_id)
        .bind(event.liked)
        .bind(&event.comment)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(counters(row))
    }

    async fn random(&self) -> Result<Option<Joke>> {
        let row = sqlx::query_as::<_, JokeRow>(&format!(
            "{JOKE_SELECT} WHERE j.id = (SELECT id FROM jokes ORDER BY random() LIMIT 1) GROUP BY j.id"
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Joke::from))
    }

    async fn find_by_text(&self, text: &str) -> Result<Option<Joke>> {
        let row = sqlx::query_as::<_, JokeRow>(&format!(
            "{JOKE_SELECT} WHERE md5(j.text) = md5($1) AND j.text = $1 GROUP BY j.id ORDER BY j.id LIMIT 1"
        ))
        .bind(text.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Joke::from))
    }

    async fn log_query(&self, log: &QueryLog) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO query_logs
                (query, context, returned_ids, clarification_needed, relevance_score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&log.query)
        .bind(&log.context)
        .bind(&log.returned_ids)
        .bind(log.clarification_needed)
        .bind(log.relevance_score)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn stats(&self) -> Result<CorpusStats> {
        let (jokes, tags, feedback, queries) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r"
            SELECT
                (SELECT COUNT(*) FROM jokes),
                (SELECT COUNT(*) FROM tags),
                (SELECT COUNT(*) FROM joke_feedback),
                (SELECT COUNT(*) FROM query_logs)
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CorpusStats {
            total_jokes: jokes.max(0) as u64,
            total_tags: tags.max(0) as u64,
            total_feedback: feedback.max(0) as u64,
            total_queries: queries.max(0) as u64,
        })
    }

    async fn embedding_dimension(&self) -> Result<Option<usize>> {
        // pgvector stores the declared dimension as the column typmod
        let typmod = sqlx::query_scalar::<_, i32>(
            r"
            SELECT a.atttypmod
            FROM pg_attribute a
            WHERE a.attrelid = to_regclass('public.jokes')
            AND a.attname = 'embedding'
            AND NOT a.attisdropped
            ",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(typmod.filter(|t| *t > 0).map(|t| t as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    async fn connect() -> Database {
        let mut config = AppConfig::default();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        let db = Database::from_config(&config).await.unwrap();
        db.drop_schema().await.unwrap();
        db.init_schema(3).await.unwrap();
        db
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL with pgvector (DATABASE_URL)"]
    async fn test_postgres_round_trip() {
        let db = connect().await;
        assert_eq!(db.embedding_dimension().await.unwrap(), Some(3));

        let joke = db
            .insert(
                NewJoke::new("Why do cows wear bells?", "animals", &["cow", "farm"]),
                vec![1.0, 0.0, 0.0],
            )
            .await
            .unwrap();
        assert_eq!(joke.tags, vec!["cow".to_string(), "farm".to_string()]);

        let err = db
            .insert(
                NewJoke::new("again", "animals", &[]).with_id(joke.id),
                vec![0.0, 1.0, 0.0],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, JokeError::DuplicateId(_)));

        let neighbors = db.nearest(&[1.0, 0.1, 0.0], 5).await.unwrap();
        assert_eq!(neighbors[0].0.id, joke.id);

        let long_tag = "a-tag-that-is-much-longer-than-fifty-characters-when-fully-written-out";
        let long_category = "c".repeat(150);
        let tagged = db
            .insert(
                NewJoke {
                    source: Some("s".repeat(300)),
                    ..NewJoke::new("A joke with a verbose tag", long_category.as_str(), &[long_tag])
                },
                vec![0.0, 1.0, 0.0],
            )
            .await
            .unwrap();
        assert_eq!(tagged.tags, vec![long_tag.to_string()]);
        assert_eq!(tagged.category, long_category);
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL with pgvector (DATABASE_URL)"]
    async fn test_postgres_feedback_is_atomic() {
        let db = std::sync::Arc::new(connect().await);
        let joke = db
            .insert(NewJoke::new("feedback target", "pun", &[]), vec![0.0, 0.0, 1.0])
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.record_feedback(&FeedbackEvent {
                    joke_id: joke.id,
                    liked: true,
                    comment: None,
                    created_at: Utc::now(),
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(db.get(joke.id).await.unwrap().like_count, 50);
        assert!(matches!(
            db.record_feedback(&FeedbackEvent {
                joke_id: 999_999,
                liked: true,
                comment: None,
                created_at: Utc::now(),
            })
            .await,
            Err(JokeError::NotFound(999_999))
        ));
    }
}
