//! End-to-end retrieval tests over the in-memory store

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jokerank::config::AppConfig;
use jokerank::corpus::MemoryStore;
use jokerank::embeddings::EmbeddingBackend;
use jokerank::embeddings::EmbeddingService;
use jokerank::loader;
use jokerank::loader::JokeRecord;
use jokerank::models::NewJoke;
use jokerank::retrieval::JokeService;
use jokerank::retrieval::SearchOutcome;
use jokerank::retrieval::SearchRequest;
use jokerank::JokeError;

/// Maps a handful of keywords onto fixed axes so similarities are exact
struct KeywordBackend;

#[async_trait]
impl EmbeddingBackend for KeywordBackend {
    fn model(&self) -> &str {
        "keyword-test"
    }

    fn dimension(&self) -> usize {
        3
    }

    async fn generate(&self, text: &str) -> jokerank::Result<Vec<f32>> {
        let text = text.to_lowercase();
        let mut v = vec![0.0_f32; 3];
        if text.contains("programmer") || text.contains("computer") {
            v[0] += 1.0;
        }
        if text.contains("dog") || text.contains("cat") {
            v[1] += 1.0;
        }
        if text.split_whitespace().any(|w| w == "joke" || w == "funny") {
            v[0] += 1.0;
            v[1] += 1.0;
        }
        if v.iter().all(|x| *x == 0.0) {
            v[2] = 1.0;
        }
        Ok(v)
    }
}

async fn hashed_service(jokes: Vec<NewJoke>) -> JokeService {
    let config = AppConfig::default();
    let embedder = Arc::new(EmbeddingService::new(&config).unwrap());
    build(&config, embedder, jokes).await
}

async fn keyword_service(jokes: Vec<NewJoke>) -> JokeService {
    let config = AppConfig::default();
    let embedder = Arc::new(EmbeddingService::with_backend(
        Arc::new(KeywordBackend),
        4,
        Duration::from_secs(5),
    ));
    build(&config, embedder, jokes).await
}

async fn build(
    config: &AppConfig,
    embedder: Arc<EmbeddingService>,
    jokes: Vec<NewJoke>,
) -> JokeService {
    let service = JokeService::new(config, Arc::new(MemoryStore::new()), embedder)
        .await
        .unwrap();
    for joke in jokes {
        service.add_joke(joke).await.unwrap();
    }
    service
}

fn sample_jokes() -> Vec<NewJoke> {
    loader::sample_records().into_iter().map(NewJoke::from).collect()
}

fn programming_and_animals() -> Vec<NewJoke> {
    vec![
        NewJoke::new(
            "Why do programmers prefer dark mode? Because light attracts bugs.",
            "programming",
            &["tech"],
        ),
        NewJoke::new(
            "What do you call a dog magician? A labracadabrador.",
            "animals",
            &["pun"],
        ),
    ]
}

#[tokio::test]
async fn test_exact_text_ranks_first() {
    let service = hashed_service(sample_jokes()).await;
    let text = "What do you call a fake noodle? An impasta!";

    let outcome = service
        .search(&SearchRequest::new(text).with_max_results(3))
        .await
        .unwrap();

    match outcome {
        SearchOutcome::Results(candidates) => {
            assert_eq!(candidates[0].joke.text, text);
            assert!(candidates[0].similarity > 0.99);
        }
        other => panic!("expected results, got {other:?}"),
    }
}

#[tokio::test]
async fn test_repeated_search_is_identical() {
    let service = hashed_service(sample_jokes()).await;
    let request = SearchRequest::new("science atoms")
        .with_context("pun")
        .with_max_results(5);

    let first = service.search(&request).await.unwrap();
    let second = service.search(&request).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_independent_services_agree() {
    let a = hashed_service(sample_jokes()).await;
    let b = hashed_service(sample_jokes()).await;
    let request = SearchRequest::new("chicken road").with_max_results(5);

    let ids = |o: &SearchOutcome| o.candidates().iter().map(|c| c.joke.id).collect::<Vec<_>>();
    let first = a.search(&request).await.unwrap();
    let second = b.search(&request).await.unwrap();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.kind(), second.kind());
}

#[tokio::test]
async fn test_vague_query_asks_for_clarification() {
    let service = keyword_service(programming_and_animals()).await;

    let outcome = service
        .search(&SearchRequest::new("joke").with_max_results(2))
        .await
        .unwrap();

    match outcome {
        SearchOutcome::Clarification {
            prompt,
            categories,
            candidates,
        } => {
            assert_eq!(categories, vec!["animals", "programming"]);
            assert_eq!(prompt, "Did you mean a joke about animals or programming?");
            assert_eq!(candidates.len(), 2);
            // equal scores fall back to id order
            assert_eq!(candidates[0].joke.category, "programming");
        }
        other => panic!("expected clarification, got {other:?}"),
    }
}

#[tokio::test]
async fn test_specific_query_is_answered() {
    let service = keyword_service(programming_and_animals()).await;

    let outcome = service
        .search(&SearchRequest::new("programmer humour"))
        .await
        .unwrap();

    match outcome {
        SearchOutcome::Results(candidates) => {
            assert_eq!(candidates.len(), 1);
            assert_eq!(candidates[0].joke.category, "programming");
        }
        other => panic!("expected results, got {other:?}"),
    }
}

#[tokio::test]
async fn test_context_breaks_the_tie() {
    let service = keyword_service(programming_and_animals()).await;

    let outcome = service
        .search(
            &SearchRequest::new("funny")
                .with_context("pun")
                .with_max_results(2),
        )
        .await
        .unwrap();

    let top = &outcome.candidates()[0];
    assert_eq!(top.joke.category, "animals");
    assert!(top.tag_overlap > 0.0);
}

#[tokio::test]
async fn test_unrelated_corpus_asks_instead_of_giving_up() {
    let service = keyword_service(vec![NewJoke::new(
        "A computer walks into a bar",
        "programming",
        &[],
    )])
    .await;

    // orthogonal to every stored vector, so nothing clears min_similarity
    let outcome = service.search(&SearchRequest::new("dog")).await.unwrap();
    match outcome {
        SearchOutcome::Clarification {
            prompt,
            categories,
            candidates,
        } => {
            assert_eq!(prompt, "Did you mean a joke about programming?");
            assert_eq!(categories, vec!["programming"]);
            assert_eq!(candidates.len(), 1);
        }
        other => panic!("expected clarification, got {other:?}"),
    }
}

#[tokio::test]
async fn test_vague_query_with_default_embedder_asks_for_category() {
    let service = hashed_service(vec![
        NewJoke::new(
            "Why do programmers prefer dark mode? Because light attracts bugs.",
            "programming",
            &[],
        ),
        NewJoke::new(
            "What do you call a dog magician? A labracadabrador.",
            "animals",
            &[],
        ),
    ])
    .await;

    let outcome = service
        .search(&SearchRequest::new("joke").with_max_results(2))
        .await
        .unwrap();
    match outcome {
        SearchOutcome::Clarification {
            prompt, categories, ..
        } => {
            assert_eq!(categories, vec!["animals", "programming"]);
            assert_eq!(prompt, "Did you mean a joke about animals or programming?");
        }
        other => panic!("expected clarification, got {other:?}"),
    }
}

#[tokio::test]
async fn test_shared_word_does_not_settle_a_tie() {
    let service = keyword_service(vec![
        NewJoke::new("A programmer tells a joke", "programming", &[]),
        NewJoke::new("A dog tells a joke", "animals", &[]),
    ])
    .await;

    // both jokes contain the query word and score the same
    let outcome = service
        .search(&SearchRequest::new("joke").with_max_results(2))
        .await
        .unwrap();
    match outcome {
        SearchOutcome::Clarification { categories, .. } => {
            assert_eq!(categories, vec!["animals", "programming"]);
        }
        other => panic!("expected clarification, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_corpus_is_no_match() {
    let service = hashed_service(Vec::new()).await;
    let outcome = service.search(&SearchRequest::new("anything")).await.unwrap();
    assert_eq!(outcome, SearchOutcome::NoMatch);
    assert!(service.random_joke().await.unwrap().is_none());
}

#[tokio::test]
async fn test_feedback_counts_accumulate() {
    let service = hashed_service(sample_jokes()).await;
    let id = service
        .find_by_text("What do you call a fake noodle? An impasta!")
        .await
        .unwrap()
        .unwrap()
        .id;

    service.submit_feedback(id, true, None).await.unwrap();
    service.submit_feedback(id, true, None).await.unwrap();
    service
        .submit_feedback(id, false, Some("heard it".to_string()))
        .await
        .unwrap();
    let stats = service.submit_feedback(id, true, None).await.unwrap();

    assert_eq!(stats.like_count, 3);
    assert_eq!(stats.dislike_count, 1);

    let joke = service.get_joke(id).await.unwrap();
    assert_eq!((joke.like_count, joke.dislike_count), (3, 1));
    assert_eq!(service.stats().await.unwrap().total_feedback, 4);
}

#[tokio::test]
async fn test_feedback_for_unknown_joke() {
    let service = hashed_service(sample_jokes()).await;
    let result = service.submit_feedback(9_999, true, None).await;
    assert!(matches!(result, Err(JokeError::NotFound(9_999))));
}

#[tokio::test]
async fn test_added_joke_is_retrievable() {
    let service = hashed_service(sample_jokes()).await;
    let text = "I would tell you a UDP joke, but you might not get it.";

    let stored = service
        .add_joke(NewJoke::new(text, "tech", &["networking"]))
        .await
        .unwrap();
    assert_eq!(stored.id, 6);

    let outcome = service.search(&SearchRequest::new(text)).await.unwrap();
    assert_eq!(outcome.candidates()[0].joke.id, stored.id);
}

#[tokio::test]
async fn test_import_skips_duplicates() {
    let service = hashed_service(sample_jokes()).await;
    let mut records = loader::sample_records();
    records.push(JokeRecord {
        text: "Parallel lines have so much in common. It's a shame they'll never meet.".to_string(),
        category: Some("math".to_string()),
        tags: vec!["geometry".to_string()],
        source: None,
    });
    records.push(records[5].clone());
    records.push(JokeRecord {
        text: "   ".to_string(),
        category: None,
        tags: Vec::new(),
        source: None,
    });

    let summary = loader::import_records(&service, records, 4).await.unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.skipped, 6);
    assert_eq!(summary.failed, 1);
    assert_eq!(service.stats().await.unwrap().total_jokes, 6);
}
