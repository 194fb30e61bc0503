//! Search and feedback handlers

use crate::api::types::SearchResponse;
use crate::cli::commands::SearchArgs;
use crate::cli::output::*;
use crate::models::parse_joke_id;
use crate::retrieval::JokeService;
use crate::retrieval::SearchRequest;
use crate::Result;

pub async fn handle_search_command(service: &JokeService, args: SearchArgs) -> Result<()> {
    let mut request = SearchRequest::new(args.query).with_max_results(args.max_results);
    if let Some(context) = args.context {
        request = request.with_context(context);
    }

    let outcome = service.search(&request).await?;
    let response = SearchResponse::from(outcome);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_search_response(&response);
    }
    Ok(())
}

pub async fn handle_feedback_command(
    service: &JokeService,
    id: &str,
    liked: bool,
    comment: Option<String>,
) -> Result<()> {
    let joke_id = parse_joke_id(id)?;
    let stats = service.submit_feedback(joke_id, liked, comment).await?;

    print_success(&format!(
        "Recorded {} for joke {}",
        if liked { "👍 like" } else { "👎 dislike" },
        joke_id
    ));
    println!("   likes: {} | dislikes: {}", stats.like_count, stats.dislike_count);
    Ok(())
}
