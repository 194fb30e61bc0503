//! Information display handlers (stats, config)

use crate::cli::output::*;
use crate::retrieval::JokeService;
use crate::AppConfig;
use crate::Result;

pub async fn handle_stats_command(service: &JokeService) -> Result<()> {
    let stats = service.stats().await?;
    print_stats(&stats);
    Ok(())
}

pub fn handle_config_command(config: &AppConfig) -> Result<()> {
    print_config(config);
    Ok(())
}
