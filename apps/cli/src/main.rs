//! LessonForge CLI — web-scraping knowledge-base generator for lessons.
//!
//! Expands a topic into subtopics, collects web sources, synthesizes
//! structured lesson documents, and stores them with retrieval indexes.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
