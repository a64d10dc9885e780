use std::path::PathBuf;
use std::process::ExitCode;

use checkpoint::{
    load_games_files, summarize, write_metadata_csv, write_summary, CheckpointError, StoreConfig,
};
use clap::Parser;
use completion::PipelineConfig;

#[derive(Parser, Debug)]
struct Params {
    /// Directory holding `<provider>/games.json` files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Where to write the summary, defaults to `<output_dir>/catalog_summary.json`
    #[arg(short, long)]
    summary: Option<PathBuf>,
    /// Where to write the per-game CSV, defaults to `<output_dir>/games_metadata.csv`
    #[arg(short, long)]
    metadata: Option<PathBuf>,
    /// Pipeline YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum SummaryError {
    #[error(transparent)]
    Config(#[from] completion::CompletionError),
    #[error(transparent)]
    Store(#[from] CheckpointError),
}

async fn run(args: Params) -> Result<(), SummaryError> {
    let pipeline = PipelineConfig::load(args.config.as_deref())?;
    let store_config =
        StoreConfig::from_cli_or_env_or_yaml(None, args.output_dir, Some(&pipeline.store));
    let files = load_games_files(&store_config.output_dir).await?;
    let summary = summarize(&files, chrono::Utc::now());
    let path = args
        .summary
        .unwrap_or_else(|| store_config.output_dir.join("catalog_summary.json"));
    write_summary(&path, &summary).await?;
    let metadata_path = args
        .metadata
        .unwrap_or_else(|| store_config.output_dir.join("games_metadata.csv"));
    let rows = write_metadata_csv(&metadata_path, &store_config.output_dir, &files).await?;

    println!(
        "{} providers, {} games ({} duplicates removed, {} blocked) -> {}",
        summary.total_providers,
        summary.total_games,
        summary.duplicates_removed,
        summary.blocked_games,
        path.display()
    );
    for (name, count) in &summary.top_providers {
        println!("  {name}: {count}");
    }
    println!("{rows} game rows -> {}", metadata_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Params::parse();
    log::info!("args: {args:?}");
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
