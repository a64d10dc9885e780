use std::path::PathBuf;
use std::process::ExitCode;

use checkpoint::{CheckpointStore, JsonFileStore, NoopStore, StoreConfig};
use clap::Parser;
use completion::{resolve_providers, CompletionDriver, CompletionError, PipelineConfig};
use fetchers::CommandFetcher;

#[derive(Parser, Debug)]
struct Params {
    /// Provider slug or display name, repeatable
    #[arg(short, long)]
    provider: Vec<String>,
    /// Run every provider in the catalog, one after another
    #[arg(short, long)]
    all: bool,
    /// Pipeline YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    concurrency: Option<usize>,
    /// Fetch and merge without writing checkpoints
    #[arg(long)]
    dry_run: bool,
}

async fn run(args: Params) -> Result<bool, CompletionError> {
    let mut pipeline = PipelineConfig::load(args.config.as_deref())?;
    if let Some(concurrency) = args.concurrency {
        pipeline.completion.concurrency = concurrency;
    }
    if pipeline.fetcher.program.trim().is_empty() {
        return Err(CompletionError::Fetcher(
            "no fetch program configured".to_string(),
        ));
    }
    let providers = resolve_providers(&args.provider, args.all)?;

    let store: Box<dyn CheckpointStore> = if args.dry_run {
        Box::new(NoopStore)
    } else {
        let store_config = StoreConfig::from_cli_or_env_or_yaml(
            args.checkpoint_dir,
            args.output_dir,
            Some(&pipeline.store),
        );
        log::info!("store: {store_config:?}");
        Box::new(JsonFileStore::new(&store_config))
    };
    let fetcher = CommandFetcher::new(pipeline.fetcher.clone());
    let mut driver = CompletionDriver::new(pipeline.completion.clone(), fetcher, store)?;

    let mut all_succeeded = true;
    let results = driver.run_each(&providers).await;
    for (provider, result) in providers.iter().zip(results) {
        match result {
            Ok(report) => {
                println!("{report}");
                all_succeeded &= report.outcome.is_success();
            }
            Err(err) => {
                eprintln!("{provider}: error: {err}");
                all_succeeded = false;
            }
        }
    }
    Ok(all_succeeded)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Params::parse();
    log::info!("args: {args:?}");
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
