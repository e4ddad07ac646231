use anyhow::Result;
use clap::Parser;
use std::time::Duration;

use helferlein::{
    cli::Cli,
    client::UploadBatch,
    runtime::{resolve_config, start_session, NonInteractiveRunner, Orchestrator},
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(prompt) = cli.prompt.clone() {
        run_non_interactive(cli, prompt).await
    } else {
        // Interactive mode logs to a file once the orchestrator knows where
        let orchestrator = Orchestrator::new(cli)?;
        orchestrator.run().await
    }
}

/// Upload the given files, ask one question, print the answer
async fn run_non_interactive(cli: Cli, prompt: String) -> Result<()> {
    init_logger(cli.verbose);

    let config = resolve_config(&cli)?;
    let handle = start_session(&config)?;

    let mut runner = NonInteractiveRunner::new(
        handle.session,
        handle.events,
        config.server.url.clone(),
        Duration::from_secs(cli.timeout),
    );

    let batch = UploadBatch::new(cli.test_files.clone(), cli.solution_file.clone());
    let result = runner.execute(batch, prompt).await;

    if let Some(task) = handle.channel_task {
        task.abort();
    }

    let result = result?;
    println!("{}", runner.format_result(&result, cli.output_format));

    if !result.errors.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
