use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use screenpilot::{
    load_config, ActionExecutor, AgentEngine, NativeDesktop, OpenAiCompatibleEndpoint,
    PilotResult,
};

#[derive(Debug, Parser)]
#[command(name = "screenpilot", version, about = "Tool-calling desktop automation agent")]
struct Cli {
    /// Path to config.toml (defaults to next to the executable, then the working directory).
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_steps: Option<usize>,

    /// Directory screenshots are written to.
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    #[arg(long)]
    system_prompt_file: Option<PathBuf>,

    /// Task for the agent, joined with spaces.
    #[arg(required = true, num_args = 1..)]
    task: Vec<String>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(answer) => println!("{answer}"),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> PilotResult<String> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(max_steps) = cli.max_steps {
        config.agent.max_steps = max_steps;
    }
    if let Some(dir) = cli.dump_dir {
        config.capture.dump_dir = dir;
    }
    if let Some(path) = cli.system_prompt_file {
        config.prompts.system_prompt = None;
        config.prompts.system_prompt_file = Some(path);
    }
    let system_prompt = config.system_prompt()?;
    let task = cli.task.join(" ");

    let endpoint = Arc::new(OpenAiCompatibleEndpoint::from_config(&config.endpoint)?);
    let executor = ActionExecutor::new(Arc::new(NativeDesktop), &config.capture, &config.agent)?;
    let mut engine = AgentEngine::new(
        endpoint,
        executor,
        &config.agent,
        config.capture.keep_last_screenshots,
    )?;

    let outcome = engine.run(&system_prompt, &task).await?;
    tracing::info!(
        steps = outcome.steps,
        finish = ?outcome.finish,
        "run finished"
    );
    Ok(outcome.answer)
}
