//! Interactive browser agent
//!
//! Type a task at the prompt; the agent works on it until it needs you again. Lines starting with a
//! command word (`exit`, `log`, `headful`, `headless`, `help`) are handled by the REPL instead.

use anyhow::Context;
use browser_pilot::{actor::{ActorConfig, ActorStrategyId, build_actor},
                    afford::AffordanceStrategyId,
                    browser::{BrowserSession, ChromeDriver, LaunchOptions, SessionOptions},
                    dom::RenderOptions,
                    llm::{ChatCompletion, OpenAiChatModel, OpenAiConfig},
                    runner::{Runner, RunnerOptions},
                    trajectory::SharedTrajectory};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  exit      close the browser and quit
  log       write the run log now
  headful   reopen the current page in a visible browser
  headless  reopen the current page in a headless browser
  help      show this message
Anything else is sent to the agent as a task.";

#[derive(Parser)]
#[command(name = "browser-pilot")]
#[command(version)]
#[command(about = "Drive a browser with natural-language tasks", long_about = None)]
struct Cli {
    /// Show the browser window (default: headless)
    #[arg(long)]
    headful: bool,

    /// Page to open before the first task
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Actor strategy, outermost first; repeat to chain (base_llm, reflexion, verification)
    #[arg(long = "actor-strategy", value_name = "ID", default_value = "base_llm")]
    actor_strategy: Vec<String>,

    /// Affordance strategy (function_afforder, filter_afforder)
    #[arg(long, value_name = "ID", default_value = "function_afforder")]
    afforder_strategy: String,

    /// Maximum steps per task before control returns to you
    #[arg(long, default_value_t = 5)]
    max_steps: usize,

    /// Directory for traj.txt, display.md and display.html
    #[arg(long, value_name = "DIR", default_value = "log")]
    log_dir: PathBuf,

    /// Serve the shared key/value relay on this port
    #[arg(long, value_name = "PORT")]
    relay_port: Option<u16>,

    /// Items shown per page list before the rest are elided (0 shows every item)
    #[arg(long, value_name = "N", default_value_t = 5)]
    max_list_items: usize,

    /// Rounds of self-critique for the reflexion strategy
    #[arg(long, default_value_t = 3)]
    reflexion_iterations: usize,

    /// Chat model to use (overrides OPENAI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Log at debug level
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.verbose {
        "debug"
    } else {
        "warn"
    }))
    .init();

    let mut openai = OpenAiConfig::from_env().context("OPENAI_API_KEY must be set")?;
    if let Some(model) = &cli.model {
        openai = openai.model(model);
    }
    let model: Arc<dyn ChatCompletion> = Arc::new(OpenAiChatModel::new(openai)?);

    let chain = cli
        .actor_strategy
        .iter()
        .map(|id| id.parse::<ActorStrategyId>())
        .collect::<Result<Vec<_>, _>>()?;
    let config = ActorConfig::new()
        .chain(chain)
        .affordance(cli.afforder_strategy.parse::<AffordanceStrategyId>()?)
        .max_num_iterations(cli.reflexion_iterations);
    let actor = build_actor(&config, model)?;

    let launch = LaunchOptions::new().headless(!cli.headful);
    let render = RenderOptions::new().max_list_items((cli.max_list_items > 0).then_some(cli.max_list_items));
    let session = Arc::new(BrowserSession::launch(launch, SessionOptions::new().render(render))?);
    let options = RunnerOptions::new().max_num_steps(cli.max_steps).log_dir(Some(cli.log_dir.clone()));
    let runner = match &cli.url {
        Some(url) => Runner::from_initial_page(url, session, actor, options).await?,
        None => Runner::new(session, actor, SharedTrajectory::default(), options),
    };

    println!(
        "browser-pilot v{}: actor {:?}, afforder {}, at most {} steps per task, logs in {}",
        env!("CARGO_PKG_VERSION"),
        config.resolved_chain()?,
        config.affordance,
        cli.max_steps,
        cli.log_dir.display()
    );
    if let Some(port) = cli.relay_port {
        start_relay(&runner, port)?;
    }
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" => break,
            "help" => println!("{}", HELP),
            "log" => match runner.log().await {
                Ok(()) => println!("wrote run log to {}", cli.log_dir.display()),
                Err(e) => eprintln!("failed to write run log: {}", e),
            },
            "headful" | "headless" => {
                let launch = LaunchOptions::new().headless(line == "headless");
                match ChromeDriver::launch(launch) {
                    Ok(driver) => {
                        if let Err(e) = runner.session().replace_driver(Box::new(driver)).await {
                            eprintln!("failed to switch browser: {}", e);
                        }
                    }
                    Err(e) => eprintln!("failed to launch browser: {}", e),
                }
            }
            task => {
                runner.add_user_message(task);
                run_task(&runner).await;
            }
        }
    }

    runner.terminate().await?;
    Ok(())
}

/// Stream one task to the terminal; Ctrl-C stops it and returns to the prompt
async fn run_task(runner: &Runner) {
    let mut stream = runner.run_and_stream();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("interrupted");
                break;
            }
            item = stream.next_item() => match item {
                Some(Ok(item)) => println!("{}", item.abbreviated_text()),
                Some(Err(e)) => {
                    eprintln!("error: {}", e);
                    break;
                }
                None => break,
            },
        }
    }
}

#[cfg(feature = "relay")]
fn start_relay(runner: &Runner, port: u16) -> anyhow::Result<()> {
    let store = browser_pilot::relay::SharedStore::new(runner.shared_trajectory());
    let cancel = runner.cancellation_token();
    tokio::spawn(async move {
        if let Err(e) = browser_pilot::relay::serve(store, port, cancel).await {
            log::warn!("Relay stopped: {}", e);
        }
    });
    println!("relay listening on port {}", port);
    Ok(())
}

#[cfg(not(feature = "relay"))]
fn start_relay(_runner: &Runner, port: u16) -> anyhow::Result<()> {
    anyhow::bail!("--relay-port {} needs the `relay` feature", port)
}
