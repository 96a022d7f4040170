//! huginn: command-line front end for the AI gateway.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use huginn::{
    Coach, CompletionOptions, GatewayConfig, GoalCategory, GoalContext, Huginn, HuginnError,
};

/// Huginn CLI
#[derive(Parser)]
#[command(name = "huginn")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Cached, rate-limited AI requests from the command line")]
struct Args {
    /// Config file (default: ~/.huginn/config.toml, then /etc/huginn/config.toml)
    #[arg(short, long, env = "HUGINN_CONFIG")]
    config: Option<PathBuf>,

    /// Completion token budget
    #[arg(long, default_value_t = 500)]
    max_tokens: u32,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.7)]
    temperature: f32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a single prompt (cached)
    Ask {
        /// Prompt text (or omit to read from stdin)
        prompt: Option<String>,
    },

    /// Suggest to-dos for a goal
    Todos {
        /// Goal title
        #[arg(long)]
        title: String,
        /// Goal description
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_enum, default_value_t = Category::Personal)]
        category: Category,
    },

    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Drop every cached response (memory and disk)
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum Category {
    Personal,
    Business,
    Wellness,
}

impl From<Category> for GoalCategory {
    fn from(category: Category) -> Self {
        match category {
            Category::Personal => GoalCategory::Personal,
            Category::Business => GoalCategory::Business,
            Category::Wellness => GoalCategory::Wellness,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = GatewayConfig::load(args.config.as_deref())?;

    let gateway = Huginn::builder()
        .config(&config)
        .store(Arc::new(config.file_store()))
        .build()?;

    let options = CompletionOptions::new()
        .max_tokens(args.max_tokens)
        .temperature(args.temperature);

    match args.command {
        Command::Ask { prompt } => {
            let prompt = resolve_text(prompt, "ask")?;
            if !gateway.is_configured() {
                return Err("no AI provider configured (set OPENAI_API_KEY)".into());
            }
            match gateway.complete(&prompt, &options).await {
                Ok(Some(text)) => println!("{text}"),
                Ok(None) => eprintln!("no answer from the AI provider"),
                Err(e) => return Err(user_message(e).into()),
            }
        }

        Command::Todos {
            title,
            description,
            category,
        } => {
            let mut goal = GoalContext::new(title, category.into());
            if let Some(description) = description {
                goal = goal.description(description);
            }
            let coach = Coach::new(gateway).options(options);
            let todos = coach.generate_todos(&goal).await.map_err(user_message)?;
            if todos.is_empty() {
                println!("no suggestions");
            }
            for todo in todos {
                match todo.estimated_minutes {
                    Some(minutes) => {
                        println!("[{:?}] {} (~{minutes} min)", todo.priority, todo.title)
                    }
                    None => println!("[{:?}] {}", todo.priority, todo.title),
                }
            }
        }

        Command::Cache {
            action: CacheAction::Clear,
        } => {
            gateway.cache().clear();
            println!("cache cleared");
        }
    }

    Ok(())
}

fn user_message(error: HuginnError) -> String {
    match error.retry_after() {
        Some(wait) => format!("{error} (retry in {}s)", wait.as_secs().max(1)),
        None => error.to_string(),
    }
}

fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(text) = arg {
        return Ok(text);
    }
    if io::stdin().is_terminal() {
        return Err(
            format!("{command}: no input provided (pass text as argument or via stdin)").into(),
        );
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        return Err(format!("{command}: empty input").into());
    }
    Ok(trimmed.to_string())
}
