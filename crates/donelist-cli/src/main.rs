//! donelist - a terminal client for a personal todo service.
//!
//! Every command restores the saved session first; commands that need a
//! logged-in user are gated the same way the todo list view is.

use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use donelist_core::models::NewTodo;
use donelist_core::navigation::{Route, DEFAULT_PATH};
use donelist_core::{ApiError, Config, SessionContext};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "donelist", version, about = "Manage your todo list from the terminal")]
struct Cli {
    /// Backend URL (without the /api prefix)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session
    Login { username: Option<String> },
    /// Create an account
    Register { username: String },
    /// Forget the stored session
    Logout,
    /// Show who is logged in and until when
    Status,
    /// Navigate to a view and print where the guards let you in
    Open { path: String },
    /// List todos
    List,
    /// Add a todo
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Mark a todo as completed
    Done { id: i64 },
    /// Delete a todo
    Remove { id: i64 },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "donelist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(url) = cli.base_url.clone() {
        config.base_url = url;
    }

    let _guard = init_tracing(config.log_dir.as_deref());
    info!(base_url = %config.base_url, "donelist starting");

    let ctx = SessionContext::from_config(&config)?;
    run(cli.command, &ctx, &mut config).await
}

async fn run(command: Command, ctx: &SessionContext, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { username } => {
            ctx.start("/login");
            let username = username
                .or_else(|| config.last_username.clone())
                .context("No username given and none remembered")?;
            let password = rpassword::prompt_password(format!("Password for {}: ", username))?;

            let user = ctx.login(&username, &password).await.map_err(explain)?;
            config.last_username = Some(user.username.clone());
            config.save()?;
            println!("Logged in as {}", user.username);
        }
        Command::Register { username } => {
            ctx.start("/register");
            let password = rpassword::prompt_password("Choose a password: ")?;
            let confirm = rpassword::prompt_password("Repeat password: ")?;
            if password != confirm {
                bail!("Passwords do not match");
            }
            let user = ctx.api().register(&username, &password).await.map_err(explain)?;
            println!("Registered {}. Run `donelist login {}` to sign in.", user.username, user.username);
        }
        Command::Logout => {
            ctx.start(DEFAULT_PATH);
            ctx.logout();
            println!("Logged out");
        }
        Command::Status => {
            ctx.start(DEFAULT_PATH);
            let session = ctx.session();
            match (session.is_authenticated(), session.user(), session.expires_at()) {
                (true, user, expires_at) => {
                    let who = user.map(|u| u.username).unwrap_or_else(|| "unknown user".to_string());
                    match expires_at {
                        Some(at) => println!("Logged in as {} until {}", who, at.to_rfc2822()),
                        None => println!("Logged in as {}", who),
                    }
                }
                (false, _, _) => println!("Not logged in"),
            }
        }
        Command::Open { path } => {
            let entered = ctx.start(&path);
            let route = Route::resolve(&entered);
            if entered == path {
                println!("{} ({})", entered, route.name());
            } else {
                println!("{} ({}), redirected from {}", entered, route.name(), path);
            }
        }
        Command::List => {
            require_login(ctx)?;
            let todos = ctx.api().list_todos().await.map_err(explain)?;
            if todos.is_empty() {
                println!("Nothing to do");
            }
            for todo in todos {
                let mark = if todo.completed { "x" } else { " " };
                match todo.due {
                    Some(due) => println!("[{}] {:>4}  {}  (due {})", mark, todo.id, todo.title, due.format("%Y-%m-%d %H:%M")),
                    None => println!("[{}] {:>4}  {}", mark, todo.id, todo.title),
                }
            }
        }
        Command::Add { title, description } => {
            require_login(ctx)?;
            let new_todo = NewTodo {
                description,
                ..NewTodo::titled(title)
            };
            let todo = ctx.api().create_todo(&new_todo).await.map_err(explain)?;
            println!("Added #{}: {}", todo.id, todo.title);
        }
        Command::Done { id } => {
            require_login(ctx)?;
            let todos = ctx.api().list_todos().await.map_err(explain)?;
            let mut todo = todos
                .into_iter()
                .find(|t| t.id == id)
                .with_context(|| format!("No todo with id {}", id))?;
            todo.completed = true;
            ctx.api().update_todo(&todo).await.map_err(explain)?;
            println!("Completed #{}: {}", todo.id, todo.title);
        }
        Command::Remove { id } => {
            require_login(ctx)?;
            ctx.api().delete_todo(id).await.map_err(explain)?;
            println!("Removed #{}", id);
        }
    }
    Ok(())
}

/// Enter the todo list view, failing if the guard sends us elsewhere.
fn require_login(ctx: &SessionContext) -> Result<()> {
    let entered = ctx.start(DEFAULT_PATH);
    if entered != DEFAULT_PATH {
        bail!("Not logged in. Run `donelist login` first.");
    }
    Ok(())
}

fn explain(error: ApiError) -> anyhow::Error {
    if error.is_auth_failure() {
        anyhow::anyhow!("{}. Run `donelist login` to start a new session.", error)
    } else {
        error.into()
    }
}
