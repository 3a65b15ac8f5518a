use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_sync::client::{HttpTodoApi, SyncState, TodoSynchronizer};
use todo_sync::config::ClientConfig;

#[derive(Parser, Debug)]
#[command(name = "todo")]
#[command(about = "Manage the todo list on a todo-sync server", long_about = None)]
struct Cli {
    /// Server base URL (overrides TODO_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show all todos
    List,
    /// Add a todo
    Add {
        /// Title words, joined with spaces
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Flip a todo between open and done
    Toggle { id: String },
    /// Delete a todo
    Rm { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "todo_sync=warn".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let api_url = cli
        .api_url
        .unwrap_or_else(|| ClientConfig::new_from_env().api_url);

    let sync = TodoSynchronizer::new(HttpTodoApi::new(&api_url)?);
    sync.activate().await?;

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => {}
        Commands::Add { title } => {
            let todo = sync.add(&title.join(" ")).await?;
            println!("added {}", todo.id);
        }
        Commands::Toggle { id } => {
            sync.toggle(&id).await?;
        }
        Commands::Rm { id } => {
            sync.remove(&id).await?;
            println!("removed {}", id);
        }
    }

    print!("{}", render(&sync.snapshot()));
    Ok(())
}

fn render(state: &SyncState) -> String {
    if state.todos.is_empty() {
        return "no todos\n".to_string();
    }
    state
        .todos
        .iter()
        .map(|todo| {
            let mark = if todo.completed { "x" } else { " " };
            format!("[{}] {}  ({})\n", mark, todo.title, todo.id)
        })
        .collect()
}
