use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kanban_board::board::Board;
use kanban_board::cli::{self, Cli};
use kanban_board::config::Config;
use kanban_board::db::Database;
use kanban_board::persistence::MemoryStore;

/// Initialize tracing on stderr so stdout carries only rendered output.
fn init_tracing(fallback: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .ok()
            .or_else(|| fallback.map(str::to_string))
            .unwrap_or_else(|| "kanban_board=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load();
    init_tracing(config.log_filter.as_deref());

    let mut stdout = std::io::stdout().lock();

    if cli.ephemeral {
        let mut board = Board::new(MemoryStore::new());
        return cli::run(cli.command, &mut board, &mut stdout);
    }

    let path = match cli.database {
        Some(path) => path,
        None => config.database_path()?,
    };
    tracing::debug!("Using database {}", path.display());

    let db = Database::open(&path)?;
    db.migrate()?;
    let mut board = Board::load(db)?;

    cli::run(cli.command, &mut board, &mut stdout)
}
