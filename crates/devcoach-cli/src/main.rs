mod cmd;
mod output;
mod root;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use cmd::{
    block::BlockSubcommand, coach::CoachSubcommand, config::ConfigSubcommand,
    trigger::TriggerSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "devcoach",
    about = "Work queue, work blocks and coaching nudges for one developer's GitHub backlog",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .devcoach/ or .git/)
    #[arg(long, global = true, env = "DEVCOACH_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Evaluate as of this instant (RFC 3339; default: now)
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score and order every open item (Math Test Method)
    Queue {
        /// JSON array of fetcher records
        #[arg(long)]
        items: PathBuf,
    },

    /// Show the top recommendations with reasons
    Recommend {
        /// JSON array of fetcher records
        #[arg(long)]
        items: PathBuf,
        /// How many to show (default: queue.recommendation_count)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Report repository hygiene problems
    Health {
        /// JSON array of fetcher records
        #[arg(long)]
        items: PathBuf,
    },

    /// Start, advance and end work blocks
    Block {
        #[command(subcommand)]
        subcommand: BlockSubcommand,
    },

    /// Weekly coaching mode
    Coach {
        #[command(subcommand)]
        subcommand: CoachSubcommand,
    },

    /// Ask whether a proactive nudge should fire
    Trigger {
        #[command(subcommand)]
        subcommand: TriggerSubcommand,
    },

    /// Record user activity (resets the idle clock)
    Activity,

    /// Habit signals from recorded work blocks
    Stats,

    /// Show or validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let now = cli.now.unwrap_or_else(Utc::now);

    let result = match cli.command {
        Commands::Queue { items } => cmd::queue::run_queue(&items, now, cli.json),
        Commands::Recommend { items, limit } => {
            cmd::queue::run_recommend(&root, &items, limit, now, cli.json)
        }
        Commands::Health { items } => cmd::queue::run_health(&root, &items, now, cli.json),
        Commands::Block { subcommand } => cmd::block::run(&root, subcommand, now, cli.json),
        Commands::Coach { subcommand } => cmd::coach::run(&root, subcommand, now, cli.json),
        Commands::Trigger { subcommand } => cmd::trigger::run(&root, subcommand, now, cli.json),
        Commands::Activity => cmd::trigger::record_activity(&root, now, cli.json),
        Commands::Stats => cmd::stats::run(&root, now, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
