//! topiclog CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use topiclog::cli::{Cli, Commands};

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Topics => topiclog::cli::commands::topics::execute(&cli.global, cli.json),
        Commands::Emit(args) => topiclog::cli::commands::emit::execute(&cli.global, args, cli.json),
    };

    if let Err(err) = result {
        topiclog::cli::handle_error(err, cli.json);
    }
}
