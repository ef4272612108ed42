// src/main.rs
//
// Entry dispatch: no command (or `server`) runs the HTTP service,
// `convert` is the one-shot CLI path.

use clap::{Parser, Subcommand};

use jpegme::cli::{self, ConvertArgs};
use jpegme::server;

#[derive(Parser)]
#[command(
    name = "jpegme",
    version,
    about = "Iterative lossy image degradation - generation loss as a service"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (the default when no command is given)
    Server,
    /// Degrade a local image file and write the result
    Convert(ConvertArgs),
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        None | Some(Command::Server) => {
            if let Err(e) = server::run().await {
                log::error!("server failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Command::Convert(args)) => {
            if let Err(e) = cli::run(&args) {
                log::error!("{e}");
                std::process::exit(1);
            }
        }
    }
}
