use clap::{Parser, Subcommand};
use std::path::PathBuf;

use story_audio_api::config::AppConfig;
use story_audio_api::{db, seed, serve};

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-story listening platform backend")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API server
    Serve {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create the database schema without starting the server
    Init {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Load stories and chapters from a seed file
    Seed {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,

        /// Path to seed data file (TOML format)
        #[arg(short, long)]
        data: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Command::Serve { config } => {
            let config = AppConfig::load(&config)?;
            serve::serve_api(config)
        }
        Command::Init { config } => {
            let config = AppConfig::load(&config)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                let pool = db::open_database(&config.database_path).await?;
                db::init_database_schema(&pool).await?;
                println!("Initialized schema in {}", config.database_path.display());
                Ok::<(), Box<dyn std::error::Error>>(())
            })
        }
        Command::Seed { config, data } => {
            let config = AppConfig::load(&config)?;
            seed::run_seed(&config, &data)
        }
    }
}
