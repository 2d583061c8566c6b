use clap::{ArgAction, Parser, Subcommand};
use samplegen::cli::run::{CompileOptions, OutputFormat};
use samplegen::config::resolve_config_path;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "samplegen")]
#[command(about = "Compile eventgen-style sample stanzas into a generation descriptor", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Compile {
        /// Owning app for stanzas without eai:acl
        #[arg(long)]
        app: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "samplegen=warn",
        1 => "samplegen=info",
        2 => "samplegen=debug",
        _ => "samplegen=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Compile {
            app,
            format,
            output,
        }) => {
            let options = CompileOptions { app, format, output };
            samplegen::cli::run::run(config_path, options)?;
        }
        None => {
            samplegen::cli::run::run(config_path, CompileOptions::default())?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                samplegen::cli::config::init(stdout)?;
            }
        },
    }

    Ok(())
}
