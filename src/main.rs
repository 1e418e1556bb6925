use clap::{Parser, Subcommand};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use wip_invoice::commands;
use wip_invoice::config::{SETTINGS_FILE, Settings};
use wip_invoice::error::AppResult;

// ==========================================
// Structs & Enums
// ==========================================

#[derive(Parser)]
#[command(name = "wip-invoice", version, about = "Generate an invoice from the WIP rows of the time-tracking sheet")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mark the current WIP rows as billed (asks first)
    Bill {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
        /// Only bill the WIP rows of this invoice, e.g. NES01-5541
        #[arg(long)]
        invoice: Option<String>,
    },
    /// Reapply the billed highlight to every billed row of an invoice
    FixColors {
        /// Invoice number, e.g. NES01-5541
        #[arg(long)]
        invoice: String,
    },
    /// Show the last rows of the worksheet
    Recent {
        #[arg(long, default_value_t = 20)]
        count: usize,
    },
    /// Validate settings and credentials, then try reading the sheet
    Check,
}

// ==========================================
// Main Function
// ==========================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    let config_path = Path::new(SETTINGS_FILE);

    let result = match cli.command {
        Some(Commands::Check) => commands::check(config_path),
        command => run(command, config_path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("❌ Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run(command: Option<Commands>, config_path: &Path) -> AppResult<()> {
    let settings = Settings::load(config_path)?;

    match command {
        None => commands::generate(&settings),
        Some(Commands::Bill { yes, invoice }) => commands::bill(&settings, yes, invoice.as_deref()),
        Some(Commands::FixColors { invoice }) => commands::fix_colors(&settings, &invoice),
        Some(Commands::Recent { count }) => commands::recent(&settings, count),
        Some(Commands::Check) => commands::check(config_path),
    }
}
