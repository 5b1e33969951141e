use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Headless host that runs panoramic scene scripts",
    version
)]
pub struct Args {
    /// Path to the scene script to run
    pub script: PathBuf,

    /// Optional JSON preferences file
    #[arg(long)]
    pub prefs: Option<PathBuf>,

    /// Idle passes to run after the script finishes
    #[arg(long, default_value_t = 8)]
    pub idle_ticks: u32,

    /// Print every runtime event instead of the compact summary
    #[arg(long)]
    pub verbose: bool,

    /// Path to write the run report as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Path to write the effective preferences back out as JSON
    #[arg(long)]
    pub write_prefs: Option<PathBuf>,
}
