use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

mod cli;
mod prefs;
mod runtime;
mod script;

use cli::Args;
use prefs::PlayerPrefs;
use runtime::EngineRuntime;
use script::parse_script;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut prefs = PlayerPrefs::from_json_file(args.prefs.as_deref())
        .context("loading player preferences")?;
    if args.verbose {
        prefs.verbose = true;
    }
    if let Some(path) = args.write_prefs.as_deref() {
        prefs.to_json_file(path)?;
    }

    let source = fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script: {}", args.script.display()))?;
    let commands = parse_script(&source)
        .with_context(|| format!("failed to parse script: {}", args.script.display()))?;
    info!("running {} commands from {}", commands.len(), args.script.display());

    let mut engine = EngineRuntime::new(&prefs);
    engine.run(&commands)?;
    engine.idle(args.idle_ticks);

    for event in engine.events() {
        println!("{event}");
    }

    let report = engine.report();
    if let Some(path) = args.report_json.as_deref() {
        let json = serde_json::to_string_pretty(&report).context("serializing run report")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write report: {}", path.display()))?;
    }
    println!(
        "script.done {} commands ({} unknown keywords)",
        report.commands_run, report.invalid_keywords
    );
    Ok(())
}
