use std::fs;
use std::process::Command;

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::tempdir;

const DEMO_SCRIPT: &str = "\
// plaza walkthrough
OpenSceneFile plaza 1
PlayTransEffect 1 crossfade * 2 4
PlaySceneSound 6 wind.snd loop
PlayNodeSound 5 fountain.snd loop
GoToNodeID 2
MadeUpKeyword 1 2
Beep
";

#[test]
fn demo_script_transcript_and_report() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory")?;
    let script_path = temp_dir.path().join("plaza.pano");
    fs::write(&script_path, DEMO_SCRIPT).context("writing demo script")?;
    let report_path = temp_dir.path().join("report.json");

    let output = Command::new(env!("CARGO_BIN_EXE_pano_engine"))
        .arg(&script_path)
        .args(["--idle-ticks", "4"])
        .arg("--report-json")
        .arg(&report_path)
        .output()
        .context("executing pano_engine")?;

    assert!(
        output.status.success(),
        "pano_engine exited with {:?}",
        output.status
    );

    let transcript = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(
        transcript.contains("scene.open plaza node 1"),
        "scene open marker missing: {transcript}"
    );
    assert!(
        transcript.contains("transition.setup 1"),
        "transition setup marker missing: {transcript}"
    );
    assert!(
        transcript.contains("transition.teardown 1"),
        "transition teardown marker missing: {transcript}"
    );
    assert!(
        transcript.contains("sound.release fountain.snd"),
        "node-bound sound survived the hop: {transcript}"
    );
    assert!(
        transcript.contains("command.invalid MadeUpKeyword line 7"),
        "unknown keyword marker missing: {transcript}"
    );
    assert!(
        transcript.contains("script.done 6 commands (1 unknown keywords)"),
        "summary line missing: {transcript}"
    );

    let raw = fs::read_to_string(&report_path).context("reading run report")?;
    let report: Value = serde_json::from_str(&raw).context("parsing run report")?;
    assert_eq!(report["scene"]["node"], 2);
    assert_eq!(report["invalid_keywords"], 1);
    assert_eq!(report["registry"]["sounds"], 1);
    assert_eq!(report["registry"]["effects"], 1);

    Ok(())
}

#[test]
fn missing_script_fails_with_context() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_pano_engine"))
        .arg("no-such-script.pano")
        .output()
        .context("executing pano_engine")?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("failed to read script"),
        "error context missing: {stderr}"
    );
    Ok(())
}
