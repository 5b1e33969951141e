use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Player preferences, loaded from an optional JSON file. Missing keys fall
/// back to defaults so a partial file is fine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerPrefs {
    pub verbose: bool,
    /// Composite steps a transition effect takes unless the effect says.
    pub transition_steps: u32,
    /// Master volume applied to newly opened scenes, 0..=256.
    pub scene_volume: i16,
    /// Duration assigned to loaded media, in service ticks.
    pub media_ticks: u32,
    pub view_width: u32,
    pub view_height: u32,
}

impl Default for PlayerPrefs {
    fn default() -> Self {
        PlayerPrefs {
            verbose: false,
            transition_steps: pano_core::DEFAULT_STEP_COUNT,
            scene_volume: pano_core::MAX_SOUND_VOLUME,
            media_ticks: 24,
            view_width: 640,
            view_height: 480,
        }
    }
}

impl PlayerPrefs {
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(PlayerPrefs::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read prefs file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse prefs json: {}", path.display()))
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing prefs")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write prefs file: {}", path.display()))
    }
}
