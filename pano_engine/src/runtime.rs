//! The script-driven engine runtime: resolves keywords through the command
//! table and drives the scene, registry, playback, and transition layers.

use std::fs;

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Serialize;

use pano_core::effects::{EffectDef, EffectKind, NodeFilter};
use pano_core::playback::{
    self, LoadedMedia, LoopMode, MediaContent, MediaLoader, PlayOption, PlayRequest,
};
use pano_core::registry::{
    EntryKind, EntryPayload, NodeBinding, RegistrySnapshot, SceneModel, SoundCue, SpriteOverlay,
};
use pano_core::scene::{SceneContext, SceneStatus};
use pano_core::surface::PlainViewHost;
use pano_core::{CommandTable, CoreError, Opcode};

use crate::prefs::PlayerPrefs;
use crate::script::{parse_script, ScriptCommand};

/// Media resolution for the headless host: the locator's extension decides
/// what the "file" contains, and every clip gets a fixed tick duration.
#[derive(Debug)]
pub struct StubMediaLoader {
    pub media_ticks: u32,
}

impl MediaLoader for StubMediaLoader {
    fn load(&mut self, locator: &str) -> pano_core::Result<LoadedMedia> {
        let extension = locator.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        let content = match extension.as_str() {
            "aif" | "wav" | "snd" | "mid" => MediaContent::AudioOnly,
            "vid" | "anim" | "flc" => MediaContent::VideoOnly,
            "mov" | "mp4" | "avi" => MediaContent::AudioVideo,
            _ => {
                return Err(CoreError::MediaLoad {
                    locator: locator.to_string(),
                    reason: format!("unrecognized media type '.{extension}'"),
                })
            }
        };
        Ok(LoadedMedia {
            content,
            duration_ticks: self.media_ticks,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub commands_run: u32,
    pub invalid_keywords: u32,
    pub scene: SceneStatus,
    pub registry: RegistrySnapshot,
    pub events: Vec<String>,
}

pub struct EngineRuntime {
    table: CommandTable,
    scene: SceneContext,
    host: PlainViewHost,
    loader: StubMediaLoader,
    verbose: bool,
    transition_steps: u32,
    events: Vec<String>,
    commands_run: u32,
    invalid_keywords: u32,
}

impl EngineRuntime {
    pub fn new(prefs: &PlayerPrefs) -> Self {
        let mut scene = SceneContext::new();
        scene.set_scene_volume(prefs.scene_volume);
        EngineRuntime {
            table: CommandTable::new(),
            scene,
            host: PlainViewHost::new(prefs.view_width, prefs.view_height, [0, 0, 0, 255]),
            loader: StubMediaLoader {
                media_ticks: prefs.media_ticks,
            },
            verbose: prefs.verbose,
            transition_steps: prefs.transition_steps,
            events: Vec::new(),
            commands_run: 0,
            invalid_keywords: 0,
        }
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            commands_run: self.commands_run,
            invalid_keywords: self.invalid_keywords,
            scene: self.scene.status(),
            registry: self.scene.registry.snapshot(),
            events: self.events.clone(),
        }
    }

    pub fn run(&mut self, commands: &[ScriptCommand]) -> Result<()> {
        for command in commands {
            self.dispatch(command)?;
        }
        Ok(())
    }

    /// Runs idle passes after the script: audio/cue servicing, completed-clip
    /// reaping, expired-effect sweeps, and one video service step per pass.
    pub fn idle(&mut self, passes: u32) {
        for _ in 0..passes {
            let mut events = self.scene.registry.idle_tick();
            events.extend(self.scene.registry.service_video());
            self.push_events(events);
        }
    }

    fn push_events(&mut self, events: Vec<String>) {
        for event in &events {
            debug!("{event}");
        }
        self.events.extend(events);
    }

    fn push_event(&mut self, event: String) {
        self.push_events(vec![event]);
    }

    fn dispatch(&mut self, command: &ScriptCommand) -> Result<()> {
        let opcode = self.table.lookup(&command.keyword);
        if opcode == Opcode::Invalid {
            warn!("line {}: unknown keyword {}", command.line, command.keyword);
            self.invalid_keywords += 1;
            self.push_event(format!(
                "command.invalid {} line {}",
                command.keyword, command.line
            ));
            return Ok(());
        }
        self.commands_run += 1;
        if self.verbose {
            debug!("line {}: {:?} {:?}", command.line, opcode, command.args);
        }
        match self.execute(opcode, command) {
            Ok(()) => Ok(()),
            Err(EngineStep::Core(err)) => {
                // A failed command never aborts the script.
                warn!("line {}: {err}", command.line);
                self.push_event(format!("command.error line {}: {err}", command.line));
                Ok(())
            }
            Err(EngineStep::BadArgs) => {
                warn!("line {}: bad arguments for {}", command.line, command.keyword);
                self.push_event(format!(
                    "command.badargs {} line {}",
                    command.keyword, command.line
                ));
                Ok(())
            }
            Err(EngineStep::Fatal(err)) => Err(err),
        }
    }

    fn execute(&mut self, opcode: Opcode, command: &ScriptCommand) -> StepResult {
        match opcode {
            Opcode::Invalid => unreachable!("handled by dispatch"),
            Opcode::SetVerboseState => {
                self.verbose = command.arg_flag(0).ok_or(EngineStep::BadArgs)?;
                self.push_event(format!("verbose {}", self.verbose));
            }
            Opcode::OpenSceneFile | Opcode::ReplaceMainScene => {
                let name = command.arg(0).ok_or(EngineStep::BadArgs)?.to_string();
                let entry_node = command.arg_u32(1).unwrap_or(1);
                let events = self.scene.open_scene(&mut self.host, &name, entry_node);
                self.push_events(events);
            }
            Opcode::GoToNodeID => {
                let node = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let events = self.scene.navigate(&mut self.host, node)?;
                self.push_events(events);
            }
            Opcode::SetPanAngle => {
                let degrees = command.arg_f32(0).ok_or(EngineStep::BadArgs)?;
                self.scene.set_view_pan(degrees.to_radians());
                self.push_event(format!("view.pan {degrees}"));
            }
            Opcode::SetSceneVolume => {
                let volume = command.arg(0).and_then(|arg| arg.parse::<i16>().ok());
                self.scene.set_scene_volume(volume.ok_or(EngineStep::BadArgs)?);
                self.push_event(format!("volume.scene {}", self.scene.scene_volume()));
            }
            Opcode::PlayClip => self.play_clip(command, NodeBinding::Scene)?,
            Opcode::HotSpotClip => {
                let node = NodeBinding::Node(self.scene.current_node());
                self.play_clip(command, node)?;
            }
            Opcode::Play3DSndResourceAngle => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let locator = command.arg(1).ok_or(EngineStep::BadArgs)?.to_string();
                let pan = command.arg_f32(2).ok_or(EngineStep::BadArgs)?;
                let cone = command.arg_f32(3).ok_or(EngineStep::BadArgs)?;
                let request = PlayRequest {
                    entry_id,
                    node: NodeBinding::Node(self.scene.current_node()),
                    option: PlayOption::PlayNew,
                    locator,
                    loop_mode: LoopMode::Loop,
                    localized: true,
                    center_pan: pan.to_radians(),
                    cone_angle: cone.to_radians(),
                };
                let events =
                    playback::request(&mut self.scene.registry, &mut self.loader, request)?;
                self.push_events(events);
                self.scene.refresh_audio();
            }
            Opcode::PlaySceneSound | Opcode::PlayNodeSound => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let locator = command.arg(1).ok_or(EngineStep::BadArgs)?;
                let looping = command.arg(2) == Some("loop");
                let node = if opcode == Opcode::PlaySceneSound {
                    NodeBinding::Scene
                } else {
                    NodeBinding::Node(self.scene.current_node())
                };
                let cue = SoundCue::new(locator, self.loader.media_ticks, looping);
                let (_, replaced) =
                    self.scene
                        .registry
                        .enlist_replacing(node, entry_id, EntryPayload::Sound(cue));
                self.push_events(replaced);
                self.push_event(format!("sound.play {entry_id} {locator}"));
            }
            Opcode::PlayTransClip => {
                let locator = command.arg(0).ok_or(EngineStep::BadArgs)?.to_string();
                let until_click = command.arg(1) == Some("tilclick");
                // Headless host has no input source to cancel with.
                let mut cancel = || false;
                let events = playback::play_transition_clip(
                    &mut self.scene.registry,
                    &mut self.loader,
                    &locator,
                    until_click,
                    &mut cancel,
                )?;
                self.push_events(events);
            }
            Opcode::PlayTransEffect => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let kind = command
                    .arg(1)
                    .and_then(effect_kind)
                    .ok_or(EngineStep::BadArgs)?;
                let from = command
                    .arg(2)
                    .and_then(node_filter)
                    .ok_or(EngineStep::BadArgs)?;
                let to = command
                    .arg(3)
                    .and_then(node_filter)
                    .ok_or(EngineStep::BadArgs)?;
                let mut def = EffectDef::new(kind, from, to);
                def.steps = command.arg_u32(4).unwrap_or(self.transition_steps);
                def.runs_remaining = command.arg_u32(5);
                let (_, replaced) = self.scene.registry.enlist_replacing(
                    NodeBinding::Scene,
                    entry_id,
                    EntryPayload::Effect(def),
                );
                self.push_events(replaced);
                self.push_event(format!("effect.enlist {entry_id} ({kind:?})"));
            }
            Opcode::CreateBox
            | Opcode::CreateCone
            | Opcode::CreateCylinder
            | Opcode::CreateEllipsoid
            | Opcode::CreateTorus
            | Opcode::CreateRectangle => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let shape = match opcode {
                    Opcode::CreateBox => "box",
                    Opcode::CreateCone => "cone",
                    Opcode::CreateCylinder => "cylinder",
                    Opcode::CreateEllipsoid => "ellipsoid",
                    Opcode::CreateTorus => "torus",
                    _ => "rectangle",
                };
                let mut model = SceneModel::new(shape);
                if let (Some(x), Some(y), Some(z)) = (
                    command.arg_f32(1),
                    command.arg_f32(2),
                    command.arg_f32(3),
                ) {
                    model.position = [x, y, z];
                }
                let (_, replaced) = self.scene.registry.enlist_replacing(
                    NodeBinding::Scene,
                    entry_id,
                    EntryPayload::Model(model),
                );
                self.push_events(replaced);
                self.push_event(format!("model.create {entry_id} {shape}"));
            }
            Opcode::OpenModelFile => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let locator = command.arg(1).ok_or(EngineStep::BadArgs)?;
                let model = SceneModel::new(locator);
                let (_, replaced) = self.scene.registry.enlist_replacing(
                    NodeBinding::Scene,
                    entry_id,
                    EntryPayload::Model(model),
                );
                self.push_events(replaced);
                self.push_event(format!("model.open {entry_id} {locator}"));
            }
            Opcode::SetModelLocation => {
                let (entry_id, xyz) = self.model_vector_args(command)?;
                self.with_model(entry_id, |model| model.position = xyz)?;
            }
            Opcode::SetModelRotation => {
                let (entry_id, xyz) = self.model_vector_args(command)?;
                self.with_model(entry_id, |model| model.rotation = xyz)?;
            }
            Opcode::SetModelRotState => {
                let (entry_id, xyz) = self.model_vector_args(command)?;
                self.with_model(entry_id, |model| model.spin_rate = xyz)?;
            }
            Opcode::SetModelVisState => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let visible = command.arg_flag(1).ok_or(EngineStep::BadArgs)?;
                self.with_model(entry_id, |model| model.visible = visible)?;
            }
            Opcode::SetModelTexture => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let locator = command.arg(1).ok_or(EngineStep::BadArgs)?.to_string();
                self.with_model(entry_id, move |model| model.texture = Some(locator))?;
            }
            Opcode::DestroyModel => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let handle = self
                    .scene
                    .registry
                    .lookup_handle(EntryKind::Model, entry_id)
                    .ok_or(EngineStep::Core(CoreError::NotFound {
                        kind: EntryKind::Model,
                        entry_id,
                    }))?;
                let events = self.scene.registry.delist(handle);
                self.push_events(events);
            }
            Opcode::ShowPicture | Opcode::ShowNodePicture => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let locator = command.arg(1).ok_or(EngineStep::BadArgs)?;
                let mut sprite = SpriteOverlay::new(locator);
                if let (Some(x), Some(y)) = (command.arg(2), command.arg(3)) {
                    if let (Ok(x), Ok(y)) = (x.parse(), y.parse()) {
                        sprite.position = [x, y];
                    }
                }
                let node = if opcode == Opcode::ShowPicture {
                    NodeBinding::Scene
                } else {
                    NodeBinding::Node(self.scene.current_node())
                };
                let (_, replaced) =
                    self.scene
                        .registry
                        .enlist_replacing(node, entry_id, EntryPayload::Sprite(sprite));
                self.push_events(replaced);
                self.push_event(format!("sprite.show {entry_id} {locator}"));
            }
            Opcode::SetSpriteLocation => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let x = command
                    .arg(1)
                    .and_then(|arg| arg.parse::<i32>().ok())
                    .ok_or(EngineStep::BadArgs)?;
                let y = command
                    .arg(2)
                    .and_then(|arg| arg.parse::<i32>().ok())
                    .ok_or(EngineStep::BadArgs)?;
                self.with_sprite(entry_id, |sprite| sprite.position = [x, y])?;
            }
            Opcode::SetSpriteVisState => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let visible = command.arg_flag(1).ok_or(EngineStep::BadArgs)?;
                self.with_sprite(entry_id, |sprite| sprite.visible = visible)?;
            }
            Opcode::SetChromaColor => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let rgb = (
                    command.arg_u32(1),
                    command.arg_u32(2),
                    command.arg_u32(3),
                );
                let (Some(r), Some(g), Some(b)) = rgb else {
                    return Err(EngineStep::BadArgs);
                };
                self.with_sprite(entry_id, |sprite| {
                    sprite.chroma_color = Some([r as u8, g as u8, b as u8]);
                })?;
            }
            Opcode::SetClipTime => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let ticks = command.arg_u32(1).ok_or(EngineStep::BadArgs)?;
                self.with_clip(entry_id, |clip| clip.set_position(ticks))?;
            }
            Opcode::SetClipRate => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let rate = command.arg_f32(1).ok_or(EngineStep::BadArgs)?;
                self.with_clip(entry_id, |clip| clip.rate = rate)?;
            }
            Opcode::SetClipTimeScale => {
                let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
                let scale = command.arg_u32(1).ok_or(EngineStep::BadArgs)?;
                self.with_clip(entry_id, |clip| clip.time_scale = scale.max(1))?;
            }
            Opcode::ProcessScript => {
                let locator = command.arg(0).ok_or(EngineStep::BadArgs)?;
                let source = fs::read_to_string(locator)
                    .with_context(|| format!("failed to read script: {locator}"))
                    .map_err(EngineStep::Fatal)?;
                let nested = parse_script(&source).map_err(EngineStep::Fatal)?;
                self.push_event(format!("script.process {locator}"));
                self.run(&nested).map_err(EngineStep::Fatal)?;
            }
            Opcode::Beep => self.push_event("beep".to_string()),
            Opcode::DoNothing => {}
            other => {
                // Surface commands outside the runtime core are acknowledged
                // and skipped so scripts written for a full player still run.
                debug!("line {}: {other:?} not handled by this host", command.line);
                self.push_event(format!("command.stub {}", command.keyword));
            }
        }
        Ok(())
    }

    fn play_clip(&mut self, command: &ScriptCommand, node: NodeBinding) -> StepResult {
        let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
        let option = command
            .arg_u32(1)
            .map(PlayOption::from_code)
            .ok_or(EngineStep::BadArgs)?;
        let locator = command.arg(2).ok_or(EngineStep::BadArgs)?.to_string();
        let loop_mode = match command.arg(3) {
            Some("loop") => LoopMode::Loop,
            Some("palindrome") => LoopMode::Palindrome,
            _ => LoopMode::Once,
        };
        let request = PlayRequest {
            entry_id,
            node,
            option,
            locator,
            loop_mode,
            localized: false,
            center_pan: 0.0,
            cone_angle: playback::DEFAULT_CONE_ANGLE,
        };
        let events = playback::request(&mut self.scene.registry, &mut self.loader, request)?;
        self.push_events(events);
        Ok(())
    }

    fn model_vector_args(&self, command: &ScriptCommand) -> Result<(u32, [f32; 3]), EngineStep> {
        let entry_id = command.arg_u32(0).ok_or(EngineStep::BadArgs)?;
        let xyz = (
            command.arg_f32(1),
            command.arg_f32(2),
            command.arg_f32(3),
        );
        let (Some(x), Some(y), Some(z)) = xyz else {
            return Err(EngineStep::BadArgs);
        };
        Ok((entry_id, [x, y, z]))
    }

    fn with_model(
        &mut self,
        entry_id: u32,
        apply: impl FnOnce(&mut SceneModel),
    ) -> StepResult {
        let entry = self
            .scene
            .registry
            .require_mut(EntryKind::Model, entry_id)?;
        if let EntryPayload::Model(ref mut model) = entry.payload {
            apply(model);
        }
        Ok(())
    }

    fn with_sprite(
        &mut self,
        entry_id: u32,
        apply: impl FnOnce(&mut SpriteOverlay),
    ) -> StepResult {
        let entry = self
            .scene
            .registry
            .require_mut(EntryKind::Sprite, entry_id)?;
        if let EntryPayload::Sprite(ref mut sprite) = entry.payload {
            apply(sprite);
        }
        Ok(())
    }

    fn with_clip(
        &mut self,
        entry_id: u32,
        apply: impl FnOnce(&mut pano_core::MovieClip),
    ) -> StepResult {
        let entry = self
            .scene
            .registry
            .require_mut(EntryKind::Movie, entry_id)?;
        if let EntryPayload::Movie(ref mut clip) = entry.payload {
            apply(clip);
        }
        Ok(())
    }
}

type StepResult = Result<(), EngineStep>;

/// Outcome of one command: script-level failures are reported and skipped,
/// host-level failures (nested script I/O) abort the run.
enum EngineStep {
    Core(CoreError),
    BadArgs,
    Fatal(anyhow::Error),
}

impl From<CoreError> for EngineStep {
    fn from(err: CoreError) -> Self {
        EngineStep::Core(err)
    }
}

fn node_filter(arg: &str) -> Option<NodeFilter> {
    if arg == "*" {
        return Some(NodeFilter::Any);
    }
    arg.parse().ok().map(NodeFilter::Node)
}

fn effect_kind(arg: &str) -> Option<EffectKind> {
    match arg {
        "crossfade" => Some(EffectKind::Crossfade),
        "wipeleft" => Some(EffectKind::WipeLeft),
        "wiperight" => Some(EffectKind::WipeRight),
        "iris" => Some(EffectKind::Iris),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::EngineRuntime;
    use crate::prefs::PlayerPrefs;
    use crate::script::parse_script;
    use pano_core::registry::EntryKind;

    fn run(script: &str) -> EngineRuntime {
        let mut runtime = EngineRuntime::new(&PlayerPrefs::default());
        let commands = parse_script(script).expect("parse");
        runtime.run(&commands).expect("run");
        runtime
    }

    fn has_event(runtime: &EngineRuntime, prefix: &str) -> bool {
        runtime.events().iter().any(|event| event.starts_with(prefix))
    }

    #[test]
    fn unknown_keyword_is_reported_and_skipped() {
        let runtime = run("FrobnicateView 1\nBeep");
        assert!(has_event(&runtime, "command.invalid FrobnicateView line 1"));
        assert!(has_event(&runtime, "beep"));
        let report = runtime.report();
        assert_eq!(report.invalid_keywords, 1);
        assert_eq!(report.commands_run, 1);
    }

    #[test]
    fn navigation_with_effect_emits_all_transition_phases() {
        let runtime = run(
            "OpenSceneFile plaza 1\n\
             PlayTransEffect 1 crossfade * * 4\n\
             GoToNodeID 2",
        );
        assert!(has_event(&runtime, "transition.setup 1"));
        assert!(has_event(&runtime, "transition.run 1 steps 4"));
        assert!(has_event(&runtime, "transition.teardown 1"));
        assert_eq!(runtime.report().scene.node, 2);
    }

    #[test]
    fn node_bound_entries_are_dumped_on_exit() {
        let runtime = run(
            "OpenSceneFile plaza 1\n\
             PlayNodeSound 5 fountain.snd loop\n\
             PlaySceneSound 6 wind.snd loop\n\
             GoToNodeID 2",
        );
        assert!(runtime.report().registry.sounds == 1);
        assert!(has_event(&runtime, "sound.release fountain.snd"));
    }

    #[test]
    fn reissuing_an_entry_id_replaces_instead_of_accumulating() {
        let runtime = run(
            "PlaySceneSound 6 wind.snd loop\n\
             PlaySceneSound 6 surf.snd loop\n\
             CreateBox 4 0 0 0\n\
             CreateCone 4 0 0 0\n\
             ShowPicture 9 logo.pict\n\
             ShowPicture 9 map.pict",
        );
        let report = runtime.report();
        assert_eq!(report.registry.sounds, 1);
        assert_eq!(report.registry.models, 1);
        assert_eq!(report.registry.sprites, 1);
        assert!(has_event(&runtime, "sound.release wind.snd"));
        assert!(has_event(&runtime, "model.release box"));
        assert!(has_event(&runtime, "sprite.release logo.pict"));
    }

    #[test]
    fn clip_commands_on_absent_entries_report_an_error() {
        let runtime = run("OpenSceneFile plaza 1\nSetClipRate 9 1.5");
        assert!(has_event(&runtime, "command.error line 2"));
    }

    #[test]
    fn unhandled_surface_keywords_are_stubbed() {
        let runtime = run("SetWindowSize 640 480");
        assert!(has_event(&runtime, "command.stub SetWindowSize"));
    }

    #[test]
    fn bad_media_type_does_not_abort_the_script() {
        let runtime = run("PlayClip 1 0 readme.txt\nBeep");
        assert!(has_event(&runtime, "command.error line 1"));
        assert!(has_event(&runtime, "beep"));
    }

    #[test]
    fn models_are_created_mutated_and_destroyed() {
        let runtime = run(
            "CreateTorus 4 0 1 0\n\
             SetModelRotState 4 0 0.5 0\n\
             DestroyModel 4",
        );
        assert!(has_event(&runtime, "model.create 4 torus"));
        assert!(has_event(&runtime, "model.release torus"));
        assert_eq!(runtime.report().registry.models, 0);
    }

    #[test]
    fn audio_clips_are_reaped_after_enough_idle_passes() {
        let mut runtime = run("PlayClip 3 0 voice.aif");
        assert_eq!(runtime.report().registry.movies, 1);
        runtime.idle(PlayerPrefs::default().media_ticks + 1);
        assert_eq!(runtime.report().registry.movies, 0);
        assert!(has_event(&runtime, "clip.done 3"));
    }

    #[test]
    fn transition_clip_blocks_and_completes() {
        let runtime = run("PlayTransClip swoop.vid");
        assert!(has_event(&runtime, "transclip.start swoop.vid"));
        assert!(has_event(&runtime, "transclip.done swoop.vid"));
    }

    #[test]
    fn localized_sound_is_attenuated_for_the_current_pan() {
        let runtime = run(
            "OpenSceneFile plaza 1\n\
             SetPanAngle 180\n\
             Play3DSndResourceAngle 2 bells.snd 0 60",
        );
        let registry = &runtime.scene.registry;
        match registry.lookup(EntryKind::Movie, 2).expect("clip").payload {
            pano_core::EntryPayload::Movie(ref clip) => assert_eq!(clip.volume, 0),
            _ => panic!("wrong payload"),
        }
    }

    #[test]
    fn scene_volume_scales_enlisted_clip_volumes() {
        let runtime = run("PlayClip 3 0 voice.aif\nSetSceneVolume 128");
        assert!(has_event(&runtime, "volume.scene 128"));
        let registry = &runtime.scene.registry;
        match registry.lookup(EntryKind::Movie, 3).expect("clip").payload {
            pano_core::EntryPayload::Movie(ref clip) => assert_eq!(clip.volume, 128),
            _ => panic!("wrong payload"),
        }
    }
}
