//! Media playback: the per-clip state machine and the request-resolution
//! rules that decide how a new play request interacts with a clip that is
//! already enlisted.

use log::{debug, warn};
use serde::Serialize;

use crate::error::Result;
use crate::registry::{EntryKind, EntryPayload, NodeBinding, ObjectRegistry};

/// How a play request treats an already-enlisted clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOption {
    PlayNew,
    Restart,
    ToggleStop,
    TogglePause,
    Continue,
    Stop,
    /// Codes the script surface may grow later. Deliberately permissive:
    /// resolution falls through to "start playback".
    Unknown(u32),
}

impl PlayOption {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => PlayOption::PlayNew,
            1 => PlayOption::Restart,
            2 => PlayOption::ToggleStop,
            3 => PlayOption::TogglePause,
            4 => PlayOption::Continue,
            5 => PlayOption::Stop,
            other => PlayOption::Unknown(other),
        }
    }

    /// A request that could never start playback. Such a request against an
    /// absent entry is ignored outright.
    fn is_pure_stop(self) -> bool {
        matches!(self, PlayOption::Stop | PlayOption::Continue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClipState {
    NotLoaded,
    Playing,
    Stopped,
    Paused,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopMode {
    Once,
    Loop,
    Palindrome,
}

/// What kinds of media a loaded clip carries. Classification happens at load
/// time and decides which scheduling point services the clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaContent {
    AudioOnly,
    VideoOnly,
    AudioVideo,
}

impl MediaContent {
    pub fn has_audio(self) -> bool {
        matches!(self, MediaContent::AudioOnly | MediaContent::AudioVideo)
    }

    pub fn has_video(self) -> bool {
        matches!(self, MediaContent::VideoOnly | MediaContent::AudioVideo)
    }
}

/// Result of resolving a locator. Durations are in service ticks; actual
/// decode timing belongs to the host.
#[derive(Debug, Clone, Copy)]
pub struct LoadedMedia {
    pub content: MediaContent,
    pub duration_ticks: u32,
}

/// File/URL resolution seam. The host supplies one; the core never touches
/// paths itself.
pub trait MediaLoader {
    fn load(&mut self, locator: &str) -> Result<LoadedMedia>;
}

/// One enlisted media clip.
#[derive(Debug, Clone, Serialize)]
pub struct MovieClip {
    pub locator: String,
    pub content: MediaContent,
    pub state: ClipState,
    pub loop_mode: LoopMode,
    position: u32,
    duration: u32,
    direction: i8,
    /// Pan angle of the clip's sound stage, for localized sounds.
    pub center_pan: f32,
    /// Half-angle of the attenuation cone, radians.
    pub cone_angle: f32,
    pub localized: bool,
    pub volume: i16,
    pub balance: i16,
    /// Playback rate multiplier, consumed by the host's media layer.
    pub rate: f32,
    /// Ticks per second of media time.
    pub time_scale: u32,
}

impl MovieClip {
    pub fn load(
        loader: &mut dyn MediaLoader,
        locator: &str,
        loop_mode: LoopMode,
        localized: bool,
        center_pan: f32,
        cone_angle: f32,
    ) -> Result<Self> {
        let media = loader.load(locator)?;
        Ok(MovieClip {
            locator: locator.to_string(),
            content: media.content,
            state: ClipState::NotLoaded,
            loop_mode,
            position: 0,
            duration: media.duration_ticks.max(1),
            direction: 1,
            center_pan,
            cone_angle,
            localized,
            volume: MAX_SOUND_VOLUME,
            balance: 0,
            rate: 1.0,
            time_scale: DEFAULT_TIME_SCALE,
        })
    }

    /// Seeks to a tick position, clamped to the clip's duration.
    pub fn set_position(&mut self, ticks: u32) {
        self.position = ticks.min(self.duration.saturating_sub(1));
    }

    pub fn play_from_start(&mut self) {
        self.position = 0;
        self.direction = 1;
        self.state = ClipState::Playing;
    }

    pub fn stop(&mut self) {
        if self.state == ClipState::Playing || self.state == ClipState::Paused {
            self.state = ClipState::Stopped;
        }
    }

    pub fn pause(&mut self) {
        if self.state == ClipState::Playing {
            self.state = ClipState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == ClipState::Paused {
            self.state = ClipState::Playing;
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == ClipState::Done
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    /// Advances the clip by one service tick. Returns true when this tick
    /// moved the clip into `Done`.
    pub fn advance(&mut self) -> bool {
        if self.state != ClipState::Playing {
            return false;
        }
        match self.loop_mode {
            LoopMode::Once => {
                self.position = self.position.saturating_add(1);
                if self.position >= self.duration {
                    self.state = ClipState::Done;
                    return true;
                }
            }
            LoopMode::Loop => {
                self.position = (self.position + 1) % self.duration;
            }
            LoopMode::Palindrome => {
                // Bounce at either end; a palindrome clip never finishes.
                if self.direction > 0 {
                    if self.position + 1 >= self.duration {
                        self.direction = -1;
                        self.position = self.position.saturating_sub(1);
                    } else {
                        self.position += 1;
                    }
                } else if self.position == 0 {
                    self.direction = 1;
                    self.position = 1.min(self.duration - 1);
                } else {
                    self.position -= 1;
                }
            }
        }
        false
    }
}

/// A play request as dispatched by the interpreter.
#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub entry_id: u32,
    pub node: NodeBinding,
    pub option: PlayOption,
    pub locator: String,
    pub loop_mode: LoopMode,
    pub localized: bool,
    pub center_pan: f32,
    pub cone_angle: f32,
}

impl PlayRequest {
    pub fn once(entry_id: u32, node: NodeBinding, option: PlayOption, locator: &str) -> Self {
        PlayRequest {
            entry_id,
            node,
            option,
            locator: locator.to_string(),
            loop_mode: LoopMode::Once,
            localized: false,
            center_pan: 0.0,
            cone_angle: DEFAULT_CONE_ANGLE,
        }
    }
}

/// Full-scale volume, matching the sound hardware's fixed-point range.
pub const MAX_SOUND_VOLUME: i16 = 256;

/// Default attenuation-cone half-angle, radians.
pub const DEFAULT_CONE_ANGLE: f32 = 1.0;

/// Default media time scale, ticks per second.
pub const DEFAULT_TIME_SCALE: u32 = 600;

/// Resolves a play request against the registry per the playback state
/// machine. Returns the event transcript of what happened.
pub fn request(
    registry: &mut ObjectRegistry,
    loader: &mut dyn MediaLoader,
    req: PlayRequest,
) -> Result<Vec<String>> {
    let mut events = Vec::new();
    let existing = registry.lookup_handle(EntryKind::Movie, req.entry_id);

    let handle = match existing {
        None => {
            if req.option.is_pure_stop() {
                debug!("ignoring {:?} for absent clip {}", req.option, req.entry_id);
                return Ok(events);
            }
            return enlist_and_play(registry, loader, &req, &mut events).map(|_| events);
        }
        Some(handle) => handle,
    };

    match req.option {
        PlayOption::PlayNew => {
            // No overlapping instances per entry id: drop the current one and
            // reload from the locator.
            events.extend(registry.delist(handle));
            enlist_and_play(registry, loader, &req, &mut events)?;
        }
        PlayOption::Restart => {
            if let Some(clip) = clip_mut(registry, req.entry_id) {
                clip.stop();
                clip.play_from_start();
                events.push(format!("clip.restart {}", req.entry_id));
            }
        }
        PlayOption::ToggleStop => {
            let finished = clip_mut(registry, req.entry_id)
                .map(|clip| clip.is_done())
                .unwrap_or(false);
            if finished {
                events.extend(registry.delist(handle));
                enlist_and_play(registry, loader, &req, &mut events)?;
            } else {
                if let Some(clip) = clip_mut(registry, req.entry_id) {
                    clip.stop();
                }
                events.extend(registry.delist(handle));
            }
        }
        PlayOption::TogglePause => {
            if let Some(clip) = clip_mut(registry, req.entry_id) {
                match clip.state {
                    ClipState::Playing => {
                        clip.pause();
                        events.push(format!("clip.pause {}", req.entry_id));
                    }
                    ClipState::Paused => {
                        clip.resume();
                        events.push(format!("clip.resume {}", req.entry_id));
                    }
                    _ => {}
                }
            }
        }
        PlayOption::Continue => {}
        PlayOption::Stop => {
            if let Some(clip) = clip_mut(registry, req.entry_id) {
                clip.stop();
                events.push(format!("clip.stop {}", req.entry_id));
            }
        }
        PlayOption::Unknown(code) => {
            // Permissive fallback: an unrecognized option starts playback.
            warn!("unrecognized play option {code}; starting playback");
            if let Some(clip) = clip_mut(registry, req.entry_id) {
                clip.play_from_start();
                events.push(format!("clip.play {}", req.entry_id));
            }
        }
    }

    Ok(events)
}

fn enlist_and_play(
    registry: &mut ObjectRegistry,
    loader: &mut dyn MediaLoader,
    req: &PlayRequest,
    events: &mut Vec<String>,
) -> Result<()> {
    let mut clip = MovieClip::load(
        loader,
        &req.locator,
        req.loop_mode,
        req.localized,
        req.center_pan,
        req.cone_angle,
    )?;
    clip.play_from_start();
    let content = clip.content;
    registry.enlist(req.node, req.entry_id, EntryPayload::Movie(clip));
    events.push(format!(
        "clip.play {} {} ({:?})",
        req.entry_id, req.locator, content
    ));
    Ok(())
}

fn clip_mut(registry: &mut ObjectRegistry, entry_id: u32) -> Option<&mut MovieClip> {
    match registry.lookup_mut(EntryKind::Movie, entry_id)?.payload {
        EntryPayload::Movie(ref mut clip) => Some(clip),
        _ => None,
    }
}

/// Smallest accepted cone half-angle, radians. Keeps the cosine-space
/// denominator away from zero for degenerate cones.
pub const MIN_CONE_ANGLE: f32 = 1.0e-3;

/// Balance and attenuated volume for a localized sound given the current view
/// pan. Balance follows the sine of the pan delta; volume scales linearly in
/// cosine space inside the attenuation cone and is silent outside it.
pub fn balance_and_volume(view_pan: f32, clip_pan: f32, cone_angle: f32) -> (i16, i16) {
    let cone_angle = cone_angle.max(MIN_CONE_ANGLE);
    let delta = view_pan - clip_pan;
    let balance = (f32::from(MAX_SOUND_VOLUME) * delta.sin()) as i16;

    let cos_delta = delta.cos();
    let cos_limit = cone_angle.cos();
    let volume = if cos_delta >= cos_limit {
        (f32::from(MAX_SOUND_VOLUME) * ((cos_delta - cos_limit) / (1.0 - cos_limit))) as i16
    } else {
        0
    };
    (balance, volume)
}

fn scale_volume(volume: i16, master: i16) -> i16 {
    ((i32::from(volume) * i32::from(master)) / i32::from(MAX_SOUND_VOLUME)) as i16
}

/// Re-attenuates every sounded clip for a new view pan angle and master
/// volume. Localized clips get the cone model; the rest play at full level
/// scaled by the master.
pub fn apply_attenuation(registry: &mut ObjectRegistry, view_pan: f32, master_volume: i16) {
    for clip in registry.movie_clips_mut() {
        if !clip.content.has_audio() {
            continue;
        }
        let (balance, volume) = if clip.localized {
            balance_and_volume(view_pan, clip.center_pan, clip.cone_angle)
        } else {
            (clip.balance, MAX_SOUND_VOLUME)
        };
        clip.balance = balance;
        clip.volume = scale_volume(volume, master_volume);
    }
}

/// Plays a clip once through as a node transition, blocking the control
/// thread. `cancel` is polled exactly once per loop iteration; ambient
/// audio-only clips are serviced every [`IDLE_SERVICE_STEP`] iterations so a
/// long transition does not starve background sound.
pub fn play_transition_clip(
    registry: &mut ObjectRegistry,
    loader: &mut dyn MediaLoader,
    locator: &str,
    until_click: bool,
    cancel: &mut dyn FnMut() -> bool,
) -> Result<Vec<String>> {
    let mut events = Vec::new();
    let mut clip = MovieClip::load(
        loader,
        locator,
        LoopMode::Once,
        false,
        0.0,
        DEFAULT_CONE_ANGLE,
    )?;
    clip.play_from_start();
    events.push(format!("transclip.start {locator}"));

    let mut iteration: u32 = 0;
    while !clip.is_done() {
        clip.advance();
        if iteration % IDLE_SERVICE_STEP == 0 {
            events.extend(registry.service_ambient_audio());
        }
        iteration += 1;
        if until_click && cancel() {
            events.push(format!("transclip.cancelled {locator}"));
            break;
        }
    }
    if clip.is_done() {
        events.push(format!("transclip.done {locator}"));
    }
    // The clip was never enlisted; dropping it here releases the resource.
    Ok(events)
}

/// How many loop iterations pass between ambient-audio service calls while a
/// blocking transition runs.
pub const IDLE_SERVICE_STEP: u32 = 8;
