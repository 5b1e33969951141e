//! Script keyword resolution.
//!
//! Every command word the player's scripting surface understands resolves to
//! an [`Opcode`] through a fixed-size chained hash table. The table is built
//! once at startup and never mutated afterwards, so lookups are safe from any
//! number of readers.

use serde::Serialize;

/// Number of bucket chains in the command table. Prime, sized so the shipped
/// keyword set keeps chains short.
pub const BUCKET_COUNT: usize = 127;

/// Integer code a script keyword resolves to. `Invalid` is reserved as code 0
/// and is what [`CommandTable::lookup`] hands back for unknown words; the
/// interpreter treats it as a recoverable script error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum Opcode {
    Invalid = 0,
    SetVerboseState,
    OpenSceneFile,
    ReplaceMainScene,
    SetCurrentDirectory,
    SetBarState,
    SetButtonState,
    SetResizeState,
    SetWindowSize,
    SetMaxWindowSize,
    ReplaceCursor,
    SetHotSpotIDCursors,
    SetHotSpotTypeCursors,
    GoToNodeID,
    ShowDefaultView,
    OpenResourceFile,
    SetCorrection,
    SetQuality,
    SetSwingSpeed,
    SetSwingDirection,
    SetSwingState,
    SetPanAngle,
    SetTiltAngle,
    SetPanTiltZoom,
    SetFieldOfView,
    SetViewCenter,
    SetPanLimits,
    SetTiltLimits,
    SetZoomLimits,
    SetHotSpotState,
    SetTranslateState,
    SetClickRadius,
    SetClickTimeout,
    SetPanTiltSpeed,
    SetZoomSpeed,
    SetMouseScale,
    SetFrameRate,
    SetViewRate,
    SetViewTime,
    SetViewState,
    SetAnimationState,
    SetControlState,
    SetFrameAnimState,
    SetViewAnimState,
    SetPanoVisState,
    SetCachePrefs,
    SetSceneVolume,
    SetTrackVolume,
    SetSoundVolume,
    SetSoundBalance,
    PlaySceneSound,
    PlaySceneMidi,
    PlayNodeMidi,
    PlayNodeSound,
    PlayNode3DSound,
    HotSpotMidi,
    HotSpotSound,
    HotSpot3DSound,
    HotSpotClip,
    TriggerHotSpot,
    PlayMidi,
    PlaySndResource,
    PlaySoundFile,
    Play3DSndResource,
    Play3DSndResourceAngle,
    ShowPicture,
    ShowNodePicture,
    AtTime,
    AtAppLaunch,
    AtAppQuit,
    AtMouseOverHSID,
    AtMouseOverHSType,
    AtClickHSID,
    AtClickHSType,
    AtClickCustomButton,
    AtClickSprite,
    AtTriggerWiredAction,
    AtNodeEntry,
    AtNodeExit,
    AtPanAngle,
    AtTiltAngle,
    AtZoomAngle,
    DoBoth,
    DoNothing,
    PlayClip,
    PlayTransClip,
    PlayTransEffect,
    MoveScreen,
    Beep,
    ProcessScript,
    CreateBox,
    CreateCone,
    CreateCylinder,
    CreateEllipsoid,
    CreateTorus,
    CreateRectangle,
    OpenModelFile,
    SetModelLocation,
    SetModelColor,
    SetModelTransp,
    SetModelInterp,
    SetModelBackface,
    SetModelFill,
    SetModelRotation,
    SetModelRotState,
    SetModelVisState,
    SetModelTexture,
    DestroyModel,
    Set3DSndLocation,
    SetVariable,
    If,
    SetSpriteVisState,
    SetSpriteLayer,
    SetSpriteGraphicsMode,
    SetSpriteImageIndex,
    SetSpriteMatrix,
    SetSpriteLocation,
    SetTrackState,
    SetTrackLayer,
    SetClipTime,
    SetClipRate,
    SetClipTimeScale,
    SetChromaColor,
}

impl Opcode {
    /// The raw command code.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// The shipped keyword set, one entry per supported command word.
pub const COMMAND_WORDS: &[(&str, Opcode)] = &[
    ("SetVerboseState", Opcode::SetVerboseState),
    ("OpenSceneFile", Opcode::OpenSceneFile),
    ("ReplaceMainScene", Opcode::ReplaceMainScene),
    ("SetCurrentDirectory", Opcode::SetCurrentDirectory),
    ("SetBarState", Opcode::SetBarState),
    ("SetButtonState", Opcode::SetButtonState),
    ("SetResizeState", Opcode::SetResizeState),
    ("SetWindowSize", Opcode::SetWindowSize),
    ("SetMaxWindowSize", Opcode::SetMaxWindowSize),
    ("ReplaceCursor", Opcode::ReplaceCursor),
    ("SetHotSpotIDCursors", Opcode::SetHotSpotIDCursors),
    ("SetHotSpotTypeCursors", Opcode::SetHotSpotTypeCursors),
    ("GoToNodeID", Opcode::GoToNodeID),
    ("ShowDefaultView", Opcode::ShowDefaultView),
    ("OpenResourceFile", Opcode::OpenResourceFile),
    ("SetCorrection", Opcode::SetCorrection),
    ("SetQuality", Opcode::SetQuality),
    ("SetSwingSpeed", Opcode::SetSwingSpeed),
    ("SetSwingDirection", Opcode::SetSwingDirection),
    ("SetSwingState", Opcode::SetSwingState),
    ("SetPanAngle", Opcode::SetPanAngle),
    ("SetTiltAngle", Opcode::SetTiltAngle),
    ("SetPanTiltZoom", Opcode::SetPanTiltZoom),
    ("SetFieldOfView", Opcode::SetFieldOfView),
    ("SetViewCenter", Opcode::SetViewCenter),
    ("SetPanLimits", Opcode::SetPanLimits),
    ("SetTiltLimits", Opcode::SetTiltLimits),
    ("SetZoomLimits", Opcode::SetZoomLimits),
    ("SetHotSpotState", Opcode::SetHotSpotState),
    ("SetTranslateState", Opcode::SetTranslateState),
    ("SetClickRadius", Opcode::SetClickRadius),
    ("SetClickTimeout", Opcode::SetClickTimeout),
    ("SetPanTiltSpeed", Opcode::SetPanTiltSpeed),
    ("SetZoomSpeed", Opcode::SetZoomSpeed),
    ("SetMouseScale", Opcode::SetMouseScale),
    ("SetFrameRate", Opcode::SetFrameRate),
    ("SetViewRate", Opcode::SetViewRate),
    ("SetViewTime", Opcode::SetViewTime),
    ("SetViewState", Opcode::SetViewState),
    ("SetAnimationState", Opcode::SetAnimationState),
    ("SetControlState", Opcode::SetControlState),
    ("SetFrameAnimState", Opcode::SetFrameAnimState),
    ("SetViewAnimState", Opcode::SetViewAnimState),
    ("SetPanoVisState", Opcode::SetPanoVisState),
    ("SetCachePrefs", Opcode::SetCachePrefs),
    ("SetSceneVolume", Opcode::SetSceneVolume),
    ("SetTrackVolume", Opcode::SetTrackVolume),
    ("SetSoundVolume", Opcode::SetSoundVolume),
    ("SetSoundBalance", Opcode::SetSoundBalance),
    ("PlaySceneSound", Opcode::PlaySceneSound),
    ("PlaySceneMidi", Opcode::PlaySceneMidi),
    ("PlayNodeMidi", Opcode::PlayNodeMidi),
    ("PlayNodeSound", Opcode::PlayNodeSound),
    ("PlayNode3DSound", Opcode::PlayNode3DSound),
    ("HotSpotMidi", Opcode::HotSpotMidi),
    ("HotSpotSound", Opcode::HotSpotSound),
    ("HotSpot3DSound", Opcode::HotSpot3DSound),
    ("HotSpotClip", Opcode::HotSpotClip),
    ("TriggerHotSpot", Opcode::TriggerHotSpot),
    ("PlayMidi", Opcode::PlayMidi),
    ("PlaySndResource", Opcode::PlaySndResource),
    ("PlaySoundFile", Opcode::PlaySoundFile),
    ("Play3DSndResource", Opcode::Play3DSndResource),
    ("Play3DSndResourceAngle", Opcode::Play3DSndResourceAngle),
    ("ShowPicture", Opcode::ShowPicture),
    ("ShowNodePicture", Opcode::ShowNodePicture),
    ("AtTime", Opcode::AtTime),
    ("AtAppLaunch", Opcode::AtAppLaunch),
    ("AtAppQuit", Opcode::AtAppQuit),
    ("AtMouseOverHSID", Opcode::AtMouseOverHSID),
    ("AtMouseOverHSType", Opcode::AtMouseOverHSType),
    ("AtClickHSID", Opcode::AtClickHSID),
    ("AtClickHSType", Opcode::AtClickHSType),
    ("AtClickCustomButton", Opcode::AtClickCustomButton),
    ("AtClickSprite", Opcode::AtClickSprite),
    ("AtTriggerWiredAction", Opcode::AtTriggerWiredAction),
    ("AtNodeEntry", Opcode::AtNodeEntry),
    ("AtNodeExit", Opcode::AtNodeExit),
    ("AtPanAngle", Opcode::AtPanAngle),
    ("AtTiltAngle", Opcode::AtTiltAngle),
    ("AtZoomAngle", Opcode::AtZoomAngle),
    ("DoBoth", Opcode::DoBoth),
    ("DoNothing", Opcode::DoNothing),
    ("PlayClip", Opcode::PlayClip),
    ("PlayTransClip", Opcode::PlayTransClip),
    ("PlayTransEffect", Opcode::PlayTransEffect),
    ("MoveScreen", Opcode::MoveScreen),
    ("Beep", Opcode::Beep),
    ("ProcessScript", Opcode::ProcessScript),
    ("CreateBox", Opcode::CreateBox),
    ("CreateCone", Opcode::CreateCone),
    ("CreateCylinder", Opcode::CreateCylinder),
    ("CreateEllipsoid", Opcode::CreateEllipsoid),
    ("CreateTorus", Opcode::CreateTorus),
    ("CreateRectangle", Opcode::CreateRectangle),
    ("OpenModelFile", Opcode::OpenModelFile),
    ("SetModelLocation", Opcode::SetModelLocation),
    ("SetModelColor", Opcode::SetModelColor),
    ("SetModelTransp", Opcode::SetModelTransp),
    ("SetModelInterp", Opcode::SetModelInterp),
    ("SetModelBackface", Opcode::SetModelBackface),
    ("SetModelFill", Opcode::SetModelFill),
    ("SetModelRotation", Opcode::SetModelRotation),
    ("SetModelRotState", Opcode::SetModelRotState),
    ("SetModelVisState", Opcode::SetModelVisState),
    ("SetModelTexture", Opcode::SetModelTexture),
    ("DestroyModel", Opcode::DestroyModel),
    ("Set3DSndLocation", Opcode::Set3DSndLocation),
    ("SetVariable", Opcode::SetVariable),
    ("If", Opcode::If),
    ("SetSpriteVisState", Opcode::SetSpriteVisState),
    ("SetSpriteLayer", Opcode::SetSpriteLayer),
    ("SetSpriteGraphicsMode", Opcode::SetSpriteGraphicsMode),
    ("SetSpriteImageIndex", Opcode::SetSpriteImageIndex),
    ("SetSpriteMatrix", Opcode::SetSpriteMatrix),
    ("SetSpriteLocation", Opcode::SetSpriteLocation),
    ("SetTrackState", Opcode::SetTrackState),
    ("SetTrackLayer", Opcode::SetTrackLayer),
    ("SetClipTime", Opcode::SetClipTime),
    ("SetClipRate", Opcode::SetClipRate),
    ("SetClipTimeScale", Opcode::SetClipTimeScale),
    ("SetChromaColor", Opcode::SetChromaColor),
];

struct CommandSlot {
    keyword: &'static str,
    opcode: Opcode,
}

/// Hash table mapping command words to opcodes.
pub struct CommandTable {
    buckets: Vec<Vec<CommandSlot>>,
}

impl CommandTable {
    /// Builds the table and populates it with the full shipped keyword set.
    pub fn new() -> Self {
        let mut table = CommandTable {
            buckets: (0..BUCKET_COUNT).map(|_| Vec::new()).collect(),
        };
        for &(keyword, opcode) in COMMAND_WORDS {
            table.insert(keyword, opcode);
        }
        table
    }

    /// Polynomial string hash folded into a bucket index.
    pub fn hash(keyword: &str) -> usize {
        let mut value: u32 = 0;
        for byte in keyword.bytes() {
            value = value.wrapping_mul(31).wrapping_add(u32::from(byte));
        }
        value as usize % BUCKET_COUNT
    }

    /// Prepends the keyword to its bucket chain. Startup population only; a
    /// later insert of the same word shadows the earlier one.
    fn insert(&mut self, keyword: &'static str, opcode: Opcode) {
        let bucket = &mut self.buckets[Self::hash(keyword)];
        bucket.insert(0, CommandSlot { keyword, opcode });
    }

    /// Walks the bucket chain for an exact match. Unknown words resolve to
    /// [`Opcode::Invalid`].
    pub fn lookup(&self, keyword: &str) -> Opcode {
        self.buckets[Self::hash(keyword)]
            .iter()
            .find(|slot| slot.keyword == keyword)
            .map(|slot| slot.opcode)
            .unwrap_or(Opcode::Invalid)
    }

    /// Chain length of every bucket, in bucket order.
    pub fn chain_lengths(&self) -> Vec<usize> {
        self.buckets.iter().map(Vec::len).collect()
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}
