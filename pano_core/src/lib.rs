//! Runtime core for an interactive panoramic-scene player.
//!
//! The crate keeps the pieces a scripted player needs at runtime: the
//! keyword-to-opcode command table, the registry of enlisted scene objects,
//! the media playback state machine, and the three-phase transition-effect
//! engine. Rendering and file I/O stay behind the [`surface::RenderHost`]
//! and [`playback::MediaLoader`] seams so the core runs headlessly.

pub mod commands;
pub mod effects;
pub mod error;
pub mod playback;
pub mod registry;
pub mod scene;
pub mod surface;

pub use commands::{CommandTable, Opcode, BUCKET_COUNT};
pub use effects::{EffectDef, EffectKind, NodeFilter, TransitionEngine, DEFAULT_STEP_COUNT};
pub use error::{CoreError, Result};
pub use playback::{
    ClipState, LoadedMedia, LoopMode, MediaContent, MediaLoader, MovieClip, PlayOption,
    PlayRequest, MAX_SOUND_VOLUME,
};
pub use registry::{
    DumpScope, EntryHandle, EntryKind, EntryPayload, NodeBinding, ObjectRegistry, RegistryEntry,
    RegistrySnapshot, SceneModel, SoundCue, SpriteOverlay,
};
pub use scene::{SceneContext, SceneStatus};
pub use surface::{PlainViewHost, RenderHost, RenderTarget, Surface};
