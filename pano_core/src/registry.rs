//! The object registry: every runtime object a script enlists (movies,
//! transition effects, models, sprites, sound cues) lives here, keyed by a
//! monotonically increasing handle so iteration order matches enlistment
//! order.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use serde::Serialize;

use crate::effects::EffectDef;
use crate::playback::MovieClip;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EntryKind {
    Movie,
    Effect,
    Model,
    Sprite,
    Sound,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryKind::Movie => "movie",
            EntryKind::Effect => "transition effect",
            EntryKind::Model => "model",
            EntryKind::Sprite => "sprite",
            EntryKind::Sound => "sound",
        };
        f.write_str(name)
    }
}

/// What an entry is attached to, and therefore when it gets dumped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeBinding {
    /// Lives for the whole scene; survives node changes.
    Scene,
    /// Dumped when the viewer leaves this node.
    Node(u32),
}

/// Which bindings a dump pass removes. The two scopes partition the registry:
/// `Node` takes every node-bound entry, `Scene` takes the scene-wide rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpScope {
    /// Entries bound to any node (on node exit).
    Node,
    /// Scene-wide entries only (on scene teardown, after a `Node` pass).
    Scene,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct EntryHandle(u64);

/// A procedurally created scene prop.
#[derive(Debug, Clone, Serialize)]
pub struct SceneModel {
    pub shape: String,
    pub position: [f32; 3],
    pub scale: [f32; 3],
    pub rotation: [f32; 3],
    pub spin_rate: [f32; 3],
    pub texture: Option<String>,
    pub visible: bool,
}

impl SceneModel {
    pub fn new(shape: &str) -> Self {
        SceneModel {
            shape: shape.to_string(),
            position: [0.0; 3],
            scale: [1.0; 3],
            rotation: [0.0; 3],
            spin_rate: [0.0; 3],
            texture: None,
            visible: true,
        }
    }

    fn is_spinning(&self) -> bool {
        self.spin_rate.iter().any(|rate| *rate != 0.0)
    }

    fn spin_step(&mut self) {
        for axis in 0..3 {
            self.rotation[axis] += self.spin_rate[axis];
        }
    }
}

/// A screen-space overlay image.
#[derive(Debug, Clone, Serialize)]
pub struct SpriteOverlay {
    pub locator: String,
    pub position: [i32; 2],
    pub visible: bool,
    pub chroma_color: Option<[u8; 3]>,
}

impl SpriteOverlay {
    pub fn new(locator: &str) -> Self {
        SpriteOverlay {
            locator: locator.to_string(),
            position: [0, 0],
            visible: true,
            chroma_color: None,
        }
    }
}

/// A short sampled sound cue, serviced at idle.
#[derive(Debug, Clone, Serialize)]
pub struct SoundCue {
    pub locator: String,
    pub looping: bool,
    remaining_ticks: u32,
    duration_ticks: u32,
}

impl SoundCue {
    pub fn new(locator: &str, duration_ticks: u32, looping: bool) -> Self {
        let duration = duration_ticks.max(1);
        SoundCue {
            locator: locator.to_string(),
            looping,
            remaining_ticks: duration,
            duration_ticks: duration,
        }
    }

    /// Returns true when the cue has finished for good.
    fn tick(&mut self) -> bool {
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        if self.remaining_ticks == 0 {
            if self.looping {
                self.remaining_ticks = self.duration_ticks;
            } else {
                return true;
            }
        }
        false
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum EntryPayload {
    Movie(MovieClip),
    Effect(EffectDef),
    Model(SceneModel),
    Sprite(SpriteOverlay),
    Sound(SoundCue),
}

impl EntryPayload {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryPayload::Movie(_) => EntryKind::Movie,
            EntryPayload::Effect(_) => EntryKind::Effect,
            EntryPayload::Model(_) => EntryKind::Model,
            EntryPayload::Sprite(_) => EntryKind::Sprite,
            EntryPayload::Sound(_) => EntryKind::Sound,
        }
    }

    /// Resource release, run exactly once when the entry leaves the registry.
    fn teardown_events(&self, entry_id: u32) -> Vec<String> {
        match self {
            EntryPayload::Movie(clip) => vec![format!("clip.release {}", clip.locator)],
            EntryPayload::Effect(_) => vec![format!("effect.release {entry_id}")],
            EntryPayload::Model(model) => vec![format!("model.release {}", model.shape)],
            EntryPayload::Sprite(sprite) => vec![format!("sprite.release {}", sprite.locator)],
            EntryPayload::Sound(cue) => vec![format!("sound.release {}", cue.locator)],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryEntry {
    pub node: NodeBinding,
    pub entry_id: u32,
    pub payload: EntryPayload,
}

/// Summary of registry contents for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub movies: usize,
    pub effects: usize,
    pub models: usize,
    pub sprites: usize,
    pub sounds: usize,
}

#[derive(Debug, Default)]
pub struct ObjectRegistry {
    next_handle: u64,
    lists: BTreeMap<EntryKind, BTreeMap<EntryHandle, RegistryEntry>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        ObjectRegistry::default()
    }

    /// Adds an entry with this kind and id already delisted if present, so
    /// ids stay unique per kind. Returns the new handle and the teardown
    /// events of any entry it replaced.
    pub fn enlist_replacing(
        &mut self,
        node: NodeBinding,
        entry_id: u32,
        payload: EntryPayload,
    ) -> (EntryHandle, Vec<String>) {
        let events = match self.lookup_handle(payload.kind(), entry_id) {
            Some(handle) => self.delist(handle),
            None => Vec::new(),
        };
        (self.enlist(node, entry_id, payload), events)
    }

    /// Adds an entry and returns its handle. Entry ids are unique per kind;
    /// callers resolve collisions (delist-then-enlist, or
    /// [`enlist_replacing`](Self::enlist_replacing)) before calling.
    pub fn enlist(&mut self, node: NodeBinding, entry_id: u32, payload: EntryPayload) -> EntryHandle {
        let handle = EntryHandle(self.next_handle);
        self.next_handle += 1;
        let kind = payload.kind();
        debug!("enlist {kind} {entry_id} as {handle:?}");
        self.lists.entry(kind).or_default().insert(
            handle,
            RegistryEntry {
                node,
                entry_id,
                payload,
            },
        );
        handle
    }

    pub fn lookup(&self, kind: EntryKind, entry_id: u32) -> Option<&RegistryEntry> {
        self.lists
            .get(&kind)?
            .values()
            .find(|entry| entry.entry_id == entry_id)
    }

    pub fn lookup_mut(&mut self, kind: EntryKind, entry_id: u32) -> Option<&mut RegistryEntry> {
        self.lists
            .get_mut(&kind)?
            .values_mut()
            .find(|entry| entry.entry_id == entry_id)
    }

    /// Like [`lookup_mut`](Self::lookup_mut) but an absent entry is an error,
    /// for commands that only make sense against something already enlisted.
    pub fn require_mut(
        &mut self,
        kind: EntryKind,
        entry_id: u32,
    ) -> crate::error::Result<&mut RegistryEntry> {
        self.lookup_mut(kind, entry_id)
            .ok_or(crate::error::CoreError::NotFound { kind, entry_id })
    }

    pub fn lookup_handle(&self, kind: EntryKind, entry_id: u32) -> Option<EntryHandle> {
        self.lists
            .get(&kind)?
            .iter()
            .find(|(_, entry)| entry.entry_id == entry_id)
            .map(|(handle, _)| *handle)
    }

    pub fn get(&self, handle: EntryHandle) -> Option<&RegistryEntry> {
        self.lists.values().find_map(|list| list.get(&handle))
    }

    /// Removes an entry and runs its teardown. A second delist of the same
    /// handle is a no-op returning no events.
    pub fn delist(&mut self, handle: EntryHandle) -> Vec<String> {
        for list in self.lists.values_mut() {
            if let Some(entry) = list.remove(&handle) {
                let mut events = entry.payload.teardown_events(entry.entry_id);
                events.push(format!(
                    "registry.delist {} {}",
                    entry.payload.kind(),
                    entry.entry_id
                ));
                return events;
            }
        }
        Vec::new()
    }

    pub fn len(&self, kind: EntryKind) -> usize {
        self.lists.get(&kind).map(BTreeMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.lists.values().all(BTreeMap::is_empty)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            movies: self.len(EntryKind::Movie),
            effects: self.len(EntryKind::Effect),
            models: self.len(EntryKind::Model),
            sprites: self.len(EntryKind::Sprite),
            sounds: self.len(EntryKind::Sound),
        }
    }

    pub fn movie_clips_mut(&mut self) -> impl Iterator<Item = &mut MovieClip> {
        self.lists
            .get_mut(&EntryKind::Movie)
            .into_iter()
            .flat_map(BTreeMap::values_mut)
            .filter_map(|entry| match entry.payload {
                EntryPayload::Movie(ref mut clip) => Some(clip),
                _ => None,
            })
    }

    pub fn entries(&self, kind: EntryKind) -> impl Iterator<Item = &RegistryEntry> {
        self.lists.get(&kind).into_iter().flat_map(BTreeMap::values)
    }

    fn handles(&self, kind: EntryKind) -> Vec<EntryHandle> {
        self.lists
            .get(&kind)
            .map(|list| list.keys().copied().collect())
            .unwrap_or_default()
    }

    /// One idle pass: advance audio-only clips and sound cues, reap finished
    /// one-shot clips, and sweep expired effects. Handles are snapshotted up
    /// front so servicing one entry may delist another without skipping.
    pub fn idle_tick(&mut self) -> Vec<String> {
        let mut events = Vec::new();

        for handle in self.handles(EntryKind::Movie) {
            let done = {
                let Some(entry) = self.entry_mut(EntryKind::Movie, handle) else {
                    continue;
                };
                let EntryPayload::Movie(ref mut clip) = entry.payload else {
                    continue;
                };
                if clip.content.has_audio() && !clip.content.has_video() {
                    if clip.advance() {
                        events.push(format!("clip.done {}", entry.entry_id));
                    }
                }
                clip.is_done()
            };
            if done {
                events.extend(self.delist(handle));
            }
        }

        for handle in self.handles(EntryKind::Sound) {
            let done = {
                let Some(entry) = self.entry_mut(EntryKind::Sound, handle) else {
                    continue;
                };
                let EntryPayload::Sound(ref mut cue) = entry.payload else {
                    continue;
                };
                cue.tick()
            };
            if done {
                events.extend(self.delist(handle));
            }
        }

        for handle in self.handles(EntryKind::Model) {
            if let Some(entry) = self.entry_mut(EntryKind::Model, handle) {
                if let EntryPayload::Model(ref mut model) = entry.payload {
                    if model.is_spinning() {
                        model.spin_step();
                    }
                }
            }
        }

        for handle in self.handles(EntryKind::Effect) {
            let expired = self
                .entry_mut(EntryKind::Effect, handle)
                .map(|entry| match entry.payload {
                    EntryPayload::Effect(ref def) => def.is_expired(),
                    _ => false,
                })
                .unwrap_or(false);
            if expired {
                events.extend(self.delist(handle));
            }
        }

        events
    }

    /// Advances only sound-bearing clips and cues. Used while a blocking
    /// transition owns the control thread and video must not be touched.
    pub fn service_ambient_audio(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        for handle in self.handles(EntryKind::Movie) {
            let done = {
                let Some(entry) = self.entry_mut(EntryKind::Movie, handle) else {
                    continue;
                };
                let EntryPayload::Movie(ref mut clip) = entry.payload else {
                    continue;
                };
                if !clip.content.has_audio() || clip.content.has_video() {
                    continue;
                }
                if clip.advance() {
                    events.push(format!("clip.done {}", entry.entry_id));
                }
                clip.is_done()
            };
            if done {
                events.extend(self.delist(handle));
            }
        }
        for handle in self.handles(EntryKind::Sound) {
            let done = {
                let Some(entry) = self.entry_mut(EntryKind::Sound, handle) else {
                    continue;
                };
                let EntryPayload::Sound(ref mut cue) = entry.payload else {
                    continue;
                };
                cue.tick()
            };
            if done {
                events.extend(self.delist(handle));
            }
        }
        events
    }

    /// Advances the first video-bearing clip in enlistment order. Only one
    /// serviced video plays at a time; later video clips wait their turn.
    pub fn service_video(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        let target = self.handles(EntryKind::Movie).into_iter().find(|handle| {
            matches!(
                self.get(*handle),
                Some(RegistryEntry {
                    payload: EntryPayload::Movie(ref clip),
                    ..
                }) if clip.content.has_video()
            )
        });
        let Some(handle) = target else {
            return events;
        };
        let done = {
            let Some(entry) = self.entry_mut(EntryKind::Movie, handle) else {
                return events;
            };
            let EntryPayload::Movie(ref mut clip) = entry.payload else {
                return events;
            };
            if clip.advance() {
                events.push(format!("clip.done {}", entry.entry_id));
            }
            clip.is_done()
        };
        if done {
            events.extend(self.delist(handle));
        }
        events
    }

    /// Removes every entry the scope selects, running each teardown once.
    pub fn dump_selected(&mut self, scope: DumpScope) -> Vec<String> {
        let mut events = Vec::new();
        let kinds: Vec<EntryKind> = self.lists.keys().copied().collect();
        for kind in kinds {
            for handle in self.handles(kind) {
                let selected = self
                    .get(handle)
                    .map(|entry| match scope {
                        DumpScope::Node => matches!(entry.node, NodeBinding::Node(_)),
                        DumpScope::Scene => entry.node == NodeBinding::Scene,
                    })
                    .unwrap_or(false);
                if selected {
                    events.extend(self.delist(handle));
                }
            }
        }
        events
    }

    fn entry_mut(&mut self, kind: EntryKind, handle: EntryHandle) -> Option<&mut RegistryEntry> {
        self.lists.get_mut(&kind)?.get_mut(&handle)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DumpScope, EntryKind, EntryPayload, NodeBinding, ObjectRegistry, SceneModel, SoundCue,
        SpriteOverlay,
    };

    fn sound(registry: &mut ObjectRegistry, node: NodeBinding, id: u32, ticks: u32) {
        registry.enlist(
            node,
            id,
            EntryPayload::Sound(SoundCue::new("chime.snd", ticks, false)),
        );
    }

    #[test]
    fn delist_is_idempotent() {
        let mut registry = ObjectRegistry::new();
        let handle = registry.enlist(
            NodeBinding::Scene,
            1,
            EntryPayload::Sprite(SpriteOverlay::new("logo.pict")),
        );
        let first = registry.delist(handle);
        assert!(first.iter().any(|event| event.starts_with("sprite.release")));
        assert!(registry.lookup(EntryKind::Sprite, 1).is_none());
        assert!(registry.delist(handle).is_empty());
    }

    #[test]
    fn re_enlisting_an_id_replaces_the_old_entry() {
        let mut registry = ObjectRegistry::new();
        sound(&mut registry, NodeBinding::Node(1), 6, 100);
        let (_, events) = registry.enlist_replacing(
            NodeBinding::Scene,
            6,
            EntryPayload::Sound(SoundCue::new("surf.snd", 50, true)),
        );
        assert_eq!(registry.len(EntryKind::Sound), 1);
        assert!(events.iter().any(|event| event.starts_with("sound.release chime.snd")));
        let entry = registry.lookup(EntryKind::Sound, 6).expect("replacement");
        assert_eq!(entry.node, NodeBinding::Scene);
    }

    #[test]
    fn lookup_finds_entries_by_kind_and_id() {
        let mut registry = ObjectRegistry::new();
        registry.enlist(
            NodeBinding::Node(2),
            5,
            EntryPayload::Model(SceneModel::new("box")),
        );
        assert!(registry.lookup(EntryKind::Model, 5).is_some());
        assert!(registry.lookup(EntryKind::Model, 6).is_none());
        assert!(registry.lookup(EntryKind::Sprite, 5).is_none());
    }

    #[test]
    fn node_dump_spares_scene_wide_entries() {
        let mut registry = ObjectRegistry::new();
        sound(&mut registry, NodeBinding::Node(1), 10, 100);
        sound(&mut registry, NodeBinding::Node(2), 11, 100);
        sound(&mut registry, NodeBinding::Scene, 12, 100);

        registry.dump_selected(DumpScope::Node);
        assert!(registry.lookup(EntryKind::Sound, 10).is_none());
        assert!(registry.lookup(EntryKind::Sound, 11).is_none());
        assert!(registry.lookup(EntryKind::Sound, 12).is_some());
    }

    #[test]
    fn scene_dump_is_the_exact_inverse_of_node_dump() {
        let mut registry = ObjectRegistry::new();
        sound(&mut registry, NodeBinding::Node(1), 10, 100);
        sound(&mut registry, NodeBinding::Scene, 12, 100);
        registry.enlist(
            NodeBinding::Scene,
            1,
            EntryPayload::Model(SceneModel::new("torus")),
        );

        let events = registry.dump_selected(DumpScope::Scene);
        assert!(registry.lookup(EntryKind::Sound, 10).is_some());
        assert!(registry.lookup(EntryKind::Sound, 12).is_none());
        assert!(registry.lookup(EntryKind::Model, 1).is_none());
        let releases = events
            .iter()
            .filter(|event| event.contains(".release"))
            .count();
        assert_eq!(releases, 2);

        registry.dump_selected(DumpScope::Node);
        assert!(registry.is_empty());
    }

    #[test]
    fn finished_sound_cue_is_reaped_at_idle() {
        let mut registry = ObjectRegistry::new();
        sound(&mut registry, NodeBinding::Scene, 4, 2);
        registry.idle_tick();
        assert!(registry.lookup(EntryKind::Sound, 4).is_some());
        registry.idle_tick();
        assert!(registry.lookup(EntryKind::Sound, 4).is_none());
    }

    #[test]
    fn looping_sound_cue_survives_idle() {
        let mut registry = ObjectRegistry::new();
        registry.enlist(
            NodeBinding::Scene,
            4,
            EntryPayload::Sound(SoundCue::new("amb.snd", 2, true)),
        );
        for _ in 0..10 {
            registry.idle_tick();
        }
        assert!(registry.lookup(EntryKind::Sound, 4).is_some());
    }

    #[test]
    fn spinning_model_advances_at_idle() {
        let mut registry = ObjectRegistry::new();
        let mut model = SceneModel::new("cone");
        model.spin_rate = [0.0, 0.5, 0.0];
        registry.enlist(NodeBinding::Scene, 9, EntryPayload::Model(model));
        registry.idle_tick();
        registry.idle_tick();
        match registry.lookup(EntryKind::Model, 9).unwrap().payload {
            EntryPayload::Model(ref model) => assert_eq!(model.rotation[1], 1.0),
            _ => panic!("wrong payload"),
        }
    }
}
