//! Scene-level orchestration: tracks the current node and view pan, and
//! sequences node hops (effect setup, node-exit dumps, effect run, sound
//! re-attenuation).

use log::info;
use serde::Serialize;

use crate::effects::TransitionEngine;
use crate::error::Result;
use crate::playback::{apply_attenuation, MAX_SOUND_VOLUME};
use crate::registry::{DumpScope, ObjectRegistry};
use crate::surface::RenderHost;

#[derive(Debug)]
pub struct SceneContext {
    pub registry: ObjectRegistry,
    pub transitions: TransitionEngine,
    scene_name: Option<String>,
    current_node: u32,
    view_pan: f32,
    scene_volume: i16,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneStatus {
    pub scene: Option<String>,
    pub node: u32,
    pub view_pan: f32,
    pub scene_volume: i16,
}

impl SceneContext {
    pub fn new() -> Self {
        SceneContext {
            registry: ObjectRegistry::new(),
            transitions: TransitionEngine::new(),
            scene_name: None,
            current_node: 0,
            view_pan: 0.0,
            scene_volume: MAX_SOUND_VOLUME,
        }
    }

    pub fn current_node(&self) -> u32 {
        self.current_node
    }

    pub fn view_pan(&self) -> f32 {
        self.view_pan
    }

    pub fn scene_name(&self) -> Option<&str> {
        self.scene_name.as_deref()
    }

    pub fn scene_volume(&self) -> i16 {
        self.scene_volume
    }

    /// Sets the master volume and rescales every sounded clip.
    pub fn set_scene_volume(&mut self, volume: i16) {
        self.scene_volume = volume.clamp(0, MAX_SOUND_VOLUME);
        self.refresh_audio();
    }

    /// Reapplies balance, attenuation, and the master volume to every
    /// sounded clip for the current view.
    pub fn refresh_audio(&mut self) {
        apply_attenuation(&mut self.registry, self.view_pan, self.scene_volume);
    }

    pub fn status(&self) -> SceneStatus {
        SceneStatus {
            scene: self.scene_name.clone(),
            node: self.current_node,
            view_pan: self.view_pan,
            scene_volume: self.scene_volume,
        }
    }

    /// Opens a scene file, tearing the previous scene down first. The entry
    /// node becomes current.
    pub fn open_scene(&mut self, host: &mut dyn RenderHost, name: &str, entry_node: u32) -> Vec<String> {
        let mut events = self.close_scene(host);
        info!("opening scene {name} at node {entry_node}");
        self.scene_name = Some(name.to_string());
        self.current_node = entry_node;
        self.view_pan = 0.0;
        events.push(format!("scene.open {name} node {entry_node}"));
        events
    }

    /// Dumps every registry entry and abandons any in-flight transition.
    pub fn close_scene(&mut self, host: &mut dyn RenderHost) -> Vec<String> {
        let mut events = self.transitions.teardown(host);
        events.extend(self.registry.dump_selected(DumpScope::Node));
        events.extend(self.registry.dump_selected(DumpScope::Scene));
        if let Some(name) = self.scene_name.take() {
            events.push(format!("scene.close {name}"));
        }
        events
    }

    /// Moves the viewer to another node. When an enlisted effect matches the
    /// hop the move runs through the three-phase transition; otherwise it
    /// cuts. Node-bound entries are dumped on the way out either way.
    pub fn navigate(&mut self, host: &mut dyn RenderHost, to_node: u32) -> Result<Vec<String>> {
        let from_node = self.current_node;
        if from_node == to_node {
            return Ok(Vec::new());
        }
        let mut events = Vec::new();

        // Capture the outgoing view before anything at the old node changes.
        let staged = self
            .transitions
            .setup(&self.registry, host, from_node, to_node)?;
        if let Some(setup_events) = staged {
            events.extend(setup_events);
        }

        events.push(format!("node.exit {from_node}"));
        events.extend(self.registry.dump_selected(DumpScope::Node));
        self.current_node = to_node;

        if self.transitions.in_flight() {
            events.extend(self.transitions.run(&mut self.registry, host));
        }

        self.refresh_audio();
        events.push(format!("node.enter {to_node}"));
        Ok(events)
    }

    /// Turns the view and re-attenuates localized sounds for the new angle.
    pub fn set_view_pan(&mut self, pan: f32) {
        self.view_pan = pan;
        self.refresh_audio();
    }
}

impl Default for SceneContext {
    fn default() -> Self {
        SceneContext::new()
    }
}
