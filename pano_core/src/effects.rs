//! Node-to-node transition effects. An effect runs in three phases: setup
//! captures the outgoing view and redirects rendering offscreen, run
//! composites the captured view against the freshly rendered destination one
//! step at a time, and teardown releases everything. Teardown is idempotent
//! so error paths can call it unconditionally.

use log::{debug, warn};
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::registry::{EntryKind, EntryPayload, ObjectRegistry};
use crate::surface::{RenderHost, Surface};

/// How many composite steps a transition takes when the effect does not say.
pub const DEFAULT_STEP_COUNT: u32 = 16;

/// Steps between ambient-audio service calls while a transition runs.
const AUDIO_SERVICE_STEP: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EffectKind {
    Crossfade,
    WipeLeft,
    WipeRight,
    Iris,
}

/// Which source or destination nodes an effect definition applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeFilter {
    /// Matches any node.
    Any,
    Node(u32),
}

impl NodeFilter {
    pub fn matches(self, node_id: u32) -> bool {
        match self {
            NodeFilter::Any => true,
            NodeFilter::Node(id) => id == node_id,
        }
    }
}

/// An enlisted transition-effect definition.
#[derive(Debug, Clone, Serialize)]
pub struct EffectDef {
    pub kind: EffectKind,
    pub from: NodeFilter,
    pub to: NodeFilter,
    pub steps: u32,
    /// `None` means the effect never expires; `Some(n)` is a budget of
    /// remaining runs. At zero the definition is swept from the registry.
    pub runs_remaining: Option<u32>,
}

impl EffectDef {
    pub fn new(kind: EffectKind, from: NodeFilter, to: NodeFilter) -> Self {
        EffectDef {
            kind,
            from,
            to,
            steps: DEFAULT_STEP_COUNT,
            runs_remaining: None,
        }
    }

    pub fn applies_to(&self, from_node: u32, to_node: u32) -> bool {
        !self.is_expired() && self.from.matches(from_node) && self.to.matches(to_node)
    }

    pub fn is_expired(&self) -> bool {
        self.runs_remaining == Some(0)
    }

    fn consume_run(&mut self) {
        if let Some(runs) = self.runs_remaining.as_mut() {
            *runs = runs.saturating_sub(1);
        }
    }
}

/// A clock that only moves when told to. Each composite step sets the value
/// explicitly so the effect's progress is driven by the step loop, not by
/// wall time.
#[derive(Debug, Clone, Copy)]
pub struct SteppedClock {
    value: u32,
}

impl SteppedClock {
    pub fn paused() -> Self {
        SteppedClock { value: 0 }
    }

    pub fn set_value(&mut self, value: u32) {
        self.value = value;
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}

/// State held between setup and teardown. Every resource sits behind an
/// Option so teardown can release each exactly once.
struct TransitionSession {
    kind: EffectKind,
    steps: u32,
    entry_id: u32,
    source: Option<Surface>,
    destination: Option<Surface>,
    frame: Option<Surface>,
    clock: Option<SteppedClock>,
}

#[derive(Debug, Default)]
pub struct TransitionEngine {
    session: Option<TransitionSession>,
}

impl std::fmt::Debug for TransitionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionSession")
            .field("kind", &self.kind)
            .field("steps", &self.steps)
            .field("entry_id", &self.entry_id)
            .finish()
    }
}

impl TransitionEngine {
    pub fn new() -> Self {
        TransitionEngine::default()
    }

    pub fn in_flight(&self) -> bool {
        self.session.is_some()
    }

    /// Phase one. Picks the first enlisted effect matching the hop, captures
    /// the outgoing view, and redirects rendering offscreen. Returns `None`
    /// (and touches nothing) when no effect matches or a surface cannot be
    /// allocated, so the caller degrades to an instant cut.
    pub fn setup(
        &mut self,
        registry: &ObjectRegistry,
        host: &mut dyn RenderHost,
        from_node: u32,
        to_node: u32,
    ) -> Result<Option<Vec<String>>> {
        if self.session.is_some() {
            return Err(CoreError::TransitionInFlight);
        }

        let matched = registry.entries(EntryKind::Effect).find_map(|entry| {
            match entry.payload {
                EntryPayload::Effect(ref def) if def.applies_to(from_node, to_node) => {
                    Some((entry.entry_id, def.clone()))
                }
                _ => None,
            }
        });
        let Some((entry_id, def)) = matched else {
            debug!("no transition effect for {from_node} -> {to_node}");
            return Ok(None);
        };

        // Both surfaces are claimed before anything observable changes, so a
        // failed allocation leaves nothing to unwind.
        let (width, height) = host.view_size();
        let allocated = Surface::allocate(width, height)
            .and_then(|source| Surface::allocate(width, height).map(|frame| (source, frame)));
        let (mut source, frame) = match allocated {
            Ok(pair) => pair,
            Err(err) => {
                warn!("cutting without a transition: {err}");
                return Ok(None);
            }
        };
        host.snapshot_view(&mut source);
        host.redirect_offscreen();

        self.session = Some(TransitionSession {
            kind: def.kind,
            steps: def.steps.max(1),
            entry_id,
            source: Some(source),
            destination: None,
            frame: Some(frame),
            clock: Some(SteppedClock::paused()),
        });
        Ok(Some(vec![format!(
            "transition.setup {entry_id} ({:?}) {from_node} -> {to_node}",
            def.kind
        )]))
    }

    /// Phase two. Snapshots the destination view (rendered offscreen since
    /// setup), restores on-screen rendering, then composites and presents one
    /// frame per step. Ambient audio is serviced every few steps. An
    /// allocation failure here cuts straight to the destination view.
    pub fn run(&mut self, registry: &mut ObjectRegistry, host: &mut dyn RenderHost) -> Vec<String> {
        if self.session.is_none() {
            warn!("transition.run without setup");
            return Vec::new();
        }

        let (width, height) = host.view_size();
        let mut destination = match Surface::allocate(width, height) {
            Ok(surface) => surface,
            Err(err) => {
                warn!("cutting without a transition: {err}");
                return self.teardown(host);
            }
        };
        host.snapshot_view(&mut destination);
        host.restore_screen();

        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        session.destination = Some(destination);

        let mut events = Vec::new();
        let steps = session.steps;
        for tick in 1..=steps {
            // Progress comes off the paused clock, never wall time.
            let step = match session.clock.as_mut() {
                Some(clock) => {
                    clock.set_value(tick);
                    clock.value()
                }
                None => tick,
            };
            let (source, destination, frame) = match (
                session.source.as_ref(),
                session.destination.as_ref(),
                session.frame.as_mut(),
            ) {
                (Some(source), Some(destination), Some(frame)) => (source, destination, frame),
                _ => break,
            };
            composite_step(session.kind, source, destination, frame, step, steps);
            host.present_frame(frame);
            if step % AUDIO_SERVICE_STEP == 0 {
                events.extend(registry.service_ambient_audio());
            }
        }
        events.push(format!("transition.run {} steps {steps}", session.entry_id));

        let entry_id = session.entry_id;
        if let Some(entry) = registry.lookup_mut(EntryKind::Effect, entry_id) {
            if let EntryPayload::Effect(ref mut def) = entry.payload {
                def.consume_run();
            }
        }

        events.extend(self.teardown(host));
        events
    }

    /// Phase three. Releases every session resource exactly once; calling it
    /// again, or without a session, does nothing.
    pub fn teardown(&mut self, host: &mut dyn RenderHost) -> Vec<String> {
        let Some(mut session) = self.session.take() else {
            return Vec::new();
        };
        // Rendering may still be redirected if run() never happened.
        if session.destination.is_none() {
            host.restore_screen();
        }
        session.source.take();
        session.destination.take();
        session.frame.take();
        session.clock.take();
        vec![format!("transition.teardown {}", session.entry_id)]
    }
}

/// Writes one composite frame for `step` of `steps` into `frame`.
fn composite_step(
    kind: EffectKind,
    source: &Surface,
    destination: &Surface,
    frame: &mut Surface,
    step: u32,
    steps: u32,
) {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let progress = f64::from(step) / f64::from(steps);
    match kind {
        EffectKind::Crossfade => {
            let src = source.pixels();
            let dst = destination.pixels();
            let out = frame.pixels_mut();
            for index in 0..out.len().min(src.len()).min(dst.len()) {
                let a = f64::from(src[index]);
                let b = f64::from(dst[index]);
                out[index] = (a + (b - a) * progress) as u8;
            }
        }
        EffectKind::WipeLeft | EffectKind::WipeRight => {
            let boundary = (progress * width as f64) as usize;
            let src = source.pixels();
            let dst = destination.pixels();
            let out = frame.pixels_mut();
            for row in 0..height {
                for col in 0..width {
                    let revealed = match kind {
                        EffectKind::WipeRight => col < boundary,
                        _ => col >= width - boundary,
                    };
                    let base = (row * width + col) * 4;
                    let from = if revealed { dst } else { src };
                    out[base..base + 4].copy_from_slice(&from[base..base + 4]);
                }
            }
        }
        EffectKind::Iris => {
            // Destination grows outward from the view center as a rectangle.
            let half_w = (progress * width as f64 / 2.0) as usize;
            let half_h = (progress * height as f64 / 2.0) as usize;
            let (cx, cy) = (width / 2, height / 2);
            let src = source.pixels();
            let dst = destination.pixels();
            let out = frame.pixels_mut();
            for row in 0..height {
                for col in 0..width {
                    let inside = col.abs_diff(cx) <= half_w && row.abs_diff(cy) <= half_h;
                    let base = (row * width + col) * 4;
                    let from = if inside { dst } else { src };
                    out[base..base + 4].copy_from_slice(&from[base..base + 4]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        composite_step, EffectDef, EffectKind, NodeFilter, SteppedClock, TransitionEngine,
        DEFAULT_STEP_COUNT,
    };
    use crate::registry::{EntryKind, EntryPayload, NodeBinding, ObjectRegistry};
    use crate::surface::{PlainViewHost, RenderHost, RenderTarget, Surface};

    fn enlist_effect(registry: &mut ObjectRegistry, id: u32, def: EffectDef) {
        registry.enlist(NodeBinding::Scene, id, EntryPayload::Effect(def));
    }

    fn wildcard_crossfade() -> EffectDef {
        EffectDef::new(EffectKind::Crossfade, NodeFilter::Any, NodeFilter::Any)
    }

    /// Host whose view color and size can change mid-protocol and which keeps
    /// the pixels of the last presented frame.
    struct PaintedHost {
        width: u32,
        height: u32,
        view_color: [u8; 4],
        target: RenderTarget,
        last_frame: Option<Vec<u8>>,
    }

    impl PaintedHost {
        fn new(width: u32, height: u32, view_color: [u8; 4]) -> Self {
            PaintedHost {
                width,
                height,
                view_color,
                target: RenderTarget::Screen,
                last_frame: None,
            }
        }
    }

    impl RenderHost for PaintedHost {
        fn view_size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn render_target(&self) -> RenderTarget {
            self.target
        }

        fn snapshot_view(&mut self, into: &mut Surface) {
            into.fill(self.view_color);
        }

        fn redirect_offscreen(&mut self) {
            self.target = RenderTarget::Offscreen;
        }

        fn restore_screen(&mut self) {
            self.target = RenderTarget::Screen;
        }

        fn present_frame(&mut self, frame: &Surface) {
            self.last_frame = Some(frame.pixels().to_vec());
        }
    }

    #[test]
    fn setup_skips_hops_with_no_matching_effect() {
        let mut registry = ObjectRegistry::new();
        enlist_effect(
            &mut registry,
            1,
            EffectDef::new(EffectKind::Iris, NodeFilter::Node(5), NodeFilter::Any),
        );
        let mut host = PlainViewHost::new(8, 8, [0, 0, 0, 255]);
        let mut engine = TransitionEngine::new();
        let outcome = engine
            .setup(&registry, &mut host, 1, 2)
            .expect("setup");
        assert!(outcome.is_none());
        assert!(!engine.in_flight());
        assert_eq!(host.render_target(), RenderTarget::Screen);
    }

    #[test]
    fn wildcard_effect_matches_any_hop() {
        let mut registry = ObjectRegistry::new();
        enlist_effect(&mut registry, 1, wildcard_crossfade());
        let mut host = PlainViewHost::new(8, 8, [0, 0, 0, 255]);
        let mut engine = TransitionEngine::new();
        let outcome = engine
            .setup(&registry, &mut host, 3, 9)
            .expect("setup");
        assert!(outcome.is_some());
        assert!(engine.in_flight());
        assert_eq!(host.render_target(), RenderTarget::Offscreen);
        engine.teardown(&mut host);
    }

    #[test]
    fn first_enlisted_match_wins() {
        let mut registry = ObjectRegistry::new();
        enlist_effect(
            &mut registry,
            1,
            EffectDef::new(EffectKind::Iris, NodeFilter::Any, NodeFilter::Node(2)),
        );
        enlist_effect(&mut registry, 2, wildcard_crossfade());
        let mut host = PlainViewHost::new(8, 8, [0, 0, 0, 255]);
        let mut engine = TransitionEngine::new();
        let events = engine
            .setup(&registry, &mut host, 1, 2)
            .expect("setup")
            .expect("matched");
        assert!(events[0].starts_with("transition.setup 1"));
        engine.teardown(&mut host);
    }

    #[test]
    fn second_setup_while_in_flight_is_an_error() {
        let mut registry = ObjectRegistry::new();
        enlist_effect(&mut registry, 1, wildcard_crossfade());
        let mut host = PlainViewHost::new(8, 8, [0, 0, 0, 255]);
        let mut engine = TransitionEngine::new();
        engine.setup(&registry, &mut host, 1, 2).expect("setup");
        assert!(engine.setup(&registry, &mut host, 2, 3).is_err());
        engine.teardown(&mut host);
    }

    #[test]
    fn run_presents_one_frame_per_step_and_tears_down() {
        let mut registry = ObjectRegistry::new();
        enlist_effect(&mut registry, 1, wildcard_crossfade());
        let mut host = PlainViewHost::new(8, 8, [10, 10, 10, 255]);
        let mut engine = TransitionEngine::new();
        engine.setup(&registry, &mut host, 1, 2).expect("setup");
        let events = engine.run(&mut registry, &mut host);
        assert_eq!(host.frames_presented(), DEFAULT_STEP_COUNT as u64);
        assert_eq!(host.render_target(), RenderTarget::Screen);
        assert!(!engine.in_flight());
        assert!(events.iter().any(|event| event.starts_with("transition.run 1")));
        assert!(events
            .iter()
            .any(|event| event.starts_with("transition.teardown 1")));
    }

    #[test]
    fn setup_cuts_when_the_view_surface_cannot_be_allocated() {
        let mut registry = ObjectRegistry::new();
        enlist_effect(&mut registry, 1, wildcard_crossfade());
        let mut host = PlainViewHost::new(0, 0, [0, 0, 0, 255]);
        let mut engine = TransitionEngine::new();
        let outcome = engine.setup(&registry, &mut host, 1, 2).expect("setup");
        assert!(outcome.is_none());
        assert!(!engine.in_flight());
        assert_eq!(host.render_target(), RenderTarget::Screen);
    }

    #[test]
    fn run_cuts_and_tears_down_when_allocation_fails_mid_flight() {
        let mut registry = ObjectRegistry::new();
        enlist_effect(&mut registry, 1, wildcard_crossfade());
        let mut host = PaintedHost::new(8, 8, [0, 0, 0, 255]);
        let mut engine = TransitionEngine::new();
        engine.setup(&registry, &mut host, 1, 2).expect("setup");
        host.width = 0;
        host.height = 0;
        let events = engine.run(&mut registry, &mut host);
        assert_eq!(events, vec!["transition.teardown 1".to_string()]);
        assert!(host.last_frame.is_none());
        assert_eq!(host.render_target(), RenderTarget::Screen);
        assert!(!engine.in_flight());
    }

    #[test]
    fn run_final_frame_matches_the_destination_view() {
        let mut registry = ObjectRegistry::new();
        enlist_effect(&mut registry, 1, wildcard_crossfade());
        let mut host = PaintedHost::new(4, 4, [0, 0, 0, 255]);
        let mut engine = TransitionEngine::new();
        engine.setup(&registry, &mut host, 1, 2).expect("setup");
        host.view_color = [200, 100, 50, 255];
        let events = engine.run(&mut registry, &mut host);
        assert!(events.iter().any(|event| event.starts_with("transition.run 1")));
        let frame = host.last_frame.expect("frame");
        assert!(frame.chunks(4).all(|px| px == [200, 100, 50, 255]));
    }

    #[test]
    fn run_and_teardown_without_setup_are_safe_no_ops() {
        let mut registry = ObjectRegistry::new();
        let mut host = PlainViewHost::new(8, 8, [0, 0, 0, 255]);
        let mut engine = TransitionEngine::new();
        assert!(engine.run(&mut registry, &mut host).is_empty());
        assert!(engine.teardown(&mut host).is_empty());
        assert_eq!(host.frames_presented(), 0);
        assert!(!engine.in_flight());
    }

    #[test]
    fn teardown_twice_restores_screen_once_and_stays_quiet() {
        let mut registry = ObjectRegistry::new();
        enlist_effect(&mut registry, 1, wildcard_crossfade());
        let mut host = PlainViewHost::new(8, 8, [0, 0, 0, 255]);
        let mut engine = TransitionEngine::new();
        engine.setup(&registry, &mut host, 1, 2).expect("setup");
        let first = engine.teardown(&mut host);
        assert_eq!(first.len(), 1);
        assert_eq!(host.render_target(), RenderTarget::Screen);
        assert!(engine.teardown(&mut host).is_empty());
    }

    #[test]
    fn run_budget_expires_the_definition() {
        let mut registry = ObjectRegistry::new();
        let mut def = wildcard_crossfade();
        def.runs_remaining = Some(1);
        enlist_effect(&mut registry, 1, def);
        let mut host = PlainViewHost::new(8, 8, [0, 0, 0, 255]);
        let mut engine = TransitionEngine::new();
        engine.setup(&registry, &mut host, 1, 2).expect("setup");
        engine.run(&mut registry, &mut host);

        registry.idle_tick();
        assert!(registry.lookup(EntryKind::Effect, 1).is_none());
        assert!(engine.setup(&registry, &mut host, 2, 3).expect("setup").is_none());
    }

    #[test]
    fn crossfade_final_step_matches_destination() {
        let source = {
            let mut surface = Surface::allocate(4, 4).expect("alloc");
            surface.fill([0, 0, 0, 255]);
            surface
        };
        let destination = {
            let mut surface = Surface::allocate(4, 4).expect("alloc");
            surface.fill([200, 100, 50, 255]);
            surface
        };
        let mut frame = Surface::allocate(4, 4).expect("alloc");
        composite_step(EffectKind::Crossfade, &source, &destination, &mut frame, 8, 8);
        assert_eq!(frame.pixels(), destination.pixels());
    }

    #[test]
    fn stepped_clock_moves_only_when_set() {
        let mut clock = SteppedClock::paused();
        assert_eq!(clock.value(), 0);
        clock.set_value(5);
        assert_eq!(clock.value(), 5);
    }
}
