//! Host-facing run driver
//!
//! A `Session` owns the current `World` and turns variable frame times into
//! fixed ticks. Hosts feed it input between frames, call `advance` once per
//! frame, then read the world to draw it.

use rand::Rng;

use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::settings::Settings;
use crate::sim::state::MAX_PENDING_EVENTS;
use crate::sim::{
    Action, GameEvent, InputState, RunStats, SimConfig, TickInput, Viewport, World, apply_action,
    tick,
};

/// Frame times above this are clamped (tab switches, debugger pauses)
pub const MAX_FRAME_DT: f32 = 0.1;

pub struct Session {
    world: World,
    config: SimConfig,
    input: InputState,
    accumulator: f32,
    events: Vec<GameEvent>,
    finished: Option<RunStats>,
}

impl Session {
    pub fn new(seed: u64, settings: &Settings, viewport: Viewport) -> Self {
        let config = settings.sim_config(viewport);
        Self {
            world: World::new(seed, config),
            config,
            input: InputState::new(),
            accumulator: 0.0,
            events: Vec::new(),
            finished: None,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Queue a discrete action for the next tick
    pub fn push_action(&mut self, action: Action) {
        self.input.push(action);
    }

    /// Run as many fixed ticks as `dt` seconds cover; returns ticks run
    pub fn advance(&mut self, dt: f32) -> u32 {
        let dt = dt.min(MAX_FRAME_DT);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.step();
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        substeps
    }

    /// Run exactly one tick with the current input snapshot
    pub fn step(&mut self) {
        let (held, actions) = self.input.snapshot();
        for action in actions {
            if action == Action::Restart {
                // Reseed from the old run so a seeded session stays reproducible
                let seed = self.world.rng.random::<u64>();
                self.replace_world(seed);
                continue;
            }
            if let Err(e) = apply_action(&mut self.world, action) {
                log::debug!("Ignored {:?}: {}", action, e);
            }
        }
        self.tick_with(&held);
    }

    fn tick_with(&mut self, input: &TickInput) {
        tick(&mut self.world, input);
        self.events.extend(self.world.drain_events());
        if self.events.len() > MAX_PENDING_EVENTS {
            let excess = self.events.len() - MAX_PENDING_EVENTS;
            self.events.drain(..excess);
        }
        if let Some(stats) = self.world.take_finished_run() {
            self.finished = Some(stats);
        }
    }

    /// Start a fresh run with new settings, or the current ones
    pub fn restart(&mut self, seed: u64, settings: Option<&Settings>) {
        if let Some(settings) = settings {
            self.config = settings.sim_config(self.config.viewport);
        }
        self.replace_world(seed);
        self.input.clear();
        self.accumulator = 0.0;
    }

    fn replace_world(&mut self, seed: u64) {
        self.world = World::new(seed, self.config);
        self.events.clear();
        self.finished = None;
        log::info!("Run restarted with seed {}", seed);
    }

    /// Applies from the next run; the current world keeps its framing
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.config.viewport = viewport;
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Stats of the run that just ended, handed out once
    pub fn take_finished_run(&mut self) -> Option<RunStats> {
        self.finished.take()
    }
}
