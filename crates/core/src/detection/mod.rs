mod clicker;
mod combat;
mod movement;
mod timer;
mod velocity;

pub use clicker::{AutoClickerA, AutoClickerB};
pub use combat::{KillAuraA, ReachA, ReachB};
pub use movement::{MovementA, MovementB, MovementC};
pub use timer::TimerA;
pub use velocity::VelocityA;

use crate::combat::{AttackSnapshot, ClickSnapshot, CombatResults};
use crate::config::{AuthorityMode, DetectorOverride, SessionConfig};
use crate::player::MovementSnapshot;

/// Per-tick counters handed to detectors that watch pacing rather than
/// individual packets.
#[derive(Debug, Clone, Copy)]
pub struct TickSnapshot {
    pub server_tick: u64,
    pub client_tick: u64,
}

/// One thing that happened in the session, in the shape detectors consume.
#[derive(Debug)]
pub enum DetectionEvent<'a> {
    Input(&'a MovementSnapshot),
    Attack(&'a AttackSnapshot),
    CombatResolved(&'a CombatResults),
    Click(&'a ClickSnapshot),
    Tick(&'a TickSnapshot),
}

/// A detector's reading of one event. Fails raise suspicion, debuffs wind it
/// back down as clean behavior accumulates.
#[derive(Debug)]
pub enum Observation {
    Fail {
        magnitude: f32,
        params: Vec<(&'static str, String)>,
    },
    Debuff(f32),
}

/// Static tuning for one detector. Per-session copies of these may be
/// adjusted by [`DetectorOverride`] entries before use.
#[derive(Debug, Clone, Copy)]
pub struct DetectorDescriptor {
    pub category: &'static str,
    pub variant: &'static str,
    /// Score ceiling; reaching it makes the detector eligible to punish.
    pub max_violations: f32,
    /// Ticks without a new violation before the score resets. Negative
    /// disables the reset.
    pub trust_duration: i32,
    /// Consecutive fails absorbed before one is forwarded as a violation.
    pub fail_buffer: f32,
    pub max_buffer: f32,
    pub punishable: bool,
}

impl DetectorDescriptor {
    pub fn id(&self) -> String {
        format!("{}_{}", self.category, self.variant).to_ascii_lowercase()
    }
}

pub trait Detector: Send {
    fn descriptor(&self) -> &'static DetectorDescriptor;

    fn observe(&mut self, event: &DetectionEvent) -> Option<Observation>;

    /// Clears transient working state, keeping nothing between server
    /// transfers. Violation scores live outside the detector and survive.
    fn reset(&mut self) {}
}

/// Violation accounting for one detector instance.
#[derive(Debug, Default)]
pub struct DetectorState {
    score: f32,
    buffer: f32,
    ticks_since_raise: i32,
    escalated: bool,
}

impl DetectorState {
    pub fn score(&self) -> f32 {
        self.score
    }

    fn debuff(&mut self, amount: f32, cap: f32) {
        self.score = (self.score - amount).max(0.0);
        self.buffer = (self.buffer - amount).max(0.0);
        if self.score < cap {
            self.escalated = false;
        }
    }

    /// Absorbs a fail into the buffer; returns whether it should surface as
    /// a violation.
    fn buffered_fail(&mut self, fail_buffer: f32, max_buffer: f32) -> bool {
        self.buffer = (self.buffer + 1.0).min(max_buffer);
        self.buffer >= fail_buffer
    }

    fn raise(&mut self, magnitude: f32, cap: f32) {
        self.score = (self.score + magnitude).min(cap);
        self.ticks_since_raise = 0;
    }

    fn tick(&mut self, trust_duration: i32) {
        if trust_duration < 0 {
            return;
        }
        self.ticks_since_raise = self.ticks_since_raise.saturating_add(1);
        if self.ticks_since_raise >= trust_duration && self.score > 0.0 {
            self.score = 0.0;
            self.escalated = false;
        }
    }
}

/// A violation that cleared its fail buffer. The score has already been
/// raised by the time handlers see this.
#[derive(Debug, Clone)]
pub struct FlagEvent {
    pub category: &'static str,
    pub variant: &'static str,
    pub magnitude: f32,
    pub score: f32,
    pub params: Vec<(&'static str, String)>,
    /// Set when this flag pushed the score to its ceiling on a punishable
    /// detector that has not already escalated.
    pub punish: bool,
}

#[derive(Debug, Clone)]
pub struct DebugEvent {
    pub category: &'static str,
    pub variant: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub enum DetectionOutput {
    Debug(DebugEvent),
    Flag(FlagEvent),
}

struct DetectionEntry {
    detector: Box<dyn Detector>,
    config: DetectorDescriptor,
    state: DetectorState,
}

/// The session's active detectors with their violation state. Which
/// detectors are present depends on the authority configuration; a detector
/// whose evidence the authority mode already rules out is never registered.
pub struct DetectionSet {
    entries: Vec<DetectionEntry>,
}

impl DetectionSet {
    pub fn from_config(config: &SessionConfig) -> Self {
        let mut detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(TimerA::new()),
            Box::new(AutoClickerA),
            Box::new(AutoClickerB),
            Box::new(KillAuraA::new()),
        ];
        if config.movement_authority == AuthorityMode::Semi {
            detectors.push(Box::new(MovementA));
            detectors.push(Box::new(MovementB));
            detectors.push(Box::new(MovementC));
            detectors.push(Box::new(VelocityA));
        }
        if config.combat_authority == AuthorityMode::Semi {
            detectors.push(Box::new(ReachA));
            detectors.push(Box::new(ReachB));
        }
        Self::with_detectors(detectors, &config.detector_overrides)
    }

    pub fn with_detectors(
        detectors: Vec<Box<dyn Detector>>,
        overrides: &[DetectorOverride],
    ) -> Self {
        let entries = detectors
            .into_iter()
            .map(|detector| {
                let mut config = *detector.descriptor();
                let id = config.id();
                if let Some(ov) = overrides
                    .iter()
                    .find(|ov| ov.detector.eq_ignore_ascii_case(&id))
                {
                    if let Some(v) = ov.max_violations {
                        config.max_violations = v;
                    }
                    if let Some(v) = ov.trust_duration {
                        config.trust_duration = v;
                    }
                    if let Some(v) = ov.fail_buffer {
                        config.fail_buffer = v;
                    }
                    if let Some(v) = ov.max_buffer {
                        config.max_buffer = v;
                    }
                    if let Some(v) = ov.punishable {
                        config.punishable = v;
                    }
                }
                DetectionEntry {
                    detector,
                    config,
                    state: DetectorState::default(),
                }
            })
            .collect();
        Self { entries }
    }

    /// Feeds one event through every detector and collects what surfaced.
    pub fn observe(&mut self, event: &DetectionEvent) -> Vec<DetectionOutput> {
        let mut outputs = Vec::new();
        for entry in &mut self.entries {
            let Some(observation) = entry.detector.observe(event) else {
                continue;
            };
            match observation {
                Observation::Debuff(amount) => {
                    entry.state.debuff(amount, entry.config.max_violations);
                }
                Observation::Fail { magnitude, params } => {
                    if entry
                        .state
                        .buffered_fail(entry.config.fail_buffer, entry.config.max_buffer)
                    {
                        entry.state.raise(magnitude, entry.config.max_violations);
                        let punish = entry.config.punishable
                            && entry.state.score >= entry.config.max_violations
                            && !entry.state.escalated;
                        if punish {
                            entry.state.escalated = true;
                        }
                        outputs.push(DetectionOutput::Flag(FlagEvent {
                            category: entry.config.category,
                            variant: entry.config.variant,
                            magnitude,
                            score: entry.state.score,
                            params,
                            punish,
                        }));
                    } else {
                        outputs.push(DetectionOutput::Debug(DebugEvent {
                            category: entry.config.category,
                            variant: entry.config.variant,
                            message: format!(
                                "fail x{:.2} buffered ({:.1}/{:.1})",
                                magnitude, entry.state.buffer, entry.config.fail_buffer
                            ),
                        }));
                    }
                }
            }
        }
        outputs
    }

    /// Advances one server tick: dispatches the tick event and lets trusted
    /// quiet time erode old scores.
    pub fn tick(&mut self, snapshot: &TickSnapshot) -> Vec<DetectionOutput> {
        let outputs = self.observe(&DetectionEvent::Tick(snapshot));
        for entry in &mut self.entries {
            entry.state.tick(entry.config.trust_duration);
        }
        outputs
    }

    /// Drops transient detector state, e.g. across a server transfer.
    /// Violation scores survive.
    pub fn reset_runtime(&mut self) {
        for entry in &mut self.entries {
            entry.detector.reset();
        }
    }

    pub fn score(&self, id: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|e| e.config.id().eq_ignore_ascii_case(id))
            .map(|e| e.state.score())
    }

    pub fn summary(&self) -> Vec<(String, f32)> {
        self.entries
            .iter()
            .map(|e| (e.config.id(), e.state.score()))
            .collect()
    }
}
