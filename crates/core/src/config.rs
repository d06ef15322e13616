use serde::{Deserialize, Serialize};

/// Who owns the truth for a validated subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorityMode {
    /// The client's reported state is adopted unchecked.
    Client,
    /// The replica validates and flags but never overrides the client.
    Semi,
    /// The replica validates, corrects and rejects.
    Full,
}

impl AuthorityMode {
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }

    pub fn is_semi(&self) -> bool {
        matches!(self, Self::Semi)
    }

    pub fn validates(&self) -> bool {
        !matches!(self, Self::Client)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Windows,
    Android,
    Ios,
    Orbis,
    Switch,
    Xbox,
    Unknown,
}

/// Per-detector tunable overrides, matched by the detector's `category_variant`
/// key. Fields left `None` keep the prototype's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorOverride {
    pub detector: String,
    pub max_violations: Option<f32>,
    pub trust_duration: Option<i32>,
    pub fail_buffer: Option<f32>,
    pub max_buffer: Option<f32>,
    pub punishable: Option<bool>,
}

/// Construction-time session options. Sessions never reconfigure while
/// running; a changed config means a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Label used in log output, typically the player name.
    pub identifier: String,
    /// Runtime id the server assigned to this session's own player.
    pub player_runtime_id: u64,
    pub platform: Platform,
    pub protocol_version: u32,
    pub movement_authority: AuthorityMode,
    pub combat_authority: AuthorityMode,
    /// Deviation between the replica and the reported position that is
    /// absorbed without flagging or correcting.
    pub acceptance_threshold: f32,
    /// Eye-to-hitbox distance an attack may legitimately cover.
    pub reach_limit: f32,
    /// Ticks of entity position history retained for lag compensation.
    pub rewind_capacity: usize,
    /// Upper bound, in ticks, on how far combat may rewind behind the
    /// current server tick.
    pub rewind_cutoff: u64,
    /// Ticks of unanswered probes before the session is declared
    /// unresponsive.
    pub liveness_window: u32,
    pub detector_overrides: Vec<DetectorOverride>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identifier: "session".to_string(),
            player_runtime_id: 1,
            platform: Platform::Windows,
            protocol_version: 594,
            movement_authority: AuthorityMode::Semi,
            combat_authority: AuthorityMode::Semi,
            acceptance_threshold: 0.3,
            reach_limit: 3.0,
            rewind_capacity: 40,
            rewind_cutoff: 6,
            liveness_window: 100,
            detector_overrides: Vec::new(),
        }
    }
}
