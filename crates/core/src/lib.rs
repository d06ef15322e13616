//! Packet-level cheat detection for proxied game connections.
//!
//! The crate sits between a client and its server, replicates the parts of
//! the game state that matter for validation, and judges every movement
//! input and combat action against that replica. Server-side effects are
//! applied through an acknowledgement cycle so the replica only ever
//! reflects state the client has confirmed seeing.

pub mod combat;
pub mod config;
pub mod detection;
pub mod entity;
pub mod handler;
pub mod net;
pub mod physics;
pub mod player;
pub mod session;

pub use combat::{AttackSnapshot, ClickSnapshot, CombatResults, Verdict};
pub use config::{AuthorityMode, DetectorOverride, Platform, SessionConfig};
pub use detection::{
    DebugEvent, DetectionEvent, DetectionOutput, DetectionSet, Detector, DetectorDescriptor,
    FlagEvent, Observation, TickSnapshot,
};
pub use handler::{DebugContext, FlagContext, NopHandler, PunishContext, SessionHandler};
pub use net::{
    AnimateAction, Attribute, AttributeId, ClientPacket, EffectKind, EffectOperation, InputCommand,
    InputFlags, InputMode, MoveMode, PacketError, ServerPacket, SoundKind, TICK_INTERVAL_MS,
    TICK_RATE, TransactionKind,
};
pub use physics::{Aabb, BlockId, BlockWorld, MemoryWorld};
pub use player::MovementSnapshot;
pub use session::Session;
