use bitflags::bitflags;
use rkyv::rancor;
use rkyv::{Archive, Deserialize, Serialize};
use thiserror::Error;

pub const TICK_RATE: u32 = 20;
pub const TICK_INTERVAL_MS: u64 = 50;

/// Protocol id of game version 1.20.0, the last revision whose latency
/// probe echoes arrive without timestamp scaling.
pub const PROTOCOL_1_20_0: u32 = 589;
/// Protocol id of game version 1.20.10, where missed swings moved from a
/// level sound event to an input flag.
pub const PROTOCOL_1_20_10: u32 = 594;

bitflags! {
    /// Decoded view over the raw input bitset carried by [`InputCommand`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InputFlags: u64 {
        const JUMP_HELD    = 1 << 0;
        const SNEAKING     = 1 << 1;
        const SPRINTING    = 1 << 2;
        const START_JUMP   = 1 << 3;
        const START_SPRINT = 1 << 4;
        const STOP_SPRINT  = 1 << 5;
        const START_SNEAK  = 1 << 6;
        const STOP_SNEAK   = 1 << 7;
        const START_FLYING = 1 << 8;
        const STOP_FLYING  = 1 << 9;
        const MISSED_SWING = 1 << 10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug), compare(PartialEq))]
pub enum InputMode {
    Mouse,
    Touch,
    GamePad,
    MotionController,
}

/// One simulation frame worth of client input. `position` carries the eye
/// offset the client bakes into its reported Y coordinate.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct InputCommand {
    pub frame: u64,
    pub position: [f32; 3],
    pub move_vector: [f32; 2],
    pub yaw: f32,
    pub pitch: f32,
    pub head_yaw: f32,
    pub input_flags: u64,
    pub delta: [f32; 3],
    pub input_mode: InputMode,
}

impl InputCommand {
    pub fn new(frame: u64, position: [f32; 3]) -> Self {
        Self {
            frame,
            position,
            move_vector: [0.0, 0.0],
            yaw: 0.0,
            pitch: 0.0,
            head_yaw: 0.0,
            input_flags: 0,
            delta: [0.0, 0.0, 0.0],
            input_mode: InputMode::Mouse,
        }
    }

    pub fn flags(&self) -> InputFlags {
        InputFlags::from_bits_truncate(self.input_flags)
    }

    pub fn set_flag(&mut self, flag: InputFlags, enabled: bool) {
        let mut flags = self.flags();
        flags.set(flag, enabled);
        self.input_flags = flags.bits();
    }

    pub fn has_flag(&self, flag: InputFlags) -> bool {
        self.flags().contains(flag)
    }
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum TransactionKind {
    AttackEntity { target: u64, click_position: [f32; 3] },
    InteractEntity { target: u64 },
    UseItem { item_runtime_id: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug), compare(PartialEq))]
pub enum AnimateAction {
    SwingArm,
    StopSleep,
    CriticalHit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug), compare(PartialEq))]
pub enum SoundKind {
    Attack,
    AttackNoDamage,
    AttackStrong,
}

/// Client-to-server packets the validation core consumes. The transport
/// layer decodes the wire format and hands these over already typed.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ClientPacket {
    Input(InputCommand),
    Transaction(TransactionKind),
    Animate { action: AnimateAction },
    Sound { event: SoundKind, position: [f32; 3] },
    LatencyEcho { timestamp: i64 },
    TickSync { client_request_time: i64 },
    Equipment { item_runtime_id: i32, slot: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug), compare(PartialEq))]
pub enum MoveMode {
    Normal,
    Reset,
    Teleport,
    Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug), compare(PartialEq))]
pub enum AttributeId {
    Health,
    MovementSpeed,
}

#[derive(Debug, Clone, Copy, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Attribute {
    pub id: AttributeId,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug), compare(PartialEq))]
pub enum EffectKind {
    Speed,
    Slowness,
    JumpBoost,
    SlowFalling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug), compare(PartialEq))]
pub enum EffectOperation {
    Add,
    Modify,
    Remove,
}

/// Server-to-client packets the core observes on their way through.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ServerPacket {
    MovePlayer {
        runtime_id: u64,
        position: [f32; 3],
        mode: MoveMode,
        on_ground: bool,
    },
    MoveEntity {
        runtime_id: u64,
        position: [f32; 3],
        teleport: bool,
        on_ground: bool,
    },
    SetMotion {
        runtime_id: u64,
        motion: [f32; 3],
    },
    UpdateAttributes {
        runtime_id: u64,
        attributes: Vec<Attribute>,
    },
    MobEffect {
        runtime_id: u64,
        effect: EffectKind,
        operation: EffectOperation,
        amplifier: u8,
        duration_ticks: i32,
    },
    AddEntity {
        runtime_id: u64,
        position: [f32; 3],
        width: f32,
        height: f32,
        is_player: bool,
    },
    RemoveEntity {
        runtime_id: u64,
    },
    LatencyProbe {
        timestamp: i64,
        needs_response: bool,
    },
    Disconnect {
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("failed to serialize packet: {0}")]
    SerializeFailed(String),
    #[error("failed to deserialize packet: {0}")]
    DeserializeFailed(String),
}

impl ClientPacket {
    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|bytes| bytes.into_vec())
            .map_err(|e| PacketError::SerializeFailed(e.to_string()))
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, PacketError> {
        rkyv::from_bytes::<Self, rancor::Error>(data)
            .map_err(|e| PacketError::DeserializeFailed(e.to_string()))
    }
}

impl ServerPacket {
    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|bytes| bytes.into_vec())
            .map_err(|e| PacketError::SerializeFailed(e.to_string()))
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, PacketError> {
        rkyv::from_bytes::<Self, rancor::Error>(data)
            .map_err(|e| PacketError::DeserializeFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_flags_set_and_clear() {
        let mut command = InputCommand::new(10, [0.0, 1.62, 0.0]);
        command.set_flag(InputFlags::SPRINTING, true);
        command.set_flag(InputFlags::START_JUMP, true);

        assert!(command.has_flag(InputFlags::SPRINTING));
        assert!(command.has_flag(InputFlags::START_JUMP));
        assert!(!command.has_flag(InputFlags::SNEAKING));

        command.set_flag(InputFlags::SPRINTING, false);
        assert!(!command.has_flag(InputFlags::SPRINTING));
        assert!(command.has_flag(InputFlags::START_JUMP));
    }

    #[test]
    fn client_packet_round_trip() {
        let mut command = InputCommand::new(42, [1.5, 65.62, -3.0]);
        command.move_vector = [0.0, 1.0];
        command.yaw = 90.0;
        command.pitch = -12.5;
        command.set_flag(InputFlags::JUMP_HELD, true);
        command.input_mode = InputMode::Touch;

        let bytes = ClientPacket::Input(command).serialize().unwrap();
        let decoded = ClientPacket::deserialize(&bytes).unwrap();

        match decoded {
            ClientPacket::Input(cmd) => {
                assert_eq!(cmd.frame, 42);
                assert!((cmd.position[1] - 65.62).abs() < 1e-6);
                assert!((cmd.yaw - 90.0).abs() < 1e-6);
                assert!(cmd.has_flag(InputFlags::JUMP_HELD));
                assert_eq!(cmd.input_mode, InputMode::Touch);
            }
            other => panic!("expected Input, got {:?}", other),
        }
    }

    #[test]
    fn server_packet_round_trip() {
        let packet = ServerPacket::UpdateAttributes {
            runtime_id: 7,
            attributes: vec![
                Attribute {
                    id: AttributeId::Health,
                    value: 0.0,
                },
                Attribute {
                    id: AttributeId::MovementSpeed,
                    value: 0.13,
                },
            ],
        };

        let bytes = packet.serialize().unwrap();
        let decoded = ServerPacket::deserialize(&bytes).unwrap();

        match decoded {
            ServerPacket::UpdateAttributes {
                runtime_id,
                attributes,
            } => {
                assert_eq!(runtime_id, 7);
                assert_eq!(attributes.len(), 2);
                assert_eq!(attributes[0].id, AttributeId::Health);
                assert!((attributes[1].value - 0.13).abs() < 1e-6);
            }
            other => panic!("expected UpdateAttributes, got {:?}", other),
        }
    }

    #[test]
    fn deserialize_rejects_garbage() {
        let garbage = [0xFF_u8; 7];
        assert!(ClientPacket::deserialize(&garbage).is_err());
    }
}
