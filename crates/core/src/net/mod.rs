mod ack;
mod protocol;

pub use ack::{AckCallback, AckEngine};
pub use protocol::{
    AnimateAction, Attribute, AttributeId, ClientPacket, EffectKind, EffectOperation, InputCommand,
    InputFlags, InputMode, MoveMode, PROTOCOL_1_20_0, PROTOCOL_1_20_10, PacketError, ServerPacket,
    SoundKind, TICK_INTERVAL_MS, TICK_RATE, TransactionKind,
};
