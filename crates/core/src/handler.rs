use crate::net::ServerPacket;

/// Diagnostic output from a detector that has observed something worth
/// recording but not yet worth flagging.
#[derive(Debug)]
pub struct DebugContext<'a> {
    pub category: &'a str,
    pub variant: &'a str,
    pub message: &'a str,
    pub cancelled: bool,
}

/// A violation surfaced by a detector. Cancelling suppresses the flag
/// entirely; clearing `log` keeps the flag but silences the log line.
#[derive(Debug)]
pub struct FlagContext<'a> {
    pub category: &'a str,
    pub variant: &'a str,
    pub magnitude: f32,
    pub score: f32,
    pub params: &'a [(&'static str, String)],
    pub latency_ms: u64,
    pub cancelled: bool,
    pub log: bool,
}

/// A detector score that crossed its cap. The message may be rewritten
/// before the disconnect goes out; cancelling keeps the session alive.
#[derive(Debug)]
pub struct PunishContext<'a> {
    pub category: &'a str,
    pub variant: &'a str,
    pub score: f32,
    pub message: String,
    pub cancelled: bool,
}

/// Decision surface a session calls out through. Implementations run on
/// both the packet and the tick context, so they must be `Send + Sync` and
/// should return quickly.
pub trait SessionHandler: Send + Sync {
    fn on_debug(&self, _ctx: &mut DebugContext<'_>) {}

    fn on_flag(&self, _ctx: &mut FlagContext<'_>) {}

    fn on_punish(&self, _ctx: &mut PunishContext<'_>) {}

    /// Packets the core emits on its own: latency probes, movement
    /// corrections and disconnects.
    fn transmit(&self, _packet: &ServerPacket) {}
}

/// Accepts every decision and drops outbound packets.
#[derive(Debug, Default)]
pub struct NopHandler;

impl SessionHandler for NopHandler {}
