use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use vigil::{
    ClientPacket, FlagContext, MemoryWorld, MoveMode, PunishContext, ServerPacket, Session,
    SessionConfig, SessionHandler, TICK_INTERVAL_MS,
};

use crate::clients::ScriptedClient;

pub const PLAYER_ID: u64 = 1;
pub const VICTIM_BASE_ID: u64 = 100;

/// Echo factor a modern Windows client applies to probe timestamps.
const ECHO_SCALE: i64 = 1_000_000;

pub struct FlagRecord {
    pub detector: String,
    pub score: f32,
}

/// Plays the transport side of the proxy: records what the session wants
/// delivered and hands probes back to the driver for echoing.
#[derive(Default)]
pub struct SimHandler {
    probes: Mutex<Vec<i64>>,
    flags: Mutex<Vec<FlagRecord>>,
    punishes: Mutex<Vec<String>>,
    corrections: AtomicUsize,
    disconnect: Mutex<Option<String>>,
}

impl SimHandler {
    fn take_probes(&self) -> Vec<i64> {
        mem::take(&mut *self.probes.lock())
    }
}

impl SessionHandler for SimHandler {
    fn on_flag(&self, ctx: &mut FlagContext<'_>) {
        self.flags.lock().push(FlagRecord {
            detector: format!("{}_{}", ctx.category, ctx.variant).to_ascii_lowercase(),
            score: ctx.score,
        });
    }

    fn on_punish(&self, ctx: &mut PunishContext<'_>) {
        self.punishes.lock().push(ctx.message.clone());
    }

    fn transmit(&self, packet: &ServerPacket) {
        match packet {
            ServerPacket::LatencyProbe { timestamp, .. } => {
                self.probes.lock().push(*timestamp);
            }
            ServerPacket::MovePlayer {
                runtime_id: PLAYER_ID,
                mode: MoveMode::Reset,
                ..
            } => {
                self.corrections.fetch_add(1, Ordering::SeqCst);
            }
            ServerPacket::Disconnect { message } => {
                *self.disconnect.lock() = Some(message.clone());
            }
            _ => {}
        }
    }
}

pub struct Outcome {
    pub scenario: &'static str,
    pub description: &'static str,
    pub ticks_run: u64,
    pub flags: Vec<FlagRecord>,
    pub punishes: Vec<String>,
    pub corrections: usize,
    pub disconnect: Option<String>,
    pub scores: Vec<(String, f32)>,
}

/// Drives one scripted client against a fresh session for up to `ticks`
/// server ticks, echoing every latency probe the way a responsive client
/// would, and collects what the core concluded.
pub fn run(
    client: &mut dyn ScriptedClient,
    config: SessionConfig,
    ticks: u64,
    fast: bool,
) -> Outcome {
    let handler = Arc::new(SimHandler::default());
    let world = Arc::new(MemoryWorld::flat(64, 64));
    let session = Session::new(config, world, Arc::clone(&handler) as Arc<dyn SessionHandler>);

    session.handle_server_packet(&ServerPacket::MovePlayer {
        runtime_id: PLAYER_ID,
        position: client.spawn_eye().into(),
        mode: MoveMode::Teleport,
        on_ground: false,
    });
    session.handle_client_packet(&ClientPacket::TickSync {
        client_request_time: 0,
    });
    for (slot, eye) in client.victim_eyes().iter().enumerate() {
        session.handle_server_packet(&ServerPacket::AddEntity {
            runtime_id: VICTIM_BASE_ID + slot as u64,
            position: (*eye).into(),
            width: 0.6,
            height: 1.8,
            is_player: true,
        });
    }
    // Deliver the staged spawn state and age the victims past the
    // teleport grace window before the script starts swinging.
    for _ in 0..22 {
        pump(&session, &handler);
    }

    let mut ticks_run = 0;
    for tick in 0..ticks {
        if session.is_closed() {
            break;
        }
        for packet in client.act(tick) {
            session.handle_client_packet(&packet);
        }
        pump(&session, &handler);
        ticks_run = tick + 1;
        if !fast {
            thread::sleep(Duration::from_millis(TICK_INTERVAL_MS));
        }
    }

    Outcome {
        scenario: client.name(),
        description: client.description(),
        ticks_run,
        flags: mem::take(&mut *handler.flags.lock()),
        punishes: mem::take(&mut *handler.punishes.lock()),
        corrections: handler.corrections.load(Ordering::SeqCst),
        disconnect: handler.disconnect.lock().clone(),
        scores: session.detection_summary(),
    }
}

fn pump(session: &Arc<Session>, handler: &SimHandler) {
    session.tick();
    for timestamp in handler.take_probes() {
        session.handle_client_packet(&ClientPacket::LatencyEcho {
            timestamp: timestamp * ECHO_SCALE,
        });
    }
}
