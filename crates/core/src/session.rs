use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec3;
use parking_lot::Mutex;

use crate::combat::{AttackContext, CombatValidator, Verdict};
use crate::config::SessionConfig;
use crate::detection::{DetectionEvent, DetectionOutput, DetectionSet, FlagEvent, TickSnapshot};
use crate::entity::EntityTracker;
use crate::handler::{DebugContext, FlagContext, PunishContext, SessionHandler};
use crate::net::{
    AckEngine, AnimateAction, AttributeId, ClientPacket, InputCommand, MoveMode, PROTOCOL_1_20_10,
    ServerPacket, SoundKind, TICK_INTERVAL_MS, TransactionKind,
};
use crate::physics::BlockWorld;
use crate::player::{EYE_HEIGHT, EffectTable, MovementTracker, eye_height};

/// Ticks added on top of measured latency before the client tick is
/// realigned to the server tick again.
const TICK_SYNC_PADDING: u64 = 10;

/// One monitored connection. The proxy feeds every packet through
/// [`Session::handle_client_packet`] or [`Session::handle_server_packet`]
/// and forwards or drops it according to the returned [`Verdict`], while a
/// timer drives [`Session::tick`] at the simulation rate.
///
/// Server-side state (teleports, knockback, attributes, effects, entity
/// spawns and moves) is never applied immediately: each mutation is staged
/// behind a latency probe and lands only when the client acknowledges the
/// probe, so the replica stays aligned with what the client has actually
/// seen.
pub struct Session {
    config: SessionConfig,
    world: Arc<dyn BlockWorld>,
    handler: Arc<dyn SessionHandler>,

    closed: AtomicBool,
    paused: AtomicBool,
    dead: AtomicBool,
    synced: AtomicBool,

    server_tick: AtomicU64,
    client_tick: AtomicU64,
    next_sync_tick: AtomicU64,
    stack_latency_ms: AtomicU64,
    held_item: AtomicI32,

    last_tick: Mutex<Instant>,
    acks: Mutex<AckEngine>,
    movement: Mutex<MovementTracker>,
    effects: Mutex<EffectTable>,
    entities: Mutex<EntityTracker>,
    combat: Mutex<CombatValidator>,
    detections: Mutex<DetectionSet>,
    outbound: Mutex<Vec<ServerPacket>>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        world: Arc<dyn BlockWorld>,
        handler: Arc<dyn SessionHandler>,
    ) -> Arc<Self> {
        let acks = AckEngine::new(config.protocol_version, config.platform, config.liveness_window);
        let movement =
            MovementTracker::new(config.movement_authority, config.acceptance_threshold);
        let combat = CombatValidator::new(config.combat_authority.is_full(), config.reach_limit);
        let entities = EntityTracker::new(config.rewind_capacity);
        let detections = DetectionSet::from_config(&config);

        Arc::new(Self {
            config,
            world,
            handler,
            closed: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            dead: AtomicBool::new(false),
            synced: AtomicBool::new(false),
            server_tick: AtomicU64::new(0),
            client_tick: AtomicU64::new(0),
            next_sync_tick: AtomicU64::new(0),
            stack_latency_ms: AtomicU64::new(0),
            held_item: AtomicI32::new(0),
            last_tick: Mutex::new(Instant::now()),
            acks: Mutex::new(acks),
            movement: Mutex::new(movement),
            effects: Mutex::new(EffectTable::new()),
            entities: Mutex::new(entities),
            combat: Mutex::new(combat),
            detections: Mutex::new(detections),
            outbound: Mutex::new(Vec::new()),
        })
    }

    /// Spawns the timer thread that drives [`Session::tick`]. The thread
    /// holds only a weak handle and exits once the session is dropped or
    /// closed.
    pub fn start_ticking(self: &Arc<Self>) -> thread::JoinHandle<()> {
        let weak = Arc::downgrade(self);
        thread::spawn(move || {
            loop {
                thread::sleep(Duration::from_millis(TICK_INTERVAL_MS));
                let Some(session) = weak.upgrade() else { break };
                if session.is_closed() {
                    break;
                }
                session.tick();
            }
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn server_tick(&self) -> u64 {
        self.server_tick.load(Ordering::SeqCst)
    }

    pub fn client_tick(&self) -> u64 {
        self.client_tick.load(Ordering::SeqCst)
    }

    /// Round trip time between the proxy and the client, measured through
    /// the latency probe cycle.
    pub fn latency_ms(&self) -> u64 {
        self.stack_latency_ms.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn held_item(&self) -> i32 {
        self.held_item.load(Ordering::SeqCst)
    }

    pub fn player_position(&self) -> Vec3 {
        self.movement.lock().state().position
    }

    pub fn tracked_entities(&self) -> usize {
        self.entities.lock().len()
    }

    pub fn detection_score(&self, id: &str) -> Option<f32> {
        self.detections.lock().score(id)
    }

    pub fn detection_summary(&self) -> Vec<(String, f32)> {
        self.detections.lock().summary()
    }

    /// Inspects one client-to-server packet and decides whether the proxy
    /// may forward it.
    pub fn handle_client_packet(self: &Arc<Self>, packet: &ClientPacket) -> Verdict {
        if self.is_closed() || self.is_paused() {
            return Verdict::Forward;
        }

        match packet {
            ClientPacket::Input(command) => self.handle_input(command),
            ClientPacket::Transaction(kind) => self.handle_transaction(kind),
            ClientPacket::Animate { action } => {
                if *action == AnimateAction::SwingArm {
                    self.register_click(self.client_tick.load(Ordering::SeqCst));
                }
                Verdict::Forward
            }
            ClientPacket::Sound { event, .. } => {
                // Old clients signal left clicks through the miss sound
                // rather than an animation.
                if self.config.protocol_version < PROTOCOL_1_20_10
                    && *event == SoundKind::AttackNoDamage
                {
                    self.register_click(self.client_tick.load(Ordering::SeqCst));
                }
                Verdict::Forward
            }
            ClientPacket::LatencyEcho { timestamp } => {
                let batch = self.acks.lock().execute(*timestamp);
                match batch {
                    Some(callbacks) => {
                        // The echo answered one of our own probes, so the
                        // server never sees it. Callbacks run with the ack
                        // lock released.
                        for callback in callbacks {
                            callback();
                        }
                        Verdict::Drop
                    }
                    None => Verdict::Forward,
                }
            }
            ClientPacket::TickSync { .. } => {
                self.synced.store(true, Ordering::SeqCst);
                self.client_tick
                    .store(self.server_tick.load(Ordering::SeqCst), Ordering::SeqCst);
                self.acks.lock().refresh();
                Verdict::Forward
            }
            ClientPacket::Equipment {
                item_runtime_id, ..
            } => {
                self.held_item.store(*item_runtime_id, Ordering::SeqCst);
                Verdict::Forward
            }
        }
    }

    /// Observes one server-to-client packet. Server packets are always
    /// forwarded; the session only stages their effects behind the next
    /// acknowledged probe.
    pub fn handle_server_packet(self: &Arc<Self>, packet: &ServerPacket) -> Verdict {
        if self.is_closed() {
            return Verdict::Forward;
        }

        match packet {
            ServerPacket::MovePlayer {
                runtime_id,
                position,
                mode,
                on_ground,
            } => {
                let target = Vec3::from(*position);
                let mode = *mode;
                let on_ground = *on_ground;
                if *runtime_id == self.config.player_runtime_id {
                    if matches!(mode, MoveMode::Teleport | MoveMode::Reset) {
                        self.schedule_ack(move |session| {
                            session.movement.lock().teleport(target, on_ground);
                            if mode == MoveMode::Reset {
                                session.dead.store(false, Ordering::SeqCst);
                            }
                        });
                    }
                } else {
                    let teleport = matches!(mode, MoveMode::Teleport | MoveMode::Reset);
                    self.apply_entity_move(*runtime_id, target, teleport);
                }
            }
            ServerPacket::MoveEntity {
                runtime_id,
                position,
                teleport,
                ..
            } => {
                if *runtime_id != self.config.player_runtime_id {
                    self.apply_entity_move(*runtime_id, Vec3::from(*position), *teleport);
                }
            }
            ServerPacket::SetMotion { runtime_id, motion } => {
                if *runtime_id == self.config.player_runtime_id {
                    let motion = Vec3::from(*motion);
                    self.schedule_ack(move |session| {
                        session.movement.lock().set_knockback(motion);
                    });
                }
            }
            ServerPacket::UpdateAttributes {
                runtime_id,
                attributes,
            } => {
                if *runtime_id == self.config.player_runtime_id {
                    let attributes = attributes.clone();
                    self.schedule_ack(move |session| {
                        for attribute in &attributes {
                            match attribute.id {
                                AttributeId::MovementSpeed => {
                                    session.movement.lock().set_movement_speed(attribute.value);
                                }
                                AttributeId::Health => {
                                    session.dead.store(attribute.value <= 0.0, Ordering::SeqCst);
                                }
                            }
                        }
                    });
                }
            }
            ServerPacket::MobEffect {
                runtime_id,
                effect,
                operation,
                amplifier,
                duration_ticks,
            } => {
                if *runtime_id == self.config.player_runtime_id {
                    let effect = *effect;
                    let operation = *operation;
                    let amplifier = *amplifier;
                    let duration_ticks = *duration_ticks;
                    self.schedule_ack(move |session| {
                        session
                            .effects
                            .lock()
                            .handle(effect, operation, amplifier, duration_ticks);
                    });
                }
            }
            ServerPacket::AddEntity {
                runtime_id,
                position,
                width,
                height,
                is_player,
            } => {
                if *runtime_id != self.config.player_runtime_id {
                    let runtime_id = *runtime_id;
                    let position = Vec3::from(*position);
                    let width = *width;
                    let height = *height;
                    let is_player = *is_player;
                    self.schedule_ack(move |session| {
                        session
                            .entities
                            .lock()
                            .add(runtime_id, position, width, height, is_player);
                    });
                }
            }
            ServerPacket::RemoveEntity { runtime_id } => {
                let runtime_id = *runtime_id;
                self.schedule_ack(move |session| {
                    session.entities.lock().remove(runtime_id);
                });
            }
            ServerPacket::LatencyProbe { .. } => {}
            ServerPacket::Disconnect { .. } => {
                self.close();
            }
        }

        Verdict::Forward
    }

    /// Advances the session one simulation step. Stalled timers are caught
    /// up by jumping the server tick rather than replaying the body.
    pub fn tick(self: &Arc<Self>) {
        if self.is_closed() || self.is_paused() {
            return;
        }

        let delta = {
            let mut last = self.last_tick.lock();
            let elapsed = last.elapsed().as_millis() as u64 / TICK_INTERVAL_MS;
            *last = Instant::now();
            elapsed.max(1)
        };
        let server_tick = self.server_tick.fetch_add(delta, Ordering::SeqCst) + delta;

        self.entities.lock().tick(server_tick);
        self.effects.lock().tick();

        let snapshot = TickSnapshot {
            server_tick,
            client_tick: self.client_tick.load(Ordering::SeqCst),
        };
        let outputs = self.detections.lock().tick(&snapshot);
        self.process_outputs(outputs);

        let responsive = self.acks.lock().validate();
        if !responsive {
            self.disconnect("failed to acknowledge latency probes in time".to_string());
            return;
        }

        if self.synced.load(Ordering::SeqCst)
            && !self.dead.load(Ordering::SeqCst)
            && server_tick >= self.next_sync_tick.load(Ordering::SeqCst)
        {
            self.client_tick.store(server_tick, Ordering::SeqCst);
            let latency_ticks = self.stack_latency_ms.load(Ordering::SeqCst) / TICK_INTERVAL_MS;
            self.next_sync_tick
                .store(server_tick + latency_ticks + TICK_SYNC_PADDING, Ordering::SeqCst);
        }

        self.sample_latency();

        {
            let mut acks = self.acks.lock();
            if let Some(probe) = acks.probe() {
                self.outbound.lock().push(probe);
            }
            acks.refresh();
        }

        self.flush_outbound();
    }

    /// Stops processing without tearing sessions down, used while the
    /// player sits in a loading screen.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        *self.last_tick.lock() = Instant::now();
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Prepares the session for a downstream server switch: processing
    /// stops and every piece of state owned by the old server is dropped.
    pub fn begin_transfer(&self) {
        self.pause();
        self.acks.lock().invalidate();
        self.entities.lock().clear();
        self.effects.lock().clear();
        self.combat.lock().reset();
        self.detections.lock().reset_runtime();
        self.outbound.lock().clear();
        log::info!("Session {} entering transfer", self.config.identifier);
    }

    /// Completes a server switch. The replica restarts from scratch and
    /// stays immobilized until the new server's first spawn teleport has
    /// been acknowledged, so stale inputs cannot smear into the new world.
    pub fn finish_transfer(self: &Arc<Self>) {
        {
            let mut movement = self.movement.lock();
            movement.reset();
            movement.set_immobile(true);
        }
        self.synced.store(false, Ordering::SeqCst);
        self.dead.store(false, Ordering::SeqCst);
        self.schedule_ack(|session| {
            session.movement.lock().set_immobile(false);
        });
        self.resume();
        log::info!("Session {} completed transfer", self.config.identifier);
    }

    /// Shuts the session down. Idempotent; pending ack callbacks are
    /// dropped and late echoes become no-ops.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.acks.lock().invalidate();
        log::info!("Session {} closed", self.config.identifier);
    }

    fn handle_input(self: &Arc<Self>, command: &InputCommand) -> Verdict {
        let client_tick = self.client_tick.fetch_add(1, Ordering::SeqCst) + 1;
        let allow_missed_swing = self.config.protocol_version >= PROTOCOL_1_20_10;

        let snapshot = {
            let mut movement = self.movement.lock();
            let modifiers = self
                .effects
                .lock()
                .modifiers(movement.state().movement_speed);
            movement.process_input(
                command,
                modifiers,
                self.world.as_ref(),
                client_tick,
                allow_missed_swing,
            )
        };

        if let Some(corrected) = snapshot.correction {
            let packet = ServerPacket::MovePlayer {
                runtime_id: self.config.player_runtime_id,
                position: (corrected + Vec3::new(0.0, EYE_HEIGHT, 0.0)).into(),
                mode: MoveMode::Reset,
                on_ground: snapshot.on_ground,
            };
            self.outbound.lock().push(packet);
            self.schedule_ack(|session| {
                session.movement.lock().correction_acknowledged();
            });
        }

        let combat_results = {
            let pending_target = self.combat.lock().pending_target();
            let entity_now = pending_target.and_then(|target| {
                let entities = self.entities.lock();
                entities
                    .get(target)
                    .map(|entity| (entity.prev_position, entity.position))
            });
            self.combat.lock().on_input(snapshot.rotation, entity_now)
        };

        let outputs = {
            let mut detections = self.detections.lock();
            let mut outputs = detections.observe(&DetectionEvent::Input(&snapshot));
            if let Some(results) = &combat_results {
                outputs.extend(detections.observe(&DetectionEvent::CombatResolved(results)));
            }
            outputs
        };
        self.process_outputs(outputs);

        if snapshot.missed_swing {
            self.register_click(client_tick);
        }

        self.combat.lock().settle_tick();
        Verdict::Forward
    }

    fn handle_transaction(self: &Arc<Self>, kind: &TransactionKind) -> Verdict {
        match kind {
            TransactionKind::AttackEntity { target, .. } => self.handle_attack(*target),
            TransactionKind::InteractEntity { .. } | TransactionKind::UseItem { .. } => {
                Verdict::Forward
            }
        }
    }

    fn handle_attack(self: &Arc<Self>, target: u64) -> Verdict {
        let client_tick = self.client_tick.load(Ordering::SeqCst);
        // every attack is a click, whether or not the target checks out
        self.register_click(client_tick);

        // attack segments run on what the client reported, not the replica;
        // a corrected replica would smear the reach measurement
        let (eye_position, prev_eye_position, rotation, input_mode, attacker_tst) = {
            let movement = self.movement.lock();
            let state = movement.state();
            let offset = Vec3::new(0.0, eye_height(state.sneaking), 0.0);
            (
                state.client_position + offset,
                state.prev_client_position + offset,
                state.rotation,
                state.input_mode,
                state.ticks_since_teleport,
            )
        };
        let context = {
            let entities = self.entities.lock();
            let Some(entity) = entities.get(target) else {
                return Verdict::Forward;
            };
            let rewound = if self.config.combat_authority.is_full() {
                let server_tick = self.server_tick.load(Ordering::SeqCst);
                let floor = server_tick.saturating_sub(self.config.rewind_cutoff);
                entity.rewind(client_tick.clamp(floor, server_tick))
            } else {
                None
            };
            AttackContext {
                target,
                client_tick,
                eye_position,
                prev_eye_position,
                rotation,
                input_mode,
                attacker_ticks_since_teleport: attacker_tst,
                entity_position: entity.position,
                entity_prev_position: entity.prev_position,
                entity_width: entity.width,
                entity_height: entity.height,
                entity_ticks_since_teleport: entity.ticks_since_teleport,
                rewound,
            }
        };

        let outcome = self.combat.lock().begin_attack(context);
        if let Some(snapshot) = &outcome.snapshot {
            let outputs = self
                .detections
                .lock()
                .observe(&DetectionEvent::Attack(snapshot));
            self.process_outputs(outputs);
        }
        outcome.verdict
    }

    fn register_click(self: &Arc<Self>, client_tick: u64) {
        let click = self.combat.lock().register_click(client_tick);
        let outputs = self.detections.lock().observe(&DetectionEvent::Click(&click));
        self.process_outputs(outputs);
    }

    /// Stages a callback behind the current latency probe. The callback
    /// holds only a weak session handle and is skipped once the session
    /// has closed.
    fn schedule_ack<F>(self: &Arc<Self>, callback: F)
    where
        F: FnOnce(&Session) + Send + 'static,
    {
        let weak = Arc::downgrade(self);
        self.acks.lock().schedule(Box::new(move || {
            if let Some(session) = weak.upgrade() {
                if !session.is_closed() {
                    callback(&session);
                }
            }
        }));
    }

    /// Commits a server-sent entity move. Fully authoritative combat rewinds
    /// on the server's timeline, so the move lands immediately and the record
    /// eases toward it; lower authority holds it back until the client has
    /// acknowledged the surrounding state, then snaps.
    fn apply_entity_move(self: &Arc<Self>, runtime_id: u64, target: Vec3, teleport: bool) {
        if self.config.combat_authority.is_full() {
            if let Some(entity) = self.entities.lock().get_mut(runtime_id) {
                entity.update_position(target, teleport, true);
            }
        } else {
            self.schedule_ack(move |session| {
                if let Some(entity) = session.entities.lock().get_mut(runtime_id) {
                    entity.update_position(target, teleport, false);
                }
            });
        }
    }

    fn sample_latency(self: &Arc<Self>) {
        let started = Instant::now();
        self.schedule_ack(move |session| {
            let measured = started.elapsed().as_millis() as u64;
            session.stack_latency_ms.store(measured, Ordering::SeqCst);
        });
    }

    fn flush_outbound(&self) {
        let queued = std::mem::take(&mut *self.outbound.lock());
        for packet in &queued {
            self.handler.transmit(packet);
        }
    }

    // Hook dispatch happens with no session lock held so handlers may call
    // back into the session.
    fn process_outputs(&self, outputs: Vec<DetectionOutput>) {
        if outputs.is_empty() {
            return;
        }
        let latency_ms = self.stack_latency_ms.load(Ordering::SeqCst);
        for output in outputs {
            match output {
                DetectionOutput::Debug(event) => {
                    let mut ctx = DebugContext {
                        category: event.category,
                        variant: event.variant,
                        message: &event.message,
                        cancelled: false,
                    };
                    self.handler.on_debug(&mut ctx);
                    if !ctx.cancelled {
                        log::debug!(
                            "Session {} {} ({}): {}",
                            self.config.identifier,
                            event.category,
                            event.variant,
                            event.message
                        );
                    }
                }
                DetectionOutput::Flag(flag) => self.process_flag(flag, latency_ms),
            }
        }
    }

    fn process_flag(&self, flag: FlagEvent, latency_ms: u64) {
        let mut params = flag.params;
        params.push(("latency", format!("{latency_ms}ms")));

        let mut ctx = FlagContext {
            category: flag.category,
            variant: flag.variant,
            magnitude: flag.magnitude,
            score: flag.score,
            params: &params,
            latency_ms,
            cancelled: false,
            log: true,
        };
        self.handler.on_flag(&mut ctx);
        if ctx.cancelled {
            return;
        }
        if ctx.log {
            let detail = params
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join(", ");
            log::warn!(
                "Session {} flagged {} ({}) x{:.2}: score {:.2} [{}]",
                self.config.identifier,
                flag.category,
                flag.variant,
                flag.magnitude,
                flag.score,
                detail
            );
        }

        if flag.punish {
            let mut punish = PunishContext {
                category: flag.category,
                variant: flag.variant,
                score: flag.score,
                message: format!("{} ({}) score limit reached", flag.category, flag.variant),
                cancelled: false,
            };
            self.handler.on_punish(&mut punish);
            if !punish.cancelled {
                self.disconnect(punish.message);
            }
        }
    }

    fn disconnect(&self, message: String) {
        if self.is_closed() {
            return;
        }
        log::warn!(
            "Session {} disconnected: {}",
            self.config.identifier,
            message
        );
        self.handler.transmit(&ServerPacket::Disconnect { message });
        self.close();
    }
}
