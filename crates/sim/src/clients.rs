use glam::Vec3;
use vigil::player::TELEPORT_Y_NUDGE;
use vigil::{AnimateAction, ClientPacket, InputCommand, TransactionKind};

use crate::harness::VICTIM_BASE_ID;

const SPAWN_EYE: Vec3 = Vec3::new(0.5, 66.62, 0.5);
const WARMUP_TICKS: u64 = 10;

/// One synthetic client behavior. The harness spawns the player, stands up
/// any victims and feeds the probe echoes; the script only decides what the
/// client sends each tick.
pub trait ScriptedClient {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    fn spawn_eye(&self) -> Vec3 {
        SPAWN_EYE
    }

    /// Eye positions of the entities this scenario swings at.
    fn victim_eyes(&self) -> Vec<Vec3> {
        Vec::new()
    }

    fn act(&mut self, tick: u64) -> Vec<ClientPacket>;
}

fn confirmed_spawn() -> Vec3 {
    SPAWN_EYE + Vec3::new(0.0, TELEPORT_Y_NUDGE, 0.0)
}

fn input(frame: u64, eye: Vec3, yaw: f32) -> ClientPacket {
    ClientPacket::Input(InputCommand {
        yaw,
        head_yaw: yaw,
        ..InputCommand::new(frame, eye.into())
    })
}

fn swing() -> ClientPacket {
    ClientPacket::Animate {
        action: AnimateAction::SwingArm,
    }
}

fn attack(slot: u64) -> ClientPacket {
    ClientPacket::Transaction(TransactionKind::AttackEntity {
        target: VICTIM_BASE_ID + slot,
        click_position: [0.0, 0.0, 0.0],
    })
}

/// Walks a straight line at a pace ordinary input can produce.
pub struct CleanWalker {
    eye: Vec3,
}

impl CleanWalker {
    pub fn new() -> Self {
        Self {
            eye: confirmed_spawn(),
        }
    }
}

impl ScriptedClient for CleanWalker {
    fn name(&self) -> &'static str {
        "clean_walker"
    }

    fn description(&self) -> &'static str {
        "legitimate walking and looking around"
    }

    fn act(&mut self, tick: u64) -> Vec<ClientPacket> {
        if tick >= WARMUP_TICKS {
            // ease into the walk so the first step stays inside what the
            // replica predicts from a standing start
            self.eye.x += if tick == WARMUP_TICKS { 0.03 } else { 0.06 };
        }
        let yaw = (tick % 360) as f32;
        vec![input(tick, self.eye, yaw)]
    }
}

/// Covers twice the distance per tick the simulation can justify.
pub struct SpeedHacker {
    eye: Vec3,
}

impl SpeedHacker {
    pub fn new() -> Self {
        Self {
            eye: confirmed_spawn(),
        }
    }
}

impl ScriptedClient for SpeedHacker {
    fn name(&self) -> &'static str {
        "speed_hacker"
    }

    fn description(&self) -> &'static str {
        "horizontal movement far beyond simulated limits"
    }

    fn act(&mut self, tick: u64) -> Vec<ClientPacket> {
        if tick >= WARMUP_TICKS {
            self.eye.x += 0.5;
        }
        vec![input(tick, self.eye, 0.0)]
    }
}

/// Ascends and then hovers with no ground, jump or effect to justify it.
pub struct FlyHacker {
    eye: Vec3,
}

impl FlyHacker {
    pub fn new() -> Self {
        Self {
            eye: confirmed_spawn(),
        }
    }
}

impl ScriptedClient for FlyHacker {
    fn name(&self) -> &'static str {
        "fly_hacker"
    }

    fn description(&self) -> &'static str {
        "rises and hovers in mid-air"
    }

    fn act(&mut self, tick: u64) -> Vec<ClientPacket> {
        if (WARMUP_TICKS..WARMUP_TICKS + 20).contains(&tick) {
            self.eye.y += 0.25;
        }
        vec![input(tick, self.eye, 0.0)]
    }
}

/// Clicks at a rate no mouse button survives.
pub struct AutoClicker {
    eye: Vec3,
}

impl AutoClicker {
    pub fn new() -> Self {
        Self {
            eye: confirmed_spawn(),
        }
    }
}

impl ScriptedClient for AutoClicker {
    fn name(&self) -> &'static str {
        "autoclicker"
    }

    fn description(&self) -> &'static str {
        "swings twice every tick"
    }

    fn act(&mut self, tick: u64) -> Vec<ClientPacket> {
        vec![input(tick, self.eye, 0.0), swing(), swing()]
    }
}

/// Clicks at a human rate but with machine-perfect spacing.
pub struct MacroClicker {
    eye: Vec3,
}

impl MacroClicker {
    pub fn new() -> Self {
        Self {
            eye: confirmed_spawn(),
        }
    }
}

impl ScriptedClient for MacroClicker {
    fn name(&self) -> &'static str {
        "macro_clicker"
    }

    fn description(&self) -> &'static str {
        "metronome clicking with identical delays"
    }

    fn act(&mut self, tick: u64) -> Vec<ClientPacket> {
        vec![input(tick, self.eye, 0.0), swing()]
    }
}

/// Lands hits on a target far outside melee range.
pub struct ReachAbuser {
    eye: Vec3,
}

impl ReachAbuser {
    pub fn new() -> Self {
        Self {
            eye: confirmed_spawn(),
        }
    }
}

impl ScriptedClient for ReachAbuser {
    fn name(&self) -> &'static str {
        "reach_abuser"
    }

    fn description(&self) -> &'static str {
        "attacks a target five blocks away"
    }

    fn victim_eyes(&self) -> Vec<Vec3> {
        vec![SPAWN_EYE + Vec3::new(5.0, 0.0, 0.0)]
    }

    fn act(&mut self, tick: u64) -> Vec<ClientPacket> {
        // face +x, straight at the victim
        let yaw = -90.0;
        let mut packets = Vec::new();
        if tick >= WARMUP_TICKS && tick % 5 == 0 {
            packets.push(attack(0));
            packets.push(swing());
        }
        packets.push(input(tick, self.eye, yaw));
        packets
    }
}

/// Hits two different targets in the same instant, which one swing cannot do.
pub struct KillAura {
    eye: Vec3,
}

impl KillAura {
    pub fn new() -> Self {
        Self {
            eye: confirmed_spawn(),
        }
    }
}

impl ScriptedClient for KillAura {
    fn name(&self) -> &'static str {
        "kill_aura"
    }

    fn description(&self) -> &'static str {
        "attacks two targets in the same tick"
    }

    fn victim_eyes(&self) -> Vec<Vec3> {
        vec![
            SPAWN_EYE + Vec3::new(2.0, 0.0, 0.0),
            SPAWN_EYE + Vec3::new(0.0, 0.0, 2.0),
        ]
    }

    fn act(&mut self, tick: u64) -> Vec<ClientPacket> {
        let mut packets = Vec::new();
        if tick >= WARMUP_TICKS && tick % 2 == 0 {
            packets.push(attack(0));
            packets.push(attack(1));
            packets.push(swing());
        }
        packets.push(input(tick, self.eye, 0.0));
        packets
    }
}

/// Ships two input frames per server tick, running its clock fast.
pub struct TimerAbuser {
    eye: Vec3,
    frame: u64,
}

impl TimerAbuser {
    pub fn new() -> Self {
        Self {
            eye: confirmed_spawn(),
            frame: 0,
        }
    }
}

impl ScriptedClient for TimerAbuser {
    fn name(&self) -> &'static str {
        "timer_abuser"
    }

    fn description(&self) -> &'static str {
        "two simulation frames per server tick"
    }

    fn act(&mut self, _tick: u64) -> Vec<ClientPacket> {
        let first = self.frame;
        self.frame += 2;
        vec![
            input(first, self.eye, 0.0),
            input(first + 1, self.eye, 0.0),
        ]
    }
}

pub fn roster() -> Vec<Box<dyn ScriptedClient>> {
    vec![
        Box::new(CleanWalker::new()),
        Box::new(SpeedHacker::new()),
        Box::new(FlyHacker::new()),
        Box::new(AutoClicker::new()),
        Box::new(MacroClicker::new()),
        Box::new(ReachAbuser::new()),
        Box::new(KillAura::new()),
        Box::new(TimerAbuser::new()),
    ]
}
