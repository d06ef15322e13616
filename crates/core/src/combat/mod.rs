mod clicks;
mod validator;

pub use clicks::{CLICK_WINDOW_TICKS, ClickSnapshot, ClickTracker};
pub use validator::{
    ATTACK_RAY_LENGTH, AttackContext, AttackOutcome, AttackSnapshot, CombatResults,
    CombatValidator, Verdict,
};
