use std::collections::VecDeque;

use crate::net::TICK_INTERVAL_MS;

/// Window, in ticks, that the clicks-per-second figure is measured over.
pub const CLICK_WINDOW_TICKS: u64 = 20;

const DELAY_SAMPLES: usize = 20;

/// What the detection layer sees about one registered click.
#[derive(Debug, Clone)]
pub struct ClickSnapshot {
    pub client_tick: u64,
    /// Clicks registered inside the measurement window, this one included.
    pub cps: usize,
    /// Milliseconds since the previous click, absent on the first ever click.
    pub delay_ms: Option<u64>,
    /// Most recent click delays, oldest first.
    pub delays: Vec<u64>,
}

/// Rolling record of the player's swing cadence.
#[derive(Debug, Default)]
pub struct ClickTracker {
    clicks: VecDeque<u64>,
    delays: VecDeque<u64>,
    last_click_tick: Option<u64>,
    clicking: bool,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, client_tick: u64) -> ClickSnapshot {
        let delay_ms = self
            .last_click_tick
            .map(|last| client_tick.saturating_sub(last) * TICK_INTERVAL_MS);
        if let Some(delay) = delay_ms {
            if self.delays.len() == DELAY_SAMPLES {
                self.delays.pop_front();
            }
            self.delays.push_back(delay);
        }

        self.last_click_tick = Some(client_tick);
        self.clicks.push_back(client_tick);
        while let Some(&front) = self.clicks.front() {
            if client_tick.saturating_sub(front) >= CLICK_WINDOW_TICKS {
                self.clicks.pop_front();
            } else {
                break;
            }
        }
        self.clicking = true;

        ClickSnapshot {
            client_tick,
            cps: self.clicks.len(),
            delay_ms,
            delays: self.delays.iter().copied().collect(),
        }
    }

    pub fn cps(&self) -> usize {
        self.clicks.len()
    }

    pub fn is_clicking(&self) -> bool {
        self.clicking
    }

    /// Cleared at the end of each combat tick.
    pub fn settle(&mut self) {
        self.clicking = false;
    }

    pub fn reset(&mut self) {
        self.clicks.clear();
        self.delays.clear();
        self.last_click_tick = None;
        self.clicking = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cps_counts_the_window() {
        let mut tracker = ClickTracker::new();
        for tick in 0..30 {
            tracker.register(tick);
        }
        // only the last 20 ticks worth of clicks remain
        assert_eq!(tracker.cps(), CLICK_WINDOW_TICKS as usize);
    }

    #[test]
    fn two_clicks_per_tick_doubles_cps() {
        let mut tracker = ClickTracker::new();
        let mut snapshot = tracker.register(0);
        for tick in 0..25 {
            tracker.register(tick);
            snapshot = tracker.register(tick);
        }
        assert!(snapshot.cps > 30, "cps was {}", snapshot.cps);
    }

    #[test]
    fn delays_are_reported_in_milliseconds() {
        let mut tracker = ClickTracker::new();
        tracker.register(10);
        let snap = tracker.register(13);
        assert_eq!(snap.delay_ms, Some(150));
        assert_eq!(snap.delays, vec![150]);
    }

    #[test]
    fn first_click_has_no_delay() {
        let mut tracker = ClickTracker::new();
        let snap = tracker.register(4);
        assert_eq!(snap.delay_ms, None);
        assert!(snap.delays.is_empty());
    }

    #[test]
    fn clicking_flag_settles() {
        let mut tracker = ClickTracker::new();
        tracker.register(1);
        assert!(tracker.is_clicking());
        tracker.settle();
        assert!(!tracker.is_clicking());
    }

    #[test]
    fn delay_history_is_bounded() {
        let mut tracker = ClickTracker::new();
        for tick in 0..40 {
            tracker.register(tick * 2);
        }
        let snap = tracker.register(100);
        assert_eq!(snap.delays.len(), 20);
    }
}
