/// Button gesture classification
///
/// Pure state machine fed with the raw pin level and a monotonic timestamp.
/// A click is only reported as `SingleClick` once the double click window
/// has passed without a second press; a second press inside the window
/// turns it into a `DoubleClick` instead.
use std::time::Duration;

use crate::config::InputConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    SingleClick,
    DoubleClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickTiming {
    pub debounce: Duration,
    pub double_click: Duration,
    pub long_press: Duration,
}

impl Default for ClickTiming {
    fn default() -> Self {
        Self::from(&InputConfig::default())
    }
}

impl From<&InputConfig> for ClickTiming {
    fn from(input: &InputConfig) -> Self {
        Self {
            debounce: Duration::from_millis(input.debounce_ms),
            double_click: Duration::from_millis(input.double_click_ms),
            long_press: Duration::from_millis(input.long_press_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    FirstDown { since: Duration },
    FirstUp { since: Duration },
    SecondDown,
    // Held past the long press threshold, swallowed on release
    Held,
}

#[derive(Debug)]
pub struct ClickDetector {
    timing: ClickTiming,
    phase: Phase,
    raw: bool,
    raw_since: Duration,
    last_sample: Option<Duration>,
    stable: bool,
}

impl ClickDetector {
    pub fn new(timing: ClickTiming) -> Self {
        Self {
            timing,
            phase: Phase::Idle,
            raw: false,
            raw_since: Duration::ZERO,
            last_sample: None,
            stable: false,
        }
    }

    pub fn timing(&self) -> ClickTiming {
        self.timing
    }

    /// True while a gesture is being tracked and not yet reported
    pub fn is_pending(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Feed one sample. `pressed` is the logical button state (already
    /// inverted for active-low wiring), `now` the time since boot.
    ///
    /// A level change is dated back to the previous sample, so at a slow
    /// cadence a press seen in a single sample still counts once the gap
    /// between samples covers the debounce time.
    pub fn update(&mut self, pressed: bool, now: Duration) -> Option<Gesture> {
        if pressed != self.raw {
            self.raw = pressed;
            self.raw_since = self.last_sample.unwrap_or(now);
        }
        self.last_sample = Some(now);

        // Debounce: the raw level must hold for the whole debounce time
        let settled = now.saturating_sub(self.raw_since) >= self.timing.debounce;
        let edge = if settled && self.raw != self.stable {
            self.stable = self.raw;
            Some(self.stable)
        } else {
            None
        };

        self.step(edge, now)
    }

    fn step(&mut self, edge: Option<bool>, now: Duration) -> Option<Gesture> {
        match (self.phase, edge) {
            (Phase::Idle, Some(true)) => {
                self.phase = Phase::FirstDown { since: now };
                None
            }
            (Phase::FirstDown { .. }, Some(false)) => {
                self.phase = Phase::FirstUp { since: now };
                None
            }
            (Phase::FirstDown { since }, None)
                if now.saturating_sub(since) >= self.timing.long_press =>
            {
                self.phase = Phase::Held;
                None
            }
            (Phase::FirstUp { .. }, Some(true)) => {
                self.phase = Phase::SecondDown;
                None
            }
            (Phase::FirstUp { since }, None)
                if now.saturating_sub(since) >= self.timing.double_click =>
            {
                self.phase = Phase::Idle;
                Some(Gesture::SingleClick)
            }
            (Phase::SecondDown, Some(false)) => {
                self.phase = Phase::Idle;
                Some(Gesture::DoubleClick)
            }
            (Phase::Held, Some(false)) => {
                self.phase = Phase::Idle;
                None
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TICK_MS: u64 = 10;

    /// Drive the detector with (level, duration_ms) segments sampled every
    /// TICK_MS, followed by two seconds released so pending clicks flush.
    fn run(pattern: &[(bool, u64)]) -> Vec<Gesture> {
        run_sampled(pattern, 0, TICK_MS)
    }

    /// Level of the pattern at `t`, released before and after it
    fn level_at(pattern: &[(bool, u64)], t: u64) -> bool {
        let mut start = 0;
        for &(level, duration) in pattern {
            if t < start + duration {
                return level;
            }
            start += duration;
        }
        false
    }

    /// Sample the pattern every `period` ms, first sample at `offset` ms
    fn run_sampled(pattern: &[(bool, u64)], offset: u64, period: u64) -> Vec<Gesture> {
        let mut detector = ClickDetector::new(ClickTiming::default());
        let total: u64 = pattern.iter().map(|&(_, d)| d).sum::<u64>() + 2000;
        let mut gestures = Vec::new();
        let mut now = offset;
        while now < total {
            if let Some(g) = detector.update(level_at(pattern, now), Duration::from_millis(now)) {
                gestures.push(g);
            }
            now += period;
        }
        gestures
    }

    fn poll_ms() -> u64 {
        InputConfig::default().poll_interval_ms
    }

    #[test]
    fn test_single_click() {
        let gestures = run(&[(false, 100), (true, 120)]);
        assert_eq!(gestures, vec![Gesture::SingleClick]);
    }

    #[test]
    fn test_double_click() {
        let gestures = run(&[(false, 100), (true, 100), (false, 150), (true, 100)]);
        assert_eq!(gestures, vec![Gesture::DoubleClick]);
    }

    #[test]
    fn test_two_slow_clicks_are_two_singles() {
        let gestures = run(&[(false, 100), (true, 100), (false, 900), (true, 100)]);
        assert_eq!(gestures, vec![Gesture::SingleClick, Gesture::SingleClick]);
    }

    #[test]
    fn test_long_press_is_swallowed() {
        let gestures = run(&[(false, 100), (true, 1500)]);
        assert!(gestures.is_empty());
    }

    #[test]
    fn test_single_click_waits_for_window() {
        let mut detector = ClickDetector::new(ClickTiming::default());
        let ms = Duration::from_millis;
        assert_eq!(detector.update(true, ms(0)), None);
        assert_eq!(detector.update(true, ms(60)), None);
        assert_eq!(detector.update(false, ms(120)), None);
        assert_eq!(detector.update(false, ms(180)), None);
        assert!(detector.is_pending());
        // Release dated back to the 60ms sample, settled at 120ms, window closes 400ms later
        assert_eq!(detector.update(false, ms(500)), None);
        assert_eq!(detector.update(false, ms(580)), Some(Gesture::SingleClick));
        assert!(!detector.is_pending());
    }

    #[test]
    fn test_clicks_at_main_loop_cadence() {
        let poll = poll_ms();
        for press in [120, 150, 200] {
            for offset in (0..poll).step_by(10) {
                let gestures = run_sampled(&[(false, 300), (true, press)], offset, poll);
                assert_eq!(gestures, vec![Gesture::SingleClick], "press {}ms offset {}ms", press, offset);
            }
        }
    }

    #[test]
    fn test_short_press_seen_once_still_counts() {
        // 80ms press caught by exactly one sample at 350ms
        let gestures = run_sampled(&[(false, 300), (true, 80)], 50, poll_ms());
        assert_eq!(gestures, vec![Gesture::SingleClick]);
    }

    #[test]
    fn test_double_click_at_main_loop_cadence() {
        let poll = poll_ms();
        for offset in (0..poll).step_by(10) {
            let pattern = [(false, 300), (true, 150), (false, 150), (true, 150)];
            let gestures = run_sampled(&pattern, offset, poll);
            assert_eq!(gestures, vec![Gesture::DoubleClick], "offset {}ms", offset);
        }
    }

    #[test]
    fn test_timing_from_config() {
        let input = InputConfig {
            debounce_ms: 20,
            double_click_ms: 300,
            long_press_ms: 1000,
            poll_interval_ms: 50,
        };
        let timing = ClickTiming::from(&input);
        assert_eq!(timing.debounce, Duration::from_millis(20));
        assert_eq!(timing.double_click, Duration::from_millis(300));
        assert_eq!(timing.long_press, Duration::from_millis(1000));
    }

    fn ticks(range: std::ops::RangeInclusive<u64>) -> impl Strategy<Value = u64> {
        range.prop_map(|t| t * TICK_MS)
    }

    proptest! {
        #[test]
        fn prop_one_press_is_one_single_click(press in ticks(6..=70)) {
            let gestures = run(&[(false, 100), (true, press)]);
            prop_assert_eq!(gestures, vec![Gesture::SingleClick]);
        }

        #[test]
        fn prop_two_quick_presses_are_one_double_click(
            first in ticks(6..=30),
            gap in ticks(6..=30),
            second in ticks(6..=30),
        ) {
            let gestures = run(&[(false, 100), (true, first), (false, gap), (true, second)]);
            prop_assert_eq!(gestures, vec![Gesture::DoubleClick]);
        }

        #[test]
        fn prop_press_longer_than_poll_is_one_click(
            press in 100u64..=600,
            offset in 0u64..100,
        ) {
            let gestures = run_sampled(&[(false, 300), (true, press)], offset, poll_ms());
            prop_assert_eq!(gestures, vec![Gesture::SingleClick]);
        }

        #[test]
        fn prop_bounces_shorter_than_debounce_are_ignored(
            bounces in proptest::collection::vec(ticks(1..=4), 1..8),
        ) {
            let mut pattern = vec![(false, 100)];
            for bounce in bounces {
                pattern.push((true, bounce));
                pattern.push((false, 100));
            }
            prop_assert!(run(&pattern).is_empty());
        }
    }
}
