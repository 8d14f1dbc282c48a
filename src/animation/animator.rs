//! Delay-scheduled reveal sequencing.
//!
//! Every step gets its own timer relative to the animation start. Steps do not
//! wait for each other: two steps whose delays overlap will overlap on screen,
//! and authored order only matters for equal delays.
//!
//! Time is virtual. Callers drive the animator with [`Animator::advance`] and a
//! millisecond clock, which keeps the sequencing deterministic in tests. The
//! browser runtime does the same with `setTimeout`.

use super::effect::Effect;
use crate::types::AnimationTimeline;

/// The DOM seam. Elements are addressed by CSS class inside the banner
/// container.
pub trait Stage {
    fn has_container(&self) -> bool;
    fn has_element(&self, class: &str) -> bool;
    /// Set opacity to zero.
    fn hide(&mut self, class: &str);
    /// Remove every effect class.
    fn clear_effects(&mut self, class: &str);
    /// Add the effect class and set the animation duration.
    fn apply_effect(&mut self, class: &str, effect: Effect, duration_ms: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Reveal(usize),
    Restart,
}

#[derive(Debug, Clone)]
struct Timer {
    due: u64,
    seq: u64,
    task: Task,
}

#[derive(Debug, Clone)]
pub struct Animator {
    timeline: AnimationTimeline,
    timers: Vec<Timer>,
    next_seq: u64,
    runs: u32,
}

impl Animator {
    pub fn new(mut timeline: AnimationTimeline) -> Self {
        if timeline.looping && timeline.duration == 0 {
            tracing::warn!("looping timeline has zero duration, playing once");
            timeline.looping = false;
        }
        Self {
            timeline,
            timers: Vec::new(),
            next_seq: 0,
            runs: 0,
        }
    }

    pub fn timeline(&self) -> &AnimationTimeline {
        &self.timeline
    }

    /// Number of times the sequence has started, loop restarts included.
    pub fn runs(&self) -> u32 {
        self.runs
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.timers.iter().map(|t| t.due).min()
    }

    /// Reset element state and schedule every step from `now`.
    ///
    /// Pending timers from a previous run are cleared first.
    pub fn start<S: Stage>(&mut self, stage: &mut S, now: u64) {
        self.stop();
        self.reset(stage);
        for index in 0..self.timeline.timeline.len() {
            let delay = self.timeline.timeline[index].delay;
            self.schedule(now + u64::from(delay), Task::Reveal(index));
        }
        if self.timeline.looping {
            self.schedule(now + u64::from(self.timeline.duration), Task::Restart);
        }
        self.runs += 1;
    }

    /// Clear every pending timer.
    pub fn stop(&mut self) {
        self.timers.clear();
    }

    /// Fire every timer due at or before `now`, earliest first. Timers due at
    /// the same instant fire in the order they were scheduled. Returns the
    /// number of timers fired.
    pub fn advance<S: Stage>(&mut self, stage: &mut S, now: u64) -> usize {
        let mut fired = 0;
        while let Some(pos) = self.next_timer_index(now) {
            let timer = self.timers.swap_remove(pos);
            fired += 1;
            match timer.task {
                Task::Reveal(index) => self.reveal(stage, index),
                Task::Restart => self.start(stage, timer.due),
            }
        }
        fired
    }

    fn next_timer_index(&self, now: u64) -> Option<usize> {
        self.timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)
    }

    fn schedule(&mut self, due: u64, task: Task) {
        self.timers.push(Timer {
            due,
            seq: self.next_seq,
            task,
        });
        self.next_seq += 1;
    }

    fn reset<S: Stage>(&self, stage: &mut S) {
        for step in &self.timeline.timeline {
            if stage.has_element(&step.element) {
                stage.hide(&step.element);
                stage.clear_effects(&step.element);
            }
        }
    }

    fn reveal<S: Stage>(&self, stage: &mut S, index: usize) {
        let step = &self.timeline.timeline[index];
        if !stage.has_element(&step.element) {
            tracing::warn!(element = %step.element, "animation target not found, skipping step");
            return;
        }
        stage.clear_effects(&step.element);
        stage.apply_effect(&step.element, step.effect, step.duration);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::AnimationStep;
    use std::collections::BTreeSet;

    /// Stage that records every mutation.
    #[derive(Default)]
    pub(crate) struct RecordingStage {
        pub container: bool,
        pub elements: BTreeSet<String>,
        pub log: Vec<String>,
    }

    impl RecordingStage {
        pub(crate) fn with(elements: &[&str]) -> Self {
            Self {
                container: true,
                elements: elements.iter().map(|e| e.to_string()).collect(),
                log: Vec::new(),
            }
        }

        /// Classes that received an effect, in order.
        pub(crate) fn revealed(&self) -> Vec<&str> {
            self.log
                .iter()
                .filter_map(|l| l.strip_prefix("effect "))
                .map(|l| l.split(' ').next().unwrap_or(l))
                .collect()
        }
    }

    impl Stage for RecordingStage {
        fn has_container(&self) -> bool {
            self.container
        }
        fn has_element(&self, class: &str) -> bool {
            self.elements.contains(class)
        }
        fn hide(&mut self, class: &str) {
            self.log.push(format!("hide {class}"));
        }
        fn clear_effects(&mut self, class: &str) {
            self.log.push(format!("clear {class}"));
        }
        fn apply_effect(&mut self, class: &str, effect: Effect, duration_ms: u32) {
            self.log
                .push(format!("effect {class} {} {duration_ms}", effect.css_class()));
        }
    }

    fn step(element: &str, delay: u32) -> AnimationStep {
        AnimationStep {
            element: element.into(),
            delay,
            duration: 500,
            effect: Effect::FadeIn,
        }
    }

    fn timeline(steps: Vec<AnimationStep>, duration: u32, looping: bool) -> AnimationTimeline {
        AnimationTimeline {
            duration,
            looping,
            timeline: steps,
        }
    }

    #[test]
    fn mutations_follow_delay_order_not_authored_order() {
        let steps = vec![
            step("d", 900),
            step("a", 0),
            step("c", 600),
            step("b", 250),
            step("e", 1200),
        ];
        let mut stage = RecordingStage::with(&["a", "b", "c", "d", "e"]);
        let mut animator = Animator::new(timeline(steps, 2000, false));
        animator.start(&mut stage, 0);
        animator.advance(&mut stage, 5000);
        assert_eq!(stage.revealed(), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn nothing_fires_before_its_delay() {
        let mut stage = RecordingStage::with(&["a", "b"]);
        let mut animator = Animator::new(timeline(vec![step("a", 100), step("b", 400)], 1000, false));
        animator.start(&mut stage, 1000);

        assert_eq!(animator.advance(&mut stage, 1099), 0);
        assert_eq!(animator.advance(&mut stage, 1100), 1);
        assert_eq!(stage.revealed(), vec!["a"]);
        assert_eq!(animator.next_due(), Some(1400));
        animator.advance(&mut stage, 1400);
        assert_eq!(stage.revealed(), vec!["a", "b"]);
        assert_eq!(animator.pending(), 0);
    }

    #[test]
    fn start_resets_targets_first() {
        let mut stage = RecordingStage::with(&["a"]);
        let mut animator = Animator::new(timeline(vec![step("a", 0)], 500, false));
        animator.start(&mut stage, 0);
        assert_eq!(stage.log, vec!["hide a", "clear a"]);
    }

    #[test]
    fn missing_target_is_skipped_not_fatal() {
        let mut stage = RecordingStage::with(&["a", "c"]);
        let steps = vec![step("a", 0), step("missing", 100), step("c", 200)];
        let mut animator = Animator::new(timeline(steps, 1000, false));
        animator.start(&mut stage, 0);
        assert_eq!(animator.advance(&mut stage, 1000), 3);
        assert_eq!(stage.revealed(), vec!["a", "c"]);
    }

    #[test]
    fn loop_restarts_after_duration() {
        let mut stage = RecordingStage::with(&["a"]);
        let mut animator = Animator::new(timeline(vec![step("a", 100)], 1000, true));
        animator.start(&mut stage, 0);

        animator.advance(&mut stage, 999);
        assert_eq!(animator.runs(), 1);
        animator.advance(&mut stage, 1000);
        assert_eq!(animator.runs(), 2);
        // The restart reset the element before the next reveal
        assert_eq!(stage.log.last().unwrap(), "clear a");
        animator.advance(&mut stage, 1100);
        assert_eq!(stage.revealed(), vec!["a", "a"]);
    }

    #[test]
    fn long_advance_replays_every_loop_iteration() {
        let mut stage = RecordingStage::with(&["a"]);
        let mut animator = Animator::new(timeline(vec![step("a", 0)], 300, true));
        animator.start(&mut stage, 0);
        animator.advance(&mut stage, 1000);
        // starts at 0, 300, 600, 900
        assert_eq!(animator.runs(), 4);
        assert_eq!(stage.revealed().len(), 4);
    }

    #[test]
    fn zero_duration_loop_plays_once() {
        let mut stage = RecordingStage::with(&["a"]);
        let mut animator = Animator::new(timeline(vec![step("a", 0)], 0, true));
        animator.start(&mut stage, 0);
        animator.advance(&mut stage, 10_000);
        assert_eq!(animator.runs(), 1);
    }

    #[test]
    fn stop_clears_pending_timers() {
        let mut stage = RecordingStage::with(&["a"]);
        let mut animator = Animator::new(timeline(vec![step("a", 100)], 1000, true));
        animator.start(&mut stage, 0);
        assert_eq!(animator.pending(), 2);
        animator.stop();
        assert_eq!(animator.advance(&mut stage, 10_000), 0);
        assert!(stage.revealed().is_empty());
    }

    #[test]
    fn restarting_discards_previous_run() {
        let mut stage = RecordingStage::with(&["a", "b"]);
        let mut animator = Animator::new(timeline(vec![step("a", 100), step("b", 200)], 1000, false));
        animator.start(&mut stage, 0);
        animator.start(&mut stage, 50);
        assert_eq!(animator.pending(), 2);
        animator.advance(&mut stage, 10_000);
        assert_eq!(stage.revealed(), vec!["a", "b"]);
    }
}
