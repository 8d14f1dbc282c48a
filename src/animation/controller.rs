//! Readiness-gated playback for one banner container.
//!
//! Mirrors what the page runtime does on load: wait for the gate, let the
//! browser settle, plan, then play. Events and ticks carry a millisecond clock.

use super::animator::{Animator, Stage};
use super::gate::{FontOutcome, ImageOutcome, Readiness, ReadinessGate};
use crate::config::AnimationConfig;
use crate::types::AnimationTimeline;

#[derive(Debug, Clone)]
pub struct Controller {
    gate: ReadinessGate,
    animator: Animator,
    start_delay_ms: u64,
    start_at: Option<u64>,
    started_at: Option<u64>,
    attached: bool,
}

impl Controller {
    pub fn new(timeline: AnimationTimeline, image_count: usize, config: &AnimationConfig) -> Self {
        Self {
            gate: ReadinessGate::new(image_count),
            animator: Animator::new(timeline),
            start_delay_ms: u64::from(config.settle_ms) + u64::from(config.play_delay_ms),
            start_at: None,
            started_at: None,
            attached: true,
        }
    }

    /// Check the container exists. Without one the controller stays inert.
    pub fn attach<S: Stage>(&mut self, stage: &S) -> bool {
        self.attached = stage.has_container();
        if !self.attached {
            tracing::warn!("banner container not found, animation disabled");
        }
        self.attached
    }

    pub fn on_dom_ready(&mut self, now: u64) {
        let r = self.gate.dom_ready();
        self.on_readiness(r, now);
    }

    pub fn on_fonts(&mut self, outcome: FontOutcome, now: u64) {
        let r = self.gate.fonts_settled(outcome);
        self.on_readiness(r, now);
    }

    pub fn on_image(&mut self, outcome: ImageOutcome, now: u64) {
        let r = self.gate.image_settled(outcome);
        self.on_readiness(r, now);
    }

    fn on_readiness(&mut self, readiness: Readiness, now: u64) {
        if readiness == Readiness::Ready {
            tracing::debug!(now, "all assets ready");
            self.start_at = Some(now + self.start_delay_ms);
        }
    }

    /// Drive playback up to `now`.
    pub fn tick<S: Stage>(&mut self, stage: &mut S, now: u64) -> usize {
        if !self.attached {
            return 0;
        }
        if self.started_at.is_none()
            && let Some(at) = self.start_at
            && at <= now
        {
            self.animator.start(stage, at);
            self.started_at = Some(at);
        }
        self.animator.advance(stage, now)
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_open()
    }

    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    /// Cancel pending reveals and restarts.
    pub fn stop(&mut self) {
        self.animator.stop();
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }
}
