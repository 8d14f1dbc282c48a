//! The default reveal sequence.
//!
//! Banners without an explicit timeline get this plan: the eyebrow fades in,
//! headline lines follow one by one, then subhead lines, then the CTA. Line
//! counts come from [`split`](super::split) at build time and from real
//! measurement in the browser; both feed the same offsets below.
//!
//! ```text
//! eyebrow   ──█████                                         0 ms, 500 ms
//! headline     ───██████ ─██████                            300 + 150·i
//! subhead              ────█████ ─█████                     600 + 150·H + 120·i
//! cta                               ─────█████              900 + 150·H + 120·S
//! ```

use super::effect::Effect;
use super::layout::{Orientation, SizeLayout};
use super::split::{FontMetrics, split_lines};
use crate::config::AnimationConfig;
use crate::types::{AnimationStep, AnimationTimeline, BannerContent};

const EYEBROW_DURATION: u32 = 500;
const HEADLINE_START_AFTER_EYEBROW: u32 = 300;
const HEADLINE_STAGGER: u32 = 150;
const HEADLINE_DURATION: u32 = 600;
const SUBHEAD_START_AFTER_EYEBROW: u32 = 600;
const SUBHEAD_START: u32 = 300;
const SUBHEAD_STAGGER: u32 = 120;
const SUBHEAD_DURATION: u32 = 500;
const CTA_START: u32 = 900;
const CTA_DURATION: u32 = 500;

/// Everything the default plan depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealInput {
    pub has_eyebrow: bool,
    pub headline_lines: usize,
    pub subhead_lines: usize,
    pub has_cta: bool,
    pub orientation: Orientation,
}

impl RevealInput {
    /// Estimate line counts for `content` rendered at `layout`.
    pub fn estimate(content: &BannerContent, layout: &SizeLayout) -> Self {
        let headline = split_lines(
            &content.headline,
            layout.copy_width_px,
            &FontMetrics::new(layout.headline_px),
        );
        let subhead = split_lines(
            &content.subhead,
            layout.copy_width_px,
            &FontMetrics::new(layout.subhead_px),
        );
        Self {
            has_eyebrow: !content.eyebrow.trim().is_empty(),
            headline_lines: headline.len(),
            subhead_lines: subhead.len(),
            has_cta: !content.cta.trim().is_empty(),
            orientation: layout.orientation,
        }
    }
}

/// Element class the runtime gives the n-th (0-based) split line.
pub fn line_class(block: &str, index: usize) -> String {
    format!("{block}-line-{}", index + 1)
}

/// Build the default timeline.
pub fn plan(input: &RevealInput, config: &AnimationConfig) -> AnimationTimeline {
    let effect = match input.orientation {
        Orientation::Horizontal => Effect::FadeInUp,
        Orientation::Vertical => Effect::SlideInLeft,
    };
    let headline_lines = input.headline_lines as u32;
    let subhead_lines = input.subhead_lines as u32;
    let mut steps = Vec::new();

    if input.has_eyebrow {
        steps.push(AnimationStep {
            element: "eyebrow".to_string(),
            delay: 0,
            duration: EYEBROW_DURATION,
            effect: Effect::FadeIn,
        });
    }

    let headline_start = if input.has_eyebrow {
        HEADLINE_START_AFTER_EYEBROW
    } else {
        0
    };
    for i in 0..input.headline_lines {
        steps.push(AnimationStep {
            element: line_class("headline", i),
            delay: headline_start + i as u32 * HEADLINE_STAGGER,
            duration: HEADLINE_DURATION,
            effect,
        });
    }

    let subhead_start = if input.has_eyebrow {
        SUBHEAD_START_AFTER_EYEBROW
    } else {
        SUBHEAD_START
    } + headline_lines * HEADLINE_STAGGER;
    for i in 0..input.subhead_lines {
        steps.push(AnimationStep {
            element: line_class("subhead", i),
            delay: subhead_start + i as u32 * SUBHEAD_STAGGER,
            duration: SUBHEAD_DURATION,
            effect,
        });
    }

    if input.has_cta {
        steps.push(AnimationStep {
            element: "cta-button".to_string(),
            delay: CTA_START + headline_lines * HEADLINE_STAGGER + subhead_lines * SUBHEAD_STAGGER,
            duration: CTA_DURATION,
            effect,
        });
    }

    let last_end = steps.iter().map(AnimationStep::end).max().unwrap_or(0);
    AnimationTimeline {
        duration: last_end.saturating_add(config.loop_pause_ms),
        looping: config.looping,
        timeline: steps,
    }
}
