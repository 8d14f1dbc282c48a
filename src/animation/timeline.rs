//! Timeline resolution for one (banner, size) pair.

use super::layout::SizeLayout;
use super::reveal::{self, RevealInput};
use crate::config::AnimationConfig;
use crate::types::{AnimationStep, AnimationTimeline, Banner, BannerSize};

/// Per-size override applied to explicit timelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeAdjustment {
    pub duration: u32,
    pub looping: bool,
}

/// Well-known size ids that need different pacing. Mobile banners get a
/// shorter cycle; leaderboards a slightly longer one.
pub fn size_adjustment(size_id: &str) -> Option<SizeAdjustment> {
    match size_id {
        "mobile-banner" => Some(SizeAdjustment {
            duration: 2500,
            looping: true,
        }),
        "leaderboard" => Some(SizeAdjustment {
            duration: 3000,
            looping: true,
        }),
        _ => None,
    }
}

/// Resolve the timeline a page will play.
///
/// An authored timeline is used as-is apart from the size adjustment. Its steps
/// are not validated against the markup and keep their authored order.
/// Otherwise the default reveal plan is built from estimated line counts.
pub fn resolve_timeline(
    banner: &Banner,
    size: &BannerSize,
    config: &AnimationConfig,
) -> AnimationTimeline {
    match &banner.animation {
        Some(explicit) => {
            let mut timeline = explicit.clone();
            if let Some(adj) = size_adjustment(&size.id()) {
                timeline.duration = adj.duration;
                timeline.looping = adj.looping;
            }
            timeline
        }
        None => {
            let layout = SizeLayout::for_size(size.width, size.height);
            reveal::plan(&RevealInput::estimate(&banner.content, &layout), config)
        }
    }
}

/// End of the last step, ignoring the declared total duration.
pub fn content_end(timeline: &AnimationTimeline) -> u32 {
    timeline
        .timeline
        .iter()
        .map(AnimationStep::end)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Effect;
    use crate::types::BannerContent;

    fn banner(animation: Option<AnimationTimeline>) -> Banner {
        Banner {
            id: "spring".into(),
            name: "Spring".into(),
            sizes: vec![],
            content: BannerContent {
                eyebrow: String::new(),
                headline: "Bloom".into(),
                subhead: String::new(),
                cta: "Go".into(),
            },
            assets: Default::default(),
            clickthrough: "https://example.com".into(),
            animation,
        }
    }

    fn step(element: &str, delay: u32) -> AnimationStep {
        AnimationStep {
            element: element.into(),
            delay,
            duration: 400,
            effect: Effect::FadeIn,
        }
    }

    #[test]
    fn explicit_timeline_passes_through() {
        let explicit = AnimationTimeline {
            duration: 5000,
            looping: false,
            timeline: vec![step("cta-button", 900), step("headline", 100)],
        };
        let b = banner(Some(explicit.clone()));
        let resolved = resolve_timeline(&b, &BannerSize::new(300, 250), &AnimationConfig::default());
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn leaderboard_id_adjusts_explicit_timeline() {
        let b = banner(Some(AnimationTimeline {
            duration: 5000,
            looping: false,
            timeline: vec![step("headline", 0)],
        }));
        let size = BannerSize {
            id: Some("leaderboard".into()),
            ..BannerSize::new(728, 90)
        };
        let resolved = resolve_timeline(&b, &size, &AnimationConfig::default());
        assert_eq!(resolved.duration, 3000);
        assert!(resolved.looping);
        assert_eq!(resolved.timeline.len(), 1);
    }

    #[test]
    fn missing_timeline_uses_default_plan() {
        let b = banner(None);
        let resolved = resolve_timeline(&b, &BannerSize::new(300, 250), &AnimationConfig::default());
        let elements: Vec<&str> = resolved.timeline.iter().map(|s| s.element.as_str()).collect();
        assert_eq!(elements, vec!["headline-line-1", "cta-button"]);
    }

    #[test]
    fn content_end_ignores_declared_duration() {
        let timeline = AnimationTimeline {
            duration: 100,
            looping: false,
            timeline: vec![step("c", 300), step("a", 0), step("b", 300)],
        };
        assert_eq!(content_end(&timeline), 300 + timeline.timeline[0].duration);
        assert_eq!(content_end(&AnimationTimeline { timeline: vec![], ..timeline }), 0);
    }
}
