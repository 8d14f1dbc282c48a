//! Reveal effects and their CSS classes.

use serde::{Deserialize, Serialize};

/// The fixed set of visual effects a step can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Effect {
    FadeIn,
    FadeInUp,
    FadeInDown,
    SlideInLeft,
    SlideInRight,
    Scale,
}

/// Every class an effect can leave on an element. Reset strips all of them.
pub const EFFECT_CLASSES: [&str; 6] = [
    "fade-in",
    "fade-in-up",
    "fade-in-down",
    "slide-in-left",
    "slide-in-right",
    "scale",
];

impl Effect {
    /// Class defined in `banner-base.css` that runs this effect's keyframes.
    pub fn css_class(self) -> &'static str {
        match self {
            Effect::FadeIn => "fade-in",
            Effect::FadeInUp => "fade-in-up",
            Effect::FadeInDown => "fade-in-down",
            Effect::SlideInLeft => "slide-in-left",
            Effect::SlideInRight => "slide-in-right",
            Effect::Scale => "scale",
        }
    }
}
