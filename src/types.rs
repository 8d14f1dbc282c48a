//! Banner data model.
//!
//! These types mirror the structure of `banners.json`. They are authored once,
//! read at build time, and never mutated afterwards. Every later stage (render,
//! package, the animation planner) borrows them read-only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::animation::Effect;
use crate::naming;

/// Root of the banner data file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BannerData {
    pub banners: Vec<Banner>,
}

/// One advertising creative, renderable at several pixel sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    pub id: String,
    pub name: String,
    pub sizes: Vec<BannerSize>,
    pub content: BannerContent,
    /// Asset key → public path, e.g. `"logo" → "/images/logo.png"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assets: BTreeMap<String, String>,
    pub clickthrough: String,
    /// Explicit timeline. When absent the default reveal plan is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationTimeline>,
}

impl Banner {
    /// Asset map for one size: banner-level assets with the size's overrides
    /// applied. An empty override value removes the key for that size.
    pub fn assets_for(&self, size: &BannerSize) -> BTreeMap<String, String> {
        let mut assets = self.assets.clone();
        for (key, path) in &size.assets {
            if path.is_empty() {
                assets.remove(key);
            } else {
                assets.insert(key.clone(), path.clone());
            }
        }
        assets
    }
}

/// Textual copy shared by every size of a banner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BannerContent {
    #[serde(default)]
    pub eyebrow: String,
    pub headline: String,
    #[serde(default)]
    pub subhead: String,
    pub cta: String,
}

/// A width × height rendering target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerSize {
    pub width: u32,
    pub height: u32,
    /// Stable identifier used for the page filename. Defaults to `WxH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Per-size asset overrides, same key space as [`Banner::assets`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assets: BTreeMap<String, String>,
}

impl BannerSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            id: None,
            assets: BTreeMap::new(),
        }
    }

    /// `300x250` style label.
    pub fn label(&self) -> String {
        naming::size_label(self.width, self.height)
    }

    /// The explicit id, or the size label when none was authored.
    pub fn id(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.label())
    }
}

/// One reveal effect applied to one element after a fixed delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationStep {
    /// CSS class of the target element (without the leading dot).
    pub element: String,
    /// Milliseconds after animation start.
    pub delay: u32,
    /// Milliseconds.
    pub duration: u32,
    pub effect: Effect,
}

impl AnimationStep {
    /// When the step finishes, clamped to `u32::MAX`.
    pub fn end(&self) -> u32 {
        self.delay.saturating_add(self.duration)
    }
}

/// Ordered, delay-based reveal sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationTimeline {
    /// Total length in milliseconds. A looping timeline restarts after this.
    pub duration: u32,
    #[serde(rename = "loop", default)]
    pub looping: bool,
    pub timeline: Vec<AnimationStep>,
}
