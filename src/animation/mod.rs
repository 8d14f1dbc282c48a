//! Banner animation: effects, timelines, reveal planning, and playback.
//!
//! The browser runtime (`static/banner-animation.js`) plays banners; this
//! module is the model it follows. The renderer uses it to plan default
//! timelines and the embedded config, and the tests use it to pin down
//! ordering and gating behaviour without a browser.
//!
//! | Module | Role |
//! |--------|------|
//! | [`effect`] | The six reveal effects and their CSS classes |
//! | [`layout`] | Per-size copy box and type sizes |
//! | [`split`] | Word-preserving line splitting |
//! | [`reveal`] | Default eyebrow → headline → subhead → CTA plan |
//! | [`timeline`] | Picks the explicit or default timeline for a size |
//! | [`gate`] | DOM / font / image readiness |
//! | [`animator`] | Independent per-step delay timers, reset, loop |
//! | [`controller`] | Gate + animator for one container |

pub mod animator;
pub mod controller;
pub mod effect;
pub mod gate;
pub mod layout;
pub mod reveal;
pub mod split;
pub mod timeline;

pub use animator::{Animator, Stage};
pub use controller::Controller;
pub use effect::{EFFECT_CLASSES, Effect};
pub use gate::{FontOutcome, ImageOutcome, Readiness, ReadinessGate};
pub use layout::{Orientation, SizeLayout};
pub use timeline::resolve_timeline;
