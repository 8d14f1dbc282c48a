//! Per-size typography and copy-box geometry.
//!
//! The renderer turns a [`SizeLayout`] into the per-size stylesheet and the
//! line splitter uses the same numbers to estimate wrapping, so the two always
//! agree on how wide the copy box is and how large the type is.

/// Width-to-height ratio at or above which a size is treated as a strip
/// (leaderboards, mobile banners): copy shares the row with the CTA.
const STRIP_ASPECT: f32 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Wider than tall. Lines rise into place.
    Horizontal,
    /// Square or taller than wide. Lines slide in from the left.
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeLayout {
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub strip: bool,
    pub padding_px: f32,
    pub copy_width_px: f32,
    pub eyebrow_px: f32,
    pub headline_px: f32,
    pub subhead_px: f32,
    pub cta_px: f32,
}

impl SizeLayout {
    pub fn for_size(width: u32, height: u32) -> Self {
        let w = width as f32;
        let h = height as f32;
        let orientation = if width > height {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };
        let strip = w / h >= STRIP_ASPECT;
        let padding_px = (w.min(h) * 0.08).clamp(6.0, 20.0);

        let (copy_width_px, headline_px) = if strip {
            (w * 0.55 - padding_px, (h * 0.22).clamp(12.0, 28.0))
        } else {
            (w - 2.0 * padding_px, (w.min(h) * 0.09).clamp(14.0, 32.0))
        };

        Self {
            width,
            height,
            orientation,
            strip,
            padding_px,
            copy_width_px,
            eyebrow_px: (headline_px * 0.5).max(9.0),
            headline_px,
            subhead_px: (headline_px * 0.6).max(10.0),
            cta_px: (headline_px * 0.55).max(10.0),
        }
    }
}
