//! Asset readiness gating.
//!
//! Text splitting and layout-dependent offsets are only accurate once font
//! metrics and images have settled, so nothing animates until:
//!
//! 1. the DOM is parsed,
//! 2. the requested web fonts have loaded **or failed**,
//! 3. every image in the container has fired `load` **or** `error`.
//!
//! Failures count as settled so a broken font or image can never hang a banner.

/// Outcome of the web font request. Both variants open the font gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontOutcome {
    Active,
    Inactive,
}

/// Outcome of one image. Both variants count toward readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    Loaded,
    Errored,
}

/// Result of feeding an event to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Waiting,
    /// Returned exactly once, by the event that completed the last condition.
    Ready,
    /// The gate had already opened before this event.
    AlreadyOpen,
}

#[derive(Debug, Clone)]
pub struct ReadinessGate {
    dom: bool,
    fonts: bool,
    images_total: usize,
    images_settled: usize,
    open: bool,
}

impl ReadinessGate {
    /// A gate waiting on `image_count` images. Zero images means the image
    /// condition holds from the start.
    pub fn new(image_count: usize) -> Self {
        Self {
            dom: false,
            fonts: false,
            images_total: image_count,
            images_settled: 0,
            open: false,
        }
    }

    pub fn dom_ready(&mut self) -> Readiness {
        self.dom = true;
        self.check()
    }

    pub fn fonts_settled(&mut self, outcome: FontOutcome) -> Readiness {
        tracing::debug!(?outcome, "fonts settled");
        self.fonts = true;
        self.check()
    }

    /// Record one image. Already-complete (cached) images are reported the
    /// same way as ones that load later. Extra reports are ignored.
    pub fn image_settled(&mut self, outcome: ImageOutcome) -> Readiness {
        if outcome == ImageOutcome::Errored {
            tracing::debug!("image failed to load, continuing");
        }
        self.images_settled = (self.images_settled + 1).min(self.images_total);
        self.check()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn images_pending(&self) -> usize {
        self.images_total - self.images_settled
    }

    fn check(&mut self) -> Readiness {
        if self.open {
            return Readiness::AlreadyOpen;
        }
        if self.dom && self.fonts && self.images_pending() == 0 {
            self.open = true;
            Readiness::Ready
        } else {
            Readiness::Waiting
        }
    }
}
