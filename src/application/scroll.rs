//! Scroll-triggered reveal with a re-entrancy guard.

/// Geometry reported by a scroll or resize event, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub document_height: f64,
}

impl ScrollMetrics {
    pub fn distance_to_bottom(&self) -> f64 {
        (self.document_height - (self.scroll_top + self.viewport_height)).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollGate {
    /// Caller should extend the list, then call [`ScrollLoader::finish`].
    Extend,
    /// An extension is already in flight.
    Busy,
    /// Still further than the threshold from the bottom.
    Distant,
}

/// Decides when a scroll event should reveal more items.
///
/// The guard is raised by [`ScrollLoader::check`] and lowered only by
/// [`ScrollLoader::finish`], so events that arrive in between are dropped
/// instead of triggering a second extension.
#[derive(Debug, Clone)]
pub struct ScrollLoader {
    threshold_px: f64,
    loading: bool,
}

impl ScrollLoader {
    pub fn new(threshold_px: f64) -> Self {
        Self {
            threshold_px: threshold_px.max(0.0),
            loading: false,
        }
    }

    pub fn threshold_px(&self) -> f64 {
        self.threshold_px
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn check(&mut self, metrics: ScrollMetrics) -> ScrollGate {
        if self.loading {
            return ScrollGate::Busy;
        }
        if metrics.distance_to_bottom() > self.threshold_px {
            return ScrollGate::Distant;
        }
        self.loading = true;
        ScrollGate::Extend
    }

    pub fn finish(&mut self) {
        self.loading = false;
    }
}
