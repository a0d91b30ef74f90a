use crate::constants::AUTO_SCROLL_THRESHOLD_PX;

/// Scroll geometry of the message list, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    pub scroll_height: f64,
    pub scroll_top: f64,
    pub client_height: f64,
}

impl ViewportMetrics {
    pub fn new(scroll_height: f64, scroll_top: f64, client_height: f64) -> Self {
        Self {
            scroll_height,
            scroll_top,
            client_height,
        }
    }

    pub fn distance_from_bottom(&self) -> f64 {
        self.scroll_height - self.scroll_top - self.client_height
    }

    pub fn is_near_bottom(&self) -> bool {
        self.distance_from_bottom() < AUTO_SCROLL_THRESHOLD_PX
    }
}

/// Decides whether a settled turn should pull the view to the bottom.
///
/// The decision is taken at send time, before the reply arrives, so a user
/// who scrolls up while waiting is not yanked back down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPolicy {
    first_scroll_pending: bool,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollPolicy {
    pub fn new() -> Self {
        Self {
            first_scroll_pending: true,
        }
    }

    pub fn first_scroll_pending(&self) -> bool {
        self.first_scroll_pending
    }

    /// Returns the updated policy and whether to auto-scroll once the turn settles.
    /// Without a mounted viewport nothing scrolls and the first-scroll slot is kept.
    pub fn decide(self, viewport: Option<ViewportMetrics>) -> (Self, bool) {
        let Some(viewport) = viewport else {
            return (self, false);
        };
        if self.first_scroll_pending {
            return (
                Self {
                    first_scroll_pending: false,
                },
                true,
            );
        }
        (self, viewport.is_near_bottom())
    }
}
