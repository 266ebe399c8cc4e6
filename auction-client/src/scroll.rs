//! Sentinel-based load-more trigger.
//!
//! A view acquires one [`Observation`] for its lifetime and reports the
//! marker's visibility after every layout. The observation fires on the rising
//! edge only: the marker has to leave and re-enter, or move because the window
//! grew, before it fires again.

use crate::paginator::IncrementalPaginator;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Marker must be fully visible.
pub const VISIBILITY_THRESHOLD: f32 = 1.0;

/// The side of the paginator the trigger talks to.
pub trait LoadMore: Send + Sync {
    fn has_more(&self) -> bool;
    fn request_more(&self) -> bool;
}

impl LoadMore for IncrementalPaginator {
    fn has_more(&self) -> bool {
        IncrementalPaginator::has_more(self)
    }

    fn request_more(&self) -> bool {
        IncrementalPaginator::request_more(self)
    }
}

/// What sits below the last card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footer {
    Loading,
    EndOfList,
}

impl Footer {
    pub fn for_window(has_more: bool) -> Self {
        if has_more {
            Footer::Loading
        } else {
            Footer::EndOfList
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Footer::Loading => "Loading more auctions...",
            Footer::EndOfList => "No more auctions",
        }
    }
}

/// Fraction of the marker rows `[marker_top, marker_top + marker_height)` that
/// fall inside the viewport `[viewport_top, viewport_top + viewport_height)`.
pub fn visibility_ratio(
    marker_top: usize,
    marker_height: usize,
    viewport_top: usize,
    viewport_height: usize,
) -> f32 {
    if marker_height == 0 {
        return 0.0;
    }
    let start = marker_top.max(viewport_top);
    let end = (marker_top + marker_height).min(viewport_top + viewport_height);
    if end <= start {
        return 0.0;
    }
    (end - start) as f32 / marker_height as f32
}

struct Observer {
    target: Arc<dyn LoadMore>,
    visible: bool,
    marker_position: Option<usize>,
}

pub struct ScrollTrigger;

impl ScrollTrigger {
    /// Starts observing on behalf of `target`. Call once per view.
    pub fn observe(target: Arc<dyn LoadMore>) -> Observation {
        Observation {
            observer: Mutex::new(Some(Observer {
                target,
                visible: false,
                marker_position: None,
            })),
        }
    }
}

/// Live registration returned by [`ScrollTrigger::observe`]. Released by
/// [`Observation::unobserve`] or on drop, whichever comes first.
pub struct Observation {
    observer: Mutex<Option<Observer>>,
}

impl Observation {
    /// Reports the marker's current visibility. `marker_position` identifies
    /// where the marker sits (the window length); a change counts as a new
    /// appearance. Returns `true` when a load-more request was accepted.
    pub fn on_visibility(&self, ratio: f32, marker_position: usize) -> bool {
        let mut guard = self.observer.lock();
        let Some(observer) = guard.as_mut() else {
            return false;
        };
        let fully_visible = ratio >= VISIBILITY_THRESHOLD;
        let repositioned = observer.marker_position != Some(marker_position);
        let rising = fully_visible && (!observer.visible || repositioned);
        observer.visible = fully_visible;
        observer.marker_position = Some(marker_position);

        if !rising || !observer.target.has_more() {
            return false;
        }
        let accepted = observer.target.request_more();
        debug!(target: "scroll", marker_position, accepted, "marker entered view");
        accepted
    }

    pub fn is_active(&self) -> bool {
        self.observer.lock().is_some()
    }

    /// Drops the reference to the target. Safe to call repeatedly.
    pub fn unobserve(&self) {
        if self.observer.lock().take().is_some() {
            debug!(target: "scroll", "observation released");
        }
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.unobserve();
    }
}
