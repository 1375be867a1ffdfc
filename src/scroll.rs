use std::time::{Duration, Instant};

use crate::config::ScrollConfig;

/// Tracks the feed's continuous scroll offset and derives the two chrome
/// projections from it. There is exactly one tracker per feed view; every
/// chrome element reads its opacity from here and nowhere else.
///
/// Scroll events arrive much faster than the render path wants to recompute,
/// so raw offsets land in `pending` and only the latest one is published each
/// coalescing interval (16ms by default). Dropping intermediate offsets is
/// fine; only the last value before a frame matters.
pub struct ScrollMetricsTracker {
    applied: f32,
    pending: Option<f32>,
    last_applied_at: Instant,
    coalesce_interval: Duration,
    chrome_fade: (f32, f32),
    top_button: (f32, f32),
}

impl ScrollMetricsTracker {
    pub fn new(config: &ScrollConfig) -> Self {
        Self {
            applied: 0.0,
            pending: None,
            last_applied_at: Instant::now(),
            coalesce_interval: config.coalesce_interval,
            chrome_fade: (config.chrome_fade_start, config.chrome_fade_end),
            top_button: (config.top_button_start, config.top_button_end),
        }
    }

    /// Record a scroll event. The offset is applied immediately if the
    /// coalescing window has elapsed, otherwise it replaces any pending value.
    pub fn on_scroll(&mut self, offset: f32, now: Instant) -> bool {
        if now.duration_since(self.last_applied_at) >= self.coalesce_interval {
            self.apply(offset, now);
            true
        } else {
            self.pending = Some(offset);
            false
        }
    }

    /// Publish a pending offset once the coalescing window has elapsed.
    /// Returns true when readers should recompute.
    pub fn tick(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last_applied_at) < self.coalesce_interval {
            return false;
        }
        match self.pending.take() {
            Some(offset) => {
                self.apply(offset, now);
                true
            }
            None => false,
        }
    }

    /// Immediate write, bypassing coalescing. Used when the feed is replaced
    /// and the viewport snaps back to the top.
    pub fn reset(&mut self, now: Instant) {
        self.pending = None;
        self.apply(0.0, now);
    }

    fn apply(&mut self, offset: f32, now: Instant) {
        self.applied = offset;
        self.last_applied_at = now;
    }

    pub fn offset(&self) -> f32 {
        self.applied
    }

    /// 1.0 at the top of the feed, fading to 0.0 by the configured offset.
    pub fn chrome_opacity(&self) -> f32 {
        let (start, end) = self.chrome_fade;
        lerp_clamped(self.applied, start, end, 1.0, 0.0)
    }

    /// 0.0 until the configured offset, reaching 1.0 once scrolled far enough.
    pub fn top_button_opacity(&self) -> f32 {
        let (start, end) = self.top_button;
        lerp_clamped(self.applied, start, end, 0.0, 1.0)
    }
}

/// Maps `value` from `[start, end]` onto `[from, to]`, clamping outside the
/// domain. Negative offsets clamp like any other out-of-range input.
fn lerp_clamped(value: f32, start: f32, end: f32, from: f32, to: f32) -> f32 {
    if end <= start {
        return if value < start { from } else { to };
    }
    let t = ((value - start) / (end - start)).clamp(0.0, 1.0);
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ScrollMetricsTracker {
        ScrollMetricsTracker::new(&ScrollConfig::default())
    }

    // Each event lands with the coalescing window already elapsed: a
    // thread-local base advances by 100ms per call so successive timestamps
    // stay ahead of `last_applied_at` even when real time barely moves, and a
    // trailing tick publishes the offset even if it was stored as pending.
    fn apply(tracker: &mut ScrollMetricsTracker, offset: f32) {
        use std::cell::Cell;
        thread_local! {
            static ELAPSED_MS: Cell<u64> = const { Cell::new(0) };
        }
        let elapsed = ELAPSED_MS.with(|ms| {
            ms.set(ms.get() + 100);
            ms.get()
        });
        let now = Instant::now() + Duration::from_millis(elapsed);
        tracker.on_scroll(offset, now);
        tracker.tick(now + Duration::from_millis(50));
        assert_eq!(tracker.offset(), offset);
    }

    #[test]
    fn chrome_opacity_clamps_at_bounds() {
        let mut t = tracker();
        for offset in [-500.0, -1.0, 0.0] {
            apply(&mut t, offset);
            assert_eq!(t.chrome_opacity(), 1.0, "offset {offset}");
        }
        for offset in [200.0, 201.0, 10_000.0] {
            apply(&mut t, offset);
            assert_eq!(t.chrome_opacity(), 0.0, "offset {offset}");
        }
    }

    #[test]
    fn chrome_opacity_is_linear_between_bounds() {
        let mut t = tracker();
        apply(&mut t, 50.0);
        assert!((t.chrome_opacity() - 0.75).abs() < 1e-6);
        apply(&mut t, 100.0);
        assert!((t.chrome_opacity() - 0.5).abs() < 1e-6);
        apply(&mut t, 150.0);
        assert!((t.chrome_opacity() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn top_button_opacity_clamps_at_bounds() {
        let mut t = tracker();
        for offset in [-10.0, 0.0, 250.0, 300.0] {
            apply(&mut t, offset);
            assert_eq!(t.top_button_opacity(), 0.0, "offset {offset}");
        }
        for offset in [500.0, 501.0, 2_000.0] {
            apply(&mut t, offset);
            assert_eq!(t.top_button_opacity(), 1.0, "offset {offset}");
        }
    }

    #[test]
    fn top_button_opacity_is_linear_between_bounds() {
        let mut t = tracker();
        apply(&mut t, 400.0);
        assert!((t.top_button_opacity() - 0.5).abs() < 1e-6);
        apply(&mut t, 450.0);
        assert!((t.top_button_opacity() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn rapid_events_coalesce_to_latest() {
        let mut t = tracker();
        let base = Instant::now() + Duration::from_millis(100);
        assert!(t.on_scroll(10.0, base));

        // Within the window: stored, not applied.
        assert!(!t.on_scroll(20.0, base + Duration::from_millis(4)));
        assert!(!t.on_scroll(30.0, base + Duration::from_millis(8)));
        assert_eq!(t.offset(), 10.0);

        // The window elapses; only the latest pending value is published.
        assert!(t.tick(base + Duration::from_millis(16)));
        assert_eq!(t.offset(), 30.0);
        assert!(!t.tick(base + Duration::from_millis(32)));
    }

    #[test]
    fn reset_snaps_back_to_top() {
        let mut t = tracker();
        apply(&mut t, 400.0);
        t.reset(Instant::now() + Duration::from_millis(200));
        assert_eq!(t.offset(), 0.0);
        assert_eq!(t.chrome_opacity(), 1.0);
        assert_eq!(t.top_button_opacity(), 0.0);
    }
}
