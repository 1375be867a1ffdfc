use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::PulseConfig;

/// Phases of the tap-feedback pulse. The pulse decorates the toggle; it never
/// gates the `active` flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulsePhase {
    Idle,
    Growing,
    Shrinking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Like,
    CommentExpand,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseTiming {
    /// Peak scale the grow leg ramps to.
    pub peak: f32,
    /// Duration of the grow leg; the shrink leg takes twice as long.
    pub grow: Duration,
}

impl PulseTiming {
    pub fn for_kind(config: &PulseConfig, kind: ControlKind) -> Self {
        let peak = match kind {
            ControlKind::Like => config.like_peak,
            ControlKind::CommentExpand => config.comment_peak,
        };
        Self {
            peak,
            grow: config.grow,
        }
    }

    fn shrink(&self) -> Duration {
        self.grow * 2
    }
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self {
            peak: 1.1,
            grow: Duration::from_millis(120),
        }
    }
}

type ToggleCallback = Box<dyn FnMut(bool) + Send>;

/// A boolean toggle with a one-shot pulse animation as tap feedback.
///
/// `toggle` flips `active` immediately; the pulse runs concurrently on
/// whatever clock drives `tick`. Re-tapping mid-pulse restarts the grow leg
/// from the current scale, so rapid taps never compound past the peak.
pub struct ToggleAnimator {
    active: bool,
    phase: PulsePhase,
    phase_started: Instant,
    /// Scale at the instant the current phase began.
    phase_from: f32,
    timing: PulseTiming,
    on_toggle: Option<ToggleCallback>,
}

impl ToggleAnimator {
    pub fn new(timing: PulseTiming) -> Self {
        Self {
            active: false,
            phase: PulsePhase::Idle,
            phase_started: Instant::now(),
            phase_from: 1.0,
            timing,
            on_toggle: None,
        }
    }

    pub fn with_on_toggle<F>(mut self, callback: F) -> Self
    where
        F: FnMut(bool) + Send + 'static,
    {
        self.on_toggle = Some(Box::new(callback));
        self
    }

    /// Flip `active` and restart the pulse from the current scale. The flip
    /// and the callback are synchronous with the tap; only the cosmetic pulse
    /// plays out over time.
    pub fn toggle(&mut self, now: Instant) -> bool {
        self.active = !self.active;
        self.phase_from = self.scale(now);
        self.phase = PulsePhase::Growing;
        self.phase_started = now;
        let active = self.active;
        if let Some(callback) = self.on_toggle.as_mut() {
            callback(active);
        }
        active
    }

    /// Advance the pulse. Returns true when the visual changed, so callers
    /// know to redraw.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.phase {
            PulsePhase::Idle => false,
            PulsePhase::Growing => {
                let elapsed = now.duration_since(self.phase_started);
                if elapsed >= self.timing.grow {
                    self.phase = PulsePhase::Shrinking;
                    self.phase_from = self.timing.peak;
                    self.phase_started += self.timing.grow;
                    // A long stall may cover both legs in one tick.
                    self.tick(now);
                }
                true
            }
            PulsePhase::Shrinking => {
                let elapsed = now.duration_since(self.phase_started);
                if elapsed >= self.timing.shrink() {
                    self.phase = PulsePhase::Idle;
                    self.phase_from = 1.0;
                }
                true
            }
        }
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn phase(&self) -> PulsePhase {
        self.phase
    }

    /// Current scale factor, 1.0 when idle. Pure read; does not advance the
    /// state machine.
    pub fn scale(&self, now: Instant) -> f32 {
        let elapsed = now.duration_since(self.phase_started);
        match self.phase {
            PulsePhase::Idle => 1.0,
            PulsePhase::Growing => {
                let t = fraction(elapsed, self.timing.grow);
                self.phase_from + (self.timing.peak - self.phase_from) * t
            }
            PulsePhase::Shrinking => {
                let t = fraction(elapsed, self.timing.shrink());
                let eased = ease_out(t);
                self.phase_from + (1.0 - self.phase_from) * eased
            }
        }
    }
}

fn fraction(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0)
}

fn ease_out(t: f32) -> f32 {
    t * (2.0 - t)
}

/// Per-post toggle state, keyed by `(post id, control kind)`. Entries are
/// created when a post first renders and dropped wholesale when the feed is
/// replaced. Like and comment-expand entries for one post are independent.
pub struct ToggleArena {
    entries: HashMap<(i64, ControlKind), ToggleAnimator>,
    pulse: PulseConfig,
}

impl ToggleArena {
    pub fn new(pulse: PulseConfig) -> Self {
        Self {
            entries: HashMap::new(),
            pulse,
        }
    }

    pub fn entry_mut(&mut self, post_id: i64, kind: ControlKind) -> &mut ToggleAnimator {
        let timing = PulseTiming::for_kind(&self.pulse, kind);
        self.entries
            .entry((post_id, kind))
            .or_insert_with(|| ToggleAnimator::new(timing))
    }

    pub fn get(&self, post_id: i64, kind: ControlKind) -> Option<&ToggleAnimator> {
        self.entries.get(&(post_id, kind))
    }

    pub fn is_active(&self, post_id: i64, kind: ControlKind) -> bool {
        self.get(post_id, kind)
            .map(ToggleAnimator::active)
            .unwrap_or(false)
    }

    pub fn tick_all(&mut self, now: Instant) -> bool {
        let mut changed = false;
        for animator in self.entries.values_mut() {
            if animator.tick(now) {
                changed = true;
            }
        }
        changed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn timing() -> PulseTiming {
        PulseTiming {
            peak: 1.2,
            grow: Duration::from_millis(100),
        }
    }

    #[test]
    fn toggle_flips_immediately_and_pairs_are_idempotent() {
        let mut animator = ToggleAnimator::new(timing());
        let start = Instant::now();
        assert!(!animator.active());
        assert!(animator.toggle(start));
        // Second tap lands mid-pulse; the flip must not wait for it.
        assert!(!animator.toggle(start + Duration::from_millis(10)));
        assert!(!animator.active());
    }

    #[test]
    fn pulse_walks_growing_shrinking_idle() {
        let mut animator = ToggleAnimator::new(timing());
        let start = Instant::now();
        animator.toggle(start);
        assert_eq!(animator.phase(), PulsePhase::Growing);

        animator.tick(start + Duration::from_millis(100));
        assert_eq!(animator.phase(), PulsePhase::Shrinking);

        animator.tick(start + Duration::from_millis(300));
        assert_eq!(animator.phase(), PulsePhase::Idle);
        assert_eq!(animator.scale(start + Duration::from_millis(300)), 1.0);
    }

    #[test]
    fn scale_ramps_to_peak_then_returns_to_one() {
        let mut animator = ToggleAnimator::new(timing());
        let start = Instant::now();
        animator.toggle(start);

        let mid_grow = animator.scale(start + Duration::from_millis(50));
        assert!(mid_grow > 1.0 && mid_grow < 1.2, "mid grow {mid_grow}");

        animator.tick(start + Duration::from_millis(100));
        let at_peak = animator.scale(start + Duration::from_millis(100));
        assert!((at_peak - 1.2).abs() < 1e-6, "peak {at_peak}");

        let mid_shrink = animator.scale(start + Duration::from_millis(200));
        assert!(mid_shrink > 1.0 && mid_shrink < 1.2, "mid shrink {mid_shrink}");
    }

    #[test]
    fn retap_restarts_from_current_scale_without_compounding() {
        let mut animator = ToggleAnimator::new(timing());
        let start = Instant::now();
        animator.toggle(start);

        let before = animator.scale(start + Duration::from_millis(60));
        animator.toggle(start + Duration::from_millis(60));
        assert_eq!(animator.phase(), PulsePhase::Growing);
        let after = animator.scale(start + Duration::from_millis(60));
        assert!((after - before).abs() < 1e-6, "restart from current scale");

        // Never exceeds the peak no matter how fast the taps come.
        for i in 0..20 {
            let now = start + Duration::from_millis(60 + i * 7);
            animator.toggle(now);
            assert!(animator.scale(now) <= 1.2 + 1e-6);
        }
    }

    #[test]
    fn pulse_settles_to_idle_once_taps_stop() {
        let mut animator = ToggleAnimator::new(timing());
        let start = Instant::now();
        for i in 0..10 {
            let now = start + Duration::from_millis(i * 13);
            animator.toggle(now);
            animator.tick(now);
            assert!(matches!(
                animator.phase(),
                PulsePhase::Idle | PulsePhase::Growing | PulsePhase::Shrinking
            ));
        }
        animator.tick(start + Duration::from_secs(5));
        assert_eq!(animator.phase(), PulsePhase::Idle);
    }

    #[test]
    fn long_stall_covers_both_legs_in_one_tick() {
        let mut animator = ToggleAnimator::new(timing());
        let start = Instant::now();
        animator.toggle(start);
        animator.tick(start + Duration::from_secs(1));
        assert_eq!(animator.phase(), PulsePhase::Idle);
    }

    #[test]
    fn on_toggle_fires_synchronously_with_each_flip() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let mut animator =
            ToggleAnimator::new(timing()).with_on_toggle(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        let start = Instant::now();
        animator.toggle(start);
        animator.toggle(start + Duration::from_millis(5));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arena_keys_are_independent_per_post_and_kind() {
        let mut arena = ToggleArena::new(PulseConfig::default());
        let now = Instant::now();

        arena.entry_mut(1, ControlKind::Like).toggle(now);
        assert!(arena.is_active(1, ControlKind::Like));
        assert!(!arena.is_active(1, ControlKind::CommentExpand));
        assert!(!arena.is_active(2, ControlKind::Like));

        arena.entry_mut(1, ControlKind::CommentExpand).toggle(now);
        assert!(arena.is_active(1, ControlKind::Like));
        assert!(arena.is_active(1, ControlKind::CommentExpand));

        arena.clear();
        assert!(!arena.is_active(1, ControlKind::Like));
    }

    #[test]
    fn arena_uses_per_kind_peaks() {
        let arena_config = PulseConfig::default();
        let like = PulseTiming::for_kind(&arena_config, ControlKind::Like);
        let comment = PulseTiming::for_kind(&arena_config, ControlKind::CommentExpand);
        assert_eq!(like.peak, 1.1);
        assert_eq!(comment.peak, 1.2);
    }
}
