use ratatui::style::Color;

use crate::scroll::ScrollMetricsTracker;

/// Anything chrome can scroll imperatively. The feed viewport implements
/// this; tests substitute a recorder.
pub trait ScrollSurface {
    fn scroll_to(&mut self, offset: f32, animated: bool);
}

/// Opacities below this are treated as invisible: the element is neither
/// drawn nor hit-testable.
pub const VISIBILITY_FLOOR: f32 = 0.01;

/// What the chrome should look like for the current scroll metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromePlan {
    pub header_opacity: f32,
    pub filter_opacity: f32,
    pub top_button_opacity: f32,
}

impl ChromePlan {
    pub fn header_visible(&self) -> bool {
        self.header_opacity >= VISIBILITY_FLOOR
    }

    pub fn filter_visible(&self) -> bool {
        self.filter_opacity >= VISIBILITY_FLOOR
    }

    pub fn top_button_visible(&self) -> bool {
        self.top_button_opacity >= VISIBILITY_FLOOR
    }
}

/// Derives chrome visibility from the shared scroll metrics and owns the
/// scroll-to-top action. It never writes the metrics itself; the surface's
/// own motion emits the scroll events that bring the chrome back.
pub struct ChromeController;

impl ChromeController {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(&self, tracker: &ScrollMetricsTracker) -> ChromePlan {
        let chrome = tracker.chrome_opacity();
        ChromePlan {
            header_opacity: chrome,
            filter_opacity: chrome,
            top_button_opacity: tracker.top_button_opacity(),
        }
    }

    pub fn scroll_to_top(&self, surface: &mut dyn ScrollSurface) {
        surface.scroll_to(0.0, true);
    }
}

impl Default for ChromeController {
    fn default() -> Self {
        Self::new()
    }
}

/// Fade `color` toward `background` by the given opacity. Terminals have no
/// alpha channel, so opacity renders as an RGB blend.
pub fn fade(color: Color, background: Color, opacity: f32) -> Color {
    let (fr, fg, fb) = rgb_channels(color);
    let (br, bg, bb) = rgb_channels(background);
    let t = opacity.clamp(0.0, 1.0);
    Color::Rgb(
        blend(br, fr, t),
        blend(bg, fg, t),
        blend(bb, fb, t),
    )
}

fn blend(from: u8, to: u8, t: f32) -> u8 {
    (from as f32 + (to as f32 - from as f32) * t).round() as u8
}

fn rgb_channels(color: Color) -> (u8, u8, u8) {
    match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0, 0, 0),
        Color::White => (255, 255, 255),
        // Chrome palette is all Rgb; anything else degrades to grey.
        _ => (128, 128, 128),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrollConfig;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct RecordingSurface {
        calls: Vec<(f32, bool)>,
    }

    impl ScrollSurface for RecordingSurface {
        fn scroll_to(&mut self, offset: f32, animated: bool) {
            self.calls.push((offset, animated));
        }
    }

    fn tracker_at(offset: f32) -> ScrollMetricsTracker {
        let mut tracker = ScrollMetricsTracker::new(&ScrollConfig::default());
        tracker.on_scroll(offset, Instant::now() + Duration::from_millis(100));
        tracker
    }

    #[test]
    fn header_and_filter_share_the_chrome_fade() {
        let controller = ChromeController::new();
        let plan = controller.plan(&tracker_at(100.0));
        assert_eq!(plan.header_opacity, plan.filter_opacity);
        assert!((plan.header_opacity - 0.5).abs() < 1e-6);
        assert!(plan.header_visible());
        assert!(!plan.top_button_visible());
    }

    #[test]
    fn chrome_hidden_and_button_absent_in_the_gap() {
        let controller = ChromeController::new();
        let plan = controller.plan(&tracker_at(250.0));
        assert_eq!(plan.header_opacity, 0.0);
        assert_eq!(plan.top_button_opacity, 0.0);
        assert!(!plan.header_visible());
        assert!(!plan.top_button_visible());
    }

    #[test]
    fn scroll_to_top_issues_animated_command() {
        let controller = ChromeController::new();
        let mut surface = RecordingSurface::default();
        controller.scroll_to_top(&mut surface);
        assert_eq!(surface.calls, vec![(0.0, true)]);
    }

    #[test]
    fn fade_blends_toward_background() {
        let fg = Color::Rgb(200, 100, 0);
        let bg = Color::Rgb(0, 0, 0);
        assert_eq!(fade(fg, bg, 1.0), fg);
        assert_eq!(fade(fg, bg, 0.0), bg);
        assert_eq!(fade(fg, bg, 0.5), Color::Rgb(100, 50, 0));
    }
}
