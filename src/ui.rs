use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseEvent, MouseEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::{Frame, Terminal};
use textwrap::wrap;
use unicode_width::UnicodeWidthStr;

use crate::chrome::{fade, ChromeController, ChromePlan, ScrollSurface};
use crate::comments::{CommentThreadLoader, ThreadPhase};
use crate::config::UiConfig;
use crate::data::CommentService;
use crate::feed::Post;
use crate::scroll::ScrollMetricsTracker;
use crate::toggle::{ControlKind, PulsePhase, ToggleArena};

const COLOR_BG: Color = Color::Rgb(4, 6, 7);
const COLOR_CHROME_BG: Color = Color::Rgb(21, 21, 21);
const COLOR_BORDER: Color = Color::Rgb(38, 42, 46);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(140, 148, 162);
const COLOR_ACCENT: Color = Color::Rgb(22, 255, 0);
const COLOR_LIKE: Color = Color::Rgb(55, 83, 136);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

/// One terminal row of feed content corresponds to this many scroll units,
/// keeping the chrome thresholds in the point scale they were tuned for.
const UNITS_PER_ROW: f32 = 20.0;

const SCROLL_TO_TOP_DURATION: Duration = Duration::from_millis(300);

const FILTER_SLIDE_DURATION: Duration = Duration::from_millis(100);

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

struct ScrollAnimation {
    from: f32,
    to: f32,
    started: Instant,
    duration: Duration,
}

/// The scrollable feed surface. Wheel and key scrolling move it directly;
/// chrome moves it through `ScrollSurface`, and its animated motion feeds
/// offsets back into the metrics tracker one tick at a time.
struct FeedViewport {
    offset: f32,
    max_offset: f32,
    animation: Option<ScrollAnimation>,
}

impl FeedViewport {
    fn new() -> Self {
        Self {
            offset: 0.0,
            max_offset: 0.0,
            animation: None,
        }
    }

    fn scroll_by(&mut self, delta: f32) -> f32 {
        self.animation = None;
        self.offset = (self.offset + delta).clamp(0.0, self.max_offset);
        self.offset
    }

    fn set_max_offset(&mut self, max: f32) {
        self.max_offset = max.max(0.0);
        self.offset = self.offset.clamp(0.0, self.max_offset);
    }

    /// Advance an animated scroll, if one is running. Returns the new offset
    /// so the caller can publish it as a scroll event.
    fn tick(&mut self, now: Instant) -> Option<f32> {
        let animation = self.animation.as_ref()?;
        let t = if animation.duration.is_zero() {
            1.0
        } else {
            (now.duration_since(animation.started).as_secs_f32()
                / animation.duration.as_secs_f32())
            .clamp(0.0, 1.0)
        };
        let eased = 1.0 - (1.0 - t).powi(3);
        self.offset = animation.from + (animation.to - animation.from) * eased;
        if t >= 1.0 {
            self.offset = animation.to;
            self.animation = None;
        }
        Some(self.offset)
    }

    fn skip_rows(&self) -> u16 {
        (self.offset / UNITS_PER_ROW).round().clamp(0.0, u16::MAX as f32) as u16
    }
}

impl ScrollSurface for FeedViewport {
    fn scroll_to(&mut self, offset: f32, animated: bool) {
        let target = offset.clamp(0.0, self.max_offset);
        if animated {
            self.animation = Some(ScrollAnimation {
                from: self.offset,
                to: target,
                started: Instant::now(),
                duration: SCROLL_TO_TOP_DURATION,
            });
        } else {
            self.offset = target;
            self.animation = None;
        }
    }
}

pub struct Options {
    pub status_message: String,
    pub posts: Vec<Post>,
    pub comment_service: Arc<dyn CommentService>,
    pub config: UiConfig,
}

pub struct Model {
    status_message: String,
    posts: Vec<Post>,
    selected_post: usize,
    tracker: ScrollMetricsTracker,
    toggles: ToggleArena,
    loader: CommentThreadLoader,
    chrome: ChromeController,
    viewport: FeedViewport,
    filter_open: bool,
    filter_opened_at: Instant,
    wheel_step: f32,
    tick_interval: Duration,
    spinner: Spinner,
    needs_redraw: bool,
}

impl Model {
    pub fn new(options: Options) -> Self {
        Self {
            status_message: options.status_message,
            posts: options.posts,
            selected_post: 0,
            tracker: ScrollMetricsTracker::new(&options.config.scroll),
            toggles: ToggleArena::new(options.config.pulse.clone()),
            loader: CommentThreadLoader::new(options.comment_service),
            chrome: ChromeController::new(),
            viewport: FeedViewport::new(),
            filter_open: false,
            filter_opened_at: Instant::now(),
            wheel_step: options.config.scroll.wheel_step,
            tick_interval: options.config.tick_interval,
            spinner: Spinner::new(),
            needs_redraw: true,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            if self.pump(Instant::now()) {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = self
                .tick_interval
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Mouse(mouse) => {
                        self.handle_mouse(mouse);
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_interval {
                last_tick = Instant::now();
                if self.loader.any_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    /// Drain worker results and advance every animation clock. Returns true
    /// when anything visible changed.
    fn pump(&mut self, now: Instant) -> bool {
        let mut changed = self.loader.poll();
        if let Some(offset) = self.viewport.tick(now) {
            self.tracker.on_scroll(offset, now);
            changed = true;
        }
        if self.tracker.tick(now) {
            changed = true;
        }
        if self.toggles.tick_all(now) {
            changed = true;
        }
        if self.filter_open && self.filter_slide(now) < 1.0 {
            changed = true;
        }
        changed
    }

    /// Progress of the filter overlay's slide-in, 0.0 at open to 1.0 settled.
    fn filter_slide(&self, now: Instant) -> f32 {
        let t = (now.duration_since(self.filter_opened_at).as_secs_f32()
            / FILTER_SLIDE_DURATION.as_secs_f32())
        .clamp(0.0, 1.0);
        1.0 - (1.0 - t).powi(3)
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.filter_open {
            match code {
                KeyCode::Char('f') | KeyCode::Esc | KeyCode::Enter => {
                    self.filter_open = false;
                    self.mark_dirty();
                }
                KeyCode::Char('q') => return Ok(true),
                _ => {}
            }
            return Ok(false);
        }

        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('j') | KeyCode::Down => self.scroll_feed(self.wheel_step),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_feed(-self.wheel_step),
            KeyCode::Tab => self.select_next(),
            KeyCode::BackTab => self.select_previous(),
            KeyCode::Char('l') | KeyCode::Char(' ') => {
                if let Some(id) = self.selected_post_id() {
                    self.toggle_like(id);
                }
            }
            KeyCode::Char('c') | KeyCode::Enter => {
                if let Some(id) = self.selected_post_id() {
                    self.toggle_comments(id);
                }
            }
            KeyCode::Char('t') | KeyCode::Char('g') => self.scroll_to_top(),
            KeyCode::Char('f') => {
                if self.chrome.plan(&self.tracker).filter_visible() {
                    self.filter_open = true;
                    self.filter_opened_at = Instant::now();
                    self.mark_dirty();
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollDown => self.scroll_feed(self.wheel_step),
            MouseEventKind::ScrollUp => self.scroll_feed(-self.wheel_step),
            _ => {}
        }
    }

    fn scroll_feed(&mut self, delta: f32) {
        let offset = self.viewport.scroll_by(delta);
        self.tracker.on_scroll(offset, Instant::now());
        self.mark_dirty();
    }

    fn select_next(&mut self) {
        if !self.posts.is_empty() {
            self.selected_post = (self.selected_post + 1) % self.posts.len();
            self.mark_dirty();
        }
    }

    fn select_previous(&mut self) {
        if !self.posts.is_empty() {
            self.selected_post = self
                .selected_post
                .checked_sub(1)
                .unwrap_or(self.posts.len() - 1);
            self.mark_dirty();
        }
    }

    fn selected_post_id(&self) -> Option<i64> {
        self.posts.get(self.selected_post).map(|post| post.id)
    }

    /// Local-only tap feedback. The post's likes counter is presentational
    /// and does not change; the backend write path does not exist yet.
    fn toggle_like(&mut self, post_id: i64) {
        self.toggles
            .entry_mut(post_id, ControlKind::Like)
            .toggle(Instant::now());
        self.mark_dirty();
    }

    fn toggle_comments(&mut self, post_id: i64) {
        let active = self
            .toggles
            .entry_mut(post_id, ControlKind::CommentExpand)
            .toggle(Instant::now());
        self.loader.set_visible(post_id, active);
        if active {
            self.spinner.reset();
        }
        self.mark_dirty();
    }

    fn scroll_to_top(&mut self) {
        self.chrome.scroll_to_top(&mut self.viewport);
        self.mark_dirty();
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let plan = self.chrome.plan(&self.tracker);
        self.draw_chrome(frame, layout[0], &plan);
        self.draw_feed(frame, layout[1]);
        self.draw_top_button(frame, layout[1], &plan);
        self.draw_status(frame, layout[2]);

        if self.filter_open {
            self.draw_filter_overlay(frame, full);
        }
    }

    /// Header plus filter control, fading in lockstep with the chrome
    /// opacity. The band keeps its height so the feed never reflows; a fully
    /// faded chrome simply paints as background.
    fn draw_chrome(&self, frame: &mut Frame<'_>, area: Rect, plan: &ChromePlan) {
        if !plan.header_visible() {
            frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), area);
            return;
        }

        let bg = fade(COLOR_CHROME_BG, COLOR_BG, plan.header_opacity);
        let text = fade(COLOR_TEXT_PRIMARY, COLOR_BG, plan.header_opacity);
        let accent = fade(COLOR_ACCENT, COLOR_BG, plan.filter_opacity);

        let header = Paragraph::new(vec![
            Line::default(),
            Line::from(vec![Span::styled(
                " devfeed ",
                Style::default().fg(text).add_modifier(Modifier::BOLD),
            )]),
        ])
        .style(Style::default().bg(bg));
        frame.render_widget(header, area);

        if plan.filter_visible() {
            let label = " Filter [f] ";
            let width = UnicodeWidthStr::width(label) as u16;
            if area.width > width + 2 {
                let button = Rect {
                    x: area.x + area.width - width - 2,
                    y: area.y + 1,
                    width,
                    height: 1,
                };
                frame.render_widget(
                    Paragraph::new(label).style(
                        Style::default()
                            .fg(fade(Color::Black, COLOR_BG, plan.filter_opacity))
                            .bg(accent),
                    ),
                    button,
                );
            }
        }
    }

    fn draw_feed(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let width = area.width.saturating_sub(2) as usize;
        if width == 0 || area.height == 0 {
            return;
        }

        let mut lines: Vec<Line<'static>> = Vec::new();
        for index in 0..self.posts.len() {
            self.push_post_lines(index, width, &mut lines);
        }

        let total_rows = lines.len() as f32;
        let visible_rows = area.height as f32;
        self.viewport
            .set_max_offset((total_rows - visible_rows).max(0.0) * UNITS_PER_ROW);

        let feed = Paragraph::new(Text::from(lines))
            .style(Style::default().bg(COLOR_BG))
            .scroll((self.viewport.skip_rows(), 0));
        frame.render_widget(feed, area);
    }

    /// One post cell: author line, wrapped body, like control, comment
    /// control, and the thread area while expanded.
    fn push_post_lines(&self, index: usize, width: usize, lines: &mut Vec<Line<'static>>) {
        let Some(post) = self.posts.get(index) else {
            return;
        };
        let now = Instant::now();
        let selected = index == self.selected_post;

        let marker = if selected { "▌ " } else { "  " };
        let marker_style = Style::default().fg(COLOR_ACCENT);
        lines.push(Line::from(vec![
            Span::styled(marker.to_string(), marker_style),
            Span::styled(
                format!("user {} · project {}", post.user, post.project),
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));

        for wrapped in wrap(&post.content, width.saturating_sub(2).max(8)) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(
                    wrapped.into_owned(),
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                ),
            ]));
        }

        let like = self.toggles.get(post.id, ControlKind::Like);
        let like_active = like.map(|a| a.active()).unwrap_or(false);
        let like_glyph = if like_active { "●" } else { "○" };
        let like_style = control_style(
            COLOR_LIKE,
            like.map(|a| a.phase()).unwrap_or(PulsePhase::Idle),
            like.map(|a| a.scale(now)).unwrap_or(1.0),
        );
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{like_glyph} {}", post.likes), like_style),
            Span::styled(
                format!("  {}", format_timestamp(post.created_on)),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
        ]));

        let expand = self.toggles.get(post.id, ControlKind::CommentExpand);
        let expanded = self.loader.is_visible(post.id);
        let expand_glyph = if expanded { "▾" } else { "▸" };
        let expand_style = control_style(
            COLOR_TEXT_SECONDARY,
            expand.map(|a| a.phase()).unwrap_or(PulsePhase::Idle),
            expand.map(|a| a.scale(now)).unwrap_or(1.0),
        );
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(
                format!("{expand_glyph} comments ({})", post.comments.len()),
                expand_style,
            ),
        ]));

        if expanded {
            self.push_thread_lines(post.id, width, lines);
        }

        lines.push(Line::from(Span::styled(
            "─".repeat(width),
            Style::default().fg(COLOR_BORDER),
        )));
    }

    fn push_thread_lines(&self, post_id: i64, width: usize, lines: &mut Vec<Line<'static>>) {
        let Some(state) = self.loader.thread(post_id) else {
            return;
        };
        match &state.phase {
            ThreadPhase::Loading => {
                lines.push(Line::from(Span::styled(
                    format!("    {} Loading comments…", self.spinner.frame()),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                )));
            }
            ThreadPhase::Failed => {
                lines.push(Line::from(Span::styled(
                    "    No comments to show.".to_string(),
                    Style::default().fg(COLOR_ERROR),
                )));
            }
            ThreadPhase::Loaded(comments) if comments.is_empty() => {
                lines.push(Line::from(Span::styled(
                    "    No comments yet.".to_string(),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                )));
            }
            ThreadPhase::Loaded(comments) => {
                for comment in comments {
                    let prefix = format!("    └ user {}: ", comment.user);
                    let indent = " ".repeat(UnicodeWidthStr::width(prefix.as_str()));
                    let body_width = width.saturating_sub(indent.len()).max(8);
                    for (i, wrapped) in wrap(&comment.content, body_width).iter().enumerate() {
                        let lead = if i == 0 { prefix.clone() } else { indent.clone() };
                        lines.push(Line::from(vec![
                            Span::styled(lead, Style::default().fg(COLOR_TEXT_SECONDARY)),
                            Span::styled(
                                wrapped.to_string(),
                                Style::default().fg(COLOR_TEXT_PRIMARY),
                            ),
                        ]));
                    }
                }
            }
        }
    }

    fn draw_top_button(&self, frame: &mut Frame<'_>, area: Rect, plan: &ChromePlan) {
        if !plan.top_button_visible() {
            return;
        }
        let label = " ↑ top ";
        let width = UnicodeWidthStr::width(label) as u16;
        if area.width <= width + 2 || area.height < 2 {
            return;
        }
        let button = Rect {
            x: area.x + area.width - width - 2,
            y: area.y + area.height - 2,
            width,
            height: 1,
        };
        frame.render_widget(
            Paragraph::new(label).style(
                Style::default()
                    .fg(fade(Color::Black, COLOR_BG, plan.top_button_opacity))
                    .bg(fade(COLOR_ACCENT, COLOR_BG, plan.top_button_opacity)),
            ),
            button,
        );
    }

    fn draw_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut spans = vec![Span::styled(
            format!(" {}", self.status_message),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )];
        if self.loader.any_loading() {
            spans.push(Span::styled(
                format!("  {}", self.spinner.frame()),
                Style::default().fg(COLOR_ACCENT),
            ));
        }
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(COLOR_CHROME_BG)),
            area,
        );
    }

    /// The overlay slides down from the top edge into its centered resting
    /// position while `filter_slide` runs, then holds there.
    fn draw_filter_overlay(&self, frame: &mut Frame<'_>, full: Rect) {
        let width = full.width.min(40);
        let height = full.height.min(7);
        let rest_y = (full.height - height) / 2;
        let slide_y = (self.filter_slide(Instant::now()) * rest_y as f32).round() as u16;
        let overlay = Rect {
            x: full.x + (full.width - width) / 2,
            y: full.y + slide_y.min(rest_y),
            width,
            height,
        };
        frame.render_widget(Clear, overlay);
        let body = Paragraph::new(vec![
            Line::default(),
            Line::from(Span::styled(
                "Filter options",
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled(
                "Press f or Esc to close",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_ACCENT))
                .style(Style::default().bg(COLOR_CHROME_BG)),
        );
        frame.render_widget(body, overlay);
    }
}

fn control_style(base: Color, phase: PulsePhase, scale: f32) -> Style {
    let mut style = Style::default().fg(base);
    // The terminal cannot scale glyphs; an active pulse renders as a
    // brightness bump proportional to the scale overshoot.
    if phase != PulsePhase::Idle {
        let boost = ((scale - 1.0) * 5.0).clamp(0.0, 1.0);
        style = style
            .fg(fade(base, COLOR_ACCENT, boost))
            .add_modifier(Modifier::BOLD);
    }
    style
}

/// Locale-style long form: abbreviated weekday and month, 12-hour clock.
/// A missing timestamp fails soft to a placeholder.
pub fn format_timestamp(instant: Option<DateTime<Utc>>) -> String {
    match instant {
        Some(instant) => instant.format("%a, %b %-d, %Y, %-I:%M %p").to_string(),
        None => "unknown date".to_string(),
    }
}
