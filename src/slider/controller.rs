//! Carousel timing state machine
//!
//! Pure and clock-free: every input that can arm a timer takes the current
//! [`Instant`], pending timers are exposed through
//! [`SliderController::next_deadline`], and [`SliderController::advance`]
//! fires whatever is due. Outputs are returned as [`SliderEffect`]s for the
//! view to apply.
//!
//! | Phase | Input | Next phase |
//! |---|---|---|
//! | Idle | layout / foreground / items changed, autoplay allowed | Autoplaying |
//! | Autoplaying | autoplay tick (not last item, or looping) | Autoplaying |
//! | Autoplaying | autoplay tick on last item, not looping | Idle |
//! | any | touch start | UserDriven |
//! | UserDriven | touch end | Resuming |
//! | Resuming | resume delay elapsed / momentum end | Autoplaying or Idle |
//! | any | background / teardown | Idle |

use std::time::Duration;
use tokio::time::Instant;

/// Time between autoplay advances
pub const DEFAULT_AUTOPLAY_INTERVAL: Duration = Duration::from_millis(3000);
/// Idle time after a touch ends before autoplay resumes
pub const RESUME_DELAY: Duration = Duration::from_millis(1500);

/// Carousel geometry and behaviour
#[derive(Debug, Clone, PartialEq)]
pub struct SliderConfig {
    pub item_width: f64,
    pub item_spacing: f64,
    pub autoplay: bool,
    pub autoplay_interval: Duration,
    /// Wrap around at both ends instead of clamping
    pub loop_items: bool,
    pub resume_delay: Duration,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            item_width: 300.0,
            item_spacing: 16.0,
            autoplay: true,
            autoplay_interval: DEFAULT_AUTOPLAY_INTERVAL,
            loop_items: true,
            resume_delay: RESUME_DELAY,
        }
    }
}

impl SliderConfig {
    /// Distance between the starts of two adjacent items
    pub fn pitch(&self) -> f64 {
        self.item_width + self.item_spacing
    }
}

/// Observable carousel state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliderState {
    pub current_index: usize,
    pub is_user_interacting: bool,
    pub autoplay_enabled: bool,
}

/// Timer phase derived from state and pending timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderPhase {
    Idle,
    Autoplaying,
    UserDriven,
    Resuming,
}

/// Instruction for the view
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliderEffect {
    /// Scroll the surface so `index` is in front
    ScrollTo { index: usize, offset: f64 },
    /// The item in front changed
    SlideChanged(usize),
}

/// Host application visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycle {
    Active,
    Background,
}

/// Every input the controller understands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliderInput {
    /// The scroll surface finished its initial layout
    Layout,
    /// The backing item list was replaced
    SetItems(usize),
    GoTo(isize),
    TouchStart,
    TouchEnd,
    MomentumScrollEnd,
    /// Current horizontal offset of the surface
    Scroll(f64),
    Lifecycle(AppLifecycle),
}

/// Carousel timing controller
#[derive(Debug, Clone)]
pub struct SliderController {
    config: SliderConfig,
    item_count: usize,
    state: SliderState,
    layout_ready: bool,
    foreground: bool,
    autoplay_due: Option<Instant>,
    resume_due: Option<Instant>,
}

impl SliderController {
    pub fn new(config: SliderConfig, item_count: usize) -> Self {
        let state = SliderState {
            current_index: 0,
            is_user_interacting: false,
            autoplay_enabled: config.autoplay,
        };
        Self {
            config,
            item_count,
            state,
            layout_ready: false,
            foreground: true,
            autoplay_due: None,
            resume_due: None,
        }
    }

    pub fn config(&self) -> &SliderConfig {
        &self.config
    }

    pub fn state(&self) -> SliderState {
        self.state
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn phase(&self) -> SliderPhase {
        match (self.state.is_user_interacting, self.resume_due, self.autoplay_due) {
            (true, Some(_), _) => SliderPhase::Resuming,
            (true, None, _) => SliderPhase::UserDriven,
            (false, _, Some(_)) => SliderPhase::Autoplaying,
            (false, _, None) => SliderPhase::Idle,
        }
    }

    /// Earliest pending timer
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.resume_due, self.autoplay_due) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Dispatch a single input
    pub fn handle(&mut self, input: SliderInput, now: Instant) -> Vec<SliderEffect> {
        match input {
            SliderInput::Layout => self.on_layout(now),
            SliderInput::SetItems(count) => self.set_items(count, now),
            SliderInput::GoTo(index) => return self.go_to_slide(index),
            SliderInput::TouchStart => self.on_touch_start(),
            SliderInput::TouchEnd => self.on_touch_end(now),
            SliderInput::MomentumScrollEnd => self.on_momentum_scroll_end(now),
            SliderInput::Scroll(offset) => return self.on_scroll(offset),
            SliderInput::Lifecycle(lifecycle) => self.on_app_state(lifecycle, now),
        }
        Vec::new()
    }

    fn can_autoplay(&self) -> bool {
        self.state.autoplay_enabled
            && self.item_count > 1
            && !self.state.is_user_interacting
            && self.layout_ready
            && self.foreground
    }

    /// Cancel any pending tick and arm a new one if autoplay is allowed
    fn schedule_autoplay(&mut self, now: Instant) {
        self.autoplay_due = None;
        if self.can_autoplay() {
            self.autoplay_due = Some(now + self.config.autoplay_interval);
        }
    }

    fn cancel_timers(&mut self) {
        self.autoplay_due = None;
        self.resume_due = None;
    }

    /// Wrap (looping) or clamp an arbitrary index into the item range
    pub fn resolve_index(&self, index: isize) -> Option<usize> {
        if self.item_count == 0 {
            return None;
        }
        let count = self.item_count as isize;
        let resolved = if self.config.loop_items {
            index.rem_euclid(count)
        } else {
            index.clamp(0, count - 1)
        };
        Some(resolved as usize)
    }

    pub fn go_to_slide(&mut self, index: isize) -> Vec<SliderEffect> {
        let Some(index) = self.resolve_index(index) else {
            return Vec::new();
        };
        self.state.current_index = index;
        vec![
            SliderEffect::ScrollTo {
                index,
                offset: index as f64 * self.config.pitch(),
            },
            SliderEffect::SlideChanged(index),
        ]
    }

    pub fn on_layout(&mut self, now: Instant) {
        self.layout_ready = true;
        self.schedule_autoplay(now);
    }

    /// New backing list: back to the first item with fresh timers
    pub fn set_items(&mut self, count: usize, now: Instant) {
        self.item_count = count;
        self.state = SliderState {
            current_index: 0,
            is_user_interacting: false,
            autoplay_enabled: self.config.autoplay,
        };
        self.cancel_timers();
        self.schedule_autoplay(now);
    }

    /// Turn autoplay back on (or off), e.g. after a non-looping run halted
    pub fn set_autoplay(&mut self, enabled: bool, now: Instant) {
        self.state.autoplay_enabled = enabled;
        self.schedule_autoplay(now);
    }

    pub fn on_touch_start(&mut self) {
        self.state.is_user_interacting = true;
        self.cancel_timers();
    }

    pub fn on_touch_end(&mut self, now: Instant) {
        self.autoplay_due = None;
        self.resume_due = Some(now + self.config.resume_delay);
    }

    pub fn on_momentum_scroll_end(&mut self, now: Instant) {
        if !self.state.is_user_interacting {
            return;
        }
        self.resume_due = None;
        self.state.is_user_interacting = false;
        self.schedule_autoplay(now);
    }

    /// Track the surface offset and report the item that is now in front
    pub fn on_scroll(&mut self, offset: f64) -> Vec<SliderEffect> {
        let pitch = self.config.pitch();
        if !offset.is_finite() || pitch <= 0.0 || self.item_count == 0 {
            return Vec::new();
        }
        let nearest = (offset / pitch).round();
        if nearest < 0.0 || nearest >= self.item_count as f64 {
            return Vec::new();
        }
        let nearest = nearest as usize;
        if nearest == self.state.current_index {
            return Vec::new();
        }
        self.state.current_index = nearest;
        vec![SliderEffect::SlideChanged(nearest)]
    }

    /// Backgrounding drops timers and any gesture; returning re-arms autoplay
    pub fn on_app_state(&mut self, lifecycle: AppLifecycle, now: Instant) {
        match lifecycle {
            AppLifecycle::Background => {
                self.foreground = false;
                self.state.is_user_interacting = false;
                self.cancel_timers();
            }
            AppLifecycle::Active => {
                self.foreground = true;
                self.schedule_autoplay(now);
            }
        }
    }

    /// Fire every timer due at `now`
    pub fn advance(&mut self, now: Instant) -> Vec<SliderEffect> {
        if self.resume_due.is_some_and(|due| due <= now) {
            self.resume_due = None;
            self.state.is_user_interacting = false;
            self.schedule_autoplay(now);
        }

        if !self.autoplay_due.is_some_and(|due| due <= now) {
            return Vec::new();
        }
        self.autoplay_due = None;

        let last = self.item_count.saturating_sub(1);
        let effects = if self.state.current_index < last {
            self.go_to_slide(self.state.current_index as isize + 1)
        } else if self.config.loop_items {
            self.go_to_slide(0)
        } else {
            tracing::debug!(index = self.state.current_index, "Autoplay reached last item, halting");
            self.state.autoplay_enabled = false;
            Vec::new()
        };

        self.schedule_autoplay(now);
        effects
    }

    /// Unmount: cancel everything and wait for a fresh layout
    pub fn teardown(&mut self) {
        self.cancel_timers();
        self.layout_ready = false;
    }
}
