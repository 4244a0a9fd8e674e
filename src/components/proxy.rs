//! Validated, caller-facing operations layered over [`CoreEngine`].
//!
//! Binding goes through [`ConfigStore`] before it reaches the plugin, and a
//! rejected bind always surfaces as [`FacadeError::BindFailed`]. The find
//! helpers are bounded polling loops: they return once the target is seen
//! (or gone, for the `*_until_gone` variants) or the timeout elapses.

use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};

use super::{CoreEngine, Region};
use crate::config::{BindConfig, BindOverrides, ConfigStore, STATUS_OK};
use crate::dispatch::{not_found, Args, Dispatch};
use crate::error::{FacadeError, Result};
use crate::plugin;
use crate::timing::{self, Deadline};

/// Result of a find helper. Coordinates are the last place the target was seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FindOutcome {
    pub found: bool,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy)]
struct FindAction {
    click: bool,
    reset_pos: bool,
    until_gone: bool,
}

impl FindAction {
    const LOCATE: FindAction = FindAction {
        click: false,
        reset_pos: false,
        until_gone: false,
    };

    fn click(reset_pos: bool) -> Self {
        Self {
            click: true,
            reset_pos,
            until_gone: false,
        }
    }

    fn click_until_gone(reset_pos: bool) -> Self {
        Self {
            click: true,
            reset_pos,
            until_gone: true,
        }
    }
}

pub struct HighLevelProxy {
    core: Rc<CoreEngine>,
    config: ConfigStore,
    bound: Cell<Option<i32>>,
    poll: (Duration, Duration),
}

impl HighLevelProxy {
    pub fn new(core: Rc<CoreEngine>, config: ConfigStore) -> Self {
        Self {
            core,
            config,
            bound: Cell::new(None),
            poll: (Duration::from_millis(50), Duration::from_millis(400)),
        }
    }

    /// Bounds of the randomised pause between polling attempts.
    pub fn with_poll_interval(mut self, min: Duration, max: Duration) -> Self {
        self.poll = (min, max);
        self
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    // ============ Binding ============

    /// Bind to `hwnd` with `overrides` merged onto the default bind
    /// configuration. Binding another handle supersedes the current one
    /// without unbinding it first.
    pub fn bind_window(&self, hwnd: i32, overrides: &BindOverrides) -> Result<BindConfig> {
        if hwnd == 0 {
            return Err(FacadeError::InvalidHandle(hwnd));
        }

        let config = self.config.get_bind_config(overrides)?;
        let status = self.core.bind_window(hwnd, &config)?;
        if status != STATUS_OK {
            return Err(FacadeError::BindFailed {
                hwnd,
                status,
                message: self.config.describe_error_code(status),
                config,
            });
        }

        if let Some(previous) = self.bound.replace(Some(hwnd)) {
            if previous != hwnd {
                tracing::debug!("Binding to {} supersedes binding to {}", hwnd, previous);
            }
        }
        tracing::info!("Bound window {} ({})", hwnd, config);
        Ok(config)
    }

    /// Release the current binding. Returns `false` if nothing was bound.
    pub fn unbind_window(&self) -> Result<bool> {
        let Some(hwnd) = self.bound.take() else {
            return Ok(false);
        };

        let status = self.core.unbind_window()?;
        if status != STATUS_OK {
            tracing::warn!(
                "Unbinding window {} returned status {} ({})",
                hwnd,
                status,
                self.config.describe_error_code(status)
            );
        } else {
            tracing::info!("Unbound window {}", hwnd);
        }
        Ok(true)
    }

    pub fn bound_handle(&self) -> Option<i32> {
        self.bound.get()
    }

    pub fn is_bound(&self) -> bool {
        self.bound.get().is_some()
    }

    /// Title of the bound window, or `None` when nothing is bound.
    pub fn window_title(&self) -> Result<Option<String>> {
        self.bound
            .get()
            .map(|hwnd| self.core.get_window_title(hwnd))
            .transpose()
    }

    // ============ Text & picture search ============

    pub fn find_text(
        &self,
        region: Region,
        text: &str,
        color: &str,
        timeout: Duration,
    ) -> Result<FindOutcome> {
        self.find_and_act(timeout, FindAction::LOCATE, || self.search_text(region, text, color))
    }

    pub fn find_text_click(
        &self,
        region: Region,
        text: &str,
        color: &str,
        timeout: Duration,
        reset_pos: bool,
    ) -> Result<FindOutcome> {
        self.find_and_act(timeout, FindAction::click(reset_pos), || {
            self.search_text(region, text, color)
        })
    }

    /// Keep clicking the text until it disappears or `timeout` elapses.
    pub fn find_text_click_until_gone(
        &self,
        region: Region,
        text: &str,
        color: &str,
        timeout: Duration,
        reset_pos: bool,
    ) -> Result<FindOutcome> {
        self.find_and_act(timeout, FindAction::click_until_gone(reset_pos), || {
            self.search_text(region, text, color)
        })
    }

    pub fn find_pic(
        &self,
        region: Region,
        pic_name: &str,
        timeout: Duration,
        dir: i32,
    ) -> Result<FindOutcome> {
        self.find_and_act(timeout, FindAction::LOCATE, || {
            self.search_pic(region, pic_name, dir)
        })
    }

    pub fn find_pic_click(
        &self,
        region: Region,
        pic_name: &str,
        timeout: Duration,
        dir: i32,
        reset_pos: bool,
    ) -> Result<FindOutcome> {
        self.find_and_act(timeout, FindAction::click(reset_pos), || {
            self.search_pic(region, pic_name, dir)
        })
    }

    pub fn find_pic_click_until_gone(
        &self,
        region: Region,
        pic_name: &str,
        timeout: Duration,
        dir: i32,
        reset_pos: bool,
    ) -> Result<FindOutcome> {
        self.find_and_act(timeout, FindAction::click_until_gone(reset_pos), || {
            self.search_pic(region, pic_name, dir)
        })
    }

    /// Recognise text in `region`, retrying until something is read or `timeout` elapses.
    pub fn ocr(
        &self,
        region: Region,
        color: &str,
        sim: Option<f64>,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let sim = sim.unwrap_or(self.config.timing.similarity);
        timing::poll_until(timeout, timing::jitter(self.poll.0, self.poll.1), || {
            let text = self.core.ocr(region, color, sim)?;
            Ok::<_, FacadeError>((!text.is_empty()).then_some(text))
        })
    }

    fn search_text(&self, region: Region, text: &str, color: &str) -> Result<String> {
        self.core
            .find_str_e(region, text, color, self.config.timing.similarity)
    }

    fn search_pic(&self, region: Region, pic_name: &str, dir: i32) -> Result<String> {
        self.core
            .find_pic_e(region, pic_name, "000000", self.config.timing.similarity, dir)
    }

    fn find_and_act(
        &self,
        timeout: Duration,
        action: FindAction,
        search: impl Fn() -> Result<String>,
    ) -> Result<FindOutcome> {
        let deadline = Deadline::new(timeout);
        let mut outcome = FindOutcome::default();

        loop {
            let (x, y) = parse_find_result(&search()?);
            if x > 0 && y > 0 {
                outcome = FindOutcome { found: true, x, y };
                if action.click {
                    self.click_at(x, y, action.reset_pos)?;
                }
                if !action.until_gone {
                    break;
                }
            } else if action.until_gone {
                break;
            }

            if deadline.expired() {
                break;
            }
            deadline.sleep(timing::jitter(self.poll.0, self.poll.1));
        }
        Ok(outcome)
    }

    fn click_at(&self, x: i32, y: i32, reset_pos: bool) -> Result<()> {
        let raw = self.core.plugin();
        plugin::call_int(raw, "MoveTo", &[json!(x), json!(y)])?;
        plugin::call_int(raw, "LeftClick", &[])?;
        if reset_pos {
            let mut rng = rand::thread_rng();
            plugin::call_int(
                raw,
                "MoveTo",
                &[
                    json!(x + rng.gen_range(50..=300)),
                    json!(y + rng.gen_range(50..=300)),
                ],
            )?;
        }
        Ok(())
    }

    // ============ Cursor-shape search ============

    /// Sweep outward in circles from `(x, y)` until the cursor takes `shape`,
    /// then click. Returns whether the shape was found.
    pub fn circle_search_cursor(
        &self,
        x: i32,
        y: i32,
        shape: &str,
        radius: f64,
        step: f64,
        max_circles: u32,
    ) -> Result<bool> {
        self.ellipse_search_cursor(x, y, shape, (radius, radius), step, max_circles)
    }

    /// Like [`circle_search_cursor`](Self::circle_search_cursor) with separate
    /// horizontal and vertical radii, both growing by `step`.
    pub fn ellipse_search_cursor(
        &self,
        x: i32,
        y: i32,
        shape: &str,
        radii: (f64, f64),
        step: f64,
        max_circles: u32,
    ) -> Result<bool> {
        let (mut rx, mut ry) = radii;
        for _ in 0..max_circles {
            for angle in (0..360).step_by(10) {
                let rad = f64::from(angle).to_radians();
                let px = x + (rx * rad.cos()).round() as i32;
                let py = y + (ry * rad.sin()).round() as i32;
                if self.probe_cursor(px, py, shape)? {
                    return Ok(true);
                }
                if angle % 20 == 0 {
                    rx += step;
                    ry += step;
                }
                thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(false)
    }

    /// Follow an involute-like spiral (`r` growing by `step` per probe),
    /// which scatters probes less regularly than the circle sweep.
    pub fn scatter_search_cursor(
        &self,
        x: i32,
        y: i32,
        shape: &str,
        radius: f64,
        step: f64,
        max_iterations: u32,
    ) -> Result<bool> {
        let mut r = radius;
        for _ in 0..max_iterations {
            let px = x + (r.cos() + r * r.sin()).round() as i32;
            let py = y + (r.sin() - r * r.cos()).round() as i32;
            if self.probe_cursor(px, py, shape)? {
                return Ok(true);
            }
            r += step;
            thread::sleep(Duration::from_millis(1));
        }
        Ok(false)
    }

    /// Walk an expanding square spiral from `(x, y)` until the cursor takes `shape`.
    pub fn square_search_cursor(
        &self,
        x: i32,
        y: i32,
        shape: &str,
        step: i32,
        max_circles: u32,
    ) -> Result<bool> {
        let (mut px, mut py) = (x, y);
        let mut m = 0;
        for _ in 0..max_circles {
            let legs = [(step, 0, m), (0, -step, m + 6), (-step, 0, m + 1), (0, step, m + 7)];
            for (dx, dy, count) in legs {
                for _ in 0..count {
                    px += dx;
                    py += dy;
                    if self.probe_cursor(px, py, shape)? {
                        return Ok(true);
                    }
                }
            }
            m += 2;
            thread::sleep(Duration::from_millis(1));
        }
        Ok(false)
    }

    fn probe_cursor(&self, x: i32, y: i32, shape: &str) -> Result<bool> {
        let raw = self.core.plugin();
        plugin::call_int(raw, "MoveTo", &[json!(x), json!(y)])?;
        if plugin::call_string(raw, "GetCursorShape", &[])? == shape {
            plugin::call_int(raw, "LeftClick", &[])?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Parse the plugin's `"index|x|y"` search answer. Anything that is not a
/// non-negative coordinate pair reads as `(0, 0)`, i.e. not found.
pub(crate) fn parse_find_result(raw: &str) -> (i32, i32) {
    let coord = |part: Option<&str>| -> Option<i32> {
        let part = part?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse().ok()
    };

    let mut parts = raw.split('|').skip(1);
    match (coord(parts.next()), coord(parts.next())) {
        (Some(x), Some(y)) => (x, y),
        (Some(x), None) => (x, 0),
        _ => (0, 0),
    }
}

const METHODS: &[&str] = &[
    "BindWindow",
    "UnBindWindow",
    "IsBound",
    "BoundWindowTitle",
    "FindText",
    "FindTextClick",
    "FindTextClickUntilGone",
    "FindPicture",
    "FindPictureClick",
    "FindPictureClickUntilGone",
    "OcrText",
    "CircleSearchCursor",
    "EllipseSearchCursor",
    "ScatterSearchCursor",
    "SquareSearchCursor",
];

impl Dispatch for HighLevelProxy {
    fn component(&self) -> &'static str {
        "HighLevelProxy"
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        let a = Args::new(method, args);
        let region = || -> Result<Region> {
            Ok(Region::new(a.int(0)?, a.int(1)?, a.int(2)?, a.int(3)?))
        };
        let seconds = |index| a.seconds_or(index, 0.0);

        let value = match method {
            "BindWindow" => {
                let overrides = BindOverrides {
                    display: a.optional_string(1)?.map(str::to_string),
                    mouse: a.optional_string(2)?.map(str::to_string),
                    keypad: a.optional_string(3)?.map(str::to_string),
                    public: a.optional_string(4)?.map(str::to_string),
                    mode: a.optional_int(5)?,
                };
                json!(self.bind_window(a.int(0)?, &overrides)?)
            }
            "UnBindWindow" => json!(self.unbind_window()?),
            "IsBound" => json!(self.is_bound()),
            "BoundWindowTitle" => json!(self.window_title()?),
            "FindText" => json!(self.find_text(
                region()?,
                a.string(4)?,
                a.string(5)?,
                seconds(6)?
            )?),
            "FindTextClick" => json!(self.find_text_click(
                region()?,
                a.string(4)?,
                a.string(5)?,
                seconds(6)?,
                a.bool_or(7, false)?
            )?),
            "FindTextClickUntilGone" => json!(self.find_text_click_until_gone(
                region()?,
                a.string(4)?,
                a.string(5)?,
                seconds(6)?,
                a.bool_or(7, false)?
            )?),
            "FindPicture" => json!(self.find_pic(
                region()?,
                a.string(4)?,
                seconds(5)?,
                a.int_or(6, 0)?
            )?),
            "FindPictureClick" => json!(self.find_pic_click(
                region()?,
                a.string(4)?,
                seconds(5)?,
                a.int_or(6, 0)?,
                a.bool_or(7, false)?
            )?),
            "FindPictureClickUntilGone" => json!(self.find_pic_click_until_gone(
                region()?,
                a.string(4)?,
                seconds(5)?,
                a.int_or(6, 0)?,
                a.bool_or(7, false)?
            )?),
            "OcrText" => {
                let sim = match args.get(5) {
                    None | Some(Value::Null) => None,
                    Some(_) => Some(a.float_or(5, self.config.timing.similarity)?),
                };
                json!(self.ocr(region()?, a.string(4)?, sim, seconds(6)?)?)
            }
            "CircleSearchCursor" => json!(self.circle_search_cursor(
                a.int(0)?,
                a.int(1)?,
                a.string(2)?,
                a.float_or(3, 1.0)?,
                a.float_or(4, 1.0)?,
                a.int_or(5, 6)?.max(0) as u32
            )?),
            "EllipseSearchCursor" => json!(self.ellipse_search_cursor(
                a.int(0)?,
                a.int(1)?,
                a.string(2)?,
                (a.float_or(3, 0.5)?, a.float_or(4, 8.0)?),
                a.float_or(5, 0.5)?,
                a.int_or(6, 6)?.max(0) as u32
            )?),
            "ScatterSearchCursor" => json!(self.scatter_search_cursor(
                a.int(0)?,
                a.int(1)?,
                a.string(2)?,
                a.float_or(3, 2.0)?,
                a.float_or(4, 0.6)?,
                a.int_or(5, 80)?.max(0) as u32
            )?),
            "SquareSearchCursor" => json!(self.square_search_cursor(
                a.int(0)?,
                a.int(1)?,
                a.string(2)?,
                a.int_or(3, 10)?,
                a.int_or(4, 6)?.max(0) as u32
            )?),
            _ => return Err(not_found(method)),
        };
        Ok(value)
    }
}
