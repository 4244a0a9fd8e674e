use std::rc::Rc;
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde_json::{json, Value};

use crate::dispatch::{not_found, Args, Dispatch};
use crate::error::Result;
use crate::plugin::{self, AutomationPlugin};
use crate::timing;

/// Cursor movement and mouse buttons.
pub struct MouseComponent {
    plugin: Rc<dyn AutomationPlugin>,
    mouse_delay: Duration,
    settle: (Duration, Duration),
}

impl MouseComponent {
    pub fn new(plugin: Rc<dyn AutomationPlugin>, mouse_delay: Duration) -> Self {
        Self {
            plugin,
            mouse_delay,
            settle: (Duration::from_millis(50), Duration::from_millis(400)),
        }
    }

    /// Bounds of the randomised pause [`safe_click`](Self::safe_click) takes after clicking.
    pub fn with_settle_delay(mut self, min: Duration, max: Duration) -> Self {
        self.settle = (min, max);
        self
    }

    fn int(&self, method: &str, args: &[Value]) -> Result<i32> {
        Ok(plugin::call_int(self.plugin.as_ref(), method, args)?)
    }

    pub fn move_to(&self, x: i32, y: i32) -> Result<i32> {
        self.int("MoveTo", &[json!(x), json!(y)])
    }

    /// Move relative to the current position.
    pub fn move_r(&self, dx: i32, dy: i32) -> Result<i32> {
        self.int("MoveR", &[json!(dx), json!(dy)])
    }

    /// Move to a random point inside the `w` x `h` rectangle at `(x, y)`.
    pub fn move_to_ex(&self, x: i32, y: i32, w: i32, h: i32) -> Result<i32> {
        self.int("MoveToEx", &[json!(x), json!(y), json!(w), json!(h)])
    }

    pub fn left_click(&self) -> Result<i32> {
        self.int("LeftClick", &[])
    }

    pub fn left_double_click(&self) -> Result<i32> {
        self.int("LeftDoubleClick", &[])
    }

    pub fn left_down(&self) -> Result<i32> {
        self.int("LeftDown", &[])
    }

    pub fn left_up(&self) -> Result<i32> {
        self.int("LeftUp", &[])
    }

    pub fn right_click(&self) -> Result<i32> {
        self.int("RightClick", &[])
    }

    pub fn right_down(&self) -> Result<i32> {
        self.int("RightDown", &[])
    }

    pub fn right_up(&self) -> Result<i32> {
        self.int("RightUp", &[])
    }

    pub fn middle_click(&self) -> Result<i32> {
        self.int("MiddleClick", &[])
    }

    pub fn wheel_up(&self) -> Result<i32> {
        self.int("WheelUp", &[])
    }

    pub fn wheel_down(&self) -> Result<i32> {
        self.int("WheelDown", &[])
    }

    pub fn get_cursor_pos(&self) -> Result<(i32, i32)> {
        let (_, x, y) =
            plugin::call_triple(self.plugin.as_ref(), "GetCursorPos", &[json!(0), json!(0)])?;
        Ok((x, y))
    }

    /// Signature string of the current cursor shape.
    pub fn get_cursor_shape(&self) -> Result<String> {
        Ok(plugin::call_string(self.plugin.as_ref(), "GetCursorShape", &[])?)
    }

    /// `kind` is one of the mouse bind modes; `None` uses the configured default delay.
    pub fn set_mouse_delay(&self, kind: &str, delay: Option<Duration>) -> Result<i32> {
        let delay = delay.unwrap_or(self.mouse_delay);
        self.int("SetMouseDelay", &[json!(kind), json!(delay.as_millis() as u64)])
    }

    /// Press the left button at `(x, y)` and hold it for `hold`.
    pub fn click_left_at(&self, x: i32, y: i32, hold: Duration) -> Result<()> {
        self.move_to(x, y)?;
        self.left_down()?;
        thread::sleep(hold);
        self.left_up()?;
        Ok(())
    }

    pub fn click_right_at(&self, x: i32, y: i32, hold: Duration) -> Result<()> {
        self.move_to(x, y)?;
        self.right_down()?;
        thread::sleep(hold);
        self.right_up()?;
        Ok(())
    }

    /// Click at `(x, y)` and pause for a random settle delay. With
    /// `reset_pos` the cursor is then moved to a random offset from where it
    /// started so it does not linger over the target.
    pub fn safe_click(&self, x: i32, y: i32, reset_pos: bool) -> Result<()> {
        let (x0, y0) = self.get_cursor_pos()?;
        self.move_to(x, y)?;
        self.left_click()?;
        thread::sleep(timing::jitter(self.settle.0, self.settle.1));

        if reset_pos {
            let mut rng = rand::thread_rng();
            self.move_to(x0 + rng.gen_range(50..=300), y0 + rng.gen_range(50..=300))?;
        }
        Ok(())
    }
}

const METHODS: &[&str] = &[
    "MoveTo",
    "MoveR",
    "MoveToEx",
    "LeftClick",
    "LeftDoubleClick",
    "LeftDown",
    "LeftUp",
    "RightClick",
    "RightDown",
    "RightUp",
    "MiddleClick",
    "WheelUp",
    "WheelDown",
    "GetCursorPos",
    "GetCursorShape",
    "SetMouseDelay",
    "ClickLeftAt",
    "ClickRightAt",
    "SafeClick",
];

impl Dispatch for MouseComponent {
    fn component(&self) -> &'static str {
        "MouseComponent"
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        let a = Args::new(method, args);
        let hold = |index| a.seconds_or(index, 0.5);

        let value = match method {
            "MoveTo" => json!(self.move_to(a.int(0)?, a.int(1)?)?),
            "MoveR" => json!(self.move_r(a.int(0)?, a.int(1)?)?),
            "MoveToEx" => json!(self.move_to_ex(a.int(0)?, a.int(1)?, a.int(2)?, a.int(3)?)?),
            "LeftClick" => json!(self.left_click()?),
            "LeftDoubleClick" => json!(self.left_double_click()?),
            "LeftDown" => json!(self.left_down()?),
            "LeftUp" => json!(self.left_up()?),
            "RightClick" => json!(self.right_click()?),
            "RightDown" => json!(self.right_down()?),
            "RightUp" => json!(self.right_up()?),
            "MiddleClick" => json!(self.middle_click()?),
            "WheelUp" => json!(self.wheel_up()?),
            "WheelDown" => json!(self.wheel_down()?),
            "GetCursorPos" => json!(self.get_cursor_pos()?),
            "GetCursorShape" => json!(self.get_cursor_shape()?),
            "SetMouseDelay" => {
                let delay = a
                    .optional_int(1)?
                    .map(|ms| Duration::from_millis(ms.max(0) as u64));
                json!(self.set_mouse_delay(a.string_or(0, "dx")?, delay)?)
            }
            "ClickLeftAt" => {
                self.click_left_at(a.int(0)?, a.int(1)?, hold(2)?)?;
                json!(1)
            }
            "ClickRightAt" => {
                self.click_right_at(a.int(0)?, a.int(1)?, hold(2)?)?;
                json!(1)
            }
            "SafeClick" => {
                self.safe_click(a.int(0)?, a.int(1)?, a.bool_or(2, false)?)?;
                json!(1)
            }
            _ => return Err(not_found(method)),
        };
        Ok(value)
    }
}
