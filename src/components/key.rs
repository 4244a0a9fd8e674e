use std::rc::Rc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::dispatch::{not_found, Args, Dispatch};
use crate::error::{FacadeError, Result};
use crate::plugin::{self, AutomationPlugin};
use crate::timing;

/// Keyboard injection through the plugin.
pub struct KeyComponent {
    plugin: Rc<dyn AutomationPlugin>,
    keyboard_delay: Duration,
    poll_interval: Duration,
}

impl KeyComponent {
    pub fn new(plugin: Rc<dyn AutomationPlugin>, keyboard_delay: Duration) -> Self {
        Self {
            plugin,
            keyboard_delay,
            poll_interval: Duration::from_millis(20),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn int(&self, method: &str, args: &[Value]) -> Result<i32> {
        Ok(plugin::call_int(self.plugin.as_ref(), method, args)?)
    }

    /// Whether the key is currently held down.
    pub fn get_key_state(&self, vk_code: i32) -> Result<bool> {
        Ok(self.int("GetKeyState", &[json!(vk_code)])? == 1)
    }

    pub fn key_down(&self, vk_code: i32) -> Result<i32> {
        self.int("KeyDown", &[json!(vk_code)])
    }

    pub fn key_up(&self, vk_code: i32) -> Result<i32> {
        self.int("KeyUp", &[json!(vk_code)])
    }

    pub fn key_press(&self, vk_code: i32) -> Result<i32> {
        self.int("KeyPress", &[json!(vk_code)])
    }

    pub fn key_down_char(&self, key: &str) -> Result<i32> {
        self.int("KeyDownChar", &[json!(key)])
    }

    pub fn key_up_char(&self, key: &str) -> Result<i32> {
        self.int("KeyUpChar", &[json!(key)])
    }

    pub fn key_press_char(&self, key: &str) -> Result<i32> {
        self.int("KeyPressChar", &[json!(key)])
    }

    /// Type a string, pausing `delay` between characters (default keyboard delay if `None`).
    pub fn key_press_str(&self, text: &str, delay: Option<Duration>) -> Result<i32> {
        let delay = delay.unwrap_or(self.keyboard_delay);
        self.int("KeyPressStr", &[json!(text), json!(delay.as_millis() as u64)])
    }

    /// `kind` is one of the keypad bind modes (`normal`, `windows`, `dx`).
    pub fn set_keypad_delay(&self, kind: &str, delay: Duration) -> Result<i32> {
        self.int("SetKeypadDelay", &[json!(kind), json!(delay.as_millis() as u64)])
    }

    /// Plugin-side blocking wait. `vk_code` 0 waits for any key; returns the
    /// key that was pressed, or 0 on timeout.
    pub fn wait_key(&self, vk_code: i32, timeout: Duration) -> Result<i32> {
        self.int("WaitKey", &[json!(vk_code), json!(timeout.as_millis() as u64)])
    }

    /// Poll until `vk_code` is held down. Returns `false` once `timeout` elapses.
    pub fn wait_for_key(&self, vk_code: i32, timeout: Duration) -> Result<bool> {
        let hit = timing::poll_until(timeout, self.poll_interval, || {
            Ok::<_, FacadeError>(self.get_key_state(vk_code)?.then_some(()))
        })?;
        Ok(hit.is_some())
    }
}

const METHODS: &[&str] = &[
    "GetKeyState",
    "KeyDown",
    "KeyUp",
    "KeyPress",
    "KeyDownChar",
    "KeyUpChar",
    "KeyPressChar",
    "KeyPressStr",
    "SetKeypadDelay",
    "WaitKey",
    "WaitForKey",
];

fn millis(value: i32) -> Duration {
    Duration::from_millis(value.max(0) as u64)
}

impl Dispatch for KeyComponent {
    fn component(&self) -> &'static str {
        "KeyComponent"
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        let a = Args::new(method, args);
        let value = match method {
            "GetKeyState" => json!(self.get_key_state(a.int(0)?)?),
            "KeyDown" => json!(self.key_down(a.int(0)?)?),
            "KeyUp" => json!(self.key_up(a.int(0)?)?),
            "KeyPress" => json!(self.key_press(a.int(0)?)?),
            "KeyDownChar" => json!(self.key_down_char(a.string(0)?)?),
            "KeyUpChar" => json!(self.key_up_char(a.string(0)?)?),
            "KeyPressChar" => json!(self.key_press_char(a.string(0)?)?),
            "KeyPressStr" => {
                json!(self.key_press_str(a.string(0)?, a.optional_int(1)?.map(millis))?)
            }
            "SetKeypadDelay" => json!(self.set_keypad_delay(
                a.string_or(0, "dx")?,
                a.optional_int(1)?.map(millis).unwrap_or(self.keyboard_delay)
            )?),
            "WaitKey" => json!(self.wait_key(a.int(0)?, millis(a.int_or(1, 0)?))?),
            "WaitForKey" => json!(self.wait_for_key(a.int(0)?, millis(a.int_or(1, 0)?))?),
            _ => return Err(not_found(method)),
        };
        Ok(value)
    }
}
