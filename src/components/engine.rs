use std::rc::Rc;

use serde_json::{json, Value};

use super::Region;
use crate::color;
use crate::config::BindConfig;
use crate::dispatch::{not_found, Args, Dispatch};
use crate::error::Result;
use crate::plugin::{self, AutomationPlugin};

/// Thin typed layer over the raw plugin: plugin info, window handling,
/// colour and picture primitives.
pub struct CoreEngine {
    plugin: Rc<dyn AutomationPlugin>,
}

impl CoreEngine {
    pub fn new(plugin: Rc<dyn AutomationPlugin>) -> Self {
        Self { plugin }
    }

    pub fn plugin(&self) -> &dyn AutomationPlugin {
        self.plugin.as_ref()
    }

    fn int(&self, method: &str, args: &[Value]) -> Result<i32> {
        Ok(plugin::call_int(self.plugin(), method, args)?)
    }

    fn string(&self, method: &str, args: &[Value]) -> Result<String> {
        Ok(plugin::call_string(self.plugin(), method, args)?)
    }

    fn triple(&self, method: &str, args: &[Value]) -> Result<(i32, i32, i32)> {
        Ok(plugin::call_triple(self.plugin(), method, args)?)
    }

    // ============ Plugin info ============

    pub fn ver(&self) -> Result<String> {
        self.string("ver", &[])
    }

    pub fn get_id(&self) -> Result<i32> {
        self.int("GetID", &[])
    }

    pub fn get_dm_count(&self) -> Result<i32> {
        self.int("GetDmCount", &[])
    }

    pub fn get_base_path(&self) -> Result<String> {
        self.string("GetBasePath", &[])
    }

    pub fn get_path(&self) -> Result<String> {
        self.string("GetPath", &[])
    }

    pub fn set_path(&self, path: &str) -> Result<i32> {
        self.int("SetPath", &[json!(path)])
    }

    pub fn set_show_error_msg(&self, show: bool) -> Result<i32> {
        self.int("SetShowErrorMsg", &[json!(i32::from(show))])
    }

    pub fn set_display_input(&self, mode: &str) -> Result<i32> {
        self.int("SetDisplayInput", &[json!(mode)])
    }

    /// Activate the plugin; returns the raw status code.
    pub fn reg(&self, reg_code: &str, ver_info: &str) -> Result<i32> {
        self.int("Reg", &[json!(reg_code), json!(ver_info)])
    }

    pub fn get_screen_width(&self) -> Result<i32> {
        self.int("GetScreenWidth", &[])
    }

    pub fn get_screen_height(&self) -> Result<i32> {
        self.int("GetScreenHeight", &[])
    }

    pub fn delay(&self, millis: i32) -> Result<i32> {
        self.int("Delay", &[json!(millis)])
    }

    // ============ Windows ============

    /// Bind primitive. The configuration is passed through unchecked.
    pub fn bind_window(&self, hwnd: i32, config: &BindConfig) -> Result<i32> {
        self.int(
            "BindWindowEx",
            &[
                json!(hwnd),
                json!(config.display),
                json!(config.mouse),
                json!(config.keypad),
                json!(config.public),
                json!(config.mode),
            ],
        )
    }

    pub fn unbind_window(&self) -> Result<i32> {
        self.int("UnBindWindow", &[])
    }

    pub fn is_bind(&self, hwnd: i32) -> Result<bool> {
        Ok(self.int("IsBind", &[json!(hwnd)])? == 1)
    }

    /// Returns the first matching top-level window handle, or 0.
    pub fn find_window(&self, class_name: &str, title: &str) -> Result<i32> {
        self.int("FindWindow", &[json!(class_name), json!(title)])
    }

    pub fn find_window_by_process(
        &self,
        process_name: &str,
        class_name: &str,
        title: &str,
    ) -> Result<i32> {
        self.int(
            "FindWindowByProcess",
            &[json!(process_name), json!(class_name), json!(title)],
        )
    }

    pub fn get_window_title(&self, hwnd: i32) -> Result<String> {
        self.string("GetWindowTitle", &[json!(hwnd)])
    }

    pub fn move_window(&self, hwnd: i32, x: i32, y: i32) -> Result<i32> {
        self.int("MoveWindow", &[json!(hwnd), json!(x), json!(y)])
    }

    pub fn set_window_state(&self, hwnd: i32, flag: i32) -> Result<i32> {
        self.int("SetWindowState", &[json!(hwnd), json!(flag)])
    }

    pub fn set_window_size(&self, hwnd: i32, width: i32, height: i32) -> Result<i32> {
        self.int("SetWindowSize", &[json!(hwnd), json!(width), json!(height)])
    }

    /// `(width, height)` of the client area.
    pub fn get_client_size(&self, hwnd: i32) -> Result<(i32, i32)> {
        let (_, w, h) = self.triple("GetClientSize", &[json!(hwnd), json!(0), json!(0)])?;
        Ok((w, h))
    }

    pub fn client_to_screen(&self, hwnd: i32, x: i32, y: i32) -> Result<(i32, i32)> {
        let (_, sx, sy) = self.triple("ClientToScreen", &[json!(hwnd), json!(x), json!(y)])?;
        Ok((sx, sy))
    }

    pub fn screen_to_client(&self, hwnd: i32, x: i32, y: i32) -> Result<(i32, i32)> {
        let (_, cx, cy) = self.triple("ScreenToClient", &[json!(hwnd), json!(x), json!(y)])?;
        Ok((cx, cy))
    }

    // ============ Colour & pictures ============

    /// Colour at a point as `RRGGBB`.
    pub fn get_color(&self, x: i32, y: i32) -> Result<String> {
        self.string("GetColor", &[json!(x), json!(y)])
    }

    /// Pixel colour as `[r, g, b]`; `None` if the plugin answers something
    /// other than an `RRGGBB` string.
    pub fn get_color_rgb(&self, x: i32, y: i32) -> Result<Option<[u8; 3]>> {
        Ok(color::hex_to_rgb(&self.get_color(x, y)?))
    }

    /// Plugin convention: 0 means the colour matches.
    pub fn cmp_color(&self, x: i32, y: i32, color: &str, sim: f64) -> Result<bool> {
        Ok(self.int("CmpColor", &[json!(x), json!(y), json!(color), json!(sim)])? == 0)
    }

    /// Returns `(found, x, y)`.
    pub fn find_color(
        &self,
        region: Region,
        color: &str,
        sim: f64,
        dir: i32,
    ) -> Result<(bool, i32, i32)> {
        let [x1, y1, x2, y2] = region.args();
        let (ret, x, y) = self.triple(
            "FindColor",
            &[x1, y1, x2, y2, json!(color), json!(sim), json!(dir), json!(0), json!(0)],
        )?;
        Ok((ret == 1, x, y))
    }

    /// Returns `(index, x, y)`; index is -1 when nothing matched.
    pub fn find_pic(
        &self,
        region: Region,
        pic_name: &str,
        delta_color: &str,
        sim: f64,
        dir: i32,
    ) -> Result<(i32, i32, i32)> {
        let [x1, y1, x2, y2] = region.args();
        self.triple(
            "FindPic",
            &[
                x1,
                y1,
                x2,
                y2,
                json!(pic_name),
                json!(delta_color),
                json!(sim),
                json!(dir),
                json!(0),
                json!(0),
            ],
        )
    }

    /// String form of [`find_pic`](Self::find_pic): `"index|x|y"`.
    pub fn find_pic_e(
        &self,
        region: Region,
        pic_name: &str,
        delta_color: &str,
        sim: f64,
        dir: i32,
    ) -> Result<String> {
        let [x1, y1, x2, y2] = region.args();
        self.string(
            "FindPicE",
            &[
                x1,
                y1,
                x2,
                y2,
                json!(pic_name),
                json!(delta_color),
                json!(sim),
                json!(dir),
            ],
        )
    }

    /// Text search returning `"index|x|y"`.
    pub fn find_str_e(&self, region: Region, text: &str, color: &str, sim: f64) -> Result<String> {
        let [x1, y1, x2, y2] = region.args();
        self.string(
            "FindStrE",
            &[x1, y1, x2, y2, json!(text), json!(color), json!(sim)],
        )
    }

    pub fn ocr(&self, region: Region, color: &str, sim: f64) -> Result<String> {
        let [x1, y1, x2, y2] = region.args();
        self.string("Ocr", &[x1, y1, x2, y2, json!(color), json!(sim)])
    }

    pub fn load_pic(&self, pic_name: &str) -> Result<i32> {
        self.int("LoadPic", &[json!(pic_name)])
    }

    pub fn free_pic(&self, pic_name: &str) -> Result<i32> {
        self.int("FreePic", &[json!(pic_name)])
    }

    pub fn capture(&self, region: Region, file: &str) -> Result<i32> {
        let [x1, y1, x2, y2] = region.args();
        self.int("Capture", &[x1, y1, x2, y2, json!(file)])
    }
}

const METHODS: &[&str] = &[
    "ver",
    "GetID",
    "GetDmCount",
    "GetBasePath",
    "GetPath",
    "SetPath",
    "SetShowErrorMsg",
    "SetDisplayInput",
    "Reg",
    "GetScreenWidth",
    "GetScreenHeight",
    "Delay",
    "BindWindow",
    "UnBindWindow",
    "IsBind",
    "FindWindow",
    "FindWindowByProcess",
    "GetWindowTitle",
    "MoveWindow",
    "SetWindowState",
    "SetWindowSize",
    "GetClientSize",
    "ClientToScreen",
    "ScreenToClient",
    "GetColor",
    "GetColorRGB",
    "CmpColor",
    "FindColor",
    "FindPic",
    "LoadPic",
    "FreePic",
    "Capture",
];

impl Dispatch for CoreEngine {
    fn component(&self) -> &'static str {
        "CoreEngine"
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        let a = Args::new(method, args);
        let region = || -> Result<Region> {
            Ok(Region::new(a.int(0)?, a.int(1)?, a.int(2)?, a.int(3)?))
        };

        let value = match method {
            "ver" => json!(self.ver()?),
            "GetID" => json!(self.get_id()?),
            "GetDmCount" => json!(self.get_dm_count()?),
            "GetBasePath" => json!(self.get_base_path()?),
            "GetPath" => json!(self.get_path()?),
            "SetPath" => json!(self.set_path(a.string(0)?)?),
            "SetShowErrorMsg" => json!(self.set_show_error_msg(a.int(0)? != 0)?),
            "SetDisplayInput" => json!(self.set_display_input(a.string(0)?)?),
            "Reg" => json!(self.reg(a.string(0)?, a.string(1)?)?),
            "GetScreenWidth" => json!(self.get_screen_width()?),
            "GetScreenHeight" => json!(self.get_screen_height()?),
            "Delay" => json!(self.delay(a.int(0)?)?),
            "BindWindow" => {
                let config = BindConfig {
                    display: a.string(1)?.to_string(),
                    mouse: a.string(2)?.to_string(),
                    keypad: a.string(3)?.to_string(),
                    public: a.string(4)?.to_string(),
                    mode: a.int(5)?,
                };
                json!(self.bind_window(a.int(0)?, &config)?)
            }
            "UnBindWindow" => json!(self.unbind_window()?),
            "IsBind" => json!(self.is_bind(a.int(0)?)?),
            "FindWindow" => json!(self.find_window(a.string_or(0, "")?, a.string_or(1, "")?)?),
            "FindWindowByProcess" => json!(self.find_window_by_process(
                a.string(0)?,
                a.string_or(1, "")?,
                a.string_or(2, "")?
            )?),
            "GetWindowTitle" => json!(self.get_window_title(a.int(0)?)?),
            "MoveWindow" => json!(self.move_window(a.int(0)?, a.int(1)?, a.int(2)?)?),
            "SetWindowState" => json!(self.set_window_state(a.int(0)?, a.int(1)?)?),
            "SetWindowSize" => json!(self.set_window_size(a.int(0)?, a.int(1)?, a.int(2)?)?),
            "GetClientSize" => json!(self.get_client_size(a.int(0)?)?),
            "ClientToScreen" => json!(self.client_to_screen(a.int(0)?, a.int(1)?, a.int(2)?)?),
            "ScreenToClient" => json!(self.screen_to_client(a.int(0)?, a.int(1)?, a.int(2)?)?),
            "GetColor" => json!(self.get_color(a.int(0)?, a.int(1)?)?),
            "GetColorRGB" => json!(self.get_color_rgb(a.int(0)?, a.int(1)?)?),
            "CmpColor" => json!(self.cmp_color(
                a.int(0)?,
                a.int(1)?,
                a.string(2)?,
                a.float_or(3, 1.0)?
            )?),
            "FindColor" => json!(self.find_color(
                region()?,
                a.string(4)?,
                a.float_or(5, 1.0)?,
                a.int_or(6, 0)?
            )?),
            "FindPic" => json!(self.find_pic(
                region()?,
                a.string(4)?,
                a.string_or(5, "101010")?,
                a.float_or(6, 0.9)?,
                a.int_or(7, 0)?
            )?),
            "LoadPic" => json!(self.load_pic(a.string(0)?)?),
            "FreePic" => json!(self.free_pic(a.string(0)?)?),
            "Capture" => json!(self.capture(region()?, a.string(4)?)?),
            _ => return Err(not_found(method)),
        };
        Ok(value)
    }
}
