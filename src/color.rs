/// Parse an `RRGGBB` hex colour (optional leading `#`) into its components.
pub fn hex_to_rgb(color: &str) -> Option<[u8; 3]> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Format components as the plugin's `RRGGBB` colour string.
pub fn rgb_to_hex([r, g, b]: [u8; 3]) -> String {
    format!("{:02X}{:02X}{:02X}", r, g, b)
}
