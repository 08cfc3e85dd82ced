/// Straight (non-premultiplied) RGBA, the same layout the editor uses everywhere.
pub type Rgba = [u8; 4];

pub const ACCENT: Rgba = [0xF6, 0x33, 0x9A, 0xFF];
pub const PREVIEW_FILL: Rgba = [0xF6, 0x33, 0x9B, 0x51];
pub const TRANSPARENT: Rgba = [0xFF, 0xFF, 0xFF, 0x00];
pub const WHITE: Rgba = [0xFF, 0xFF, 0xFF, 0xFF];

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
pub fn parse_hex(value: &str) -> Option<Rgba> {
    let hex = value.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }

    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();

    match hex.len() {
        3 => {
            let short = |idx: usize| {
                u8::from_str_radix(&hex[idx..idx + 1], 16)
                    .ok()
                    .map(|v| v * 17)
            };
            Some([short(0)?, short(1)?, short(2)?, 0xFF])
        }
        6 => Some([channel(0..2)?, channel(2..4)?, channel(4..6)?, 0xFF]),
        8 => Some([
            channel(0..2)?,
            channel(2..4)?,
            channel(4..6)?,
            channel(6..8)?,
        ]),
        _ => None,
    }
}

pub fn to_hex(color: Rgba) -> String {
    if color[3] == 0xFF {
        format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
    } else {
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            color[0], color[1], color[2], color[3]
        )
    }
}

pub fn to_color32(color: Rgba) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color[0], color[1], color[2], color[3])
}
