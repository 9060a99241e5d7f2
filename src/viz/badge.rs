//! Flat two-part badges (`label | value`) for README embedding.

use anyhow::{Result, anyhow};
use plotters::prelude::*;
use plotters::style::FontFamily;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters_svg::SVGBackend;

use super::ensure_fonts_registered;
use super::text::estimate_text_width_px;

const BADGE_HEIGHT: u32 = 20;
const FONT_PX: u32 = 11;
const PADDING_PX: u32 = 10;
const LABEL_BG: RGBColor = RGBColor(0x55, 0x55, 0x55);
const SHADOW: RGBColor = RGBColor(0x01, 0x01, 0x01);

/// Pixel widths of the label and value parts.
pub fn badge_widths(label: &str, value: &str) -> (u32, u32) {
    (
        estimate_text_width_px(label, FONT_PX) + PADDING_PX,
        estimate_text_width_px(value, FONT_PX) + PADDING_PX,
    )
}

/// SVG document for a badge whose value part is filled with `color`.
pub fn render_badge_svg(label: &str, value: &str, color: RGBColor) -> Result<String> {
    ensure_fonts_registered();
    let (lw, vw) = badge_widths(label, value);
    let mut out = String::new();
    {
        let root = SVGBackend::with_string(&mut out, (lw + vw, BADGE_HEIGHT)).into_drawing_area();
        let (lw, vw, h) = (lw as i32, vw as i32, BADGE_HEIGHT as i32);
        root.draw(&Rectangle::new([(0, 0), (lw, h)], LABEL_BG.filled()))
            .map_err(|e| anyhow!("{:?}", e))?;
        root.draw(&Rectangle::new([(lw, 0), (lw + vw, h)], color.filled()))
            .map_err(|e| anyhow!("{:?}", e))?;

        let anchor = Pos::new(HPos::Center, VPos::Center);
        let shadow_color = SHADOW.mix(0.3);
        let shadow = TextStyle::from((FontFamily::SansSerif, FONT_PX))
            .color(&shadow_color)
            .pos(anchor);
        let text = TextStyle::from((FontFamily::SansSerif, FONT_PX))
            .color(&WHITE)
            .pos(anchor);
        for (s, x) in [(label, lw / 2), (value, lw + vw / 2)] {
            root.draw(&Text::new(s.to_string(), (x, h / 2 + 1), shadow.clone()))
                .map_err(|e| anyhow!("{:?}", e))?;
            root.draw(&Text::new(s.to_string(), (x, h / 2), text.clone()))
                .map_err(|e| anyhow!("{:?}", e))?;
        }
        root.present().map_err(|e| anyhow!("{:?}", e))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_grow_with_text() {
        let (short, _) = badge_widths("a", "1");
        let (long, value) = badge_widths("PyPI Downloads", "1.2M");
        assert!(long > short);
        assert_eq!(value, estimate_text_width_px("1.2M", FONT_PX) + PADDING_PX);
    }
}
