//! Utility functions for visualization: colors, scaling, locale mapping, label sizing.

use num_format::{Locale, ToFormattedString};
use plotters::prelude::*;

use super::text::estimate_text_width_px;

/// Microsoft Office (2013+) chart series palette.
/// Order: Blue, Orange, Gray, Gold, Light Blue, Green, Dark Blue, Dark Orange, Dark Gray, Brownish Gold.
const OFFICE10: [RGBColor; 10] = [
    RGBColor(68, 114, 196),  // blue      (#4472C4)
    RGBColor(237, 125, 49),  // orange    (#ED7D31)
    RGBColor(165, 165, 165), // gray      (#A5A5A5)
    RGBColor(255, 192, 0),   // gold      (#FFC000)
    RGBColor(91, 155, 213),  // light blue(#5B9BD5)
    RGBColor(112, 173, 71),  // green     (#70AD47)
    RGBColor(38, 68, 120),   // dark blue (#264478)
    RGBColor(158, 72, 14),   // dark org. (#9E480E)
    RGBColor(99, 99, 99),    // dark gray (#636363)
    RGBColor(153, 115, 0),   // brownish  (#997300)
];

/// Pie slice palette.
const PIE15: [RGBColor; 15] = [
    RGBColor(255, 107, 107),
    RGBColor(78, 205, 196),
    RGBColor(69, 183, 209),
    RGBColor(150, 206, 180),
    RGBColor(255, 234, 167),
    RGBColor(221, 160, 221),
    RGBColor(152, 216, 200),
    RGBColor(247, 220, 111),
    RGBColor(187, 143, 206),
    RGBColor(133, 193, 233),
    RGBColor(248, 196, 113),
    RGBColor(130, 224, 170),
    RGBColor(241, 148, 138),
    RGBColor(93, 173, 226),
    RGBColor(215, 189, 226),
];

/// Get a color from the Office palette.
#[inline]
pub fn office_color(idx: usize) -> RGBAColor {
    OFFICE10[idx % OFFICE10.len()].to_rgba()
}

#[inline]
pub fn pie_color(idx: usize) -> RGBAColor {
    PIE15[idx % PIE15.len()].to_rgba()
}

/// Pick a single Y-axis scale and its human label based on the overall magnitude.
/// Returns (scale, label), e.g. (1e6, "millions").
pub fn choose_axis_scale(max_abs: f64) -> (f64, &'static str) {
    if max_abs >= 1.0e9 {
        (1.0e9, "billions")
    } else if max_abs >= 1.0e6 {
        (1.0e6, "millions")
    } else if max_abs >= 1.0e4 {
        (1.0e3, "thousands")
    } else {
        (1.0, "")
    }
}

/// Map a user-provided locale tag to a `num_format::Locale`.
///
/// Supported tags (case-insensitive): `en`, `de`, `fr`, `es`, `it`, `pt`, `nl`.
/// Defaults to English.
pub fn map_locale(tag: &str) -> &'static Locale {
    match tag.to_lowercase().as_str() {
        "de" | "de_de" | "german" => &Locale::de,
        "fr" | "fr_fr" => &Locale::fr,
        "es" | "es_es" => &Locale::es,
        "it" | "it_it" => &Locale::it,
        "pt" | "pt_pt" | "pt_br" => &Locale::pt,
        "nl" | "nl_nl" => &Locale::nl,
        _ => &Locale::en, // default
    }
}

/// Whole number with locale grouping, e.g. `12,345` or `12.345`.
pub fn format_count(n: i64, locale: &Locale) -> String {
    n.to_formatted_string(locale)
}

/// Tick label for a *scaled* Y value; whole numbers get locale grouping.
pub fn format_tick(v: f64, locale: &Locale) -> String {
    let a = v.abs();
    if a >= 100.0 || v.fract() == 0.0 {
        format_count(v.round() as i64, locale)
    } else if a >= 10.0 {
        format!("{:.1}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Compute a tight left label area width for the Y axis (in pixels),
/// based on the formatted tick labels that will appear.
///
/// Returns a width clamped to a sensible range to avoid extremes.
pub fn compute_left_label_area_px(
    ymin_scaled: f64,
    ymax_scaled: f64,
    ticks: usize,
    font_px: u32,
    locale: &Locale,
) -> u32 {
    let mut max_px = 0u32;
    for i in 0..=ticks {
        let t = if ticks == 0 {
            0.0
        } else {
            i as f64 / ticks as f64
        };
        let v = ymin_scaled + (ymax_scaled - ymin_scaled) * t;
        max_px = max_px.max(estimate_text_width_px(&format_tick(v, locale), font_px));
    }
    // Tick marks plus the rotated axis description.
    max_px.saturating_add(40).clamp(56, 160)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_use_locale_grouping() {
        assert_eq!(format_count(1234567, map_locale("en")), "1,234,567");
        assert_eq!(format_count(1234567, map_locale("de")), "1.234.567");
    }

    #[test]
    fn small_counts_are_not_scaled() {
        assert_eq!(choose_axis_scale(9_999.0), (1.0, ""));
        assert_eq!(choose_axis_scale(25_000.0), (1.0e3, "thousands"));
        assert_eq!(choose_axis_scale(3.0e6), (1.0e6, "millions"));
    }
}
