//! Legend layout and drawing for external legend placement.

use anyhow::Result;
use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::text::{estimate_text_width_px, truncate_to_width};
use super::types::LegendMode;

// Layout constants shared by the estimator and the drawing code.
const FONT_PX: u32 = 14;
const LINE_H: i32 = FONT_PX as i32 + 6;
const PAD: i32 = 8;
const MARKER_RADIUS: i32 = 4;
const MARKER_TO_TEXT_GAP: i32 = 12;
const TRAILING_GAP: i32 = 18;
// Longest label shown before truncation.
const MAX_LABEL_PX: u32 = 220;

fn block_width(label: &str) -> i32 {
    let text = truncate_to_width(label, FONT_PX, MAX_LABEL_PX);
    MARKER_TO_TEXT_GAP + estimate_text_width_px(&text, FONT_PX) as i32 + TRAILING_GAP
}

/// Greedy row packing: indices of the labels placed on each row.
fn pack_rows(labels: &[String], start_x: i32, total_w: i32) -> Vec<Vec<usize>> {
    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut cur: Vec<usize> = Vec::new();
    let mut x = start_x;
    for (i, label) in labels.iter().enumerate() {
        let w = block_width(label);
        if x + w > total_w - PAD && !cur.is_empty() {
            rows.push(std::mem::take(&mut cur));
            x = start_x;
        }
        cur.push(i);
        x += w;
    }
    if !cur.is_empty() {
        rows.push(cur);
    }
    rows
}

/// Height in pixels the bottom legend band needs for `labels`.
pub fn estimate_bottom_legend_height_px(labels: &[String], start_x: i32, total_w: i32) -> i32 {
    let rows = pack_rows(labels, start_x, total_w).len() as i32;
    PAD * 2 + rows * LINE_H
}

/// Draw legend items (label, color) into a dedicated area.
///
/// `axis_x_start_px` aligns the first bottom-legend column with the plot's X axis.
pub fn draw_legend_panel<DB: DrawingBackend>(
    legend_area: &DrawingArea<DB, Shift>,
    items: &[(String, RGBAColor)],
    placement: LegendMode,
    axis_x_start_px: i32,
) -> Result<()> {
    legend_area
        .fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    let (w_u32, _) = legend_area.dim_in_pixel();
    let w = w_u32 as i32;
    let label_style: TextStyle =
        TextStyle::from((FontFamily::SansSerif, FONT_PX)).pos(Pos::new(HPos::Left, VPos::Center));

    let draw_item = |label: &str, color: &RGBAColor, x: i32, y: i32, max_px: u32| -> Result<()> {
        legend_area
            .draw(&Circle::new((x, y), MARKER_RADIUS, color.filled()))
            .map_err(|e| anyhow::anyhow!("{:?}", e))?;
        let text = truncate_to_width(label, FONT_PX, max_px);
        legend_area
            .draw(&Text::new(
                text,
                (x + MARKER_TO_TEXT_GAP, y),
                label_style.clone(),
            ))
            .map_err(|e| anyhow::anyhow!("{:?}", e))?;
        Ok(())
    };

    match placement {
        LegendMode::Bottom => {
            let labels: Vec<String> = items.iter().map(|(l, _)| l.clone()).collect();
            let rows = pack_rows(&labels, axis_x_start_px, w);
            let mut y = PAD + LINE_H / 2;
            for row in rows {
                let mut x = axis_x_start_px;
                for i in row {
                    let (label, color) = &items[i];
                    draw_item(label, color, x, y, MAX_LABEL_PX)?;
                    x += block_width(label);
                }
                y += LINE_H;
            }
        }
        LegendMode::Right => {
            let max_px = (w - PAD * 2 - MARKER_TO_TEXT_GAP - MARKER_RADIUS).max(24) as u32;
            let mut y = PAD * 3;
            for (label, color) in items {
                draw_item(label, color, PAD + MARKER_RADIUS, y, max_px)?;
                y += LINE_H;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn many_labels_wrap_onto_more_rows() {
        let few: Vec<String> = vec!["2.0".into(), "1.9".into()];
        let many: Vec<String> = (0..40).map(|i| format!("1.{i}.0")).collect();
        let h_few = estimate_bottom_legend_height_px(&few, 60, 800);
        let h_many = estimate_bottom_legend_height_px(&many, 60, 800);
        assert_eq!(h_few, PAD * 2 + LINE_H);
        assert!(h_many > h_few);
    }
}
