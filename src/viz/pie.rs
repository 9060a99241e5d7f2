//! Share charts for installer and country feeds.

use anyhow::Result;
use num_format::Locale;
use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::legend::draw_legend_panel;
use super::types::{ChartConfig, LegendMode};
use super::util::{format_count, pie_color};
use crate::models::ShareSlice;
use crate::stats::share_total;

/// Slices narrower than this many degrees (1%) are not drawn.
const MIN_SLICE_DEG: f64 = 3.6;
/// Percentage labels only on slices wider than this.
const MIN_LABEL_DEG: f64 = 15.0;
/// Legend entries shown.
const MAX_LEGEND_ITEMS: usize = 10;

/// A drawable slice in degrees, clockwise from 3 o'clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Wedge {
    pub index: usize,
    pub start_deg: f64,
    pub sweep_deg: f64,
}

/// Angles for every slice large enough to draw.
///
/// Skipped slices do not advance the angle, so the drawn wedges stay contiguous.
pub fn layout_wedges(slices: &[ShareSlice]) -> Vec<Wedge> {
    let total = share_total(slices);
    if total <= 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut angle = 0.0;
    for (index, s) in slices.iter().enumerate() {
        let sweep = s.count as f64 / total as f64 * 360.0;
        if sweep < MIN_SLICE_DEG {
            continue;
        }
        out.push(Wedge {
            index,
            start_deg: angle,
            sweep_deg: sweep,
        });
        angle += sweep;
    }
    out
}

fn wedge_polygon(center: (i32, i32), radius: f64, w: &Wedge) -> Vec<(i32, i32)> {
    let steps = (w.sweep_deg / 2.0).ceil().max(1.0) as usize;
    let mut pts = Vec::with_capacity(steps + 2);
    pts.push(center);
    for i in 0..=steps {
        let deg = w.start_deg + w.sweep_deg * i as f64 / steps as f64;
        let rad = deg.to_radians();
        pts.push((
            center.0 + (radius * rad.cos()).round() as i32,
            center.1 + (radius * rad.sin()).round() as i32,
        ));
    }
    pts
}

pub(crate) fn draw_pie<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    slices: &[ShareSlice],
    config: &ChartConfig,
    locale: &Locale,
) -> Result<()> {
    root.fill(&WHITE).map_err(|e| anyhow::anyhow!("{:?}", e))?;
    let (w, h) = root.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);

    let title_style =
        TextStyle::from((FontFamily::SansSerif, 20)).pos(Pos::new(HPos::Center, VPos::Top));
    root.draw(&Text::new(config.title.clone(), (w / 2, 12), title_style))
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;

    let total = share_total(slices);
    let footer_style =
        TextStyle::from((FontFamily::SansSerif, 14)).pos(Pos::new(HPos::Center, VPos::Bottom));
    root.draw(&Text::new(
        format!("Total Downloads: {}", format_count(total, locale)),
        (w / 2, h - 12),
        footer_style,
    ))
    .map_err(|e| anyhow::anyhow!("{:?}", e))?;

    // Pie on the left 60%, legend on the right.
    let body = root.margin(48, 36, 16, 16);
    let (pie_area, legend_area) = body.split_horizontally((60).percent_width());
    let (pw, ph) = pie_area.dim_in_pixel();
    let center = (pw as i32 / 2, ph as i32 / 2);
    let radius = (pw.min(ph) as f64 / 2.0 - 8.0).max(10.0);

    let label_style = TextStyle::from((FontFamily::SansSerif, 12))
        .color(&WHITE)
        .pos(Pos::new(HPos::Center, VPos::Center));
    for wedge in layout_wedges(slices) {
        let color = pie_color(wedge.index);
        pie_area
            .draw(&Polygon::new(wedge_polygon(center, radius, &wedge), color.filled()))
            .map_err(|e| anyhow::anyhow!("{:?}", e))?;
        if wedge.sweep_deg > MIN_LABEL_DEG {
            let mid = (wedge.start_deg + wedge.sweep_deg / 2.0).to_radians();
            let at = (
                center.0 + (radius * 0.7 * mid.cos()).round() as i32,
                center.1 + (radius * 0.7 * mid.sin()).round() as i32,
            );
            pie_area
                .draw(&Text::new(
                    format!("{:.1}%", slices[wedge.index].percentage),
                    at,
                    label_style.clone(),
                ))
                .map_err(|e| anyhow::anyhow!("{:?}", e))?;
        }
    }

    let items: Vec<(String, RGBAColor)> = slices
        .iter()
        .take(MAX_LEGEND_ITEMS)
        .enumerate()
        .map(|(i, s)| {
            (
                format!(
                    "{} ({:.1}% - {})",
                    s.label,
                    s.percentage,
                    format_count(s.count, locale)
                ),
                pie_color(i),
            )
        })
        .collect();
    draw_legend_panel(&legend_area, &items, LegendMode::Right, 0)?;

    root.present().map_err(|e| anyhow::anyhow!("{:?}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(label: &str, count: i64) -> ShareSlice {
        ShareSlice {
            label: label.into(),
            count,
            percentage: 0.0,
        }
    }

    #[test]
    fn tiny_slices_are_skipped_and_angles_stay_contiguous() {
        let slices = vec![slice("pip", 700), slice("uv", 295), slice("bandersnatch", 5)];
        let wedges = layout_wedges(&slices);
        assert_eq!(wedges.len(), 2);
        assert_eq!(wedges[1].start_deg, wedges[0].sweep_deg);
        assert!((wedges[0].sweep_deg - 252.0).abs() < 1e-9);
    }

    #[test]
    fn empty_total_draws_nothing() {
        assert!(layout_wedges(&[slice("pip", 0)]).is_empty());
    }
}
