use crate::analyzer::chart::{ChartBody, ChartDataset, TimelineBar};
use anyhow::{Context, Result, bail};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

const WIDTH: u32 = 960;
const MARGIN: u32 = 12;
const ROW_HEIGHT: u32 = 36;
const ROW_GAP: u32 = 8;
const ROWS: u32 = 3;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const ROW_BACKGROUND: Rgb<u8> = Rgb([245, 245, 245]);
const GRID: Rgb<u8> = Rgb([224, 224, 224]);

pub fn image_height() -> u32 {
    MARGIN * 2 + ROWS * ROW_HEIGHT + (ROWS - 1) * ROW_GAP
}

fn plot_width() -> u32 {
    WIDTH - MARGIN * 2
}

fn row_top(row: usize) -> u32 {
    MARGIN + row as u32 * (ROW_HEIGHT + ROW_GAP)
}

/// Rasterizes a timeline dataset: one lane per session kind, grid lines at
/// every axis tick, bars in their style colors.
pub fn render_timeline_png(dataset: &ChartDataset) -> Result<Vec<u8>> {
    if !matches!(dataset.body, ChartBody::Timeline { .. }) {
        bail!(
            "PNG export needs a timeline granularity, got {}",
            dataset.granularity
        );
    }

    let mut canvas = RgbImage::from_pixel(WIDTH, image_height(), BACKGROUND);

    (0..ROWS as usize).for_each(|row| {
        fill_rect(
            &mut canvas,
            MARGIN,
            row_top(row),
            plot_width(),
            ROW_HEIGHT,
            ROW_BACKGROUND,
        );
    });

    dataset.ticks.iter().for_each(|tick| {
        let x = MARGIN + (tick.offset.clamp(0.0, 1.0) * f64::from(plot_width() - 1)).round() as u32;
        fill_rect(
            &mut canvas,
            x,
            MARGIN,
            1,
            image_height() - MARGIN * 2,
            GRID,
        );
    });

    dataset
        .bars()
        .iter()
        .for_each(|bar| draw_bar(&mut canvas, bar));

    let mut bytes = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("Failed to encode timeline PNG")?;

    Ok(bytes)
}

fn draw_bar(canvas: &mut RgbImage, bar: &TimelineBar) {
    let Some(color) = parse_hex_color(bar.color) else {
        return;
    };

    let plot = f64::from(plot_width());
    let x0 = (bar.left * plot).floor() as u32;
    let x1 = (((bar.left + bar.width) * plot).round() as u32)
        .max(x0 + 1)
        .min(plot_width());

    fill_rect(
        canvas,
        MARGIN + x0.min(plot_width() - 1),
        row_top(bar.row) + 4,
        x1.saturating_sub(x0).max(1),
        ROW_HEIGHT - 8,
        color,
    );
}

fn fill_rect(canvas: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    let x_end = (x + width).min(canvas.width());
    let y_end = (y + height).min(canvas.height());

    (y..y_end).for_each(|py| {
        (x..x_end).for_each(|px| canvas.put_pixel(px, py, color));
    });
}

fn parse_hex_color(raw: &str) -> Option<Rgb<u8>> {
    let hex = raw.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }

    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    Some(Rgb([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
}

#[cfg(test)]
mod tests {
    use super::{MARGIN, image_height, parse_hex_color, render_timeline_png, row_top};
    use crate::analyzer::chart::{Granularity, build_chart_dataset};
    use crate::analyzer::clock::MINUTE_MS;
    use crate::analyzer::session::{SessionKind, SessionRecord};
    use chrono::{TimeZone, Utc};
    use image::{ImageFormat, Rgb};

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#e57373"), Some(Rgb([229, 115, 115])));
        assert_eq!(parse_hex_color("e57373"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn work_bar_lands_in_the_first_lane() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 9, 40, 0).unwrap();
        let start = Utc
            .with_ymd_and_hms(2026, 2, 18, 9, 0, 0)
            .unwrap()
            .timestamp_millis();
        let sessions = vec![SessionRecord::completed(
            SessionKind::Work,
            start,
            start + 30 * MINUTE_MS,
        )];
        let dataset = build_chart_dataset(&sessions, Granularity::Hourly, &now);

        let bytes = render_timeline_png(&dataset).expect("render");
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .expect("decode")
            .to_rgb8();

        assert_eq!(decoded.height(), image_height());
        let x = MARGIN + 100;
        assert_eq!(*decoded.get_pixel(x, row_top(0) + 18), Rgb([229, 115, 115]));
        assert_eq!(*decoded.get_pixel(x, row_top(1) + 18), Rgb([245, 245, 245]));
    }

    #[test]
    fn calendar_views_are_rejected() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 9, 40, 0).unwrap();
        let dataset = build_chart_dataset(&[], Granularity::Monthly, &now);

        assert!(render_timeline_png(&dataset).is_err());
    }
}
