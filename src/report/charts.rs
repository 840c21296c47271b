use std::path::Path;

use anyhow::{Context, Result};
use plotters::prelude::*;

use crate::analysis::aggregate::{BarColor, ChartSeries};

/// Chart dimensions
const WIDTH: u32 = 1000;
const HEIGHT: u32 = 500;

/// Loudest bar
const COLOR_HIGHLIGHT: RGBColor = RGBColor(231, 76, 60); // red

fn bar_style(color: BarColor) -> ShapeStyle {
    match color {
        BarColor::Highlight => COLOR_HIGHLIGHT.filled(),
        BarColor::Hue(degrees) => HSLColor(degrees / 360.0, 0.6, 0.55).filled(),
    }
}

/// Render ranked peaks as a bar chart PNG.
///
/// One bar per peak in pitch order, labelled with frequency and note, height
/// = magnitude on the analyser's 0-255 scale.
pub fn render_peak_chart(series: &ChartSeries, output_path: &Path) -> Result<()> {
    if series.is_empty() {
        anyhow::bail!("No peaks to chart");
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let root = BitMapBackend::new(output_path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).context("Failed to fill background")?;

    let bars = series.len();
    let labels = &series.labels;

    let mut chart = ChartBuilder::on(&root)
        .caption("Dominant pitches", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0..bars).into_segmented(), 0u32..256u32)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars)
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .y_desc("Magnitude")
        .draw()?;

    chart.draw_series(series.values.iter().zip(series.colors.iter()).enumerate().map(
        |(i, (&value, &color))| {
            let mut bar = Rectangle::new(
                [
                    (SegmentValue::Exact(i), 0),
                    (SegmentValue::Exact(i + 1), value as u32),
                ],
                bar_style(color),
            );
            bar.set_margin(0, 0, 8, 8);
            bar
        },
    ))?;

    root.present().context("Failed to write chart PNG")?;
    tracing::debug!(path = %output_path.display(), bars, "peak chart written");

    Ok(())
}
