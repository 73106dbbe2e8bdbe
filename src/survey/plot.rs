//! Box-plot figure rendering.
//!
//! One vertical box per (metric, condition) pair, metrics as axis
//! segments, conditions as color-coded offsets within a segment. Output
//! is a timestamped PNG so successive runs never clobber each other.

use chrono::Local;
use plotters::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::melt::MeltedTable;
use super::{distinct_in_order, SurveyTable};
use crate::errors::StudyError;

pub struct BoxPlotSpec<'a> {
    pub title: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub file_stem: &'a str,
}

/// Grouped box plot from a melted table, hued by the named id column.
pub fn grouped_box_plot(
    melted: &MeltedTable,
    condition_var: &str,
    out_dir: &Path,
    spec: &BoxPlotSpec<'_>,
) -> Result<PathBuf, StudyError> {
    if melted.rows.is_empty() {
        return Err(StudyError::plot("no rows to plot"));
    }
    let condition_index = melted.id_index(condition_var)?;

    let metrics = distinct_in_order(
        &melted
            .rows
            .iter()
            .map(|row| row.metric.clone())
            .collect::<Vec<_>>(),
    );
    let conditions = distinct_in_order(
        &melted
            .rows
            .iter()
            .map(|row| row.ids[condition_index].clone())
            .collect::<Vec<_>>(),
    );

    let mut groups: HashMap<(usize, usize), Vec<f64>> = HashMap::new();
    for row in &melted.rows {
        let metric_pos = metrics
            .iter()
            .position(|m| *m == row.metric)
            .unwrap_or_default();
        let condition_pos = conditions
            .iter()
            .position(|c| *c == row.ids[condition_index])
            .unwrap_or_default();
        groups
            .entry((metric_pos, condition_pos))
            .or_default()
            .push(row.value);
    }

    // Per-condition quartiles, keyed by metric position.
    let series: Vec<(usize, Vec<(usize, Quartiles)>)> = conditions
        .iter()
        .enumerate()
        .map(|(condition_pos, _)| {
            let boxes = metrics
                .iter()
                .enumerate()
                .filter_map(|(metric_pos, _)| {
                    groups
                        .get(&(metric_pos, condition_pos))
                        .map(|values| (metric_pos, Quartiles::new(values)))
                })
                .collect();
            (condition_pos, boxes)
        })
        .collect();

    let (y_min, y_max) = fence_range(series.iter().flat_map(|(_, boxes)| boxes.iter().map(|(_, q)| q)));

    let out_path = out_dir.join(timestamped(spec.file_stem));
    {
        let root = BitMapBackend::new(&out_path, (1000, 500)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| StudyError::plot(e.to_string()))?;

        let mut chart = ChartBuilder::on(&root)
            .caption(spec.title, ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(metrics[..].into_segmented(), y_min..y_max)
            .map_err(|e| StudyError::plot(e.to_string()))?;
        chart
            .configure_mesh()
            .x_desc(spec.x_label)
            .y_desc(spec.y_label)
            .light_line_style(&WHITE)
            .draw()
            .map_err(|e| StudyError::plot(e.to_string()))?;

        let box_width = 16u32;
        let group_span = (conditions.len() as f64 - 1.0) / 2.0;
        for (condition_pos, boxes) in &series {
            let color = Palette99::pick(*condition_pos).mix(1.0);
            let offset = (*condition_pos as f64 - group_span) * f64::from(box_width + 4);
            chart
                .draw_series(boxes.iter().map(|(metric_pos, quartiles)| {
                    Boxplot::new_vertical(
                        SegmentValue::CenterOf(&metrics[*metric_pos]),
                        quartiles,
                    )
                    .width(box_width)
                    .whisker_width(0.5)
                    .style(&color)
                    .offset(offset)
                }))
                .map_err(|e| StudyError::plot(e.to_string()))?
                .label(&conditions[*condition_pos])
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
                });
        }

        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .draw()
            .map_err(|e| StudyError::plot(e.to_string()))?;
        root.present().map_err(|e| StudyError::plot(e.to_string()))?;
    }
    Ok(out_path)
}

/// One box per condition for a single derived column (SUS-style figure).
pub fn box_plot_by_condition(
    table: &SurveyTable,
    condition_col: &str,
    value_col: &str,
    out_dir: &Path,
    spec: &BoxPlotSpec<'_>,
) -> Result<PathBuf, StudyError> {
    let condition_cells = table.string_column(condition_col)?;
    let values = table.numeric_column(value_col)?;
    if values.is_empty() {
        return Err(StudyError::plot("no rows to plot"));
    }

    let conditions = distinct_in_order(&condition_cells);
    let boxes: Vec<(usize, Quartiles)> = conditions
        .iter()
        .enumerate()
        .map(|(condition_pos, condition)| {
            let group: Vec<f64> = condition_cells
                .iter()
                .zip(&values)
                .filter(|(cell, _)| *cell == condition)
                .map(|(_, value)| *value)
                .collect();
            (condition_pos, Quartiles::new(&group))
        })
        .collect();

    let (y_min, y_max) = fence_range(boxes.iter().map(|(_, q)| q));

    let out_path = out_dir.join(timestamped(spec.file_stem));
    {
        let root = BitMapBackend::new(&out_path, (750, 500)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| StudyError::plot(e.to_string()))?;

        let mut chart = ChartBuilder::on(&root)
            .caption(spec.title, ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(conditions[..].into_segmented(), y_min..y_max)
            .map_err(|e| StudyError::plot(e.to_string()))?;
        chart
            .configure_mesh()
            .x_desc(spec.x_label)
            .y_desc(spec.y_label)
            .light_line_style(&WHITE)
            .draw()
            .map_err(|e| StudyError::plot(e.to_string()))?;

        let color = Palette99::pick(0).mix(1.0);
        chart
            .draw_series(boxes.iter().map(|(condition_pos, quartiles)| {
                Boxplot::new_vertical(
                    SegmentValue::CenterOf(&conditions[*condition_pos]),
                    quartiles,
                )
                .width(24)
                .whisker_width(0.5)
                .style(&color)
            }))
            .map_err(|e| StudyError::plot(e.to_string()))?;
        root.present().map_err(|e| StudyError::plot(e.to_string()))?;
    }
    Ok(out_path)
}

fn timestamped(stem: &str) -> String {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    format!("{stem}_{stamp}.png")
}

/// Y range covering every whisker fence, with a little headroom.
fn fence_range<'a>(quartiles: impl Iterator<Item = &'a Quartiles>) -> (f32, f32) {
    let mut low = f32::MAX;
    let mut high = f32::MIN;
    for q in quartiles {
        let values = q.values();
        low = low.min(values[0]);
        high = high.max(values[4]);
    }
    let margin = ((high - low) * 0.05).max(0.5);
    (low - margin, high + margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::melt::{melt, MeltedRow};

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fence_range_covers_all_whiskers() {
        let a = Quartiles::new(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let b = Quartiles::new(&[10.0, 20.0, 30.0]);
        let (low, high) = fence_range([&a, &b].into_iter());
        assert!(low <= 1.0);
        assert!(high >= 30.0);
    }

    #[test]
    fn grouped_plot_requires_the_condition_id_var() {
        let table = SurveyTable::from_reader(
            "Participant,condition,C1\np1,baseline,4\n".as_bytes(),
        )
        .unwrap();
        let melted = melt(
            &table,
            &owned(&["Participant"]),
            &owned(&["C1"]),
            "Metric",
            "Value",
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = grouped_box_plot(
            &melted,
            "condition",
            dir.path(),
            &BoxPlotSpec {
                title: "t",
                x_label: "x",
                y_label: "y",
                file_stem: "t",
            },
        )
        .unwrap_err();
        assert!(matches!(err, StudyError::MissingColumn { column } if column == "condition"));
    }

    #[test]
    fn empty_melt_is_rejected_before_rendering() {
        let melted = MeltedTable {
            id_vars: owned(&["condition"]),
            var_name: "Metric".to_string(),
            value_name: "Value".to_string(),
            rows: Vec::<MeltedRow>::new(),
        };
        let dir = tempfile::tempdir().unwrap();
        let err = grouped_box_plot(
            &melted,
            "condition",
            dir.path(),
            &BoxPlotSpec {
                title: "t",
                x_label: "x",
                y_label: "y",
                file_stem: "t",
            },
        )
        .unwrap_err();
        assert!(matches!(err, StudyError::Plot { .. }));
    }
}
