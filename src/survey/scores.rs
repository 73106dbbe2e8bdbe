//! Derived-score transforms: reverse coding, sub-scale means, and the
//! fixed-weight SUS composite.

use super::{Instrument, SurveyTable};
use crate::errors::StudyError;

/// Invert reverse-phrased items in place: `new = (scale_max + 1) - old`.
/// Applying the transform twice restores the original values.
pub fn reverse_code(
    table: &mut SurveyTable,
    items: &[String],
    scale_max: u32,
) -> Result<(), StudyError> {
    let ceiling = f64::from(scale_max + 1);
    for item in items {
        let values = table.numeric_column(item)?;
        let inverted: Vec<f64> = values.iter().map(|value| ceiling - value).collect();
        table.set_numeric_column(item, &inverted);
    }
    Ok(())
}

/// Row-wise arithmetic mean over the named item columns.
pub fn row_means(table: &SurveyTable, items: &[String]) -> Result<Vec<f64>, StudyError> {
    if items.is_empty() {
        return Err(StudyError::config("cannot average an empty item set"));
    }
    let columns: Vec<Vec<f64>> = items
        .iter()
        .map(|item| table.numeric_column(item))
        .collect::<Result<_, _>>()?;
    let count = columns.len() as f64;
    let mut means = vec![0.0; table.len()];
    for column in &columns {
        for (mean, value) in means.iter_mut().zip(column) {
            *mean += value;
        }
    }
    for mean in &mut means {
        *mean /= count;
    }
    Ok(means)
}

/// Append one `<subscale>_score` column per sub-scale plus the all-items
/// overall column. Returns the appended column names in plot order.
pub fn apply_subscales(
    table: &mut SurveyTable,
    instrument: &Instrument,
) -> Result<Vec<String>, StudyError> {
    let mut score_columns = Vec::with_capacity(instrument.subscales.len() + 1);
    for subscale in &instrument.subscales {
        let means = row_means(table, &subscale.items)?;
        let column = format!("{}_score", subscale.name);
        table.set_numeric_column(&column, &means);
        score_columns.push(column);
    }
    let overall = row_means(table, &instrument.all_items())?;
    let overall_column = instrument.overall_column();
    table.set_numeric_column(&overall_column, &overall);
    score_columns.push(overall_column);
    Ok(score_columns)
}

const SUS_POSITIVE: [&str; 5] = ["S1", "S3", "S5", "S7", "S9"];
const SUS_NEGATIVE: [&str; 5] = ["S2", "S4", "S6", "S8", "S10"];

/// Append the `sus_score` column:
/// `2.5 * (20 + sum(odd items) - sum(even items))`.
pub fn sus_scores(table: &mut SurveyTable) -> Result<(), StudyError> {
    let mut totals = vec![20.0; table.len()];
    for item in SUS_POSITIVE {
        let values = table.numeric_column(item)?;
        for (total, value) in totals.iter_mut().zip(&values) {
            *total += value;
        }
    }
    for item in SUS_NEGATIVE {
        let values = table.numeric_column(item)?;
        for (total, value) in totals.iter_mut().zip(&values) {
            *total -= value;
        }
    }
    let scores: Vec<f64> = totals.iter().map(|total| 2.5 * total).collect();
    table.set_numeric_column("sus_score", &scores);
    Ok(())
}
