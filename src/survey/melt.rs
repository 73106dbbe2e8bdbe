//! Wide-to-long reshaping of a survey table.

use std::path::Path;

use super::SurveyTable;
use crate::errors::StudyError;

/// A long-format table: one row per (source row, value column) pair.
#[derive(Debug, Clone)]
pub struct MeltedTable {
    pub id_vars: Vec<String>,
    pub var_name: String,
    pub value_name: String,
    pub rows: Vec<MeltedRow>,
}

#[derive(Debug, Clone)]
pub struct MeltedRow {
    /// Values of the id columns, in `id_vars` order.
    pub ids: Vec<String>,
    pub metric: String,
    pub value: f64,
}

impl MeltedTable {
    /// Position of an id column, for grouping by condition downstream.
    pub fn id_index(&self, name: &str) -> Result<usize, StudyError> {
        self.id_vars
            .iter()
            .position(|v| v == name)
            .ok_or_else(|| StudyError::MissingColumn {
                column: name.to_string(),
            })
    }
}

/// Reshape: id columns stay, each value column becomes long rows, stacked
/// column by column.
pub fn melt(
    table: &SurveyTable,
    id_vars: &[String],
    value_vars: &[String],
    var_name: &str,
    value_name: &str,
) -> Result<MeltedTable, StudyError> {
    let id_columns: Vec<Vec<String>> = id_vars
        .iter()
        .map(|name| table.string_column(name))
        .collect::<Result<_, _>>()?;

    let mut rows = Vec::with_capacity(value_vars.len() * table.len());
    for metric in value_vars {
        let values = table.numeric_column(metric)?;
        for (row_number, value) in values.into_iter().enumerate() {
            rows.push(MeltedRow {
                ids: id_columns
                    .iter()
                    .map(|column| column[row_number].clone())
                    .collect(),
                metric: metric.clone(),
                value,
            });
        }
    }

    Ok(MeltedTable {
        id_vars: id_vars.to_vec(),
        var_name: var_name.to_string(),
        value_name: value_name.to_string(),
        rows,
    })
}

pub fn write_csv(melted: &MeltedTable, path: impl AsRef<Path>) -> Result<(), StudyError> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .map_err(|source| StudyError::csv(format!("create {}", path.display()), source))?;

    let mut header: Vec<&str> = melted.id_vars.iter().map(String::as_str).collect();
    header.push(&melted.var_name);
    header.push(&melted.value_name);
    writer
        .write_record(&header)
        .map_err(|source| StudyError::csv("write header row", source))?;

    for row in &melted.rows {
        let mut record: Vec<String> = row.ids.clone();
        record.push(row.metric.clone());
        record.push(super::format_number(row.value));
        writer
            .write_record(&record)
            .map_err(|source| StudyError::csv("write row", source))?;
    }
    writer
        .flush()
        .map_err(|source| StudyError::io("flush csv", source))?;
    Ok(())
}
