//! Offline questionnaire analysis: CSV in, derived scores and box-plot
//! figures out.
//!
//! Single-pass batch pipeline. Every transform is total over a row: a
//! missing column or non-numeric cell fails the whole job rather than
//! silently substituting a default.

pub mod melt;
pub mod plot;
pub mod scores;

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::StudyError;
use plot::BoxPlotSpec;

/// A loaded response table: header row plus string cells. Item columns
/// parse to `f64` on access; derived columns are appended in place.
#[derive(Debug, Clone)]
pub struct SurveyTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SurveyTable {
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, StudyError> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .map_err(|source| StudyError::io(format!("open {}", path.display()), source))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, StudyError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader
            .headers()
            .map_err(|source| StudyError::csv("read header row", source))?
            .iter()
            .map(String::from)
            .collect();
        let mut rows = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record =
                record.map_err(|source| StudyError::csv(format!("read row {index}"), source))?;
            rows.push(record.iter().map(String::from).collect());
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> Result<usize, StudyError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| StudyError::MissingColumn {
                column: name.to_string(),
            })
    }

    pub fn string_column(&self, name: &str) -> Result<Vec<String>, StudyError> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[index].clone()).collect())
    }

    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, StudyError> {
        let index = self.column_index(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row_number, row)| {
                row[index]
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| StudyError::NonNumeric {
                        column: name.to_string(),
                        row: row_number,
                        value: row[index].clone(),
                    })
            })
            .collect()
    }

    /// Overwrite an existing column, or append a new one, with numeric
    /// values (one per row).
    pub fn set_numeric_column(&mut self, name: &str, values: &[f64]) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.headers.iter().position(|h| h == name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = format_number(*value);
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(format_number(*value));
                }
            }
        }
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), StudyError> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)
            .map_err(|source| StudyError::csv(format!("create {}", path.display()), source))?;
        writer
            .write_record(&self.headers)
            .map_err(|source| StudyError::csv("write header row", source))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|source| StudyError::csv("write row", source))?;
        }
        writer
            .flush()
            .map_err(|source| StudyError::io("flush csv", source))?;
        Ok(())
    }
}

// Reverse-coded integers stay integers on disk; derived means keep their
// fraction.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// A named group of items averaged into one derived score.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscale {
    pub name: String,
    pub items: Vec<String>,
}

/// A survey instrument: Likert ceiling, reverse-coded items, sub-scales.
#[derive(Debug, Clone, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub scale_max: u32,
    #[serde(default)]
    pub reverse_items: Vec<String>,
    pub subscales: Vec<Subscale>,
    /// Column name for the all-items mean; defaults to
    /// `overall_<name, lowercased>`.
    #[serde(default)]
    pub overall_column: Option<String>,
}

impl Instrument {
    /// The engagement instrument used by the study: twelve items on a
    /// 1-5 scale, three of them reverse-phrased.
    pub fn ues() -> Self {
        let subscale = |name: &str, items: &[&str]| Subscale {
            name: name.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
        };
        Self {
            name: "UES".to_string(),
            scale_max: 5,
            reverse_items: vec!["U4".to_string(), "U5".to_string(), "U6".to_string()],
            subscales: vec![
                subscale("A-S", &["U1", "U2", "U3"]),
                subscale("PU-S", &["U4", "U5", "U6"]),
                subscale("AE-S", &["U7", "U8", "U9"]),
                subscale("RW-S", &["U10", "U11", "U12"]),
            ],
            overall_column: Some("overall_engagement".to_string()),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, StudyError> {
        toml::from_str(text)
            .map_err(|err| StudyError::config(format!("invalid instrument definition: {err}")))
    }

    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, StudyError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| StudyError::io(format!("read {}", path.display()), source))?;
        Self::from_toml_str(&text)
    }

    pub fn all_items(&self) -> Vec<String> {
        self.subscales
            .iter()
            .flat_map(|subscale| subscale.items.iter().cloned())
            .collect()
    }

    pub fn overall_column(&self) -> String {
        self.overall_column
            .clone()
            .unwrap_or_else(|| format!("overall_{}", self.name.to_lowercase()))
    }

    pub fn tag(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Full instrument pipeline: reverse-code, export the processed table,
/// derive sub-scale and overall scores, melt, and render the grouped box
/// plot. Returns the figure path.
pub fn analyze_instrument(
    input: impl AsRef<Path>,
    instrument: &Instrument,
    participant_col: &str,
    condition_col: &str,
    out_dir: impl AsRef<Path>,
) -> Result<PathBuf, StudyError> {
    let out_dir = out_dir.as_ref();
    let mut table = SurveyTable::from_csv_path(input)?;

    scores::reverse_code(&mut table, &instrument.reverse_items, instrument.scale_max)?;
    table.write_csv(out_dir.join(format!("processed_{}_data.csv", instrument.tag())))?;

    let score_columns = scores::apply_subscales(&mut table, instrument)?;
    let id_vars = [participant_col.to_string(), condition_col.to_string()];
    let melted = melt::melt(&table, &id_vars, &score_columns, "Metric", "Score")?;

    plot::grouped_box_plot(
        &melted,
        condition_col,
        out_dir,
        &BoxPlotSpec {
            title: &format!("{} Scores by Condition", instrument.name),
            x_label: "Metric",
            y_label: "Score",
            file_stem: &format!("{}_scores_by_condition", instrument.tag()),
        },
    )
}

/// SUS pipeline: composite score per row, then one box per condition.
pub fn analyze_sus(
    input: impl AsRef<Path>,
    condition_col: &str,
    out_dir: impl AsRef<Path>,
) -> Result<PathBuf, StudyError> {
    let out_dir = out_dir.as_ref();
    let mut table = SurveyTable::from_csv_path(input)?;
    scores::sus_scores(&mut table)?;

    plot::box_plot_by_condition(
        &table,
        condition_col,
        "sus_score",
        out_dir,
        &BoxPlotSpec {
            title: "SUS Scores by Condition",
            x_label: "Condition",
            y_label: "SUS Score",
            file_stem: "sus_scores_by_condition",
        },
    )
}

/// Plain item melt (C1-C3 style): reshape the named columns long, export
/// the intermediate, and plot items against condition.
pub fn analyze_items(
    input: impl AsRef<Path>,
    items: &[String],
    condition_col: &str,
    tag: &str,
    out_dir: impl AsRef<Path>,
) -> Result<PathBuf, StudyError> {
    let out_dir = out_dir.as_ref();
    let table = SurveyTable::from_csv_path(input)?;

    let id_vars = [condition_col.to_string()];
    let melted = melt::melt(&table, &id_vars, items, "Metric", "Value")?;
    melt::write_csv(&melted, out_dir.join(format!("melted_{tag}_data.csv")))?;

    plot::grouped_box_plot(
        &melted,
        condition_col,
        out_dir,
        &BoxPlotSpec {
            title: &format!("{} by Condition", items.join(", ")),
            x_label: "Metric",
            y_label: "Value",
            file_stem: &format!("{tag}_by_condition"),
        },
    )
}

/// Ordered distinct values of a column, first appearance wins.
pub(crate) fn distinct_in_order(values: &[String]) -> Vec<String> {
    let mut seen: HashMap<&str, ()> = HashMap::new();
    let mut out = Vec::new();
    for value in values {
        if seen.insert(value.as_str(), ()).is_none() {
            out.push(value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Participant,condition,U1,U2
p1,baseline,4,5
p2,canvas,3,2
";

    #[test]
    fn loads_headers_and_rows() {
        let table = SurveyTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.headers(),
            ["Participant", "condition", "U1", "U2"]
        );
        assert_eq!(table.string_column("condition").unwrap(), ["baseline", "canvas"]);
        assert_eq!(table.numeric_column("U1").unwrap(), [4.0, 3.0]);
    }

    #[test]
    fn missing_column_fails_fast() {
        let table = SurveyTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let err = table.numeric_column("U99").unwrap_err();
        assert!(matches!(err, StudyError::MissingColumn { column } if column == "U99"));
    }

    #[test]
    fn non_numeric_cell_fails_fast_with_location() {
        let csv = "Participant,U1\np1,4\np2,n/a\n";
        let table = SurveyTable::from_reader(csv.as_bytes()).unwrap();
        let err = table.numeric_column("U1").unwrap_err();
        match err {
            StudyError::NonNumeric { column, row, value } => {
                assert_eq!(column, "U1");
                assert_eq!(row, 1);
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn set_numeric_column_appends_and_overwrites() {
        let mut table = SurveyTable::from_reader(SAMPLE.as_bytes()).unwrap();
        table.set_numeric_column("derived", &[1.5, 2.0]);
        assert_eq!(table.numeric_column("derived").unwrap(), [1.5, 2.0]);

        table.set_numeric_column("U1", &[2.0, 3.0]);
        assert_eq!(table.numeric_column("U1").unwrap(), [2.0, 3.0]);
        // Integral values round-trip without a trailing fraction.
        assert_eq!(table.string_column("U1").unwrap(), ["2", "3"]);
    }

    #[test]
    fn ues_instrument_matches_the_study_layout() {
        let ues = Instrument::ues();
        assert_eq!(ues.scale_max, 5);
        assert_eq!(ues.reverse_items, ["U4", "U5", "U6"]);
        assert_eq!(ues.subscales.len(), 4);
        assert_eq!(ues.all_items().len(), 12);
        assert_eq!(ues.overall_column(), "overall_engagement");
    }

    #[test]
    fn instrument_parses_from_toml() {
        let toml_text = r#"
name = "TLX"
scale_max = 7
reverse_items = ["A2"]

[[subscales]]
name = "Demand"
items = ["A1", "A2", "A3"]

[[subscales]]
name = "Effort"
items = ["A4", "A5", "A6"]
"#;
        let instrument = Instrument::from_toml_str(toml_text).unwrap();
        assert_eq!(instrument.name, "TLX");
        assert_eq!(instrument.scale_max, 7);
        assert_eq!(instrument.subscales[1].items, ["A4", "A5", "A6"]);
        assert_eq!(instrument.overall_column(), "overall_tlx");
    }

    #[test]
    fn distinct_preserves_first_appearance_order() {
        let values = vec![
            "canvas".to_string(),
            "baseline".to_string(),
            "canvas".to_string(),
        ];
        assert_eq!(distinct_in_order(&values), ["canvas", "baseline"]);
    }
}
