//! CSV and JSON persistence for datasets, predictions and artefacts.

use crate::report::ComparisonTable;
use crate::types::{Dataset, Label, LabelColumn};
use anyhow::{bail, Context, Result};
use csv::{Reader, Writer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

/// Load a dataset; every column except `label_column` must be numeric.
/// A missing label column or a blank label cell leaves rows unlabeled.
pub fn load_dataset_csv<P: AsRef<Path>>(path: P, label_column: &str) -> Result<Dataset> {
    let path = path.as_ref();
    let mut reader =
        Reader::from_path(path).with_context(|| format!("failed to open {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let label_idx = headers.iter().position(|h| h == label_column);
    let feature_names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != label_idx)
        .map(|(_, h)| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("malformed row {line} in {}", path.display()))?;
        let mut features = Vec::with_capacity(feature_names.len());
        let mut label = None;
        for (i, field) in record.iter().enumerate() {
            if Some(i) == label_idx {
                // blank cells are unlabeled scoring rows
                if !field.trim().is_empty() {
                    label = Some(Label::parse(field).with_context(|| {
                        format!("row {line}: unrecognized label {field:?}")
                    })?);
                }
            } else {
                let value: f64 = field.trim().parse().with_context(|| {
                    format!("row {line}: column {:?} is not numeric", &headers[i])
                })?;
                features.push(value);
            }
        }
        rows.push((features, label));
    }

    let dataset = Dataset::from_rows(feature_names, rows)?;
    debug!(path = %path.display(), rows = dataset.len(), columns = dataset.width(), "Dataset loaded");
    Ok(dataset)
}

/// Write a dataset with labels encoded 0/1 in `label_column`.
pub fn write_dataset_csv<P: AsRef<Path>>(path: P, data: &Dataset, label_column: &str) -> Result<()> {
    let path = path.as_ref();
    let mut writer =
        Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))?;

    let mut header: Vec<&str> = data.feature_names().iter().map(String::as_str).collect();
    header.push(label_column);
    writer.write_record(&header)?;

    for record in data.records() {
        let mut fields: Vec<String> = record.features().iter().map(f64::to_string).collect();
        fields.push(match record.label() {
            Some(label) => (label.as_f64() as u8).to_string(),
            None => String::new(),
        });
        writer.write_record(&fields)?;
    }

    writer.flush()?;
    debug!(path = %path.display(), rows = data.len(), "Dataset written");
    Ok(())
}

#[derive(Debug, Deserialize)]
struct PredictionRow {
    truth: String,
    probability: f64,
    #[serde(default)]
    predicted: Option<String>,
}

/// Model output aligned with truth, as read from a predictions file.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTable {
    pub truth: LabelColumn,
    pub probabilities: Vec<f64>,
    /// Hard labels when the model supplied them
    pub predicted: Option<LabelColumn>,
}

/// Load a predictions CSV with `truth`, `probability` and an optional
/// `predicted` column. Labels keep their textual encoding.
pub fn load_predictions_csv<P: AsRef<Path>>(path: P) -> Result<PredictionTable> {
    let path = path.as_ref();
    let mut reader =
        Reader::from_path(path).with_context(|| format!("failed to open {}", path.display()))?;

    let mut truth = Vec::new();
    let mut probabilities = Vec::new();
    let mut predicted = Vec::new();
    for (line, result) in reader.deserialize::<PredictionRow>().enumerate() {
        let row = result.with_context(|| format!("malformed prediction row {line}"))?;
        truth.push(row.truth);
        probabilities.push(row.probability);
        predicted.push(row.predicted.filter(|p| !p.trim().is_empty()));
    }

    let predicted = if predicted.iter().all(Option::is_none) {
        None
    } else if predicted.iter().all(Option::is_some) {
        Some(LabelColumn::Text(predicted.into_iter().flatten().collect()))
    } else {
        bail!("{}: predicted column is only partially filled", path.display());
    };

    Ok(PredictionTable {
        truth: LabelColumn::Text(truth),
        probabilities,
        predicted,
    })
}

pub fn write_comparison_csv<P: AsRef<Path>>(path: P, table: &ComparisonTable) -> Result<()> {
    let path = path.as_ref();
    let mut writer =
        Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))?;
    for row in &table.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Save any serializable value as pretty JSON.
pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("invalid JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeaturePipeline;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_dataset_round_trip_keeps_labels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "Time,V1,Amount,Class\n0,1.5,10,0\n3600,-0.5,250,1\n").unwrap();

        let data = load_dataset_csv(&path, "Class").unwrap();
        assert_eq!(data.feature_names(), ["Time", "V1", "Amount"]);
        assert_eq!(data.labels().unwrap(), vec![Label::NonFraud, Label::Fraud]);
        assert_eq!(data.records()[1].features(), [3600.0, -0.5, 250.0]);

        let out = dir.path().join("out.csv");
        write_dataset_csv(&out, &data, "Class").unwrap();
        let text = fs::read_to_string(&out).unwrap();
        assert_eq!(text, "Time,V1,Amount,Class\n0,1.5,10,0\n3600,-0.5,250,1\n");
    }

    #[test]
    fn test_missing_label_column_is_unlabeled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("score.csv");
        fs::write(&path, "Time,Amount\n0,10\n").unwrap();
        let data = load_dataset_csv(&path, "Class").unwrap();
        assert!(!data.is_labeled());
    }

    #[test]
    fn test_unlabeled_rows_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scoring.csv");
        let scoring = Dataset::from_rows(
            vec!["Time".to_string(), "Amount".to_string()],
            vec![(vec![0.0, 12.5], None), (vec![60.0, 3.0], None)],
        )
        .unwrap();
        write_dataset_csv(&path, &scoring, "Class").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Time,Amount,Class\n0,12.5,\n60,3,\n");

        let back = load_dataset_csv(&path, "Class").unwrap();
        assert!(!back.is_labeled());
        assert_eq!(back.feature_names(), ["Time", "Amount"]);
        assert_eq!(back.records()[0].features(), [0.0, 12.5]);
        assert_eq!(back.records()[1].label(), None);
    }

    #[test]
    fn test_non_numeric_feature_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "Time,Amount,Class\n0,abc,0\n").unwrap();
        let err = load_dataset_csv(&path, "Class").unwrap_err();
        assert!(err.to_string().contains("Amount"));
    }

    #[test]
    fn test_predictions_with_and_without_labels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pred.csv");
        fs::write(&path, "truth,probability\nFraud,0.9\nNon-Fraud,0.2\n").unwrap();
        let table = load_predictions_csv(&path).unwrap();
        assert_eq!(table.probabilities, vec![0.9, 0.2]);
        assert!(table.predicted.is_none());

        fs::write(&path, "truth,probability,predicted\n1,0.9,1\n0,0.2,1\n").unwrap();
        let table = load_predictions_csv(&path).unwrap();
        assert_eq!(table.predicted.map(|p| p.len()), Some(2));

        fs::write(&path, "truth,probability,predicted\n1,0.9,1\n0,0.2,\n").unwrap();
        assert!(load_predictions_csv(&path).is_err());
    }

    #[test]
    fn test_feature_spec_json_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spec.json");
        let train = Dataset::from_rows(
            vec!["Time".to_string(), "V1".to_string(), "Amount".to_string()],
            (0..20).map(|i| {
                let fraud = i % 5 == 0;
                (
                    vec![i as f64 * 3000.0, i as f64 * 0.1, 5.0 + i as f64 * 20.0],
                    Some(Label::from(fraud)),
                )
            }),
        )
        .unwrap();
        let fitted = FeaturePipeline::default().fit(&train).unwrap();
        let spec = fitted.spec().unwrap();
        save_json(spec, &path).unwrap();

        let reloaded = FeaturePipeline::from_spec(load_json(&path).unwrap()).unwrap();
        assert_eq!(
            reloaded.transform(&train).unwrap(),
            fitted.transform(&train).unwrap()
        );
    }
}
