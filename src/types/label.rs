//! Binary class labels and the encodings they arrive in.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Two-valued class domain every encoding is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Non-Fraud")]
    NonFraud,
    #[serde(rename = "Fraud")]
    Fraud,
}

impl Label {
    /// Both classes, in the order stratification visits them.
    pub const ALL: [Label; 2] = [Label::NonFraud, Label::Fraud];

    pub fn is_fraud(self) -> bool {
        self == Label::Fraud
    }

    /// Numeric encoding (fraud = 1).
    pub fn as_f64(self) -> f64 {
        if self.is_fraud() {
            1.0
        } else {
            0.0
        }
    }

    /// Parse a textual label. Accepts class names in any case and
    /// separator style ("Non-Fraud", "non_fraud") as well as "0"/"1".
    pub fn parse(raw: &str) -> Option<Label> {
        Self::parse_token(raw).map(|(label, _)| label)
    }

    fn parse_token(raw: &str) -> Option<(Label, TextFamily)> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "fraud" => Some((Label::Fraud, TextFamily::Named)),
            "nonfraud" => Some((Label::NonFraud, TextFamily::Named)),
            "1" | "1.0" => Some((Label::Fraud, TextFamily::Numeric)),
            "0" | "0.0" => Some((Label::NonFraud, TextFamily::Numeric)),
            _ => None,
        }
    }
}

/// Token style of a textual label column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFamily {
    /// "0" / "1"
    Numeric,
    /// "Fraud" / "Non-Fraud"
    Named,
}

impl From<bool> for Label {
    fn from(is_fraud: bool) -> Self {
        if is_fraud {
            Label::Fraud
        } else {
            Label::NonFraud
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::NonFraud => write!(f, "Non-Fraud"),
            Label::Fraud => write!(f, "Fraud"),
        }
    }
}

/// Encoding family of a label vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelEncoding {
    Labels,
    Binary,
    Boolean,
    Text,
}

/// A label vector in whatever encoding the caller (or an external model) produced.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelColumn {
    Labels(Vec<Label>),
    /// 0 = non-fraud, 1 = fraud; any other value is rejected.
    Binary(Vec<i64>),
    Boolean(Vec<bool>),
    Text(Vec<String>),
}

impl LabelColumn {
    pub fn len(&self) -> usize {
        match self {
            LabelColumn::Labels(v) => v.len(),
            LabelColumn::Binary(v) => v.len(),
            LabelColumn::Boolean(v) => v.len(),
            LabelColumn::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encoding(&self) -> LabelEncoding {
        match self {
            LabelColumn::Labels(_) => LabelEncoding::Labels,
            LabelColumn::Binary(_) => LabelEncoding::Binary,
            LabelColumn::Boolean(_) => LabelEncoding::Boolean,
            LabelColumn::Text(_) => LabelEncoding::Text,
        }
    }

    /// Token family of a `Text` column; `None` for other encodings and for
    /// an empty column. A column mixing families is rejected.
    pub fn text_family(&self) -> Result<Option<TextFamily>> {
        let LabelColumn::Text(v) = self else {
            return Ok(None);
        };
        let mut family = None;
        for (i, s) in v.iter().enumerate() {
            let (_, token) = Label::parse_token(s).ok_or_else(|| {
                PipelineError::schema(format!("unrecognized label {s:?} at row {i}"))
            })?;
            match family {
                None => family = Some(token),
                Some(seen) if seen != token => {
                    return Err(PipelineError::schema(format!(
                        "label {s:?} at row {i} is {token:?} text but earlier rows are {seen:?}"
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(family)
    }

    /// Map every entry into the two-valued domain.
    pub fn normalize(&self) -> Result<Vec<Label>> {
        match self {
            LabelColumn::Labels(v) => Ok(v.clone()),
            LabelColumn::Boolean(v) => Ok(v.iter().map(|&b| Label::from(b)).collect()),
            LabelColumn::Binary(v) => v
                .iter()
                .enumerate()
                .map(|(i, &x)| match x {
                    0 => Ok(Label::NonFraud),
                    1 => Ok(Label::Fraud),
                    other => Err(PipelineError::schema(format!(
                        "binary label at row {i} is {other}, expected 0 or 1"
                    ))),
                })
                .collect(),
            LabelColumn::Text(v) => {
                self.text_family()?;
                v.iter()
                    .enumerate()
                    .map(|(i, s)| {
                        Label::parse(s).ok_or_else(|| {
                            PipelineError::schema(format!("unrecognized label {s:?} at row {i}"))
                        })
                    })
                    .collect()
            }
        }
    }
}

impl From<Vec<Label>> for LabelColumn {
    fn from(v: Vec<Label>) -> Self {
        LabelColumn::Labels(v)
    }
}

impl From<Vec<bool>> for LabelColumn {
    fn from(v: Vec<bool>) -> Self {
        LabelColumn::Boolean(v)
    }
}

impl From<Vec<i64>> for LabelColumn {
    fn from(v: Vec<i64>) -> Self {
        LabelColumn::Binary(v)
    }
}

impl From<Vec<String>> for LabelColumn {
    fn from(v: Vec<String>) -> Self {
        LabelColumn::Text(v)
    }
}

/// Normalize truth and prediction vectors identically.
///
/// Both vectors must share one encoding and one length; textual vectors
/// must also share one token family.
pub fn normalize_pair(
    truth: &LabelColumn,
    predicted: &LabelColumn,
) -> Result<(Vec<Label>, Vec<Label>)> {
    if truth.encoding() != predicted.encoding() {
        return Err(PipelineError::schema(format!(
            "truth is encoded as {:?} but predictions as {:?}",
            truth.encoding(),
            predicted.encoding()
        )));
    }
    if truth.len() != predicted.len() {
        return Err(PipelineError::schema(format!(
            "truth has {} rows but predictions have {}",
            truth.len(),
            predicted.len()
        )));
    }
    if let (Some(t), Some(p)) = (truth.text_family()?, predicted.text_family()?) {
        if t != p {
            return Err(PipelineError::schema(format!(
                "truth is {t:?} text but predictions are {p:?} text"
            )));
        }
    }
    Ok((truth.normalize()?, predicted.normalize()?))
}
