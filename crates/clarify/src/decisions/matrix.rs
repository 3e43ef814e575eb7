use std::io::Read;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use super::domain::{
    validate_value, Criterion, CriterionId, DecisionId, DecisionOption, Evaluation, OptionId,
    Weight,
};
use super::scoring::ScoringInput;

#[derive(Debug)]
pub enum MatrixImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Row { line: u64, message: String },
    Empty,
}

impl std::fmt::Display for MatrixImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatrixImportError::Io(err) => write!(f, "failed to read decision matrix: {}", err),
            MatrixImportError::Csv(err) => write!(f, "invalid decision matrix CSV: {}", err),
            MatrixImportError::Row { line, message } => {
                write!(f, "decision matrix line {}: {}", line, message)
            }
            MatrixImportError::Empty => write!(f, "decision matrix has no rows"),
        }
    }
}

impl std::error::Error for MatrixImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatrixImportError::Io(err) => Some(err),
            MatrixImportError::Csv(err) => Some(err),
            MatrixImportError::Row { .. } | MatrixImportError::Empty => None,
        }
    }
}

impl From<std::io::Error> for MatrixImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for MatrixImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Options, criteria, and evaluations read from a local CSV file, ready for
/// the scoring engine. Options keep the order they first appear in.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionMatrix {
    pub options: Vec<DecisionOption>,
    pub criteria: Vec<Criterion>,
    pub evaluations: Vec<Evaluation>,
}

impl DecisionMatrix {
    pub fn scoring_input(&self) -> ScoringInput<'_> {
        ScoringInput {
            options: &self.options,
            criteria: &self.criteria,
            evaluations: &self.evaluations,
        }
    }
}

/// Reads `Option,Criterion,Weight,Value` rows. A blank value leaves the pair
/// unevaluated.
pub struct MatrixImporter;

impl MatrixImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<DecisionMatrix, MatrixImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<DecisionMatrix, MatrixImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let decision_id = DecisionId("matrix".to_string());
        let mut matrix = DecisionMatrix {
            options: Vec::new(),
            criteria: Vec::new(),
            evaluations: Vec::new(),
        };

        for (index, row) in csv_reader.deserialize::<MatrixRow>().enumerate() {
            let row = row?;
            // header is line 1
            let line = index as u64 + 2;
            let reject = |message: String| MatrixImportError::Row { line, message };

            if row.option.is_empty() {
                return Err(reject("option name is required".to_string()));
            }
            if row.criterion.is_empty() {
                return Err(reject("criterion name is required".to_string()));
            }

            let weight = Weight::new(row.weight).map_err(|err| reject(err.to_string()))?;
            let option_id = matrix_option(&mut matrix, &decision_id, &row.option);
            let criterion_id = matrix_criterion(&mut matrix, &decision_id, &row.criterion, weight)
                .map_err(reject)?;

            let Some(raw) = row.value else {
                continue;
            };
            let value = validate_value(raw).map_err(|err| reject(err.to_string()))?;
            if matrix
                .evaluations
                .iter()
                .any(|existing| existing.option_id == option_id && existing.criterion_id == criterion_id)
            {
                return Err(reject(format!(
                    "'{}' is evaluated on '{}' more than once",
                    row.option, row.criterion
                )));
            }
            matrix.evaluations.push(Evaluation {
                option_id,
                criterion_id,
                value,
            });
        }

        if matrix.options.is_empty() {
            return Err(MatrixImportError::Empty);
        }
        Ok(matrix)
    }
}

fn matrix_option(matrix: &mut DecisionMatrix, decision_id: &DecisionId, name: &str) -> OptionId {
    if let Some(existing) = matrix
        .options
        .iter()
        .find(|option| option.name.eq_ignore_ascii_case(name))
    {
        return existing.id.clone();
    }

    let position = matrix.options.len() + 1;
    let option = DecisionOption {
        id: OptionId(format!("opt-{position}")),
        decision_id: decision_id.clone(),
        name: name.to_string(),
        summary: None,
        created_at: creation_order(position),
    };
    let id = option.id.clone();
    matrix.options.push(option);
    id
}

fn matrix_criterion(
    matrix: &mut DecisionMatrix,
    decision_id: &DecisionId,
    name: &str,
    weight: Weight,
) -> Result<CriterionId, String> {
    if let Some(existing) = matrix
        .criteria
        .iter()
        .find(|criterion| criterion.name.eq_ignore_ascii_case(name))
    {
        if existing.weight != weight {
            return Err(format!(
                "criterion '{}' has weight {} here but {} earlier",
                name,
                weight.get(),
                existing.weight.get()
            ));
        }
        return Ok(existing.id.clone());
    }

    let criterion = Criterion {
        id: CriterionId(format!("crit-{}", matrix.criteria.len() + 1)),
        decision_id: decision_id.clone(),
        name: name.to_string(),
        weight,
    };
    let id = criterion.id.clone();
    matrix.criteria.push(criterion);
    Ok(id)
}

/// Synthetic timestamps that preserve file order without reading the clock.
fn creation_order(position: usize) -> DateTime<Utc> {
    Utc.timestamp_opt(position as i64, 0)
        .single()
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(rename = "Option")]
    option: String,
    #[serde(rename = "Criterion")]
    criterion: String,
    #[serde(rename = "Weight")]
    weight: i64,
    #[serde(rename = "Value", default, deserialize_with = "empty_string_as_none")]
    value: Option<f64>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse::<f64>().map(Some).map_err(serde::de::Error::custom),
    }
}
