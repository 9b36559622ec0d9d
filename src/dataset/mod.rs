use crate::{describe, Descriptors, SolubilityError};
use csv::{ReaderBuilder, StringRecord, Writer};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use tracing::*;

/// The Delaney (ESOL) table with precomputed descriptors.
pub const DELANEY_URL: &str =
    "https://raw.githubusercontent.com/dataprofessor/data/master/delaney_solubility_with_descriptors.csv";

pub const DEFAULT_LABEL_COLUMN: &str = "logS";

/// A labelled feature matrix read from a CSV table.
///
/// The feature columns are every column except the label, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub columns: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
    pub label_column: String,
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn download(url: &str) -> Result<String, SolubilityError> {
    let fail = |reason: String| SolubilityError::DataFetch {
        location: url.to_owned(),
        reason,
    };
    let response = reqwest::blocking::get(url).map_err(|e| fail(e.to_string()))?;
    if !response.status().is_success() {
        return Err(fail(format!("HTTP {}", response.status())));
    }
    response.text().map_err(|e| fail(e.to_string()))
}

impl TrainingSet {
    /// Load the training table from an `http(s)` URL or a local path.
    pub fn fetch(source: &str, label_column: &str) -> Result<Self, SolubilityError> {
        info!("Loading training data from {source}");
        let text = if is_url(source) {
            download(source)?
        } else {
            std::fs::read_to_string(source).map_err(|e| SolubilityError::DataFetch {
                location: source.to_owned(),
                reason: e.to_string(),
            })?
        };
        let set = Self::from_reader(text.as_bytes(), label_column)?;
        info!(
            "Loaded {} training rows with features {:?}",
            set.len(),
            set.columns
        );
        Ok(set)
    }

    pub fn from_reader<R: Read>(reader: R, label_column: &str) -> Result<Self, SolubilityError> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_owned()).collect();
        let label = headers
            .iter()
            .position(|h| h == label_column)
            .ok_or_else(|| SolubilityError::Dataset(format!("no '{label_column}' column in {headers:?}")))?;
        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != label)
            .map(|(_, h)| h.clone())
            .collect();

        let mut features = Vec::new();
        let mut labels = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record: StringRecord = record?;
            // Line 1 is the header.
            let row = parse_row(&record, i + 2)?;
            if row.len() != headers.len() {
                return Err(SolubilityError::Dataset(format!(
                    "row {} has {} cells, expected {}",
                    i + 2,
                    row.len(),
                    headers.len()
                )));
            }
            labels.push(row[label]);
            features.push(
                row.iter()
                    .enumerate()
                    .filter(|&(j, _)| j != label)
                    .map(|(_, &v)| v)
                    .collect(),
            );
        }

        if labels.is_empty() {
            return Err(SolubilityError::Dataset("the table has no rows".to_owned()));
        }

        Ok(Self {
            columns,
            features,
            labels,
            label_column: label_column.to_owned(),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// SHA-256 over the column names and the exact bits of every value.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for column in self.columns.iter().chain(std::iter::once(&self.label_column)) {
            hasher.update(column.as_bytes());
            hasher.update([0]);
        }
        for (row, label) in self.features.iter().zip(&self.labels) {
            for value in row.iter().chain(std::iter::once(label)) {
                hasher.update(value.to_bits().to_le_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

fn parse_row(record: &StringRecord, line: usize) -> Result<Vec<f64>, SolubilityError> {
    record
        .iter()
        .map(|cell| {
            let cell = cell.trim();
            cell.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| SolubilityError::Dataset(format!("row {line}: '{cell}' is not a number")))
        })
        .collect()
}

/// Turn a table of SMILES and measured labels into a training table with the
/// four descriptor columns followed by `logS`.
///
/// Returns the number of rows written. Molecules whose descriptors cannot be
/// computed are skipped with a warning.
pub fn build_training_csv<R: Read, W: Write>(
    input: R,
    output: W,
    smiles_column: &str,
    label_column: &str,
) -> Result<usize, SolubilityError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(input);
    let headers = rdr.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| SolubilityError::Dataset(format!("no '{name}' column in the input")))
    };
    let smiles_at = find(smiles_column)?;
    let label_at = find(label_column)?;

    let mut wtr = Writer::from_writer(output);
    let mut header: Vec<&str> = Descriptors::COLUMNS.to_vec();
    header.push(DEFAULT_LABEL_COLUMN);
    wtr.write_record(&header)?;

    let mut written = 0;
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let line = i + 2;
        let smiles = record.get(smiles_at).unwrap_or("").trim();
        let label = record.get(label_at).unwrap_or("").trim();
        if smiles.is_empty() || label.is_empty() {
            warn!("Skipping row {line} with empty SMILES or label: {:?}", record);
            continue;
        }
        let descriptors = match describe(line, smiles) {
            Ok(d) => d,
            Err(e) => {
                warn!("Skipping row {line}: {e}");
                continue;
            }
        };
        let mut row: Vec<String> = descriptors.values().iter().map(|v| v.to_string()).collect();
        row.push(label.to_owned());
        wtr.write_record(&row)?;
        written += 1;
    }
    wtr.flush()?;
    info!("Wrote {written} training rows");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SAMPLE: &str = include_str!("../../tests/fixtures/delaney-sample.csv");

    #[test]
    fn test_read_sample() {
        let set = TrainingSet::from_reader(SAMPLE.as_bytes(), "logS").unwrap();
        assert_eq!(set.columns, Descriptors::COLUMNS);
        assert_eq!(set.len(), 34);
        assert_eq!(set.n_features(), 4);
        assert_abs_diff_eq!(set.features[0][0], 2.5954);
        assert_abs_diff_eq!(set.labels[0], -2.18);
    }

    #[test]
    fn test_label_column_may_be_anywhere() {
        let csv = "logS,b,a\n1.0,2.0,3.0\n";
        let set = TrainingSet::from_reader(csv.as_bytes(), "logS").unwrap();
        assert_eq!(set.columns, vec!["b", "a"]);
        assert_eq!(set.features, vec![vec![2.0, 3.0]]);
        assert_eq!(set.labels, vec![1.0]);
    }

    #[test]
    fn test_malformed_tables() {
        let missing_label = TrainingSet::from_reader("a,b\n1,2\n".as_bytes(), "logS");
        assert!(matches!(missing_label, Err(SolubilityError::Dataset(_))));

        let not_numeric = TrainingSet::from_reader("a,logS\n1,x\n".as_bytes(), "logS");
        assert!(matches!(not_numeric, Err(SolubilityError::Dataset(m)) if m.contains("row 2")));

        let empty = TrainingSet::from_reader("a,logS\n".as_bytes(), "logS");
        assert!(matches!(empty, Err(SolubilityError::Dataset(_))));
    }

    #[test]
    fn test_fetch_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap();
        let set = TrainingSet::fetch(path, "logS").unwrap();
        assert_eq!(set.len(), 34);
    }

    #[test]
    fn test_fetch_missing_file() {
        let err = TrainingSet::fetch("/definitely/not/here.csv", "logS").unwrap_err();
        assert!(matches!(err, SolubilityError::DataFetch { .. }));
    }

    #[test]
    fn test_fingerprint() {
        let set = TrainingSet::from_reader(SAMPLE.as_bytes(), "logS").unwrap();
        let same = TrainingSet::from_reader(SAMPLE.as_bytes(), "logS").unwrap();
        assert_eq!(set.fingerprint(), same.fingerprint());
        assert_eq!(set.fingerprint().len(), 64);

        let mut changed = set.clone();
        changed.labels[3] += 0.01;
        assert_ne!(set.fingerprint(), changed.fingerprint());
    }

    #[test]
    fn test_build_training_csv() {
        let input = "Compound ID,measured log(solubility:mol/L),SMILES\n\
                     ethanol,1.10,CCO\n\
                     broken,0.0,C1CC\n\
                     benzene,-1.64,c1ccccc1\n";
        let mut output = Vec::new();
        let written = build_training_csv(
            input.as_bytes(),
            &mut output,
            "SMILES",
            "measured log(solubility:mol/L)",
        )
        .unwrap();
        assert_eq!(written, 2);

        let set = TrainingSet::from_reader(output.as_slice(), DEFAULT_LABEL_COLUMN).unwrap();
        assert_eq!(set.columns, Descriptors::COLUMNS);
        assert_eq!(set.labels, vec![1.10, -1.64]);
        assert_abs_diff_eq!(set.features[0][1], 46.069, epsilon = 1e-3);
        assert_eq!(set.features[1][3], 1.0);
    }
}
