use crate::{DescriptorTable, SolubilityError};
use csv::Writer;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned text, one titled table per section.
    #[default]
    Table,
    /// A single CSV with the SMILES, the descriptors and the prediction.
    Csv,
}

pub const PREDICTION_COLUMN: &str = "Predicted LogS";

/// Decimal places shown for each descriptor column in text output.
const PRECISION: [usize; 4] = [4, 3, 0, 4];

/// Render an aligned table. The index column and numbers are right-aligned,
/// text columns left-aligned.
fn text_table(title: &str, headers: &[&str], rows: &[Vec<String>], numeric: &[bool]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    let index_width = rows.len().saturating_sub(1).to_string().len();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let mut line = " ".repeat(index_width);
    for (i, header) in headers.iter().enumerate() {
        if numeric[i] {
            let _ = write!(line, "  {header:>w$}", w = widths[i]);
        } else {
            let _ = write!(line, "  {header:<w$}", w = widths[i]);
        }
    }
    let _ = writeln!(out, "{}", line.trim_end());

    for (n, row) in rows.iter().enumerate() {
        let mut line = format!("{n:>index_width$}");
        for (i, cell) in row.iter().enumerate() {
            if numeric[i] {
                let _ = write!(line, "  {cell:>w$}", w = widths[i]);
            } else {
                let _ = write!(line, "  {cell:<w$}", w = widths[i]);
            }
        }
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

fn input_section(table: &DescriptorTable) -> String {
    let rows: Vec<Vec<String>> = table.smiles.iter().map(|s| vec![s.clone()]).collect();
    text_table("Input SMILES", &["SMILES"], &rows, &[false])
}

fn descriptor_section(table: &DescriptorTable) -> String {
    let headers: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(PRECISION)
                .map(|(v, p)| format!("{v:.p$}"))
                .collect()
        })
        .collect();
    text_table("Computed molecular descriptors", &headers, &rows, &[true; 4])
}

fn prediction_section(predictions: &[f64]) -> String {
    let rows: Vec<Vec<String>> = predictions.iter().map(|p| vec![format!("{p:.4}")]).collect();
    text_table("Predicted LogS values", &[PREDICTION_COLUMN], &rows, &[true])
}

/// Render the input, descriptor and (when given) prediction tables.
pub fn render(
    table: &DescriptorTable,
    predictions: Option<&[f64]>,
    format: OutputFormat,
) -> Result<String, SolubilityError> {
    if let Some(predictions) = predictions {
        if predictions.len() != table.len() {
            return Err(SolubilityError::Model(format!(
                "{} predictions for {} molecules",
                predictions.len(),
                table.len()
            )));
        }
    }
    match format {
        OutputFormat::Table => {
            let mut sections = vec![input_section(table), descriptor_section(table)];
            if let Some(predictions) = predictions {
                sections.push(prediction_section(predictions));
            }
            Ok(sections.join("\n"))
        }
        OutputFormat::Csv => render_csv(table, predictions),
    }
}

fn render_csv(table: &DescriptorTable, predictions: Option<&[f64]>) -> Result<String, SolubilityError> {
    let mut wtr = Writer::from_writer(Vec::new());
    let mut header = vec!["SMILES"];
    header.extend(table.columns.iter().map(String::as_str));
    if predictions.is_some() {
        header.push(PREDICTION_COLUMN);
    }
    wtr.write_record(&header)?;

    for (i, (smiles, row)) in table.smiles.iter().zip(&table.rows).enumerate() {
        let mut record = vec![smiles.clone()];
        record.extend(row.iter().map(|v| v.to_string()));
        if let Some(predictions) = predictions {
            record.push(predictions[i].to_string());
        }
        wtr.write_record(&record)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| SolubilityError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| SolubilityError::Dataset(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate;

    #[test]
    fn test_text_tables() {
        let table = generate(&["CCO", "c1ccccc1"]).unwrap();
        let out = render(&table, Some(&[1.0, -1.5]), OutputFormat::Table).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "Input SMILES");
        assert_eq!(lines[1], "   SMILES");
        assert_eq!(lines[2], "0  CCO");
        assert_eq!(lines[3], "1  c1ccccc1");
        assert!(out.contains("Computed molecular descriptors"));
        assert!(out.contains("MolLogP   MolWt  NumRotatableBonds  AromaticProportion"));
        assert!(out.contains("46.069"));
        assert!(out.contains("Predicted LogS values"));
        assert!(out.ends_with(&format!("1  {:>14}\n", "-1.5000")));
    }

    #[test]
    fn test_descriptors_only() {
        let table = generate(&["C"]).unwrap();
        let out = render(&table, None, OutputFormat::Table).unwrap();
        assert!(!out.contains(PREDICTION_COLUMN));
        assert!(out.contains("16.043"));
    }

    #[test]
    fn test_csv() {
        let table = generate(&["CCO", "C"]).unwrap();
        let out = render(&table, Some(&[0.5, -0.25]), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "SMILES,MolLogP,MolWt,NumRotatableBonds,AromaticProportion,Predicted LogS"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("CCO,"));
        assert!(lines[2].ends_with(",0,0,-0.25"));
    }

    #[test]
    fn test_prediction_count_must_match() {
        let table = generate(&["CCO"]).unwrap();
        assert!(render(&table, Some(&[]), OutputFormat::Csv).is_err());
    }
}
