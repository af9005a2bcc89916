//! CSV output.
//!
//! One row per record: the question, one column per answer slot (padded to
//! the widest record) and the zero-based correct index.

use std::path::Path;

use anyhow::{Context, Result};
use ::csv::{QuoteStyle, Terminator, WriterBuilder};

use quizpilot_core::text::collapse_whitespace;

use crate::records::ExportRecord;

/// Render records as CSV text. Every field has its line breaks and
/// whitespace runs folded first. Rows end in `\n`; the last row has no
/// trailing newline.
pub fn to_csv(records: &[ExportRecord]) -> Result<String> {
    let width = records.iter().map(|r| r.answers.len()).max().unwrap_or(0);

    let mut header = vec!["question".to_string()];
    header.extend((1..=width).map(|i| format!("answer_{i}")));
    header.push("correct_index".to_string());

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&header)?;
    for r in records {
        let mut row = Vec::with_capacity(width + 2);
        row.push(collapse_whitespace(&r.question));
        for i in 0..width {
            row.push(collapse_whitespace(r.answers.get(i).map(String::as_str).unwrap_or("")));
        }
        row.push(r.correct_index.to_string());
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV output: {}", e.error()))?;
    let mut text = String::from_utf8(bytes).context("CSV output is not UTF-8")?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Write a CSV export to a file.
pub fn write_csv(records: &[ExportRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_csv(records)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(question: &str, answers: &[&str], correct_index: usize) -> ExportRecord {
        ExportRecord {
            question: question.into(),
            answers: answers.iter().map(|s| s.to_string()).collect(),
            correct_index,
            correct_text: answers[correct_index].into(),
        }
    }

    #[test]
    fn fields_are_folded_and_quoted_only_when_needed() {
        let csv = to_csv(&[record(
            "  two\r\nlines \t here ",
            &["plain", "a, b", "say \"hi\""],
            0,
        )])
        .unwrap();
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "two lines here,plain,\"a, b\",\"say \"\"hi\"\"\",0");
    }

    #[test]
    fn header_is_padded_to_widest_record() {
        let csv =
            to_csv(&[record("Q1", &["a", "b"], 1), record("Q2", &["x", "y", "z"], 2)]).unwrap();
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines[0], "question,answer_1,answer_2,answer_3,correct_index");
        assert_eq!(lines[1], "Q1,a,b,,1");
        assert_eq!(lines[2], "Q2,x,y,z,2");
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn empty_export_is_header_only() {
        assert_eq!(to_csv(&[]).unwrap(), "question,correct_index");
    }

    #[test]
    fn standard_reader_recovers_fields() {
        let records = vec![
            record(
                "Which, of \"these\"?",
                &["Hà Nội", "a,b", "multi\nline", "He said \"yes\", then left"],
                0,
            ),
            record("Plain", &["one"], 0),
        ];
        let text = to_csv(&records).unwrap();

        let mut reader = ::csv::ReaderBuilder::new()
            .flexible(false)
            .from_reader(text.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 6);

        let rows: Vec<::csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "Which, of \"these\"?");
        assert_eq!(&rows[0][1], "Hà Nội");
        assert_eq!(&rows[0][2], "a,b");
        assert_eq!(&rows[0][3], "multi line");
        assert_eq!(&rows[0][4], "He said \"yes\", then left");
        assert_eq!(&rows[0][5], "0");
        assert_eq!(&rows[1][2], "");
    }

    #[test]
    fn write_csv_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("memory.csv");
        write_csv(&[record("Q", &["a"], 0)], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("question,answer_1,correct_index\nQ,a,0"));
    }
}
