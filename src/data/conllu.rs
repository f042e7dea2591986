// ============================================================
// Layer 4 — CoNLL-U Sentence Source
// ============================================================
// Reads a CoNLL-U treebank and yields, per sentence, the
// (FORM, DEPS) pair of every token row:
//
//   1   The    the   DET   ...   2:det          _
//   2   dog    dog   NOUN  ...   3:nsubj|0:root _
//                                ^^^^^^^^^^^^^^ column 9 (DEPS)
//
// Skipped lines:
//   - comments (`# text = ...`)
//   - multi-word token ranges (`3-4`)
//   - empty nodes (`3.1`)
// Blank lines close a sentence.

use std::{fs, path::PathBuf};

use crate::domain::sentence::{RawRow, RawSentence};
use crate::domain::traits::SentenceSource;
use crate::error::{PipelineError, Result};

const CONLLU_COLUMNS: usize = 10;
const FORM_COLUMN:    usize = 1;
const DEPS_COLUMN:    usize = 8;

/// Parse CoNLL-U text into raw sentences.
pub fn parse_conllu(text: &str) -> Result<Vec<RawSentence>> {
    let mut sentences = Vec::new();
    let mut rows      = Vec::new();

    for (line_idx, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');

        if line.trim().is_empty() {
            if !rows.is_empty() {
                sentences.push(RawSentence::new(std::mem::take(&mut rows)));
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < CONLLU_COLUMNS {
            return Err(PipelineError::Conllu {
                line:   line_idx + 1,
                reason: format!(
                    "expected {CONLLU_COLUMNS} tab-separated columns, found {}",
                    columns.len()
                ),
            });
        }

        let id = columns[0];
        if id.contains('-') || id.contains('.') {
            continue;
        }

        rows.push(RawRow::new(columns[FORM_COLUMN], columns[DEPS_COLUMN]));
    }

    if !rows.is_empty() {
        sentences.push(RawSentence::new(rows));
    }
    Ok(sentences)
}

/// Loads all sentences of one CoNLL-U file.
pub struct ConlluReader {
    path: PathBuf,
}

impl ConlluReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SentenceSource for ConlluReader {
    fn sentences(&self) -> Result<Vec<RawSentence>> {
        let text      = fs::read_to_string(&self.path)?;
        let sentences = parse_conllu(&text)?;
        tracing::debug!(
            "Read {} sentences from '{}'",
            sentences.len(),
            self.path.display()
        );
        Ok(sentences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# sent_id = 1
# text = The dog runs
1\tThe\tthe\tDET\t_\t_\t2\tdet\t2:det\t_
2\tdog\tdog\tNOUN\t_\t_\t3\tnsubj\t3:nsubj|3:agent\t_
3\truns\trun\tVERB\t_\t_\t0\troot\t0:root\t_

1\tHi\thi\tINTJ\t_\t_\t_\t_\t_\t_
";

    #[test]
    fn test_reads_form_and_deps() {
        let sentences = parse_conllu(SAMPLE).unwrap();
        assert_eq!(sentences.len(), 2);
        let first = &sentences[0];
        assert_eq!(first.words().collect::<Vec<_>>(), vec!["The", "dog", "runs"]);
        assert_eq!(first.rows[1].arc_spec, "3:nsubj|3:agent");
        assert!(!sentences[1].rows[0].has_arcs());
    }

    #[test]
    fn test_skips_ranges_and_empty_nodes() {
        let text = "1-2\tdu\t_\t_\t_\t_\t_\t_\t_\t_\n\
                    1\tde\tde\tADP\t_\t_\t0\troot\t0:root\t_\n\
                    1.1\tx\tx\tX\t_\t_\t_\t_\t1:dep\t_\n\
                    2\tle\tle\tDET\t_\t_\t1\tdet\t1:det\t_\n";
        let sentences = parse_conllu(text).unwrap();
        assert_eq!(sentences[0].words().collect::<Vec<_>>(), vec!["de", "le"]);
    }

    #[test]
    fn test_short_row_reports_line() {
        let err = parse_conllu("# c\n1\tThe\tthe\n").unwrap_err();
        match err {
            PipelineError::Conllu { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reader_loads_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.conllu");
        std::fs::write(&path, SAMPLE).unwrap();
        let sentences = ConlluReader::new(&path).sentences().unwrap();
        assert_eq!(sentences.len(), 2);
    }
}
