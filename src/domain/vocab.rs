// ============================================================
// Layer 3 — Graph Vocabulary
// ============================================================
// Bidirectional mapping between relation labels and the small
// integer ids stored in label matrices.
//
// Id 0 is reserved: a label-matrix cell holding 0 means "no
// labelled arc between this pair". Real labels therefore start
// at id 1, in the order the vocabulary file lists them.
//
// The vocabulary is built once and shared read-only (behind an
// Arc) by every example builder and converter.

use std::collections::HashMap;

use crate::error::{PipelineError, Result};

/// Name of the reserved id-0 entry.
pub const NONE_LABEL: &str = "<none>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphVocab {
    /// id → label; `labels[0]` is always `NONE_LABEL`
    labels: Vec<String>,
    index:  HashMap<String, u32>,
}

impl GraphVocab {
    /// Build from real relation labels. A leading `NONE_LABEL` is
    /// accepted and not duplicated; any other duplicate is an error.
    pub fn from_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = Self {
            labels: vec![NONE_LABEL.to_string()],
            index:  HashMap::new(),
        };
        vocab.index.insert(NONE_LABEL.to_string(), 0);

        let mut first = true;
        for label in labels {
            let label = label.as_ref().trim();
            if label.is_empty() {
                continue;
            }
            let leading = std::mem::replace(&mut first, false);
            if leading && label == NONE_LABEL {
                continue;
            }
            if vocab.index.contains_key(label) {
                return Err(PipelineError::Vocab(format!("duplicate label '{label}'")));
            }
            let id = vocab.labels.len() as u32;
            vocab.index.insert(label.to_string(), id);
            vocab.labels.push(label.to_string());
        }

        if vocab.labels.len() == 1 {
            return Err(PipelineError::Vocab("no relation labels".to_string()));
        }
        Ok(vocab)
    }

    /// Parse the persisted format: one label per line.
    pub fn parse(contents: &str) -> Result<Self> {
        Self::from_labels(contents.lines())
    }

    /// Inverse of `parse`, without the reserved entry.
    pub fn to_file_contents(&self) -> String {
        let mut out = String::new();
        for label in &self.labels[1..] {
            out.push_str(label);
            out.push('\n');
        }
        out
    }

    pub fn id(&self, label: &str) -> Option<u32> {
        self.index.get(label).copied()
    }

    pub fn label(&self, id: u32) -> Option<&str> {
        self.labels.get(id as usize).map(String::as_str)
    }

    /// All labels in id order, including the reserved entry.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of ids, reserved entry included. This is the output
    /// dimension of the labelled scorer.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_start_at_one() {
        let v = GraphVocab::parse("Agt\nPat\nmDepd\n").unwrap();
        assert_eq!(v.id(NONE_LABEL), Some(0));
        assert_eq!(v.id("Agt"), Some(1));
        assert_eq!(v.id("mDepd"), Some(3));
        assert_eq!(v.label(2), Some("Pat"));
        assert_eq!(v.len(), 4);
    }

    #[test]
    fn test_none_label_after_blank_lines_is_leading() {
        let v = GraphVocab::parse("\n  \n<none>\nAgt\n").unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v.id("Agt"), Some(1));
        assert!(GraphVocab::parse("Agt\n<none>\n").is_err());
    }

    #[test]
    fn test_leading_none_label_not_duplicated() {
        let v = GraphVocab::parse("<none>\nAgt\n").unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v.id("Agt"), Some(1));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        assert!(GraphVocab::parse("Agt\nAgt\n").is_err());
    }

    #[test]
    fn test_empty_vocab_rejected() {
        assert!(GraphVocab::parse("\n\n").is_err());
    }

    #[test]
    fn test_file_contents_round_trip() {
        let v = GraphVocab::parse("Agt\n\nPat\n").unwrap();
        let again = GraphVocab::parse(&v.to_file_contents()).unwrap();
        assert_eq!(again.labels(), v.labels());
    }
}
