// ============================================================
// Layer 4 — Label Matrix Builder
// ============================================================
// Dense dependency target of one sentence:
//
//   M[d][h] = relation id of the arc  dependent d → head h
//
// Annotated sentence:   all cells 0 ("no arc"), then one cell per
//                       arc. A dependent with several heads sets
//                       several cells in its row.
// Unannotated sentence: every cell is -1, so "nothing known"
//                       never looks like "known to have no arc".
//
// The matrix is always max_seq_len × max_seq_len. Rows and
// columns past the sentence stay 0 (or -1); the loss masks them
// with the attention mask.

use serde::{Deserialize, Serialize};

use crate::domain::sentence::ArcGraph;

pub const NO_ARC:      i64 = 0;
pub const UNANNOTATED: i64 = -1;

/// Row-major square matrix of relation ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMatrix {
    size:  usize,
    cells: Vec<i64>,
}

impl LabelMatrix {
    pub fn filled(size: usize, value: i64) -> Self {
        Self {
            size,
            cells: vec![value; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, dependent: usize, head: usize) -> i64 {
        self.cells[dependent * self.size + head]
    }

    /// Returns false when the cell lies outside the matrix.
    pub fn set(&mut self, dependent: usize, head: usize, relation: i64) -> bool {
        if dependent >= self.size || head >= self.size {
            return false;
        }
        self.cells[dependent * self.size + head] = relation;
        true
    }

    pub fn row(&self, dependent: usize) -> &[i64] {
        &self.cells[dependent * self.size..(dependent + 1) * self.size]
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.cells
    }

    pub fn is_annotated(&self) -> bool {
        self.cells.first().map_or(false, |&c| c != UNANNOTATED)
    }
}

/// Build the target matrix of one sentence.
///
/// `arcs[i]` holds the arcs of word `i + 1`; the root never appears
/// as a dependent. Arcs falling outside the matrix (only possible
/// after hard truncation) are dropped.
pub fn build_label_matrix(arcs: Option<&ArcGraph>, max_seq_len: usize) -> LabelMatrix {
    let graph = match arcs {
        Some(graph) if graph.iter().any(|word| !word.is_empty()) => graph,
        _ => return LabelMatrix::filled(max_seq_len, UNANNOTATED),
    };

    let mut matrix  = LabelMatrix::filled(max_seq_len, NO_ARC);
    let mut dropped = 0usize;
    for (offset, word_arcs) in graph.iter().enumerate() {
        let dependent = offset + 1;
        for arc in word_arcs {
            if !matrix.set(dependent, arc.head, arc.relation as i64) {
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        tracing::trace!("Dropped {} arcs outside a {}x{} label matrix", dropped, max_seq_len, max_seq_len);
    }
    matrix
}
