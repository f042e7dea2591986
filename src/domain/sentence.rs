// ============================================================
// Layer 3 — Sentence Domain Types
// ============================================================
// A raw corpus sentence is an ordered list of (word, arc-spec)
// rows exactly as the sentence source yields them. Once the
// arc-specs are resolved against the graph vocabulary it
// becomes a `Sentence`: words plus an optional arc graph.
//
// Head indices are 1-based word positions; 0 is the virtual
// root. A word may carry several arcs (graph, not tree).

use serde::{Deserialize, Serialize};

/// Arc-spec value of a row that carries no arcs.
pub const NO_ARCS: &str = "_";

/// One corpus row: the surface word and its unparsed arc-spec
/// (`_` or pipe-delimited `head:relation` pairs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub word:     String,
    pub arc_spec: String,
}

impl RawRow {
    pub fn new(word: impl Into<String>, arc_spec: impl Into<String>) -> Self {
        Self {
            word:     word.into(),
            arc_spec: arc_spec.into(),
        }
    }

    pub fn has_arcs(&self) -> bool {
        self.arc_spec != NO_ARCS
    }
}

/// An ordered sentence straight from the corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSentence {
    pub rows: Vec<RawRow>,
}

impl RawSentence {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.word.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A labelled arc from a dependent word to `head`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepArc {
    /// 1-based head word index, 0 = virtual root
    pub head:     usize,
    /// Relation id from the graph vocabulary (never 0)
    pub relation: u32,
}

impl DepArc {
    pub fn new(head: usize, relation: u32) -> Self {
        Self { head, relation }
    }
}

/// Per-word arc lists: entry `i` holds the arcs of word `i + 1`.
pub type ArcGraph = Vec<Vec<DepArc>>;

/// Words plus their resolved arc graph.
/// `arcs` is `None` for an unannotated (inference) sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub words: Vec<String>,
    pub arcs:  Option<ArcGraph>,
}

impl Sentence {
    pub fn new(words: Vec<String>, arcs: Option<ArcGraph>) -> Self {
        Self { words, arcs }
    }

    pub fn is_annotated(&self) -> bool {
        self.arcs
            .as_ref()
            .is_some_and(|graph| graph.iter().any(|arcs| !arcs.is_empty()))
    }
}
