// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing what the parser
// works on: sentences, arcs, the relation-label vocabulary and
// the abstractions external collaborators implement.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain structs, enums and traits

/// Raw corpus rows, resolved sentences and dependency arcs
pub mod sentence;

/// Relation label ↔ id mapping (id 0 reserved)
pub mod vocab;

/// Sentence source and sub-word tokenizer abstractions
pub mod traits;
