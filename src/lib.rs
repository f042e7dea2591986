// ============================================================
// biaffine-parser
// ============================================================
// Layers, outermost first:
//
//   cli          — clap commands (Layer 1)
//   application  — convert / train / score use cases (Layer 2)
//   domain       — sentences, arcs, vocabulary, traits (Layer 3)
//   data         — CoNLL-U → aligned, padded features (Layer 4)
//   ml           — encoder, pooling, biaffine scorers (Layer 5)
//   infra        — checkpoints, tokenizer, metrics (Layer 6)
#![recursion_limit = "256"]

pub mod error;

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
