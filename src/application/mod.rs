// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Each use case wires the other layers together for one CLI
// command. No model math and no printing happens here.
//
//   convert — corpus → features, with skip counts (dry run)
//   train   — corpus → trained checkpoint directory
//   score   — checkpoint + corpus → score grids as JSON lines

/// Feature-pipeline dry run
pub mod convert_use_case;

/// The training workflow
pub mod train_use_case;

/// Scoring a corpus with a trained checkpoint
pub mod score_use_case;
