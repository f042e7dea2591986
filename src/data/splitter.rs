// ============================================================
// Layer 4 — Dev Split Hold-out
// ============================================================
// When training is started without a dev corpus, a fraction of
// the training sentences is held out as the dev split. The
// shuffle is seeded so a rerun holds out the same sentences.
//
// Splitting happens on raw sentences, before any corruption, so
// held-out sentences are never masked.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `items` with `seed` and split off the last
/// `dev_fraction` of them: returns `(train, dev)`.
pub fn hold_out_dev<T>(mut items: Vec<T>, dev_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let total    = items.len();
    let dev_len  = ((total as f64) * dev_fraction.clamp(0.0, 1.0)).round() as usize;
    let split_at = total - dev_len.min(total);
    let dev      = items.split_off(split_at);

    tracing::debug!(
        "Held out {} of {} training sentences as dev",
        dev.len(),
        total,
    );

    (items, dev)
}
