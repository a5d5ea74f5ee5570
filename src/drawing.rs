//! Interactive drawing solver (spec §4.G): a continuous, localized variant
//! of the genetic optimizer that keeps re-matching pixels as the user paints
//! strokes, biased to keep a stroke's own pixels contiguous and to bound how
//! far a freshly touched pixel is allowed to pull in neighbors.
//!
//! Grounded in the teacher's `app/calculate/drawing_process.rs`. The
//! asymmetric max-distance gate, the `STROKE_REWARD` bias and the
//! generation-counter self-cancellation are carried over unchanged in
//! spirit; `Arc<AtomicU32>` session ids replace the teacher's WASM-worker
//! bridging since this crate is native-thread-only (spec §5).

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use crate::math::{self, Rng};
use crate::progress::{ProgressMsg, ProgressSink};

/// Huge negative cost added when a swap would separate same-stroke pixels,
/// effectively forbidding it (teacher's `STROKE_REWARD`).
pub const STROKE_REWARD: f64 = -1.0e10;

/// How far (in grid units) a pixel of age `age` is allowed to participate
/// in a swap: shrinks geometrically back toward a quarter of the canvas
/// every 30 frames, floored by the surrounding code at the canvas edges.
pub fn max_dist(age: u32, canvas_size: usize) -> f64 {
    let base = (canvas_size / 4) as f64;
    (base * 0.99f64.powf(age as f64 / 30.0)).round()
}

#[derive(Clone, Copy, Default)]
pub struct PixelState {
    pub stroke_id: u32,
    pub last_edited: u32,
}

pub struct DrawingSolver {
    pub canvas_size: usize,
    pub current_id: Arc<AtomicU32>,
}

impl DrawingSolver {
    pub fn new(canvas_size: usize) -> Self {
        Self {
            canvas_size,
            current_id: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Invalidates any in-flight solver loop by bumping the session id;
    /// callers spawn a fresh `run` afterward with the new id.
    pub fn next_session(&self) -> u32 {
        self.current_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Checks the four orthogonal neighbors of `p` for a matching
    /// `stroke_id` (teacher's `stroke_reward`: 4-connected, not 8-connected).
    fn stroke_bonus(&self, p: usize, stroke_id: u32, pixel_state: &[PixelState]) -> f64 {
        if stroke_id == 0 {
            return 0.0;
        }
        let size = self.canvas_size;
        let x = p % size;
        let y = p / size;
        let neighbours = [
            (x.checked_sub(1), Some(y)),
            (Some(x + 1).filter(|&v| v < size), Some(y)),
            (Some(x), y.checked_sub(1)),
            (Some(x), Some(y + 1).filter(|&v| v < size)),
        ];
        for (nx, ny) in neighbours {
            if let (Some(nx), Some(ny)) = (nx, ny) {
                let np = ny * size + nx;
                if pixel_state[np].stroke_id == stroke_id {
                    return STROKE_REWARD;
                }
            }
        }
        0.0
    }

    /// Runs one continuous solving session: `palette[assignments[p]]` is
    /// `p`'s current actual color, `desired[p]` is the live "what should
    /// this position look like" target the brush just painted (both are
    /// shared with the caller so a fresh stroke can mutate `desired` and
    /// `pixel_state` mid-session). Never terminates on its own (spec §4.G);
    /// bails out only once `my_id != self.current_id`, i.e. a newer stroke
    /// superseded this session.
    pub fn run<S: ProgressSink>(
        &self,
        my_id: u32,
        palette: &[(u8, u8, u8)],
        desired: Arc<RwLock<Vec<(u8, u8, u8)>>>,
        pixel_state: Arc<RwLock<Vec<PixelState>>>,
        mut assignments: Vec<usize>,
        weights: &[i64],
        w_spatial: f64,
        seed: &str,
        tx: &mut S,
    ) {
        let size = self.canvas_size;
        let mut rng = Rng::from_seed_str(seed);
        let n = assignments.len();
        // Same per-generation trial count as the Genetic solver (spec §4.G
        // "identical to Genetic"): `128 * N` trial swaps before a yield.
        let trials_per_generation = 128usize.saturating_mul(n).max(1);

        loop {
            if self.current_id.load(Ordering::SeqCst) != my_id {
                return;
            }

            let desired_snapshot = desired.read().unwrap().clone();
            let state = pixel_state.read().unwrap().clone();

            let mut swaps_made = 0u32;
            for _ in 0..trials_per_generation {
                let apos = rng.range(0, n as i64) as usize;
                let age_a = state[apos].last_edited;
                let radius = max_dist(age_a, size).max(1.0) as i64;
                let ax = (apos % size) as i64;
                let ay = (apos / size) as i64;
                let bx = math::clamp_i64(ax + rng.range(-radius, radius + 1), 0, size as i64 - 1);
                let by = math::clamp_i64(ay + rng.range(-radius, radius + 1), 0, size as i64 - 1);
                let bpos = (by as usize) * size + bx as usize;
                if apos == bpos {
                    continue;
                }

                let age_b = state[bpos].last_edited;
                let max_dist_b = max_dist(age_b, size);
                if (bx - ax).abs() as f64 > max_dist_b || (by - ay).abs() as f64 > max_dist_b {
                    continue;
                }

                let rgb_a = palette[assignments[apos]];
                let rgb_b = palette[assignments[bpos]];

                let cur_a = math::heuristic((ax as f64, ay as f64), (ax as f64, ay as f64), rgb_a, desired_snapshot[apos], weights[apos] as f64, w_spatial);
                let cur_b = math::heuristic((bx as f64, by as f64), (bx as f64, by as f64), rgb_b, desired_snapshot[bpos], weights[bpos] as f64, w_spatial);

                let a_on_b = math::heuristic((ax as f64, ay as f64), (bx as f64, by as f64), rgb_a, desired_snapshot[bpos], weights[bpos] as f64, w_spatial)
                    + self.stroke_bonus(bpos, state[apos].stroke_id, &state);
                let b_on_a = math::heuristic((bx as f64, by as f64), (ax as f64, ay as f64), rgb_b, desired_snapshot[apos], weights[apos] as f64, w_spatial)
                    + self.stroke_bonus(apos, state[bpos].stroke_id, &state);

                let improvement = (cur_a - b_on_a) + (cur_b - a_on_b);
                if improvement > 0.0 {
                    assignments.swap(apos, bpos);
                    swaps_made += 1;
                }
            }

            // spec §4.G: this solver never terminates on its own — it keeps
            // re-matching pixels against whatever the brush just painted
            // until a newer session supersedes it (checked at the top of
            // the loop).
            if swaps_made > 0 {
                tx.send(ProgressMsg::UpdateAssignments(assignments.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_dist_shrinks_monotonically_with_age() {
        let size = 128;
        let d0 = max_dist(0, size);
        let d30 = max_dist(30, size);
        let d60 = max_dist(60, size);
        assert!(d0 >= d30);
        assert!(d30 >= d60);
    }

    #[test]
    fn stroke_bonus_is_zero_without_a_stroke_id() {
        let solver = DrawingSolver::new(8);
        let state = vec![PixelState::default(); 64];
        assert_eq!(solver.stroke_bonus(0, 0, &state), 0.0);
    }

    #[test]
    fn stroke_bonus_triggers_on_matching_four_connected_neighbour() {
        let solver = DrawingSolver::new(8);
        let mut state = vec![PixelState::default(); 64];
        // p = (3,3) -> index 27; right neighbour (4,3) -> index 28
        state[28].stroke_id = 5;
        let bonus = solver.stroke_bonus(27, 5, &state);
        assert_eq!(bonus, STROKE_REWARD);
    }

    #[test]
    fn stroke_bonus_ignores_diagonal_neighbours() {
        let solver = DrawingSolver::new(8);
        let mut state = vec![PixelState::default(); 64];
        // p = (3,3) -> index 27; diagonal (4,4) -> index 36
        state[36].stroke_id = 5;
        assert_eq!(solver.stroke_bonus(27, 5, &state), 0.0);
    }

    #[test]
    fn next_session_increments_and_invalidates_prior_runs() {
        let solver = DrawingSolver::new(8);
        let first = solver.next_session();
        let second = solver.next_session();
        assert!(second > first);
        assert_eq!(solver.current_id.load(Ordering::SeqCst), second);
    }
}
