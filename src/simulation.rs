//! The particle simulation (spec §4.E): a grid of [`Cell`]s whose positions
//! are advanced each frame under destination, neighbor and wall forces.
//!
//! Grounded in the teacher's `app/morph_sim.rs::Sim`; neighbor lookups use a
//! spatial grid bucketed at `1.0` units (one cell-width) so each frame only
//! scans the 3x3 neighborhood around every cell instead of all pairs.

use std::collections::HashMap;

use crate::cell::Cell;

pub struct Simulation {
    pub cells: Vec<Cell>,
    pub name: String,
    pub sidelen: f64,
    /// Whether the morph currently runs dst->src rather than src->dst
    /// (spec §4.E "preparePlay"); toggled only by [`Simulation::prepare_play`].
    pub reversed: bool,
}

type GridKey = (i32, i32);

fn bucket_of(x: f64, y: f64) -> GridKey {
    (x.floor() as i32, y.floor() as i32)
}

/// The world-space center of grid cell `p` (row-major) on an `S x S`
/// arena: pixel `(x, y)`'s center sits at `(x + 0.5, y + 0.5)` (spec §3
/// "Cell": "centers of the two grid cells ... offset by 0.5 pixels").
pub fn pixel_center(p: usize, sidelen: u32) -> (f64, f64) {
    let x = (p as u32 % sidelen) as f64;
    let y = (p as u32 / sidelen) as f64;
    (x + 0.5, y + 0.5)
}

impl Simulation {
    /// Builds a simulation where every cell starts at its source position
    /// with no destination force (spec §4.E "Initialization"): the caller
    /// typically follows with [`Simulation::set_assignments`] to establish
    /// real destinations before `dst_force` is ramped up for a transform.
    pub fn new(name: String, sidelen: f64, source_palette_positions: Vec<(f64, f64)>) -> Self {
        let cells = source_palette_positions
            .iter()
            .map(|&(x, y)| Cell::new(x, y, x, y))
            .collect();
        Self {
            cells,
            name,
            sidelen,
            reversed: false,
        }
    }

    /// Pixel spacing `pi = S/G` used by neighbor/wall forces (spec §4.E
    /// step 1): since one cell exists per source pixel, `G = sqrt(N) = S`,
    /// so `pi` is always `1.0` — kept as a named quantity rather than a
    /// literal so the force formulas in `cell.rs` read the same as spec.md.
    fn pixel_size(&self) -> f64 {
        let n = self.cells.len().max(1) as f64;
        self.sidelen / n.sqrt()
    }

    /// Re-targets cell `src_idx` (by its position in `cells`) toward
    /// `(dst_x, dst_y)`, replacing its physical state with a fresh
    /// [`Cell`] but keeping `age` and `stroke_id` (spec §4.E
    /// "Re-assignment is source-keyed" — see Open Question resolution in
    /// SPEC_FULL.md).
    fn retarget(&mut self, src_idx: usize, dst_x: f64, dst_y: f64, dst_force: f64) {
        let old = self.cells[src_idx];
        let mut fresh = Cell::new(old.pos_x, old.pos_y, dst_x, dst_y);
        fresh.pos_x = old.pos_x;
        fresh.pos_y = old.pos_y;
        fresh.vel_x = old.vel_x;
        fresh.vel_y = old.vel_y;
        fresh.age = old.age;
        fresh.stroke_id = old.stroke_id;
        fresh.dst_force = dst_force;
        self.cells[src_idx] = fresh;
    }

    /// Applies a full assignment permutation (spec §4.E "Apply assignment"):
    /// `assignments[t]` names which source cell should now aim for target
    /// slot `t`. `dst_force` is the ramp-up coefficient for the transform
    /// (the teacher uses `0.14` once an assignment has been computed).
    pub fn set_assignments(&mut self, assignments: &[usize], sidelen: u32, dst_force: f64) {
        for (t, &src_idx) in assignments.iter().enumerate() {
            let (x, y) = pixel_center(t, sidelen);
            self.retarget(src_idx, x, y, dst_force);
        }
    }

    /// spec §4.E "preparePlay(P, wantReverse)": if the morph is already
    /// running in the requested direction, restart it from the beginning
    /// (snap every cell back to its source, reset age); otherwise flip
    /// direction (snap to the current destination, then swap src/dst so the
    /// cell now travels the other way) and reset age. Either branch resets
    /// age so the destination force ramps back up from a standstill.
    pub fn prepare_play(&mut self, want_reverse: bool) {
        if self.reversed == want_reverse {
            for cell in &mut self.cells {
                cell.pos_x = cell.src_x;
                cell.pos_y = cell.src_y;
                cell.vel_x = 0.0;
                cell.vel_y = 0.0;
                cell.age = 0;
            }
        } else {
            for cell in &mut self.cells {
                cell.pos_x = cell.dst_x;
                cell.pos_y = cell.dst_y;
                cell.vel_x = 0.0;
                cell.vel_y = 0.0;
                cell.switch();
            }
            self.reversed = want_reverse;
        }
    }

    /// Advances the simulation by one frame: builds a spatial grid bucketed
    /// at unit size, applies destination/neighbor/alignment/wall forces
    /// using the 3x3 neighborhood around each cell, then integrates
    /// (spec §4.E "Step").
    pub fn step(&mut self) {
        let mut grid: HashMap<GridKey, Vec<usize>> = HashMap::new();
        for (i, cell) in self.cells.iter().enumerate() {
            grid.entry(bucket_of(cell.pos_x, cell.pos_y)).or_default().push(i);
        }

        let sidelen = self.sidelen;
        let pixel_size = self.pixel_size();
        let n = self.cells.len();
        // `(Sigma w*v_j, Sigma w)` per cell (spec §4.E step 4-5): the
        // neighbor weight `w` from repulsion doubles as the alignment
        // weight, so a cell barely touching its neighbor's personal space
        // barely steers toward that neighbor's velocity.
        let mut weighted_vel = vec![(0.0f64, 0.0f64, 0.0f64); n];

        for i in 0..n {
            let (bx, by) = bucket_of(self.cells[i].pos_x, self.cells[i].pos_y);
            let mut sum_w_vx = 0.0;
            let mut sum_w_vy = 0.0;
            let mut sum_w = 0.0;

            for dx in -1..=1 {
                for dy in -1..=1 {
                    if let Some(bucket) = grid.get(&(bx + dx, by + dy)) {
                        for &j in bucket {
                            if j == i {
                                continue;
                            }
                            let (ox, oy) = (self.cells[j].pos_x, self.cells[j].pos_y);
                            let w = self.cells[i].apply_neighbour_force(ox, oy, pixel_size);
                            if w > 0.0 {
                                sum_w_vx += w * self.cells[j].vel_x;
                                sum_w_vy += w * self.cells[j].vel_y;
                                sum_w += w;
                                if self.cells[i].stroke_id != 0 && self.cells[i].stroke_id == self.cells[j].stroke_id
                                {
                                    self.cells[i].apply_stroke_attraction(ox, oy, w);
                                }
                            }
                        }
                    }
                }
            }
            weighted_vel[i] = (sum_w_vx, sum_w_vy, sum_w);
        }

        for i in 0..n {
            let (sum_w_vx, sum_w_vy, sum_w) = weighted_vel[i];
            if sum_w > 0.0 {
                self.cells[i].apply_alignment(sum_w_vx / sum_w, sum_w_vy / sum_w);
            }
            self.cells[i].apply_destination_force(sidelen);
            self.cells[i].apply_wall_force(sidelen, pixel_size);
        }

        for cell in &mut self.cells {
            cell.update();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_positions(sidelen: u32) -> Vec<(f64, f64)> {
        (0..sidelen * sidelen)
            .map(|i| pixel_center(i as usize, sidelen))
            .collect()
    }

    #[test]
    fn set_assignments_is_a_bijection_on_positions() {
        let sidelen = 4;
        let mut sim = Simulation::new("t".into(), sidelen as f64, grid_positions(sidelen));
        let assignments: Vec<usize> = (0..(sidelen * sidelen) as usize).rev().collect();
        sim.set_assignments(&assignments, sidelen, 0.14);

        let mut dst_positions: Vec<(i64, i64)> = sim
            .cells
            .iter()
            .map(|c| (c.dst_x.round() as i64, c.dst_y.round() as i64))
            .collect();
        dst_positions.sort();
        dst_positions.dedup();
        assert_eq!(dst_positions.len(), (sidelen * sidelen) as usize);
    }

    #[test]
    fn step_keeps_positions_within_bounded_slack_of_sidelen() {
        let sidelen = 8;
        let mut sim = Simulation::new("t".into(), sidelen as f64, grid_positions(sidelen));
        let assignments: Vec<usize> = (0..(sidelen * sidelen) as usize).rev().collect();
        sim.set_assignments(&assignments, sidelen, 0.14);

        for _ in 0..200 {
            sim.step();
        }

        for cell in &sim.cells {
            assert!(cell.pos_x >= -10.0 && cell.pos_x <= sidelen as f64 + 10.0);
            assert!(cell.pos_y >= -10.0 && cell.pos_y <= sidelen as f64 + 10.0);
        }
    }

    #[test]
    fn prepare_play_reverse_then_reverse_restores_original_src_dst() {
        let sidelen = 4;
        let mut sim = Simulation::new("t".into(), sidelen as f64, grid_positions(sidelen));
        let before: Vec<(f64, f64, f64, f64)> =
            sim.cells.iter().map(|c| (c.src_x, c.src_y, c.dst_x, c.dst_y)).collect();
        sim.prepare_play(true);
        sim.prepare_play(false);
        let after: Vec<(f64, f64, f64, f64)> =
            sim.cells.iter().map(|c| (c.src_x, c.src_y, c.dst_x, c.dst_y)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn prepare_play_same_direction_restarts_from_source() {
        let sidelen = 4;
        let mut sim = Simulation::new("t".into(), sidelen as f64, grid_positions(sidelen));
        for cell in &mut sim.cells {
            cell.pos_x += 1.5;
            cell.age = 40;
        }
        sim.prepare_play(false);
        for cell in &sim.cells {
            assert_eq!(cell.pos_x, cell.src_x);
            assert_eq!(cell.age, 0);
        }
    }

    #[test]
    fn retarget_preserves_age_and_stroke_id() {
        let sidelen = 2;
        let mut sim = Simulation::new("t".into(), sidelen as f64, grid_positions(sidelen));
        sim.cells[0].age = 42;
        sim.cells[0].stroke_id = 7;
        sim.retarget(0, 1.0, 1.0, 0.5);
        assert_eq!(sim.cells[0].age, 42);
        assert_eq!(sim.cells[0].stroke_id, 7);
        assert_eq!(sim.cells[0].dst_force, 0.5);
    }
}
