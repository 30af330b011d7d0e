//! Desirability scoring for the evader. Lower is safer: the score combines
//! pursuer danger, how boxed-in a cell is, apple scarcity around it, and a
//! discount for cells that hold food. The evader uses it both as the edge
//! weight of its weighted search and as the tie-break in apple selection.

use std::collections::HashSet;

use crate::grid::{Apple, Grid, Pos};

/// Sentinel returned for wall cells.
pub const WALL_COST: f64 = 1e8;

const DANGER_RADIUS: usize = 2;
const NEARBY_PURSUER_PENALTY: f64 = 10.0;
const SMALL_APPLE_DISCOUNT: f64 = 1.25;
const BIG_APPLE_DISCOUNT: f64 = 1.5;

/// Breadth-limited search horizon for "apples reachable from here".
pub const APPLE_SEARCH_DEPTH: usize = 5;

pub struct CostField<'a> {
    grid: &'a Grid,
}

impl<'a> CostField<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Self { grid }
    }

    pub fn cost(&self, pos: Pos) -> f64 {
        if self.grid.is_wall(pos) {
            return WALL_COST;
        }

        let mut cost = 0.0;

        for &pursuer in self.grid.pursuer_positions() {
            cost += 2.0 / (pursuer.manhattan(pos) as f64 + 1.0);
        }

        let nearby = self.grid.pursuers_within(pos, DANGER_RADIUS);
        cost += NEARBY_PURSUER_PENALTY * nearby as f64;

        // Being boxed in only matters while a pursuer is close enough to
        // exploit it.
        if nearby > 0 {
            cost += 0.5 / (self.grid.free_neighbors(pos).len() as f64 + 1.0);
        }

        cost += 1.0 / (self.reachable_apples(pos).len() as f64 + 1.0);

        match self.grid.apple_at(pos) {
            Apple::Small => cost /= SMALL_APPLE_DISCOUNT,
            Apple::Big => cost /= BIG_APPLE_DISCOUNT,
            Apple::None => {}
        }

        cost
    }

    /// Apple cells reachable within [`APPLE_SEARCH_DEPTH`] steps of `from`,
    /// walking the evader's view of the grid. The starting cell itself is not
    /// reported.
    pub fn reachable_apples(&self, from: Pos) -> Vec<Pos> {
        let mut visited = HashSet::from([from]);
        let mut frontier = vec![from];
        let mut apples = Vec::new();

        for _ in 0..APPLE_SEARCH_DEPTH {
            let mut next_frontier = Vec::new();
            for &current in &frontier {
                for neighbor in self.grid.free_neighbors(current) {
                    if visited.insert(neighbor) {
                        if self.grid.apple_at(neighbor) != Apple::None {
                            apples.push(neighbor);
                        }
                        next_frontier.push(neighbor);
                    }
                }
            }
            frontier = next_frontier;
        }

        apples
    }
}
