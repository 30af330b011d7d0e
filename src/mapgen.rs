//! Procedural level generation. A half-size sub-grid is filled by dropping
//! tetromino-shaped free-cell clusters under gravity, mirrored twice into a
//! symmetric full-size layout, then patched up: pursuer spawn room, solid
//! border, and an L-corridor repair pass that joins stray free regions into
//! one connected component. Generation retries a bounded number of times and
//! accepts its last attempt with a warning if connectivity never holds.

use std::cmp::Ordering;
use std::collections::VecDeque;

use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::grid::{Apple, Grid, Pos, MIN_GRID_SIZE};

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("grid size must be at least {MIN_GRID_SIZE}, got {0}")]
    SizeTooSmall(usize),
}

/// The seven cluster shapes dropped into the sub-grid. A `1` becomes a free
/// cell.
const SHAPES: [&[&[u8]]; 7] = [
    &[&[1, 1, 1, 1]],
    &[&[1, 1], &[1, 1]],
    &[&[1, 1, 0], &[0, 1, 1]],
    &[&[0, 1, 1], &[1, 1, 0]],
    &[&[1, 0], &[1, 0], &[1, 1]],
    &[&[0, 1], &[0, 1], &[1, 1]],
    &[&[1, 0], &[1, 1], &[0, 1]],
];

/// Consecutive failed drops before the sub-grid counts as full.
const MAX_PLACEMENT_FAILURES: u32 = 10;
/// Full generation attempts before accepting a possibly-disconnected map.
const MAX_GENERATION_TRIES: u32 = 8;
/// Share of dead ends upgraded to big apples.
const BIG_APPLE_SHARE: usize = 4;

/// Builds a fresh level: connected wall layout plus a full apple layer.
/// This is the `generateLevel` entry point.
pub fn generate_level(size: usize, rng: &mut impl Rng) -> Result<Grid, LevelError> {
    if size < MIN_GRID_SIZE {
        return Err(LevelError::SizeTooSmall(size));
    }
    Ok(build_level(size, rng))
}

/// Infallible inner build for callers that already validated `size`.
pub(crate) fn build_level(size: usize, rng: &mut impl Rng) -> Grid {
    let generator = MapGenerator::new(size);
    let walls = generator.generate(rng);
    let apples = apple_layer(&walls, rng);
    Grid::from_layers(walls, apples)
}

pub struct MapGenerator {
    size: usize,
    half: usize,
}

impl MapGenerator {
    pub fn new(size: usize) -> Self {
        Self { size, half: size / 2 }
    }

    /// Produces a wall layout whose free cells form a single connected
    /// component with high probability. Connectivity is best-effort: after
    /// the retry bound the last attempt is returned as-is and a warning is
    /// logged, so callers must tolerate an occasional imperfect map.
    pub fn generate(&self, rng: &mut impl Rng) -> Vec<Vec<bool>> {
        let mut last = self.build_candidate(rng);
        for _ in 1..MAX_GENERATION_TRIES {
            if is_fully_connected(&last) {
                return last;
            }
            last = self.build_candidate(rng);
        }
        if !is_fully_connected(&last) {
            warn!(
                "map generation did not converge to a single free region in {} tries",
                MAX_GENERATION_TRIES
            );
        }
        last
    }

    fn build_candidate(&self, rng: &mut impl Rng) -> Vec<Vec<bool>> {
        let mut walls = vec![vec![true; self.size]; self.size];

        let sub = self.simulate_drops(rng);
        self.mirror_into(&sub, &mut walls);

        for pos in Grid::pursuer_spawn_block(self.size) {
            walls[pos.row][pos.col] = false;
        }
        for i in 0..self.size {
            walls[0][i] = true;
            walls[self.size - 1][i] = true;
            walls[i][0] = true;
            walls[i][self.size - 1] = true;
        }

        join_components(&mut walls);
        walls
    }

    /// Gravity simulation over the half-size sub-grid: random shapes fall at
    /// random columns until placement fails often enough in a row.
    fn simulate_drops(&self, rng: &mut impl Rng) -> Vec<Vec<bool>> {
        let mut tile = vec![vec![false; self.half]; self.half];
        let mut failures = 0;
        while failures < MAX_PLACEMENT_FAILURES {
            let shape = SHAPES.choose(rng).unwrap();
            let width = shape[0].len();
            if width > self.half {
                failures += 1;
                continue;
            }
            let col = rng.gen_range(0..=self.half - width);
            if self.drop_shape(&mut tile, shape, col) {
                failures = 0;
            } else {
                failures += 1;
            }
        }
        tile
    }

    /// Lets `shape` fall from the top at `col`: it descends while the next
    /// row down is collision-free and rests on the floor or on a prior shape.
    fn drop_shape(&self, tile: &mut [Vec<bool>], shape: &[&[u8]], col: usize) -> bool {
        if !can_place(tile, shape, 0, col) {
            return false;
        }
        let mut row = 0;
        while row + shape.len() < self.half && can_place(tile, shape, row + 1, col) {
            row += 1;
        }
        for (r, shape_row) in shape.iter().enumerate() {
            for (c, &cell) in shape_row.iter().enumerate() {
                if cell == 1 {
                    tile[row + r][col + c] = true;
                }
            }
        }
        true
    }

    /// Mirrors the carved sub-grid horizontally then vertically. For odd
    /// sizes the final row/column stays wall; the border pass covers it.
    fn mirror_into(&self, sub: &[Vec<bool>], walls: &mut [Vec<bool>]) {
        let span = 2 * self.half;
        for r in 0..self.half {
            for c in 0..self.half {
                if sub[r][c] {
                    walls[r][c] = false;
                    walls[r][span - 1 - c] = false;
                    walls[span - 1 - r][c] = false;
                    walls[span - 1 - r][span - 1 - c] = false;
                }
            }
        }
    }
}

fn can_place(tile: &[Vec<bool>], shape: &[&[u8]], row: usize, col: usize) -> bool {
    if row + shape.len() > tile.len() || col + shape[0].len() > tile.len() {
        return false;
    }
    for (r, shape_row) in shape.iter().enumerate() {
        for (c, &cell) in shape_row.iter().enumerate() {
            if cell == 1 && tile[row + r][col + c] {
                return false;
            }
        }
    }
    true
}

/// Flood-fill labels every free component; when more than one exists, sorts
/// them by centroid and joins each consecutive pair with an L-shaped corridor
/// between their closest cells.
fn join_components(walls: &mut [Vec<bool>]) {
    let mut components = free_components(walls);
    if components.len() <= 1 {
        return;
    }
    components.sort_by(|a, b| {
        centroid(a)
            .partial_cmp(&centroid(b))
            .unwrap_or(Ordering::Equal)
    });

    for i in 1..components.len() {
        let (a, b) = closest_pair(&components[i - 1], &components[i]);
        // First leg along rows in a's column, second along columns in b's row;
        // the legs meet at (b.row, a.col).
        for row in a.row.min(b.row)..=a.row.max(b.row) {
            walls[row][a.col] = false;
        }
        for col in a.col.min(b.col)..=a.col.max(b.col) {
            walls[b.row][col] = false;
        }
    }
}

fn closest_pair(block_a: &[Pos], block_b: &[Pos]) -> (Pos, Pos) {
    let mut best = (block_a[0], block_b[0]);
    let mut best_dist = usize::MAX;
    for &a in block_a {
        for &b in block_b {
            let dist = a.manhattan(b);
            if dist < best_dist {
                best_dist = dist;
                best = (a, b);
            }
        }
    }
    best
}

fn centroid(block: &[Pos]) -> (f64, f64) {
    let n = block.len() as f64;
    let rows: usize = block.iter().map(|p| p.row).sum();
    let cols: usize = block.iter().map(|p| p.col).sum();
    (rows as f64 / n, cols as f64 / n)
}

fn free_components(walls: &[Vec<bool>]) -> Vec<Vec<Pos>> {
    let size = walls.len();
    let mut visited = vec![vec![false; size]; size];
    let mut components = Vec::new();

    for row in 0..size {
        for col in 0..size {
            if walls[row][col] || visited[row][col] {
                continue;
            }
            let mut block = Vec::new();
            let mut queue = VecDeque::from([Pos::new(row, col)]);
            visited[row][col] = true;
            while let Some(pos) = queue.pop_front() {
                block.push(pos);
                for (nr, nc) in neighbors4(pos, size) {
                    if !walls[nr][nc] && !visited[nr][nc] {
                        visited[nr][nc] = true;
                        queue.push_back(Pos::new(nr, nc));
                    }
                }
            }
            components.push(block);
        }
    }
    components
}

fn neighbors4(pos: Pos, size: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(4);
    if pos.row > 0 {
        out.push((pos.row - 1, pos.col));
    }
    if pos.row + 1 < size {
        out.push((pos.row + 1, pos.col));
    }
    if pos.col > 0 {
        out.push((pos.row, pos.col - 1));
    }
    if pos.col + 1 < size {
        out.push((pos.row, pos.col + 1));
    }
    out
}

pub(crate) fn is_fully_connected(walls: &[Vec<bool>]) -> bool {
    let components = free_components(walls);
    components.len() == 1
}

/// Every free cell starts with a small apple; a quarter of the dead ends
/// (minimum one) get a big apple instead, rewarding harder-to-reach
/// geometry.
fn apple_layer(walls: &[Vec<bool>], rng: &mut impl Rng) -> Vec<Vec<Apple>> {
    let size = walls.len();
    let mut apples = vec![vec![Apple::None; size]; size];
    for row in 0..size {
        for col in 0..size {
            if !walls[row][col] {
                apples[row][col] = Apple::Small;
            }
        }
    }

    let dead_ends = find_dead_ends(walls);
    if !dead_ends.is_empty() {
        let count = (dead_ends.len() / BIG_APPLE_SHARE).max(1);
        for pos in dead_ends.choose_multiple(rng, count) {
            apples[pos.row][pos.col] = Apple::Big;
        }
    }
    apples
}

/// Free cells with exactly one free neighbor.
fn find_dead_ends(walls: &[Vec<bool>]) -> Vec<Pos> {
    let size = walls.len();
    let mut dead_ends = Vec::new();
    for row in 0..size {
        for col in 0..size {
            if walls[row][col] {
                continue;
            }
            let free = neighbors4(Pos::new(row, col), size)
                .into_iter()
                .filter(|&(r, c)| !walls[r][c])
                .count();
            if free == 1 {
                dead_ends.push(Pos::new(row, col));
            }
        }
    }
    dead_ends
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rejects_tiny_sizes() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            generate_level(7, &mut rng),
            Err(LevelError::SizeTooSmall(7))
        ));
    }

    #[test]
    fn free_region_is_connected_across_seeds() {
        // The L-corridor repair makes disconnection rare; the contract only
        // promises 95% over many trials.
        let trials = 100;
        let mut connected = 0;
        for seed in 0..trials {
            let mut rng = StdRng::seed_from_u64(seed);
            let generator = MapGenerator::new(20);
            if is_fully_connected(&generator.generate(&mut rng)) {
                connected += 1;
            }
        }
        assert!(
            connected * 100 >= trials * 95,
            "only {connected}/{trials} connected"
        );
    }

    #[test]
    fn l_corridor_joins_two_regions() {
        // Two free pockets separated by solid wall.
        let mut walls = vec![vec![true; 9]; 9];
        walls[1][1] = false;
        walls[1][2] = false;
        walls[7][6] = false;
        walls[7][7] = false;
        join_components(&mut walls);
        assert!(is_fully_connected(&walls));
    }

    #[test]
    fn spawn_block_is_carved_free() {
        let mut rng = StdRng::seed_from_u64(11);
        let generator = MapGenerator::new(20);
        let walls = generator.generate(&mut rng);
        for pos in Grid::pursuer_spawn_block(20) {
            assert!(!walls[pos.row][pos.col]);
        }
    }

    #[test]
    fn dead_end_detection() {
        // A single corridor: both ends are dead ends, the middle is not.
        let mut walls = vec![vec![true; 7]; 7];
        walls[3][1] = false;
        walls[3][2] = false;
        walls[3][3] = false;
        let dead_ends = find_dead_ends(&walls);
        assert_eq!(dead_ends.len(), 2);
        assert!(dead_ends.contains(&Pos::new(3, 1)));
        assert!(dead_ends.contains(&Pos::new(3, 3)));
    }

    proptest! {
        #[test]
        fn generated_levels_hold_their_invariants(
            size in 8usize..33,
            seed in 0u64..500,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = build_level(size, &mut rng);

            // Border cells are always walls.
            for i in 0..size {
                prop_assert!(grid.is_wall(Pos::new(0, i)));
                prop_assert!(grid.is_wall(Pos::new(size - 1, i)));
                prop_assert!(grid.is_wall(Pos::new(i, 0)));
                prop_assert!(grid.is_wall(Pos::new(i, size - 1)));
            }

            // Apple cells are exactly the free cells, and at least one big
            // apple exists whenever the layout has a dead end.
            let mut big = 0;
            for row in 0..size {
                for col in 0..size {
                    let pos = Pos::new(row, col);
                    match grid.apple_at(pos) {
                        Apple::None => prop_assert!(grid.is_wall(pos)),
                        Apple::Small => prop_assert!(grid.is_free(pos)),
                        Apple::Big => {
                            prop_assert!(grid.is_free(pos));
                            big += 1;
                        }
                    }
                }
            }
            let walls: Vec<Vec<bool>> = (0..size)
                .map(|r| (0..size).map(|c| grid.is_wall(Pos::new(r, c))).collect())
                .collect();
            if !find_dead_ends(&walls).is_empty() {
                prop_assert!(big >= 1);
            }
        }
    }
}
