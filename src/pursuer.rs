//! Pursuer behavior. Each pursuer owns a role fixed for its lifetime and a
//! current state from the same five-strategy set; the role only skews the
//! weighted transition roll taken when a state's countdown runs out. The
//! transition is evaluated once at the start of a tick, before the move
//! dispatch, and replaces the state wholesale.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::grid::{Dir, Grid, Pos};
use crate::path::breadth_first;

/// How far ahead of the evader the ambusher aims.
const AMBUSH_LOOKAHEAD: usize = 2;
/// How far along the evader's facing the cutter scans for a branch point.
const CUTOFF_SCAN: usize = 5;
/// Manhattan distance below which a shy pursuer retreats.
const SHY_FLEE_RADIUS: usize = 4;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PursuerRole {
    DirectChaser,
    Ambusher,
    PathCutter,
    Shy,
}

impl PursuerRole {
    /// Role assignment by pursuer index; out-of-range indices wrap, so any
    /// index yields a valid role.
    pub fn from_index(index: usize) -> Self {
        match index % 4 {
            0 => PursuerRole::DirectChaser,
            1 => PursuerRole::Ambusher,
            2 => PursuerRole::PathCutter,
            _ => PursuerRole::Shy,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Round-robin corner assignment; invalid indices wrap rather than error.
    pub fn from_index(index: usize) -> Self {
        match index % 4 {
            0 => Corner::TopLeft,
            1 => Corner::TopRight,
            2 => Corner::BottomLeft,
            _ => Corner::BottomRight,
        }
    }

    fn cell(self, size: usize) -> Pos {
        match self {
            Corner::TopLeft => Pos::new(1, 1),
            Corner::TopRight => Pos::new(1, size - 2),
            Corner::BottomLeft => Pos::new(size - 2, 1),
            Corner::BottomRight => Pos::new(size - 2, size - 2),
        }
    }
}

/// Behavior state. Replaced wholesale on every transition; the countdown and
/// previous-cell memory travel with the variant.
#[derive(Clone, Debug)]
pub enum PursuerState {
    Wandering { ticks_left: u32, prev: Option<Pos> },
    ChaseDirect { ticks_left: u32, prev: Option<Pos> },
    Ambush { ticks_left: u32, prev: Option<Pos> },
    CutOff { ticks_left: u32, prev: Option<Pos> },
    Shy { ticks_left: u32, prev: Option<Pos>, corner: Corner },
}

impl PursuerState {
    fn wandering(difficulty: u32, rng: &mut impl Rng) -> Self {
        // Higher difficulty shortens the idle stretches.
        let base = 10u32.saturating_sub(difficulty).max(4);
        PursuerState::Wandering {
            ticks_left: base + rng.gen_range(0..=4),
            prev: None,
        }
    }

    fn chase(difficulty: u32) -> Self {
        PursuerState::ChaseDirect {
            ticks_left: (5 + difficulty).min(9),
            prev: None,
        }
    }

    fn ambush(difficulty: u32) -> Self {
        PursuerState::Ambush {
            ticks_left: (4 + difficulty).min(8),
            prev: None,
        }
    }

    fn cutoff(difficulty: u32) -> Self {
        PursuerState::CutOff {
            ticks_left: (4 + difficulty).min(8),
            prev: None,
        }
    }

    fn shy(difficulty: u32, corner: Corner) -> Self {
        PursuerState::Shy {
            ticks_left: (5 + difficulty).min(9),
            prev: None,
            corner,
        }
    }

    fn ticks_left(&self) -> u32 {
        match self {
            PursuerState::Wandering { ticks_left, .. }
            | PursuerState::ChaseDirect { ticks_left, .. }
            | PursuerState::Ambush { ticks_left, .. }
            | PursuerState::CutOff { ticks_left, .. }
            | PursuerState::Shy { ticks_left, .. } => *ticks_left,
        }
    }

    fn tick_down(&mut self) {
        match self {
            PursuerState::Wandering { ticks_left, .. }
            | PursuerState::ChaseDirect { ticks_left, .. }
            | PursuerState::Ambush { ticks_left, .. }
            | PursuerState::CutOff { ticks_left, .. }
            | PursuerState::Shy { ticks_left, .. } => *ticks_left = ticks_left.saturating_sub(1),
        }
    }

    fn set_prev(&mut self, pos: Pos) {
        match self {
            PursuerState::Wandering { prev, .. }
            | PursuerState::ChaseDirect { prev, .. }
            | PursuerState::Ambush { prev, .. }
            | PursuerState::CutOff { prev, .. }
            | PursuerState::Shy { prev, .. } => *prev = Some(pos),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Strategy {
    Wander,
    Chase,
    Ambush,
    CutOff,
    Shy,
}

/// Result of one pursuer tick, read by the orchestrator.
#[derive(Clone, Copy, Debug)]
pub struct PursuerStep {
    pub pos: Pos,
    pub dir: Dir,
    pub caught: bool,
}

pub struct Pursuer {
    index: usize,
    role: PursuerRole,
    pub difficulty: u32,
    pub pos: Pos,
    pub dir: Dir,
    state: PursuerState,
}

impl Pursuer {
    pub fn new(index: usize, difficulty: u32, rng: &mut impl Rng) -> Self {
        Self {
            index,
            role: PursuerRole::from_index(index),
            difficulty,
            pos: Pos::new(0, 0),
            dir: Dir::default(),
            state: PursuerState::wandering(difficulty, rng),
        }
    }

    pub fn role(&self) -> PursuerRole {
        self.role
    }

    pub fn state(&self) -> &PursuerState {
        &self.state
    }

    /// Back to the initial variant; positions are assigned separately by the
    /// spawn rule.
    pub fn reset(&mut self, rng: &mut impl Rng) {
        self.dir = Dir::default();
        self.state = PursuerState::wandering(self.difficulty, rng);
    }

    pub fn spawn_at(&mut self, pos: Pos) {
        self.pos = pos;
    }

    /// Advances this pursuer one tick: possible state transition, one step of
    /// the active strategy, then the catch check.
    pub fn tick(&mut self, grid: &mut Grid, rng: &mut impl Rng) -> PursuerStep {
        if self.state.ticks_left() == 0 {
            self.state = self.next_state(rng);
        }

        let old = self.pos;
        let next = match &self.state {
            PursuerState::Wandering { prev, .. } => self.wander_step(grid, rng, *prev),
            PursuerState::ChaseDirect { .. } => self.path_step(grid, grid.evader_pos()),
            PursuerState::Ambush { .. } => {
                let target = ahead_of_evader(grid, AMBUSH_LOOKAHEAD);
                self.path_step(grid, target)
            }
            PursuerState::CutOff { .. } => {
                let target = cut_point(grid);
                self.path_step(grid, target)
            }
            PursuerState::Shy { corner, .. } => self.shy_step(grid, rng, *corner),
        };

        if let Some(new) = next {
            if let Some(dir) = Dir::between(old, new) {
                self.dir = dir;
            }
            self.pos = new;
        }
        self.state.tick_down();
        self.state.set_prev(old);
        grid.set_pursuer(self.index, self.pos);

        PursuerStep {
            pos: self.pos,
            dir: self.dir,
            caught: self.pos.manhattan(grid.evader_pos()) == 0,
        }
    }

    /// Random free neighbor; the previous cell is excluded when at least one
    /// alternative exists, but remains usable as a last resort.
    fn wander_step(&self, grid: &Grid, rng: &mut impl Rng, prev: Option<Pos>) -> Option<Pos> {
        let mut neighbors = grid.pursuer_neighbors(self.pos);
        if let Some(prev) = prev {
            if neighbors.len() > 1 && neighbors.contains(&prev) {
                neighbors.retain(|&p| p != prev);
            }
        }
        neighbors.choose(rng).copied()
    }

    /// Second cell of the unweighted shortest path to `target` (the first is
    /// the current position). `None` when no path exists.
    fn path_step(&self, grid: &Grid, target: Pos) -> Option<Pos> {
        let path = breadth_first(self.pos, target, |p| grid.pursuer_neighbors(p));
        (path.len() > 1).then(|| path[1])
    }

    fn shy_step(&self, grid: &Grid, rng: &mut impl Rng, corner: Corner) -> Option<Pos> {
        let distance = self.pos.manhattan(grid.evader_pos());
        let target = if distance <= SHY_FLEE_RADIUS {
            corner_target(grid, corner)
        } else if rng.gen::<f64>() < 0.5 {
            grid.evader_pos()
        } else {
            return grid.pursuer_neighbors(self.pos).choose(rng).copied();
        };
        self.path_step(grid, target)
    }

    /// Weighted transition roll. Every role keeps a nonzero weight on every
    /// strategy; the signature strategy and difficulty dominate the rest.
    fn next_state(&self, rng: &mut impl Rng) -> PursuerState {
        let d = self.difficulty.max(1);
        let wander = 5u32.saturating_sub(d).max(1);
        let minor = 1 + d / 2;

        let weights: [(Strategy, u32); 5] = match self.role {
            PursuerRole::DirectChaser => [
                (Strategy::Chase, 3 + d),
                (Strategy::Ambush, minor),
                (Strategy::CutOff, minor),
                (Strategy::Wander, wander),
                (Strategy::Shy, 1),
            ],
            PursuerRole::Ambusher => [
                (Strategy::Ambush, 3 + d),
                (Strategy::Chase, minor),
                (Strategy::CutOff, minor),
                (Strategy::Wander, wander),
                (Strategy::Shy, 1),
            ],
            PursuerRole::PathCutter => [
                (Strategy::CutOff, 3 + d),
                (Strategy::Ambush, minor),
                (Strategy::Chase, minor),
                (Strategy::Wander, wander),
                (Strategy::Shy, 1),
            ],
            PursuerRole::Shy => [
                (Strategy::Shy, 3 + d),
                (Strategy::Wander, wander),
                (Strategy::Chase, minor),
                (Strategy::Ambush, 1),
                (Strategy::CutOff, 1),
            ],
        };

        let &(choice, _) = weights
            .choose_weighted(rng, |&(_, w)| w)
            .expect("weights are nonzero");
        match choice {
            Strategy::Wander => PursuerState::wandering(d, rng),
            Strategy::Chase => PursuerState::chase(d),
            Strategy::Ambush => PursuerState::ambush(d),
            Strategy::CutOff => PursuerState::cutoff(d),
            Strategy::Shy => PursuerState::shy(d, Corner::from_index(self.index)),
        }
    }
}

/// Cell `k` steps ahead of the evader along its facing, shrinking `k` toward
/// 1 past walls and map edges; falls back to the evader's own cell.
fn ahead_of_evader(grid: &Grid, k: usize) -> Pos {
    let evader = grid.evader_pos();
    let (dr, dc) = grid.evader_dir().delta();
    for step in (1..=k as isize).rev() {
        let row = evader.row as isize + step * dr;
        let col = evader.col as isize + step * dc;
        if row >= 0 && col >= 0 {
            let pos = Pos::new(row as usize, col as usize);
            if grid.is_free(pos) {
                return pos;
            }
        }
    }
    evader
}

/// Walks up to [`CUTOFF_SCAN`] cells along the evader's facing and returns
/// the first branch point (three or more free neighbors), or the farthest
/// reachable cell on that ray.
fn cut_point(grid: &Grid) -> Pos {
    let (dr, dc) = grid.evader_dir().delta();
    let mut current = grid.evader_pos();
    for _ in 0..CUTOFF_SCAN {
        let row = current.row as isize + dr;
        let col = current.col as isize + dc;
        if row < 0 || col < 0 {
            break;
        }
        let next = Pos::new(row as usize, col as usize);
        if !grid.is_free(next) {
            break;
        }
        current = next;
        if grid.pursuer_neighbors(current).len() >= 3 {
            return current;
        }
    }
    current
}

/// The corner cell itself, or — when it is walled — the nearest free cell on
/// the diagonal from the corner toward the grid center. The center block is
/// always carved free, so the walk terminates.
fn corner_target(grid: &Grid, corner: Corner) -> Pos {
    let size = grid.size();
    let center = size / 2;
    let mut pos = corner.cell(size);
    while grid.is_wall(pos) && (pos.row != center || pos.col != center) {
        if pos.row < center {
            pos.row += 1;
        } else if pos.row > center {
            pos.row -= 1;
        }
        if pos.col < center {
            pos.col += 1;
        } else if pos.col > center {
            pos.col -= 1;
        }
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Apple;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bordered(size: usize) -> Grid {
        let mut walls = vec![vec![false; size]; size];
        for i in 0..size {
            walls[0][i] = true;
            walls[size - 1][i] = true;
            walls[i][0] = true;
            walls[i][size - 1] = true;
        }
        Grid::from_layers(walls, vec![vec![Apple::None; size]; size])
    }

    #[test]
    fn roles_wrap_by_index() {
        assert_eq!(PursuerRole::from_index(0), PursuerRole::DirectChaser);
        assert_eq!(PursuerRole::from_index(3), PursuerRole::Shy);
        assert_eq!(PursuerRole::from_index(7), PursuerRole::Shy);
    }

    #[test]
    fn wandering_never_reverses_with_alternatives() {
        let grid = bordered(9);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let mut pursuer = Pursuer::new(0, 1, &mut rng);
            pursuer.spawn_at(Pos::new(4, 4));
            let prev = Some(Pos::new(4, 3));
            let step = pursuer.wander_step(&grid, &mut rng, prev).unwrap();
            assert_ne!(step, Pos::new(4, 3));
        }
    }

    #[test]
    fn wandering_reverses_when_cornered() {
        // Dead end: the only exit is back where we came from.
        let mut walls = vec![vec![true; 7]; 7];
        walls[3][2] = false;
        walls[3][3] = false;
        let grid = Grid::from_layers(walls, vec![vec![Apple::None; 7]; 7]);
        let mut rng = StdRng::seed_from_u64(5);
        let pursuer = {
            let mut p = Pursuer::new(0, 1, &mut rng);
            p.spawn_at(Pos::new(3, 3));
            p
        };
        let step = pursuer
            .wander_step(&grid, &mut rng, Some(Pos::new(3, 2)))
            .unwrap();
        assert_eq!(step, Pos::new(3, 2));
    }

    #[test]
    fn chase_closes_distance_and_catches() {
        let mut grid = bordered(9);
        grid.set_evader(Pos::new(4, 5), Dir::Right);
        let mut rng = StdRng::seed_from_u64(9);
        let mut pursuer = Pursuer::new(0, 5, &mut rng);
        pursuer.spawn_at(Pos::new(4, 4));
        grid.set_pursuer(0, pursuer.pos);
        pursuer.state = PursuerState::chase(5);
        let step = pursuer.tick(&mut grid, &mut rng);
        assert_eq!(step.pos, Pos::new(4, 5));
        assert_eq!(step.dir, Dir::Right);
        assert!(step.caught);
    }

    #[test]
    fn no_catch_at_distance() {
        let mut grid = bordered(9);
        grid.set_evader(Pos::new(1, 1), Dir::Right);
        let mut rng = StdRng::seed_from_u64(2);
        let mut pursuer = Pursuer::new(0, 5, &mut rng);
        pursuer.spawn_at(Pos::new(6, 6));
        grid.set_pursuer(0, pursuer.pos);
        pursuer.state = PursuerState::chase(5);
        let step = pursuer.tick(&mut grid, &mut rng);
        assert!(!step.caught);
    }

    #[test]
    fn ambush_shrinks_past_walls() {
        // Evader at (1,1) facing right, wall two cells ahead.
        let mut grid = bordered(9);
        grid.set_evader(Pos::new(1, 1), Dir::Right);
        let full = ahead_of_evader(&grid, 2);
        assert_eq!(full, Pos::new(1, 3));

        let mut walls = vec![vec![false; 9]; 9];
        for i in 0..9 {
            walls[0][i] = true;
            walls[8][i] = true;
            walls[i][0] = true;
            walls[i][8] = true;
        }
        walls[1][3] = true;
        let mut blocked = Grid::from_layers(walls, vec![vec![Apple::None; 9]; 9]);
        blocked.set_evader(Pos::new(1, 1), Dir::Right);
        assert_eq!(ahead_of_evader(&blocked, 2), Pos::new(1, 2));
    }

    #[test]
    fn ambush_shrink_at_the_map_edge() {
        // Borderless layout: evader in the corner facing east, wall two
        // cells ahead. The target degrades to one cell ahead and is never
        // out of bounds or a wall.
        let mut walls = vec![vec![false; 5]; 5];
        walls[0][2] = true;
        let mut grid = Grid::from_layers(walls, vec![vec![Apple::None; 5]; 5]);
        grid.set_evader(Pos::new(0, 0), Dir::Right);
        assert_eq!(ahead_of_evader(&grid, 2), Pos::new(0, 1));

        // Facing straight out of the map: fall back to the evader's cell.
        grid.set_evader(Pos::new(0, 0), Dir::Up);
        assert_eq!(ahead_of_evader(&grid, 2), Pos::new(0, 0));
    }

    #[test]
    fn ambush_falls_back_to_evader_cell() {
        // Facing the border wall: every lookahead cell is blocked.
        let mut grid = bordered(9);
        grid.set_evader(Pos::new(1, 1), Dir::Left);
        assert_eq!(ahead_of_evader(&grid, 2), Pos::new(1, 1));
    }

    #[test]
    fn cut_point_prefers_branch_points() {
        // Open interior: the first cell ahead already branches 4 ways.
        let mut grid = bordered(9);
        grid.set_evader(Pos::new(4, 2), Dir::Right);
        assert_eq!(cut_point(&grid), Pos::new(4, 3));
    }

    #[test]
    fn cut_point_stops_at_ray_end() {
        // Corridor without branches: target is the farthest reachable cell.
        let mut walls = vec![vec![true; 9]; 9];
        for col in 1..6 {
            walls[4][col] = false;
        }
        let mut grid = Grid::from_layers(walls, vec![vec![Apple::None; 9]; 9]);
        grid.set_evader(Pos::new(4, 1), Dir::Right);
        assert_eq!(cut_point(&grid), Pos::new(4, 5));
    }

    #[test]
    fn corner_walk_finds_a_free_cell() {
        let mut walls = vec![vec![true; 12]; 12];
        // Only the center block is open.
        for pos in Grid::pursuer_spawn_block(12) {
            walls[pos.row][pos.col] = false;
        }
        let grid = Grid::from_layers(walls, vec![vec![Apple::None; 12]; 12]);
        for corner in [
            Corner::TopLeft,
            Corner::TopRight,
            Corner::BottomLeft,
            Corner::BottomRight,
        ] {
            assert!(grid.is_free(corner_target(&grid, corner)));
        }
    }

    #[test]
    fn countdown_expiry_triggers_a_transition() {
        let mut grid = bordered(9);
        grid.set_evader(Pos::new(7, 7), Dir::Right);
        let mut rng = StdRng::seed_from_u64(17);
        let mut pursuer = Pursuer::new(3, 9, &mut rng);
        pursuer.spawn_at(Pos::new(2, 2));
        grid.set_pursuer(3, pursuer.pos);

        let mut saw_non_wandering = false;
        for _ in 0..100 {
            pursuer.tick(&mut grid, &mut rng);
            if !matches!(pursuer.state(), PursuerState::Wandering { .. }) {
                saw_non_wandering = true;
                break;
            }
        }
        assert!(saw_non_wandering, "pursuer never left its initial state");
    }
}
