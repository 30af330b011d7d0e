use rand::seq::SliceRandom;
use rand::Rng;

/// Smallest grid the generator can fill with tetromino drops.
pub const MIN_GRID_SIZE: usize = 8;
/// Number of pursuers per level.
pub const PURSUER_COUNT: usize = 4;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn manhattan(self, other: Pos) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

    pub fn delta(self) -> (isize, isize) {
        match self {
            Dir::Up => (-1, 0),
            Dir::Down => (1, 0),
            Dir::Left => (0, -1),
            Dir::Right => (0, 1),
        }
    }

    /// Direction of a single-cell step, or `None` when the cells are not
    /// 4-adjacent (no move, or a jump).
    pub fn between(from: Pos, to: Pos) -> Option<Dir> {
        let dr = to.row as isize - from.row as isize;
        let dc = to.col as isize - from.col as isize;
        Dir::ALL.into_iter().find(|d| d.delta() == (dr, dc))
    }
}

impl Default for Dir {
    fn default() -> Self {
        Dir::Right
    }
}

/// One cell of the apple layer.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Apple {
    #[default]
    None,
    Small,
    Big,
}

/// Wall layout and apple layer of one level, plus the live agent positions.
///
/// The grid is the single shared resource of a tick: behaviors read walls,
/// apples and opposing agent positions through the query methods here, and
/// write back only their own position (and, for the evader, the apple cell it
/// lands on).
#[derive(Clone, Debug)]
pub struct Grid {
    size: usize,
    walls: Vec<Vec<bool>>,
    apples: Vec<Vec<Apple>>,
    pursuers: [Pos; PURSUER_COUNT],
    evader: Pos,
    evader_dir: Dir,
}

impl Grid {
    pub fn from_layers(walls: Vec<Vec<bool>>, apples: Vec<Vec<Apple>>) -> Self {
        let size = walls.len();
        debug_assert!(walls.iter().all(|r| r.len() == size));
        debug_assert_eq!(apples.len(), size);
        Self {
            size,
            walls,
            apples,
            // Inert until the orchestrator spawns agents: the default cell is
            // a border wall, which no neighbor query can return anyway.
            pursuers: [Pos::new(0, 0); PURSUER_COUNT],
            evader: Pos::new(0, 0),
            evader_dir: Dir::default(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.row < self.size && pos.col < self.size
    }

    pub fn is_wall(&self, pos: Pos) -> bool {
        !self.in_bounds(pos) || self.walls[pos.row][pos.col]
    }

    pub fn is_free(&self, pos: Pos) -> bool {
        self.in_bounds(pos) && !self.walls[pos.row][pos.col]
    }

    pub fn apple_at(&self, pos: Pos) -> Apple {
        self.apples[pos.row][pos.col]
    }

    /// Clears and returns the apple at `pos`. Eaten apples never come back.
    pub fn take_apple(&mut self, pos: Pos) -> Apple {
        std::mem::take(&mut self.apples[pos.row][pos.col])
    }

    /// Level-complete condition: the apple layer is entirely empty.
    pub fn is_cleared(&self) -> bool {
        self.apples
            .iter()
            .all(|row| row.iter().all(|&a| a == Apple::None))
    }

    pub fn apple_cells(&self) -> Vec<Pos> {
        let mut cells = Vec::new();
        for row in 0..self.size {
            for col in 0..self.size {
                if self.apples[row][col] != Apple::None {
                    cells.push(Pos::new(row, col));
                }
            }
        }
        cells
    }

    fn adjacent(&self, pos: Pos) -> impl Iterator<Item = Pos> + '_ {
        Dir::ALL.into_iter().filter_map(move |dir| {
            let (dr, dc) = dir.delta();
            let row = pos.row.checked_add_signed(dr)?;
            let col = pos.col.checked_add_signed(dc)?;
            let next = Pos::new(row, col);
            self.in_bounds(next).then_some(next)
        })
    }

    /// Free neighbors as the evader sees them: walls, pursuer-occupied cells
    /// and the evader's own cell are all impassable.
    pub fn free_neighbors(&self, pos: Pos) -> Vec<Pos> {
        self.adjacent(pos)
            .filter(|&n| !self.walls[n.row][n.col])
            .filter(|&n| !self.pursuers.contains(&n) && n != self.evader)
            .collect()
    }

    /// Free neighbors as a pursuer sees them: only walls block. Pursuers may
    /// share cells with each other and walk onto the evader (that is the
    /// catch).
    pub fn pursuer_neighbors(&self, pos: Pos) -> Vec<Pos> {
        self.adjacent(pos)
            .filter(|&n| !self.walls[n.row][n.col])
            .collect()
    }

    pub fn pursuer_positions(&self) -> &[Pos; PURSUER_COUNT] {
        &self.pursuers
    }

    pub fn set_pursuer(&mut self, index: usize, pos: Pos) {
        self.pursuers[index] = pos;
    }

    pub fn pursuers_within(&self, pos: Pos, radius: usize) -> usize {
        self.pursuers
            .iter()
            .filter(|g| g.manhattan(pos) <= radius)
            .count()
    }

    pub fn evader_pos(&self) -> Pos {
        self.evader
    }

    pub fn evader_dir(&self) -> Dir {
        self.evader_dir
    }

    pub fn set_evader(&mut self, pos: Pos, dir: Dir) {
        self.evader = pos;
        self.evader_dir = dir;
    }

    /// The fixed central block the pursuers spawn into.
    pub fn pursuer_spawn_block(size: usize) -> [Pos; PURSUER_COUNT] {
        let c = size / 2 - 1;
        [
            Pos::new(c, c),
            Pos::new(c + 1, c),
            Pos::new(c, c + 1),
            Pos::new(c + 1, c + 1),
        ]
    }

    /// Uniformly random free cell that no pursuer occupies, for the evader
    /// spawn. Falls back to any free cell on degenerate maps.
    pub fn random_spawn(&self, rng: &mut impl Rng) -> Option<Pos> {
        let mut cells = Vec::new();
        for row in 0..self.size {
            for col in 0..self.size {
                let pos = Pos::new(row, col);
                if !self.walls[row][col] && !self.pursuers.contains(&pos) {
                    cells.push(pos);
                }
            }
        }
        if cells.is_empty() {
            for row in 0..self.size {
                for col in 0..self.size {
                    if !self.walls[row][col] {
                        cells.push(Pos::new(row, col));
                    }
                }
            }
        }
        cells.choose(rng).copied()
    }
}
