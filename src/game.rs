//! Orchestrator entry points over the decision core. One [`Game`] owns the
//! grid and the agents and advances them a tick at a time: pursuers in fixed
//! order, then the evader. A catch during a pursuer's own move interrupts
//! the remainder of that tick. All randomness comes in through the caller's
//! generator so runs replay deterministically under a seeded source.

use rand::Rng;

use crate::evader::Evader;
use crate::grid::{Apple, Dir, Grid, Pos, PURSUER_COUNT};
use crate::mapgen::{build_level, generate_level, LevelError};
use crate::pursuer::Pursuer;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TickOutcome {
    Continue,
    /// A pursuer reached the evader's cell; later agents did not move.
    Caught { pursuer: usize },
    /// The evader has no free neighbor left; equivalent to a life lost.
    EvaderStuck,
    /// The apple layer is empty.
    LevelCleared,
}

#[derive(Clone, Copy, Debug)]
pub struct TickReport {
    pub eaten: Apple,
    pub outcome: TickOutcome,
}

pub struct Game {
    grid: Grid,
    pursuers: Vec<Pursuer>,
    evader: Evader,
    difficulty: u32,
}

impl Game {
    pub fn new(size: usize, difficulty: u32, rng: &mut impl Rng) -> Result<Self, LevelError> {
        let grid = generate_level(size, rng)?;
        let mut game = Self {
            grid,
            pursuers: (0..PURSUER_COUNT)
                .map(|i| Pursuer::new(i, difficulty, rng))
                .collect(),
            evader: Evader::new(),
            difficulty,
        };
        game.reset_agents(rng);
        Ok(game)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn pursuers(&self) -> &[Pursuer] {
        &self.pursuers
    }

    pub fn evader(&self) -> &Evader {
        &self.evader
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn is_level_complete(&self) -> bool {
        self.grid.is_cleared()
    }

    /// Spawn rule: pursuers onto the central block, the evader onto a random
    /// free cell away from them. States reset to their initial variant.
    /// Called on level start and after every life lost; eaten apples stay
    /// eaten.
    pub fn reset_agents(&mut self, rng: &mut impl Rng) -> ([Pos; PURSUER_COUNT], Pos) {
        let block = Grid::pursuer_spawn_block(self.grid.size());
        for (i, pursuer) in self.pursuers.iter_mut().enumerate() {
            pursuer.difficulty = self.difficulty;
            pursuer.reset(rng);
            pursuer.spawn_at(block[i]);
            self.grid.set_pursuer(i, block[i]);
        }

        self.evader.reset();
        // The spawn block is always free, so a spawn cell always exists.
        let spawn = self.grid.random_spawn(rng).unwrap_or(block[0]);
        self.evader.spawn_at(spawn);
        self.grid.set_evader(spawn, Dir::default());

        (block, spawn)
    }

    /// Fresh connected map at the next difficulty step.
    pub fn next_level(&mut self, rng: &mut impl Rng) {
        self.difficulty += 1;
        self.regenerate(rng);
    }

    /// Fresh map at the current difficulty, e.g. after a game over.
    pub fn restart(&mut self, rng: &mut impl Rng) {
        self.regenerate(rng);
    }

    fn regenerate(&mut self, rng: &mut impl Rng) {
        let size = self.grid.size();
        self.grid = build_level(size, rng);
        self.reset_agents(rng);
    }

    /// Advances one tick: every pursuer in order, then the evader. A catch
    /// stops the tick immediately; nobody after the catching pursuer moves.
    pub fn tick(&mut self, rng: &mut impl Rng) -> TickReport {
        for i in 0..self.pursuers.len() {
            let step = self.pursuers[i].tick(&mut self.grid, rng);
            if step.caught {
                return TickReport {
                    eaten: Apple::None,
                    outcome: TickOutcome::Caught { pursuer: i },
                };
            }
        }

        let step = self.evader.tick(&mut self.grid);
        let outcome = if step.stuck {
            TickOutcome::EvaderStuck
        } else if self.grid.is_cleared() {
            TickOutcome::LevelCleared
        } else {
            TickOutcome::Continue
        };
        TickReport {
            eaten: step.eaten,
            outcome,
        }
    }
}
