//! Decision core for a grid-based chase game: four pursuers hunt a single
//! apple-eating evader through a procedurally generated maze.
//!
//! The crate is split along the three algorithmic subsystems:
//!
//! - `mapgen`: tetromino-drop maze generation with mirror symmetry and an
//!   L-corridor connectivity repair pass
//! - `path` + `cost`: the search substrate (breadth-first and cost-weighted
//!   shortest path) and the evader's desirability field
//! - `pursuer` + `evader`: the per-tick agent behaviors
//!
//! `game` ties them together behind the orchestrator entry points. Rendering,
//! input and score/lives bookkeeping live outside the core; the bundled
//! binary is one such front end.
//!
//! All randomness is drawn from a caller-supplied generator, so a seeded
//! source replays a run exactly.

pub mod cost;
pub mod evader;
pub mod game;
pub mod grid;
pub mod mapgen;
pub mod path;
pub mod pursuer;

pub use cost::CostField;
pub use evader::{Evader, EvaderStep};
pub use game::{Game, TickOutcome, TickReport};
pub use grid::{Apple, Dir, Grid, Pos, MIN_GRID_SIZE, PURSUER_COUNT};
pub use mapgen::{generate_level, LevelError, MapGenerator};
pub use pursuer::{Pursuer, PursuerRole, PursuerState, PursuerStep};
