use std::io::{self, Stdout, Write};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{ExecutableCommand, QueueableCommand};
use rand::rngs::ThreadRng;
use unicode_width::UnicodeWidthStr;

use applechase::{Apple, Game, Pos, PursuerRole, TickOutcome};

const DEFAULT_GRID_SIZE: usize = 20;
const DEFAULT_DIFFICULTY: u32 = 5;
const DEFAULT_TICK_MS: u64 = 180;
const DEFAULT_RENDER_FPS: u64 = 60;
const LIVES: u32 = 5;
const SMALL_APPLE_SCORE: u32 = 10;
const BIG_APPLE_SCORE: u32 = 50;
const CELL_W: usize = 2;

#[derive(Clone, Copy, PartialEq)]
enum Glyph {
    Evader,
    Pursuer,
    Wall,
    Empty,
    SmallApple,
    BigApple,
    Target,
}

#[derive(Clone, Copy, PartialEq)]
struct Cell {
    glyph: Glyph,
    color: Color,
}

struct Renderer {
    last: Vec<Cell>,
    last_hud: String,
    needs_full: bool,
    origin_x: u16,
    origin_y: u16,
}

impl Renderer {
    fn new(size: usize) -> Self {
        Self {
            last: vec![
                Cell {
                    glyph: Glyph::Empty,
                    color: Color::Reset,
                };
                size * size
            ],
            last_hud: String::new(),
            needs_full: true,
            origin_x: 0,
            origin_y: 1,
        }
    }
}

struct Session {
    game: Game,
    score: u32,
    lives: u32,
    level: u32,
    paused: bool,
    show_target: bool,
}

fn main() -> io::Result<()> {
    env_logger::init();

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(Hide)?;

    let result = run(&mut stdout);

    stdout.execute(Show)?;
    stdout.execute(LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

fn run(stdout: &mut Stdout) -> io::Result<()> {
    let mut rng = rand::thread_rng();
    let (tick_ms, render_fps, size) = read_settings();
    let frame_time = Duration::from_micros(1_000_000 / render_fps.max(1));

    let game = Game::new(size, DEFAULT_DIFFICULTY, &mut rng)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
    let mut session = Session {
        game,
        score: 0,
        lives: LIVES,
        level: 1,
        paused: false,
        show_target: false,
    };
    let mut renderer = Renderer::new(size);
    let mut last_tick = Instant::now();

    loop {
        let frame_start = Instant::now();
        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press && key.kind != KeyEventKind::Repeat {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Char('r') => restart(&mut session, &mut rng),
                    KeyCode::Char('p') => session.show_target = !session.show_target,
                    KeyCode::Char(' ') => session.paused = !session.paused,
                    _ => {}
                }
            }
        }

        if !session.paused && last_tick.elapsed() >= Duration::from_millis(tick_ms) {
            last_tick = Instant::now();
            advance(&mut session, &mut rng);
            if session.lives == 0 {
                render(stdout, &session, &mut renderer)?;
                render_game_over(stdout, &session)?;
                return Ok(());
            }
        }
        render(stdout, &session, &mut renderer)?;

        let elapsed = frame_start.elapsed();
        if elapsed < frame_time {
            thread::sleep(frame_time - elapsed);
        }
    }
}

fn read_settings() -> (u64, u64, usize) {
    let tick_ms = std::env::var("APPLECHASE_TICK_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_TICK_MS);
    let render_fps = std::env::var("APPLECHASE_FPS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RENDER_FPS);
    let size = std::env::var("APPLECHASE_SIZE")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_GRID_SIZE);
    (tick_ms, render_fps, size)
}

fn restart(session: &mut Session, rng: &mut ThreadRng) {
    session.game.restart(rng);
    session.score = 0;
    session.lives = LIVES;
    session.level = 1;
    session.paused = false;
}

fn advance(session: &mut Session, rng: &mut ThreadRng) {
    let report = session.game.tick(rng);
    match report.eaten {
        Apple::Small => session.score += SMALL_APPLE_SCORE,
        Apple::Big => session.score += BIG_APPLE_SCORE,
        Apple::None => {}
    }
    match report.outcome {
        TickOutcome::Continue => {}
        TickOutcome::Caught { .. } | TickOutcome::EvaderStuck => {
            session.lives = session.lives.saturating_sub(1);
            if session.lives > 0 {
                session.game.reset_agents(rng);
            }
        }
        TickOutcome::LevelCleared => {
            session.level += 1;
            session.game.next_level(rng);
        }
    }
}

fn render(stdout: &mut Stdout, session: &Session, renderer: &mut Renderer) -> io::Result<()> {
    let size = session.game.grid().size();
    let needed_h = (size + 2) as u16;
    let needed_w = (size * CELL_W) as u16;

    stdout.queue(MoveTo(0, 0))?;

    let (term_w, term_h) = terminal::size()?;
    if term_w < needed_w || term_h < needed_h {
        stdout.queue(Clear(ClearType::All))?;
        let msg = format!(
            "Terminal too small. Need at least {}x{} (cols x rows). Current: {}x{}.",
            needed_w, needed_h, term_w, term_h
        );
        stdout.queue(Print(msg))?;
        stdout.flush()?;
        renderer.needs_full = true;
        return Ok(());
    }

    let origin_x = (term_w - needed_w) / 2;
    let origin_y = (term_h - needed_h) / 2 + 1;
    if origin_x != renderer.origin_x || origin_y != renderer.origin_y {
        renderer.origin_x = origin_x;
        renderer.origin_y = origin_y;
        renderer.needs_full = true;
    }

    let hud = format!(
        "Score: {}  Lives: {}  Level: {}  Difficulty: {}  Apples: {}  (q quit, r restart, space pause)",
        session.score,
        session.lives,
        session.level,
        session.game.difficulty(),
        session.game.grid().apple_cells().len(),
    );
    if renderer.needs_full || hud != renderer.last_hud {
        stdout.queue(MoveTo(renderer.origin_x, renderer.origin_y - 1))?;
        stdout.queue(SetForegroundColor(Color::White))?;
        stdout.queue(Clear(ClearType::CurrentLine))?;
        stdout.queue(Print(&hud))?;
        stdout.queue(ResetColor)?;
        renderer.last_hud = hud;
    }

    for row in 0..size {
        for col in 0..size {
            let cell = cell_for(session, Pos::new(row, col));
            let idx = row * size + col;
            if renderer.needs_full || cell != renderer.last[idx] {
                renderer.last[idx] = cell;
                draw_cell(stdout, renderer, row, col, cell)?;
            }
        }
    }
    renderer.needs_full = false;

    stdout.flush()?;
    Ok(())
}

fn pursuer_color(role: PursuerRole) -> Color {
    match role {
        PursuerRole::DirectChaser => Color::Red,
        PursuerRole::Ambusher => Color::Magenta,
        PursuerRole::PathCutter => Color::Cyan,
        PursuerRole::Shy => Color::DarkYellow,
    }
}

fn cell_for(session: &Session, pos: Pos) -> Cell {
    let game = &session.game;
    if pos == game.evader().pos {
        return Cell {
            glyph: Glyph::Evader,
            color: Color::Yellow,
        };
    }
    if let Some(pursuer) = game.pursuers().iter().find(|p| p.pos == pos) {
        return Cell {
            glyph: Glyph::Pursuer,
            color: pursuer_color(pursuer.role()),
        };
    }
    if session.show_target && game.evader().target() == Some(pos) {
        return Cell {
            glyph: Glyph::Target,
            color: Color::Green,
        };
    }
    if game.grid().is_wall(pos) {
        return Cell {
            glyph: Glyph::Wall,
            color: Color::Blue,
        };
    }
    match game.grid().apple_at(pos) {
        Apple::None => Cell {
            glyph: Glyph::Empty,
            color: Color::Reset,
        },
        Apple::Small => Cell {
            glyph: Glyph::SmallApple,
            color: Color::White,
        },
        Apple::Big => Cell {
            glyph: Glyph::BigApple,
            color: Color::Magenta,
        },
    }
}

fn draw_cell(
    stdout: &mut Stdout,
    renderer: &Renderer,
    row: usize,
    col: usize,
    cell: Cell,
) -> io::Result<()> {
    let (text, color) = match cell.glyph {
        Glyph::Evader => ("😃", cell.color),
        Glyph::Pursuer => ("👻", cell.color),
        Glyph::Wall => ("██", cell.color),
        Glyph::Empty => ("  ", cell.color),
        Glyph::SmallApple => ("· ", cell.color),
        Glyph::BigApple => ("● ", cell.color),
        Glyph::Target => ("◎ ", cell.color),
    };
    let x_pos = renderer.origin_x + (col * CELL_W) as u16;
    let y_pos = renderer.origin_y + row as u16;
    stdout.queue(MoveTo(x_pos, y_pos))?;
    stdout.queue(SetForegroundColor(color))?;
    stdout.queue(Print(text))?;
    let w = UnicodeWidthStr::width(text);
    if w < CELL_W {
        for _ in 0..(CELL_W - w) {
            stdout.queue(Print(' '))?;
        }
    }
    stdout.queue(ResetColor)?;
    Ok(())
}

fn render_game_over(stdout: &mut Stdout, session: &Session) -> io::Result<()> {
    let size = session.game.grid().size();
    let (term_w, term_h) = terminal::size()?;
    let needed_h = (size + 2) as u16;
    let needed_w = (size * CELL_W) as u16;
    if term_w < needed_w || term_h < needed_h {
        stdout.queue(MoveTo(0, needed_h))?;
    } else {
        let origin_x = (term_w - needed_w) / 2;
        let origin_y = (term_h - needed_h) / 2 + 1;
        stdout.queue(MoveTo(origin_x, origin_y + size as u16))?;
    }
    stdout.queue(Print(format!(
        "GAME OVER - Final Score: {} (press q to quit)",
        session.score
    )))?;
    stdout.flush()?;
    loop {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && key.code == KeyCode::Char('q') {
                    return Ok(());
                }
            }
        }
    }
}
