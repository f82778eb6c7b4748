use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use glam::IVec2;
use grid_robot::{
    Direction, Event, Field, FieldState, MotionMode, Observer, Orientation, RunConfig, Session,
    Wall, parse,
};

#[derive(Parser)]
#[command(name = "grid-robot")]
#[command(about = "Runs robot scripts on a walled grid", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs a script and prints every step
    Run {
        /// Script file
        script: PathBuf,

        /// Field snapshot (JSON); an empty 10x10 field if omitted
        #[arg(short, long)]
        field: Option<PathBuf>,

        /// Pause after every step, in milliseconds
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,

        /// Abort after this many dispatched instructions
        #[arg(long)]
        max_steps: Option<usize>,

        /// Direction commands only turn the robot
        #[arg(long)]
        orient_only: bool,

        /// Print the report (or error) as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Write the final field snapshot here
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Parses a script and shows its instructions
    Parse {
        /// Script file
        script: PathBuf,
    },

    /// Prints an empty field snapshot
    Field {
        #[arg(short, long, default_value_t = grid_robot::DEFAULT_SIZE)]
        size: i32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            script,
            field,
            delay_ms,
            max_steps,
            orient_only,
            json,
            save,
        } => {
            let source = fs::read_to_string(&script)?;
            let field = match field {
                Some(path) => load_field(&path)?,
                None => Field::default(),
            };

            let mut config = RunConfig::default().with_delay(Duration::from_millis(delay_ms));
            if let Some(limit) = max_steps {
                config = config.with_max_steps(limit);
            }
            if orient_only {
                config = config.with_motion(MotionMode::Orient);
            }

            let session = Session::new(field, config);
            let mut printer = Printer { quiet: json };
            let result = session.run(&source, &mut printer);

            if let Some(path) = save {
                fs::write(&path, serde_json::to_string_pretty(&session.snapshot())?)?;
            }

            match result {
                Ok(report) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        for line in &report.skipped {
                            eprintln!("warning: line {line} was not recognised and was skipped");
                        }
                        session.with_field(|field| print!("{}", render(field)));
                        println!("Steps: {}", report.ticks.len());
                    }
                }
                Err(err) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&err.descriptor())?);
                    } else {
                        session.with_field(|field| print!("{}", render(field)));
                    }
                    return Err(err.into());
                }
            }
        }
        Commands::Parse { script } => {
            let source = fs::read_to_string(&script)?;
            let program = parse(&source);

            println!("=== INSTRUCTIONS ===");
            for (index, instruction) in program.instructions.iter().enumerate() {
                println!("{index:4}  line {:<4} {}", instruction.line, instruction.op);
            }
            if !program.skipped.is_empty() {
                println!("=== SKIPPED LINES ===");
                for line in &program.skipped {
                    println!("  {line}");
                }
            }
            match program.check_blocks() {
                Ok(()) => println!("Blocks: ok"),
                Err(err) => eprintln!("Blocks: {err}"),
            }
        }
        Commands::Field { size } => {
            let field = Field::new(size)?;
            println!("{}", serde_json::to_string_pretty(&field.state())?);
        }
    }

    Ok(())
}

/// Enables log output when `RUST_LOG` is set, e.g. `RUST_LOG=grid_robot=trace`.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn load_field(path: &Path) -> Result<Field, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let state: FieldState = serde_json::from_str(&text)?;
    Ok(Field::from_state(state)?)
}

/// Prints events as the robot moves.
struct Printer {
    quiet: bool,
}

impl Observer for Printer {
    fn on_event(&mut self, event: &Event, _field: &Field) {
        if self.quiet {
            return;
        }
        match event {
            Event::Moved { to, direction, .. } => {
                println!("{} ({}, {})", arrow(*direction), to.x, to.y)
            }
            Event::Painted { cell, .. } => println!("# ({}, {})", cell.x, cell.y),
            Event::WallHit { at, towards } => println!(
                "! wall between ({}, {}) and ({}, {})",
                at.x, at.y, towards.x, towards.y
            ),
        }
    }
}

fn arrow(direction: Direction) -> char {
    match direction {
        Direction::East => '>',
        Direction::South => 'v',
        Direction::West => '<',
        Direction::North => '^',
    }
}

/// Draws the field as text. The border is always drawn.
fn render(field: &Field) -> String {
    let size = field.size();
    let robot = field.robot();
    let mut out = String::new();

    let horizontal = |x: i32, y: i32| {
        y == 0 || y == size || field.has_wall(&Wall::new(x, y, Orientation::Horizontal))
    };
    let vertical = |x: i32, y: i32| {
        x == 0 || x == size || field.has_wall(&Wall::new(x, y, Orientation::Vertical))
    };

    for y in 0..=size {
        for x in 0..size {
            out.push('+');
            out.push_str(if horizontal(x, y) { "---" } else { "   " });
        }
        out.push_str("+\n");
        if y == size {
            break;
        }

        for x in 0..=size {
            out.push(if vertical(x, y) { '|' } else { ' ' });
            if x == size {
                break;
            }
            let cell = IVec2::new(x, y);
            let mark = if cell == robot.position {
                arrow(robot.direction)
            } else if field.is_painted(cell) {
                '#'
            } else {
                '.'
            };
            out.push(' ');
            out.push(mark);
            out.push(' ');
        }
        out.push('\n');
    }
    out
}
