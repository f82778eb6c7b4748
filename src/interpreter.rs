//! Program-counter interpreter that drives the robot across a [`Field`].
//!
//! The entry point is [`Interpreter`]. Configure it with a [`RunConfig`],
//! optionally swap the command vocabulary via [`Interpreter::with_commands`],
//! then either call [`Interpreter::execute`] for an unpaced run or hand it to a
//! [`Session`](crate::Session) for paced, cancellable runs.
//!
//! Execution is split into single dispatches by [`Machine::step`]. Each call
//! executes exactly one instruction; callers decide what happens between
//! calls (pacing, rendering, cancellation).

use glam::IVec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::condition;
use crate::error::ExecutionError;
use crate::field::Field;
use crate::parser::{self, Op, Program};
use crate::resolver::{find_if_end, find_loop_end};
use crate::robot::{Command, Direction};

/// How direction commands (`вправо`, `вниз`, ...) act on the robot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionMode {
    /// Turn towards the direction, then step one cell. Each step is a tick.
    #[default]
    Step,
    /// Only turn. No cell changes, no tick, no pacing delay.
    Orient,
}

/// Configuration for script runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Pause after every tick, in milliseconds. Default: 500.
    pub delay_ms: u64,
    /// How direction commands behave.
    pub motion: MotionMode,
    /// Maximum number of dispatched instructions before the run is aborted.
    pub max_steps: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            motion: MotionMode::Step,
            max_steps: 100_000,
        }
    }
}

impl RunConfig {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_motion(mut self, motion: MotionMode) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Keyword-to-command vocabulary.
///
/// Keywords are stored lower-case. The parser only keeps lines that start with a
/// registered keyword; the engine looks keywords up again at dispatch time and
/// refuses any it does not know.
#[derive(Clone, Debug, Default)]
pub struct CommandTable {
    map: HashMap<String, Command>,
}

impl CommandTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard vocabulary: `вправо`, `вниз`, `влево`, `вверх`, `закрасить`.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.populate_standard();
        table
    }

    /// Registers the standard keywords, keeping any existing entries for other words.
    pub fn populate_standard(&mut self) {
        let mappings = [
            ("вправо", Command::Move(Direction::East)),
            ("вниз", Command::Move(Direction::South)),
            ("влево", Command::Move(Direction::West)),
            ("вверх", Command::Move(Direction::North)),
            ("закрасить", Command::Paint),
        ];
        for (keyword, command) in mappings {
            self.set(keyword, command);
        }
    }

    /// Assigns a command to a keyword, replacing any previous mapping.
    pub fn set(&mut self, keyword: &str, command: Command) {
        self.map.insert(keyword.to_lowercase(), command);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, keyword: &str, command: Command) -> Self {
        self.set(keyword, command);
        self
    }

    pub fn get(&self, keyword: &str) -> Option<Command> {
        self.map.get(keyword).copied()
    }

    /// The longest registered keyword that `text` starts with.
    pub fn match_prefix(&self, text: &str) -> Option<&str> {
        self.map
            .keys()
            .filter(|keyword| text.starts_with(keyword.as_str()))
            .max_by_key(|keyword| keyword.len())
            .map(String::as_str)
    }
}

/// An observable change of the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Event {
    /// The robot stepped from one cell to a neighbour.
    Moved {
        from: IVec2,
        to: IVec2,
        direction: Direction,
    },
    /// The robot's cell was painted. `fresh` is false if it already was.
    Painted { cell: IVec2, fresh: bool },
    /// A move was refused. Always the last event of a failed run.
    WallHit { at: IVec2, towards: IVec2 },
}

/// Receives events as they happen.
///
/// Called with the field in its post-event state. Implementations must not
/// block for long: the field stays locked for the duration of the call when
/// running inside a [`Session`](crate::Session).
pub trait Observer {
    fn on_event(&mut self, event: &Event, field: &Field);
}

impl<F: FnMut(&Event, &Field)> Observer for F {
    fn on_event(&mut self, event: &Event, field: &Field) {
        self(event, field)
    }
}

/// An observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_event(&mut self, _event: &Event, _field: &Field) {}
}

/// One paced step of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Tick {
    /// Index of the instruction that produced the tick.
    pub index: usize,
    /// Source line of that instruction.
    pub line: usize,
    pub event: Event,
    /// Robot position after the tick.
    pub position: IVec2,
}

/// Outcome of a successful (possibly cancelled) run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub ticks: Vec<Tick>,
    /// Number of instructions dispatched, ticking or not.
    pub dispatched: usize,
    /// Set when the run stopped early on request.
    pub cancelled: bool,
    /// Source lines the parser dropped.
    pub skipped: Vec<usize>,
}

impl RunReport {
    /// Robot positions after every movement tick, in order.
    pub fn path(&self) -> Vec<IVec2> {
        self.ticks
            .iter()
            .filter(|tick| matches!(tick.event, Event::Moved { .. }))
            .map(|tick| tick.position)
            .collect()
    }
}

/// Result of a single dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// A movement or paint happened; the caller should render and pause.
    Tick(Event),
    /// Control flow or a turn; continue immediately.
    Silent,
    /// The program counter ran off the end.
    Halted,
}

/// Execution state of one run over one program.
pub struct Machine<'a> {
    program: &'a Program,
    commands: &'a CommandTable,
    motion: MotionMode,
    max_steps: usize,
    pc: usize,
    /// Index of the `нц` of every loop currently being executed, innermost last.
    loops: Vec<usize>,
    dispatched: usize,
}

impl<'a> Machine<'a> {
    pub fn new(program: &'a Program, commands: &'a CommandTable, config: &RunConfig) -> Self {
        Self {
            program,
            commands,
            motion: config.motion,
            max_steps: config.max_steps,
            pc: 0,
            loops: Vec::new(),
            dispatched: 0,
        }
    }

    /// Index of the next instruction to dispatch.
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn is_halted(&self) -> bool {
        self.pc >= self.program.len()
    }

    /// Executes exactly one instruction.
    pub fn step(&mut self, field: &mut Field) -> Result<Dispatch, ExecutionError> {
        let program = self.program;
        let Some(instruction) = program.get(self.pc) else {
            return Ok(Dispatch::Halted);
        };
        if self.dispatched >= self.max_steps {
            return Err(ExecutionError::StepLimitExceeded {
                limit: self.max_steps,
            });
        }
        self.dispatched += 1;

        let here = self.pc;
        let line = instruction.line;
        tracing::trace!(pc = here, line, op = %instruction.op, "dispatch");

        match &instruction.op {
            Op::Command(keyword) => {
                let command =
                    self.commands
                        .get(keyword)
                        .ok_or_else(|| ExecutionError::UnknownCommand {
                            keyword: keyword.clone(),
                            line,
                        })?;
                let dispatch = self.command(command, field, line)?;
                self.pc += 1;
                Ok(dispatch)
            }
            Op::LoopStart(text) => {
                // An empty guard loops until something else stops the run.
                let holds = text.is_empty() || check(text, field, line)?;
                if holds {
                    if self.loops.last() != Some(&here) {
                        self.loops.push(here);
                    }
                    self.pc += 1;
                } else {
                    if self.loops.last() == Some(&here) {
                        self.loops.pop();
                    }
                    self.pc = find_loop_end(&program.instructions, here)?;
                }
                Ok(Dispatch::Silent)
            }
            Op::LoopEnd => {
                let start = *self
                    .loops
                    .last()
                    .ok_or(ExecutionError::UnmatchedLoopEnd { line })?;
                self.pc = start;
                Ok(Dispatch::Silent)
            }
            Op::IfStart(text) => {
                self.pc = if check(text, field, line)? {
                    here + 1
                } else {
                    find_if_end(&program.instructions, here)?
                };
                Ok(Dispatch::Silent)
            }
            Op::IfEnd => {
                self.pc += 1;
                Ok(Dispatch::Silent)
            }
        }
    }

    fn command(
        &self,
        command: Command,
        field: &mut Field,
        line: usize,
    ) -> Result<Dispatch, ExecutionError> {
        match command {
            Command::Move(direction) => {
                field.set_direction(direction);
                if self.motion == MotionMode::Orient {
                    return Ok(Dispatch::Silent);
                }
                let from = field.robot().position;
                let to = from + direction.delta();
                if !field.is_free(to, from) {
                    tracing::warn!(line, ?from, ?to, "move blocked");
                    return Err(ExecutionError::BlockedMove { from, to, line });
                }
                field.move_robot_to(to);
                Ok(Dispatch::Tick(Event::Moved {
                    from,
                    to,
                    direction,
                }))
            }
            Command::Paint => {
                let cell = field.robot().position;
                let fresh = field.paint_current_cell();
                Ok(Dispatch::Tick(Event::Painted { cell, fresh }))
            }
        }
    }
}

fn check(text: &str, field: &Field, line: usize) -> Result<bool, ExecutionError> {
    condition::evaluate(text, field).map_err(|reason| ExecutionError::InvalidCondition {
        text: text.to_string(),
        line,
        reason,
    })
}

/// Dispatches one instruction, reporting ticks and wall hits.
///
/// Returns `Ok(None)` once the machine has halted, otherwise whether the
/// dispatch produced a tick.
pub(crate) fn advance(
    machine: &mut Machine<'_>,
    field: &mut Field,
    observer: &mut dyn Observer,
    report: &mut RunReport,
) -> Result<Option<bool>, ExecutionError> {
    let index = machine.pc();
    match machine.step(field) {
        Ok(Dispatch::Halted) => Ok(None),
        Ok(Dispatch::Silent) => Ok(Some(false)),
        Ok(Dispatch::Tick(event)) => {
            observer.on_event(&event, field);
            report.ticks.push(Tick {
                index,
                line: machine.program.get(index).map_or(0, |i| i.line),
                event,
                position: field.robot().position,
            });
            Ok(Some(true))
        }
        Err(err) => {
            if let ExecutionError::BlockedMove { from, to, .. } = err {
                observer.on_event(&Event::WallHit { at: from, towards: to }, field);
            }
            Err(err)
        }
    }
}

/// Parses and runs scripts with a fixed vocabulary and configuration.
#[derive(Clone, Debug)]
pub struct Interpreter {
    commands: CommandTable,
    config: RunConfig,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}

impl Interpreter {
    /// Creates an interpreter with the standard vocabulary.
    pub fn new(config: RunConfig) -> Self {
        Self {
            commands: CommandTable::standard(),
            config,
        }
    }

    /// Replaces the command vocabulary (builder pattern).
    pub fn with_commands(mut self, commands: CommandTable) -> Self {
        self.commands = commands;
        self
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn parse(&self, source: &str) -> Program {
        parser::parse_with(source, &self.commands)
    }

    pub fn machine<'a>(&'a self, program: &'a Program) -> Machine<'a> {
        Machine::new(program, &self.commands, &self.config)
    }

    /// Runs `program` to completion on `field` without pacing.
    ///
    /// Field changes made before an error are kept.
    pub fn execute(
        &self,
        program: &Program,
        field: &mut Field,
        observer: &mut dyn Observer,
    ) -> Result<RunReport, ExecutionError> {
        let mut machine = self.machine(program);
        let mut report = RunReport {
            skipped: program.skipped.clone(),
            ..Default::default()
        };
        while advance(&mut machine, field, observer, &mut report)?.is_some() {}
        report.dispatched = machine.dispatched();
        Ok(report)
    }

    /// Parses `source` and executes it.
    pub fn run(
        &self,
        source: &str,
        field: &mut Field,
        observer: &mut dyn Observer,
    ) -> Result<RunReport, ExecutionError> {
        let program = self.parse(source);
        self.execute(&program, field, observer)
    }
}
