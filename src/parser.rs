//! Turns script text into a flat list of [`Instruction`]s.
//!
//! Parsing never fails. Block keywords (`нц`, `кц`, `если`, `все`) are recorded
//! as they appear; matching them up is left to the [`resolver`](crate::resolver),
//! which the engine consults lazily. Lines that are not part of the language are
//! dropped and their numbers collected in [`Program::skipped`].

use serde::Serialize;
use std::fmt;

use crate::error::ExecutionError;
use crate::interpreter::CommandTable;
use crate::resolver;

/// Keyword opening an algorithm body; stripped from the start of a line.
const BEGIN: &str = "нач";
/// Keyword closing an algorithm body; stripped from the end of a line.
const END: &str = "кон";

const LOOP_START: &str = "нц";
const LOOP_END: &str = "кц";
const IF_START: &str = "если";
const IF_THEN: &str = "то";
const IF_END: &str = "все";

/// What an instruction does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "arg", rename_all = "snake_case")]
pub enum Op {
    /// A command keyword, resolved through a [`CommandTable`] at dispatch time.
    Command(String),
    /// `нц <condition>`. An empty condition loops unconditionally.
    LoopStart(String),
    /// `кц`
    LoopEnd,
    /// `если <condition> то`
    IfStart(String),
    /// `все`
    IfEnd,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Command(keyword) => f.write_str(keyword),
            Op::LoopStart(cond) if cond.is_empty() => f.write_str(LOOP_START),
            Op::LoopStart(cond) => write!(f, "{LOOP_START} {cond}"),
            Op::LoopEnd => f.write_str(LOOP_END),
            Op::IfStart(cond) => write!(f, "{IF_START} {cond} {IF_THEN}"),
            Op::IfEnd => f.write_str(IF_END),
        }
    }
}

/// One parsed line of a script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub op: Op,
    /// 1-based source line.
    pub line: usize,
}

impl Instruction {
    pub fn new(op: Op, line: usize) -> Self {
        Self { op, line }
    }
}

/// A parsed script.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    /// Lines that were not recognised and were dropped.
    pub skipped: Vec<usize>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Resolves every block up front.
    ///
    /// The engine resolves blocks only when it reaches them, so a script with a
    /// broken block late in the file still runs up to that point. This lets a
    /// caller reject such scripts before anything moves.
    pub fn check_blocks(&self) -> Result<(), ExecutionError> {
        for (index, instruction) in self.instructions.iter().enumerate() {
            match instruction.op {
                Op::LoopStart(_) => {
                    resolver::find_loop_end(&self.instructions, index)?;
                }
                Op::IfStart(_) => {
                    resolver::find_if_end(&self.instructions, index)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Parses a script using the standard command vocabulary.
pub fn parse(source: &str) -> Program {
    parse_with(source, &CommandTable::standard())
}

/// Parses a script, recognising the commands registered in `commands`.
pub fn parse_with(source: &str, commands: &CommandTable) -> Program {
    let mut program = Program::default();
    let source = source.to_lowercase();

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let text = strip_markers(raw.trim());
        if text.is_empty() {
            continue;
        }

        match classify(text, commands) {
            Some(op) => program.instructions.push(Instruction::new(op, line)),
            None => {
                tracing::debug!(line, text, "skipping unrecognised line");
                program.skipped.push(line);
            }
        }
    }

    tracing::debug!(
        instructions = program.instructions.len(),
        skipped = program.skipped.len(),
        "parsed script"
    );
    program
}

fn classify(text: &str, commands: &CommandTable) -> Option<Op> {
    let (head, rest) = split_word(text);
    match head {
        LOOP_START => Some(Op::LoopStart(normalize(rest))),
        IF_START => {
            let condition = rest
                .split_whitespace()
                .take_while(|word| *word != IF_THEN)
                .collect::<Vec<_>>()
                .join(" ");
            Some(Op::IfStart(condition))
        }
        LOOP_END if rest.is_empty() => Some(Op::LoopEnd),
        IF_END if rest.is_empty() => Some(Op::IfEnd),
        _ => commands
            .match_prefix(text)
            .map(|keyword| Op::Command(keyword.to_string())),
    }
}

/// Splits off the first whitespace-delimited word.
fn split_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes a leading `нач` and a trailing `кон` word.
fn strip_markers(line: &str) -> &str {
    let mut line = line;
    if let Some(rest) = line.strip_prefix(BEGIN)
        && (rest.is_empty() || rest.starts_with(char::is_whitespace))
    {
        line = rest.trim_start();
    }
    if let Some(rest) = line.strip_suffix(END)
        && (rest.is_empty() || rest.ends_with(char::is_whitespace))
    {
        line = rest.trim_end();
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_stripped_as_whole_words() {
        assert_eq!(strip_markers("нач"), "");
        assert_eq!(strip_markers("кон"), "");
        assert_eq!(strip_markers("нач вправо"), "вправо");
        assert_eq!(strip_markers("вниз кон"), "вниз");
        assert_eq!(strip_markers("начало"), "начало");
    }

    #[test]
    fn split_word_trims_the_rest() {
        assert_eq!(split_word("нц  справа   свободно"), ("нц", "справа   свободно"));
        assert_eq!(split_word("кц"), ("кц", ""));
    }

    #[test]
    fn condition_stops_at_then() {
        let table = CommandTable::standard();
        assert_eq!(
            classify("если снизу стена то", &table),
            Some(Op::IfStart("снизу стена".into()))
        );
        assert_eq!(
            classify("если слева свободно", &table),
            Some(Op::IfStart("слева свободно".into()))
        );
    }
}
