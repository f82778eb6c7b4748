//! Jump targets for loop and conditional blocks.

use crate::error::ExecutionError;
use crate::parser::{Instruction, Op};

/// Returns the index just past the `кц` matching the `нц` at `start`.
///
/// Nested loops are counted, so inner `кц` lines are skipped over.
pub fn find_loop_end(instructions: &[Instruction], start: usize) -> Result<usize, ExecutionError> {
    let mut depth = 1usize;
    for (index, instruction) in instructions.iter().enumerate().skip(start + 1) {
        match instruction.op {
            Op::LoopStart(_) => depth += 1,
            Op::LoopEnd => {
                depth -= 1;
                if depth == 0 {
                    return Ok(index + 1);
                }
            }
            _ => {}
        }
    }
    Err(ExecutionError::UnterminatedLoop {
        line: line_of(instructions, start),
    })
}

/// Returns the index just past the first `все` after the `если` at `start`.
///
/// Conditionals do not nest: an inner `если` closes at the outer block's `все`.
pub fn find_if_end(instructions: &[Instruction], start: usize) -> Result<usize, ExecutionError> {
    instructions
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, instruction)| instruction.op == Op::IfEnd)
        .map(|(index, _)| index + 1)
        .ok_or_else(|| ExecutionError::UnterminatedConditional {
            line: line_of(instructions, start),
        })
}

fn line_of(instructions: &[Instruction], index: usize) -> usize {
    instructions.get(index).map_or(0, |i| i.line)
}
