//! Spatial conditions used by `нц` and `если`.
//!
//! A condition names a side of the robot and the expected state of the edge
//! on that side, e.g. `справа свободно` ("free on the right") or `снизу стена`
//! ("wall below"). A side counts as free when the neighbouring cell is on the
//! field and no wall separates it from the robot.

use std::str::FromStr;

use crate::error::ConditionError;
use crate::field::Field;
use crate::robot::Direction;

/// What the condition expects to find on the probed side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    /// `свободно`: the robot could step there.
    Free,
    /// `стена`: a wall or the field border is in the way.
    Wall,
}

/// A parsed `<side> <state>` condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Condition {
    pub side: Direction,
    pub expect: CellState,
}

impl Condition {
    pub fn new(side: Direction, expect: CellState) -> Self {
        Self { side, expect }
    }

    /// Probes the field around the robot. The robot's heading is irrelevant.
    pub fn holds(&self, field: &Field) -> bool {
        let robot = field.robot();
        let free = field.is_free(robot.neighbour(self.side), robot.position);
        match self.expect {
            CellState::Free => free,
            CellState::Wall => !free,
        }
    }
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let [side, state] = words[..] else {
            return Err(if words.is_empty() {
                ConditionError::Empty
            } else {
                ConditionError::Arity(words.len())
            });
        };

        let side = match side.to_lowercase().as_str() {
            "справа" => Direction::East,
            "снизу" => Direction::South,
            "слева" => Direction::West,
            "сверху" => Direction::North,
            _ => return Err(ConditionError::UnknownSide(side.to_string())),
        };
        let expect = match state.to_lowercase().as_str() {
            "свободно" => CellState::Free,
            "стена" => CellState::Wall,
            _ => return Err(ConditionError::UnknownState(state.to_string())),
        };
        Ok(Self::new(side, expect))
    }
}

/// Parses and evaluates `text` against the field in one go.
pub fn evaluate(text: &str, field: &Field) -> Result<bool, ConditionError> {
    let condition: Condition = text.parse()?;
    Ok(condition.holds(field))
}
