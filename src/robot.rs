//! Robot state and the commands it understands.

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// One of the four grid headings.
///
/// The declaration order is significant: snapshots from older clients address
/// directions by index (`0 = East` .. `3 = North`). Both forms deserialize;
/// names are always written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "DirectionRepr")]
pub enum Direction {
    #[default]
    East,
    South,
    West,
    North,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DirectionRepr {
    Index(usize),
    Name(String),
}

impl TryFrom<DirectionRepr> for Direction {
    type Error = String;

    fn try_from(repr: DirectionRepr) -> Result<Self, Self::Error> {
        match repr {
            DirectionRepr::Index(index) => {
                Self::from_index(index).ok_or_else(|| format!("direction index {index} out of range"))
            }
            DirectionRepr::Name(name) => match name.to_lowercase().as_str() {
                "east" => Ok(Self::East),
                "south" => Ok(Self::South),
                "west" => Ok(Self::West),
                "north" => Ok(Self::North),
                other => Err(format!("unknown direction `{other}`")),
            },
        }
    }
}

impl Direction {
    /// All directions in index order.
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::North,
    ];

    /// Unit step on the grid. `y` grows downwards.
    pub fn delta(self) -> IVec2 {
        match self {
            Direction::East => IVec2::new(1, 0),
            Direction::South => IVec2::new(0, 1),
            Direction::West => IVec2::new(-1, 0),
            Direction::North => IVec2::new(0, -1),
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Maps a unit delta back to its direction.
    pub fn from_delta(delta: IVec2) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.delta() == delta)
    }
}

/// The state of the robot standing on the field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robot {
    /// Cell the robot occupies.
    pub position: IVec2,

    /// Current heading.
    pub direction: Direction,
}

impl Robot {
    pub fn new(position: IVec2, direction: Direction) -> Self {
        Self {
            position,
            direction,
        }
    }

    /// The neighbouring cell on the given side, regardless of heading.
    pub fn neighbour(&self, side: Direction) -> IVec2 {
        self.position + side.delta()
    }
}

/// Operations a command keyword can resolve to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Turn towards the direction and, depending on the motion mode, step once.
    Move(Direction),
    /// Paint the cell under the robot (`закрасить`).
    Paint,
}
