//! The walled grid the robot lives on.

use glam::IVec2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::FieldError;
use crate::robot::{Direction, Robot};

/// Side length of a freshly created field.
pub const DEFAULT_SIZE: i32 = 10;

/// Orientation of a wall segment on a cell edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Runs along the x axis; separates `(x, y - 1)` from `(x, y)`.
    Horizontal,
    /// Runs along the y axis; separates `(x - 1, y)` from `(x, y)`.
    Vertical,
}

/// A wall segment addressed by the cell below/right of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wall {
    pub x: i32,
    pub y: i32,
    pub orientation: Orientation,
}

impl Wall {
    pub fn new(x: i32, y: i32, orientation: Orientation) -> Self {
        Self { x, y, orientation }
    }

    pub fn vertical(x: i32, y: i32) -> Self {
        Self::new(x, y, Orientation::Vertical)
    }

    pub fn horizontal(x: i32, y: i32) -> Self {
        Self::new(x, y, Orientation::Horizontal)
    }

    /// The wall on the shared edge of two axis-aligned neighbours, if they are neighbours.
    pub fn between(a: IVec2, b: IVec2) -> Option<Self> {
        match (b - a).to_array() {
            [1, 0] => Some(Self::vertical(b.x, b.y)),
            [-1, 0] => Some(Self::vertical(a.x, a.y)),
            [0, 1] => Some(Self::horizontal(b.x, b.y)),
            [0, -1] => Some(Self::horizontal(a.x, a.y)),
            _ => None,
        }
    }

    /// Whether the wall sits on an edge of a `size`×`size` field.
    ///
    /// The coordinate across the wall may equal `size` (the outer border).
    pub fn fits(&self, size: i32) -> bool {
        let (across, along) = match self.orientation {
            Orientation::Vertical => (self.x, self.y),
            Orientation::Horizontal => (self.y, self.x),
        };
        (0..=size).contains(&across) && (0..size).contains(&along)
    }
}

/// Serializable robot position, flattened for collaborators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotState {
    pub x: i32,
    pub y: i32,
    #[serde(default, alias = "dir")]
    pub direction: Direction,
}

impl From<Robot> for RobotState {
    fn from(robot: Robot) -> Self {
        Self {
            x: robot.position.x,
            y: robot.position.y,
            direction: robot.direction,
        }
    }
}

impl From<RobotState> for Robot {
    fn from(state: RobotState) -> Self {
        Robot::new(IVec2::new(state.x, state.y), state.direction)
    }
}

/// A complete snapshot of a field, as exchanged with renderers and storage.
///
/// Walls and painted cells are sorted so equal fields produce equal snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldState {
    pub size: i32,
    pub robot: RobotState,
    #[serde(default)]
    pub walls: Vec<Wall>,
    #[serde(default)]
    pub painted: Vec<(i32, i32)>,
}

/// A partial update; absent parts are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walls: Option<Vec<Wall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub painted: Option<Vec<(i32, i32)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot: Option<RobotState>,
}

/// Grid size, walls, painted cells and the robot.
///
/// The field answers reachability questions but never validates moves itself:
/// [`move_robot_to`](Self::move_robot_to) is unconditional, callers check
/// [`is_free`](Self::is_free) first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    size: i32,
    robot: Robot,
    walls: HashSet<Wall>,
    painted: HashSet<IVec2>,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            robot: Robot::default(),
            walls: HashSet::new(),
            painted: HashSet::new(),
        }
    }
}

impl Field {
    /// Creates an empty `size`×`size` field with the robot at `(0, 0)` facing east.
    pub fn new(size: i32) -> Result<Self, FieldError> {
        if size <= 0 {
            return Err(FieldError::InvalidSize { size });
        }
        Ok(Self {
            size,
            ..Default::default()
        })
    }

    /// Builds a field from a snapshot, validating every coordinate.
    pub fn from_state(state: FieldState) -> Result<Self, FieldError> {
        let mut field = Self::new(state.size)?;
        field.apply(FieldUpdate {
            walls: Some(state.walls),
            painted: Some(state.painted),
            robot: Some(state.robot),
        })?;
        Ok(field)
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn walls(&self) -> impl Iterator<Item = &Wall> {
        self.walls.iter()
    }

    pub fn painted(&self) -> impl Iterator<Item = &IVec2> {
        self.painted.iter()
    }

    pub fn is_painted(&self, cell: IVec2) -> bool {
        self.painted.contains(&cell)
    }

    pub fn has_wall(&self, wall: &Wall) -> bool {
        self.walls.contains(wall)
    }

    // --- Queries ---

    pub fn is_in_bounds(&self, cell: IVec2) -> bool {
        (0..self.size).contains(&cell.x) && (0..self.size).contains(&cell.y)
    }

    /// Whether a wall separates two neighbouring cells.
    ///
    /// Cells that are not unit axis-aligned neighbours never have a wall between them.
    pub fn has_wall_between(&self, a: IVec2, b: IVec2) -> bool {
        Wall::between(a, b).is_some_and(|wall| self.walls.contains(&wall))
    }

    /// Whether the robot standing on `from` could step onto `to`.
    pub fn is_free(&self, to: IVec2, from: IVec2) -> bool {
        self.is_in_bounds(to) && !self.has_wall_between(from, to)
    }

    // --- Robot ---

    pub fn move_robot_to(&mut self, cell: IVec2) {
        self.robot.position = cell;
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.robot.direction = direction;
    }

    /// Paints the robot's cell. Returns `false` if it was already painted.
    pub fn paint_current_cell(&mut self) -> bool {
        self.painted.insert(self.robot.position)
    }

    // --- Editing ---

    /// Adds a wall. Returns `false` if it was already present.
    pub fn add_wall(&mut self, wall: Wall) -> Result<bool, FieldError> {
        self.check_wall(&wall)?;
        Ok(self.walls.insert(wall))
    }

    /// Removes a wall. Returns `false` if there was none.
    pub fn remove_wall(&mut self, wall: &Wall) -> bool {
        self.walls.remove(wall)
    }

    /// Flips a wall on or off, as a click in an editor would. Returns whether it is now present.
    pub fn toggle_wall(&mut self, wall: Wall) -> Result<bool, FieldError> {
        self.check_wall(&wall)?;
        if self.walls.remove(&wall) {
            Ok(false)
        } else {
            self.walls.insert(wall);
            Ok(true)
        }
    }

    /// Applies a partial update. Nothing is changed if any part is invalid.
    pub fn apply(&mut self, update: FieldUpdate) -> Result<(), FieldError> {
        let walls = match update.walls {
            Some(walls) => {
                for wall in &walls {
                    self.check_wall(wall)?;
                }
                Some(walls.into_iter().collect::<HashSet<_>>())
            }
            None => None,
        };

        let painted = match update.painted {
            Some(cells) => {
                let cells = cells
                    .into_iter()
                    .map(|(x, y)| IVec2::new(x, y))
                    .collect::<HashSet<_>>();
                if let Some(cell) = cells.iter().find(|c| !self.is_in_bounds(**c)) {
                    return Err(FieldError::CellOutOfBounds {
                        cell: *cell,
                        size: self.size,
                    });
                }
                Some(cells)
            }
            None => None,
        };

        let robot = match update.robot {
            Some(state) => {
                let robot = Robot::from(state);
                if !self.is_in_bounds(robot.position) {
                    return Err(FieldError::RobotOutOfBounds {
                        position: robot.position,
                        size: self.size,
                    });
                }
                Some(robot)
            }
            None => None,
        };

        if let Some(walls) = walls {
            self.walls = walls;
        }
        if let Some(painted) = painted {
            self.painted = painted;
        }
        if let Some(robot) = robot {
            self.robot = robot;
        }
        Ok(())
    }

    /// Clears walls and paint and puts the robot back at the origin facing east.
    pub fn reset(&mut self) {
        self.walls.clear();
        self.painted.clear();
        self.robot = Robot::default();
    }

    pub fn state(&self) -> FieldState {
        let mut walls: Vec<Wall> = self.walls.iter().copied().collect();
        walls.sort_by_key(|w| (w.orientation as u8, w.y, w.x));
        let mut painted: Vec<(i32, i32)> = self.painted.iter().map(|c| (c.x, c.y)).collect();
        painted.sort_by_key(|&(x, y)| (y, x));
        FieldState {
            size: self.size,
            robot: self.robot.into(),
            walls,
            painted,
        }
    }

    fn check_wall(&self, wall: &Wall) -> Result<(), FieldError> {
        if wall.fits(self.size) {
            Ok(())
        } else {
            Err(FieldError::WallOutOfRange {
                wall: *wall,
                size: self.size,
            })
        }
    }
}
