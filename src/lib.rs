//! # grid-robot
//!
//! An interpreter for the small Cyrillic robot language used in introductory
//! programming lessons, together with the walled grid the robot moves on.
//!
//! ```text
//! нач
//! нц справа свободно
//!   вправо
//!   если снизу стена то
//!     закрасить
//!   все
//! кц
//! кон
//! ```
//!
//! Source text is [parsed](parser::parse) into a flat list of instructions.
//! Block boundaries are [resolved](resolver) lazily while the [`Machine`]
//! steps through the program, evaluating [conditions](condition) against the
//! [`Field`]. Rendering, storage and transport are left to the caller: the
//! crate exposes [`FieldState`] snapshots, an [`Observer`] hook for every
//! change, and a [`Session`] that paces and cancels runs.

pub mod condition;
pub mod error;
pub mod field;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod robot;
pub mod session;

pub use condition::*;
pub use error::*;
pub use field::*;
pub use interpreter::*;
pub use parser::{Instruction, Op, Program, parse, parse_with};
pub use robot::*;
pub use session::*;
