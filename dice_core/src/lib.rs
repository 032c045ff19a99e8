//! dice_core - Dice expression parsing and rolling
//!
//! Expressions follow the usual tabletop notation:
//! - `3d6`, `d20`, `d%` (percentile)
//! - keep/drop modifiers: `4d6K3` (keep highest), `2d20k1` (keep lowest),
//!   `5d10X1` (drop highest), `4d6x1` (drop lowest)
//! - integer constants, `+`, `-`, `*`, `/` (rounding down), unary minus and
//!   parentheses: `3 * (1d8 + 1)`, `1/2 * 1d8`
//!
//! ```rust
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let roll = dice_core::roll("2d6 + 3", &mut rng).unwrap();
//! assert!((5..=15).contains(&roll.value));
//! ```

mod expr;
mod parser;

pub use expr::{DiceExpr, DiceTerm, Modifier};

use rand::Rng;
use thiserror::Error;

/// Upper bound on the number of dice a single term may roll
pub const MAX_DICE: u32 = 1000;

/// Outcome of evaluating a dice expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    pub value: i64,
    /// Human readable breakdown, e.g. `[5, 4, ~~1~~, 3] = 12`
    pub explanation: String,
}

/// Error parsing or evaluating a dice expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Empty dice expression")]
    Empty,
    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("Unexpected end of dice expression")]
    UnexpectedEnd,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Dice must have at least one side")]
    ZeroSides,
    #[error("Too many dice: {0}")]
    TooManyDice(u32),
    #[error("Cannot keep or drop {keep} of {count} dice")]
    InvalidModifier { count: u32, keep: u32 },
    #[error("Arithmetic overflow while evaluating dice expression")]
    Overflow,
    #[error("Division by zero in dice expression")]
    DivisionByZero,
}

/// Parse and roll an expression in one step
pub fn roll<R: Rng>(expr: &str, rng: &mut R) -> Result<DiceRoll, DiceError> {
    DiceExpr::parse(expr)?.roll(rng)
}
