use crate::{DiceError, DiceRoll};
use rand::Rng;

/// Parsed dice expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiceExpr {
    Number(i64),
    Dice(DiceTerm),
    Group(Box<DiceExpr>),
    Add(Box<DiceExpr>, Box<DiceExpr>),
    Sub(Box<DiceExpr>, Box<DiceExpr>),
    Mul(Box<DiceExpr>, Box<DiceExpr>),
    /// Integer division rounding toward negative infinity
    Div(Box<DiceExpr>, Box<DiceExpr>),
    Neg(Box<DiceExpr>),
}

/// A single `NdM` term with an optional keep/drop modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceTerm {
    count: u32,
    sides: u32,
    modifier: Option<Modifier>,
}

/// Keep/drop rule applied to the dice of a term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// `K`
    KeepHighest(u32),
    /// `k`
    KeepLowest(u32),
    /// `X`
    DropHighest(u32),
    /// `x`
    DropLowest(u32),
}

impl Modifier {
    /// How many of `count` dice are dropped, counted from the low or high end
    fn dropped(self, count: u32) -> (u32, u32) {
        match self {
            Modifier::KeepHighest(n) => (count - n, 0),
            Modifier::KeepLowest(n) => (0, count - n),
            Modifier::DropHighest(n) => (0, n),
            Modifier::DropLowest(n) => (n, 0),
        }
    }

    fn amount(self) -> u32 {
        match self {
            Modifier::KeepHighest(n)
            | Modifier::KeepLowest(n)
            | Modifier::DropHighest(n)
            | Modifier::DropLowest(n) => n,
        }
    }
}

impl DiceTerm {
    /// Build a term, rejecting zero sides, more than [`MAX_DICE`](crate::MAX_DICE)
    /// dice, or a modifier that keeps or drops more dice than are rolled
    pub fn new(count: u32, sides: u32, modifier: Option<Modifier>) -> Result<Self, DiceError> {
        if sides == 0 {
            return Err(DiceError::ZeroSides);
        }
        if count > crate::MAX_DICE {
            return Err(DiceError::TooManyDice(count));
        }
        if let Some(m) = modifier {
            if m.amount() > count {
                return Err(DiceError::InvalidModifier {
                    count,
                    keep: m.amount(),
                });
            }
        }
        Ok(DiceTerm {
            count,
            sides,
            modifier,
        })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn sides(&self) -> u32 {
        self.sides
    }

    pub fn modifier(&self) -> Option<Modifier> {
        self.modifier
    }

    fn roll<R: Rng>(&self, rng: &mut R) -> (i64, String) {
        let values: Vec<i64> = (0..self.count)
            .map(|_| rng.gen_range(1..=self.sides) as i64)
            .collect();

        let mut kept = vec![true; values.len()];
        if let Some(modifier) = self.modifier {
            let (low, high) = modifier.dropped(self.count);
            let mut order: Vec<usize> = (0..values.len()).collect();
            order.sort_by_key(|&i| (values[i], i));
            for &i in order.iter().take(low as usize) {
                kept[i] = false;
            }
            for &i in order.iter().rev().take(high as usize) {
                kept[i] = false;
            }
        }

        let total = values
            .iter()
            .zip(&kept)
            .filter(|(_, &k)| k)
            .map(|(v, _)| v)
            .sum();

        let shown: Vec<String> = values
            .iter()
            .zip(&kept)
            .map(|(v, &k)| if k { v.to_string() } else { format!("~~{}~~", v) })
            .collect();

        (total, format!("[{}]", shown.join(", ")))
    }
}

impl DiceExpr {
    /// Parse an expression without rolling it
    pub fn parse(input: &str) -> Result<Self, DiceError> {
        crate::parser::Parser::new(input).parse()
    }

    /// Roll every dice term and evaluate the expression
    pub fn roll<R: Rng>(&self, rng: &mut R) -> Result<DiceRoll, DiceError> {
        let (value, text) = self.eval(rng)?;
        Ok(DiceRoll {
            value,
            explanation: format!("{} = {}", text, value),
        })
    }

    fn eval<R: Rng>(&self, rng: &mut R) -> Result<(i64, String), DiceError> {
        match self {
            DiceExpr::Number(n) => Ok((*n, n.to_string())),
            DiceExpr::Dice(term) => Ok(term.roll(rng)),
            DiceExpr::Group(inner) => {
                let (v, t) = inner.eval(rng)?;
                Ok((v, format!("({})", t)))
            }
            DiceExpr::Add(a, b) => binary(a, b, "+", rng, i64::checked_add),
            DiceExpr::Sub(a, b) => binary(a, b, "-", rng, i64::checked_sub),
            DiceExpr::Mul(a, b) => binary(a, b, "*", rng, i64::checked_mul),
            DiceExpr::Div(a, b) => {
                let (left, left_text) = a.eval(rng)?;
                let (right, right_text) = b.eval(rng)?;
                if right == 0 {
                    return Err(DiceError::DivisionByZero);
                }
                let value = floor_div(left, right).ok_or(DiceError::Overflow)?;
                Ok((value, format!("{} / {}", left_text, right_text)))
            }
            DiceExpr::Neg(inner) => {
                let (v, t) = inner.eval(rng)?;
                let value = v.checked_neg().ok_or(DiceError::Overflow)?;
                Ok((value, format!("-{}", t)))
            }
        }
    }
}

fn binary<R: Rng>(
    a: &DiceExpr,
    b: &DiceExpr,
    op: &str,
    rng: &mut R,
    apply: fn(i64, i64) -> Option<i64>,
) -> Result<(i64, String), DiceError> {
    let (left, left_text) = a.eval(rng)?;
    let (right, right_text) = b.eval(rng)?;
    let value = apply(left, right).ok_or(DiceError::Overflow)?;
    Ok((value, format!("{} {} {}", left_text, op, right_text)))
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}
