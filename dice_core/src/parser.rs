use crate::expr::{DiceExpr, DiceTerm, Modifier};
use crate::DiceError;

/// Recursive descent parser over the expression bytes
pub(crate) struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Parser { input, pos: 0 }
    }

    pub(crate) fn parse(mut self) -> Result<DiceExpr, DiceError> {
        if self.input.trim().is_empty() {
            return Err(DiceError::Empty);
        }
        let expr = self.expr()?;
        self.skip_whitespace();
        match self.peek() {
            None => Ok(expr),
            Some(ch) => Err(DiceError::UnexpectedChar { ch, pos: self.pos }),
        }
    }

    fn expr(&mut self) -> Result<DiceExpr, DiceError> {
        let mut left = self.term()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    left = DiceExpr::Add(Box::new(left), Box::new(self.term()?));
                }
                Some('-') => {
                    self.pos += 1;
                    left = DiceExpr::Sub(Box::new(left), Box::new(self.term()?));
                }
                _ => return Ok(left),
            }
        }
    }

    fn term(&mut self) -> Result<DiceExpr, DiceError> {
        let mut left = self.factor()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    left = DiceExpr::Mul(Box::new(left), Box::new(self.factor()?));
                }
                Some('/') => {
                    self.pos += 1;
                    left = DiceExpr::Div(Box::new(left), Box::new(self.factor()?));
                }
                _ => return Ok(left),
            }
        }
    }

    fn factor(&mut self) -> Result<DiceExpr, DiceError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(DiceError::UnexpectedEnd),
            Some('-') => {
                self.pos += 1;
                Ok(DiceExpr::Neg(Box::new(self.factor()?)))
            }
            Some('(') => {
                self.pos += 1;
                let inner = self.expr()?;
                self.skip_whitespace();
                match self.peek() {
                    Some(')') => {
                        self.pos += 1;
                        Ok(DiceExpr::Group(Box::new(inner)))
                    }
                    Some(ch) => Err(DiceError::UnexpectedChar { ch, pos: self.pos }),
                    None => Err(DiceError::UnexpectedEnd),
                }
            }
            Some('d') | Some('D') => self.dice(1),
            Some(ch) if ch.is_ascii_digit() => {
                let number = self.number()?;
                if matches!(self.peek(), Some('d') | Some('D')) {
                    let count = u32::try_from(number)
                        .map_err(|_| DiceError::TooManyDice(u32::MAX))?;
                    self.dice(count)
                } else {
                    Ok(DiceExpr::Number(number))
                }
            }
            Some(ch) => Err(DiceError::UnexpectedChar { ch, pos: self.pos }),
        }
    }

    /// Parses `d<sides>[modifier]`; the count has already been consumed
    fn dice(&mut self, count: u32) -> Result<DiceExpr, DiceError> {
        self.pos += 1;
        let sides = match self.peek() {
            Some('%') => {
                self.pos += 1;
                100
            }
            Some(ch) if ch.is_ascii_digit() => self.small_number()?,
            Some(ch) => return Err(DiceError::UnexpectedChar { ch, pos: self.pos }),
            None => return Err(DiceError::UnexpectedEnd),
        };

        let modifier = match self.peek() {
            Some(tag @ ('K' | 'k' | 'X' | 'x')) => {
                self.pos += 1;
                match self.peek() {
                    Some(ch) if ch.is_ascii_digit() => {}
                    Some(ch) => return Err(DiceError::UnexpectedChar { ch, pos: self.pos }),
                    None => return Err(DiceError::UnexpectedEnd),
                }
                let n = self.small_number()?;
                Some(match tag {
                    'K' => Modifier::KeepHighest(n),
                    'k' => Modifier::KeepLowest(n),
                    'X' => Modifier::DropHighest(n),
                    _ => Modifier::DropLowest(n),
                })
            }
            _ => None,
        };

        Ok(DiceExpr::Dice(DiceTerm::new(count, sides, modifier)?))
    }

    fn number(&mut self) -> Result<i64, DiceError> {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        digits
            .parse::<i64>()
            .map_err(|_| DiceError::InvalidNumber(digits.to_string()))
    }

    fn small_number(&mut self) -> Result<u32, DiceError> {
        let n = self.number()?;
        u32::try_from(n).map_err(|_| DiceError::InvalidNumber(n.to_string()))
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }
}
