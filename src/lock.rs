use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::LockError;

/// Number of slots on the lock face.
pub const SLOTS: usize = 8;

/// Largest symbol a slot may hold.
pub const MAX_SYMBOL: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Operator {
    L2,
    R2,
    X,
}

impl Operator {
    /// Expansion order. Decides which shortest path wins a tie.
    pub const ALL: [Operator; 3] = [Operator::L2, Operator::R2, Operator::X];

    pub fn inverse(&self) -> Option<Self> {
        match self {
            Operator::L2 => Some(Operator::R2),
            Operator::R2 => Some(Operator::L2),
            // Undoing X takes two more X moves.
            Operator::X => None,
        }
    }

    pub fn is_legal(&self, state: &State) -> bool {
        match self {
            Operator::L2 | Operator::R2 => true,
            Operator::X => !state.middle_uniform(),
        }
    }

    pub fn apply(&self, state: &State) -> State {
        let mut slots = state.0;
        match self {
            Operator::L2 => slots.rotate_left(2),
            Operator::R2 => slots.rotate_right(2),
            Operator::X => slots[3..6].rotate_left(1),
        }
        State(slots)
    }

    /// `apply` guarded by `is_legal`.
    pub fn try_apply(&self, state: &State) -> Option<State> {
        if self.is_legal(state) {
            Some(self.apply(state))
        } else {
            None
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Operator::L2 => "L2",
            Operator::R2 => "R2",
            Operator::X => "X",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Operator {
    type Err = LockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L2" => Ok(Operator::L2),
            "R2" => Ok(Operator::R2),
            "X" => Ok(Operator::X),
            other => Err(LockError::InvalidState(format!(
                "unknown operator '{}'",
                other
            ))),
        }
    }
}

/// One face of the lock, slots read clockwise from 12 o'clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct State([u8; SLOTS]);

impl State {
    pub fn new(slots: [u8; SLOTS]) -> Result<Self, LockError> {
        if let Some((index, value)) = slots
            .iter()
            .enumerate()
            .find(|&(_, &value)| value > MAX_SYMBOL)
        {
            return Err(LockError::InvalidState(format!(
                "slot {} holds {}, symbols must be in 0..={}",
                index, value, MAX_SYMBOL
            )));
        }
        Ok(Self(slots))
    }

    /// `[0, 1, 2, 3, 4, 5, 6, 7]`
    pub fn identity() -> Self {
        let mut slots = [0; SLOTS];
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = i as u8;
        }
        Self(slots)
    }

    pub fn slots(&self) -> &[u8; SLOTS] {
        &self.0
    }

    /// Packs the face into 32 bits, slot 0 in the top nibble.
    ///
    /// Every symbol fits in a nibble, so distinct states always get distinct keys.
    pub fn key(&self) -> u32 {
        self.0
            .iter()
            .fold(0u32, |acc, &value| (acc << 4) | u32::from(value))
    }

    /// Slots 3, 4 and 5 all hold the same symbol, which makes `X` a no-op.
    pub fn middle_uniform(&self) -> bool {
        self.0[3] == self.0[4] && self.0[4] == self.0[5]
    }

    /// Successors in `Operator::ALL` order, with `X` left out when its guard fails.
    pub fn successors(&self) -> impl Iterator<Item = (State, Operator)> + '_ {
        Operator::ALL
            .iter()
            .filter_map(move |op| op.try_apply(self).map(|next| (next, *op)))
    }

    /// Symbol counts. Operators only permute slots, so this never changes along a path.
    pub fn symbol_counts(&self) -> [u8; MAX_SYMBOL as usize + 1] {
        let mut counts = [0; MAX_SYMBOL as usize + 1];
        for &value in &self.0 {
            counts[value as usize] += 1;
        }
        counts
    }
}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.key());
    }
}

impl TryFrom<&[u8]> for State {
    type Error = LockError;

    fn try_from(values: &[u8]) -> Result<Self, Self::Error> {
        let slots: [u8; SLOTS] = values.try_into().map_err(|_| {
            LockError::InvalidState(format!(
                "expected {} slots, got {}",
                SLOTS,
                values.len()
            ))
        })?;
        State::new(slots)
    }
}

impl FromStr for State {
    type Err = LockError;

    /// Accepts `30000013` or `3 0 0 0 0 0 1 3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let tokens: Vec<&str> = s.split_whitespace().collect();

        let values = if tokens.len() > 1 {
            tokens
                .iter()
                .map(|token| {
                    token.parse::<u8>().map_err(|_| {
                        LockError::InvalidState(format!("'{}' is not a symbol", token))
                    })
                })
                .collect::<Result<Vec<u8>, _>>()?
        } else {
            s.chars()
                .map(|ch| {
                    ch.to_digit(10).map(|d| d as u8).ok_or_else(|| {
                        LockError::InvalidState(format!("'{}' is not a digit", ch))
                    })
                })
                .collect::<Result<Vec<u8>, _>>()?
        };

        State::try_from(values.as_slice())
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

/// Applies `moves` random operators to `start`. A drawn `X` that fails its guard is skipped.
pub fn scramble<R: Rng + ?Sized>(rng: &mut R, start: State, moves: usize) -> State {
    let mut state = start;
    for _ in 0..moves {
        let op = Operator::ALL[rng.gen_range(0..Operator::ALL.len())];
        if let Some(next) = op.try_apply(&state) {
            state = next;
        }
    }
    state
}
