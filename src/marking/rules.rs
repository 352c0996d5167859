use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Accepted value pairs indexed by `[selector - 1][area - 1]`.
pub const RULES: [[[i64; 2]; 6]; 6] = [
    [[6, 1], [5, 6], [4, 5], [3, 4], [2, 3], [1, 2]],
    [[1, 2], [6, 1], [5, 6], [4, 5], [3, 4], [2, 3]],
    [[2, 3], [1, 2], [6, 1], [5, 6], [4, 5], [3, 4]],
    [[3, 4], [2, 3], [1, 2], [6, 1], [5, 6], [4, 5]],
    [[4, 5], [3, 4], [2, 3], [1, 2], [6, 1], [5, 6]],
    [[5, 6], [4, 5], [3, 4], [2, 3], [1, 2], [6, 1]],
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("selector must be a number from 1 to 6, got {0}")]
pub struct InvalidSelector(pub String);

/// The rule row chosen for a run, always within 1..=6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Selector(u8);

impl Selector {
    pub fn get(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Selector> {
        (1..=6).map(Selector)
    }
}

impl TryFrom<u8> for Selector {
    type Error = InvalidSelector;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=6).contains(&value) {
            Ok(Selector(value))
        } else {
            Err(InvalidSelector(value.to_string()))
        }
    }
}

impl FromStr for Selector {
    type Err = InvalidSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| InvalidSelector(s.trim().to_string()))
            .and_then(Selector::try_from)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct RuleTable;

impl RuleTable {
    /// The two values highlighted in `area` under `selector`. Areas past
    /// the sixth have no rule.
    pub fn accepted(selector: Selector, area: usize) -> Option<[i64; 2]> {
        if !(1..=6).contains(&area) {
            return None;
        }
        Some(RULES[selector.0 as usize - 1][area - 1])
    }

    pub fn matches(selector: Selector, area: usize, value: i64) -> bool {
        Self::accepted(selector, area).is_some_and(|pair| pair.contains(&value))
    }
}
