use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// CEFR proficiency levels, ordered from easiest to hardest
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub const ALL: [CefrLevel; 6] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
        CefrLevel::C2,
    ];

    pub fn first() -> Self {
        CefrLevel::A1
    }

    /// Position in the level ordering (A1 = 0)
    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    pub fn previous(self) -> Option<Self> {
        self.ordinal().checked_sub(1).map(|i| Self::ALL[i])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(pub String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown CEFR level '{}'", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for CefrLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.to_string() == wanted)
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

/// Outcome of a placement test: either a real level or the pseudo-level below A1.
///
/// `Beginner` orders below every real level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Placement {
    Beginner,
    Level(CefrLevel),
}

impl Placement {
    pub fn level(self) -> Option<CefrLevel> {
        match self {
            Placement::Beginner => None,
            Placement::Level(level) => Some(level),
        }
    }

    pub fn is_beginner(self) -> bool {
        matches!(self, Placement::Beginner)
    }
}

impl From<CefrLevel> for Placement {
    fn from(level: CefrLevel) -> Self {
        Placement::Level(level)
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Beginner => write!(f, "Beginner"),
            Placement::Level(level) => write!(f, "{level}"),
        }
    }
}

impl FromStr for Placement {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("beginner") {
            Ok(Placement::Beginner)
        } else {
            s.parse::<CefrLevel>().map(Placement::Level)
        }
    }
}

impl From<Placement> for String {
    fn from(placement: Placement) -> Self {
        placement.to_string()
    }
}

impl TryFrom<String> for Placement {
    type Error = ParseLevelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        for pair in CefrLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].next(), Some(pair[1]));
            assert_eq!(pair[1].previous(), Some(pair[0]));
        }
        assert_eq!(CefrLevel::C2.next(), None);
        assert_eq!(CefrLevel::A1.previous(), None);
    }

    #[test]
    fn ordinal_matches_position() {
        assert_eq!(CefrLevel::A1.ordinal(), 0);
        assert_eq!(CefrLevel::B2.ordinal(), 3);
        assert_eq!(CefrLevel::C2.ordinal(), 5);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("b1".parse::<CefrLevel>(), Ok(CefrLevel::B1));
        assert_eq!(" C2 ".parse::<CefrLevel>(), Ok(CefrLevel::C2));
        assert!("D1".parse::<CefrLevel>().is_err());
    }

    #[test]
    fn beginner_orders_below_a1() {
        assert!(Placement::Beginner < Placement::Level(CefrLevel::A1));
        assert!(Placement::Level(CefrLevel::A2) < Placement::Level(CefrLevel::B1));
    }

    #[test]
    fn placement_serializes_as_plain_string() {
        let json = serde_json::to_string(&Placement::Level(CefrLevel::B2)).unwrap();
        assert_eq!(json, "\"B2\"");
        let json = serde_json::to_string(&Placement::Beginner).unwrap();
        assert_eq!(json, "\"Beginner\"");

        let parsed: Placement = serde_json::from_str("\"C1\"").unwrap();
        assert_eq!(parsed, Placement::Level(CefrLevel::C1));
        assert!(serde_json::from_str::<Placement>("\"Z9\"").is_err());
    }
}
