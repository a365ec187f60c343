use serde::{Deserialize, Serialize};
use std::fmt;

use crate::prelude::{ReviewError, ReviewResult};

/// Key of a detected onset in the waveform store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArrivalId(pub u64);

impl fmt::Display for ArrivalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// First-motion direction of a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Compressional first motion.
    Up,
    /// Dilatational first motion.
    Down,
}

impl Polarity {
    pub fn from_sign(sign: i8) -> Option<Self> {
        match sign {
            s if s > 0 => Some(Polarity::Up),
            s if s < 0 => Some(Polarity::Down),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Polarity::Up => Polarity::Down,
            Polarity::Down => Polarity::Up,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Polarity::Up => "U",
            Polarity::Down => "D",
        }
    }

    pub fn sign(self) -> i8 {
        match self {
            Polarity::Up => 1,
            Polarity::Down => -1,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One first-motion observation as delivered by the mechanism source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub station: String,
    pub arrival_id: ArrivalId,
    /// Degrees clockwise from north.
    pub azimuth: f64,
    /// Degrees from vertical-up, 0..=180.
    pub takeoff: f64,
    /// Signed first motion; positive is compressional.
    pub polarity: i8,
}

impl Pick {
    pub fn new(
        station: impl Into<String>,
        arrival_id: u64,
        azimuth: f64,
        takeoff: f64,
        polarity: i8,
    ) -> Self {
        Self {
            station: station.into(),
            arrival_id: ArrivalId(arrival_id),
            azimuth,
            takeoff,
            polarity,
        }
    }

    /// Source polarity; `index` is only used to describe the failure.
    pub fn source_polarity(&self, index: usize) -> ReviewResult<Polarity> {
        Polarity::from_sign(self.polarity).ok_or_else(|| ReviewError::ZeroPolarity {
            index,
            station: self.station.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_sign_maps_to_label() {
        assert_eq!(Polarity::from_sign(1), Some(Polarity::Up));
        assert_eq!(Polarity::from_sign(-3), Some(Polarity::Down));
        assert_eq!(Polarity::from_sign(0), None);
        assert_eq!(Polarity::Up.label(), "U");
        assert_eq!(Polarity::Down.toggled(), Polarity::Up);
    }

    #[test]
    fn zero_polarity_pick_is_rejected() {
        let pick = Pick::new("BAR", 9, 10.0, 45.0, 0);
        let err = pick.source_polarity(2).unwrap_err();
        assert_eq!(
            err,
            ReviewError::ZeroPolarity {
                index: 2,
                station: "BAR".into()
            }
        );
    }
}
