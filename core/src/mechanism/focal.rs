use serde::{Deserialize, Serialize};
use std::fmt;

use crate::mechanism::pick::{ArrivalId, Pick};
use crate::prelude::{ReviewError, ReviewResult};

/// Opaque handle telling the waveform store where this mechanism's data lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLocator(pub String);

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fault plane in degrees, Aki & Richards convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodalPlane {
    pub strike: f64,
    pub dip: f64,
    pub rake: f64,
}

impl NodalPlane {
    pub fn new(strike: f64, dip: f64, rake: f64) -> Self {
        Self { strike, dip, rake }
    }
}

/// Precomputed focal mechanism with the picks that constrain it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocalMechanism {
    pub origin_id: String,
    pub picks: Vec<Pick>,
    pub plane1: NodalPlane,
    pub plane2: NodalPlane,
    pub source: SourceLocator,
}

impl FocalMechanism {
    pub fn from_json(contents: &str) -> ReviewResult<Self> {
        let mechanism: FocalMechanism = serde_json::from_str(contents)
            .map_err(|err| ReviewError::InvalidGeometry(format!("mechanism json: {err}")))?;
        mechanism.check_unique_arrivals()?;
        Ok(mechanism)
    }

    pub fn pick(&self, index: usize) -> Option<&Pick> {
        self.picks.get(index)
    }

    pub fn position_of(&self, arrival_id: ArrivalId) -> Option<usize> {
        self.picks
            .iter()
            .position(|pick| pick.arrival_id == arrival_id)
    }

    /// Arrival identifiers must be unique within a mechanism.
    pub fn check_unique_arrivals(&self) -> ReviewResult<()> {
        let mut seen = std::collections::HashSet::with_capacity(self.picks.len());
        for pick in &self.picks {
            if !seen.insert(pick.arrival_id) {
                return Err(ReviewError::InvalidGeometry(format!(
                    "duplicate arrival {} at station {}",
                    pick.arrival_id, pick.station
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "origin_id": "orid-17",
            "picks": [
                {"station": "AAA", "arrival_id": 1, "azimuth": 30.0, "takeoff": 100.0, "polarity": 1},
                {"station": "BBB", "arrival_id": 2, "azimuth": 200.0, "takeoff": 60.0, "polarity": -1}
            ],
            "plane1": {"strike": 10.0, "dip": 60.0, "rake": 90.0},
            "plane2": {"strike": 190.0, "dip": 30.0, "rake": 90.0},
            "source": "memory://test"
        }"#
    }

    #[test]
    fn mechanism_parses_from_json() {
        let mechanism = FocalMechanism::from_json(sample_json()).unwrap();
        assert_eq!(mechanism.picks.len(), 2);
        assert_eq!(mechanism.source, SourceLocator("memory://test".into()));
        assert_eq!(mechanism.position_of(ArrivalId(2)), Some(1));
    }

    #[test]
    fn duplicate_arrivals_are_rejected() {
        let json = sample_json().replace("\"arrival_id\": 2", "\"arrival_id\": 1");
        assert!(matches!(
            FocalMechanism::from_json(&json),
            Err(ReviewError::InvalidGeometry(_))
        ));
    }
}
