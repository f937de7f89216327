//! Hubs: routing nodes grouping co-located stations.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{HubId, LineId, Mode, StationId};

/// One physical station grouped under a hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstituentStation {
    pub name: String,
    pub id: StationId,
}

/// A routing node representing one or more physically co-located stations.
///
/// Mode and line sets are the union over the constituents. A hub is created
/// once during graph construction and is never merged or split afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hub {
    pub id: HubId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub modes: BTreeSet<Mode>,
    pub lines: BTreeSet<LineId>,
    pub constituents: Vec<ConstituentStation>,
}

impl Hub {
    /// Create a hub with no constituents yet.
    pub fn new(id: HubId, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id,
            name: name.into(),
            lat,
            lon,
            modes: BTreeSet::new(),
            lines: BTreeSet::new(),
            constituents: Vec::new(),
        }
    }

    /// Add a constituent station unless it is already listed.
    ///
    /// Returns `true` if the station was added.
    pub fn add_constituent(&mut self, id: StationId, name: impl Into<String>) -> bool {
        if self.has_constituent(&id) {
            return false;
        }
        self.constituents.push(ConstituentStation {
            name: name.into(),
            id,
        });
        true
    }

    pub fn has_constituent(&self, id: &StationId) -> bool {
        self.constituents.iter().any(|c| &c.id == id)
    }

    /// Station identifier to use when asking the journey planner about this hub.
    ///
    /// The hub's own identifier unless it is a synthetic grouping, in which
    /// case the first constituent stands in for it.
    pub fn representative_station(&self) -> Option<StationId> {
        if !self.id.is_synthetic() {
            return StationId::parse(self.id.as_str()).ok();
        }
        self.constituents.first().map(|c| c.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(s: &str) -> StationId {
        StationId::parse(s).unwrap()
    }

    #[test]
    fn constituents_are_deduplicated() {
        let mut hub = Hub::new(HubId::parse("HUBKGX").unwrap(), "King's Cross", 51.53, -0.12);
        assert!(hub.add_constituent(station("940GZZLUKSX"), "King's Cross St. Pancras"));
        assert!(hub.add_constituent(station("910GKGX"), "London King's Cross"));
        assert!(!hub.add_constituent(station("940GZZLUKSX"), "duplicate"));
        assert_eq!(hub.constituents.len(), 2);
    }

    #[test]
    fn representative_of_plain_hub_is_itself() {
        let hub = Hub::new(HubId::parse("940GZZLUOXC").unwrap(), "Oxford Circus", 51.5, -0.14);
        assert_eq!(hub.representative_station(), Some(station("940GZZLUOXC")));
    }

    #[test]
    fn representative_of_synthetic_hub_is_first_constituent() {
        let mut hub = Hub::new(HubId::parse("HUBBDS").unwrap(), "Bond Street", 51.51, -0.15);
        assert_eq!(hub.representative_station(), None);
        hub.add_constituent(station("940GZZLUBND"), "Bond Street Underground");
        hub.add_constituent(station("910GBONDST"), "Bond Street Elizabeth line");
        assert_eq!(hub.representative_station(), Some(station("940GZZLUBND")));
    }
}
