//! Station name lookup.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::domain::{HubId, StationId};
use crate::graph::HubGraph;

/// Suffixes dropped from names before matching, longest first.
const NAME_SUFFIXES: &[&str] = &[
    "underground station",
    "rail station",
    "dlr station",
    "station",
];

/// Maximum candidates listed for an ambiguous query.
const MAX_AMBIGUOUS: usize = 10;

/// A hub matching a name query.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct StationMatch {
    pub name: String,
    pub hub: HubId,
}

/// Outcome of resolving free text to a hub.
#[derive(Debug, Clone, PartialEq)]
pub enum NameMatch {
    Found(HubId),
    Ambiguous(Vec<StationMatch>),
    NotFound,
}

/// Lowercase, drop punctuation, collapse whitespace and strip common
/// "station" suffixes.
pub fn normalize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    let mut joined = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    for suffix in NAME_SUFFIXES {
        if let Some(stripped) = joined.strip_suffix(suffix)
            && !stripped.trim().is_empty()
        {
            joined = stripped.trim_end().to_string();
            break;
        }
    }
    joined
}

#[derive(Debug, Default)]
struct NameIndex {
    /// Normalized name -> hubs it names.
    by_name: BTreeMap<String, BTreeSet<HubId>>,
    /// Constituent station id -> hub.
    by_station: HashMap<StationId, HubId>,
    display: HashMap<HubId, String>,
}

impl NameIndex {
    fn build(graph: &HubGraph) -> Self {
        let mut index = NameIndex::default();
        for hub in graph.hubs() {
            index.display.insert(hub.id.clone(), hub.name.clone());
            let names = std::iter::once(hub.name.as_str())
                .chain(hub.constituents.iter().map(|c| c.name.as_str()));
            for name in names {
                let key = normalize(name);
                if !key.is_empty() {
                    index.by_name.entry(key).or_default().insert(hub.id.clone());
                }
            }
            for station in &hub.constituents {
                index.by_station.insert(station.id.clone(), hub.id.clone());
            }
        }
        index
    }

    fn entry(&self, hub: &HubId) -> StationMatch {
        StationMatch {
            name: self.display.get(hub).cloned().unwrap_or_default(),
            hub: hub.clone(),
        }
    }

    /// Hubs whose names start with `query`, then hubs whose names contain it.
    fn matching(&self, query: &str) -> Vec<HubId> {
        let mut prefix = BTreeSet::new();
        let mut contains = BTreeSet::new();
        for (name, hubs) in &self.by_name {
            if name.starts_with(query) {
                prefix.extend(hubs.iter().cloned());
            } else if name.contains(query) {
                contains.extend(hubs.iter().cloned());
            }
        }
        let mut first: Vec<StationMatch> = prefix.iter().map(|h| self.entry(h)).collect();
        let mut rest: Vec<StationMatch> = contains
            .iter()
            .filter(|h| !prefix.contains(*h))
            .map(|h| self.entry(h))
            .collect();
        first.sort();
        rest.sort();
        first.into_iter().chain(rest).map(|m| m.hub).collect()
    }

    fn resolve(&self, query: &str) -> NameMatch {
        let trimmed = query.trim();
        if let Ok(id) = HubId::parse(trimmed)
            && self.display.contains_key(&id)
        {
            return NameMatch::Found(id);
        }
        if let Ok(station) = StationId::parse(trimmed)
            && let Some(hub) = self.by_station.get(&station)
        {
            return NameMatch::Found(hub.clone());
        }

        let key = normalize(trimmed);
        if key.is_empty() {
            return NameMatch::NotFound;
        }
        let hubs: Vec<HubId> = match self.by_name.get(&key) {
            Some(exact) => exact.iter().cloned().collect(),
            None => self.matching(&key),
        };
        match hubs.as_slice() {
            [] => NameMatch::NotFound,
            [only] => NameMatch::Found(only.clone()),
            many => NameMatch::Ambiguous(
                many.iter()
                    .take(MAX_AMBIGUOUS)
                    .map(|h| self.entry(h))
                    .collect(),
            ),
        }
    }
}

/// Station name lookup shared across request handlers.
///
/// Maps free text (hub id, station id, hub name or constituent name) to
/// hubs of a graph.
#[derive(Debug, Clone)]
pub struct StationNames {
    inner: Arc<NameIndex>,
}

impl StationNames {
    /// Build the lookup from a graph.
    pub fn from_graph(graph: &HubGraph) -> Self {
        Self {
            inner: Arc::new(NameIndex::build(graph)),
        }
    }

    /// Resolve free text to a single hub.
    pub fn resolve(&self, query: &str) -> NameMatch {
        self.inner.resolve(query)
    }

    /// Hubs whose names match `query`, prefix matches first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<StationMatch> {
        let key = normalize(query);
        if key.is_empty() {
            return Vec::new();
        }
        self.inner
            .matching(&key)
            .iter()
            .take(limit)
            .map(|h| self.inner.entry(h))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub(s: &str) -> HubId {
        HubId::parse(s).unwrap()
    }

    fn graph() -> HubGraph {
        let mut g = HubGraph::new();
        let entries = [
            ("HUBKGX", "King's Cross St. Pancras", vec![
                ("940GZZLUKSX", "King's Cross St. Pancras Underground Station"),
                ("910GKGX", "London Kings Cross Rail Station"),
            ]),
            ("940GZZLUOXC", "Oxford Circus Underground Station", vec![(
                "940GZZLUOXC",
                "Oxford Circus Underground Station",
            )]),
            ("940GZZLUBST", "Baker Street Underground Station", vec![(
                "940GZZLUBST",
                "Baker Street Underground Station",
            )]),
            ("940GZZLUBKF", "Blackfriars Underground Station", vec![(
                "940GZZLUBKF",
                "Blackfriars Underground Station",
            )]),
        ];
        for (id, name, stations) in entries {
            g.upsert_hub(hub(id), name, 51.5, -0.1);
            for (sid, sname) in stations {
                g.add_station(&hub(id), StationId::parse(sid).unwrap(), sname)
                    .unwrap();
            }
        }
        g
    }

    #[test]
    fn normalize_strips_suffixes_and_punctuation() {
        assert_eq!(normalize("Oxford Circus Underground Station"), "oxford circus");
        assert_eq!(normalize("King's Cross  St. Pancras"), "king s cross st pancras");
        assert_eq!(normalize("Station"), "station");
    }

    #[test]
    fn resolves_ids_and_names() {
        let names = StationNames::from_graph(&graph());

        assert_eq!(names.resolve("HUBKGX"), NameMatch::Found(hub("HUBKGX")));
        assert_eq!(names.resolve("910GKGX"), NameMatch::Found(hub("HUBKGX")));
        assert_eq!(names.resolve("oxford circus"), NameMatch::Found(hub("940GZZLUOXC")));
        assert_eq!(
            names.resolve("London Kings Cross"),
            NameMatch::Found(hub("HUBKGX"))
        );
    }

    #[test]
    fn partial_names_can_be_ambiguous() {
        let names = StationNames::from_graph(&graph());

        let NameMatch::Ambiguous(candidates) = names.resolve("b") else {
            panic!("expected an ambiguous match");
        };
        let hubs: Vec<_> = candidates.into_iter().map(|c| c.hub).collect();
        assert!(hubs.contains(&hub("940GZZLUBST")));
        assert!(hubs.contains(&hub("940GZZLUBKF")));
        assert_eq!(names.resolve("nowhere at all"), NameMatch::NotFound);
        assert_eq!(names.resolve("  "), NameMatch::NotFound);
    }

    #[test]
    fn search_lists_prefix_matches_first() {
        let names = StationNames::from_graph(&graph());

        let results = names.search("cross", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].hub, hub("HUBKGX"));

        let results = names.search("bla", 10);
        assert_eq!(results[0].name, "Blackfriars Underground Station");
        assert_eq!(names.search("b", 1).len(), 1);
    }
}
