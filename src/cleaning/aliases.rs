//! State/union-territory alias table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Known misspellings and legacy names, mapped to their canonical spelling.
///
/// Keys are matched exactly. Some keys only ever match after title-casing,
/// which is why normalization looks the table up twice. Every canonical value
/// is stable under title-casing so the second lookup cannot undo the first.
static DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("Andaman And Nicobar Islands", "Andaman & Nicobar"),
    ("Andaman and Nicobar Islands", "Andaman & Nicobar"),
    ("Andhra Pradesh", "Andhra Pradesh"),
    ("Andhra pradesh", "Andhra Pradesh"),
    ("Dadra And Nagar Haveli", "Dadra & Nagar Haveli"),
    ("Dadra and Nagar Haveli", "Dadra & Nagar Haveli"),
    (
        "Dadra And Nagar Haveli And Daman And Diu",
        "Dadra & Nagar Haveli And Daman & Diu",
    ),
    (
        "The Dadra And Nagar Haveli And Daman And Diu",
        "Dadra & Nagar Haveli And Daman & Diu",
    ),
    ("Daman And Diu", "Daman & Diu"),
    ("Daman and Diu", "Daman & Diu"),
    ("Jammu And Kashmir", "Jammu & Kashmir"),
    ("Jammu and Kashmir", "Jammu & Kashmir"),
    ("Orissa", "Odisha"),
    ("ODISHA", "Odisha"),
    ("Pondicherry", "Puducherry"),
    ("West Bangal", "West Bengal"),
    ("Westbengal", "West Bengal"),
    ("West bengal", "West Bengal"),
    ("WEST BENGAL", "West Bengal"),
    ("WESTBENGAL", "West Bengal"),
    ("West  Bengal", "West Bengal"),
];

/// Immutable alias lookup passed into the state normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateAliases {
    map: BTreeMap<String, String>,
}

impl StateAliases {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        StateAliases {
            map: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Exact-match lookup.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Replaces `name` with its canonical form when it is a known alias.
    pub fn resolve(&self, name: String) -> String {
        match self.lookup(&name) {
            Some(canonical) => canonical.to_string(),
            None => name,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for StateAliases {
    fn default() -> Self {
        StateAliases::new(DEFAULT_ALIASES.iter().copied())
    }
}
