//! The capability assignment document.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Capability names assigned to each identity.
///
/// This is the whole persisted document: stores load and save it in one
/// piece. Keys are identities (email addresses), values are capability
/// names. An identity mapped to an empty set is kept, so that removing a
/// user's last capability is visible in the stored file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignments(BTreeMap<String, BTreeSet<String>>);

impl Assignments {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capabilities assigned to `identity`, if the identity is known.
    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&BTreeSet<String>> {
        self.0.get(identity)
    }

    /// Capabilities assigned to `identity`, creating an empty entry if needed.
    pub fn entry(&mut self, identity: &str) -> &mut BTreeSet<String> {
        self.0.entry(identity.to_owned()).or_default()
    }

    /// Replace the capabilities of `identity` outright.
    pub fn replace(&mut self, identity: &str, capabilities: BTreeSet<String>) {
        self.0.insert(identity.to_owned(), capabilities);
    }

    /// Whether `identity` has `capability` assigned directly.
    #[must_use]
    pub fn has(&self, identity: &str, capability: &str) -> bool {
        self.get(identity)
            .is_some_and(|capabilities| capabilities.contains(capability))
    }

    /// Number of identities in the document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document has no identities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identities and their capabilities, sorted by identity.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.0.iter()
    }
}

impl<I, C> FromIterator<(I, C)> for Assignments
where
    I: Into<String>,
    C: IntoIterator,
    C::Item: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (I, C)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(identity, caps)| {
                    (identity.into(), caps.into_iter().map(Into::into).collect())
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creates_empty_set() {
        let mut doc = Assignments::new();
        doc.entry("wiggum@springfield.us").insert("police".to_owned());

        assert!(doc.has("wiggum@springfield.us", "police"));
        assert!(!doc.has("wiggum@springfield.us", "mafia"));
        assert!(!doc.has("nobody@nowhere", "police"));
    }

    #[test]
    fn test_empty_entry_survives_yaml() {
        let mut doc = Assignments::from_iter([("boss@corleone.com", ["mafia"])]);
        doc.entry("boss@corleone.com").remove("mafia");

        let yaml = serde_yaml::to_string(&doc).unwrap();
        let parsed: Assignments = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.get("boss@corleone.com"), Some(&BTreeSet::new()));
    }

    #[test]
    fn test_parses_plain_mapping() {
        let yaml = "paul.baguette@corleone.com:\n  - mafia\n  - baker\nwiggum@springfield.us: [police]\n";
        let doc: Assignments = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(doc.len(), 2);
        assert!(doc.has("paul.baguette@corleone.com", "baker"));
        assert!(doc.has("wiggum@springfield.us", "police"));
    }
}
