//! Append-only transcript of one request.

use crate::graph::NodeId;
use crate::lookup::NutritionFacts;

/// One tagged transcript entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    User(String),
    System(String),
    Assistant(String),
    /// Audit record of a routing decision.
    NextNode(NodeId),
    /// Query the lookup stage should resolve.
    LookupRequest(String),
    LookupResult(NutritionFacts),
}

impl Entry {
    /// Role tag as it appears in logs.
    pub fn role(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::System(_) => "system",
            Self::Assistant(_) => "assistant",
            Self::NextNode(_) => "control_next_node",
            Self::LookupRequest(_) => "control_lookup_request",
            Self::LookupResult(_) => "control_lookup_result",
        }
    }
}

/// Ordered entries. There is no way to edit or remove an entry once appended.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    /// A transcript seeded with the user's message.
    pub fn seeded(message: impl Into<String>) -> Self {
        Self {
            entries: vec![Entry::User(message.into())],
        }
    }

    pub fn append(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The seeding user message.
    pub fn user_message(&self) -> &str {
        self.entries
            .iter()
            .find_map(|e| match e {
                Entry::User(text) => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn last_assistant(&self) -> Option<&str> {
        self.entries.iter().rev().find_map(|e| match e {
            Entry::Assistant(text) => Some(text.as_str()),
            _ => None,
        })
    }

    fn last_request_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|e| matches!(e, Entry::LookupRequest(_)))
    }

    /// The most recent lookup request, if no result has been appended after it.
    pub fn pending_lookup_request(&self) -> Option<&str> {
        let idx = self.last_request_index()?;
        let answered = self.entries[idx..]
            .iter()
            .any(|e| matches!(e, Entry::LookupResult(_)));
        if answered {
            return None;
        }
        match &self.entries[idx] {
            Entry::LookupRequest(query) => Some(query.as_str()),
            _ => None,
        }
    }

    /// The most recent lookup result appended after the most recent request.
    ///
    /// Results that predate the latest request are stale and never returned.
    pub fn fresh_lookup_result(&self) -> Option<&NutritionFacts> {
        let start = self.last_request_index()?;
        self.entries[start..].iter().rev().find_map(|e| match e {
            Entry::LookupResult(facts) => Some(facts),
            _ => None,
        })
    }

    /// Number of entries with the given role tag.
    pub fn count_role(&self, role: &str) -> usize {
        self.entries.iter().filter(|e| e.role() == role).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(name: &str) -> NutritionFacts {
        let mut f = NutritionFacts::fallback(name);
        f.source = "USDA Food Database".into();
        f
    }

    #[test]
    fn seeded_has_one_user_entry() {
        let t = Transcript::seeded("hi");
        assert_eq!(t.len(), 1);
        assert_eq!(t.user_message(), "hi");
        assert_eq!(t.count_role("user"), 1);
        assert!(t.last_assistant().is_none());
    }

    #[test]
    fn pending_request_until_answered() {
        let mut t = Transcript::seeded("calories in an apple");
        assert!(t.pending_lookup_request().is_none());

        t.append(Entry::LookupRequest("1 apple".into()));
        assert_eq!(t.pending_lookup_request(), Some("1 apple"));

        t.append(Entry::LookupResult(facts("apple")));
        assert!(t.pending_lookup_request().is_none());
    }

    #[test]
    fn stale_result_is_not_fresh() {
        let mut t = Transcript::seeded("msg");
        t.append(Entry::LookupRequest("apple".into()));
        t.append(Entry::LookupResult(facts("apple")));
        t.append(Entry::LookupRequest("pear".into()));

        assert!(t.fresh_lookup_result().is_none());
        assert_eq!(t.pending_lookup_request(), Some("pear"));

        t.append(Entry::LookupResult(facts("pear")));
        assert_eq!(t.fresh_lookup_result().map(|f| f.name.as_str()), Some("pear"));
    }

    #[test]
    fn result_without_request_is_ignored() {
        let mut t = Transcript::seeded("msg");
        t.append(Entry::LookupResult(facts("orphan")));
        assert!(t.fresh_lookup_result().is_none());
    }

    #[test]
    fn last_assistant_is_latest() {
        let mut t = Transcript::seeded("msg");
        t.append(Entry::Assistant("first".into()));
        t.append(Entry::Assistant("second".into()));
        assert_eq!(t.last_assistant(), Some("second"));
    }
}
