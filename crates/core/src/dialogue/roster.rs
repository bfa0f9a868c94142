use std::collections::HashMap;

/// Long-term memory of acquaintances: identity to confirmed name.
///
/// Injected into the engines so persistence can be swapped without touching
/// the conversation logic.
pub trait FriendStore: Send {
    fn name_of(&self, id: &str) -> Option<String>;

    /// Reverse lookup, used by the verbal engine to keep identifiers stable
    /// per name.
    fn id_of(&self, name: &str) -> Option<String>;

    fn add(&mut self, id: &str, name: &str);

    /// Snapshot of all `(id, name)` pairs, sorted by id, for persistence.
    fn entries(&self) -> Vec<(String, String)>;
}

/// Hash-map backed roster.
#[derive(Clone, Debug, Default)]
pub struct InMemoryFriendStore {
    friends: HashMap<String, String>,
}

impl InMemoryFriendStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            friends: entries.into_iter().collect(),
        }
    }
}

impl FriendStore for InMemoryFriendStore {
    fn name_of(&self, id: &str) -> Option<String> {
        self.friends.get(id).cloned()
    }

    fn id_of(&self, name: &str) -> Option<String> {
        self.friends
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| id.clone())
    }

    fn add(&mut self, id: &str, name: &str) {
        self.friends.insert(id.to_string(), name.to_string());
    }

    fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<_> = self
            .friends
            .iter()
            .map(|(id, name)| (id.clone(), name.clone()))
            .collect();
        entries.sort();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut store = InMemoryFriendStore::new();
        store.add("id1", "Ada");
        assert_eq!(store.name_of("id1").as_deref(), Some("Ada"));
        assert_eq!(store.id_of("Ada").as_deref(), Some("id1"));
        assert!(store.name_of("id2").is_none());
        assert!(store.id_of("Grace").is_none());
    }

    #[test]
    fn test_add_overwrites_name() {
        let mut store = InMemoryFriendStore::new();
        store.add("id1", "Ada");
        store.add("id1", "Ada Lovelace");
        assert_eq!(store.name_of("id1").as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_entries_round_trip() {
        let mut store = InMemoryFriendStore::new();
        store.add("id2", "Grace");
        store.add("id1", "Ada");

        let copy = InMemoryFriendStore::from_entries(store.entries());
        assert_eq!(copy.entries(), store.entries());
        assert_eq!(
            store.entries(),
            vec![
                ("id1".to_string(), "Ada".to_string()),
                ("id2".to_string(), "Grace".to_string()),
            ]
        );
    }
}
