//! Typed asset registry.

use std::any::Any;

use hashbrown::HashMap;

/// Coarse asset classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Texture2D,
    Model3D,
    Audio,
    Shader,
    Other,
}

struct AssetEntry {
    kind: AssetKind,
    value: Box<dyn Any>,
}

/// Registry of named, typed assets.
///
/// Bookkeeping only: entries arrive fully formed and are retrieved by
/// name plus downcast. No loading or decoding happens here.
#[derive(Default)]
pub struct AssetStore {
    entries: HashMap<String, AssetEntry>,
}

impl AssetStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value under a name, replacing any previous entry.
    pub fn insert<T: Any>(&mut self, kind: AssetKind, name: impl Into<String>, value: T) {
        self.entries.insert(
            name.into(),
            AssetEntry {
                kind,
                value: Box::new(value),
            },
        );
    }

    /// Look up an asset by name. `None` when absent or of another type.
    #[must_use]
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.entries
            .get(name)
            .and_then(|entry| entry.value.downcast_ref::<T>())
    }

    /// Mutable lookup by name.
    pub fn get_mut<T: Any>(&mut self, name: &str) -> Option<&mut T> {
        self.entries
            .get_mut(name)
            .and_then(|entry| entry.value.downcast_mut::<T>())
    }

    /// The kind an asset was registered under.
    #[must_use]
    pub fn kind(&self, name: &str) -> Option<AssetKind> {
        self.entries.get(name).map(|entry| entry.kind)
    }

    /// Remove an asset by name, returning its value.
    ///
    /// If the entry exists but holds another type it is left in place.
    pub fn remove<T: Any>(&mut self, name: &str) -> Option<T> {
        let entry = self.entries.remove(name)?;
        match entry.value.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(value) => {
                self.entries.insert(
                    name.to_string(),
                    AssetEntry {
                        kind: entry.kind,
                        value,
                    },
                );
                None
            }
        }
    }

    /// Remove every asset of `kind` whose payload is a `T`.
    ///
    /// Used by the engine to reclaim GPU-backed assets at shutdown.
    pub fn remove_all<T: Any>(&mut self, kind: AssetKind) -> Vec<T> {
        let names: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.kind == kind && entry.value.is::<T>())
            .map(|(name, _)| name.clone())
            .collect();

        names
            .into_iter()
            .filter_map(|name| self.remove::<T>(&name))
            .collect()
    }

    /// Number of assets of the given kind.
    #[must_use]
    pub fn count(&self, kind: AssetKind) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    /// Total number of assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no assets are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_get_rejects_other_types() {
        let mut assets = AssetStore::new();
        assets.insert(AssetKind::Other, "answer", 42_u32);

        assert_eq!(assets.get::<u32>("answer"), Some(&42));
        assert_eq!(assets.get::<String>("answer"), None);
        assert_eq!(assets.get::<u32>("missing"), None);
    }

    #[test]
    fn remove_hands_back_the_value() {
        let mut assets = AssetStore::new();
        assets.insert(AssetKind::Other, "name", String::from("keel"));

        assert_eq!(assets.remove::<String>("name"), Some(String::from("keel")));
        assert!(assets.is_empty());
    }

    #[test]
    fn remove_with_wrong_type_keeps_the_entry() {
        let mut assets = AssetStore::new();
        assets.insert(AssetKind::Other, "answer", 42_u32);

        assert_eq!(assets.remove::<String>("answer"), None);
        assert_eq!(assets.get::<u32>("answer"), Some(&42));
        assert_eq!(assets.kind("answer"), Some(AssetKind::Other));
    }

    #[test]
    fn counting_by_kind() {
        let mut assets = AssetStore::new();
        assets.insert(AssetKind::Texture2D, "a", 1_u8);
        assets.insert(AssetKind::Texture2D, "b", 2_u8);
        assets.insert(AssetKind::Audio, "c", 3_u8);

        assert_eq!(assets.count(AssetKind::Texture2D), 2);
        assert_eq!(assets.count(AssetKind::Audio), 1);
        assert_eq!(assets.count(AssetKind::Model3D), 0);
        assert_eq!(assets.len(), 3);
    }

    #[test]
    fn remove_all_takes_only_matching_entries() {
        let mut assets = AssetStore::new();
        assets.insert(AssetKind::Texture2D, "a", 1_u32);
        assets.insert(AssetKind::Texture2D, "b", 2_u32);
        assets.insert(AssetKind::Texture2D, "other-type", String::from("x"));
        assets.insert(AssetKind::Audio, "c", 3_u32);

        let mut taken = assets.remove_all::<u32>(AssetKind::Texture2D);
        taken.sort_unstable();
        assert_eq!(taken, vec![1, 2]);

        // The wrong-typed and wrong-kind entries survive
        assert_eq!(assets.get::<String>("other-type"), Some(&String::from("x")));
        assert_eq!(assets.get::<u32>("c"), Some(&3));
    }

    #[test]
    fn insert_replaces_existing() {
        let mut assets = AssetStore::new();
        assets.insert(AssetKind::Other, "slot", 1_u32);
        assets.insert(AssetKind::Shader, "slot", 2_u32);

        assert_eq!(assets.get::<u32>("slot"), Some(&2));
        assert_eq!(assets.kind("slot"), Some(AssetKind::Shader));
        assert_eq!(assets.len(), 1);
    }
}
