use std::collections::BTreeMap;

use crate::classifier::features::FeatureVector;

/// One labelled training instance with its cached feature vector.
#[derive(Debug, Clone)]
pub struct Exemplar {
    pub id: String,
    pub label: String,
    pub features: FeatureVector,
    /// Insertion order across the whole store; later teaches have larger values.
    pub seq: u64,
}

/// Label → exemplars mapping. Append-only apart from explicit removals.
///
/// The store itself is not synchronised; `SymbolClassifier` wraps it in a
/// reader-writer lock so classification never observes a partial append.
#[derive(Debug, Default)]
pub struct ExemplarStore {
    by_label: BTreeMap<String, Vec<Exemplar>>,
    next_seq: u64,
    len: usize,
}

impl ExemplarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: String, label: String, features: FeatureVector) {
        let exemplar = Exemplar {
            id,
            label: label.clone(),
            features,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.len += 1;
        self.by_label.entry(label).or_default().push(exemplar);
    }

    /// Remove an exemplar by id. Empty labels are dropped with it.
    pub fn remove(&mut self, id: &str) -> bool {
        let mut emptied = None;
        let mut removed = false;

        for (label, exemplars) in self.by_label.iter_mut() {
            if let Some(pos) = exemplars.iter().position(|e| e.id == id) {
                exemplars.remove(pos);
                removed = true;
                if exemplars.is_empty() {
                    emptied = Some(label.clone());
                }
                break;
            }
        }

        if let Some(label) = emptied {
            self.by_label.remove(&label);
        }
        if removed {
            self.len -= 1;
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exemplar> {
        self.by_label.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn label_count(&self) -> usize {
        self.by_label.len()
    }

    /// Drop every exemplar. Sequence numbers keep counting so ties still
    /// break towards exemplars taught after the clear.
    pub fn clear(&mut self) -> usize {
        let removed = self.len;
        self.by_label.clear();
        self.len = 0;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_groups_by_label() {
        let mut store = ExemplarStore::new();
        store.insert("a".into(), "x".into(), vec![0.0]);
        store.insert("b".into(), "x".into(), vec![1.0]);
        store.insert("c".into(), "+".into(), vec![2.0]);

        assert_eq!(store.len(), 3);
        assert_eq!(store.label_count(), 2);
        assert_eq!(store.by_label["x"].len(), 2);
        assert!(!store.by_label.contains_key("y"));
    }

    #[test]
    fn sequence_numbers_increase() {
        let mut store = ExemplarStore::new();
        store.insert("a".into(), "x".into(), vec![0.0]);
        store.insert("b".into(), "+".into(), vec![0.0]);

        let seq_a = store.iter().find(|e| e.id == "a").map(|e| e.seq);
        let seq_b = store.iter().find(|e| e.id == "b").map(|e| e.seq);
        assert!(seq_a < seq_b);
    }

    #[test]
    fn remove_drops_empty_labels() {
        let mut store = ExemplarStore::new();
        store.insert("a".into(), "x".into(), vec![0.0]);

        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert!(store.is_empty());
        assert_eq!(store.label_count(), 0);
    }

    #[test]
    fn clear_empties_every_label() {
        let mut store = ExemplarStore::new();
        store.insert("a".into(), "x".into(), vec![0.0]);
        store.insert("b".into(), "+".into(), vec![0.0]);

        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert_eq!(store.label_count(), 0);
        assert_eq!(store.iter().count(), 0);

        store.insert("c".into(), "x".into(), vec![0.0]);
        assert_eq!(store.iter().next().map(|e| e.seq), Some(2));
    }
}
