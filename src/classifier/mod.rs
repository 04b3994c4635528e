pub mod features;
pub mod knn;
pub mod store;
pub mod symbols;

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{error, info};
use serde::Serialize;

use crate::error::ClassificationError;
use crate::models::{Candidate, Point, Stroke};
use crate::segmentation::{segment_strokes, SegmentationConfig};

pub use features::extract_features;
pub use knn::VoteWeighting;
pub use store::ExemplarStore;

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Number of nearest exemplars that vote.
    pub neighbors: usize,
    pub weighting: VoteWeighting,
    pub segmentation: SegmentationConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            neighbors: 3,
            weighting: VoteWeighting::InverseDistance,
            segmentation: SegmentationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClassifierStats {
    pub exemplar_count: usize,
    pub label_count: usize,
}

/// Nearest-neighbour symbol classifier over a live exemplar store.
///
/// Classification takes the read side of the lock and teaching the write
/// side, so writes are serialised for the whole store and readers only ever
/// see complete exemplars.
pub struct SymbolClassifier {
    store: RwLock<ExemplarStore>,
    config: ClassifierConfig,
}

impl SymbolClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            store: RwLock::new(ExemplarStore::new()),
            config,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Split a flat recording into strokes using the classifier's settings.
    pub fn segment(&self, points: &[Point]) -> Vec<Stroke> {
        segment_strokes(points, &self.config.segmentation)
    }

    pub fn classify(&self, strokes: &[Stroke]) -> Result<Vec<Candidate>, ClassificationError> {
        let query = extract_features(strokes).ok_or(ClassificationError::EmptyInput)?;
        let store = self.read()?;
        if store.is_empty() {
            return Err(ClassificationError::NoExemplars);
        }

        Ok(knn::rank_labels(
            &store,
            &query,
            self.config.neighbors,
            self.config.weighting,
        ))
    }

    pub fn classify_points(&self, points: &[Point]) -> Result<Vec<Candidate>, ClassificationError> {
        self.classify(&self.segment(points))
    }

    /// Append one exemplar. Visible to every classification that starts
    /// after this returns.
    pub fn add_exemplar(
        &self,
        id: &str,
        label: &str,
        strokes: &[Stroke],
    ) -> Result<(), ClassificationError> {
        let features = extract_features(strokes).ok_or(ClassificationError::EmptyInput)?;
        self.write()?
            .insert(id.to_string(), label.to_string(), features);
        Ok(())
    }

    pub fn remove_exemplar(&self, id: &str) -> Result<bool, ClassificationError> {
        Ok(self.write()?.remove(id))
    }

    /// Forget everything taught so far. Returns how many exemplars went.
    pub fn reset(&self) -> Result<usize, ClassificationError> {
        Ok(self.write()?.clear())
    }

    /// Bulk-load persisted drawings under a single write lock.
    pub fn load<I>(&self, drawings: I) -> Result<usize, ClassificationError>
    where
        I: IntoIterator<Item = (String, String, Vec<Stroke>)>,
    {
        let mut store = self.write()?;
        let mut loaded = 0;
        for (id, label, strokes) in drawings {
            match extract_features(&strokes) {
                Some(features) => {
                    store.insert(id, label, features);
                    loaded += 1;
                }
                None => info!("Skipping drawing {id} with no points"),
            }
        }
        Ok(loaded)
    }

    pub fn stats(&self) -> Result<ClassifierStats, ClassificationError> {
        let store = self.read()?;
        Ok(ClassifierStats {
            exemplar_count: store.len(),
            label_count: store.label_count(),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ExemplarStore>, ClassificationError> {
        self.store.read().map_err(|err| {
            error!("exemplar store lock poisoned: {err}");
            ClassificationError::StoreUnavailable
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ExemplarStore>, ClassificationError> {
        self.store.write().map_err(|err| {
            error!("exemplar store lock poisoned: {err}");
            ClassificationError::StoreUnavailable
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn stroke(points: &[(f64, f64)], t0: f64) -> Stroke {
        points
            .iter()
            .enumerate()
            .map(|(i, (x, y))| Point::new(*x, *y, t0 + i as f64 * 10.0))
            .collect()
    }

    fn cross() -> Vec<Stroke> {
        vec![
            stroke(&[(0.0, 0.0), (20.0, 20.0), (40.0, 40.0)], 0.0),
            stroke(&[(40.0, 0.0), (20.0, 20.0), (0.0, 40.0)], 300.0),
        ]
    }

    fn plus() -> Vec<Stroke> {
        vec![
            stroke(&[(20.0, 0.0), (20.0, 20.0), (20.0, 40.0)], 0.0),
            stroke(&[(0.0, 20.0), (20.0, 20.0), (40.0, 20.0)], 300.0),
        ]
    }

    fn minus() -> Vec<Stroke> {
        vec![stroke(&[(0.0, 0.0), (20.0, 0.0), (40.0, 0.0)], 0.0)]
    }

    #[test]
    fn empty_store_reports_no_exemplars() {
        let classifier = SymbolClassifier::new(ClassifierConfig::default());
        assert_eq!(
            classifier.classify(&cross()),
            Err(ClassificationError::NoExemplars)
        );
    }

    #[test]
    fn empty_query_is_rejected() {
        let classifier = SymbolClassifier::new(ClassifierConfig::default());
        classifier.add_exemplar("1", "x", &cross()).unwrap();
        assert_eq!(classifier.classify(&[]), Err(ClassificationError::EmptyInput));
    }

    #[test]
    fn taught_drawing_classifies_as_its_label() {
        let classifier = SymbolClassifier::new(ClassifierConfig::default());
        classifier.add_exemplar("1", "+", &plus()).unwrap();
        classifier.add_exemplar("2", "+", &plus()).unwrap();
        classifier.add_exemplar("3", "-", &minus()).unwrap();
        classifier.add_exemplar("4", "x", &cross()).unwrap();

        let ranked = classifier.classify(&cross()).unwrap();
        assert_eq!(ranked[0].symbol, "x");
        assert!(ranked.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn removed_exemplar_no_longer_votes() {
        let classifier = SymbolClassifier::new(ClassifierConfig::default());
        classifier.add_exemplar("1", "x", &cross()).unwrap();
        classifier.add_exemplar("2", "+", &plus()).unwrap();

        assert!(classifier.remove_exemplar("1").unwrap());
        let ranked = classifier.classify(&cross()).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].symbol, "+");
    }

    #[test]
    fn reset_returns_to_untrained() {
        let classifier = SymbolClassifier::new(ClassifierConfig::default());
        classifier.add_exemplar("1", "x", &cross()).unwrap();
        classifier.add_exemplar("2", "+", &plus()).unwrap();

        assert_eq!(classifier.reset().unwrap(), 2);
        assert_eq!(
            classifier.classify(&cross()),
            Err(ClassificationError::NoExemplars)
        );
        assert_eq!(classifier.stats().unwrap().label_count, 0);
    }

    #[test]
    fn concurrent_teaching_keeps_every_label() {
        let classifier = Arc::new(SymbolClassifier::new(ClassifierConfig::default()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let classifier = Arc::clone(&classifier);
                thread::spawn(move || {
                    for j in 0..10 {
                        let id = format!("{i}-{j}");
                        classifier.add_exemplar(&id, &format!("label-{i}"), &cross()).unwrap();
                        let _ = classifier.classify(&plus());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = classifier.stats().unwrap();
        assert_eq!(stats.exemplar_count, 80);
        assert_eq!(stats.label_count, 8);
    }
}
