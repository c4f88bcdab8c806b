//! Decomposition cache shared across requests.
//!
//! Entries are keyed by a content fingerprint of the matrix plus every
//! decomposer setting: both tolerances, the qubit ceiling and the term budget.
//! A fingerprint hit is confirmed against the stored matrix before it is
//! returned, so a hash collision is a miss.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};
use tracing::debug;

use crate::decompose::{Decomposer, PauliDecomposition};
use crate::error::QfeaResult;
use crate::operator::OperatorMatrix;

/// Cache key: matrix fingerprint plus every decomposer setting that can
/// change the result or reject the input.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct CacheKey {
    fingerprint: u64,
    tolerance_bits: u64,
    hermiticity_bits: u64,
    max_qubits: u32,
    max_terms: usize,
}

struct CacheEntry {
    matrix: OperatorMatrix,
    decomposition: Arc<PauliDecomposition>,
}

/// Bounded map from (matrix, decomposer settings) to decompositions.
pub struct DecompositionCache {
    entries: RwLock<FxHashMap<CacheKey, CacheEntry>>,
    capacity: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl DecompositionCache {
    /// Cache holding at most `capacity` decompositions.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            capacity,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Return the cached decomposition of `matrix` under `decomposer`'s
    /// tolerance and budget, computing and storing it on a miss.
    pub fn get_or_decompose(
        &self,
        matrix: &OperatorMatrix,
        decomposer: &Decomposer,
    ) -> QfeaResult<Arc<PauliDecomposition>> {
        let key = CacheKey {
            fingerprint: fingerprint(matrix),
            tolerance_bits: decomposer.tolerance().to_bits(),
            hermiticity_bits: decomposer.hermiticity_tolerance().to_bits(),
            max_qubits: decomposer.max_qubits(),
            max_terms: decomposer.max_terms(),
        };

        if let Some(entry) = self.entries.read().get(&key) {
            if entry.matrix == *matrix {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(fingerprint = key.fingerprint, "decomposition cache hit");
                return Ok(Arc::clone(&entry.decomposition));
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let decomposition = Arc::new(decomposer.decompose(matrix)?);

        let mut entries = self.entries.write();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            // Not LRU: evicts an arbitrary entry.
            if let Some(victim) = entries.keys().next().copied() {
                entries.remove(&victim);
            }
        }
        if self.capacity > 0 {
            entries.insert(
                key,
                CacheEntry {
                    matrix: matrix.clone(),
                    decomposition: Arc::clone(&decomposition),
                },
            );
        }
        Ok(decomposition)
    }

    /// Stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

impl Default for DecompositionCache {
    fn default() -> Self {
        Self::new(64)
    }
}

fn fingerprint(matrix: &OperatorMatrix) -> u64 {
    let mut h = FxHasher::default();
    matrix.dim().hash(&mut h);
    matrix.valid_dim().hash(&mut h);
    for z in matrix.data() {
        z.re.to_bits().hash(&mut h);
        z.im.to_bits().hash(&mut h);
    }
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(a: f64) -> OperatorMatrix {
        OperatorMatrix::from_rows(&[vec![a, 1.0], vec![1.0, -a]]).unwrap()
    }

    #[test]
    fn test_hit_returns_same_arc() {
        let cache = DecompositionCache::new(4);
        let d = Decomposer::new(10, 1e-12);
        let first = cache.get_or_decompose(&matrix(2.0), &d).unwrap();
        let second = cache.get_or_decompose(&matrix(2.0), &d).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.hit_rate(), 0.5);
    }

    #[test]
    fn test_key_includes_budget_and_tolerance() {
        let cache = DecompositionCache::new(4);
        let m = matrix(2.0);
        let a = cache.get_or_decompose(&m, &Decomposer::new(10, 1e-12)).unwrap();
        let b = cache.get_or_decompose(&m, &Decomposer::new(1, 1e-12)).unwrap();
        let c = cache.get_or_decompose(&m, &Decomposer::new(10, 1e-6)).unwrap();
        assert_eq!(a.n_terms(), 2);
        assert_eq!(b.n_terms(), 1);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_strict_hermiticity_not_served_from_loose_entry() {
        let cache = DecompositionCache::new(4);
        let m = OperatorMatrix::from_rows(&[vec![1.0, 1.0], vec![1.0 + 1e-6, 1.0]]).unwrap();
        let loose = Decomposer::new(10, 1e-12).with_hermiticity_tolerance(1e-5);
        let strict = Decomposer::new(10, 1e-12).with_hermiticity_tolerance(1e-9);
        assert!(cache.get_or_decompose(&m, &loose).is_ok());
        assert!(cache.get_or_decompose(&m, &strict).is_err());
        assert!(strict.decompose(&m).is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_qubit_ceiling_not_served_from_cache() {
        let cache = DecompositionCache::new(4);
        let m = OperatorMatrix::identity(4);
        assert!(cache.get_or_decompose(&m, &Decomposer::new(10, 1e-12)).is_ok());
        let narrow = Decomposer::new(10, 1e-12).with_max_qubits(1);
        assert!(cache.get_or_decompose(&m, &narrow).is_err());
    }

    #[test]
    fn test_capacity_bound() {
        let cache = DecompositionCache::new(2);
        let d = Decomposer::new(10, 1e-12);
        for a in [1.0, 2.0, 3.0] {
            cache.get_or_decompose(&matrix(a), &d).unwrap();
        }
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = DecompositionCache::new(2);
        let bad = OperatorMatrix::from_rows(&[vec![1.0, 2.0], vec![0.0, 1.0]]).unwrap();
        assert!(cache.get_or_decompose(&bad, &Decomposer::new(10, 1e-12)).is_err());
        assert!(cache.is_empty());
    }
}
