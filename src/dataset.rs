//! Unit stores consumed by the controller.
//!
//! The controller is written against two narrow traits so any
//! feature-vector store works: a flat `Dataset` of scored units, and a
//! `ParagraphDataset` that additionally maps each paragraph unit back to
//! the document containing it. Both are read-only after load and shared
//! across the scoring threads.
//!
//! The in-memory implementations here back the test suites and small
//! corpora; a memory-mapped store can implement the same traits for
//! collections that don't fit in RAM.

use std::collections::HashMap;

use anyhow::Result;

use crate::types::SparseVector;

/// A read-only store of feature vectors addressable by index and by key.
pub trait Dataset: Send + Sync {
    /// Number of units in the store.
    fn size(&self) -> usize;

    /// The feature vector of unit `i`.
    fn vector_at(&self, i: usize) -> &SparseVector;

    /// Resolve an external key (e.g. a document id string) to a unit index.
    fn get_index(&self, key: &str) -> Option<usize>;

    /// The external key of unit `i`.
    fn key_at(&self, i: usize) -> &str;

    /// Size of the feature-id universe (max feature id + 1).
    fn num_features(&self) -> usize;
}

/// A dataset of paragraph units, each belonging to a parent document in a
/// separate document dataset. Many paragraphs map to one document.
pub trait ParagraphDataset: Dataset {
    /// The index of the document containing paragraph `paragraph_index`.
    fn translate_index(&self, paragraph_index: usize) -> usize;
}

/// Simple vector-backed dataset with a key→index map.
pub struct InMemoryDataset {
    keys: Vec<String>,
    vectors: Vec<SparseVector>,
    index: HashMap<String, usize>,
    num_features: usize,
}

impl InMemoryDataset {
    /// Build from (key, vector) pairs. Keys must be unique.
    pub fn new(entries: Vec<(String, SparseVector)>) -> Result<Self> {
        let mut keys = Vec::with_capacity(entries.len());
        let mut vectors = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        let mut num_features = 0usize;

        for (i, (key, vector)) in entries.into_iter().enumerate() {
            if index.insert(key.clone(), i).is_some() {
                anyhow::bail!("duplicate unit key: {}", key);
            }
            if let Some(max_feature) = (0..vector.num_features()).map(|j| vector.feature_at(j)).max() {
                num_features = num_features.max(max_feature as usize + 1);
            }
            keys.push(key);
            vectors.push(vector);
        }

        Ok(Self { keys, vectors, index, num_features })
    }
}

impl Dataset for InMemoryDataset {
    fn size(&self) -> usize {
        self.vectors.len()
    }

    fn vector_at(&self, i: usize) -> &SparseVector {
        &self.vectors[i]
    }

    fn get_index(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    fn key_at(&self, i: usize) -> &str {
        &self.keys[i]
    }

    fn num_features(&self) -> usize {
        self.num_features
    }
}

/// Paragraph store: an `InMemoryDataset` plus the paragraph→document map.
pub struct InMemoryParagraphDataset {
    inner: InMemoryDataset,
    parents: Vec<usize>,
}

impl InMemoryParagraphDataset {
    /// Build from (key, vector, parent document index) triples.
    pub fn new(entries: Vec<(String, SparseVector, usize)>) -> Result<Self> {
        let mut parents = Vec::with_capacity(entries.len());
        let flat: Vec<(String, SparseVector)> = entries
            .into_iter()
            .map(|(key, vector, parent)| {
                parents.push(parent);
                (key, vector)
            })
            .collect();

        Ok(Self { inner: InMemoryDataset::new(flat)?, parents })
    }
}

impl Dataset for InMemoryParagraphDataset {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn vector_at(&self, i: usize) -> &SparseVector {
        self.inner.vector_at(i)
    }

    fn get_index(&self, key: &str) -> Option<usize> {
        self.inner.get_index(key)
    }

    fn key_at(&self, i: usize) -> &str {
        self.inner.key_at(i)
    }

    fn num_features(&self) -> usize {
        self.inner.num_features()
    }
}

impl ParagraphDataset for InMemoryParagraphDataset {
    fn translate_index(&self, paragraph_index: usize) -> usize {
        self.parents[paragraph_index]
    }
}
