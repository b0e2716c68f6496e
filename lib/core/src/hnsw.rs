use crate::error::{Error, Result};
use crate::record::CandidateId;
use crate::vector::Vector;
use ahash::{AHashMap, AHashSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Bit vector for visited node tracking, reset per search via generations
#[derive(Clone)]
struct VisitedSet {
    bits: Vec<u64>,
    generation: u64,
    generations: Vec<u64>,
}

impl VisitedSet {
    #[inline]
    fn new(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(64).max(1);
        Self {
            bits: vec![0; num_words],
            generation: 1,
            generations: vec![0; num_words],
        }
    }

    #[inline]
    fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.generation = 1;
            self.bits.fill(0);
            self.generations.fill(0);
        }
    }

    #[inline]
    fn ensure_capacity(&mut self, capacity: usize) {
        let num_words = capacity.div_ceil(64);
        if num_words > self.bits.len() {
            self.bits.resize(num_words, 0);
            self.generations.resize(num_words, 0);
        }
    }

    /// Returns true when `idx` was not yet visited in this generation
    #[inline]
    fn insert(&mut self, idx: usize) -> bool {
        let word_idx = idx / 64;
        let mask = 1u64 << (idx % 64);

        if word_idx >= self.bits.len() {
            self.ensure_capacity(idx + 1);
        }

        if self.generations[word_idx] != self.generation {
            self.bits[word_idx] = 0;
            self.generations[word_idx] = self.generation;
        }

        let was_set = (self.bits[word_idx] & mask) != 0;
        self.bits[word_idx] |= mask;
        !was_set
    }
}

/// Closest-first heap entry
#[derive(Clone, Copy)]
struct Candidate {
    idx: usize,
    dist: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.idx == other.idx
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other.dist.total_cmp(&self.dist)
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Furthest-first heap entry
#[derive(Clone, Copy)]
struct Furthest {
    idx: usize,
    dist: f32,
}

impl PartialEq for Furthest {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.idx == other.idx
    }
}

impl Eq for Furthest {}

impl Ord for Furthest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist.total_cmp(&other.dist)
    }
}

impl PartialOrd for Furthest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
struct HnswNode {
    key: CandidateId,
    layers: Vec<Vec<usize>>,
}

/// HNSW index over one section vector per candidate, ordered by cosine
/// distance. Vectors are stored normalized and contiguously.
///
/// Removal tombstones the node: it keeps routing searches but is never
/// returned.
pub struct HnswIndex {
    nodes: Vec<HnswNode>,
    vectors: Vec<f32>,
    dim: usize,
    key_to_index: AHashMap<CandidateId, usize>,
    deleted: AHashSet<usize>,
    entry_point: Option<usize>,
    max_connections: usize,
    max_layers: usize,
    ef_construction: usize,
    rng: StdRng,
}

impl HnswIndex {
    pub fn new(max_connections: usize, max_layers: usize) -> Self {
        Self::with_seed(max_connections, max_layers, 0x5eed)
    }

    /// Index with a fixed level-assignment seed, for reproducible graphs
    pub fn with_seed(max_connections: usize, max_layers: usize, seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            vectors: Vec::new(),
            dim: 0,
            key_to_index: AHashMap::new(),
            deleted: AHashSet::new(),
            entry_point: None,
            max_connections: max_connections.max(2),
            max_layers: max_layers.max(1),
            ef_construction: 200,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[inline]
    fn vector_at(&self, node_idx: usize) -> &[f32] {
        let start = node_idx * self.dim;
        &self.vectors[start..start + self.dim]
    }

    #[inline]
    fn distance_to_node(&self, query: &[f32], node_idx: usize) -> f32 {
        1.0 - crate::distance::dot_product(query, self.vector_at(node_idx))
    }

    #[inline]
    fn top_layer(&self, node_idx: usize) -> usize {
        self.nodes[node_idx].layers.len() - 1
    }

    /// Select layer using exponential decay
    fn select_layer(&mut self) -> usize {
        let mut layer = 0;
        while layer < self.max_layers - 1 && self.rng.random::<f32>() < 0.5 {
            layer += 1;
        }
        layer
    }

    /// Walk greedily towards the query on a single layer
    fn greedy_closest(&self, query: &[f32], mut current: usize, layer: usize) -> usize {
        let mut best = self.distance_to_node(query, current);
        loop {
            let mut improved = false;
            if let Some(neighbors) = self.nodes[current].layers.get(layer) {
                for &n in neighbors {
                    let d = self.distance_to_node(query, n);
                    if d < best {
                        best = d;
                        current = n;
                        improved = true;
                    }
                }
            }
            if !improved {
                return current;
            }
        }
    }

    /// Beam search on one layer, returns up to `ef` nodes sorted by distance
    fn search_layer(
        &self,
        query: &[f32],
        entry_point: usize,
        ef: usize,
        layer: usize,
        visited: &mut VisitedSet,
    ) -> Vec<(usize, f32)> {
        visited.clear();
        visited.ensure_capacity(self.nodes.len());

        let mut candidates: BinaryHeap<Candidate> = BinaryHeap::with_capacity(ef * 2);
        let mut results: BinaryHeap<Furthest> = BinaryHeap::with_capacity(ef + 1);

        let entry_dist = self.distance_to_node(query, entry_point);
        candidates.push(Candidate { idx: entry_point, dist: entry_dist });
        results.push(Furthest { idx: entry_point, dist: entry_dist });
        visited.insert(entry_point);

        let mut worst_dist = entry_dist;

        while let Some(Candidate { idx: current, dist: current_dist }) = candidates.pop() {
            if results.len() >= ef && current_dist > worst_dist {
                break;
            }

            let Some(neighbors) = self.nodes[current].layers.get(layer) else {
                continue;
            };

            for &neighbor in neighbors {
                if !visited.insert(neighbor) {
                    continue;
                }
                let dist = self.distance_to_node(query, neighbor);
                if results.len() < ef || dist < worst_dist {
                    candidates.push(Candidate { idx: neighbor, dist });
                    results.push(Furthest { idx: neighbor, dist });
                    if results.len() > ef {
                        results.pop();
                    }
                    if let Some(worst) = results.peek() {
                        worst_dist = worst.dist;
                    }
                }
            }
        }

        let mut out: Vec<(usize, f32)> = results.into_iter().map(|c| (c.idx, c.dist)).collect();
        out.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        out
    }

    /// Insert (or replace) the vector for `key`
    pub fn insert(&mut self, key: CandidateId, vector: &Vector) -> Result<()> {
        if vector.is_empty() {
            return Err(Error::InvalidDimension { expected: self.dim.max(1), actual: 0 });
        }
        if self.dim == 0 {
            self.dim = vector.dim();
        } else if vector.dim() != self.dim {
            return Err(Error::InvalidDimension { expected: self.dim, actual: vector.dim() });
        }

        self.remove(key);

        let level = self.select_layer();
        let normalized = vector.normalized();
        let query = normalized.as_slice();

        let node_idx = self.nodes.len();
        self.vectors.extend_from_slice(query);
        self.nodes.push(HnswNode {
            key,
            layers: vec![Vec::new(); level + 1],
        });
        self.key_to_index.insert(key, node_idx);

        let Some(entry) = self.entry_point else {
            self.entry_point = Some(node_idx);
            return Ok(());
        };

        let entry_top = self.top_layer(entry);
        let mut current = entry;
        for layer in (level + 1..=entry_top).rev() {
            current = self.greedy_closest(query, current, layer);
        }

        let mut visited = VisitedSet::new(self.nodes.len());
        for layer in (0..=level.min(entry_top)).rev() {
            let found = self.search_layer(query, current, self.ef_construction, layer, &mut visited);
            let neighbors: Vec<usize> = found
                .iter()
                .map(|(idx, _)| *idx)
                .filter(|idx| *idx != node_idx)
                .take(self.max_connections)
                .collect();

            for &neighbor in &neighbors {
                self.link(neighbor, node_idx, layer);
            }
            self.nodes[node_idx].layers[layer] = neighbors;

            if let Some((closest, _)) = found.first() {
                current = *closest;
            }
        }

        if level > entry_top {
            self.entry_point = Some(node_idx);
        }
        Ok(())
    }

    /// Add a back-link, pruning the neighbour list to its closest members
    fn link(&mut self, from: usize, to: usize, layer: usize) {
        let limit = self.max_connections * 2;
        let Some(list) = self.nodes[from].layers.get_mut(layer) else {
            return;
        };
        list.push(to);
        if list.len() <= limit {
            return;
        }

        let mut connections = std::mem::take(&mut self.nodes[from].layers[layer]);
        let base = self.vector_at(from).to_vec();
        connections.sort_by(|&a, &b| {
            let da = self.distance_to_node(&base, a);
            let db = self.distance_to_node(&base, b);
            da.total_cmp(&db)
        });
        connections.truncate(limit);
        self.nodes[from].layers[layer] = connections;
    }

    /// k nearest live keys, ascending cosine distance
    pub fn search(&self, query: &Vector, k: usize, ef: Option<usize>) -> Vec<(CandidateId, f32)> {
        let Some(entry) = self.entry_point else {
            return Vec::new();
        };
        if k == 0 || query.dim() != self.dim {
            return Vec::new();
        }

        let normalized = query.normalized();
        let q = normalized.as_slice();

        let mut current = entry;
        for layer in (1..=self.top_layer(entry)).rev() {
            current = self.greedy_closest(q, current, layer);
        }

        // Tombstoned nodes occupy beam slots; widen the beam to compensate.
        let ef = ef.unwrap_or_else(|| (k + k / 2).max(16)).max(k) + self.deleted.len();
        let mut visited = VisitedSet::new(self.nodes.len());
        self.search_layer(q, current, ef, 0, &mut visited)
            .into_iter()
            .filter(|(idx, _)| !self.deleted.contains(idx))
            .take(k)
            .map(|(idx, dist)| (self.nodes[idx].key, dist))
            .collect()
    }

    pub fn remove(&mut self, key: CandidateId) -> bool {
        match self.key_to_index.remove(&key) {
            Some(idx) => {
                self.deleted.insert(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: CandidateId) -> bool {
        self.key_to_index.contains_key(&key)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of live (non-removed) entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.key_to_index.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key_to_index.is_empty()
    }
}
