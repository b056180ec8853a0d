//! Interaction field: a population of named entities and its collective
//! dynamics.
//!
//! Entities are keyed by identifier in a `BTreeMap`, so every field-wide
//! computation iterates in identifier-lexical order and is reproducible.
//! Inserting an existing identifier overwrites the previous entity
//! (last write wins), returning it.

use crate::error::{Result, TriadError};
use crate::metrics::{self, TriadicVector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Field coherence at or above this level counts toward a collective
/// phase transition
pub const PHASE_COHERENCE_THRESHOLD: f64 = 0.8;

/// Emergence potential at or above this level counts toward a collective
/// phase transition
pub const PHASE_POTENTIAL_THRESHOLD: f64 = 0.7;

/// Default alignment threshold for cluster detection in [`InteractionField::report`]
pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 0.7;

/// A named entity holding one triadic state vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub vector: TriadicVector,
}

impl Entity {
    pub fn new(id: impl Into<String>, a: f64, b: f64, c: f64) -> Self {
        Self {
            id: id.into(),
            vector: TriadicVector::new(a, b, c),
        }
    }

    #[inline]
    pub fn strength(&self) -> f64 {
        self.vector.strength()
    }

    /// Cosine alignment with another entity's state
    #[inline]
    pub fn alignment(&self, other: &Entity) -> f64 {
        self.vector.alignment(&other.vector)
    }
}

/// Pairwise alignment entry, see [`InteractionField::alignment_matrix`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairAlignment {
    pub id_a: String,
    pub id_b: String,
    pub alignment: f64,
}

/// Field-wide analysis bundle, see [`InteractionField::report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldReport {
    pub entity_count: usize,
    pub field_coherence: f64,
    pub mean_strength: f64,
    pub collective_state: Option<TriadicVector>,
    pub emergence_potential: f64,
    pub phase_transition: bool,
    pub leader_id: Option<String>,
    pub cluster_count: usize,
    pub cluster_sizes: Vec<usize>,
}

impl FieldReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| TriadError::SerializationError(e.to_string()))
    }
}

/// A mutable collection of named entities with collective metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionField {
    entities: BTreeMap<String, Entity>,
}

impl InteractionField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity. An existing entity with the same identifier is
    /// overwritten atomically and returned (last write wins).
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.id.clone(), entity)
    }

    /// Remove an entity by identifier, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        self.entities.remove(id)
    }

    /// Overwrite the state vector of an existing entity.
    pub fn update(&mut self, id: &str, vector: TriadicVector) -> Result<()> {
        match self.entities.get_mut(id) {
            Some(entity) => {
                entity.vector = vector;
                Ok(())
            }
            None => Err(TriadError::UnknownEntity(id.to_string())),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Identifiers in lexical order
    pub fn ids(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }

    /// Entities in identifier-lexical order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Mean pairwise alignment across all entity pairs.
    ///
    /// Trivially coherent (1.0) with fewer than 2 entities.
    pub fn field_coherence(&self) -> f64 {
        let entities: Vec<&Entity> = self.entities.values().collect();
        let n = entities.len();
        if n < 2 {
            return 1.0;
        }

        let mut sum = 0.0;
        let mut pairs = 0usize;
        for i in 0..n {
            for j in (i + 1)..n {
                sum += entities[i].alignment(entities[j]);
                pairs += 1;
            }
        }

        sum / pairs as f64
    }

    /// Component-wise mean across all entities; `None` iff the field is
    /// empty.
    pub fn collective_state(&self) -> Option<TriadicVector> {
        let vectors: Vec<TriadicVector> = self.entities.values().map(|e| e.vector).collect();
        TriadicVector::mean(&vectors)
    }

    /// Mean strength across all entities; 0.0 for an empty field.
    pub fn mean_strength(&self) -> f64 {
        if self.entities.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.entities.values().map(Entity::strength).sum();
        sum / self.entities.len() as f64
    }

    /// Potential for collective emergence in [0, 1].
    ///
    /// Product of the mean entity strength and the field coherence
    /// (negative coherence contributes nothing). Empty field yields 0.0.
    pub fn emergence_potential(&self) -> f64 {
        if self.entities.is_empty() {
            return 0.0;
        }
        self.mean_strength() * self.field_coherence().clamp(0.0, 1.0)
    }

    /// Connected components of the alignment graph.
    ///
    /// Two entities are connected when their alignment is at least
    /// `threshold`. All components are returned, singletons included,
    /// ordered by their lexically smallest member. `threshold` must be
    /// finite and within [-1, 1].
    pub fn detect_clusters(&self, threshold: f64) -> Result<Vec<BTreeSet<String>>> {
        if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
            return Err(TriadError::InvalidConfig(format!(
                "cluster threshold must be finite and within [-1, 1], got {}",
                threshold
            )));
        }

        Ok(self.cluster_scan(threshold))
    }

    fn cluster_scan(&self, threshold: f64) -> Vec<BTreeSet<String>> {
        let ids: Vec<&String> = self.entities.keys().collect();
        let n = ids.len();

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                let alignment = self.entities[ids[i]].alignment(&self.entities[ids[j]]);
                if alignment >= threshold {
                    adjacency[i].push(j);
                    adjacency[j].push(i);
                }
            }
        }

        let mut visited = vec![false; n];
        let mut clusters = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                if visited[node] {
                    continue;
                }
                visited[node] = true;
                component.insert(ids[node].clone());
                for &neighbor in &adjacency[node] {
                    if !visited[neighbor] {
                        stack.push(neighbor);
                    }
                }
            }
            clusters.push(component);
        }

        clusters
    }

    /// Entity with maximum strength; ties broken by lexically smallest
    /// identifier. `None` iff the field is empty.
    pub fn detect_leader(&self) -> Option<&Entity> {
        let mut leader: Option<&Entity> = None;
        for entity in self.entities.values() {
            match leader {
                Some(current) if entity.strength() <= current.strength() => {}
                _ => leader = Some(entity),
            }
        }
        leader
    }

    /// True when field coherence and emergence potential simultaneously
    /// cross their fixed thresholds ([`PHASE_COHERENCE_THRESHOLD`],
    /// [`PHASE_POTENTIAL_THRESHOLD`]).
    pub fn phase_transition_check(&self) -> bool {
        self.field_coherence() >= PHASE_COHERENCE_THRESHOLD
            && self.emergence_potential() >= PHASE_POTENTIAL_THRESHOLD
    }

    /// Pairwise alignments for all unordered pairs, in lexical pair order.
    pub fn alignment_matrix(&self) -> Vec<PairAlignment> {
        let entities: Vec<&Entity> = self.entities.values().collect();
        let n = entities.len();

        let mut matrix = Vec::with_capacity(n * (n.saturating_sub(1)) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                matrix.push(PairAlignment {
                    id_a: entities[i].id.clone(),
                    id_b: entities[j].id.clone(),
                    alignment: entities[i].alignment(entities[j]),
                });
            }
        }
        matrix
    }

    /// Field-wide report at the default cluster threshold.
    pub fn report(&self) -> FieldReport {
        self.build_report(self.cluster_scan(DEFAULT_CLUSTER_THRESHOLD))
    }

    /// Field-wide report with a caller-chosen cluster threshold.
    pub fn report_with(&self, cluster_threshold: f64) -> Result<FieldReport> {
        Ok(self.build_report(self.detect_clusters(cluster_threshold)?))
    }

    fn build_report(&self, clusters: Vec<BTreeSet<String>>) -> FieldReport {
        FieldReport {
            entity_count: self.entities.len(),
            field_coherence: self.field_coherence(),
            mean_strength: self.mean_strength(),
            collective_state: self.collective_state(),
            emergence_potential: self.emergence_potential(),
            phase_transition: self.phase_transition_check(),
            leader_id: self.detect_leader().map(|e| e.id.clone()),
            cluster_count: clusters.len(),
            cluster_sizes: clusters.iter().map(BTreeSet::len).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| TriadError::SerializationError(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TriadError::SerializationError(e.to_string()))
    }
}

/// Convenience: mean alignment of one entity against the rest of a set,
/// clamped to [0, 1]. An entity with no peers is fully aligned (1.0).
pub(crate) fn mean_alignment_to_others(entity: &Entity, all: &[Entity]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for other in all {
        if other.id == entity.id {
            continue;
        }
        sum += metrics::alignment(&entity.vector, &other.vector);
        count += 1;
    }

    if count == 0 {
        return 1.0;
    }

    (sum / count as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn aligned_field(n: usize) -> InteractionField {
        let mut field = InteractionField::new();
        for i in 0..n {
            field.insert(Entity::new(format!("e{}", i), 1.5, 1.5, 1.5));
        }
        field
    }

    #[test]
    fn test_insert_overwrites_duplicates() {
        let mut field = InteractionField::new();
        assert!(field.insert(Entity::new("a", 1.0, 1.0, 1.0)).is_none());

        let previous = field.insert(Entity::new("a", 2.0, 2.0, 2.0)).unwrap();
        assert_eq!(previous.vector.a, 1.0);
        assert_eq!(field.len(), 1);
        assert_eq!(field.get("a").unwrap().vector.a, 2.0);
    }

    #[test]
    fn test_remove_and_update() {
        let mut field = InteractionField::new();
        field.insert(Entity::new("a", 1.0, 1.0, 1.0));

        field.update("a", TriadicVector::new(3.0, 3.0, 3.0)).unwrap();
        assert_eq!(field.get("a").unwrap().vector.b, 3.0);

        let err = field.update("ghost", TriadicVector::zero()).unwrap_err();
        assert!(matches!(err, TriadError::UnknownEntity(_)));

        assert!(field.remove("a").is_some());
        assert!(field.is_empty());
    }

    #[test]
    fn test_empty_field_collective_semantics() {
        let field = InteractionField::new();
        assert!(field.collective_state().is_none());
        assert_eq!(field.field_coherence(), 1.0);
        assert_eq!(field.emergence_potential(), 0.0);
        assert!(!field.phase_transition_check());
        assert!(field.detect_leader().is_none());
    }

    #[test]
    fn test_single_entity_trivially_coherent() {
        let mut field = InteractionField::new();
        field.insert(Entity::new("solo", 1.0, 2.0, 3.0));
        assert_eq!(field.field_coherence(), 1.0);
        assert!(field.collective_state().is_some());
    }

    #[test]
    fn test_field_coherence_identical_entities() {
        let field = aligned_field(4);
        assert!(approx_eq(field.field_coherence(), 1.0, 1e-9));
    }

    #[test]
    fn test_field_coherence_opposed_entities() {
        let mut field = InteractionField::new();
        field.insert(Entity::new("a", 1.0, 1.0, 1.0));
        field.insert(Entity::new("b", -1.0, -1.0, -1.0));
        assert!(approx_eq(field.field_coherence(), -1.0, 1e-9));
    }

    #[test]
    fn test_collective_state_is_mean() {
        let mut field = InteractionField::new();
        field.insert(Entity::new("a", 1.0, 0.0, 0.0));
        field.insert(Entity::new("b", 0.0, 1.0, 0.0));
        field.insert(Entity::new("c", 0.0, 0.0, 1.0));

        let collective = field.collective_state().unwrap();
        assert!(approx_eq(collective.a, 1.0 / 3.0, 1e-12));
        assert!(approx_eq(collective.b, 1.0 / 3.0, 1e-12));
        assert!(approx_eq(collective.c, 1.0 / 3.0, 1e-12));
    }

    #[test]
    fn test_emergence_potential_bounds() {
        let field = aligned_field(5);
        let p = field.emergence_potential();
        assert!(p > 0.0 && p <= 1.0);
        // Identical strong entities: potential equals mean strength
        assert!(approx_eq(p, field.mean_strength(), 1e-9));
    }

    #[test]
    fn test_clusters_identical_pair() {
        let mut field = InteractionField::new();
        field.insert(Entity::new("x", 1.0, 1.0, 1.0));
        field.insert(Entity::new("y", 1.0, 1.0, 1.0));

        let clusters = field.detect_clusters(0.99).unwrap();
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].contains("x"));
        assert!(clusters[0].contains("y"));
    }

    #[test]
    fn test_clusters_split_on_orthogonality() {
        let mut field = InteractionField::new();
        field.insert(Entity::new("a1", 1.0, 0.0, 0.0));
        field.insert(Entity::new("a2", 0.9, 0.1, 0.0));
        field.insert(Entity::new("b1", 0.0, 0.0, 1.0));
        field.insert(Entity::new("b2", 0.0, 0.1, 0.9));

        let clusters = field.detect_clusters(0.8).unwrap();
        assert_eq!(clusters.len(), 2);
        // Ordered by lexically smallest member
        assert!(clusters[0].contains("a1"));
        assert!(clusters[1].contains("b1"));
    }

    #[test]
    fn test_clusters_include_singletons() {
        let mut field = InteractionField::new();
        field.insert(Entity::new("a", 1.0, 0.0, 0.0));
        field.insert(Entity::new("b", 0.0, 1.0, 0.0));

        let clusters = field.detect_clusters(0.99).unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 1);
    }

    #[test]
    fn test_clusters_reject_bad_threshold() {
        let field = aligned_field(2);
        assert!(field.detect_clusters(1.5).is_err());
        assert!(field.detect_clusters(-2.0).is_err());
        assert!(field.detect_clusters(f64::NAN).is_err());
    }

    #[test]
    fn test_leader_max_strength() {
        let mut field = InteractionField::new();
        field.insert(Entity::new("weak", 0.5, 0.5, 0.5));
        field.insert(Entity::new("strong", 2.0, 2.0, 2.0));
        field.insert(Entity::new("middling", 1.0, 1.0, 1.0));

        assert_eq!(field.detect_leader().unwrap().id, "strong");
    }

    #[test]
    fn test_leader_tie_breaks_lexically() {
        let mut field = InteractionField::new();
        field.insert(Entity::new("zeta", 1.0, 1.0, 1.0));
        field.insert(Entity::new("alpha", 1.0, 1.0, 1.0));

        assert_eq!(field.detect_leader().unwrap().id, "alpha");
    }

    #[test]
    fn test_phase_transition_on_strong_aligned_field() {
        // Identical strong entities: coherence 1.0, potential = mean
        // strength = 0.771 > 0.7
        let field = aligned_field(5);
        assert!(field.phase_transition_check());
    }

    #[test]
    fn test_no_phase_transition_on_weak_field() {
        let mut field = InteractionField::new();
        for i in 0..5 {
            field.insert(Entity::new(format!("e{}", i), 0.3, 0.3, 0.3));
        }
        // Coherent but weak: potential stays below the threshold
        assert!(!field.phase_transition_check());
    }

    #[test]
    fn test_alignment_matrix_order() {
        let mut field = InteractionField::new();
        field.insert(Entity::new("c", 1.0, 0.0, 0.0));
        field.insert(Entity::new("a", 1.0, 0.0, 0.0));
        field.insert(Entity::new("b", 1.0, 0.0, 0.0));

        let matrix = field.alignment_matrix();
        assert_eq!(matrix.len(), 3);
        assert_eq!((matrix[0].id_a.as_str(), matrix[0].id_b.as_str()), ("a", "b"));
        assert_eq!((matrix[1].id_a.as_str(), matrix[1].id_b.as_str()), ("a", "c"));
        assert_eq!((matrix[2].id_a.as_str(), matrix[2].id_b.as_str()), ("b", "c"));
        assert!(approx_eq(matrix[0].alignment, 1.0, 1e-12));
    }

    #[test]
    fn test_report_shape() {
        let field = aligned_field(3);
        let report = field.report();

        assert_eq!(report.entity_count, 3);
        assert!(report.phase_transition);
        assert_eq!(report.cluster_count, 1);
        assert_eq!(report.cluster_sizes, vec![3]);
        assert_eq!(report.leader_id.as_deref(), Some("e0"));
        assert!(report.to_json().unwrap().contains("emergence_potential"));
    }

    #[test]
    fn test_field_json_round_trip() {
        let field = aligned_field(2);
        let json = field.to_json().unwrap();
        let restored = InteractionField::from_json(&json).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.ids(), vec!["e0", "e1"]);
    }

    #[test]
    fn test_mean_alignment_to_others() {
        let all = vec![
            Entity::new("a", 1.0, 0.0, 0.0),
            Entity::new("b", 1.0, 0.0, 0.0),
            Entity::new("c", -1.0, 0.0, 0.0),
        ];
        // a vs b = 1.0, a vs c = -1.0, mean 0.0
        assert_eq!(mean_alignment_to_others(&all[0], &all), 0.0);

        let solo = vec![Entity::new("only", 1.0, 1.0, 1.0)];
        assert_eq!(mean_alignment_to_others(&solo[0], &solo), 1.0);
    }
}
