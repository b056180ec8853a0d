//! Cascade simulation: step-driven coupling of an interaction field.
//!
//! Each step pulls every entity's vector a fraction of the way toward
//! the field's collective state, scaled by the entity's mean alignment
//! with the rest of the field. Updates within a step are synchronous:
//! all deltas are computed from the pre-step snapshot before any are
//! applied, so iteration order never influences the result.

use crate::error::{Result, TriadError};
use crate::field::{self, Entity, FieldReport, InteractionField, DEFAULT_CLUSTER_THRESHOLD};
use crate::metrics::TriadicVector;
use serde::{Deserialize, Serialize};

/// Default per-step coupling strength
pub const DEFAULT_COUPLING_STRENGTH: f64 = 0.05;

/// Simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Fraction of the gap to the collective state closed per step, in
    /// [0, 1]
    pub coupling_strength: f64,
    /// Alignment threshold used for the per-step cluster report
    pub cluster_threshold: f64,
    /// When set, the run stops early once the largest per-entity update
    /// falls below this magnitude; by default the loop always runs its
    /// full step count
    pub convergence_epsilon: Option<f64>,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            coupling_strength: DEFAULT_COUPLING_STRENGTH,
            cluster_threshold: DEFAULT_CLUSTER_THRESHOLD,
            convergence_epsilon: None,
        }
    }
}

impl CascadeConfig {
    fn validate(&self) -> Result<()> {
        if !self.coupling_strength.is_finite() || !(0.0..=1.0).contains(&self.coupling_strength) {
            return Err(TriadError::InvalidConfig(format!(
                "coupling_strength must be finite and within [0, 1], got {}",
                self.coupling_strength
            )));
        }
        if !self.cluster_threshold.is_finite() || !(-1.0..=1.0).contains(&self.cluster_threshold) {
            return Err(TriadError::InvalidConfig(format!(
                "cluster_threshold must be finite and within [-1, 1], got {}",
                self.cluster_threshold
            )));
        }
        if let Some(eps) = self.convergence_epsilon {
            if !eps.is_finite() || eps <= 0.0 {
                return Err(TriadError::InvalidConfig(format!(
                    "convergence_epsilon must be finite and positive, got {}",
                    eps
                )));
            }
        }
        Ok(())
    }
}

/// One recorded simulation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: usize,
    pub report: FieldReport,
}

/// Drives an [`InteractionField`] through discrete coupling steps.
#[derive(Debug, Clone)]
pub struct CascadeSimulator {
    config: CascadeConfig,
}

impl CascadeSimulator {
    /// Create a simulator, failing fast on an invalid configuration.
    pub fn new(config: CascadeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: CascadeConfig::default(),
        }
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Run `steps` coupling iterations over the field, returning one
    /// report per executed step.
    ///
    /// `steps == 0` returns an empty list and leaves every entity vector
    /// unchanged. An empty field records reports but performs no updates.
    pub fn run(
        &self,
        field: &mut InteractionField,
        steps: usize,
    ) -> Result<Vec<StepReport>> {
        let mut reports = Vec::with_capacity(steps);

        for step in 0..steps {
            let collective = field.collective_state();
            let mut max_shift = 0.0_f64;

            if let Some(target) = collective {
                // Pre-step snapshot: both targets and weights come from
                // the state at the top of the step
                let entities: Vec<Entity> = field.entities().cloned().collect();
                let mut updates = Vec::with_capacity(entities.len());

                for entity in &entities {
                    let weight = field::mean_alignment_to_others(entity, &entities);
                    let pull = self.config.coupling_strength * weight;
                    let next = TriadicVector::new(
                        entity.vector.a + pull * (target.a - entity.vector.a),
                        entity.vector.b + pull * (target.b - entity.vector.b),
                        entity.vector.c + pull * (target.c - entity.vector.c),
                    );
                    max_shift = max_shift.max(entity.vector.distance(&next));
                    updates.push((entity.id.clone(), next));
                }

                for (id, vector) in updates {
                    field.update(&id, vector)?;
                }
            }

            reports.push(StepReport {
                step,
                report: field.report_with(self.config.cluster_threshold)?,
            });

            if let Some(eps) = self.config.convergence_epsilon {
                if collective.is_some() && max_shift < eps {
                    break;
                }
            }
        }

        Ok(reports)
    }
}
