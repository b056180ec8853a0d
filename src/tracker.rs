//! Evolution tracking over an ordered snapshot timeline.
//!
//! [`EvolutionTracker`] accumulates state observations, classifies each
//! transition as it is recorded, and scans the timeline for structure:
//! attractors (long near-constant runs), cycles (periodic recurrence),
//! and an overall coherence trend.
//!
//! History is append-only and strictly ordered by sequence index; only
//! [`EvolutionTracker::reset`] shrinks it.

use crate::error::{Result, TriadError};
use crate::history;
use crate::metrics::TriadicVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strength below this marks the low band for collapse/emergence
pub const STRENGTH_LOW: f64 = 0.1;

/// Strength above this marks the high band for collapse/emergence
pub const STRENGTH_HIGH: f64 = 0.5;

/// Euclidean step distance above which a transition counts as a phase
/// transition (when neither collapse nor emergence applies)
pub const PHASE_JUMP_MAGNITUDE: f64 = 2.0;

/// Maximum absolute strength change for a growth step to still count as
/// amplification rather than a regime change
pub const AMPLIFICATION_BAND: f64 = 0.25;

/// Regression slope magnitude below which the trend is considered flat
pub const TREND_SLOPE_EPS: f64 = 0.005;

/// Residual variance about the fitted trend line above which the strength
/// series is classified as chaotic
pub const TREND_CHAOS_VARIANCE: f64 = 0.01;

/// Default tolerance for attractor detection in [`EvolutionTracker::report`]
pub const ATTRACTOR_TOLERANCE: f64 = 0.1;

/// Default minimum run length for attractor detection
pub const ATTRACTOR_MIN_DURATION: usize = 5;

/// Default search window for cycle detection
pub const CYCLE_WINDOW: usize = 20;

/// Default tolerance for cycle detection
pub const CYCLE_TOLERANCE: f64 = 0.15;

/// Default window for the report's recent-stability score
pub const STABILITY_WINDOW: usize = 10;

/// One recorded observation: a state vector plus its position in the
/// timeline. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub vector: TriadicVector,
    /// Tracker-assigned sequence index, strictly increasing
    pub seq: u64,
    /// Caller-supplied timestamp; the tracker never reads a clock itself
    pub timestamp_ms: Option<i64>,
}

/// Categorical label for the change between two adjacent snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// No notable change
    None,
    /// Strength rose from below the low band to above the high band
    Emergence,
    /// Strength fell from above the high band to below the low band
    Collapse,
    /// All component magnitudes grew while strength stayed in band
    Amplification,
    /// Large Euclidean jump with neither collapse nor emergence
    PhaseTransition,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::None => "none",
            TransitionKind::Emergence => "emergence",
            TransitionKind::Collapse => "collapse",
            TransitionKind::Amplification => "amplification",
            TransitionKind::PhaseTransition => "phase_transition",
        }
    }

    /// Whether this kind belongs in the critical-event log
    pub fn is_critical(&self) -> bool {
        !matches!(self, TransitionKind::None)
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived description of the change between two adjacent snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: Snapshot,
    pub to: Snapshot,
    /// Component-wise delta `to - from`
    pub delta: TriadicVector,
    /// Euclidean step distance
    pub magnitude: f64,
    pub kind: TransitionKind,
}

impl Transition {
    /// Build and classify the transition between two snapshots
    pub fn between(from: Snapshot, to: Snapshot) -> Self {
        Self {
            from,
            to,
            delta: from.vector.delta(&to.vector),
            magnitude: from.vector.distance(&to.vector),
            kind: classify_transition(&from.vector, &to.vector),
        }
    }
}

/// Classify the change between two adjacent state vectors.
///
/// Checked in priority order: collapse, emergence, phase transition
/// (large jump with neither of the former), amplification (all component
/// magnitudes strictly grow while the strength change stays within
/// [`AMPLIFICATION_BAND`]), otherwise none.
pub fn classify_transition(prev: &TriadicVector, curr: &TriadicVector) -> TransitionKind {
    let prev_strength = prev.strength();
    let curr_strength = curr.strength();

    if prev_strength > STRENGTH_HIGH && curr_strength < STRENGTH_LOW {
        return TransitionKind::Collapse;
    }
    if prev_strength < STRENGTH_LOW && curr_strength > STRENGTH_HIGH {
        return TransitionKind::Emergence;
    }
    if prev.distance(curr) > PHASE_JUMP_MAGNITUDE {
        return TransitionKind::PhaseTransition;
    }

    let all_grew = curr.a.abs() > prev.a.abs()
        && curr.b.abs() > prev.b.abs()
        && curr.c.abs() > prev.c.abs();
    if all_grew && (curr_strength - prev_strength).abs() <= AMPLIFICATION_BAND {
        return TransitionKind::Amplification;
    }

    TransitionKind::None
}

/// Overall trend label for the strength series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Improving,
    Degrading,
    Stable,
    Chaotic,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Degrading => "degrading",
            Trend::Stable => "stable",
            Trend::Chaotic => "chaotic",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of an exported trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub seq: u64,
    pub timestamp_ms: Option<i64>,
    pub vector: TriadicVector,
    pub strength: f64,
    pub balance: f64,
}

/// Bundled evolution analysis, see [`EvolutionTracker::report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionReport {
    pub snapshot_count: usize,
    pub transition_count: usize,
    pub current_state: Option<TriadicVector>,
    pub current_strength: Option<f64>,
    pub current_balance: Option<f64>,
    pub trend: Trend,
    /// Mean vector of the longest stable run, at default tolerances
    pub attractor: Option<TriadicVector>,
    /// Smallest detected period, at default tolerances
    pub cycle_length: Option<usize>,
    /// Stability over the most recent [`STABILITY_WINDOW`] snapshots
    pub recent_stability: f64,
    pub critical_events: Vec<Transition>,
    /// Count of recorded transitions per kind
    pub transition_counts: BTreeMap<String, usize>,
}

impl EvolutionReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| TriadError::SerializationError(e.to_string()))
    }
}

/// Stateful accumulator over a snapshot timeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionTracker {
    snapshots: Vec<Snapshot>,
    transitions: Vec<Transition>,
    critical_events: Vec<Transition>,
    next_seq: u64,
}

impl EvolutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new observation with the next sequence index. O(1) amortized.
    pub fn record(&mut self, a: f64, b: f64, c: f64) -> Snapshot {
        self.push(TriadicVector::new(a, b, c), None)
    }

    /// Record a new observation with a caller-supplied timestamp.
    ///
    /// Timestamps must not move backwards relative to the last recorded
    /// timestamp; a non-monotone timestamp is rejected and leaves history
    /// untouched.
    pub fn record_at(&mut self, a: f64, b: f64, c: f64, timestamp_ms: i64) -> Result<Snapshot> {
        let last_ts = self.snapshots.iter().rev().find_map(|s| s.timestamp_ms);
        if let Some(last) = last_ts {
            if timestamp_ms < last {
                return Err(TriadError::InvalidConfig(format!(
                    "timestamp {} precedes last recorded timestamp {}",
                    timestamp_ms, last
                )));
            }
        }

        Ok(self.push(TriadicVector::new(a, b, c), Some(timestamp_ms)))
    }

    fn push(&mut self, vector: TriadicVector, timestamp_ms: Option<i64>) -> Snapshot {
        let snapshot = Snapshot {
            vector,
            seq: self.next_seq,
            timestamp_ms,
        };
        self.next_seq += 1;

        if let Some(&prev) = self.snapshots.last() {
            let transition = Transition::between(prev, snapshot);
            if transition.kind.is_critical() {
                self.critical_events.push(transition);
            }
            self.transitions.push(transition);
        }

        self.snapshots.push(snapshot);
        snapshot
    }

    /// Clear all history and restart sequence numbering.
    pub fn reset(&mut self) {
        self.snapshots.clear();
        self.transitions.clear();
        self.critical_events.clear();
        self.next_seq = 0;
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// All recorded transitions whose kind was not `None`
    pub fn critical_events(&self) -> &[Transition] {
        &self.critical_events
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The most recent `window` snapshots
    pub fn trajectory(&self, window: usize) -> &[Snapshot] {
        let start = self.snapshots.len().saturating_sub(window);
        &self.snapshots[start..]
    }

    fn vectors(&self) -> Vec<TriadicVector> {
        self.snapshots.iter().map(|s| s.vector).collect()
    }

    /// Detect the longest stable run in the full history.
    ///
    /// A run is stable while every component's spread (max minus min)
    /// stays within `tolerance`, which bounds all pairwise component-wise
    /// differences in the run. If the longest such run spans at least
    /// `min_duration` snapshots, its mean vector is returned.
    ///
    /// `tolerance` must be finite and positive; `min_duration` at least 2.
    pub fn detect_attractor(
        &self,
        tolerance: f64,
        min_duration: usize,
    ) -> Result<Option<TriadicVector>> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(TriadError::InvalidConfig(format!(
                "attractor tolerance must be finite and positive, got {}",
                tolerance
            )));
        }
        if min_duration < 2 {
            return Err(TriadError::InvalidConfig(format!(
                "attractor min_duration must be at least 2, got {}",
                min_duration
            )));
        }

        Ok(self.attractor_scan(tolerance, min_duration))
    }

    fn attractor_scan(&self, tolerance: f64, min_duration: usize) -> Option<TriadicVector> {
        let vectors = self.vectors();
        let n = vectors.len();
        if n < min_duration {
            return None;
        }

        let mut best: Option<(usize, usize)> = None;

        for start in 0..n {
            let mut min = vectors[start].as_array();
            let mut max = min;
            let mut end = start;

            for (offset, v) in vectors[start..].iter().enumerate() {
                let arr = v.as_array();
                let mut next_min = min;
                let mut next_max = max;
                for k in 0..3 {
                    next_min[k] = next_min[k].min(arr[k]);
                    next_max[k] = next_max[k].max(arr[k]);
                }
                if (0..3).any(|k| next_max[k] - next_min[k] > tolerance) {
                    break;
                }
                min = next_min;
                max = next_max;
                end = start + offset;
            }

            let run_len = end - start + 1;
            if best.map_or(true, |(bs, be)| run_len > be - bs + 1) {
                best = Some((start, end));
            }
        }

        let (start, end) = best?;
        if end - start + 1 < min_duration {
            return None;
        }

        TriadicVector::mean(&vectors[start..=end])
    }

    /// Detect the smallest period `p` (2 <= p <= window) such that every
    /// available pair of snapshots `p` apart within the most recent
    /// `window` samples is within Euclidean `tolerance`.
    ///
    /// `window` must be at least 2; `tolerance` finite and positive.
    pub fn detect_cycle(&self, window: usize, tolerance: f64) -> Result<Option<usize>> {
        if window < 2 {
            return Err(TriadError::InvalidConfig(format!(
                "cycle window must be at least 2, got {}",
                window
            )));
        }
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(TriadError::InvalidConfig(format!(
                "cycle tolerance must be finite and positive, got {}",
                tolerance
            )));
        }

        Ok(self.cycle_scan(window, tolerance))
    }

    fn cycle_scan(&self, window: usize, tolerance: f64) -> Option<usize> {
        let vectors = self.vectors();
        let start = vectors.len().saturating_sub(window);
        let recent = &vectors[start..];
        let n = recent.len();
        if n < 3 {
            return None;
        }

        for period in 2..=window.min(n - 1) {
            let is_cycle = (0..n - period)
                .all(|i| recent[i].distance(&recent[i + period]) <= tolerance);
            if is_cycle {
                return Some(period);
            }
        }

        None
    }

    /// Classify the overall strength trend over the full history.
    ///
    /// Fits a least-squares line to the strength series. Residual variance
    /// about the fit above [`TREND_CHAOS_VARIANCE`] is chaotic regardless
    /// of slope; otherwise the slope sign against [`TREND_SLOPE_EPS`]
    /// decides improving, degrading, or stable. Fewer than 3 snapshots
    /// yields `Stable` (neutral).
    pub fn coherence_trend(&self) -> Trend {
        let strengths: Vec<f64> = self.snapshots.iter().map(|s| s.vector.strength()).collect();
        if strengths.len() < 3 {
            return Trend::Stable;
        }

        let slope = history::slope(&strengths);
        let n = strengths.len() as f64;
        let x_mean = (n - 1.0) / 2.0;
        let y_mean = strengths.iter().sum::<f64>() / n;
        let intercept = y_mean - slope * x_mean;

        let residual_variance = strengths
            .iter()
            .enumerate()
            .map(|(i, y)| {
                let fitted = intercept + slope * i as f64;
                (y - fitted) * (y - fitted)
            })
            .sum::<f64>()
            / n;

        if residual_variance > TREND_CHAOS_VARIANCE {
            Trend::Chaotic
        } else if slope > TREND_SLOPE_EPS {
            Trend::Improving
        } else if slope < -TREND_SLOPE_EPS {
            Trend::Degrading
        } else {
            Trend::Stable
        }
    }

    /// Bundle trend, attractor, cycle, and the critical-event log into a
    /// single report, using the documented default tolerances.
    pub fn report(&self) -> EvolutionReport {
        let current = self.snapshots.last();
        let vectors = self.vectors();

        let mut transition_counts = BTreeMap::new();
        for t in &self.transitions {
            *transition_counts
                .entry(t.kind.as_str().to_string())
                .or_insert(0) += 1;
        }

        let start = vectors.len().saturating_sub(STABILITY_WINDOW);

        EvolutionReport {
            snapshot_count: self.snapshots.len(),
            transition_count: self.transitions.len(),
            current_state: current.map(|s| s.vector),
            current_strength: current.map(|s| s.vector.strength()),
            current_balance: current.map(|s| s.vector.balance()),
            trend: self.coherence_trend(),
            attractor: self.attractor_scan(ATTRACTOR_TOLERANCE, ATTRACTOR_MIN_DURATION),
            cycle_length: self.cycle_scan(CYCLE_WINDOW, CYCLE_TOLERANCE),
            recent_stability: history::stability(&vectors[start..]),
            critical_events: self.critical_events.clone(),
            transition_counts,
        }
    }

    /// Export the full timeline as JSON-ready rows.
    pub fn export_trajectory(&self) -> Vec<TrajectoryPoint> {
        self.snapshots
            .iter()
            .map(|s| TrajectoryPoint {
                seq: s.seq,
                timestamp_ms: s.timestamp_ms,
                vector: s.vector,
                strength: s.vector.strength(),
                balance: s.vector.balance(),
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| TriadError::SerializationError(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TriadError::SerializationError(e.to_string()))
    }
}
