//! Provenance tracking for curves produced by reduction and curve algebra.

use serde::{Deserialize, Serialize};

/// Operation that produced or modified a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Subtract,
    Average,
    WeightedAverage,
    Merge,
    InterpolateToFit,
    Superimpose,
    Align,
    Smooth,
    AbsoluteDifference,
    RelativeDifference,
}

impl Operation {
    /// Get the string name of this operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Subtract => "subtract",
            Operation::Average => "average",
            Operation::WeightedAverage => "weighted_average",
            Operation::Merge => "merge",
            Operation::InterpolateToFit => "interpolate_to_fit",
            Operation::Superimpose => "superimpose",
            Operation::Align => "align",
            Operation::Smooth => "smooth",
            Operation::AbsoluteDifference => "absolute_difference",
            Operation::RelativeDifference => "relative_difference",
        }
    }
}

/// One step in a curve's history: the operation and the full identity of
/// every input it consumed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub operation: Operation,
    pub inputs: Vec<Provenance>,
}

/// Identity of a curve: its label plus an append-only history tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Label or originating file name.
    pub label: String,

    /// Operations applied, oldest first. Entries are never removed.
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

impl Provenance {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            history: Vec::new(),
        }
    }

    /// Identity restored from a stored history, e.g. a file header.
    pub fn with_history(label: impl Into<String>, history: Vec<HistoryEntry>) -> Self {
        Self {
            label: label.into(),
            history,
        }
    }

    /// Operations applied, oldest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Identity of a curve derived from `inputs` by `operation`.
    pub fn derived(label: impl Into<String>, operation: Operation, inputs: &[&Provenance]) -> Self {
        let mut provenance = Self::new(label);
        provenance.record(operation, inputs);
        provenance
    }

    /// Append an entry. Inputs are deep-copied so the tree stays self-contained.
    pub fn record(&mut self, operation: Operation, inputs: &[&Provenance]) {
        self.history.push(HistoryEntry {
            operation,
            inputs: inputs.iter().map(|p| (*p).clone()).collect(),
        });
    }

    /// Most recent operation, if any.
    pub fn last_operation(&self) -> Option<Operation> {
        self.history.last().map(|e| e.operation)
    }

    /// Nesting depth of the history tree (0 for a raw measurement).
    pub fn depth(&self) -> usize {
        self.history
            .iter()
            .map(|entry| 1 + entry.inputs.iter().map(Provenance::depth).max().unwrap_or(0))
            .max()
            .unwrap_or(0)
    }

    /// Labels of every raw measurement reachable through the history tree.
    pub fn sources(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_sources(&mut out);
        out
    }

    fn collect_sources(&self, out: &mut Vec<String>) {
        let mut has_inputs = false;
        for entry in &self.history {
            for input in &entry.inputs {
                has_inputs = true;
                input.collect_sources(out);
            }
        }
        if !has_inputs && !out.contains(&self.label) {
            out.push(self.label.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_nests_inputs() {
        let a = Provenance::new("a.dat");
        let b = Provenance::new("b.dat");
        let avg = Provenance::derived("avg", Operation::Average, &[&a, &b]);
        let sub = Provenance::derived("sub", Operation::Subtract, &[&avg, &b]);

        assert_eq!(sub.last_operation(), Some(Operation::Subtract));
        assert_eq!(sub.history()[0].inputs[0].history()[0].operation, Operation::Average);
        assert_eq!(sub.depth(), 2);
        assert_eq!(sub.sources(), vec!["a.dat".to_string(), "b.dat".to_string()]);
    }

    #[test]
    fn test_record_is_append_only() {
        let reference = Provenance::new("ref");
        let mut p = Provenance::new("x");
        p.record(Operation::Align, &[&reference]);
        p.record(Operation::Superimpose, &[&reference]);

        assert_eq!(p.history().len(), 2);
        assert_eq!(p.history()[0].operation, Operation::Align);
        assert_eq!(p.last_operation(), Some(Operation::Superimpose));
        assert_eq!(Operation::WeightedAverage.name(), "weighted_average");
    }

    #[test]
    fn test_restored_history_round_trips() {
        let a = Provenance::new("a.dat");
        let sub = Provenance::derived("S_a", Operation::Subtract, &[&a, &a]);
        let json = serde_json::to_string(&sub).unwrap();
        assert!(json.contains("\"history\""));

        let back: Provenance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sub);
        let rebuilt = Provenance::with_history("S_a", sub.history().to_vec());
        assert_eq!(rebuilt, sub);
    }
}
