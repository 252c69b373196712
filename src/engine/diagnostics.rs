use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::core::ResolvableKey;

/// Per-round statistics of a single resolve call.
///
/// Returned by [`Engine::resolve_with_diagnostics`](crate::Engine::resolve_with_diagnostics).
#[derive(Debug, Default, Clone, Serialize)]
pub struct Diagnostics {
    pub rounds: Vec<RoundStats>,
}

/// What happened in one round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundStats {
    /// 1-based round number.
    pub round: usize,
    /// Unique resolvables found in the tree.
    pub discovered: usize,
    /// Resolvables left after removing the cached ones.
    pub uncached: usize,
    /// Batches selected to run, in execution order.
    pub batches: Vec<BatchStats>,
    pub operations: usize,
    /// Values returned by the resolvers.
    pub resolved: usize,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchStats {
    pub key: ResolvableKey,
    pub size: usize,
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_nanos() as f64 / 1e6)
}

impl Diagnostics {
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    pub fn total_duration(&self) -> Duration {
        self.rounds.iter().map(|round| round.duration).sum()
    }

    /// Number of batches run over all rounds.
    pub fn batch_count(&self) -> usize {
        self.rounds.iter().map(|round| round.batches.len()).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>5} {:>10} {:>8} {:>10} {:>8} {:>12}  batches",
            "round", "discovered", "uncached", "operations", "resolved", "duration"
        )?;

        for round in &self.rounds {
            let batches = round
                .batches
                .iter()
                .map(|batch| format!("{}({})", batch.key, batch.size))
                .collect::<Vec<_>>()
                .join(", ");

            writeln!(
                f,
                "{:>5} {:>10} {:>8} {:>10} {:>8} {:>12}  {}",
                round.round,
                round.discovered,
                round.uncached,
                round.operations,
                round.resolved,
                format!("{:.2?}", round.duration),
                batches
            )?;
        }

        write!(f, "{} rounds in {:.2?}", self.round_count(), self.total_duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Diagnostics {
        Diagnostics {
            rounds: vec![
                RoundStats {
                    round: 1,
                    discovered: 3,
                    uncached: 3,
                    batches: vec![
                        BatchStats {
                            key: "users".into(),
                            size: 2,
                        },
                        BatchStats {
                            key: "posts".into(),
                            size: 1,
                        },
                    ],
                    operations: 2,
                    resolved: 3,
                    duration: Duration::from_millis(3),
                },
                RoundStats {
                    round: 2,
                    discovered: 1,
                    uncached: 0,
                    batches: Vec::new(),
                    operations: 0,
                    resolved: 0,
                    duration: Duration::from_millis(1),
                },
            ],
        }
    }

    #[test]
    fn test_totals() {
        let diagnostics = sample();
        assert_eq!(diagnostics.round_count(), 2);
        assert_eq!(diagnostics.batch_count(), 2);
        assert_eq!(diagnostics.total_duration(), Duration::from_millis(4));
    }

    #[test]
    fn test_json() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["rounds"][0]["batches"][0]["key"], "users");
        assert_eq!(value["rounds"][0]["duration_ms"], 3.0);
        assert_eq!(value["rounds"][1]["uncached"], 0);
    }

    #[test]
    fn test_display() {
        let table = sample().to_string();
        assert!(table.starts_with("round"));
        assert!(table.contains("users(2), posts(1)"));
        assert!(table.ends_with("2 rounds in 4.00ms"));
    }
}
