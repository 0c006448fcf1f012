//! Runs the update engine over every registered source.

use tracing::{error, info};

use super::{UpdateEngine, UpdateError, UpdateOutcome};

/// Result of updating one source.
#[derive(Debug)]
pub struct SourceRun {
    pub name: String,
    pub result: Result<UpdateOutcome, UpdateError>,
}

/// Results of one driver invocation, in the order the sources were run.
#[derive(Debug, Default)]
pub struct DriverReport {
    pub runs: Vec<SourceRun>,
}

impl DriverReport {
    pub fn failures(&self) -> usize {
        self.runs.iter().filter(|run| run.result.is_err()).count()
    }

    /// True when at least one source was attempted and every attempted
    /// source ended in a fatal error. Up-to-date counts as success.
    pub fn exit_failure(&self) -> bool {
        !self.runs.is_empty() && self.failures() == self.runs.len()
    }
}

/// Update every registered source, one at a time in name order.
///
/// A failing source is logged and the next one is attempted. Iteration stops
/// early only when a run is cancelled.
pub async fn update_all(engine: &UpdateEngine) -> DriverReport {
    let mut report = DriverReport::default();

    for name in engine.registry().names() {
        let result = engine.update(&name).await;

        match &result {
            Ok(UpdateOutcome::UpToDate { .. }) => {
                info!("{}: up to date", name);
            }
            Ok(UpdateOutcome::Updated(summary)) => {
                info!(
                    "{}: attempted {}, succeeded {}, failed {}",
                    name, summary.attempted, summary.succeeded, summary.failed
                );
            }
            Err(e) => {
                error!("{}: update failed: {}", name, e);
            }
        }

        let cancelled = matches!(result, Err(UpdateError::Cancelled));
        report.runs.push(SourceRun { name, result });
        if cancelled {
            info!("Update cancelled, skipping remaining sources");
            break;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    fn run(name: &str, result: Result<UpdateOutcome, UpdateError>) -> SourceRun {
        SourceRun {
            name: name.to_string(),
            result,
        }
    }

    fn up_to_date(name: &str) -> Result<UpdateOutcome, UpdateError> {
        Ok(UpdateOutcome::UpToDate {
            source: name.to_string(),
            floor: 1,
            ceiling: 1,
        })
    }

    #[test]
    fn test_exit_policy_empty() {
        assert!(!DriverReport::default().exit_failure());
    }

    #[test]
    fn test_exit_policy_all_failed() {
        let report = DriverReport {
            runs: vec![
                run("a", Err(UpdateError::UnknownSource("a".to_string()))),
                run("b", Err(UpdateError::Storage(StoreError::Database("locked".to_string())))),
            ],
        };
        assert_eq!(report.failures(), 2);
        assert!(report.exit_failure());
    }

    #[test]
    fn test_exit_policy_mixed_and_up_to_date() {
        let mixed = DriverReport {
            runs: vec![
                run("a", Err(UpdateError::Cancelled)),
                run("b", up_to_date("b")),
            ],
        };
        assert!(!mixed.exit_failure());

        let idle = DriverReport {
            runs: vec![run("a", up_to_date("a"))],
        };
        assert!(!idle.exit_failure());
    }
}
