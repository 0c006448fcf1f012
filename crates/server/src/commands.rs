//! Update commands behind the CLI.
//!
//! Each prints one summary line per source to stdout and reports whether the
//! process should exit successfully.

use torrentdb_core::{update_all, UpdateEngine, UpdateError, UpdateOutcome};

/// Human-readable result of updating one source.
pub fn summary_line(name: &str, result: &Result<UpdateOutcome, UpdateError>) -> String {
    match result {
        Ok(UpdateOutcome::UpToDate { .. }) => format!("{}: up to date", name),
        Ok(UpdateOutcome::Updated(summary)) => format!(
            "{}: attempted {}, succeeded {}, failed {}",
            name, summary.attempted, summary.succeeded, summary.failed
        ),
        Err(e) => format!("{}: error: {}", name, e),
    }
}

/// Update one named source. Fails on any fatal error.
pub async fn update_one(engine: &UpdateEngine, name: &str) -> bool {
    let result = engine.update(name).await;
    println!("{}", summary_line(name, &result));
    result.is_ok()
}

/// Update every registered source.
///
/// Fails only when at least one source was attempted and all of them failed.
pub async fn update_every(engine: &UpdateEngine) -> bool {
    let report = update_all(engine).await;
    for run in &report.runs {
        println!("{}", summary_line(&run.name, &run.result));
    }
    !report.exit_failure()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use torrentdb_core::testing::MockSource;
    use torrentdb_core::{
        Source, SourceError, SourceRegistry, SqliteTorrentStore, UpdateConfig, UpdateSummary,
    };

    fn engine(sources: Vec<(&str, Arc<MockSource>)>) -> UpdateEngine {
        let mut registry = SourceRegistry::new();
        for (name, source) in sources {
            registry.register(name, move |_| Ok(Arc::clone(&source) as Arc<dyn Source>));
        }
        UpdateEngine::new(
            Arc::new(registry),
            Arc::new(SqliteTorrentStore::in_memory().unwrap()),
            UpdateConfig::default(),
        )
    }

    #[test]
    fn test_summary_lines() {
        let up_to_date = Ok(UpdateOutcome::UpToDate {
            source: "rutor".to_string(),
            floor: 5,
            ceiling: 5,
        });
        assert_eq!(summary_line("rutor", &up_to_date), "rutor: up to date");

        let updated = Ok(UpdateOutcome::Updated(UpdateSummary {
            source: "rutor".to_string(),
            floor: 100,
            ceiling: 105,
            attempted: 5,
            succeeded: 3,
            failed: 2,
        }));
        assert_eq!(
            summary_line("rutor", &updated),
            "rutor: attempted 5, succeeded 3, failed 2"
        );

        let failed = Err(UpdateError::UnknownSource("foo".to_string()));
        assert!(summary_line("foo", &failed).starts_with("foo: error:"));
    }

    #[tokio::test]
    async fn test_update_one_exit_status() {
        let source = Arc::new(MockSource::new(1, "mock").with_max_id(2));
        let engine = engine(vec![("mock", source)]);

        assert!(update_one(&engine, "mock").await);
        // Second run is up to date, still a success
        assert!(update_one(&engine, "mock").await);
        assert!(!update_one(&engine, "foo").await);
    }

    #[tokio::test]
    async fn test_update_every_exit_status() {
        let healthy = Arc::new(MockSource::new(1, "healthy").with_max_id(2));
        let broken = Arc::new(MockSource::new(2, "broken").with_max_id(2));
        broken.fail_max_id(SourceError::RemoteUnavailable("refused".to_string()));

        let mixed = engine(vec![("healthy", healthy), ("broken", Arc::clone(&broken))]);
        assert!(update_every(&mixed).await);

        let all_broken = engine(vec![("broken", broken)]);
        assert!(!update_every(&all_broken).await);

        let empty = engine(Vec::new());
        assert!(update_every(&empty).await);
    }
}
