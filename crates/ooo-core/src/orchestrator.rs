//! Session lifecycle and the three-way concurrent analysis pipeline.
//!
//! One `generate_report` call moves through:
//!
//! ```text
//! Uninitialized → SessionsOpen → DataCollected → AnalysesInFlight
//!              → Merged → Persisted → SessionsClosed
//! ```
//!
//! `SessionsClosed` is reached on every exit path: the [`SessionGroup`] is a
//! scoped value owned by the call, so success, early `?` returns, and
//! cancellation all release the connector sessions when it drops. There is
//! no retry loop here; a caller that wants retry re-invokes
//! `generate_report`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use ooo_model::{ModelClient, ModelInvoker};

use crate::analysis::{frame_with_snapshot, run_analysis, AnalysisKind, TaskFailure};
use crate::cache::{ReportCache, RunIdentity};
use crate::config::OrchestratorConfig;
use crate::connector::SessionGroup;
use crate::error::{OooError, Result};
use crate::extract::extract;
use crate::io::atomic_write;
use crate::prompts::PromptStore;
use crate::report::{merge_report, Report};
use crate::types::{SourceRecord, TimeRange};

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    config: OrchestratorConfig,
    model: Arc<dyn ModelInvoker>,
    prompts: PromptStore,
    cache: ReportCache,
}

impl Orchestrator {
    /// Construct with the real model client. Fails with a configuration
    /// error if model credentials are absent — before any session work.
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        let model_config = config.model_config()?;
        let model: Arc<dyn ModelInvoker> = Arc::new(ModelClient::new(model_config));
        Ok(Self::with_model(config, model))
    }

    /// Construct with an explicit model invoker (stubs in tests, alternative
    /// backends in embedding code).
    pub fn with_model(config: OrchestratorConfig, model: Arc<dyn ModelInvoker>) -> Self {
        let prompts = PromptStore::new(&config.prompts_dir);
        let cache = ReportCache::new(&config.cache_dir);
        Orchestrator {
            config,
            model,
            prompts,
            cache,
        }
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    /// Produce the report for `range`.
    ///
    /// With an identity, a cache hit short-circuits the whole pipeline and
    /// a computed report is persisted under that identity before returning.
    pub async fn generate_report(
        &self,
        range: TimeRange,
        identity: Option<RunIdentity>,
    ) -> Result<Report> {
        if let Some(id) = &identity {
            if let Some(hit) = self.cache.get(id) {
                tracing::info!(key = id.key(), "cache hit, skipping re-computation");
                return Ok(hit);
            }
        }

        tracing::info!(%range, "report generation started");
        let sessions = SessionGroup::open(&self.config)?;
        let report = self.run_pipeline(&sessions, range).await?;
        self.persist(&report, identity.as_ref())?;
        Ok(report)
        // `sessions` drops here and on every earlier exit path.
    }

    // ── Pipeline stages ──────────────────────────────────────────────────

    async fn run_pipeline(&self, sessions: &SessionGroup, range: TimeRange) -> Result<Report> {
        let records = sessions.collect(&range)?;
        tracing::info!(count = records.len(), "data collection pass");
        let snapshot = self.collect_snapshot(&range, &records).await?;

        // Render all three prompts before dispatch so a template problem
        // surfaces as its own error, not as three task failures.
        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let prompt_for = |kind: AnalysisKind| -> Result<String> {
            let template = self.prompts.load(kind.template_name())?;
            Ok(frame_with_snapshot(&template, &snapshot))
        };
        let summary_prompt = prompt_for(AnalysisKind::Summary)?;
        let items_prompt = prompt_for(AnalysisKind::ActionItems)?;
        let priorities_prompt = prompt_for(AnalysisKind::Priorities)?;

        // The only fan-out point: three independent invocations over the
        // identical snapshot, awaited together, each capturing its own
        // success or failure.
        let model = self.model.as_ref();
        let (summary, items, priorities) = tokio::join!(
            run_analysis(model, AnalysisKind::Summary, summary_prompt, timeout),
            run_analysis(model, AnalysisKind::ActionItems, items_prompt, timeout),
            run_analysis(model, AnalysisKind::Priorities, priorities_prompt, timeout),
        );

        self.merge(summary, items, priorities)
    }

    /// The single data-collection model pass: hand every queried record to
    /// the model and let it assemble the consolidated snapshot all three
    /// analysis tasks will see. The snapshot is treated as an opaque string
    /// from here on.
    async fn collect_snapshot(
        &self,
        range: &TimeRange,
        records: &[SourceRecord],
    ) -> Result<String> {
        let template = self.prompts.render(
            "data_collection",
            &[
                ("start_date", &range.start().to_string()),
                ("end_date", &range.end().to_string()),
            ],
        )?;
        let records_json = serde_json::to_string_pretty(records)?;
        let prompt = format!("{template}\n\n## Source Records\n```json\n{records_json}\n```");

        let timeout = Duration::from_secs(self.config.timeout_seconds);
        match tokio::time::timeout(timeout, self.model.invoke(&prompt)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(OooError::Timeout {
                seconds: self.config.timeout_seconds,
            }),
        }
    }

    /// Extract each task's structure and merge into the report. A task
    /// counts as failed whether its invocation or its extraction failed;
    /// only all three failing escalates.
    fn merge(
        &self,
        summary: std::result::Result<String, TaskFailure>,
        items: std::result::Result<String, TaskFailure>,
        priorities: std::result::Result<String, TaskFailure>,
    ) -> Result<Report> {
        let mut failures: Vec<String> = Vec::new();

        // The summary task alone keeps its raw text as a fallback.
        let (summary_value, summary_raw) = match summary {
            Ok(text) => match extract(&text) {
                Ok(v) => (Some(v), None),
                Err(f) => {
                    failures.push(format!("summary: {f}"));
                    (None, Some(f.raw))
                }
            },
            Err(tf) => {
                failures.push(tf.to_string());
                (None, None)
            }
        };

        let mut structured = |kind: AnalysisKind,
                              result: std::result::Result<String, TaskFailure>|
         -> Option<Value> {
            match result {
                Ok(text) => match extract(&text) {
                    Ok(v) => Some(v),
                    Err(f) => {
                        failures.push(format!("{kind}: {f}"));
                        None
                    }
                },
                Err(tf) => {
                    failures.push(tf.to_string());
                    None
                }
            }
        };
        let items_value = structured(AnalysisKind::ActionItems, items);
        let priorities_value = structured(AnalysisKind::Priorities, priorities);

        if failures.len() == 3 {
            return Err(OooError::Analysis(failures.join("; ")));
        }
        if !failures.is_empty() {
            tracing::warn!(
                failed = failures.len(),
                "partial analysis failure, degrading to defaults"
            );
        }

        Ok(merge_report(
            summary_value.as_ref(),
            summary_raw.as_deref(),
            items_value.as_ref(),
            priorities_value.as_ref(),
            &self.config.sources,
        ))
    }

    /// Write the timestamped report artifact and, when an identity was
    /// supplied, the cache entry.
    fn persist(&self, report: &Report, identity: Option<&RunIdentity>) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let filename = format!("ooo_report_{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
        let path = self.config.reports_dir.join(filename);
        atomic_write(&path, json.as_bytes())?;
        tracing::info!(path = %path.display(), "report written");

        if let Some(id) = identity {
            self.cache.put(id, report)?;
            tracing::info!(key = id.key(), "report cached");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceKind;
    use crate::validate::{ReportValidator, ScenarioManifest};
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use rusqlite::Connection;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    // ── Stub model ───────────────────────────────────────────────────────

    /// Deterministic model: picks a canned response by prompt marker and
    /// counts invocations.
    struct StubModel {
        calls: AtomicUsize,
        responses: Vec<(&'static str, String)>,
    }

    impl StubModel {
        fn new(responses: Vec<(&'static str, String)>) -> Self {
            StubModel {
                calls: AtomicUsize::new(0),
                responses,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ModelInvoker for StubModel {
        fn invoke<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, ooo_model::Result<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .responses
                .iter()
                .find(|(marker, _)| prompt.contains(marker))
                .map(|(_, r)| r.clone())
                .unwrap_or_else(|| "no canned response".to_string());
            async move { Ok(reply) }.boxed()
        }
    }

    // ── Fixture ──────────────────────────────────────────────────────────

    struct Fixture {
        config: OrchestratorConfig,
        _dir: TempDir,
    }

    /// Seeded email database + prompt templates, scoped to a temp dir.
    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db_dir = dir.path().join("databases");
        std::fs::create_dir_all(&db_dir).unwrap();

        let conn = Connection::open(db_dir.join("emails.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE emails (
                id INTEGER PRIMARY KEY,
                custom_id TEXT UNIQUE,
                sender TEXT, subject TEXT, body TEXT,
                received_date TEXT, is_read INTEGER, thread_id TEXT
            );
            INSERT INTO emails (custom_id, sender, subject, body, received_date) VALUES
              ('email_001', 'cto@corp.com', 'URGENT: Production database failover',
               'We need your sign-off on the failover plan today.', '2024-01-02 09:15:00'),
              ('email_003', 'all@corp.com', 'Happy New Year',
               'Wishing everyone a great start to the year!', '2024-01-01 08:00:00');",
        )
        .unwrap();
        drop(conn);

        let prompts_dir = dir.path().join("prompts");
        std::fs::create_dir_all(&prompts_dir).unwrap();
        for (name, marker) in [
            ("data_collection", "COLLECT from {{ start_date }} to {{ end_date }}"),
            ("summary", "SUMMARY_TASK"),
            ("action_items", "ACTION_TASK"),
            ("priority_analysis", "PRIORITY_TASK"),
        ] {
            std::fs::write(prompts_dir.join(format!("{name}.txt")), marker).unwrap();
        }

        let config = OrchestratorConfig {
            prompts_dir,
            reports_dir: dir.path().join("reports"),
            cache_dir: dir.path().join("cache"),
            database_dir: db_dir,
            sources: vec![SourceKind::Email],
            timeout_seconds: 30,
            ..OrchestratorConfig::default()
        };
        Fixture { config, _dir: dir }
    }

    fn range() -> TimeRange {
        TimeRange::parse("2024-01-01", "2024-01-03").unwrap()
    }

    fn scenario_responses() -> Vec<(&'static str, String)> {
        vec![
            (
                "COLLECT",
                r#"{"emails": [{"id": "email_001", "subject": "URGENT: Production database failover"},
                               {"id": "email_003", "subject": "Happy New Year"}]}"#
                    .to_string(),
            ),
            (
                "SUMMARY_TASK",
                r#"```json
{"summary": "One urgent production incident needs your attention; the rest was holiday noise."}
```"#
                    .to_string(),
            ),
            (
                "ACTION_TASK",
                r#"Here are the items:
```json
{"action_items": {
  "P0": [{"id": "email_001",
          "title": "Sign off on the URGENT production database failover",
          "due_date": "2024-01-04", "source": "email",
          "context": "The CTO needs your failover sign-off before the next window"}],
  "P1": [],
  "P2": [{"id": "email_003", "title": "Read the Happy New Year greeting",
          "due_date": "2024-01-08", "source": "email",
          "context": "A seasonal greeting sent to the whole company list"}]
}}
```"#
                    .to_string(),
            ),
            (
                "PRIORITY_TASK",
                r#"{"updates": {"email": {
  "P0": [{"id": "email_001", "title": "Production failover pending sign-off",
          "source": "email",
          "context": "Failover plan is blocked on your approval since Jan 2"}],
  "P1": []}}}"#
                    .to_string(),
            ),
        ]
    }

    // ── Tests ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn urgent_record_lands_in_p0_and_noise_stays_out() {
        let fx = fixture();
        let model = Arc::new(StubModel::new(scenario_responses()));
        let orch = Orchestrator::with_model(fx.config.clone(), model);

        let report = orch.generate_report(range(), None).await.unwrap();

        let p0 = &report.action_items.p0;
        assert_eq!(p0.len(), 1);
        assert_eq!(p0[0].source, SourceKind::Email);
        assert!(p0[0].title.contains("URGENT"));
        assert!(!p0.iter().any(|i| i.id.as_deref() == Some("email_003")));
        assert_eq!(report.updates[&SourceKind::Email].p0.len(), 1);

        // The produced report satisfies the external validator.
        let manifest = ScenarioManifest {
            important: ["email_001".to_string()].into(),
            noise: ["email_003".to_string()].into(),
        };
        let value = serde_json::to_value(&report).unwrap();
        let violations =
            ReportValidator::new(&fx.config.sources).validate(&value, Some(&manifest));
        assert!(violations.is_empty(), "violations: {violations:?}");
    }

    #[tokio::test]
    async fn report_artifact_is_written_to_reports_dir() {
        let fx = fixture();
        let orch = Orchestrator::with_model(
            fx.config.clone(),
            Arc::new(StubModel::new(scenario_responses())),
        );
        orch.generate_report(range(), None).await.unwrap();

        let files: Vec<_> = std::fs::read_dir(&fx.config.reports_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("ooo_report_") && files[0].ends_with(".json"));
    }

    #[tokio::test]
    async fn second_run_with_same_identity_is_a_cache_hit() {
        let fx = fixture();
        let model = Arc::new(StubModel::new(scenario_responses()));
        let orch = Orchestrator::with_model(fx.config.clone(), model.clone());
        let identity = RunIdentity::new("test_case_1");

        let first = orch
            .generate_report(range(), Some(identity.clone()))
            .await
            .unwrap();
        let calls_after_first = model.calls();
        assert_eq!(calls_after_first, 4); // collection + three analyses

        let second = orch
            .generate_report(range(), Some(identity))
            .await
            .unwrap();
        assert_eq!(model.calls(), calls_after_first, "no new model calls");
        assert_eq!(
            serde_json::to_string(&second).unwrap(),
            serde_json::to_string(&first).unwrap()
        );
    }

    #[tokio::test]
    async fn one_unextractable_task_degrades_to_empty_structure() {
        let fx = fixture();
        let mut responses = scenario_responses();
        // Action-items output carries no structure at all.
        responses[2].1 = "I'm sorry, I couldn't find any actionable items.".to_string();
        let orch =
            Orchestrator::with_model(fx.config.clone(), Arc::new(StubModel::new(responses)));

        let report = orch.generate_report(range(), None).await.unwrap();
        assert!(report.action_items.p0.is_empty());
        assert!(report.action_items.p2.is_empty());
        // Siblings are untouched.
        assert!(!report.summary.is_empty());
        assert_eq!(report.updates[&SourceKind::Email].p0.len(), 1);
    }

    #[tokio::test]
    async fn summary_extraction_failure_falls_back_to_raw_text() {
        let fx = fixture();
        let mut responses = scenario_responses();
        responses[1].1 = "Just a plain prose summary of the three days.".to_string();
        let orch =
            Orchestrator::with_model(fx.config.clone(), Arc::new(StubModel::new(responses)));

        let report = orch.generate_report(range(), None).await.unwrap();
        assert_eq!(report.summary, "Just a plain prose summary of the three days.");
    }

    #[tokio::test]
    async fn all_three_tasks_failing_escalates_to_analysis_error() {
        let fx = fixture();
        let mut responses = scenario_responses();
        for r in responses.iter_mut().skip(1) {
            r.1 = "nothing structured here".to_string();
        }
        let orch =
            Orchestrator::with_model(fx.config.clone(), Arc::new(StubModel::new(responses)));

        let err = orch.generate_report(range(), None).await.unwrap_err();
        assert!(matches!(err, OooError::Analysis(_)));
    }

    #[tokio::test]
    async fn session_failure_aborts_before_any_model_call() {
        let fx = fixture();
        let mut config = fx.config.clone();
        config.database_dir = config.database_dir.join("missing");
        let model = Arc::new(StubModel::new(scenario_responses()));
        let orch = Orchestrator::with_model(config, model.clone());

        let err = orch.generate_report(range(), None).await.unwrap_err();
        assert!(matches!(err, OooError::Session(_)));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn failed_run_is_not_cached() {
        let fx = fixture();
        let mut responses = scenario_responses();
        for r in responses.iter_mut().skip(1) {
            r.1 = "no structure".to_string();
        }
        let orch =
            Orchestrator::with_model(fx.config.clone(), Arc::new(StubModel::new(responses)));

        let identity = RunIdentity::new("failing_case");
        let _ = orch
            .generate_report(range(), Some(identity.clone()))
            .await
            .unwrap_err();
        assert!(orch.cache().get(&identity).is_none());
    }
}
