//! ProgressionEngine - task scheduling, completion and statistics
//!
//! All reads go through the StateManager with a fresh list per call; nothing
//! is cached between operations. Day boundaries come from the injected clock.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::care::CareSignal;
use crate::catalog::TaskCatalog;
use crate::clock::{Clock, add_days};
use crate::config::ProgressionConfig;
use crate::domain::{EnrichedTask, TaskInstance, TaskStatus, TaskTemplate};
use crate::error::EngineError;
use crate::state::StateManager;

use super::streak::current_streak;
use super::summary::{DayBucket, TaskStats, completion_rate};

/// Longest upcoming window, in days
pub const MAX_UPCOMING_DAYS: u32 = 366;

/// Result of completing a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// Points awarded by the template
    pub points: u32,
    /// Id of the regenerated instance, if one was created
    pub next_task_id: Option<String>,
}

/// Schedules, completes and summarizes task instances for users
pub struct ProgressionEngine {
    state: StateManager,
    catalog: TaskCatalog,
    clock: Arc<dyn Clock>,
    care: Arc<dyn CareSignal>,
    config: ProgressionConfig,
}

impl ProgressionEngine {
    pub fn new(state: StateManager, clock: Arc<dyn Clock>, care: Arc<dyn CareSignal>) -> Self {
        Self {
            catalog: TaskCatalog::new(state.clone()),
            state,
            clock,
            care,
            config: ProgressionConfig::default(),
        }
    }

    /// Builder method to override the default configuration
    pub fn with_config(mut self, config: ProgressionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    // === Queries ===

    /// Enriched tasks with `start <= scheduled_at < end`, ascending by schedule
    pub async fn get_tasks_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EnrichedTask>, EngineError> {
        debug!(%user_id, %start, %end, "get_tasks_in_range: called");
        let tasks = self.state.list_user_tasks(user_id, Some((start, end))).await?;
        let templates = self.catalog.template_map().await?;
        Ok(enrich(tasks, &templates))
    }

    /// Tasks scheduled on today's local calendar day
    pub async fn get_today_tasks(&self, user_id: &str) -> Result<Vec<EnrichedTask>, EngineError> {
        debug!(%user_id, "get_today_tasks: called");
        let (start, end) = self.clock.day_range(self.clock.today());
        self.get_tasks_in_range(user_id, start, end).await
    }

    /// One bucket per local day from today through today + days - 1, empty days included.
    /// `days` is capped at [`MAX_UPCOMING_DAYS`].
    pub async fn get_upcoming_summary(&self, user_id: &str, days: u32) -> Result<Vec<DayBucket>, EngineError> {
        debug!(%user_id, days, "get_upcoming_summary: called");
        let days = days.min(MAX_UPCOMING_DAYS);
        let today = self.clock.today();
        let dates: Vec<NaiveDate> = (0..days)
            .map_while(|offset| today.checked_add_days(Days::new(u64::from(offset))))
            .collect();
        let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
            return Ok(Vec::new());
        };

        let start = self.clock.start_of_day(*first);
        let (_, end) = self.clock.day_range(*last);
        let tasks = self.get_tasks_in_range(user_id, start, end).await?;

        let mut by_day: BTreeMap<NaiveDate, Vec<EnrichedTask>> = BTreeMap::new();
        for task in tasks {
            let date = self.clock.local_date(task.task.scheduled_at);
            by_day.entry(date).or_default().push(task);
        }

        let now = self.clock.now();
        Ok(dates
            .into_iter()
            .map(|date| DayBucket::new(date, by_day.remove(&date).unwrap_or_default(), now))
            .collect())
    }

    /// Derive statistics from a fresh list of the user's tasks
    pub async fn compute_stats(&self, user_id: &str) -> Result<TaskStats, EngineError> {
        debug!(%user_id, "compute_stats: called");
        let tasks = self.state.list_user_tasks(user_id, None).await?;
        let templates = self.catalog.template_map().await?;
        let now = self.clock.now();

        let completed: Vec<&TaskInstance> = tasks.iter().filter(|t| t.status == TaskStatus::Completed).collect();
        let total_points = completed
            .iter()
            .map(|t| templates.get(&t.template_id).map(|tpl| u64::from(tpl.points)).unwrap_or(0))
            .sum();
        let streak = current_streak(
            completed
                .iter()
                .filter_map(|t| t.completed_at)
                .map(|at| self.clock.local_date(at)),
            self.clock.today(),
        );

        Ok(TaskStats {
            total_tasks: tasks.len(),
            completed_tasks: completed.len(),
            pending_tasks: tasks.iter().filter(|t| t.is_pending()).count(),
            overdue_tasks: tasks.iter().filter(|t| t.is_overdue(now)).count(),
            completion_rate: completion_rate(completed.len(), tasks.len()),
            streak,
            total_points,
        })
    }

    // === Actions ===

    /// Create a pending instance of a catalog template
    pub async fn schedule_task(
        &self,
        user_id: &str,
        template_id: &str,
        scheduled_at: DateTime<Utc>,
        plant_id: Option<String>,
    ) -> Result<TaskInstance, EngineError> {
        debug!(%user_id, %template_id, %scheduled_at, ?plant_id, "schedule_task: called");
        let template = self.catalog.require_template(template_id).await?;
        let task = TaskInstance::new(user_id, &template.id, scheduled_at).with_plant(plant_id);
        let created = self.state.create(&task).await?;
        info!(task_id = %created.id, %template_id, "Task scheduled");
        Ok(created)
    }

    /// Complete a pending task, regenerate it if recurring and send the plant care signal
    pub async fn complete_task(&self, task_id: &str) -> Result<CompletionOutcome, EngineError> {
        debug!(%task_id, "complete_task: called");
        let task: TaskInstance = self.state.get_required(task_id).await?;
        task.ensure_pending("complete")?;
        let template = self.catalog.require_template(&task.template_id).await?;

        let now = self.clock.now();
        let mut completed = task.clone();
        completed.mark_completed(now);
        self.state.update(&completed).await?;

        let next_task_id = match self.regenerate(&completed, &template, now).await {
            Ok(next) => next,
            Err(e) => {
                warn!(%task_id, error = %e, "complete_task: regeneration failed, rolling back");
                if let Err(rollback) = self.state.update(&task).await {
                    warn!(%task_id, error = %rollback, "complete_task: rollback failed");
                }
                return Err(EngineError::Persistence(format!("could not schedule next occurrence: {}", e)));
            }
        };

        if let (Some(plant_id), Some(care)) = (&completed.linked_plant_instance_id, template.category.care_type()) {
            // Completion stands even if the plant update fails
            if let Err(e) = self.care.update_care(plant_id, care).await {
                warn!(%task_id, %plant_id, %care, error = %e, "complete_task: care signal failed");
            }
        }

        info!(%task_id, points = template.points, ?next_task_id, "Task completed");
        Ok(CompletionOutcome {
            points: template.points,
            next_task_id,
        })
    }

    /// Dismiss a pending task. Skipped tasks never recur.
    pub async fn skip_task(&self, task_id: &str, reason: &str) -> Result<TaskInstance, EngineError> {
        debug!(%task_id, %reason, "skip_task: called");
        let mut task: TaskInstance = self.state.get_required(task_id).await?;
        task.ensure_pending("skip")?;
        task.mark_skipped(reason);
        let skipped = self.state.update(&task).await?;
        info!(%task_id, "Task skipped");
        Ok(skipped)
    }

    /// Remove a task instance
    pub async fn delete_task(&self, task_id: &str) -> Result<(), EngineError> {
        debug!(%task_id, "delete_task: called");
        self.state.delete::<TaskInstance>(task_id).await?;
        info!(%task_id, "Task deleted");
        Ok(())
    }

    async fn regenerate(
        &self,
        completed: &TaskInstance,
        template: &TaskTemplate,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<String>, EngineError> {
        let Some(days) = template.default_recurrence_days else {
            return Ok(None);
        };

        if self.config.dedupe_recurrence {
            let existing = self
                .state
                .list_pending_from(&completed.user_id, &template.id, completed_at)
                .await?;
            if let Some(dup) = existing
                .iter()
                .find(|t| t.linked_plant_instance_id == completed.linked_plant_instance_id)
            {
                info!(task_id = %completed.id, existing = %dup.id, "Next occurrence already scheduled");
                return Ok(None);
            }
        }

        let next = TaskInstance::new(&completed.user_id, &template.id, add_days(completed_at, days))
            .with_plant(completed.linked_plant_instance_id.clone());
        let created = self.state.create(&next).await?;
        debug!(next_id = %created.id, scheduled_at = %created.scheduled_at, "regenerate: created");
        Ok(Some(created.id))
    }
}

/// Pair tasks with their templates, ordered by schedule then id.
/// Tasks whose template is missing are dropped.
fn enrich(mut tasks: Vec<TaskInstance>, templates: &HashMap<String, TaskTemplate>) -> Vec<EnrichedTask> {
    tasks.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then_with(|| a.id.cmp(&b.id)));
    tasks
        .into_iter()
        .filter_map(|task| match templates.get(&task.template_id) {
            Some(template) => Some(EnrichedTask::new(task, template.clone())),
            None => {
                warn!(task_id = %task.id, template_id = %task.template_id, "Dropping task with missing template");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use docstore::{Document, DocumentStore, Filter, MemoryStore, StoreError, StoreResult};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::clock::ManualClock;
    use crate::domain::{CareType, TaskCategory};

    #[derive(Default)]
    struct RecordingCare {
        calls: Mutex<Vec<(String, CareType)>>,
        fail: bool,
    }

    impl RecordingCare {
        fn calls(&self) -> Vec<(String, CareType)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CareSignal for RecordingCare {
        async fn update_care(&self, plant_id: &str, care: CareType) -> Result<(), EngineError> {
            self.calls.lock().unwrap().push((plant_id.to_string(), care));
            if self.fail {
                return Err(EngineError::NotFound(plant_id.to_string()));
            }
            Ok(())
        }
    }

    /// Store that can be told to reject task creation
    struct FlakyStore {
        inner: MemoryStore,
        reject_creates: AtomicBool,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn list_documents(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<Document>> {
            self.inner.list_documents(collection, filters).await
        }

        async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
            self.inner.get_document(collection, id).await
        }

        async fn create_document(&self, collection: &str, data: Document) -> StoreResult<Document> {
            if self.reject_creates.load(Ordering::SeqCst) {
                return Err(StoreError::Invalid("store offline".to_string()));
            }
            self.inner.create_document(collection, data).await
        }

        async fn update_document(&self, collection: &str, id: &str, partial: Document) -> StoreResult<Document> {
            self.inner.update_document(collection, id, partial).await
        }

        async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
            self.inner.delete_document(collection, id).await
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    struct Fixture {
        state: StateManager,
        clock: Arc<ManualClock>,
        care: Arc<RecordingCare>,
        engine: ProgressionEngine,
    }

    async fn fixture_with<S: DocumentStore + 'static>(store: S, care: RecordingCare) -> Fixture {
        let state = StateManager::spawn(store);
        let clock = Arc::new(ManualClock::utc(noon()));
        let care = Arc::new(care);
        let engine = ProgressionEngine::new(state.clone(), clock.clone(), care.clone());
        let catalog = engine.catalog().clone();
        catalog
            .seed_templates(&[
                TaskTemplate::new("Water", TaskCategory::Watering, 10).every(3),
                TaskTemplate::new("Repot", TaskCategory::Repotting, 30),
                TaskTemplate::new("Walk", TaskCategory::Other, 5).every(1),
            ])
            .await
            .unwrap();
        Fixture {
            state,
            clock,
            care,
            engine,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(MemoryStore::new(), RecordingCare::default()).await
    }

    async fn insert(state: &StateManager, task: TaskInstance) -> TaskInstance {
        state.create(&task).await.unwrap()
    }

    #[tokio::test]
    async fn test_complete_recurring_task_regenerates_from_completion_time() {
        let fx = fixture().await;
        let yesterday = noon() - Duration::days(1);
        let task = insert(&fx.state, TaskInstance::with_id("t1", "alice", "water", yesterday)).await;

        let outcome = fx.engine.complete_task(&task.id).await.unwrap();
        assert_eq!(outcome.points, 10);

        let next_id = outcome.next_task_id.expect("recurring template regenerates");
        let next: TaskInstance = fx.state.get_required(&next_id).await.unwrap();
        // Drift: anchored to completion, not to the original schedule
        assert_eq!(next.scheduled_at, noon() + Duration::days(3));
        assert_eq!(next.user_id, "alice");
        assert!(next.is_pending());

        let done: TaskInstance = fx.state.get_required("t1").await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.completed_at, Some(noon()));
    }

    #[tokio::test]
    async fn test_complete_one_off_task_has_no_next() {
        let fx = fixture().await;
        insert(&fx.state, TaskInstance::with_id("t1", "alice", "repot", noon())).await;

        let outcome = fx.engine.complete_task("t1").await.unwrap();
        assert_eq!(outcome.points, 30);
        assert!(outcome.next_task_id.is_none());
        assert_eq!(fx.state.list_user_tasks("alice", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_twice_is_invalid_state() {
        let fx = fixture().await;
        insert(&fx.state, TaskInstance::with_id("t1", "alice", "walk", noon())).await;
        fx.engine.complete_task("t1").await.unwrap();

        let err = fx.engine.complete_task("t1").await.unwrap_err();
        assert!(err.is_invalid_state());
        // No second regeneration
        assert_eq!(fx.state.list_user_tasks("alice", None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_complete_missing_task_or_template() {
        let fx = fixture().await;
        assert!(fx.engine.complete_task("nope").await.unwrap_err().is_not_found());

        insert(&fx.state, TaskInstance::with_id("t1", "alice", "ghost", noon())).await;
        assert!(fx.engine.complete_task("t1").await.unwrap_err().is_not_found());
        let untouched: TaskInstance = fx.state.get_required("t1").await.unwrap();
        assert!(untouched.is_pending());
    }

    #[tokio::test]
    async fn test_complete_sends_care_signal_for_linked_plant() {
        let fx = fixture().await;
        insert(
            &fx.state,
            TaskInstance::with_id("t1", "alice", "water", noon()).with_plant(Some("p1")),
        )
        .await;
        insert(
            &fx.state,
            TaskInstance::with_id("t2", "alice", "walk", noon()).with_plant(Some("p1")),
        )
        .await;
        insert(&fx.state, TaskInstance::with_id("t3", "alice", "repot", noon())).await;

        let outcome = fx.engine.complete_task("t1").await.unwrap();
        fx.engine.complete_task("t2").await.unwrap();
        fx.engine.complete_task("t3").await.unwrap();

        assert_eq!(fx.care.calls(), vec![("p1".to_string(), CareType::Water)]);

        let next: TaskInstance = fx.state.get_required(&outcome.next_task_id.unwrap()).await.unwrap();
        assert_eq!(next.linked_plant_instance_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_care_failure_does_not_fail_completion() {
        let care = RecordingCare {
            fail: true,
            ..Default::default()
        };
        let fx = fixture_with(MemoryStore::new(), care).await;
        insert(
            &fx.state,
            TaskInstance::with_id("t1", "alice", "water", noon()).with_plant(Some("gone")),
        )
        .await;

        assert!(fx.engine.complete_task("t1").await.is_ok());
        assert_eq!(fx.care.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_regeneration_failure_rolls_back_status() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            reject_creates: AtomicBool::new(false),
        });
        let fx = fixture_with(store.clone(), RecordingCare::default()).await;
        insert(&fx.state, TaskInstance::with_id("t1", "alice", "water", noon())).await;

        store.reject_creates.store(true, Ordering::SeqCst);
        let err = fx.engine.complete_task("t1").await.unwrap_err();
        assert!(err.is_persistence());

        let task: TaskInstance = fx.state.get_required("t1").await.unwrap();
        assert!(task.is_pending());
        assert!(task.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_dedupe_skips_existing_pending_occurrence() {
        let fx = fixture().await;
        insert(&fx.state, TaskInstance::with_id("t1", "alice", "water", noon())).await;
        insert(
            &fx.state,
            TaskInstance::with_id("t2", "alice", "water", noon() + Duration::days(2)),
        )
        .await;

        let outcome = fx.engine.complete_task("t1").await.unwrap();
        assert!(outcome.next_task_id.is_none());
        assert_eq!(fx.state.list_user_tasks("alice", None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dedupe_disabled_always_regenerates() {
        let fx = fixture().await;
        let engine = ProgressionEngine::new(fx.state.clone(), fx.clock.clone(), fx.care.clone()).with_config(
            ProgressionConfig {
                dedupe_recurrence: false,
                ..Default::default()
            },
        );
        insert(&fx.state, TaskInstance::with_id("t1", "alice", "water", noon())).await;
        insert(
            &fx.state,
            TaskInstance::with_id("t2", "alice", "water", noon() + Duration::days(2)),
        )
        .await;

        let outcome = engine.complete_task("t1").await.unwrap();
        assert!(outcome.next_task_id.is_some());
        assert_eq!(fx.state.list_user_tasks("alice", None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_skip_is_terminal_and_not_recurring() {
        let fx = fixture().await;
        insert(&fx.state, TaskInstance::with_id("t1", "alice", "water", noon())).await;

        let skipped = fx.engine.skip_task("t1", "on holiday").await.unwrap();
        assert_eq!(skipped.status, TaskStatus::Skipped);
        assert_eq!(skipped.note.as_deref(), Some("on holiday"));
        assert_eq!(fx.state.list_user_tasks("alice", None).await.unwrap().len(), 1);

        assert!(fx.engine.skip_task("t1", "again").await.unwrap_err().is_invalid_state());
        assert!(fx.engine.complete_task("t1").await.unwrap_err().is_invalid_state());
        let stored: TaskInstance = fx.state.get_required("t1").await.unwrap();
        assert_eq!(stored.note.as_deref(), Some("on holiday"));
    }

    #[tokio::test]
    async fn test_range_is_sorted_and_drops_orphans() {
        let fx = fixture().await;
        insert(&fx.state, TaskInstance::with_id("late", "alice", "walk", noon() + Duration::hours(3))).await;
        insert(&fx.state, TaskInstance::with_id("early", "alice", "water", noon() - Duration::hours(3))).await;
        insert(&fx.state, TaskInstance::with_id("orphan", "alice", "ghost", noon())).await;
        insert(&fx.state, TaskInstance::with_id("bob", "bob", "walk", noon())).await;

        let (start, end) = fx.clock.day_range(fx.clock.today());
        let tasks = fx.engine.get_tasks_in_range("alice", start, end).await.unwrap();
        let ids: Vec<_> = tasks.iter().map(|t| t.task.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert_eq!(tasks[0].title(), "Water");
    }

    #[tokio::test]
    async fn test_today_tasks_follow_local_day() {
        let fx = fixture().await;
        // Local UTC+10: 20:00 UTC on the 10th is already the 11th locally
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 10, 20, 0, 0).unwrap(),
            chrono::FixedOffset::east_opt(10 * 3600).unwrap(),
        ));
        let engine = ProgressionEngine::new(fx.state.clone(), clock, fx.care.clone());
        let utc_10th = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let local_11th = Utc.with_ymd_and_hms(2024, 6, 10, 15, 0, 0).unwrap();
        insert(&fx.state, TaskInstance::with_id("utc-10th", "alice", "walk", utc_10th)).await;
        insert(&fx.state, TaskInstance::with_id("local-11th", "alice", "walk", local_11th)).await;

        let today = engine.get_today_tasks("alice").await.unwrap();
        let ids: Vec<_> = today.iter().map(|t| t.task.id.as_str()).collect();
        assert_eq!(ids, vec!["local-11th"]);
    }

    #[tokio::test]
    async fn test_upcoming_summary_buckets_every_day() {
        let fx = fixture().await;
        insert(&fx.state, TaskInstance::with_id("overdue", "alice", "walk", noon() - Duration::hours(2))).await;
        insert(&fx.state, TaskInstance::with_id("later", "alice", "walk", noon() + Duration::hours(2))).await;
        insert(&fx.state, TaskInstance::with_id("day3", "alice", "water", noon() + Duration::days(2))).await;
        insert(&fx.state, TaskInstance::with_id("outside", "alice", "water", noon() + Duration::days(7))).await;

        let buckets = fx.engine.get_upcoming_summary("alice", 7).await.unwrap();
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].date, fx.clock.today());
        assert_eq!(buckets[0].tasks.len(), 2);
        assert_eq!(buckets[0].pending, 2);
        assert_eq!(buckets[0].overdue, 1);
        assert!(buckets[1].is_empty());
        assert_eq!(buckets[2].tasks.len(), 1);
        assert_eq!(buckets.iter().map(|b| b.tasks.len()).sum::<usize>(), 3);

        assert!(fx.engine.get_upcoming_summary("alice", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upcoming_summary_caps_window() {
        let fx = fixture().await;
        let buckets = fx.engine.get_upcoming_summary("alice", u32::MAX).await.unwrap();
        assert_eq!(buckets.len(), MAX_UPCOMING_DAYS as usize);
        assert_eq!(buckets[0].date, fx.clock.today());
    }

    #[tokio::test]
    async fn test_compute_stats() {
        let fx = fixture().await;
        for (id, template, offset) in [("a", "water", 0), ("b", "walk", 1), ("c", "repot", 2)] {
            let mut task = TaskInstance::with_id(id, "alice", template, noon() - Duration::days(offset));
            task.mark_completed(noon() - Duration::days(offset));
            insert(&fx.state, task).await;
        }
        let mut orphan = TaskInstance::with_id("d", "alice", "ghost", noon());
        orphan.mark_completed(noon());
        insert(&fx.state, orphan).await;
        insert(&fx.state, TaskInstance::with_id("e", "alice", "walk", noon() - Duration::hours(1))).await;
        insert(&fx.state, TaskInstance::with_id("f", "alice", "walk", noon() + Duration::hours(1))).await;

        let stats = fx.engine.compute_stats("alice").await.unwrap();
        assert_eq!(stats.total_tasks, 6);
        assert_eq!(stats.completed_tasks, 4);
        assert_eq!(stats.pending_tasks, 2);
        assert_eq!(stats.overdue_tasks, 1);
        assert_eq!(stats.completion_rate, 67);
        assert_eq!(stats.streak, 3);
        // Orphaned completion counts zero points
        assert_eq!(stats.total_points, 45);
    }

    #[tokio::test]
    async fn test_compute_stats_empty_user() {
        let fx = fixture().await;
        let stats = fx.engine.compute_stats("nobody").await.unwrap();
        assert_eq!(stats, TaskStats::default());
    }

    #[tokio::test]
    async fn test_schedule_and_delete() {
        let fx = fixture().await;
        let task = fx
            .engine
            .schedule_task("alice", "water", noon(), Some("p1".to_string()))
            .await
            .unwrap();
        assert!(task.is_pending());
        assert_eq!(task.linked_plant_instance_id.as_deref(), Some("p1"));

        assert!(
            fx.engine
                .schedule_task("alice", "ghost", noon(), None)
                .await
                .unwrap_err()
                .is_not_found()
        );

        fx.engine.delete_task(&task.id).await.unwrap();
        assert!(fx.engine.delete_task(&task.id).await.unwrap_err().is_not_found());
    }
}
