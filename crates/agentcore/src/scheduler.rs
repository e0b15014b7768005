//! Background agent scheduler: interval or cron triggers feed a bounded
//! per-task queue that a single serial worker drains, retrying failed runs
//! up to `max_retries` with a fixed delay and enforcing `timeout_s` per
//! attempt. Grounded on the teacher pack's `sven-scheduler` crate, which
//! reaches for the same `cron` crate for 5-field expression evaluation;
//! the queue + serial worker are built the teacher's way, with a bounded
//! `tokio::sync::mpsc` channel per agent and one `tokio::spawn` drain loop.

use crate::agent::AgentCore;
use agentcore_types::{AgentError, EventKind, Schedule, TaskConfig};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Lifecycle state of one scheduled task, per spec.md §4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Scheduled,
    Running,
    Paused,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStats {
    pub attempts: u64,
    pub failures: u64,
    pub queue_overflows: u64,
}

#[derive(Default)]
struct TaskStatsInner {
    attempts: AtomicU64,
    failures: AtomicU64,
    queue_overflows: AtomicU64,
}

impl TaskStatsInner {
    fn snapshot(&self) -> TaskStats {
        TaskStats {
            attempts: self.attempts.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            queue_overflows: self.queue_overflows.load(Ordering::SeqCst),
        }
    }
}

struct TaskHandle {
    state: Arc<Mutex<TaskState>>,
    stats: Arc<TaskStatsInner>,
    /// Taken (and dropped) by `stop`/`delete` to close the channel once the
    /// ticker's own clone is also gone, letting the worker drain and exit.
    sender: Mutex<Option<mpsc::Sender<()>>>,
    ticker: JoinHandle<()>,
    worker: JoinHandle<()>,
}

/// Owns every background task scheduled against one `AgentCore`. Different
/// agents get their own manager; within a manager, tasks run one at a time
/// per agent id but many task ids proceed across managers concurrently.
pub struct BackgroundManager {
    agent: Arc<AgentCore>,
    tasks: Mutex<HashMap<String, Arc<TaskHandle>>>,
}

impl BackgroundManager {
    pub fn new(agent: Arc<AgentCore>) -> Self {
        Self {
            agent,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Register `config` and start its ticker immediately (`create ->
    /// scheduled`). Returns the generated task id.
    pub fn schedule(&self, config: TaskConfig) -> String {
        let task_id = Uuid::new_v4().to_string();
        let state = Arc::new(Mutex::new(TaskState::Scheduled));
        let stats = Arc::new(TaskStatsInner::default());
        let (sender, receiver) = mpsc::channel(config.queue_size.max(1));

        let worker = tokio::spawn(run_worker(
            self.agent.clone(),
            task_id.clone(),
            config.clone(),
            receiver,
            state.clone(),
            stats.clone(),
        ));
        let ticker = tokio::spawn(run_ticker(config, sender.clone(), state.clone(), stats.clone()));

        let handle = Arc::new(TaskHandle {
            state,
            stats,
            sender: Mutex::new(Some(sender)),
            ticker,
            worker,
        });
        self.tasks.lock().insert(task_id.clone(), handle);
        task_id
    }

    pub fn state(&self, task_id: &str) -> Option<TaskState> {
        self.tasks.lock().get(task_id).map(|h| *h.state.lock())
    }

    pub fn stats(&self, task_id: &str) -> Option<TaskStats> {
        self.tasks.lock().get(task_id).map(|h| h.stats.snapshot())
    }

    /// Suspend the ticker; the worker keeps draining whatever is already
    /// queued.
    pub fn pause(&self, task_id: &str) -> Result<(), AgentError> {
        let handle = self.get(task_id)?;
        *handle.state.lock() = TaskState::Paused;
        Ok(())
    }

    pub fn resume(&self, task_id: &str) -> Result<(), AgentError> {
        let handle = self.get(task_id)?;
        let mut state = handle.state.lock();
        if *state == TaskState::Paused {
            *state = TaskState::Scheduled;
        }
        Ok(())
    }

    /// Cancel the ticker, let the worker drain whatever is already queued,
    /// then return once it has exited (or `shutdown_grace` elapses, in
    /// which case the worker is aborted outright and remaining items are
    /// dropped).
    pub async fn stop(&self, task_id: &str, shutdown_grace: Duration) -> Result<(), AgentError> {
        let handle = self.get(task_id)?;
        *handle.state.lock() = TaskState::Stopped;
        handle.ticker.abort();
        handle.sender.lock().take(); // drop our clone; ticker's is gone too now

        match tokio::time::timeout(shutdown_grace, wait_for_handle(&handle.worker)).await {
            Ok(_) => {}
            Err(_) => handle.worker.abort(),
        }
        Ok(())
    }

    /// `delete`: stop, then drop the task entirely.
    pub async fn delete(&self, task_id: &str, shutdown_grace: Duration) -> Result<(), AgentError> {
        self.stop(task_id, shutdown_grace).await?;
        self.tasks.lock().remove(task_id);
        Ok(())
    }

    /// Signal every task to stop, waiting up to `shutdown_grace` each.
    pub async fn shutdown(&self, shutdown_grace: Duration) {
        let ids: Vec<String> = self.tasks.lock().keys().cloned().collect();
        for id in ids {
            let _ = self.stop(&id, shutdown_grace).await;
        }
    }

    fn get(&self, task_id: &str) -> Result<Arc<TaskHandle>, AgentError> {
        self.tasks
            .lock()
            .get(task_id)
            .cloned()
            .ok_or_else(|| AgentError::Internal(format!("no such task: {task_id}")))
    }

    #[cfg(test)]
    fn force_tick(&self, task_id: &str) {
        let handle = self.tasks.lock().get(task_id).cloned().unwrap();
        if let Some(sender) = handle.sender.lock().as_ref() {
            let _ = sender.try_send(());
        }
    }
}

async fn wait_for_handle(handle: &JoinHandle<()>) {
    // `JoinHandle` isn't `Clone`, and we only hold a `&JoinHandle` here (the
    // owning `Arc<TaskHandle>` is shared with the manager's map), so poll
    // completion instead of awaiting the handle directly.
    while !handle.is_finished() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Enqueues a tick for every fire time the schedule produces, dropping the
/// incoming tick (not any already-queued task) and recording
/// `queue_overflow` when the channel is full.
async fn run_ticker(
    config: TaskConfig,
    sender: mpsc::Sender<()>,
    state: Arc<Mutex<TaskState>>,
    stats: Arc<TaskStatsInner>,
) {
    loop {
        let sleep_for = match next_fire_delay(&config.schedule) {
            Some(d) => d,
            None => return,
        };
        tokio::time::sleep(sleep_for).await;

        if *state.lock() == TaskState::Stopped {
            return;
        }
        if *state.lock() == TaskState::Paused {
            continue;
        }
        if sender.try_send(()).is_err() {
            stats.queue_overflows.fetch_add(1, Ordering::SeqCst);
            log::warn!("background task queue full, dropped tick for config query {:?}", config.query);
        }
    }
}

fn next_fire_delay(schedule: &Schedule) -> Option<Duration> {
    match schedule {
        Schedule::Interval { seconds } => Some(Duration::from_secs((*seconds).max(1))),
        Schedule::Cron { expression } => {
            let parsed = cron::Schedule::from_str(expression).ok()?;
            let now = Utc::now();
            let next = parsed.after(&now).next()?;
            let delta = next.signed_duration_since(now).to_std().ok()?;
            Some(delta)
        }
    }
}

/// Drains queued ticks serially, running the configured query under
/// `timeout_s` with up to `max_retries` fixed-delay retries.
async fn run_worker(
    agent: Arc<AgentCore>,
    task_id: String,
    config: TaskConfig,
    mut receiver: mpsc::Receiver<()>,
    state: Arc<Mutex<TaskState>>,
    stats: Arc<TaskStatsInner>,
) {
    while receiver.recv().await.is_some() {
        if *state.lock() == TaskState::Stopped {
            break;
        }
        *state.lock() = TaskState::Running;

        let outcome = execute_with_retries(&agent, &config, &stats).await;

        let mut guard = state.lock();
        if *guard != TaskState::Stopped {
            *guard = if outcome.is_ok() { TaskState::Scheduled } else { TaskState::Failed };
        }
        drop(guard);

        if let Err(reason) = outcome {
            agent
                .events_handle()
                .publish(
                    config.session_id.as_deref().unwrap_or("background"),
                    agent.agent_id(),
                    EventKind::TaskFailed {
                        task_id: task_id.clone(),
                        reason,
                    },
                )
                .await
                .ok();
        }
    }
}

async fn execute_with_retries(agent: &Arc<AgentCore>, config: &TaskConfig, stats: &TaskStatsInner) -> Result<(), String> {
    let mut last_error = String::new();
    for attempt in 0..=config.max_retries {
        stats.attempts.fetch_add(1, Ordering::SeqCst);
        let run = agent.run(config.query.clone(), config.session_id.clone());
        let result = if config.timeout_s > 0 {
            match tokio::time::timeout(Duration::from_secs(config.timeout_s), run).await {
                Ok(inner) => inner.map_err(|e| e.to_string()),
                Err(_) => Err(format!("task timed out after {}s", config.timeout_s)),
            }
        } else {
            run.await.map_err(|e| e.to_string())
        };

        match result {
            Ok(_) => return Ok(()),
            Err(e) => {
                log::warn!("background task {} attempt {} failed: {}", config.agent_id, attempt + 1, e);
                last_error = e;
                stats.failures.fetch_add(1, Ordering::SeqCst);
                if attempt < config.max_retries && config.retry_delay_s > 0 {
                    tokio::time::sleep(Duration::from_secs(config.retry_delay_s)).await;
                }
            }
        }
    }
    log::error!(
        "background task {} exhausted {} retries, marking failed: {}",
        config.agent_id,
        config.max_retries,
        last_error
    );
    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::llm::{LLMResponse, Usage};
    use crate::test_support::{FailingLLMClient, ScriptedLLMClient};

    #[tokio::test]
    async fn interval_task_starts_scheduled_and_stops_cleanly() {
        let llm = Arc::new(ScriptedLLMClient::new(vec![LLMResponse {
            text: Some("tick".into()),
            tool_calls: vec![],
            usage: Usage::default(),
        }]));
        let agent = Arc::new(AgentCore::new("bg", AgentConfig::default(), llm));
        let manager = BackgroundManager::new(agent);

        let mut config = TaskConfig::interval("bg", "do the thing", 60);
        config.timeout_s = 5;
        let task_id = manager.schedule(config);
        // `interval(60)` won't fire within the test window; assert the
        // lifecycle transition from `create` alone.
        assert_eq!(manager.state(&task_id), Some(TaskState::Scheduled));

        manager.stop(&task_id, Duration::from_millis(200)).await.unwrap();
        assert_eq!(manager.state(&task_id), Some(TaskState::Stopped));
    }

    #[tokio::test]
    async fn pause_then_resume_round_trips_state() {
        let llm = Arc::new(ScriptedLLMClient::new(vec![]));
        let agent = Arc::new(AgentCore::new("bg", AgentConfig::default(), llm));
        let manager = BackgroundManager::new(agent);

        let task_id = manager.schedule(TaskConfig::interval("bg", "noop", 3600));
        manager.pause(&task_id).unwrap();
        assert_eq!(manager.state(&task_id), Some(TaskState::Paused));

        manager.resume(&task_id).unwrap();
        assert_eq!(manager.state(&task_id), Some(TaskState::Scheduled));

        manager.stop(&task_id, Duration::from_millis(200)).await.unwrap();
    }

    #[tokio::test]
    async fn queue_size_one_drops_second_concurrent_submission() {
        let llm = Arc::new(ScriptedLLMClient::new(vec![]));
        let agent = Arc::new(AgentCore::new("bg", AgentConfig::default(), llm));
        let manager = BackgroundManager::new(agent);

        let mut config = TaskConfig::interval("bg", "slow", 3600);
        config.queue_size = 1;
        let task_id = manager.schedule(config);

        // Manually drive two ticks faster than the worker can drain a
        // deliberately-never-completing first one isn't needed here: the
        // channel's capacity is 1, so a second immediate send while the
        // first is still buffered overflows.
        manager.force_tick(&task_id);
        manager.force_tick(&task_id);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let stats = manager.stats(&task_id).unwrap();
        assert!(stats.queue_overflows >= 1);

        manager.stop(&task_id, Duration::from_millis(200)).await.unwrap();
    }

    #[tokio::test]
    async fn retries_exhaust_and_task_is_marked_failed() {
        let llm = Arc::new(FailingLLMClient);
        let agent = Arc::new(AgentCore::new("bg", AgentConfig::default(), llm));
        let manager = BackgroundManager::new(agent);

        let mut config = TaskConfig::interval("bg", "always fails", 3600);
        config.max_retries = 2;
        config.retry_delay_s = 0;
        config.timeout_s = 1;
        let task_id = manager.schedule(config);
        manager.force_tick(&task_id);

        let mut iterations = 0;
        loop {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if manager.state(&task_id) == Some(TaskState::Failed) || iterations > 200 {
                break;
            }
            iterations += 1;
        }

        let stats = manager.stats(&task_id).unwrap();
        assert_eq!(stats.attempts, 3); // initial + 2 retries
        assert_eq!(manager.state(&task_id), Some(TaskState::Failed));

        manager.stop(&task_id, Duration::from_millis(200)).await.unwrap();
    }
}
