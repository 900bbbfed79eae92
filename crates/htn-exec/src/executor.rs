use std::rc::Rc;

use htn_plan::PlanStepId;
use htn_worldstate::{
    LiveStore, ObserverHandle, SharedLiveStore, WorldKey, WorldStateView, share,
};

use crate::error::ExecError;
use crate::memory::{MemoryArena, NodeMemory};
use crate::service::{PlanService, ServiceSchedule, ServiceScheduler};
use crate::subtask::{SubtaskProvider, SubtaskState};
use crate::task::{LatentTask, TaskResult, TaskStatus};

use indexmap::IndexMap;

/// What a latent-task hook gets to work with: an editable live view,
/// exclusive access to the occurrence's memory, and the subtask
/// provider. One hook runs at a time per agent.
pub struct ExecContext<'a> {
    live: SharedLiveStore,
    pub memory: &'a mut NodeMemory,
    pub provider: &'a mut dyn SubtaskProvider,
}

impl ExecContext<'_> {
    /// Editable view over the live store.
    pub fn view(&self) -> WorldStateView {
        WorldStateView::live(Rc::clone(&self.live))
    }

    pub fn subscribe(&mut self, key: WorldKey) -> ObserverHandle {
        self.live.borrow_mut().subscribe(key)
    }

    pub fn unsubscribe(&mut self, handle: ObserverHandle) -> bool {
        self.live.borrow_mut().unsubscribe(handle)
    }
}

/// Drives the latent plan steps of one agent: starts them, routes
/// queued completion and key-change signals back to the owning
/// occurrence with identity re-validation, and tears occurrences down
/// on success, failure or abort.
pub struct TaskExecutor {
    live: SharedLiveStore,
    memory: MemoryArena,
    provider: Box<dyn SubtaskProvider>,
    active: IndexMap<PlanStepId, Rc<dyn LatentTask>>,
    finished: Vec<(PlanStepId, TaskResult)>,
    services: ServiceScheduler,
}

impl TaskExecutor {
    pub fn new(live: LiveStore, provider: Box<dyn SubtaskProvider>) -> Self {
        Self {
            live: share(live),
            memory: MemoryArena::new(),
            provider,
            active: IndexMap::new(),
            finished: Vec::new(),
            services: ServiceScheduler::new(),
        }
    }

    pub fn live(&self) -> SharedLiveStore {
        Rc::clone(&self.live)
    }

    /// Editable view over the live store, as handed to executing tasks.
    pub fn view(&self) -> WorldStateView {
        WorldStateView::live(Rc::clone(&self.live))
    }

    pub fn status(&self, id: &PlanStepId) -> TaskStatus {
        if self.active.contains_key(id) {
            TaskStatus::Active
        } else {
            TaskStatus::Inactive
        }
    }

    pub fn node_memory(&self, id: &PlanStepId) -> Option<&NodeMemory> {
        self.memory.get(id)
    }

    /// Begins executing one occurrence. Creates its node memory, runs
    /// the task's start hook and finishes immediately on a terminal
    /// result.
    pub fn start(
        &mut self,
        id: PlanStepId,
        task: Rc<dyn LatentTask>,
    ) -> Result<TaskResult, ExecError> {
        if self.active.contains_key(&id) {
            return Err(ExecError::AlreadyActive(id));
        }
        self.active.insert(id.clone(), Rc::clone(&task));
        let result = {
            let mut cx = ExecContext {
                live: Rc::clone(&self.live),
                memory: self.memory.create(id.clone()),
                provider: &mut *self.provider,
            };
            task.execute(&mut cx, &id)
        };
        if result.is_terminal() {
            self.finish(&id, result);
        }
        Ok(result)
    }

    /// External cancellation of an executing occurrence. Safe at any
    /// point during execution, including mid-start of its subtask.
    pub fn abort(&mut self, id: &PlanStepId) -> Result<(), ExecError> {
        if !self.active.contains_key(id) {
            return Err(ExecError::NotActive(id.clone()));
        }
        self.finish(id, TaskResult::Aborted);
        Ok(())
    }

    /// One pass of the agent's update cadence: route queued subtask
    /// completions and key-change notifications, then tick services.
    pub fn tick(&mut self, dt: f32) {
        self.route_subtask_completions();
        self.route_key_changes();
        let mut view = self.view();
        self.services.advance(dt, &mut view);
    }

    /// Finished results since the last call, in completion order.
    pub fn take_results(&mut self) -> Vec<(PlanStepId, TaskResult)> {
        std::mem::take(&mut self.finished)
    }

    pub fn add_service(&mut self, service: Rc<dyn PlanService>, schedule: ServiceSchedule) {
        self.services.add(service, schedule);
    }

    /// Called when plan execution begins; services get their begin hook
    /// and their first deadlines.
    pub fn begin_services(&mut self) {
        let mut view = self.view();
        self.services.begin(&mut view);
    }

    pub fn end_services(&mut self) {
        let mut view = self.view();
        self.services.end(&mut view);
    }

    fn route_subtask_completions(&mut self) {
        for handle in self.provider.drain_finished() {
            let Some(id) = self.memory.owner_of_subtask(handle).cloned() else {
                log::warn!("late subtask completion ignored (no owning occurrence)");
                continue;
            };
            let Some(block) = self.memory.get(&id) else {
                continue;
            };
            if !block.observer_can_finish {
                log::warn!("subtask completion for {id} ignored (finish guard is down)");
                continue;
            }
            if self.provider.state(handle) != SubtaskState::Finished {
                continue;
            }
            let result = if self.provider.outcome(handle) {
                TaskResult::Succeeded
            } else {
                TaskResult::Failed
            };
            self.finish(&id, result);
        }
    }

    fn route_key_changes(&mut self) {
        let changes = self.live.borrow_mut().drain_changes();
        for change in changes {
            let Some(id) = self.memory.owner_of_observer(change.handle).cloned() else {
                log::warn!(
                    "stale observer notification for '{}', unsubscribing",
                    change.key
                );
                self.live.borrow_mut().unsubscribe(change.handle);
                continue;
            };
            let Some(task) = self.active.get(&id).map(Rc::clone) else {
                log::warn!("observer notification for inactive step {id}, unsubscribing");
                self.live.borrow_mut().unsubscribe(change.handle);
                if let Some(block) = self.memory.get_mut(&id) {
                    block.observer = None;
                }
                continue;
            };
            let result = {
                let Some(block) = self.memory.get_mut(&id) else {
                    continue;
                };
                let mut cx = ExecContext {
                    live: Rc::clone(&self.live),
                    memory: block,
                    provider: &mut *self.provider,
                };
                task.on_key_changed(&mut cx, &id, &change.key)
            };
            if result.is_terminal() {
                self.finish(&id, result);
            }
        }
    }

    /// Terminal transition: run the task's finish hook, then tear down
    /// node memory, releasing the subtask reference and any remaining
    /// observer subscription.
    fn finish(&mut self, id: &PlanStepId, result: TaskResult) {
        let Some(task) = self.active.shift_remove(id) else {
            return;
        };
        if let Some(block) = self.memory.get_mut(id) {
            let mut cx = ExecContext {
                live: Rc::clone(&self.live),
                memory: block,
                provider: &mut *self.provider,
            };
            task.on_finished(&mut cx, id, result);
        }
        if let Some(block) = self.memory.destroy(id) {
            if let Some(handle) = block.observer {
                self.live.borrow_mut().unsubscribe(handle);
            }
        }
        self.finished.push((id.clone(), result));
    }
}
