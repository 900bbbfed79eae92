//! End-to-end movement task scenarios: plan-time contribution against a
//! mock navigation boundary, then latent execution against a recording
//! subtask provider.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::Result;
use indexmap::IndexMap;

use htn_exec::{
    LatentTask, SubtaskHandle, SubtaskProvider, SubtaskRequest, SubtaskState, TaskExecutor,
    TaskResult, TaskStatus,
};
use htn_plan::{NavProvider, PathQuery, PathResult, PlanRejection, PlanStepId, TaskContribution};
use htn_tasks::{MOVE_SUBTASK_KIND, MoveConfig, MoveRequest, MoveToTask};
use htn_worldstate::{
    LiveStore, ObjectId, ObjectLocator, Snapshot, Vec3, WorldKey, WorldStateView, WorldValue,
};

struct MockNav {
    path: RefCell<Option<PathResult>>,
    projected: RefCell<Option<Vec3>>,
    find_calls: Cell<usize>,
    project_calls: Cell<usize>,
}

impl MockNav {
    fn with_path(path: PathResult) -> Rc<Self> {
        Rc::new(Self {
            path: RefCell::new(Some(path)),
            projected: RefCell::new(None),
            find_calls: Cell::new(0),
            project_calls: Cell::new(0),
        })
    }

    fn pathless() -> Rc<Self> {
        Rc::new(Self {
            path: RefCell::new(None),
            projected: RefCell::new(None),
            find_calls: Cell::new(0),
            project_calls: Cell::new(0),
        })
    }
}

impl NavProvider for MockNav {
    fn find_path(&self, _query: &PathQuery) -> Option<PathResult> {
        self.find_calls.set(self.find_calls.get() + 1);
        self.path.borrow().clone()
    }

    fn project_point(&self, _point: Vec3, _extent: Vec3) -> Option<Vec3> {
        self.project_calls.set(self.project_calls.get() + 1);
        *self.projected.borrow()
    }
}

struct TableLocator(IndexMap<ObjectId, Vec3>);

impl ObjectLocator for TableLocator {
    fn locate(&self, object: ObjectId) -> Option<Vec3> {
        self.0.get(&object).copied()
    }
}

#[derive(Default)]
struct RecordingProvider {
    next: u64,
    states: IndexMap<SubtaskHandle, (SubtaskState, bool)>,
    pending: Vec<SubtaskHandle>,
    requests: Vec<SubtaskRequest>,
    /// Poll-style provider mode: new requests finish during setup with
    /// this outcome, no completion notification is queued.
    instant: Option<bool>,
    starts: usize,
    updates: usize,
    cancels: usize,
}

impl RecordingProvider {
    fn complete(&mut self, handle: SubtaskHandle, success: bool) {
        self.states.insert(handle, (SubtaskState::Finished, success));
        self.pending.push(handle);
    }
}

impl SubtaskProvider for RecordingProvider {
    fn start_or_update(
        &mut self,
        existing: Option<SubtaskHandle>,
        request: SubtaskRequest,
    ) -> Option<SubtaskHandle> {
        self.requests.push(request);
        if let Some(handle) = existing {
            if self.state(handle) == SubtaskState::Active {
                self.updates += 1;
                return Some(handle);
            }
        }
        self.next += 1;
        let handle = SubtaskHandle(self.next);
        let state = match self.instant {
            Some(outcome) => (SubtaskState::Finished, outcome),
            None => (SubtaskState::Active, false),
        };
        self.states.insert(handle, state);
        self.starts += 1;
        Some(handle)
    }

    fn cancel(&mut self, handle: SubtaskHandle) {
        self.cancels += 1;
        self.states.insert(handle, (SubtaskState::Finished, false));
    }

    fn state(&self, handle: SubtaskHandle) -> SubtaskState {
        self.states
            .get(&handle)
            .map(|(state, _)| *state)
            .unwrap_or(SubtaskState::Finished)
    }

    fn outcome(&self, handle: SubtaskHandle) -> bool {
        self.states
            .get(&handle)
            .map(|(_, outcome)| *outcome)
            .unwrap_or(false)
    }

    fn drain_finished(&mut self) -> Vec<SubtaskHandle> {
        std::mem::take(&mut self.pending)
    }
}

#[derive(Clone, Default)]
struct SharedProvider(Rc<RefCell<RecordingProvider>>);

impl SubtaskProvider for SharedProvider {
    fn start_or_update(
        &mut self,
        existing: Option<SubtaskHandle>,
        request: SubtaskRequest,
    ) -> Option<SubtaskHandle> {
        self.0.borrow_mut().start_or_update(existing, request)
    }

    fn cancel(&mut self, handle: SubtaskHandle) {
        self.0.borrow_mut().cancel(handle);
    }

    fn state(&self, handle: SubtaskHandle) -> SubtaskState {
        self.0.borrow().state(handle)
    }

    fn outcome(&self, handle: SubtaskHandle) -> bool {
        self.0.borrow().outcome(handle)
    }

    fn drain_finished(&mut self) -> Vec<SubtaskHandle> {
        self.0.borrow_mut().drain_finished()
    }
}

fn goal_key() -> WorldKey {
    WorldKey::new("move_goal")
}

fn straight_path(end: Vec3, length: f32, cost: f32) -> PathResult {
    PathResult {
        end,
        length,
        cost,
        partial: false,
    }
}

/// Root snapshot with the agent standing at `start` and the goal key
/// set to `goal`.
fn planning_view(start: Vec3, goal: Vec3) -> WorldStateView {
    let mut root = Snapshot::new();
    root.set(WorldKey::self_location(), WorldValue::Vector(start));
    root.set(goal_key(), WorldValue::Vector(goal));
    WorldStateView::sealed(root.seal())
}

fn executor_with(
    start: Vec3,
    goal: Vec3,
) -> (TaskExecutor, SharedProvider) {
    let provider = SharedProvider::default();
    let exec = TaskExecutor::new(LiveStore::new(), Box::new(provider.clone()));
    exec.live()
        .borrow_mut()
        .set(WorldKey::self_location(), WorldValue::Vector(start));
    exec.live()
        .borrow_mut()
        .set(goal_key(), WorldValue::Vector(goal));
    (exec, provider)
}

fn last_request(provider: &SharedProvider) -> MoveRequest {
    let inner = provider.0.borrow();
    let request = inner.requests.last().cloned().unwrap();
    assert_eq!(request.kind, MOVE_SUBTASK_KIND);
    serde_json::from_value(request.params).unwrap()
}

#[test]
fn contribution_advances_the_projected_location() -> Result<()> {
    let nav = MockNav::with_path(straight_path(Vec3::new(10.0, 0.0, 0.0), 10.0, 3.2));
    let task = MoveToTask::new(goal_key(), MoveConfig::default(), nav.clone());

    let view = planning_view(Vec3::new(0.0, 0.0, 90.0), Vec3::new(10.0, 0.0, 0.0));
    let contribution = task.contribute(&view)?;

    assert_eq!(contribution.cost, 10);
    let next = WorldStateView::sealed(contribution.next);
    // Path end raised by the agent's half height.
    assert_eq!(next.self_location(), Vec3::new(10.0, 0.0, 90.0));
    // The parent chain still reads the old location.
    assert_eq!(view.self_location(), Vec3::new(0.0, 0.0, 90.0));
    // The full path test supersedes goal projection.
    assert_eq!(nav.find_calls.get(), 1);
    assert_eq!(nav.project_calls.get(), 0);
    Ok(())
}

#[test]
fn contribution_charges_nav_cost_when_configured() -> Result<()> {
    let nav = MockNav::with_path(straight_path(Vec3::new(10.0, 0.0, 0.0), 10.0, 3.2));
    let config = MoveConfig {
        use_cost_instead_of_length: true,
        ..MoveConfig::default()
    };
    let task = MoveToTask::new(goal_key(), config, nav);

    let view = planning_view(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
    assert_eq!(task.contribute(&view)?.cost, 4);
    Ok(())
}

#[test]
fn contribution_skips_the_path_test_when_disabled() -> Result<()> {
    let nav = MockNav::pathless();
    let config = MoveConfig {
        test_path_during_planning: false,
        project_goal: false,
        agent_half_height: 0.0,
        ..MoveConfig::default()
    };
    let task = MoveToTask::new(goal_key(), config, nav.clone());

    let view = planning_view(Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0));
    let contribution = task.contribute(&view)?;
    assert_eq!(contribution.cost, 5);
    assert_eq!(
        WorldStateView::sealed(contribution.next).self_location(),
        Vec3::new(3.0, 4.0, 0.0)
    );
    assert_eq!(nav.find_calls.get(), 0);
    Ok(())
}

#[test]
fn cheap_estimate_projects_the_goal_when_possible() -> Result<()> {
    let nav = MockNav::pathless();
    *nav.projected.borrow_mut() = Some(Vec3::new(3.0, 0.0, 0.0));
    let config = MoveConfig {
        test_path_during_planning: false,
        agent_half_height: 0.0,
        ..MoveConfig::default()
    };
    let task = MoveToTask::new(goal_key(), config, nav.clone());

    let view = planning_view(Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0));
    let contribution = task.contribute(&view)?;
    assert_eq!(contribution.cost, 3);
    assert_eq!(
        WorldStateView::sealed(contribution.next).self_location(),
        Vec3::new(3.0, 0.0, 0.0)
    );
    assert_eq!(nav.project_calls.get(), 1);
    Ok(())
}

#[test]
fn cheap_estimate_survives_a_failed_projection() -> Result<()> {
    let nav = MockNav::pathless();
    let config = MoveConfig {
        test_path_during_planning: false,
        agent_half_height: 0.0,
        ..MoveConfig::default()
    };
    let task = MoveToTask::new(goal_key(), config, nav.clone());

    // Projection finds nothing traversable; the raw goal still yields
    // the straight-line estimate.
    let view = planning_view(Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0));
    let contribution = task.contribute(&view)?;
    assert_eq!(contribution.cost, 5);
    assert_eq!(
        WorldStateView::sealed(contribution.next).self_location(),
        Vec3::new(3.0, 4.0, 0.0)
    );
    assert_eq!(nav.project_calls.get(), 1);
    Ok(())
}

#[test]
fn rejections_are_cheap_and_reasoned() {
    let nav = MockNav::pathless();
    let task = MoveToTask::new(goal_key(), MoveConfig::default(), nav.clone());

    // No agent location at all.
    let mut root = Snapshot::new();
    root.set(goal_key(), WorldValue::Vector(Vec3::new(1.0, 0.0, 0.0)));
    let no_start = WorldStateView::sealed(root.seal());
    assert_eq!(
        task.contribute(&no_start).unwrap_err(),
        PlanRejection::InvalidStart
    );

    // No goal value under the key.
    let mut root = Snapshot::new();
    root.set(WorldKey::self_location(), WorldValue::Vector(Vec3::ZERO));
    let no_goal = WorldStateView::sealed(root.seal());
    assert_eq!(
        task.contribute(&no_goal).unwrap_err(),
        PlanRejection::InvalidGoal
    );
    // Neither rejection touched the navigation boundary.
    assert_eq!(nav.find_calls.get(), 0);
    assert_eq!(nav.project_calls.get(), 0);

    // An unreachable goal reports the simulation failure.
    let view = planning_view(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
    let rejection = task.contribute(&view).unwrap_err();
    assert_eq!(
        rejection.to_string(),
        "plan-time test failed: no admissible path to the goal"
    );
}

#[test]
fn contribution_requires_a_snapshot_view() {
    let nav = MockNav::pathless();
    let task = MoveToTask::new(goal_key(), MoveConfig::default(), nav);
    let live = WorldStateView::live(htn_worldstate::share(LiveStore::new()));
    assert_eq!(
        task.contribute(&live).unwrap_err(),
        PlanRejection::NotPlanning
    );
}

#[test]
fn one_latent_move_runs_to_completion() -> Result<()> {
    let nav = MockNav::pathless();
    let (mut exec, provider) = executor_with(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0));
    let task = Rc::new(MoveToTask::new(goal_key(), MoveConfig::default(), nav));

    let id = PlanStepId::new("move_to", 0);
    let started = exec.start(id.clone(), task as Rc<dyn LatentTask>)?;
    assert_eq!(started, TaskResult::InProgress);
    assert_eq!(provider.0.borrow().starts, 1);
    assert_eq!(last_request(&provider).goal, Vec3::new(100.0, 0.0, 0.0));

    let handle = exec.node_memory(&id).unwrap().subtask.unwrap();
    provider.0.borrow_mut().complete(handle, true);
    exec.tick(0.1);

    assert_eq!(exec.take_results(), vec![(id.clone(), TaskResult::Succeeded)]);
    assert!(exec.node_memory(&id).is_none());
    Ok(())
}

#[test]
fn synchronous_completion_finishes_the_step_at_start() -> Result<()> {
    let nav = MockNav::pathless();
    let (mut exec, provider) = executor_with(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0));
    provider.0.borrow_mut().instant = Some(true);
    let task = Rc::new(MoveToTask::new(goal_key(), MoveConfig::default(), nav));

    let id = PlanStepId::new("move_to", 0);
    assert_eq!(
        exec.start(id.clone(), task as Rc<dyn LatentTask>)?,
        TaskResult::Succeeded
    );
    assert_eq!(exec.status(&id), TaskStatus::Inactive);
    assert_eq!(exec.take_results(), vec![(id, TaskResult::Succeeded)]);
    assert_eq!(provider.0.borrow().starts, 1);
    Ok(())
}

#[test]
fn arrival_within_acceptance_succeeds_without_a_subtask() -> Result<()> {
    let nav = MockNav::pathless();
    let (mut exec, provider) = executor_with(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0));
    let task = Rc::new(MoveToTask::new(goal_key(), MoveConfig::default(), nav));

    let id = PlanStepId::new("move_to", 0);
    assert_eq!(
        exec.start(id, task as Rc<dyn LatentTask>)?,
        TaskResult::Succeeded
    );
    assert_eq!(provider.0.borrow().starts, 0);
    Ok(())
}

#[test]
fn goal_drift_below_tolerance_is_ignored() -> Result<()> {
    let nav = MockNav::pathless();
    let config = MoveConfig {
        observe_goal: true,
        observe_tolerance_radius: 1.0,
        ..MoveConfig::default()
    };
    let (mut exec, provider) = executor_with(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0));
    let task = Rc::new(MoveToTask::new(goal_key(), config, nav));

    let id = PlanStepId::new("move_to", 0);
    exec.start(id.clone(), task as Rc<dyn LatentTask>)?;
    assert!(exec.node_memory(&id).unwrap().observer.is_some());

    // Drift within tolerance: no re-issue.
    exec.live()
        .borrow_mut()
        .set(goal_key(), WorldValue::Vector(Vec3::new(100.5, 0.0, 0.0)));
    exec.tick(0.1);
    assert_eq!(provider.0.borrow().updates, 0);
    assert_eq!(
        exec.node_memory(&id).unwrap().previous_goal,
        Vec3::new(100.0, 0.0, 0.0)
    );

    // Drift beyond tolerance: the same subtask is re-targeted.
    exec.live()
        .borrow_mut()
        .set(goal_key(), WorldValue::Vector(Vec3::new(102.5, 0.0, 0.0)));
    exec.tick(0.1);
    assert_eq!(provider.0.borrow().updates, 1);
    assert_eq!(provider.0.borrow().starts, 1);
    assert_eq!(last_request(&provider).goal, Vec3::new(102.5, 0.0, 0.0));
    assert_eq!(
        exec.node_memory(&id).unwrap().previous_goal,
        Vec3::new(102.5, 0.0, 0.0)
    );
    assert_eq!(exec.status(&id), TaskStatus::Active);
    Ok(())
}

#[test]
fn changed_object_goal_reissues_regardless_of_tolerance() -> Result<()> {
    let nav = MockNav::pathless();
    let config = MoveConfig {
        observe_goal: true,
        ..MoveConfig::default()
    };
    // Two goal objects standing well within the default tolerance of
    // each other.
    let locator = Rc::new(TableLocator(
        [
            (ObjectId(1), Vec3::new(100.0, 0.0, 0.0)),
            (ObjectId(2), Vec3::new(100.5, 0.0, 0.0)),
        ]
        .into_iter()
        .collect(),
    ));
    let (mut exec, provider) = executor_with(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0));
    exec.live()
        .borrow_mut()
        .set(goal_key(), WorldValue::Object(ObjectId(1)));
    let task = Rc::new(
        MoveToTask::new(goal_key(), config, nav).with_locator(locator as Rc<dyn ObjectLocator>),
    );

    let id = PlanStepId::new("move_to", 0);
    exec.start(id.clone(), task as Rc<dyn LatentTask>)?;
    assert_eq!(provider.0.borrow().starts, 1);

    exec.live()
        .borrow_mut()
        .set(goal_key(), WorldValue::Object(ObjectId(2)));
    exec.tick(0.1);
    assert_eq!(provider.0.borrow().updates, 1);
    assert_eq!(last_request(&provider).goal, Vec3::new(100.5, 0.0, 0.0));
    assert_eq!(
        exec.node_memory(&id).unwrap().previous_goal,
        Vec3::new(100.5, 0.0, 0.0)
    );
    Ok(())
}

#[test]
fn cleared_goal_fails_the_observing_step() -> Result<()> {
    let nav = MockNav::pathless();
    let config = MoveConfig {
        observe_goal: true,
        ..MoveConfig::default()
    };
    let (mut exec, _provider) = executor_with(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0));
    let task = Rc::new(MoveToTask::new(goal_key(), config, nav));

    let id = PlanStepId::new("move_to", 0);
    exec.start(id.clone(), task as Rc<dyn LatentTask>)?;

    exec.live().borrow_mut().clear(&goal_key());
    exec.tick(0.1);
    assert_eq!(exec.take_results(), vec![(id, TaskResult::Failed)]);
    assert_eq!(exec.live().borrow().observer_count(), 0);
    Ok(())
}

#[test]
fn abort_cancels_the_move_and_late_completions_drop() -> Result<()> {
    let nav = MockNav::pathless();
    let (mut exec, provider) = executor_with(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0));
    let task = Rc::new(MoveToTask::new(goal_key(), MoveConfig::default(), nav));

    let id = PlanStepId::new("move_to", 0);
    exec.start(id.clone(), task as Rc<dyn LatentTask>)?;
    let handle = exec.node_memory(&id).unwrap().subtask.unwrap();

    exec.abort(&id)?;
    assert_eq!(provider.0.borrow().cancels, 1);
    assert_eq!(exec.take_results(), vec![(id.clone(), TaskResult::Aborted)]);

    provider.0.borrow_mut().complete(handle, true);
    exec.tick(0.1);
    assert!(exec.take_results().is_empty());
    assert_eq!(exec.status(&id), TaskStatus::Inactive);
    Ok(())
}
