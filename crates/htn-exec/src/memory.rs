use htn_plan::PlanStepId;
use htn_worldstate::{ObserverHandle, Vec3};
use indexmap::IndexMap;

use crate::subtask::SubtaskHandle;

/// Per-occurrence scratch record. Created when the plan step starts
/// executing, destroyed at teardown, never persisted across a planning
/// pass.
#[derive(Debug)]
pub struct NodeMemory {
    /// In-flight latent subtask, if any.
    pub subtask: Option<SubtaskHandle>,
    /// Live-key subscription owned by this occurrence, if any.
    pub observer: Option<ObserverHandle>,
    /// Last goal the subtask was issued for; tolerance comparisons run
    /// against this.
    pub previous_goal: Vec3,
    /// Guard flag: while false, a completion signal must not finalize
    /// this occurrence (a re-issue or teardown is in progress).
    pub observer_can_finish: bool,
}

impl Default for NodeMemory {
    fn default() -> Self {
        Self {
            subtask: None,
            observer: None,
            previous_goal: Vec3::INVALID,
            observer_can_finish: true,
        }
    }
}

impl NodeMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Identity-keyed storage for node memory, one block per executing
/// occurrence.
#[derive(Default)]
pub struct MemoryArena {
    blocks: IndexMap<PlanStepId, NodeMemory>,
}

impl MemoryArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh block, replacing any leftover from a previous
    /// occurrence with the same identity.
    pub fn create(&mut self, id: PlanStepId) -> &mut NodeMemory {
        let block = self.blocks.entry(id).or_default();
        *block = NodeMemory::new();
        block
    }

    pub fn get(&self, id: &PlanStepId) -> Option<&NodeMemory> {
        self.blocks.get(id)
    }

    pub fn get_mut(&mut self, id: &PlanStepId) -> Option<&mut NodeMemory> {
        self.blocks.get_mut(id)
    }

    pub fn destroy(&mut self, id: &PlanStepId) -> Option<NodeMemory> {
        self.blocks.shift_remove(id)
    }

    /// The occurrence whose block holds this subtask handle, if any.
    pub fn owner_of_subtask(&self, handle: SubtaskHandle) -> Option<&PlanStepId> {
        self.blocks
            .iter()
            .find(|(_, block)| block.subtask == Some(handle))
            .map(|(id, _)| id)
    }

    /// The occurrence whose block holds this observer handle, if any.
    pub fn owner_of_observer(&self, handle: ObserverHandle) -> Option<&PlanStepId> {
        self.blocks
            .iter()
            .find(|(_, block)| block.observer == Some(handle))
            .map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_live_from_create_to_destroy() {
        let mut arena = MemoryArena::new();
        let id = PlanStepId::new("move_to", 0);
        assert!(arena.get(&id).is_none());

        let block = arena.create(id.clone());
        assert!(block.observer_can_finish);
        assert!(!block.previous_goal.is_valid());

        block.subtask = Some(SubtaskHandle(7));
        let released = arena.destroy(&id).unwrap();
        assert_eq!(released.subtask, Some(SubtaskHandle(7)));
        assert!(arena.is_empty());
    }

    #[test]
    fn create_resets_leftover_state() {
        let mut arena = MemoryArena::new();
        let id = PlanStepId::new("move_to", 0);
        arena.create(id.clone()).observer_can_finish = false;
        assert!(arena.create(id.clone()).observer_can_finish);
    }

    #[test]
    fn owner_lookups_resolve_identity() {
        let mut arena = MemoryArena::new();
        let first = PlanStepId::new("move_to", 0);
        let second = PlanStepId::new("move_to", 1);
        arena.create(first.clone()).subtask = Some(SubtaskHandle(1));
        arena.create(second.clone()).subtask = Some(SubtaskHandle(2));

        assert_eq!(arena.owner_of_subtask(SubtaskHandle(2)), Some(&second));
        assert_eq!(arena.owner_of_subtask(SubtaskHandle(1)), Some(&first));
        assert!(arena.owner_of_subtask(SubtaskHandle(3)).is_none());
        assert_eq!(arena.len(), 2);
    }
}
