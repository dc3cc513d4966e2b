use std::fmt;

use tracing::debug;

use crate::action::{ReversibleAction, commit_all};
use crate::audit::ChainAuditLog;

/// Execute `actions` in order, unwinding on the first failure.
///
/// Every action that executed successfully is pushed onto an unwind stack.
/// If an action fails, the stack is popped and each earlier action is undone
/// in reverse order of execution; the failing action itself is not undone.
/// If every action succeeds, all of them are committed and no compensation
/// runs. An empty sequence succeeds trivially.
///
/// If a forward operation panics, the earlier actions are still undone in
/// reverse order before the panic continues to the caller.
///
/// # Errors
///
/// Returns the first forward error, unchanged, after the unwind completed.
pub fn execute_chain<'a, 'f, E>(
    actions: impl IntoIterator<Item = &'a mut ReversibleAction<'f, E>>,
) -> Result<(), E>
where
    'f: 'a,
    E: 'a,
{
    let (result, _audit_log) = execute_internal(actions);
    result
}

/// Execute `actions` like [`execute_chain`] and also return an audit log.
#[must_use]
pub fn execute_chain_with_audit<'a, 'f, E>(
    actions: impl IntoIterator<Item = &'a mut ReversibleAction<'f, E>>,
) -> (Result<(), E>, ChainAuditLog)
where
    'f: 'a,
    E: 'a,
{
    execute_internal(actions)
}

fn execute_internal<'a, 'f, E>(
    actions: impl IntoIterator<Item = &'a mut ReversibleAction<'f, E>>,
) -> (Result<(), E>, ChainAuditLog)
where
    'f: 'a,
    E: 'a,
{
    let mut audit_log = ChainAuditLog::new();
    let mut unwind_stack = UnwindStack::new();

    debug!("executing action chain");
    for (position, action) in actions.into_iter().enumerate() {
        audit_log.record_start(position, action.name());

        match action.execute() {
            Ok(()) => {
                audit_log.record_success();
                unwind_stack.push(position, action);
            }
            Err(error) => {
                audit_log.record_failure();
                debug!(
                    action = action.name(),
                    position,
                    count = unwind_stack.len(),
                    "action failed, unwinding chain"
                );
                unwind_stack.unwind(&mut audit_log);
                return (Err(error), audit_log);
            }
        }
    }

    debug!(count = unwind_stack.len(), "all actions succeeded, committing chain");
    unwind_stack.commit();
    audit_log.record_all_committed();

    (Ok(()), audit_log)
}

/// Actions that executed successfully, undone in reverse order.
///
/// Entries still on the stack when it is dropped are undone, so a panicking
/// forward operation still rolls back everything executed before it.
struct UnwindStack<'a, 'f, E> {
    entries: Vec<(usize, &'a mut ReversibleAction<'f, E>)>,
}

impl<'a, 'f, E> UnwindStack<'a, 'f, E> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn push(&mut self, position: usize, action: &'a mut ReversibleAction<'f, E>) {
        self.entries.push((position, action));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn unwind(&mut self, audit_log: &mut ChainAuditLog) {
        while let Some((position, action)) = self.entries.pop() {
            action.undo();
            audit_log.record_undone(position);
        }
    }

    fn commit(&mut self) {
        commit_all(self.entries.drain(..).map(|(_, action)| action));
    }
}

impl<E> Drop for UnwindStack<'_, '_, E> {
    fn drop(&mut self) {
        if self.entries.is_empty() {
            return;
        }

        debug!(count = self.entries.len(), "chain interrupted, unwinding");
        while let Some((_, action)) = self.entries.pop() {
            action.undo();
        }
    }
}

/// An owned, reusable sequence of actions.
///
/// Running the chain again re-arms every action, so a chain behaves the same
/// on each run.
pub struct ActionChain<'f, E> {
    actions: Vec<ReversibleAction<'f, E>>,
}

impl<'f, E> ActionChain<'f, E> {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Append an action to the chain.
    #[must_use]
    pub fn then(mut self, action: ReversibleAction<'f, E>) -> Self {
        self.actions.push(action);
        self
    }

    pub fn push(&mut self, action: ReversibleAction<'f, E>) {
        self.actions.push(action);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[must_use]
    pub fn actions(&self) -> &[ReversibleAction<'f, E>] {
        &self.actions
    }

    #[must_use]
    pub fn into_actions(self) -> Vec<ReversibleAction<'f, E>> {
        self.actions
    }

    /// Execute every action in order, unwinding on the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first forward error, unchanged, after the unwind completed.
    pub fn execute(&mut self) -> Result<(), E> {
        execute_chain(&mut self.actions)
    }

    /// Execute the chain and return both the result and an audit log.
    #[must_use]
    pub fn execute_with_audit(&mut self) -> (Result<(), E>, ChainAuditLog) {
        execute_chain_with_audit(&mut self.actions)
    }
}

impl<E> Default for ActionChain<'_, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'f, E> FromIterator<ReversibleAction<'f, E>> for ActionChain<'f, E> {
    fn from_iter<I: IntoIterator<Item = ReversibleAction<'f, E>>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

impl<'f, E> Extend<ReversibleAction<'f, E>> for ActionChain<'f, E> {
    fn extend<I: IntoIterator<Item = ReversibleAction<'f, E>>>(&mut self, iter: I) {
        self.actions.extend(iter);
    }
}

impl<E> fmt::Debug for ActionChain<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionChain")
            .field("actions", &self.actions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::panic::{self, AssertUnwindSafe};

    use super::*;
    use crate::audit::ActionStatus;
    use crate::state::ActionState;

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("{0}")]
    struct TestError(String);

    fn tracked<'f>(
        log: &'f RefCell<Vec<String>>,
        name: &'static str,
    ) -> ReversibleAction<'f, TestError> {
        ReversibleAction::new(
            move || {
                log.borrow_mut().push(format!("execute {name}"));
                Ok(())
            },
            move || log.borrow_mut().push(format!("rollback {name}")),
        )
        .named(name)
    }

    fn failing<'f>(
        log: &'f RefCell<Vec<String>>,
        name: &'static str,
    ) -> ReversibleAction<'f, TestError> {
        ReversibleAction::new(
            move || {
                log.borrow_mut().push(format!("oops, {name} failed"));
                Err(TestError(format!("oops, {name} failed")))
            },
            move || log.borrow_mut().push(format!("rollback {name}")),
        )
        .named(name)
    }

    #[test]
    fn all_succeeding_actions_commit_without_rollback() -> anyhow::Result<()> {
        let log = RefCell::new(Vec::new());
        let mut a = tracked(&log, "a");
        let mut b = tracked(&log, "b");
        let mut c = tracked(&log, "c");

        execute_chain([&mut a, &mut b, &mut c])?;

        assert_eq!(*log.borrow(), ["execute a", "execute b", "execute c"]);
        for action in [&a, &b, &c] {
            assert_eq!(action.state(), ActionState::Committed);
        }
        Ok(())
    }

    #[test]
    fn failure_unwinds_previous_actions_in_lifo_order() {
        let log = RefCell::new(Vec::new());
        let mut a = tracked(&log, "a");
        let mut b = tracked(&log, "b");
        let mut c = failing(&log, "c");
        let mut d = tracked(&log, "d");

        let result = execute_chain([&mut a, &mut b, &mut c, &mut d]);

        assert_eq!(result, Err(TestError("oops, c failed".to_string())));
        assert_eq!(
            *log.borrow(),
            ["execute a", "execute b", "oops, c failed", "rollback b", "rollback a"]
        );
    }

    #[test]
    fn failing_action_is_left_armed() {
        let log = RefCell::new(Vec::new());
        let mut a = tracked(&log, "a");
        let mut b = failing(&log, "b");
        let mut c = tracked(&log, "c");

        let _ = execute_chain([&mut a, &mut b, &mut c]);

        assert_eq!(a.state(), ActionState::Committed);
        assert_eq!(b.state(), ActionState::Armed);
        assert_eq!(c.state(), ActionState::Unarmed);
    }

    #[test]
    fn first_action_failure_requires_no_rollback() {
        let log = RefCell::new(Vec::new());
        let mut a = failing(&log, "a");
        let mut b = tracked(&log, "b");

        let result = execute_chain([&mut a, &mut b]);

        assert_eq!(result, Err(TestError("oops, a failed".to_string())));
        assert_eq!(*log.borrow(), ["oops, a failed"]);
    }

    #[test]
    fn empty_chain_succeeds() {
        let result = execute_chain(Vec::<&mut ReversibleAction<'_, TestError>>::new());
        assert_eq!(result, Ok(()));

        let mut chain = ActionChain::<TestError>::new();
        assert!(chain.is_empty());
        assert_eq!(chain.execute(), Ok(()));
    }

    #[test]
    fn execute_with_audit_returns_audit_log() -> anyhow::Result<()> {
        let log = RefCell::new(Vec::new());
        let mut chain = ActionChain::new()
            .then(tracked(&log, "a"))
            .then(tracked(&log, "b"));

        let (result, audit_log) = chain.execute_with_audit();
        result?;

        let records = audit_log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "a");
        assert_eq!(records[1].name, "b");
        assert!(
            records
                .iter()
                .all(|record| record.status == ActionStatus::Committed)
        );
        assert!(audit_log.undo_order().is_empty());
        Ok(())
    }

    #[test]
    fn audit_log_tracks_rollback_status() {
        let log = RefCell::new(Vec::new());
        let mut chain = ActionChain::new()
            .then(tracked(&log, "a"))
            .then(tracked(&log, "b"))
            .then(failing(&log, "c"))
            .then(tracked(&log, "d"));

        let (result, audit_log) = chain.execute_with_audit();

        assert!(result.is_err());
        let records = audit_log.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].status, ActionStatus::Undone);
        assert_eq!(records[1].status, ActionStatus::Undone);
        assert_eq!(records[2].status, ActionStatus::Failed);
        assert_eq!(audit_log.undo_order(), [1, 0]);
    }

    #[test]
    fn rerunning_chain_rearms_every_action() {
        let log = RefCell::new(Vec::new());
        let mut chain = ActionChain::new()
            .then(tracked(&log, "a"))
            .then(failing(&log, "b"));

        for _ in 0..2 {
            assert!(chain.execute().is_err());
        }

        assert_eq!(
            *log.borrow(),
            [
                "execute a",
                "oops, b failed",
                "rollback a",
                "execute a",
                "oops, b failed",
                "rollback a"
            ]
        );
    }

    #[test]
    fn chain_collects_from_iterator_and_extends() {
        let log = RefCell::new(Vec::new());
        let mut chain: ActionChain<'_, TestError> =
            ["a", "b"].into_iter().map(|name| tracked(&log, name)).collect();
        chain.extend([tracked(&log, "c")]);
        chain.push(tracked(&log, "d"));

        assert_eq!(chain.len(), 4);
        let names: Vec<&str> = chain.actions().iter().map(ReversibleAction::name).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[test]
    fn into_actions_returns_actions_in_order() {
        let log = RefCell::new(Vec::new());
        let chain = ActionChain::new()
            .then(tracked(&log, "a"))
            .then(tracked(&log, "b"));

        let actions = chain.into_actions();

        assert_eq!(actions.len(), 2);
        assert_eq!(actions[1].name(), "b");
    }

    #[test]
    fn panicking_forward_still_unwinds_previous_actions() {
        let log = RefCell::new(Vec::new());
        let mut a = tracked(&log, "a");
        let mut b = tracked(&log, "b");
        let mut c = ReversibleAction::new(|| -> Result<(), TestError> { panic!("boom") }, || {})
            .named("c");
        let mut d = tracked(&log, "d");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            execute_chain([&mut a, &mut b, &mut c, &mut d])
        }));

        assert!(outcome.is_err());
        assert_eq!(
            *log.borrow(),
            ["execute a", "execute b", "rollback b", "rollback a"]
        );
        assert_eq!(a.state(), ActionState::Committed);
        assert_eq!(b.state(), ActionState::Committed);
        assert_eq!(d.state(), ActionState::Unarmed);
    }

    #[test]
    fn panicking_backward_still_undoes_remaining_actions() {
        let log = RefCell::new(Vec::new());
        let mut a = tracked(&log, "a");
        let mut b = ReversibleAction::new(
            || {
                log.borrow_mut().push("execute b".to_string());
                Ok(())
            },
            || panic!("compensation failed"),
        )
        .named("b");
        let mut c = failing(&log, "c");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            execute_chain([&mut a, &mut b, &mut c])
        }));

        assert!(outcome.is_err());
        assert_eq!(
            *log.borrow(),
            ["execute a", "execute b", "oops, c failed", "rollback a"]
        );
        assert_eq!(b.state(), ActionState::Committed);
    }
}
