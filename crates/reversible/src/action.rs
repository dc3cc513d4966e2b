use std::borrow::Cow;
use std::fmt;

use tracing::{debug, trace};

use crate::guard::UndoGuard;
use crate::operation::{FnOperation, Operation};
use crate::state::ActionState;

/// An action that can be executed, undone, and committed.
///
/// The compensation is armed by [`execute`](Self::execute) and runs at most
/// once per arming: the first [`undo`](Self::undo) runs it, later calls do
/// nothing. [`commit`](Self::commit) defuses it. Executing again re-arms the
/// action, so a single instance can be reused across many activations.
///
/// An action that was never executed is [`ActionState::Unarmed`] and undoing
/// it is a no-op.
///
/// Actions box arbitrary closures and are not `Send`. Build and run an action
/// on the thread that owns its effects.
pub struct ReversibleAction<'f, E> {
    name: Option<Cow<'static, str>>,
    operation: Box<dyn Operation<Error = E> + 'f>,
    state: ActionState,
}

impl<'f, E> ReversibleAction<'f, E> {
    /// Create an action from a forward closure and its compensating closure.
    #[must_use]
    pub fn new<F, B>(forward: F, backward: B) -> Self
    where
        F: FnMut() -> Result<(), E> + 'f,
        B: FnMut() + 'f,
    {
        Self::from_operation(FnOperation::new(forward, backward))
    }

    /// Create an action from an [`Operation`] implementation.
    ///
    /// The action reports the operation's name unless renamed with
    /// [`named`](Self::named).
    #[must_use]
    pub fn from_operation<O>(operation: O) -> Self
    where
        O: Operation<Error = E> + 'f,
    {
        Self {
            name: None,
            operation: Box::new(operation),
            state: ActionState::Unarmed,
        }
    }

    /// Set the name used in logs and audit records.
    #[must_use]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.operation.name())
    }

    #[must_use]
    pub fn state(&self) -> ActionState {
        self.state
    }

    /// Whether the next [`undo`](Self::undo) would run the compensation.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state.is_armed()
    }

    /// Arm the compensation, then run the forward operation.
    ///
    /// The action is armed before the forward operation runs, so it stays
    /// armed even if the forward operation fails.
    ///
    /// # Errors
    ///
    /// Returns the forward operation's error unchanged.
    pub fn execute(&mut self) -> Result<(), E> {
        self.state = ActionState::Armed;
        debug!(action = self.name(), "executing action");
        self.operation
            .forward()
            .inspect_err(|_| debug!(action = self.name(), "forward operation failed"))
    }

    /// Execute the action and hand back a guard that undoes it when dropped.
    ///
    /// Call [`UndoGuard::commit`] to keep the effect. No guard is created if
    /// the forward operation fails.
    ///
    /// # Errors
    ///
    /// Returns the forward operation's error unchanged.
    pub fn execute_guarded(&mut self) -> Result<UndoGuard<'_, 'f, E>, E> {
        self.execute()?;
        Ok(UndoGuard::new(self))
    }

    /// Run the compensation if the action is armed, disarming it first.
    pub fn undo(&mut self) {
        if !self.state.is_armed() {
            trace!(action = self.name(), state = ?self.state, "undo is a no-op");
            return;
        }

        self.state = ActionState::Committed;
        debug!(action = self.name(), "undoing action");
        self.operation.backward();
    }

    /// Keep the effect of the forward operation; later undos do nothing.
    pub fn commit(&mut self) {
        self.state = ActionState::Committed;
        debug!(action = self.name(), "committed action");
    }
}

impl<E> fmt::Debug for ReversibleAction<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReversibleAction")
            .field("name", &self.name())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Commit every action in `actions`, in order.
pub fn commit_all<'a, 'f, E>(actions: impl IntoIterator<Item = &'a mut ReversibleAction<'f, E>>)
where
    'f: 'a,
    E: 'a,
{
    for action in actions {
        action.commit();
    }
}
