use std::ops::Deref;

use crate::action::ReversibleAction;

/// RAII guard that undoes an executed action on drop.
///
/// Created by [`ReversibleAction::execute_guarded`]. Dropping the guard runs
/// the action's compensation unless [`commit`](Self::commit) was called.
#[must_use = "dropping the guard immediately undoes the action"]
pub struct UndoGuard<'a, 'f, E> {
    action: &'a mut ReversibleAction<'f, E>,
}

impl<'a, 'f, E> UndoGuard<'a, 'f, E> {
    pub(crate) fn new(action: &'a mut ReversibleAction<'f, E>) -> Self {
        Self { action }
    }

    /// Keep the action's effect and release the guard.
    pub fn commit(self) {
        self.action.commit();
    }
}

impl<'f, E> Deref for UndoGuard<'_, 'f, E> {
    type Target = ReversibleAction<'f, E>;

    fn deref(&self) -> &Self::Target {
        self.action
    }
}

impl<E> Drop for UndoGuard<'_, '_, E> {
    fn drop(&mut self) {
        self.action.undo();
    }
}
