/// Lifecycle state of a [`ReversibleAction`](crate::ReversibleAction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    /// The action has never been executed. Undo is a no-op.
    #[default]
    Unarmed,
    /// The action has been executed and the next undo runs its compensation.
    Armed,
    /// The action was undone or committed. Undo is a no-op until the next execute.
    Committed,
}

impl ActionState {
    /// Whether a call to undo would run the compensation.
    #[must_use]
    pub fn is_armed(self) -> bool {
        matches!(self, Self::Armed)
    }
}
