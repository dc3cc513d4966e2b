/// A forward operation paired with the operation that compensates it.
///
/// Implement this for types that bundle both halves of a reversible effect.
/// For ad-hoc actions, [`ReversibleAction::new`](crate::ReversibleAction::new)
/// accepts two closures instead.
pub trait Operation {
    /// Error produced when the forward operation fails.
    type Error;

    /// Human-readable name for logging and audit records.
    fn name(&self) -> &str {
        "action"
    }

    /// Perform the primary effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the effect could not be applied.
    fn forward(&mut self) -> Result<(), Self::Error>;

    /// Compensate the effect of [`forward`](Operation::forward).
    ///
    /// Compensations have no error channel. A panic here is a contract
    /// violation and propagates to whoever triggered the undo.
    fn backward(&mut self);
}

/// Adapter turning a pair of closures into an [`Operation`].
pub struct FnOperation<F, B> {
    forward: F,
    backward: B,
}

impl<F, B> FnOperation<F, B> {
    #[must_use]
    pub fn new(forward: F, backward: B) -> Self {
        Self { forward, backward }
    }
}

impl<F, B, E> Operation for FnOperation<F, B>
where
    F: FnMut() -> Result<(), E>,
    B: FnMut(),
{
    type Error = E;

    fn forward(&mut self) -> Result<(), E> {
        (self.forward)()
    }

    fn backward(&mut self) {
        (self.backward)();
    }
}
