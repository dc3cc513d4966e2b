//! Reversible actions with automatic rollback.
//!
//! A [`ReversibleAction`] pairs a forward operation with the operation that
//! compensates it. It can be executed, undone, or committed, and reused across
//! many activations. [`execute_chain`] and [`ActionChain`] run several actions
//! in order: if one fails, every action that already succeeded is undone in
//! reverse order and the failure is returned unchanged; if all succeed, they
//! are committed.
//!
//! ```
//! use std::cell::RefCell;
//!
//! use reversible::{ReversibleAction, execute_chain};
//!
//! let log = RefCell::new(Vec::new());
//! let mut create = ReversibleAction::new(
//!     || {
//!         log.borrow_mut().push("create");
//!         Ok(())
//!     },
//!     || log.borrow_mut().push("delete"),
//! );
//! let mut attach = ReversibleAction::new(|| Err("quota exceeded"), || {});
//!
//! let result = execute_chain([&mut create, &mut attach]);
//!
//! assert_eq!(result, Err("quota exceeded"));
//! assert_eq!(*log.borrow(), ["create", "delete"]);
//! ```
//!
//! Actions are not `Send`: a chain is built and executed on one thread, and
//! each worker thread builds its own chain. Handing a chain to another thread
//! does not compile:
//!
//! ```compile_fail
//! use reversible::{ActionChain, ReversibleAction};
//!
//! let chain: ActionChain<'static, ()> =
//!     ActionChain::new().then(ReversibleAction::new(|| Ok(()), || {}));
//!
//! std::thread::spawn(move || {
//!     let mut chain = chain;
//!     let _ = chain.execute();
//! });
//! ```

mod action;
mod audit;
mod chain;
mod guard;
mod operation;
mod state;

pub use action::{ReversibleAction, commit_all};
pub use audit::{ActionRecord, ActionStatus, ChainAuditLog};
pub use chain::{ActionChain, execute_chain, execute_chain_with_audit};
pub use guard::UndoGuard;
pub use operation::{FnOperation, Operation};
pub use state::ActionState;
