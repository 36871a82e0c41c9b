//! Perspective tree engine for a conversational agent.
//!
//! A perspective tree is a small graph of stances the conversation can move
//! through. Three model-backed triggers drive it:
//!
//! - [`agents::generate`] builds a new tree from the conversation.
//! - [`agents::movement`] decides whether to advance, stay, or start over.
//! - [`agents::state_update`] infers a short snapshot of the user's state.
//!
//! Model output is never trusted. The pure rules in [`core`] extract JSON
//! from free text, repair trees into a valid shape and reconcile
//! inconsistent decisions, so the triggers never return an error.
//! Side effects (model process, config, tree and session files) live in
//! [`io`]; [`turn`] wires everything together for one conversational turn.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod turn;
