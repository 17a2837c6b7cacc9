//! Admin dashboard: callback actions, view rendering and update handlers.

mod actions;
mod handlers;
pub mod views;

pub use actions::{CallbackAction, PlanChoice};
pub use handlers::{schema, AppState, Command, EntryTarget, PendingInput};
