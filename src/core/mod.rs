pub mod command;
pub mod devices;
pub mod launcher;
pub mod plan;
pub mod port_range;
pub mod prompt;
pub mod report;
pub mod search;

pub use crate::domain::model::{Attempt, AttemptOutcome, ExitOutcome, SearchOutcome, SearchStatus};
pub use crate::domain::ports::{Confirm, Launcher, PortCheck};
pub use crate::utils::error::Result;
