mod manager;
mod paths;
pub(crate) mod wav;

pub use {
    manager::{FinishedSession, SessionManager, SessionState},
    paths::SessionPaths,
};
