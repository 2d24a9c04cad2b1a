pub mod analyzer;
pub mod focus;
pub mod llm;
pub mod monitor;
pub mod report;
pub mod setup;

pub use crate::domain::model::{Activity, Classification, FocusSession, Verdict, WindowInfo};
pub use crate::domain::ports::{ActivityStore, CommandRunner, RelevanceClassifier, WindowProbe};
pub use crate::utils::error::Result;
