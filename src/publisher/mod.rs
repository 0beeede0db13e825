//! Publisher adapter
//!
//! The pipeline only sees the [`Publisher`] trait. [`BlueskyClient`] is the
//! production implementation; tests substitute recording fakes.

mod bluesky;
mod session;
mod traits;

pub use bluesky::BlueskyClient;
pub use session::{ResumeOutcome, SessionStore};
pub use traits::{PostData, PostEmbed, PostHandle, PublishError, Publisher};
