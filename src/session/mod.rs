/// `Composition`, the session lease and export sessions.
pub mod export;
/// Session state machine and paced tick loop.
pub mod scheduler;
/// Recoverable export warnings.
pub mod warning;
