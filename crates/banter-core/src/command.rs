//! Moderator commands.

use uuid::Uuid;

/// A moderator request handled by an application command handler.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Stable name used in logs, e.g. `"scene.trigger_action"`.
    fn command_type(&self) -> &'static str;

    /// Ties together every log line produced while handling the command.
    fn correlation_id(&self) -> Uuid;
}
