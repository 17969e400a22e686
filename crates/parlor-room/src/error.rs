use thiserror::Error;
use uuid::Uuid;

/// Server-side error taxonomy. None of these are fatal to the
/// coordinator: persistence and reload failures are logged and skipped,
/// transport failures are isolated to the one dead connection.
///
/// User-visible rejections (rate limit, emoji-only, links) are not errors
/// in this sense — they live in [`crate::moderation::Rejection`].
#[derive(Debug, Error)]
pub enum RoomError {
    /// Durable write failed. The in-memory broadcast has already gone out
    /// by the time this is raised: availability over durability.
    #[error("persistence failure: {0:#}")]
    Persistence(anyhow::Error),

    /// Moderation config reload failed; the previous config stays active.
    #[error("moderation reload failed: {0:#}")]
    ConfigReload(anyhow::Error),

    /// A frame could not be handed to a connection's outbox. Delivery to
    /// the remaining connections is unaffected.
    #[error("connection {0} outbox closed")]
    Transport(Uuid),
}
