//! Pre-materialized body content attached to a message.

use std::io;

/// An already-materialized representation of a message body.
///
/// Orthogonal to the chunk stream: a message may expose a streamed
/// body, a data source, or both (e.g. a codec that parsed the stream
/// attaches the structured result here for later stages).
pub trait MessageDataSource: Send + Sync {
    /// MIME-style content type of the materialized data.
    fn content_type(&self) -> &str;

    /// The data rendered as text.
    fn as_text(&self) -> String;

    /// Serialize the data into a byte sink.
    fn serialize(&self, out: &mut dyn io::Write) -> io::Result<()>;
}
