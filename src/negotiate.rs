//! Name negotiation
//!
//! Runs once per connection before it is admitted. Never fails: a closed
//! stream or a blank answer both resolve to `DEFAULT_NAME`.

use tokio::io::AsyncRead;
use tracing::debug;

use crate::line_reader::LineReader;
use crate::message::{ServerMessage, DEFAULT_NAME};

/// Prompt for a display name and read it from `reader`
pub async fn negotiate_name<R: AsyncRead + Unpin>(reader: &mut LineReader<R>) -> String {
    let _ = reader.outbound().send(ServerMessage::Prompt).await;

    let Some(line) = reader.next_answer().await else {
        debug!("Stream ended during name negotiation");
        return DEFAULT_NAME.to_string();
    };

    let name = line.trim();
    if name.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        name.to_string()
    }
}
