//! Line reader with local echo and line editing
//!
//! Raw sockets do no terminal processing, so the server does it: printable
//! bytes are echoed, backspace/delete erase the last character, and CR or
//! LF complete a line. Empty lines are dropped, which also coalesces CRLF.

use std::mem;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::message::{ServerMessage, ERASE_SEQUENCE};

/// Read chunk size in bytes
const READ_CHUNK_SIZE: usize = 1024;

const BACKSPACE: u8 = 8;
const DELETE: u8 = 127;

/// Reassembles logical lines from one connection's byte stream
///
/// One instance per connection. Echo goes to the connection's outbound
/// queue, so it stays ordered with everything else written to it.
pub struct LineReader<R> {
    source: R,
    echo: mpsc::Sender<ServerMessage>,
    line: String,
    pending: Vec<u8>,
    pos: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(source: R, echo: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            source,
            echo,
            line: String::new(),
            pending: Vec::with_capacity(READ_CHUNK_SIZE),
            pos: 0,
        }
    }

    /// Outbound queue of the connection this reader echoes to
    pub fn outbound(&self) -> &mpsc::Sender<ServerMessage> {
        &self.echo
    }

    /// Wait for the next completed, non-empty line
    ///
    /// Returns `None` once the stream is closed or fails; a partial line
    /// at that point is discarded.
    pub async fn next_line(&mut self) -> Option<String> {
        self.read_line(false).await
    }

    /// Like `next_line`, but a bare terminator yields an empty answer
    ///
    /// Used for one-shot prompts where pressing Enter alone is a reply.
    pub async fn next_answer(&mut self) -> Option<String> {
        self.read_line(true).await
    }

    async fn read_line(&mut self, keep_empty: bool) -> Option<String> {
        let mut echo = String::new();

        loop {
            while self.pos < self.pending.len() {
                let byte = self.pending[self.pos];
                self.pos += 1;

                match byte {
                    b'\r' | b'\n' => {
                        if keep_empty || !self.line.is_empty() {
                            self.flush_echo(&mut echo).await;
                            return Some(mem::take(&mut self.line));
                        }
                    }
                    BACKSPACE | DELETE => {
                        if self.line.pop().is_some() {
                            echo.push_str(ERASE_SEQUENCE);
                        }
                    }
                    32..=126 => {
                        self.line.push(byte as char);
                        echo.push(byte as char);
                    }
                    _ => {}
                }
            }

            self.flush_echo(&mut echo).await;

            if !self.fill().await {
                return None;
            }
        }
    }

    /// Read the next chunk; false on end of stream or error
    async fn fill(&mut self) -> bool {
        self.pos = 0;
        self.pending.resize(READ_CHUNK_SIZE, 0);

        match self.source.read(&mut self.pending).await {
            Ok(0) => {
                self.pending.clear();
                false
            }
            Ok(n) => {
                self.pending.truncate(n);
                true
            }
            Err(e) => {
                debug!("Read failed, treating as disconnect: {}", e);
                self.pending.clear();
                false
            }
        }
    }

    async fn flush_echo(&self, echo: &mut String) {
        if echo.is_empty() {
            return;
        }
        // A closed queue means the writer is gone; the next read will notice
        let _ = self.echo.send(ServerMessage::Echo(mem::take(echo))).await;
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncWriteExt, ReadBuf};

    use super::*;

    /// Source whose every read fails
    struct ResetSource;

    impl AsyncRead for ResetSource {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    fn reader(input: &'static [u8]) -> (LineReader<&'static [u8]>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(16);
        (LineReader::new(input, tx), rx)
    }

    fn drain_echo(rx: &mut mpsc::Receiver<ServerMessage>) -> String {
        let mut out = String::new();
        while let Ok(msg) = rx.try_recv() {
            out.push_str(&msg.to_string());
        }
        out
    }

    #[tokio::test]
    async fn test_backspace_editing() {
        let (mut lines, mut rx) = reader(b"abc\x08\x08z\r\n");

        assert_eq!(lines.next_line().await.as_deref(), Some("az"));
        assert_eq!(lines.next_line().await, None);
        assert_eq!(drain_echo(&mut rx), "abc\x08 \x08\x08 \x08z");
    }

    #[tokio::test]
    async fn test_empty_stream_disconnects() {
        let (mut lines, mut rx) = reader(b"");

        assert_eq!(lines.next_line().await, None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_read_error_disconnects() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut lines = LineReader::new(ResetSource, tx);

        assert_eq!(lines.next_line().await, None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_read_error_after_data_drops_partial_line() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut lines = LineReader::new((&b"ok\nhalf"[..]).chain(ResetSource), tx);

        assert_eq!(lines.next_line().await.as_deref(), Some("ok"));
        assert_eq!(lines.next_line().await, None);
        assert_eq!(drain_echo(&mut rx), "okhalf");
    }

    #[tokio::test]
    async fn test_crlf_and_blank_lines_coalesce() {
        let (mut lines, _rx) = reader(b"one\r\n\r\n\ntwo\n");

        assert_eq!(lines.next_line().await.as_deref(), Some("one"));
        assert_eq!(lines.next_line().await.as_deref(), Some("two"));
        assert_eq!(lines.next_line().await, None);
    }

    #[tokio::test]
    async fn test_answer_may_be_empty() {
        let (mut lines, _rx) = reader(b"\r\nhi\n");

        assert_eq!(lines.next_answer().await.as_deref(), Some(""));
        // The LF left over from CRLF is swallowed by the normal reader
        assert_eq!(lines.next_line().await.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_delete_on_empty_buffer_is_noop() {
        let (mut lines, mut rx) = reader(b"\x7f\x08\r\n");

        assert_eq!(lines.next_line().await, None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delete_key_erases() {
        let (mut lines, _rx) = reader(b"hix\x7f\n");

        assert_eq!(lines.next_line().await.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_control_and_high_bytes_ignored() {
        let (mut lines, mut rx) = reader(b"a\x01\x1b\xffb\t\n");

        assert_eq!(lines.next_line().await.as_deref(), Some("ab"));
        assert_eq!(drain_echo(&mut rx), "ab");
    }

    #[tokio::test]
    async fn test_partial_line_dropped_at_eof() {
        let (mut lines, _rx) = reader(b"done\nhalf");

        assert_eq!(lines.next_line().await.as_deref(), Some("done"));
        assert_eq!(lines.next_line().await, None);
    }

    #[tokio::test]
    async fn test_line_split_across_reads() {
        let (client, server) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::channel(16);
        let mut lines = LineReader::new(server, tx);

        let writer = tokio::spawn(async move {
            let mut client = client;
            client.write_all(b"hel").await.unwrap();
            client.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            client.write_all(b"lo\r\n").await.unwrap();
            client
        });

        assert_eq!(lines.next_line().await.as_deref(), Some("hello"));
        assert_eq!(drain_echo(&mut rx), "hello");
        drop(writer.await.unwrap());
        assert_eq!(lines.next_line().await, None);
    }
}
