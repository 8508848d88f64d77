//! Line framing: one token per `\n`-terminated line.
//!
//! Writers flush after every logical message so the peer can see it before we
//! block on a read. Both peers write-then-read, which is what keeps the
//! exchange deadlock-free.

use std::time::Duration;

use async_trait::async_trait;
use tokio::{
    io::{
        AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
    },
    time,
};
use tracing::debug;

use crate::{
    error::{ProtocolError, Result},
    model::game::UnitType,
};

pub const DELIMITER: &str = "\n";

/// Longest accepted line, terminator included. Names and labels come from an
/// untrusted peer.
pub const MAX_LINE_LENGTH: usize = 4096;

pub struct FrameReader<R> {
    inner: BufReader<R>,
    line: String,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        FrameReader {
            inner: BufReader::new(reader),
            line: String::new(),
        }
    }

    /// Next line without its terminator, or `None` once the peer has closed.
    pub async fn read_token(&mut self) -> Result<Option<String>> {
        self.line.clear();
        let limit = MAX_LINE_LENGTH as u64;
        let read = (&mut self.inner)
            .take(limit)
            .read_line(&mut self.line)
            .await?;
        if read == 0 {
            return Ok(None);
        }
        if read == MAX_LINE_LENGTH && !self.line.ends_with('\n') {
            return Err(ProtocolError::LineTooLong {
                limit: MAX_LINE_LENGTH,
            });
        }
        let token = self.line.trim_end_matches(['\n', '\r']).to_owned();
        debug!("<- {:?}", token);
        Ok(Some(token))
    }

    pub async fn expect_token(&mut self, expecting: &'static str) -> Result<String> {
        self.read_token()
            .await?
            .ok_or(ProtocolError::UnexpectedEndOfStream { expecting })
    }

    pub async fn read_unit(&mut self) -> Result<UnitType> {
        let token = self.expect_token("unit index").await?;
        UnitType::parse_token(&token)
    }

    pub async fn read_count(&mut self) -> Result<u32> {
        let token = self.expect_token("unit count").await?;
        token
            .parse::<u32>()
            .map_err(|_| ProtocolError::MalformedCount { token })
    }

    /// Waits up to `wait` for unread input. End-of-stream counts as readable,
    /// the following read reports it.
    pub async fn wait_readable(&mut self, wait: Duration) -> Result<bool> {
        match time::timeout(wait, self.inner.fill_buf()).await {
            Err(_elapsed) => Ok(false),
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(e.into()),
        }
    }
}

/// Result of looking for a peer commit that arrived before ours was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peek {
    Available(UnitType),
    TimedOut,
}

/// Bounded-wait read of the peer's next unit index.
#[async_trait]
pub trait PeerPeek: Send {
    async fn peek_commit(&mut self, wait: Duration) -> Result<Peek>;
}

#[async_trait]
impl<R> PeerPeek for FrameReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn peek_commit(&mut self, wait: Duration) -> Result<Peek> {
        if !self.wait_readable(wait).await? {
            return Ok(Peek::TimedOut);
        }
        Ok(Peek::Available(self.read_unit().await?))
    }
}

pub struct FrameWriter<W> {
    inner: BufWriter<W>,
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        FrameWriter {
            inner: BufWriter::new(writer),
        }
    }

    pub async fn write_token(&mut self, text: &str) -> Result<()> {
        self.write_tokens([text]).await
    }

    /// Writes every token, then flushes once.
    pub async fn write_tokens<I, S>(&mut self, tokens: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            let token = sanitize(token.as_ref());
            debug!("-> {:?}", token);
            self.inner.write_all(token.as_bytes()).await?;
            self.inner.write_all(DELIMITER.as_bytes()).await?;
        }
        self.inner.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

// A token must stay on one line or it would desync the peer's framing.
fn sanitize(token: &str) -> std::borrow::Cow<'_, str> {
    if token.contains(['\n', '\r']) {
        token.replace(['\n', '\r'], " ").into()
    } else {
        token.into()
    }
}
