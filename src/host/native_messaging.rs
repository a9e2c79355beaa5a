//! Framing used by browsers to talk to native hosts: a 4 byte little-endian length followed by
//! that many bytes of UTF-8 JSON.

use std::io::ErrorKind;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::HostMessage;

/// Browsers refuse host messages above 1 MiB, so anything bigger is a broken stream.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Reads the next frame. `None` means the browser closed the pipe between frames.
pub async fn read_frame(reader: &mut (impl AsyncRead + Unpin)) -> Result<Option<Vec<u8>>> {
    let mut header = [0u8; 4];
    let first = loop {
        match reader.read(&mut header).await {
            Ok(n) => break n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    };
    if first == 0 {
        return Ok(None);
    }
    // A stream that ends inside the header is truncated, not closed.
    reader
        .read_exact(&mut header[first..])
        .await
        .context("Stream ended inside a frame header")?;
    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_MESSAGE_SIZE {
        bail!("Message too large: {len} bytes (max: {MAX_MESSAGE_SIZE} bytes)");
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).await?;
    Ok(Some(buffer))
}

pub async fn write_frame(
    writer: &mut (impl AsyncWrite + Unpin),
    message: &impl Serialize,
) -> Result<()> {
    let json = serde_json::to_vec(message)?;
    if json.len() > MAX_MESSAGE_SIZE {
        bail!("Refusing to send {} byte message", json.len());
    }
    writer.write_u32_le(json.len() as u32).await?;
    writer.write_all(&json).await?;
    writer.flush().await?;
    Ok(())
}

/// Turns the inbound byte stream into [HostMessage]s for the tracker. Undecodable frames are
/// skipped. EOF or an unusable stream cancels `shutdown`, which winds the host down.
pub struct MessageReader<R> {
    input: R,
    next: mpsc::Sender<HostMessage>,
    shutdown: CancellationToken,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(input: R, next: mpsc::Sender<HostMessage>, shutdown: CancellationToken) -> Self {
        Self {
            input,
            next,
            shutdown,
        }
    }

    /// Executes the reader loop.
    pub async fn run(mut self) -> Result<()> {
        let result = self.read_loop().await;
        // Dropping the sender lets the tracker drain what was already queued and stop.
        self.shutdown.cancel();
        result
    }

    async fn read_loop(&mut self) -> Result<()> {
        loop {
            let frame = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                frame = read_frame(&mut self.input) => frame,
            };

            let Some(frame) = frame.inspect_err(|e| error!("Failed to read frame {e:?}"))? else {
                info!("Browser closed the connection");
                return Ok(());
            };

            let message = match serde_json::from_slice::<HostMessage>(&frame) {
                Ok(message) => message,
                Err(e) => {
                    warn!(
                        "Skipping undecodable message {}: {e}",
                        String::from_utf8_lossy(&frame)
                    );
                    continue;
                }
            };

            let span = info_span!("Forwarding host message");
            debug!("Received {:?}", message);
            self.next
                .send(message)
                .instrument(span)
                .await
                .inspect_err(|e| error!("Tracker stopped accepting messages {e:?}"))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tokio::{io::AsyncWriteExt, sync::mpsc};
    use tokio_util::sync::CancellationToken;

    use crate::host::{HostEvent, OutgoingMessage};

    use super::*;

    async fn raw_frame(writer: &mut (impl AsyncWrite + Unpin), json: &str) -> Result<()> {
        writer.write_u32_le(json.len() as u32).await?;
        writer.write_all(json.as_bytes()).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_frame_roundtrip() -> Result<()> {
        let (mut client, mut server) = tokio::io::duplex(256);
        write_frame(
            &mut client,
            &OutgoingMessage::Configure {
                idle_detection_interval_secs: 60,
            },
        )
        .await?;
        drop(client);

        let frame = read_frame(&mut server).await?.expect("one frame was written");
        assert_eq!(
            frame,
            br#"{"type":"configure","idleDetectionIntervalSecs":60}"#.to_vec()
        );
        assert_eq!(read_frame(&mut server).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() -> Result<()> {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_u32_le(MAX_MESSAGE_SIZE as u32 + 1).await?;
        assert!(read_frame(&mut server).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_truncated_frame_is_an_error() -> Result<()> {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_u32_le(10).await?;
        client.write_all(b"{}").await?;
        drop(client);
        assert!(read_frame(&mut server).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_truncated_header_is_an_error() -> Result<()> {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[7, 0]).await?;
        drop(client);
        assert!(read_frame(&mut server).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_clean_eof_between_frames() -> Result<()> {
        let (mut client, mut server) = tokio::io::duplex(64);
        raw_frame(&mut client, "{}").await?;
        drop(client);
        assert_eq!(read_frame(&mut server).await?, Some(b"{}".to_vec()));
        assert_eq!(read_frame(&mut server).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_reader_skips_garbage_and_stops_on_eof() -> Result<()> {
        let (mut client, server) = tokio::io::duplex(1024);
        let (sender, mut receiver) = mpsc::channel(10);
        let shutdown = CancellationToken::new();
        let reader = MessageReader::new(server, sender, shutdown.clone());

        raw_frame(&mut client, r#"{"type":"startup"}"#).await?;
        raw_frame(&mut client, r#"not json at all"#).await?;
        raw_frame(&mut client, r#"{"type":"windowFocusChanged","focused":false}"#).await?;
        drop(client);

        reader.run().await?;

        assert_eq!(receiver.recv().await.map(|m| m.event), Some(HostEvent::Startup));
        assert_eq!(
            receiver.recv().await.map(|m| m.event),
            Some(HostEvent::WindowFocusChanged { focused: false })
        );
        assert_eq!(receiver.recv().await, None);
        assert!(shutdown.is_cancelled());
        Ok(())
    }
}
