//! Wire framing and the one-shot request client.
//!
//! A frame is a `u32` big-endian length prefix followed by a `bincode` body.
//! [`call`] implements the connection-per-request exchange: connect, write one
//! frame, read one frame, close.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::types::{Request, Response};

/// Upper bound on a frame body. Requests and responses are tiny; anything
/// larger is a corrupt length prefix or a stray client.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = bincode::serialize(message).context("failed to encode frame")?;
    if body.len() > MAX_FRAME_LEN {
        bail!("refusing to send {} byte frame", body.len());
    }

    writer.write_all(&(body.len() as u32).to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;

    Ok(())
}

pub async fn read_frame<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        bail!("frame length {} exceeds limit of {}", len, MAX_FRAME_LEN);
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;

    bincode::deserialize(&body).context("failed to decode frame")
}

/// Sends one request to `addr` and waits for the single reply.
///
/// The whole exchange is bounded by `timeout`; an expired timer is reported
/// the same way as any other connection failure.
pub async fn call(addr: SocketAddr, request: &Request, timeout: Duration) -> Result<Response> {
    match tokio::time::timeout(timeout, exchange(addr, request)).await {
        Ok(result) => result,
        Err(_) => bail!("no reply from {} within {:?}", addr, timeout),
    }
}

async fn exchange(addr: SocketAddr, request: &Request) -> Result<Response> {
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    write_frame(&mut stream, request).await?;
    read_frame(&mut stream).await
}
