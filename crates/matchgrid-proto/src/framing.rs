//! Length-prefixed framing over any async byte stream.
//!
//! Each frame is a 4-byte big-endian length followed by a MessagePack
//! body. Frames are bounded so a corrupt or hostile peer cannot make the
//! scheduler allocate unbounded memory.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtoError;

/// Upper bound on a single frame. Engine binaries and team packages ship
/// inside dependency deltas, so this needs headroom beyond typical
/// message sizes.
pub const MAX_FRAME_LEN: u32 = 256 * 1024 * 1024;

/// Write one message as a length-prefixed MessagePack frame.
pub async fn write_frame<T, W>(writer: &mut W, msg: &T) -> Result<(), ProtoError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let body = rmp_serde::to_vec(msg).map_err(|e| ProtoError::Encode(e.to_string()))?;
    let len = u32::try_from(body.len()).map_err(|_| ProtoError::Oversized(u32::MAX))?;
    if len > MAX_FRAME_LEN {
        return Err(ProtoError::Oversized(len));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame and decode it.
///
/// Returns `Ok(None)` on a clean end-of-stream (EOF before the first
/// length byte). EOF in the middle of a frame is an I/O error.
pub async fn read_frame<T, R>(reader: &mut R) -> Result<Option<T>, ProtoError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(ProtoError::Oversized(len));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    let msg = rmp_serde::from_slice(&body).map_err(|e| ProtoError::Decode(e.to_string()))?;
    Ok(Some(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{FromWorker, ToWorker};

    #[tokio::test]
    async fn frame_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);

        let msg = FromWorker::Handshake { capacity: 4 };
        write_frame(&mut client, &msg).await.unwrap();

        let decoded: FromWorker = read_frame(&mut server).await.unwrap().unwrap();
        assert_eq!(decoded, msg);
    }

    #[tokio::test]
    async fn multiple_frames_in_order() {
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);

        write_frame(&mut client, &ToWorker::StopAll).await.unwrap();
        write_frame(&mut client, &FromWorker::Handshake { capacity: 2 })
            .await
            .unwrap();

        let first: ToWorker = read_frame(&mut server).await.unwrap().unwrap();
        assert_eq!(first, ToWorker::StopAll);
        let second: FromWorker = read_frame(&mut server).await.unwrap().unwrap();
        assert_eq!(second, FromWorker::Handshake { capacity: 2 });
    }

    #[tokio::test]
    async fn clean_eof_yields_none() {
        let (client, mut server) = tokio::io::duplex(1024);
        drop(client);

        let result: Option<ToWorker> = read_frame(&mut server).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let bogus = (MAX_FRAME_LEN + 1).to_be_bytes();
        tokio::io::AsyncWriteExt::write_all(&mut client, &bogus)
            .await
            .unwrap();

        let result: Result<Option<ToWorker>, _> = read_frame(&mut server).await;
        assert!(matches!(result, Err(ProtoError::Oversized(_))));
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let body = [0xc1u8; 8]; // 0xc1 is never valid MessagePack.
        tokio::io::AsyncWriteExt::write_all(&mut client, &(body.len() as u32).to_be_bytes())
            .await
            .unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut client, &body)
            .await
            .unwrap();

        let result: Result<Option<ToWorker>, _> = read_frame(&mut server).await;
        assert!(matches!(result, Err(ProtoError::Decode(_))));
    }
}
