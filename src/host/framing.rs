use std::io::{self, ErrorKind};

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Chrome refuses anything bigger coming from a native host, we hold incoming messages to the same
/// limit.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Reads one native messaging frame: a little-endian u32 length followed by that many bytes of
/// json. The browser closing the pipe between frames is `None`. An oversized frame is skipped and
/// reported as [ErrorKind::InvalidData], the reader is left at the start of the next frame.
pub async fn read_frame(reader: &mut (impl AsyncRead + Unpin)) -> io::Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_MESSAGE_SIZE {
        let mut body = (&mut *reader).take(len as u64);
        let skipped = tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;
        if skipped < len as u64 {
            return Err(ErrorKind::UnexpectedEof.into());
        }
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            format!("Message too large: {len} bytes (max: {MAX_MESSAGE_SIZE} bytes)"),
        ));
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).await?;
    Ok(Some(buffer))
}

pub async fn write_frame(writer: &mut (impl AsyncWrite + Unpin), payload: &[u8]) -> io::Result<()> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            format!(
                "Message too large: {} bytes (max: {MAX_MESSAGE_SIZE} bytes)",
                payload.len()
            ),
        ));
    }
    let len = payload.len() as u32;

    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn write_message(
    writer: &mut (impl AsyncWrite + Unpin),
    message: &impl Serialize,
) -> io::Result<()> {
    let json = serde_json::to_vec(message)?;
    write_frame(writer, &json).await
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use anyhow::Result;
    use serde_json::json;

    use super::{read_frame, write_frame, write_message, MAX_MESSAGE_SIZE};

    #[tokio::test]
    async fn test_frame_layout() -> Result<()> {
        let mut buffer = Vec::new();
        write_message(&mut buffer, &json!({"action": "getSnapshot"})).await?;

        assert_eq!(&buffer[..4], &24u32.to_le_bytes());
        assert_eq!(&buffer[4..], br#"{"action":"getSnapshot"}"#.as_slice());

        let mut reader = buffer.as_slice();
        let frame = read_frame(&mut reader).await?.unwrap();
        assert_eq!(frame, &buffer[4..]);
        assert_eq!(read_frame(&mut reader).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_frames_are_rejected() -> Result<()> {
        let mut input = ((MAX_MESSAGE_SIZE + 1) as u32).to_le_bytes().to_vec();
        input.extend_from_slice(&vec![b' '; MAX_MESSAGE_SIZE + 1]);
        write_message(&mut input, &json!({"action": "getSnapshot"})).await?;

        let mut reader = input.as_slice();
        let err = read_frame(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        // The next frame is still readable.
        let frame = read_frame(&mut reader).await?.unwrap();
        assert_eq!(frame, br#"{"action":"getSnapshot"}"#.as_slice());

        let mut cut = ((MAX_MESSAGE_SIZE + 1) as u32).to_le_bytes().to_vec();
        cut.extend_from_slice(b"{}");
        let err = read_frame(&mut cut.as_slice()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);

        let mut sink = Vec::new();
        let err = write_frame(&mut sink, &vec![b' '; MAX_MESSAGE_SIZE + 1])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(sink.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_truncated_body_is_an_error() {
        let mut frame = 10u32.to_le_bytes().to_vec();
        frame.extend_from_slice(b"{}");
        let err = read_frame(&mut frame.as_slice()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
