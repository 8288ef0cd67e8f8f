//! Newline-delimited JSON framing.
//!
//! One message per line. Blank lines are skipped. Both directions use the
//! same framing, so a backend on the far side of a byte stream can use these
//! helpers with the message types swapped.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{ChannelError, Result};

/// Longest frame [`read_frame`] accepts, newline excluded.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Reads one frame of at most [`MAX_FRAME_LEN`] bytes, returning `Ok(None)`
/// at EOF.
///
/// `buf` is scratch space reused across calls.
///
/// # Errors
///
/// - `ChannelError::Io` when reading fails.
/// - `ChannelError::Codec` when the line is not a valid message, including
///   lines that are not UTF-8.
/// - `ChannelError::FrameTooLong` when the line exceeds the limit.
///
/// After a `Codec` or `FrameTooLong` error the stream is positioned at the
/// next frame, so callers may keep reading.
pub async fn read_frame<T, R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<Option<T>>
where
	T: DeserializeOwned,
	R: AsyncBufRead + Unpin,
{
	read_frame_limited(reader, buf, MAX_FRAME_LEN).await
}

/// [`read_frame`] with an explicit length limit.
///
/// # Errors
///
/// Same as [`read_frame`].
pub async fn read_frame_limited<T, R>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> Result<Option<T>>
where
	T: DeserializeOwned,
	R: AsyncBufRead + Unpin,
{
	loop {
		buf.clear();
		let read = (&mut *reader).take(limit as u64 + 1).read_until(b'\n', buf).await?;
		if read == 0 {
			return Ok(None);
		}
		if buf.last() != Some(&b'\n') && buf.len() > limit {
			skip_line(reader).await?;
			buf.clear();
			return Err(ChannelError::FrameTooLong { limit });
		}
		let line = buf.trim_ascii();
		if line.is_empty() {
			continue;
		}
		return Ok(Some(serde_json::from_slice(line)?));
	}
}

/// Consumes input up to and including the next newline without buffering it.
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<()> {
	loop {
		let chunk = reader.fill_buf().await?;
		if chunk.is_empty() {
			return Ok(());
		}
		let (used, done) = match chunk.iter().position(|&b| b == b'\n') {
			Some(at) => (at + 1, true),
			None => (chunk.len(), false),
		};
		reader.consume(used);
		if done {
			return Ok(());
		}
	}
}

/// Writes one frame and flushes.
///
/// # Errors
///
/// - `ChannelError::Codec` when the message cannot be serialized.
/// - `ChannelError::Io` when writing fails.
pub async fn write_frame<T, W>(writer: &mut W, msg: &T) -> Result<()>
where
	T: Serialize,
	W: AsyncWrite + Unpin,
{
	let mut line = serde_json::to_vec(msg)?;
	line.push(b'\n');
	writer.write_all(&line).await?;
	writer.flush().await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use tokio::io::BufReader;
	use tokyo_proto::{RequestMessage, ResponseMessage};

	use super::*;

	#[tokio::test]
	async fn frames_are_newline_terminated() {
		let mut out = Vec::new();
		write_frame(&mut out, &RequestMessage::new("list").with_nonce(1u64)).await.unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "{\"kind\":\"list\",\"nonce\":1}\n");
	}

	#[tokio::test]
	async fn reader_skips_blank_lines_and_reports_eof() {
		let input = b"\n{\"kind\":\"list\",\"nonce\":1,\"payload\":[\"x\"]}\n\n".as_slice();
		let mut reader = BufReader::new(input);
		let mut buf = Vec::new();

		let first: ResponseMessage = read_frame(&mut reader, &mut buf).await.unwrap().unwrap();
		assert_eq!(first.payload, Some(serde_json::json!(["x"])));
		let end: Option<ResponseMessage> = read_frame(&mut reader, &mut buf).await.unwrap();
		assert!(end.is_none());
	}

	#[tokio::test]
	async fn malformed_frame_does_not_poison_the_stream() {
		let input = b"not json\n{\"kind\":\"list\"}\n".as_slice();
		let mut reader = BufReader::new(input);
		let mut buf = Vec::new();

		let bad: Result<Option<ResponseMessage>> = read_frame(&mut reader, &mut buf).await;
		assert!(matches!(bad, Err(ChannelError::Codec(_))));
		let good: ResponseMessage = read_frame(&mut reader, &mut buf).await.unwrap().unwrap();
		assert!(good.kind.is("list"));
	}

	#[tokio::test]
	async fn non_utf8_line_is_a_codec_error() {
		let input = b"\xff\xfe garbage\n{\"kind\":\"list\"}\n".as_slice();
		let mut reader = BufReader::new(input);
		let mut buf = Vec::new();

		let bad: Result<Option<ResponseMessage>> = read_frame(&mut reader, &mut buf).await;
		assert!(matches!(bad, Err(ChannelError::Codec(_))));
		let good: ResponseMessage = read_frame(&mut reader, &mut buf).await.unwrap().unwrap();
		assert!(good.kind.is("list"));
	}

	#[tokio::test]
	async fn oversized_line_is_skipped_without_buffering_it() {
		let mut input = vec![b'x'; 64];
		input.extend_from_slice(b"\n{\"kind\":\"list\"}\n");
		let mut reader = BufReader::with_capacity(8, input.as_slice());
		let mut buf = Vec::new();

		let bad: Result<Option<ResponseMessage>> = read_frame_limited(&mut reader, &mut buf, 16).await;
		assert!(matches!(bad, Err(ChannelError::FrameTooLong { limit: 16 })));
		assert!(buf.capacity() <= 64);
		let good: ResponseMessage = read_frame_limited(&mut reader, &mut buf, 16).await.unwrap().unwrap();
		assert!(good.kind.is("list"));
	}

	#[tokio::test]
	async fn frame_at_the_limit_is_accepted() {
		let frame = b"{\"kind\":\"list\"}";
		let mut input = frame.to_vec();
		input.push(b'\n');
		let mut reader = BufReader::new(input.as_slice());
		let mut buf = Vec::new();

		let msg: ResponseMessage = read_frame_limited(&mut reader, &mut buf, frame.len()).await.unwrap().unwrap();
		assert!(msg.kind.is("list"));
	}
}
