//! Frame codec and call envelopes.
//!
//! Each frame is a 4-byte big-endian length followed by that many bytes of
//! UTF-8 JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::TransportError;

/// Largest frame either side will send or accept.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// One remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Call target, `"<Service>.<Method>"`
    pub method: String,
    /// Remaining caller deadline; the server bounds the handler by it
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// The single input struct
    pub params: serde_json::Value,
}

/// Outcome of one remote call.
///
/// Encoded as `{"ok": "..."}` or `{"err": "..."}`, so a reply can never carry
/// both a result and an error, nor neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcReply {
    /// The handler's status string
    Ok(String),
    /// The handler's error, as text
    Err(String),
}

/// A parsed `"<Service>.<Method>"` call target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodTarget<'a> {
    /// Registered service name
    pub service: &'a str,
    /// Method within the service
    pub method: &'a str,
}

impl<'a> MethodTarget<'a> {
    /// Splits a call target at its first dot.
    ///
    /// Returns `None` unless both halves are non-empty.
    pub fn parse(target: &'a str) -> Option<Self> {
        let (service, method) = target.split_once('.')?;
        if service.is_empty() || method.is_empty() {
            return None;
        }
        Some(Self { service, method })
    }
}

/// Writes `value` as one frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(value)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge {
            len: body.len(),
            max: MAX_FRAME_LEN,
        });
    }

    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame.
///
/// Returns `Ok(None)` if the peer closed the stream before a new frame began.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, TransportError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(serde_json::from_slice(&body)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_encodes_exactly_one_outcome() {
        assert_eq!(
            serde_json::to_string(&RpcReply::Ok("done".into())).unwrap(),
            r#"{"ok":"done"}"#
        );
        assert_eq!(
            serde_json::to_string(&RpcReply::Err("boom".into())).unwrap(),
            r#"{"err":"boom"}"#
        );
    }

    #[test]
    fn reply_with_both_outcomes_does_not_decode() {
        assert!(serde_json::from_str::<RpcReply>(r#"{"ok":"a","err":"b"}"#).is_err());
        assert!(serde_json::from_str::<RpcReply>(r#"{}"#).is_err());
    }

    #[test]
    fn method_target_parses_service_and_method() {
        let t = MethodTarget::parse("Reservation.create").unwrap();
        assert_eq!(t.service, "Reservation");
        assert_eq!(t.method, "create");
    }

    #[test]
    fn method_target_rejects_partial_names() {
        for bad in ["", "Reservation", ".create", "Reservation.", "."] {
            assert!(MethodTarget::parse(bad).is_none(), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn frame_survives_a_stream() {
        let (mut a, mut b) = tokio::io::duplex(4096);
        let request = RpcRequest {
            method: "Logging.write".to_string(),
            timeout_ms: Some(250),
            params: serde_json::json!({"name": "n", "data": "d"}),
        };

        write_frame(&mut a, &request).await.unwrap();
        let got: RpcRequest = read_frame(&mut b).await.unwrap().unwrap();
        assert_eq!(got, request);
    }

    #[tokio::test]
    async fn clean_close_reads_as_none() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        let got: Option<RpcReply> = read_frame(&mut b).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn oversized_frame_is_refused() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_u32((MAX_FRAME_LEN + 1) as u32).await.unwrap();

        let err = read_frame::<_, RpcReply>(&mut b).await.unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { .. }));
    }
}
