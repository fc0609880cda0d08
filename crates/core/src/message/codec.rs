//! Framing of [Message]s on a byte stream.
//!
//! A frame is `tag(1) | length(8 hex digits) | body(length)`. Integers inside
//! bodies are big-endian. Decoding is two-phase: the header is parsed as soon as
//! nine bytes are buffered, the body once `length` more bytes arrived.

use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tokio_util::codec::Encoder;

use super::types::*;
use crate::consts::DEFAULT_MAX_HOPS;
use crate::consts::DEFAULT_MAX_MESSAGE_LEN;
use crate::consts::HEADER_LEN;
use crate::dht::NodeInfo;
use crate::dht::RingId;
use crate::error::Error;
use crate::error::Result;

const YES: u8 = b'Y';
const NO: u8 = b'N';

impl Header {
    /// Parse the nine header bytes. The length accepts either hex case.
    pub fn decode(buf: &[u8]) -> Result<Header> {
        if buf.len() < HEADER_LEN {
            return Err(Error::MalformedHeader(format!(
                "need {} bytes, got {}",
                HEADER_LEN,
                buf.len()
            )));
        }
        let message_type = MessageType::try_from(buf[0])?;
        let digits = std::str::from_utf8(&buf[1..HEADER_LEN])
            .map_err(|_| Error::MalformedHeader("length is not ascii".to_string()))?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::MalformedHeader(format!("bad length {digits:?}")));
        }
        let length = u32::from_str_radix(digits, 16)
            .map_err(|e| Error::MalformedHeader(format!("bad length {digits:?}: {e}")))?;
        Ok(Header {
            message_type,
            length,
        })
    }

    /// Write the header, length in upper case hex.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_LEN);
        dst.put_u8(self.message_type.tag());
        dst.put_slice(format!("{:08X}", self.length).as_bytes());
    }
}

fn expect_len(ty: MessageType, body: &[u8], allowed: &[usize]) -> Result<()> {
    if allowed.contains(&body.len()) {
        Ok(())
    } else {
        Err(Error::MalformedBody(format!(
            "{:?} body of {} bytes, expected one of {:?}",
            ty,
            body.len(),
            allowed
        )))
    }
}

fn decode_flag(ty: MessageType, body: &[u8]) -> Result<bool> {
    expect_len(ty, body, &[1])?;
    match body[0] {
        YES => Ok(true),
        NO => Ok(false),
        other => Err(Error::MalformedBody(format!(
            "{:?} status byte {:#04x}",
            ty, other
        ))),
    }
}

fn decode_optional_node(ty: MessageType, body: &[u8]) -> Result<Option<NodeInfo>> {
    match body.first() {
        Some(&YES) => {
            expect_len(ty, body, &[1 + NodeInfo::WIRE_LEN])?;
            Ok(Some(NodeInfo::from_bytes(&body[1..])?))
        }
        Some(&NO) => {
            expect_len(ty, body, &[1])?;
            Ok(None)
        }
        _ => Err(Error::MalformedBody(format!("{:?} missing status byte", ty))),
    }
}

fn decode_id(body: &[u8]) -> RingId {
    RingId::from_be_bytes([body[0], body[1], body[2], body[3]])
}

fn encode_flag(flag: bool) -> Vec<u8> {
    vec![if flag { YES } else { NO }]
}

fn encode_optional_node(node: &Option<NodeInfo>) -> Vec<u8> {
    match node {
        Some(n) => {
            let mut v = Vec::with_capacity(1 + NodeInfo::WIRE_LEN);
            v.push(YES);
            v.extend_from_slice(&n.to_bytes());
            v
        }
        None => vec![NO],
    }
}

impl Message {
    /// Interpret a complete body according to its header.
    pub fn decode_body(header: &Header, body: Bytes) -> Result<Message> {
        let ty = header.message_type;
        if body.len() != header.length as usize {
            return Err(Error::MalformedBody(format!(
                "declared {} bytes, got {}",
                header.length,
                body.len()
            )));
        }
        Ok(match ty {
            MessageType::FindSuccessorSend => {
                expect_len(ty, &body, &[4, 5])?;
                Message::FindSuccessorSend(FindSuccessorSend {
                    id: decode_id(&body),
                    ttl: body.get(4).copied().unwrap_or(DEFAULT_MAX_HOPS),
                })
            }
            MessageType::FindSuccessorReport => {
                Message::FindSuccessorReport(FindSuccessorReport {
                    node: decode_optional_node(ty, &body)?,
                })
            }
            MessageType::QueryPredecessorSend => {
                expect_len(ty, &body, &[4])?;
                Message::QueryPredecessorSend(QueryPredecessorSend {
                    id: decode_id(&body),
                })
            }
            MessageType::QueryPredecessorReport => {
                Message::QueryPredecessorReport(QueryPredecessorReport {
                    node: decode_optional_node(ty, &body)?,
                })
            }
            MessageType::AliveCheckSend => {
                if !(body.is_empty() || body.as_ref() == [YES]) {
                    return Err(Error::MalformedBody("alive check body".to_string()));
                }
                Message::AliveCheckSend(AliveCheckSend)
            }
            MessageType::AliveCheckReport => Message::AliveCheckReport(AliveCheckReport {
                alive: decode_flag(ty, &body)?,
            }),
            MessageType::NotifyPredecessorSend => {
                expect_len(ty, &body, &[6])?;
                Message::NotifyPredecessorSend(NotifyPredecessorSend {
                    id: decode_id(&body),
                    port: u16::from_be_bytes([body[4], body[5]]),
                })
            }
            MessageType::NotifyPredecessorReport => {
                Message::NotifyPredecessorReport(NotifyPredecessorReport {
                    accepted: decode_flag(ty, &body)?,
                })
            }
            MessageType::CustomMessage => Message::CustomMessage(CustomMessage(body)),
            MessageType::Unknown => Message::Unknown(body),
        })
    }

    /// Body bytes of this message.
    pub fn encode_body(&self) -> Bytes {
        match self {
            Message::FindSuccessorSend(m) => {
                let mut v = m.id.to_be_bytes().to_vec();
                v.push(m.ttl);
                v.into()
            }
            Message::FindSuccessorReport(m) => encode_optional_node(&m.node).into(),
            Message::QueryPredecessorSend(m) => m.id.to_be_bytes().to_vec().into(),
            Message::QueryPredecessorReport(m) => encode_optional_node(&m.node).into(),
            Message::AliveCheckSend(_) => encode_flag(true).into(),
            Message::AliveCheckReport(m) => encode_flag(m.alive).into(),
            Message::NotifyPredecessorSend(m) => {
                let mut v = m.id.to_be_bytes().to_vec();
                v.extend_from_slice(&m.port.to_be_bytes());
                v.into()
            }
            Message::NotifyPredecessorReport(m) => encode_flag(m.accepted).into(),
            Message::CustomMessage(m) => m.0.clone(),
            Message::Unknown(data) => data.clone(),
        }
    }
}

/// [Decoder]/[Encoder] pair for [Message] frames.
///
/// `Ok(None)` from `decode` means more bytes are needed. Any error means the
/// stream is malformed and should be closed.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    max_len: u32,
    header: Option<Header>,
}

impl MessageCodec {
    /// Codec rejecting bodies above `max_len`.
    pub fn new(max_len: u32) -> Self {
        Self {
            max_len,
            header: None,
        }
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_LEN)
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        let header = match self.header {
            Some(h) => h,
            None => {
                if src.len() < HEADER_LEN {
                    return Ok(None);
                }
                let h = Header::decode(&src[..HEADER_LEN])?;
                if h.length > self.max_len {
                    return Err(Error::MessageTooLarge(h.length, self.max_len));
                }
                src.advance(HEADER_LEN);
                self.header = Some(h);
                h
            }
        };

        let len = header.length as usize;
        if src.len() < len {
            // low-watermark for the body
            src.reserve(len - src.len());
            return Ok(None);
        }

        self.header = None;
        let body = src.split_to(len).freeze();
        Message::decode_body(&header, body).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        match self.decode(src)? {
            Some(msg) => Ok(Some(msg)),
            None if src.is_empty() && self.header.is_none() => Ok(None),
            None => Err(Error::MalformedBody(format!(
                "stream ended inside a frame, {} bytes buffered",
                src.len()
            ))),
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        let body = item.encode_body();
        let length = u32::try_from(body.len()).unwrap_or(u32::MAX);
        if length > self.max_len {
            return Err(Error::MessageTooLarge(length, self.max_len));
        }
        Header {
            message_type: item.message_type(),
            length,
        }
        .encode(dst);
        dst.extend_from_slice(&body);
        Ok(())
    }
}
