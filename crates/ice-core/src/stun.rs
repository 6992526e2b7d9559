//! Minimal STUN framing (RFC 5389)
//!
//! Relay sockets only need to tell STUN control traffic apart from media and
//! to hand connectivity checks to the demultiplexer, so this covers the
//! header and raw attributes. Attribute semantics belong to the ICE agent.

use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;

use crate::constants::STUN_MAGIC_COOKIE;
use crate::error::{Error, Result};

/// STUN message header size (20 bytes)
pub const STUN_HEADER_SIZE: usize = 20;

/// STUN message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StunMessageType {
    /// Binding request
    BindingRequest,
    /// Binding response
    BindingResponse,
    /// Binding error response
    BindingErrorResponse,
    /// Binding indication (keep-alive)
    BindingIndication,
    /// Any other type, kept as its raw value
    Other(u16),
}

impl StunMessageType {
    /// Convert to u16 for encoding
    pub fn to_u16(self) -> u16 {
        match self {
            Self::BindingRequest => 0x0001,
            Self::BindingIndication => 0x0011,
            Self::BindingResponse => 0x0101,
            Self::BindingErrorResponse => 0x0111,
            Self::Other(value) => value,
        }
    }

    /// Convert from u16 to message type
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0001 => Self::BindingRequest,
            0x0011 => Self::BindingIndication,
            0x0101 => Self::BindingResponse,
            0x0111 => Self::BindingErrorResponse,
            other => Self::Other(other),
        }
    }

    /// Requests expect a response routed back through the same socket
    pub fn is_request(self) -> bool {
        matches!(self, Self::BindingRequest)
    }
}

/// STUN attribute, value kept undecoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StunAttribute {
    /// Attribute type
    pub attr_type: u16,
    /// Attribute value
    pub value: Bytes,
}

/// STUN message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StunMessage {
    /// Message type
    pub msg_type: StunMessageType,
    /// Transaction ID
    pub transaction_id: [u8; 12],
    /// Attributes
    pub attributes: Vec<StunAttribute>,
}

impl StunMessage {
    /// Create a new STUN message with a random transaction id
    pub fn new(msg_type: StunMessageType) -> Self {
        let mut transaction_id = [0u8; 12];
        rand::thread_rng().fill(&mut transaction_id);

        Self {
            msg_type,
            transaction_id,
            attributes: Vec::new(),
        }
    }

    /// Create a new binding request
    pub fn binding_request() -> Self {
        Self::new(StunMessageType::BindingRequest)
    }

    /// Add an attribute
    pub fn add_attribute(&mut self, attr_type: u16, value: impl Into<Bytes>) -> &mut Self {
        self.attributes.push(StunAttribute {
            attr_type,
            value: value.into(),
        });
        self
    }

    /// Encode message to bytes
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(STUN_HEADER_SIZE + 64);

        buf.put_u16(self.msg_type.to_u16());
        // Length placeholder, patched once attributes are written
        buf.put_u16(0);
        buf.put_u32(STUN_MAGIC_COOKIE);
        buf.put_slice(&self.transaction_id);

        for attr in &self.attributes {
            buf.put_u16(attr.attr_type);
            buf.put_u16(attr.value.len() as u16);
            buf.put_slice(&attr.value);
            let padding = (4 - (attr.value.len() % 4)) % 4;
            buf.put_bytes(0, padding);
        }

        let msg_len = buf.len() - STUN_HEADER_SIZE;
        BigEndian::write_u16(&mut buf[2..4], msg_len as u16);

        buf.freeze()
    }

    /// Decode message from bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if !is_stun_packet(bytes) {
            return Err(Error::StunError("Not a STUN message".to_string()));
        }

        let msg_type = StunMessageType::from_u16(BigEndian::read_u16(&bytes[0..2]));
        let msg_length = BigEndian::read_u16(&bytes[2..4]) as usize;

        let mut transaction_id = [0u8; 12];
        transaction_id.copy_from_slice(&bytes[8..20]);

        let mut attributes = Vec::new();
        let mut offset = STUN_HEADER_SIZE;
        let end = STUN_HEADER_SIZE + msg_length;

        while offset < end {
            if offset + 4 > end {
                return Err(Error::StunError("Incomplete STUN attribute".to_string()));
            }
            let attr_type = BigEndian::read_u16(&bytes[offset..offset + 2]);
            let attr_length = BigEndian::read_u16(&bytes[offset + 2..offset + 4]) as usize;
            offset += 4;

            if offset + attr_length > end {
                return Err(Error::StunError("Incomplete STUN attribute value".to_string()));
            }
            attributes.push(StunAttribute {
                attr_type,
                value: Bytes::copy_from_slice(&bytes[offset..offset + attr_length]),
            });
            offset += attr_length + (4 - (attr_length % 4)) % 4;
        }

        Ok(Self {
            msg_type,
            transaction_id,
            attributes,
        })
    }
}

/// Whether a datagram is a STUN message rather than RTP/RTCP media
///
/// Checks the two leading zero bits, the magic cookie, and that the declared
/// length accounts for the whole datagram.
pub fn is_stun_packet(data: &[u8]) -> bool {
    if data.len() < STUN_HEADER_SIZE || (data[0] & 0xC0) != 0 {
        return false;
    }
    let declared = BigEndian::read_u16(&data[2..4]) as usize;
    declared % 4 == 0
        && declared + STUN_HEADER_SIZE == data.len()
        && BigEndian::read_u32(&data[4..8]) == STUN_MAGIC_COOKIE
}
