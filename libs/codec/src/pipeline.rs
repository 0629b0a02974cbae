//! # Codec Pipeline
//!
//! ## Purpose
//!
//! Turns envelopes into datagrams and datagrams back into envelopes, tying
//! together the header codec, payload registry, message pool and compression.
//!
//! ## Body Layout
//!
//! ```text
//! ┌─────────────────────────────┬──────────────┬──────────────────────┐
//! │ sender version (3 x u16 BE) │ sent-at (u64)│ payload fields ...   │
//! └─────────────────────────────┴──────────────┴──────────────────────┘
//! ```
//!
//! The whole body is LZ4-compressed when requested and when that makes it
//! strictly smaller; the header's compressed bit records which form was sent.
//!
//! ## Receive Order
//!
//! 1. Resolve `(MessageType, SubType)`; unknown pairs fail before the pool is
//!    touched
//! 2. Acquire a pooled instance of the resolved shape
//! 3. Decompress if flagged (failure is `CorruptPayload`)
//! 4. Read the preamble, then the fields in declaration order
//!
//! Any failure after step 2 drops the guard, which resets the instance and
//! returns it to its shelf.

use crate::compression::CompressionEngine;
use crate::envelope::Envelope;
use crate::error::{CodecError, CodecResult};
use crate::header::MessageHeader;
use crate::pool::MessagePool;
use crate::registry::PayloadRegistry;
use orbitlink_types::protocol::PREAMBLE_SIZE;
use orbitlink_types::{
    PayloadFields, PayloadShape, ProtocolVersion, WireError, WireReader, WireWriter, HEADER_SIZE,
};
use std::sync::Arc;
use tracing::debug;

/// Shared serialize/deserialize path for one side of a connection
#[derive(Debug, Clone)]
pub struct CodecPipeline {
    registry: Arc<PayloadRegistry>,
    pool: Arc<MessagePool>,
    compression: CompressionEngine,
    local_version: ProtocolVersion,
}

impl CodecPipeline {
    /// Pipeline with a fresh pool sized to `registry`
    pub fn new(registry: Arc<PayloadRegistry>) -> Self {
        let pool = MessagePool::new(&registry);
        Self::with_pool(registry, pool)
    }

    pub fn with_pool(registry: Arc<PayloadRegistry>, pool: Arc<MessagePool>) -> Self {
        Self {
            registry,
            pool,
            compression: CompressionEngine::default(),
            local_version: ProtocolVersion::CURRENT,
        }
    }

    pub fn with_compression(mut self, compression: CompressionEngine) -> Self {
        self.compression = compression;
        self
    }

    /// Override the version stamped on and compared against messages
    pub fn with_local_version(mut self, version: ProtocolVersion) -> Self {
        self.local_version = version;
        self
    }

    pub fn registry(&self) -> &Arc<PayloadRegistry> {
        &self.registry
    }

    pub fn pool(&self) -> &Arc<MessagePool> {
        &self.pool
    }

    pub fn local_version(&self) -> ProtocolVersion {
        self.local_version
    }

    /// Pooled outbound envelope of shape `T`, filled by `fill`
    pub fn envelope<T: PayloadShape>(&self, fill: impl FnOnce(&mut T)) -> CodecResult<Envelope> {
        let mut payload = self.pool.acquire_shape::<T>()?;
        if let Some(shape) = payload.get_mut::<T>() {
            fill(shape);
        }
        Ok(Envelope::new(payload))
    }

    /// Header + body for `envelope`
    pub fn serialize(&self, envelope: &Envelope, compress: bool) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        self.serialize_into(envelope, compress, &mut out)?;
        Ok(out)
    }

    /// Append header + body for `envelope` to `out`
    ///
    /// On error `out` is left as it was.
    pub fn serialize_into(
        &self,
        envelope: &Envelope,
        compress: bool,
        out: &mut Vec<u8>,
    ) -> CodecResult<()> {
        let payload = envelope.payload();
        let shape = payload.shape_name();

        let mut body = Vec::with_capacity(PREAMBLE_SIZE + 64);
        let mut writer = WireWriter::new(&mut body);
        write_preamble(&mut writer, self.local_version, envelope.sent_at_ns())
            .and_then(|_| payload.write_fields(&mut writer))
            .map_err(|e| CodecError::serialization(shape, e))?;

        let compressed = if compress {
            self.compression.compress_if_smaller(&body)
        } else {
            None
        };
        let (body, is_compressed) = match compressed {
            Some(compressed) => (compressed, true),
            None => (body, false),
        };

        let header = MessageHeader::new(
            payload.message_type().into(),
            payload.sub_type(),
            body.len(),
            is_compressed,
        )?;

        out.reserve(HEADER_SIZE + body.len());
        header.encode_into(out);
        out.extend_from_slice(&body);
        Ok(())
    }

    /// Decode a body (header already stripped) into a pooled envelope
    pub fn deserialize(
        &self,
        message_type: u16,
        sub_type: u16,
        body: &[u8],
        compressed: bool,
    ) -> CodecResult<Envelope> {
        let descriptor = self.registry.resolve(message_type, sub_type)?;
        let shape = descriptor.name();
        let mut payload = self.pool.acquire(descriptor)?;

        let decompressed;
        let body = if compressed {
            decompressed = self.compression.decompress(shape, body)?;
            decompressed.as_slice()
        } else {
            body
        };

        let mut reader = WireReader::new(body);
        let (sender_version, sent_at_ns) =
            read_preamble(&mut reader).map_err(|e| CodecError::corrupt(shape, e.to_string()))?;
        payload
            .read_fields(&mut reader)
            .map_err(|e| CodecError::corrupt(shape, e.to_string()))?;

        let envelope = Envelope::received(payload, sender_version, self.local_version, sent_at_ns);
        if !reader.is_empty() {
            // Newer peers may append fields we do not know about
            if !envelope.version_mismatch() {
                return Err(CodecError::corrupt(
                    shape,
                    format!("{} trailing bytes", reader.remaining()),
                ));
            }
            debug!(
                shape,
                trailing = reader.remaining(),
                sender = %sender_version,
                "Ignoring trailing bytes from peer with different protocol version"
            );
        }
        Ok(envelope)
    }

    /// Decode a complete datagram: header, then body
    pub fn decode_datagram(&self, datagram: &[u8]) -> CodecResult<Envelope> {
        let (header, body) = MessageHeader::decode_frame(datagram)?;
        self.deserialize(
            header.message_type(),
            header.sub_type(),
            body,
            header.is_compressed(),
        )
    }
}

fn write_preamble(
    writer: &mut WireWriter<'_>,
    version: ProtocolVersion,
    sent_at_ns: u64,
) -> Result<(), WireError> {
    writer.put_u16(version.major)?;
    writer.put_u16(version.minor)?;
    writer.put_u16(version.build)?;
    writer.put_u64(sent_at_ns)
}

fn read_preamble(reader: &mut WireReader<'_>) -> Result<(ProtocolVersion, u64), WireError> {
    let version = ProtocolVersion::new(reader.get_u16()?, reader.get_u16()?, reader.get_u16()?);
    Ok((version, reader.get_u64()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::decode_header;
    use crate::registry::ShapeKey;
    use orbitlink_types::payload::chat::{ChatChannelMessage, ChatMessageType};
    use orbitlink_types::payload::session::PlayerConnectionChange;
    use orbitlink_types::payload::vessel::VesselProto;
    use orbitlink_types::{DeliveryCategory, MessageType};

    fn pipeline() -> CodecPipeline {
        CodecPipeline::new(Arc::new(PayloadRegistry::complete().unwrap()))
    }

    fn hello(pipeline: &CodecPipeline) -> Envelope {
        pipeline
            .envelope::<ChatChannelMessage>(|msg| {
                msg.from = "bill".into();
                msg.text = "hello".into();
            })
            .unwrap()
    }

    #[test]
    fn test_chat_hello_round_trip() {
        let pipeline = pipeline();
        let bytes = pipeline.serialize(&hello(&pipeline), false).unwrap();

        let (message_type, sub_type, length, compressed) = decode_header(&bytes).unwrap();
        assert_eq!(message_type, u16::from(MessageType::Chat));
        assert_eq!(sub_type, u16::from(ChatMessageType::ChannelMessage));
        assert_eq!(length, bytes.len() - HEADER_SIZE);
        assert!(!compressed);

        let decoded = pipeline.decode_datagram(&bytes).unwrap();
        let msg = decoded.get::<ChatChannelMessage>().unwrap();
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.text.len(), 5);
        assert_eq!(msg.from, "bill");
        assert_eq!(decoded.delivery_category(), DeliveryCategory::ReliableOrdered);
        assert!(!decoded.version_mismatch());
    }

    #[test]
    fn test_compression_kept_only_when_smaller() {
        let pipeline = pipeline();
        let small = hello(&pipeline);
        assert_eq!(
            pipeline.serialize(&small, true).unwrap(),
            pipeline.serialize(&small, false).unwrap()
        );

        let proto = pipeline
            .envelope::<VesselProto>(|msg| msg.vessel_data = vec![0x42; 8 * 1024])
            .unwrap();
        let plain = pipeline.serialize(&proto, false).unwrap();
        let packed = pipeline.serialize(&proto, true).unwrap();
        assert!(packed.len() < plain.len());
        assert!(decode_header(&packed).unwrap().3);

        let decoded = pipeline.decode_datagram(&packed).unwrap();
        assert_eq!(decoded.get::<VesselProto>().unwrap().vessel_data.len(), 8 * 1024);
    }

    #[test]
    fn test_unknown_sub_type_leaves_pool_untouched() {
        let pipeline = CodecPipeline::new(Arc::new(PayloadRegistry::server_to_client().unwrap()));
        let before = pipeline.pool().stats();

        let err = pipeline
            .deserialize(MessageType::Chat.into(), 999, &[0u8; 32], false)
            .unwrap_err();
        assert!(matches!(err, CodecError::UnknownSubType { sub_type: 999, .. }));
        assert_eq!(pipeline.pool().stats(), before);
    }

    #[test]
    fn test_corrupt_body_returns_instance_to_pool() {
        let pipeline = pipeline();
        let mut bytes = pipeline.serialize(&hello(&pipeline), false).unwrap();
        // Chop the text field short and fix up the header length
        bytes.truncate(bytes.len() - 2);
        let header = MessageHeader::new(
            MessageType::Chat.into(),
            ChatMessageType::ChannelMessage.into(),
            bytes.len() - HEADER_SIZE,
            false,
        )
        .unwrap();
        bytes[..HEADER_SIZE].copy_from_slice(&header.encode());

        let err = pipeline.decode_datagram(&bytes).unwrap_err();
        assert!(matches!(
            err,
            CodecError::CorruptPayload {
                shape: "ChatChannelMessage",
                ..
            }
        ));
        assert_eq!(
            pipeline.pool().available(ShapeKey::of::<ChatChannelMessage>()),
            1
        );
    }

    #[test]
    fn test_corrupt_compressed_body() {
        let pipeline = pipeline();
        let err = pipeline
            .deserialize(
                MessageType::Chat.into(),
                ChatMessageType::ChannelMessage.into(),
                &[0x20, 0, 0, 0, 0xFF, 0xFF],
                true,
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::CorruptPayload { .. }));
    }

    #[test]
    fn test_version_mismatch_is_flagged_not_rejected() {
        let sender = pipeline().with_local_version(ProtocolVersion::new(9, 9, 9));
        let receiver = pipeline();
        let env = sender
            .envelope::<PlayerConnectionChange>(|msg| {
                msg.player_name = "bob".into();
                msg.joined = true;
            })
            .unwrap();
        let bytes = sender.serialize(&env, false).unwrap();

        let decoded = receiver.decode_datagram(&bytes).unwrap();
        assert!(decoded.version_mismatch());
        assert_eq!(decoded.sender_version(), ProtocolVersion::new(9, 9, 9));
        assert_eq!(decoded.sent_at_ns(), env.sent_at_ns());
    }

    #[test]
    fn test_trailing_bytes_rejected_for_same_version() {
        let pipeline = pipeline();
        let mut bytes = pipeline.serialize(&hello(&pipeline), false).unwrap();
        bytes.push(0);
        let header = MessageHeader::new(
            MessageType::Chat.into(),
            ChatMessageType::ChannelMessage.into(),
            bytes.len() - HEADER_SIZE,
            false,
        )
        .unwrap();
        bytes[..HEADER_SIZE].copy_from_slice(&header.encode());
        assert!(matches!(
            pipeline.decode_datagram(&bytes),
            Err(CodecError::CorruptPayload { .. })
        ));
    }
}
