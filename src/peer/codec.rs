//! Streaming adapters for `tokio_util::codec`.
//!
//! A connection uses [`HandshakeCodec`] for the first exchange and then
//! switches to [`MessageCodec`] (for example with `Framed::map_codec`). The
//! message codec owns the connection's two extension tables.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

use super::error::PeerError;
use super::extension::{ExtendedCaps, ExtendedExtension, ExtendedHandshake, ExtendedMessage};
use super::handshake::{handshake_size, Handshake};
use super::message::Message;
use crate::constants::{
    CLIENT_VERSION, DEFAULT_REQUEST_QUEUE_LEN, DEFAULT_UT_METADATA_ID, LENGTH_PREFIX_LEN,
    MAX_FRAME_LEN,
};

/// Per-connection codec settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Frames whose length prefix exceeds this are rejected.
    pub max_frame_len: usize,
    /// The ids we advertise and expect the remote to send on.
    pub local_extensions: ExtendedCaps,
    pub client_version: Option<String>,
    pub request_queue_len: Option<u32>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_frame_len: MAX_FRAME_LEN,
            local_extensions: ExtendedCaps::new()
                .with(ExtendedExtension::Metadata, DEFAULT_UT_METADATA_ID),
            client_version: Some(CLIENT_VERSION.to_string()),
            request_queue_len: Some(DEFAULT_REQUEST_QUEUE_LEN),
        }
    }
}

impl CodecConfig {
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn with_local_extensions(mut self, extensions: ExtendedCaps) -> Self {
        self.local_extensions = extensions;
        self
    }

    pub fn with_client_version(mut self, version: Option<String>) -> Self {
        self.client_version = version;
        self
    }
}

/// Frames the variable-length handshake.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandshakeCodec;

impl Decoder for HandshakeCodec {
    type Item = Handshake;
    type Error = PeerError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Handshake>, PeerError> {
        let Some(&pstrlen) = buf.first() else {
            return Ok(None);
        };

        let needed = handshake_size(pstrlen as usize);
        if buf.len() < needed {
            buf.reserve(needed - buf.len());
            return Ok(None);
        }

        let data = buf.split_to(needed);
        Handshake::decode(&data).map(Some)
    }
}

impl Encoder<Handshake> for HandshakeCodec {
    type Error = PeerError;

    fn encode(&mut self, handshake: Handshake, buf: &mut BytesMut) -> Result<(), PeerError> {
        handshake.encode_into(buf);
        Ok(())
    }
}

/// Frames post-handshake messages for one connection.
///
/// Decoding an extended handshake from the remote records its `m` table,
/// which from then on supplies the sub-ids for outgoing extension messages.
/// Until then, encoding a named extension message fails with
/// [`PeerError::UnnegotiatedExtension`].
#[derive(Debug, Clone)]
pub struct MessageCodec {
    config: CodecConfig,
    remote: Option<ExtendedCaps>,
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

impl MessageCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            remote: None,
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn local_extensions(&self) -> &ExtendedCaps {
        &self.config.local_extensions
    }

    /// The remote's table, once its extended handshake has been decoded.
    pub fn remote_extensions(&self) -> Option<&ExtendedCaps> {
        self.remote.as_ref()
    }

    /// Records the remote's table directly, e.g. when the handshake was
    /// decoded elsewhere.
    pub fn set_remote_extensions(&mut self, extensions: ExtendedCaps) {
        self.remote = Some(extensions);
    }

    /// The extended handshake advertising this codec's configuration.
    pub fn local_handshake(&self) -> ExtendedHandshake {
        ExtendedHandshake {
            client_version: self.config.client_version.clone(),
            request_queue_len: self.config.request_queue_len,
            ..ExtendedHandshake::new(self.config.local_extensions.clone())
        }
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = PeerError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Message>, PeerError> {
        let Some(frame_len) = Message::frame_len(buf) else {
            return Ok(None);
        };

        let len = frame_len - LENGTH_PREFIX_LEN;
        if len > self.config.max_frame_len {
            warn!(len, max = self.config.max_frame_len, "rejecting oversized frame");
            return Err(PeerError::FrameTooLarge {
                len,
                max: self.config.max_frame_len,
            });
        }

        if buf.len() < frame_len {
            trace!(have = buf.len(), need = frame_len, "partial frame");
            buf.reserve(frame_len - buf.len());
            return Ok(None);
        }

        let mut frame = buf.split_to(frame_len).freeze();
        let message = Message::decode(&mut frame, &self.config.local_extensions)?;
        debug_assert!(!frame.has_remaining());

        if let Message::Extended(ExtendedMessage::Handshake(hs)) = &message {
            debug!(
                extensions = hs.extensions.len(),
                client = ?hs.client_version,
                "remote extended handshake"
            );
            self.remote = Some(hs.extensions.clone());
        }

        Ok(Some(message))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = PeerError;

    fn encode(&mut self, message: Message, buf: &mut BytesMut) -> Result<(), PeerError> {
        let none = ExtendedCaps::new();
        let remote = self.remote.as_ref().unwrap_or(&none);
        message.encode_into(remote, buf)
    }
}
