use std::io::Write;
use std::sync::Arc;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SerializationError;
use crate::scheme::{GroupVersion, Object, Scheme};

pub const MEDIA_TYPE_JSON: &str = "application/json";
pub const MEDIA_TYPE_MSGPACK: &str = "application/msgpack";

type Result<T, E = SerializationError> = std::result::Result<T, E>;

pub trait WireFormat {
    fn media_type(&self) -> &'static str;

    /// Whether `data` looks like a document written by this format.
    fn recognizes(&self, data: &[u8]) -> bool;

    fn encode_to<T: Serialize, W: Write>(&self, value: &T, writer: &mut W) -> Result<()>;

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_to(value, &mut buf)?;
        Ok(buf)
    }
}

// MessagePack codec (compact binary format)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsgPackCodec;

impl WireFormat for MsgPackCodec {
    fn media_type(&self) -> &'static str {
        MEDIA_TYPE_MSGPACK
    }

    fn recognizes(&self, data: &[u8]) -> bool {
        matches!(data.first(), Some(0x80..=0x8f | 0xde | 0xdf))
    }

    fn encode_to<T: Serialize, W: Write>(&self, value: &T, writer: &mut W) -> Result<()> {
        rmp_serde::encode::write_named(writer, value)?;
        Ok(())
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        let value = rmp_serde::from_slice(data)?;
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl WireFormat for JsonCodec {
    fn media_type(&self) -> &'static str {
        MEDIA_TYPE_JSON
    }

    fn recognizes(&self, data: &[u8]) -> bool {
        data.iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'{')
    }

    fn encode_to<T: Serialize, W: Write>(&self, value: &T, writer: &mut W) -> Result<()> {
        serde_json::to_writer(writer, value)?;
        Ok(())
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// The wire formats a [`CodecFactory`] can hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serializer {
    Json(JsonCodec),
    MsgPack(MsgPackCodec),
}

impl WireFormat for Serializer {
    fn media_type(&self) -> &'static str {
        match self {
            Serializer::Json(c) => c.media_type(),
            Serializer::MsgPack(c) => c.media_type(),
        }
    }

    fn recognizes(&self, data: &[u8]) -> bool {
        match self {
            Serializer::Json(c) => c.recognizes(data),
            Serializer::MsgPack(c) => c.recognizes(data),
        }
    }

    fn encode_to<T: Serialize, W: Write>(&self, value: &T, writer: &mut W) -> Result<()> {
        match self {
            Serializer::Json(c) => c.encode_to(value, writer),
            Serializer::MsgPack(c) => c.encode_to(value, writer),
        }
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        match self {
            Serializer::Json(c) => c.decode(data),
            Serializer::MsgPack(c) => c.decode(data),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerInfo {
    pub media_type: &'static str,
    pub serializer: Serializer,
}

impl SerializerInfo {
    pub fn new(serializer: Serializer) -> Self {
        Self {
            media_type: serializer.media_type(),
            serializer,
        }
    }
}

// Self-describing layout every encoded object is wrapped in.
#[derive(Serialize)]
struct Envelope<'a, T> {
    #[serde(rename = "apiVersion")]
    api_version: String,
    kind: &'static str,
    object: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    #[serde(rename = "apiVersion", default)]
    api_version: String,
    #[serde(default)]
    kind: String,
    // Skipped, not built; only its presence is checked.
    #[serde(default)]
    object: Option<IgnoredAny>,
}

#[derive(Deserialize)]
struct EnvelopeBody<T> {
    object: T,
}

/// Hands out encoders and decoders for the media types it supports, all
/// resolving kinds against one [`Scheme`].
#[derive(Debug, Clone)]
pub struct CodecFactory {
    scheme: Arc<Scheme>,
    serializers: Vec<SerializerInfo>,
}

impl CodecFactory {
    /// Factory supporting JSON, then MessagePack.
    pub fn new(scheme: impl Into<Arc<Scheme>>) -> Self {
        Self::with_serializers(
            scheme,
            vec![
                SerializerInfo::new(Serializer::Json(JsonCodec)),
                SerializerInfo::new(Serializer::MsgPack(MsgPackCodec)),
            ],
        )
    }

    pub fn with_serializers(
        scheme: impl Into<Arc<Scheme>>,
        serializers: Vec<SerializerInfo>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            serializers,
        }
    }

    pub fn scheme(&self) -> &Arc<Scheme> {
        &self.scheme
    }

    /// Media types in the order they were registered.
    pub fn supported_media_types(&self) -> &[SerializerInfo] {
        &self.serializers
    }

    pub fn encoder_for_version(&self, serializer: Serializer, version: GroupVersion) -> Encoder {
        Encoder {
            serializer,
            version,
            scheme: Arc::clone(&self.scheme),
        }
    }

    /// Decoder accepting any supported media type, bound to `version`.
    pub fn universal_decoder(&self, version: GroupVersion) -> Decoder {
        Decoder {
            serializers: self.serializers.iter().map(|info| info.serializer).collect(),
            version,
            scheme: Arc::clone(&self.scheme),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Encoder {
    serializer: Serializer,
    version: GroupVersion,
    scheme: Arc<Scheme>,
}

impl Encoder {
    pub fn media_type(&self) -> &'static str {
        self.serializer.media_type()
    }

    pub fn version(&self) -> GroupVersion {
        self.version
    }

    /// Writes `object` with its type metadata to `buf`.
    pub fn encode<T: Object>(&self, object: &T, buf: &mut Vec<u8>) -> Result<()> {
        if T::GROUP_VERSION != self.version || !self.scheme.is_registered::<T>() {
            return Err(SerializationError::NotRegistered {
                kind: T::KIND.to_string(),
                version: self.version,
            });
        }

        let envelope = Envelope {
            api_version: self.version.to_string(),
            kind: T::KIND,
            object,
        };
        let start = buf.len();
        self.serializer.encode_to(&envelope, buf)?;
        debug!(
            kind = T::KIND,
            media_type = self.media_type(),
            bytes = buf.len() - start,
            "encoded object"
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Decoder {
    serializers: Vec<Serializer>,
    version: GroupVersion,
    scheme: Arc<Scheme>,
}

impl Decoder {
    pub fn version(&self) -> GroupVersion {
        self.version
    }

    /// Decodes `data`, relying only on the type metadata it carries.
    pub fn decode<T: Object>(&self, data: &[u8]) -> Result<T> {
        if data.is_empty() {
            return Err(SerializationError::EmptyPayload);
        }
        let format = self
            .serializers
            .iter()
            .find(|s| s.recognizes(data))
            .ok_or(SerializationError::UnrecognizedFormat)?;

        let header: EnvelopeHeader = format.decode(data)?;
        if header.kind.is_empty() {
            return Err(SerializationError::MissingKind);
        }
        if !self.version.matches(&header.api_version) {
            return Err(SerializationError::VersionMismatch {
                expected: self.version,
                found: header.api_version,
            });
        }

        let gvk = self.version.with_kind(header.kind);
        if !self.scheme.recognizes(&gvk) {
            return Err(SerializationError::NotRegistered {
                kind: gvk.kind,
                version: self.version,
            });
        }
        if gvk.kind != T::KIND {
            return Err(SerializationError::KindMismatch {
                expected: T::KIND,
                found: gvk.kind,
            });
        }
        if T::GROUP_VERSION != self.version || !self.scheme.is_registered::<T>() {
            return Err(SerializationError::NotRegistered {
                kind: T::KIND.to_string(),
                version: self.version,
            });
        }

        if header.object.is_none() {
            return Err(SerializationError::UnsupportedLayout { kind: gvk.kind });
        }

        // Second pass builds `T` only once the metadata has been accepted.
        let body: EnvelopeBody<T> = format.decode(data)?;
        debug!(
            kind = T::KIND,
            media_type = format.media_type(),
            bytes = data.len(),
            "decoded object"
        );
        Ok(body.object)
    }
}
