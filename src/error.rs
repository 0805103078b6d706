use thiserror::Error;

use crate::scheme::{GroupVersion, GroupVersionKind};

/// Registering a kind that is already bound to a different Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("kind {gvk} is already registered to {existing}, cannot register {attempted}")]
pub struct RegistrationError {
    pub gvk: GroupVersionKind,
    pub existing: &'static str,
    pub attempted: &'static str,
}

/// Failure inside a single serializer or the universal decoder.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("msgpack encode: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    #[error("msgpack decode: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    #[error("payload is empty")]
    EmptyPayload,

    #[error("payload does not match any supported media type")]
    UnrecognizedFormat,

    #[error("object 'kind' is missing")]
    MissingKind,

    #[error("no kind {kind:?} is registered for version {version}")]
    NotRegistered { kind: String, version: GroupVersion },

    #[error("unsupported apiVersion {found:?}, expected {expected}")]
    VersionMismatch { expected: GroupVersion, found: String },

    #[error(
        "payload for kind {kind:?} carries its fields inline; only objects nested under \"object\" are supported"
    )]
    UnsupportedLayout { kind: String },

    #[error("payload holds kind {found:?}, expected {expected:?}")]
    KindMismatch { expected: &'static str, found: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("no serializers available")]
    NoSerializers,

    #[error("encoding failed: {0}")]
    Encoding(#[source] SerializationError),

    #[error("decoding failure: {0}")]
    Decoding(#[source] SerializationError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
