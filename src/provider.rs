use tracing::debug;

use crate::api::{MachineClass, ProviderConfig, RawExtension};
use crate::codec::{CodecFactory, Decoder, Encoder};
use crate::error::{Error, Result};
use crate::scheme::{new_scheme, Object, SCHEME_GROUP_VERSION};

/// Encoder/decoder pair bound to [`SCHEME_GROUP_VERSION`]. Immutable once
/// built and safe to share between threads.
#[derive(Debug, Clone)]
pub struct ProviderConfigCodec {
    encoder: Encoder,
    decoder: Decoder,
}

impl ProviderConfigCodec {
    /// Builds a codec over a fresh scheme holding this package's kinds.
    pub fn new() -> Result<Self> {
        let scheme = new_scheme()?;
        Self::from_factory(&CodecFactory::new(scheme))
    }

    /// Encodes with the first media type `factory` supports and decodes any
    /// of them.
    pub fn from_factory(factory: &CodecFactory) -> Result<Self> {
        let encoder = new_encoder(factory)?;
        Ok(Self {
            encoder,
            decoder: factory.universal_decoder(SCHEME_GROUP_VERSION),
        })
    }

    pub fn media_type(&self) -> &'static str {
        self.encoder.media_type()
    }

    /// Decodes the provider config carried by `machine_class` into `out`.
    /// `out` is left untouched on failure.
    pub fn decode_from_provider_config<T: Object>(
        &self,
        machine_class: &MachineClass,
        out: &mut T,
    ) -> Result<()> {
        *out = self.decode(&machine_class.provider_config.raw)?;
        Ok(())
    }

    pub fn decode<T: Object>(&self, raw: &[u8]) -> Result<T> {
        self.decoder.decode(raw).map_err(Error::Decoding)
    }

    pub fn encode_to_provider_config<T: Object>(&self, object: &T) -> Result<ProviderConfig> {
        let mut buf = Vec::new();
        self.encoder
            .encode(object, &mut buf)
            .map_err(Error::Encoding)?;
        Ok(ProviderConfig::Value(RawExtension { raw: buf }))
    }
}

fn new_encoder(factory: &CodecFactory) -> Result<Encoder> {
    let info = factory
        .supported_media_types()
        .first()
        .ok_or(Error::NoSerializers)?;
    debug!(media_type = info.media_type, "selected provider config encoder");
    Ok(factory.encoder_for_version(info.serializer, SCHEME_GROUP_VERSION))
}
