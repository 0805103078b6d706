//! Typed provider configuration for machine classes and the codec that packs
//! a provider's own config types into `MachineClass.providerConfig`.

pub mod api;
pub mod codec;
pub mod error;
pub mod provider;
pub mod scheme;
pub mod validation;

pub use api::{
    ConditionStatus, MachineClass, MachineClassRef, ObjectMeta, ProviderConfig,
    ProviderConfigSource, RawExtension,
};
pub use error::{Error, Result};
pub use provider::ProviderConfigCodec;
pub use scheme::{add_to_scheme, new_scheme, Object, Scheme, SCHEME_GROUP_VERSION};
