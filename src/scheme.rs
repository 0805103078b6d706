//! Type registry mapping group/version/kind triples to the Rust types that
//! implement them.

use std::any::{type_name, TypeId};
use std::collections::BTreeMap;
use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::api::{MachineClass, MachineClassRef};
use crate::error::RegistrationError;

/// Version every type in this package is served at.
pub const SCHEME_GROUP_VERSION: GroupVersion = GroupVersion {
    group: "cluster.k8s.io",
    version: "v1alpha1",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupVersion {
    pub group: &'static str,
    pub version: &'static str,
}

impl GroupVersion {
    pub fn with_kind(self, kind: impl Into<String>) -> GroupVersionKind {
        GroupVersionKind {
            group_version: self,
            kind: kind.into(),
        }
    }

    /// Whether `api_version` (as found in a document) names this group/version.
    pub fn matches(&self, api_version: &str) -> bool {
        if self.group.is_empty() {
            return api_version == self.version;
        }
        match api_version.split_once('/') {
            Some((group, version)) => group == self.group && version == self.version,
            None => false,
        }
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            f.write_str(self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupVersionKind {
    pub group_version: GroupVersion,
    pub kind: String,
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.group_version, self.kind)
    }
}

/// The `apiVersion`/`kind` pair every encoded object carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMeta {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
}

/// A type that can travel through the codec on its own, identified by kind.
pub trait Object: Serialize + DeserializeOwned + 'static {
    const KIND: &'static str;
    const GROUP_VERSION: GroupVersion = SCHEME_GROUP_VERSION;

    fn group_version_kind() -> GroupVersionKind {
        Self::GROUP_VERSION.with_kind(Self::KIND)
    }

    fn type_meta() -> TypeMeta {
        TypeMeta {
            api_version: Self::GROUP_VERSION.to_string(),
            kind: Self::KIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct KnownType {
    id: TypeId,
    name: &'static str,
}

#[derive(Debug, Default)]
pub struct Scheme {
    types: BTreeMap<GroupVersionKind, KnownType>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under its kind. Registering the same type again is a
    /// no-op; binding an already-taken kind to another type is an error.
    pub fn add_known_type<T: Object>(&mut self) -> Result<(), RegistrationError> {
        let gvk = T::group_version_kind();
        let known = KnownType {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        };

        if let Some(existing) = self.types.get(&gvk) {
            if existing.id == known.id {
                return Ok(());
            }
            return Err(RegistrationError {
                gvk,
                existing: existing.name,
                attempted: known.name,
            });
        }

        debug!(%gvk, rust_type = known.name, "registering kind");
        self.types.insert(gvk, known);
        Ok(())
    }

    pub fn recognizes(&self, gvk: &GroupVersionKind) -> bool {
        self.types.contains_key(gvk)
    }

    pub fn is_registered<T: Object>(&self) -> bool {
        self.types
            .get(&T::group_version_kind())
            .is_some_and(|known| known.id == TypeId::of::<T>())
    }

    pub fn kinds_for(&self, group_version: GroupVersion) -> impl Iterator<Item = &str> {
        self.types
            .keys()
            .filter(move |gvk| gvk.group_version == group_version)
            .map(|gvk| gvk.kind.as_str())
    }

    pub fn known_kinds(&self) -> impl Iterator<Item = &GroupVersionKind> {
        self.types.keys()
    }
}

/// Registers the kinds this package defines.
pub fn add_to_scheme(scheme: &mut Scheme) -> Result<(), RegistrationError> {
    scheme.add_known_type::<MachineClass>()?;
    scheme.add_known_type::<MachineClassRef>()?;
    Ok(())
}

pub fn new_scheme() -> Result<Scheme, RegistrationError> {
    let mut scheme = Scheme::new();
    add_to_scheme(&mut scheme)?;
    Ok(scheme)
}
