use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::scheme::Object;

/// Opaque payload embedded in a larger document and decoded later.
///
/// In human-readable formats the payload is written inline, byte for byte, as
/// the JSON it holds, so it must itself be JSON. Binary formats carry it as
/// bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawExtension {
    pub raw: Vec<u8>,
}

impl RawExtension {
    pub fn new(raw: impl Into<Vec<u8>>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl Serialize for RawExtension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !serializer.is_human_readable() {
            return serializer.serialize_bytes(&self.raw);
        }
        if self.raw.is_empty() {
            return serializer.serialize_unit();
        }
        let text = String::from_utf8(self.raw.clone())
            .map_err(|e| ser::Error::custom(format!("raw extension is not valid JSON: {e}")))?;
        let inline = RawValue::from_string(text)
            .map_err(|e| ser::Error::custom(format!("raw extension is not valid JSON: {e}")))?;
        inline.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawExtension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let inline = Option::<Box<RawValue>>::deserialize(deserializer)?;
            return Ok(match inline {
                Some(inline) => Self::new(inline.get()),
                None => Self::default(),
            });
        }
        deserializer.deserialize_byte_buf(RawBytesVisitor)
    }
}

struct RawBytesVisitor;

impl<'de> Visitor<'de> for RawBytesVisitor {
    type Value = RawExtension;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("raw bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(RawExtension::new(v))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Ok(RawExtension::new(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawExtension::default())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut raw = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            raw.push(byte);
        }
        Ok(RawExtension { raw })
    }
}

/// Configuration used during node creation: either an inline serialized
/// value or a reference to where the value lives, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProviderConfigFields", into = "ProviderConfigFields")]
pub enum ProviderConfig {
    #[default]
    Empty,
    /// Inlined serialized form of a provider's own versioned config type.
    Value(RawExtension),
    ValueFrom(ProviderConfigSource),
}

impl ProviderConfig {
    pub fn is_empty(&self) -> bool {
        matches!(self, ProviderConfig::Empty)
    }

    pub fn value(&self) -> Option<&RawExtension> {
        match self {
            ProviderConfig::Value(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn value_from(&self) -> Option<&ProviderConfigSource> {
        match self {
            ProviderConfig::ValueFrom(source) => Some(source),
            _ => None,
        }
    }
}

// On-the-wire shape of `ProviderConfig`.
#[derive(Default, Serialize, Deserialize)]
struct ProviderConfigFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<RawExtension>,
    #[serde(rename = "valueFrom", default, skip_serializing_if = "Option::is_none")]
    value_from: Option<ProviderConfigSource>,
}

impl TryFrom<ProviderConfigFields> for ProviderConfig {
    type Error = String;

    fn try_from(fields: ProviderConfigFields) -> Result<Self, Self::Error> {
        match (fields.value, fields.value_from) {
            (Some(_), Some(_)) => {
                Err("providerConfig: value and valueFrom are mutually exclusive".to_string())
            }
            (Some(raw), None) => Ok(ProviderConfig::Value(raw)),
            (None, Some(source)) => Ok(ProviderConfig::ValueFrom(source)),
            (None, None) => Ok(ProviderConfig::Empty),
        }
    }
}

impl From<ProviderConfig> for ProviderConfigFields {
    fn from(config: ProviderConfig) -> Self {
        match config {
            ProviderConfig::Empty => Self::default(),
            ProviderConfig::Value(raw) => Self {
                value: Some(raw),
                value_from: None,
            },
            ProviderConfig::ValueFrom(source) => Self {
                value: None,
                value_from: Some(source),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfigSource {
    /// Machine class the provider config is sourced from.
    #[serde(rename = "machineClass", default, skip_serializing_if = "Option::is_none")]
    pub machine_class: Option<MachineClassRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineClassRef {
    /// Name of the referenced class. Required; see
    /// [`validate_machine_class_ref`](crate::validation::validate_machine_class_ref).
    #[serde(default)]
    pub name: String,
    /// Substitutions applied to the referenced class where supported. Keys
    /// must be non-empty; at most 512 entries and 256 KiB in total.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    /// Cloud provider the class belongs to. Required, like `name`.
    #[serde(default)]
    pub kind: String,
}

impl Object for MachineClassRef {
    const KIND: &'static str = "MachineClassRef";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Template for machines of one provider, carrying that provider's config
/// as an undecoded payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineClass {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(rename = "providerConfig", default)]
    pub provider_config: RawExtension,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
}

impl Object for MachineClass {
    const KIND: &'static str = "MachineClass";
}

/// Whether a resource is in a condition. `Unknown` means the state could not
/// be observed and is distinct from `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ConditionStatus::Unknown)
    }
}

impl From<Option<bool>> for ConditionStatus {
    fn from(observed: Option<bool>) -> Self {
        match observed {
            Some(true) => ConditionStatus::True,
            Some(false) => ConditionStatus::False,
            None => ConditionStatus::Unknown,
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "True" => Ok(ConditionStatus::True),
            "False" => Ok(ConditionStatus::False),
            "Unknown" => Ok(ConditionStatus::Unknown),
            other => Err(format!("invalid condition status {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_config_value_is_inlined_json() {
        let config = ProviderConfig::Value(RawExtension::new(br#"{"zone":"a"}"#.to_vec()));
        let doc = serde_json::to_string(&config).unwrap();
        assert_eq!(doc, r#"{"value":{"zone":"a"}}"#);

        let back: ProviderConfig = serde_json::from_str(&doc).unwrap();
        assert_eq!(back.value().unwrap().raw, br#"{"zone":"a"}"#);
        assert!(back.value_from().is_none());
    }

    #[test]
    fn provider_config_uses_camel_case_keys() {
        let config = ProviderConfig::ValueFrom(ProviderConfigSource {
            machine_class: Some(MachineClassRef {
                name: "small".into(),
                parameters: BTreeMap::new(),
                kind: "gcp".into(),
            }),
        });
        let doc = serde_json::to_value(&config).unwrap();
        assert_eq!(
            doc,
            json!({ "valueFrom": { "machineClass": { "name": "small", "kind": "gcp" } } })
        );
    }

    #[test]
    fn provider_config_rejects_value_and_value_from_together() {
        let doc = json!({
            "value": { "zone": "a" },
            "valueFrom": { "machineClass": { "name": "small", "kind": "gcp" } }
        });
        let err = serde_json::from_str::<ProviderConfig>(&doc.to_string()).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn empty_provider_config_is_an_empty_object() {
        assert_eq!(serde_json::to_string(&ProviderConfig::Empty).unwrap(), "{}");
        let back: ProviderConfig = serde_json::from_str("{}").unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn raw_extension_bytes_survive_a_json_document() {
        let raw = br#"{"z": 1, "a": 18446744073709551616123, "pi": 3.14159265358979323846}"#;
        let class = MachineClass {
            provider_config: RawExtension::new(raw.to_vec()),
            ..Default::default()
        };

        let doc = serde_json::to_string(&class).unwrap();
        let back: MachineClass = serde_json::from_str(&doc).unwrap();
        assert_eq!(back.provider_config.raw, raw.to_vec());
    }

    #[test]
    fn raw_extension_rejects_non_json_in_json_documents() {
        let raw = RawExtension::new(vec![0x81, 0xa1, b'a', 0x01]);
        assert!(serde_json::to_vec(&raw).is_err());
    }

    #[test]
    fn raw_extension_is_bytes_in_msgpack() {
        let raw = RawExtension::new(vec![0x81, 0xa1, b'a', 0x01]);
        let packed = rmp_serde::to_vec(&raw).unwrap();
        let back: RawExtension = rmp_serde::from_slice(&packed).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn null_raw_extension_reads_as_empty() {
        let class: MachineClass =
            serde_json::from_str(r#"{ "metadata": { "name": "m" }, "providerConfig": null }"#)
                .unwrap();
        assert!(class.provider_config.is_empty());
    }

    #[test]
    fn condition_status_is_tri_state() {
        assert_eq!(ConditionStatus::from(None), ConditionStatus::Unknown);
        assert_ne!(ConditionStatus::Unknown, ConditionStatus::False);
        assert!(!ConditionStatus::Unknown.is_known());
        assert_eq!(serde_json::to_string(&ConditionStatus::True).unwrap(), "\"True\"");
        assert_eq!("False".parse::<ConditionStatus>(), Ok(ConditionStatus::False));
        assert!("false".parse::<ConditionStatus>().is_err());
    }
}
