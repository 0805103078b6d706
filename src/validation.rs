use thiserror::Error;

use crate::api::{MachineClassRef, ProviderConfig};

pub const MAX_PARAMETERS: usize = 512;
pub const MAX_PARAMETERS_SIZE: usize = 256 * 1024;

/// Single validation error, with a JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field at path {path}")]
    MissingField { path: String },

    #[error("Empty key at path {path}")]
    EmptyKey { path: String },

    #[error("Too many entries at {path}: {count} (max {max})")]
    TooManyEntries { path: String, count: usize, max: usize },

    #[error("Size of {path} is {size} bytes (max {max})")]
    TooLarge { path: String, size: usize, max: usize },
}

/// Checks the constraints `ProviderConfig` documents but does not enforce
/// while deserializing.
///
/// Returns Ok(()) if everything holds, or Err(vec![]) with one or more errors.
pub fn validate_provider_config(config: &ProviderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    match config {
        ProviderConfig::Empty => {}
        ProviderConfig::Value(raw) => {
            if raw.is_empty() {
                errors.push(ValidationError::MissingField {
                    path: "$.value".to_string(),
                });
            }
        }
        ProviderConfig::ValueFrom(source) => match &source.machine_class {
            Some(class) => validate_inner(class, "$.valueFrom.machineClass", &mut errors),
            None => errors.push(ValidationError::MissingField {
                path: "$.valueFrom.machineClass".to_string(),
            }),
        },
    }
    into_result(errors)
}

pub fn validate_machine_class_ref(class: &MachineClassRef) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    validate_inner(class, "$", &mut errors);
    into_result(errors)
}

// `name` and `kind` identify the referenced class, so both are required.
fn validate_inner(class: &MachineClassRef, path: &str, errors: &mut Vec<ValidationError>) {
    if class.name.is_empty() {
        errors.push(ValidationError::MissingField {
            path: format!("{path}.name"),
        });
    }
    if class.kind.is_empty() {
        errors.push(ValidationError::MissingField {
            path: format!("{path}.kind"),
        });
    }

    let params_path = format!("{path}.parameters");
    if class.parameters.len() > MAX_PARAMETERS {
        errors.push(ValidationError::TooManyEntries {
            path: params_path.clone(),
            count: class.parameters.len(),
            max: MAX_PARAMETERS,
        });
    }

    let mut size = 0;
    for (key, value) in &class.parameters {
        if key.is_empty() {
            errors.push(ValidationError::EmptyKey {
                path: params_path.clone(),
            });
        }
        size += key.len() + value.len();
    }
    if size > MAX_PARAMETERS_SIZE {
        errors.push(ValidationError::TooLarge {
            path: params_path,
            size,
            max: MAX_PARAMETERS_SIZE,
        });
    }
}

fn into_result(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::api::{ProviderConfigSource, RawExtension};

    fn class_ref(parameters: BTreeMap<String, String>) -> MachineClassRef {
        MachineClassRef {
            name: "m1".into(),
            parameters,
            kind: "aws".into(),
        }
    }

    #[test]
    fn valid_ref_passes() {
        let params = BTreeMap::from([("zone".to_string(), "us-east-1a".to_string())]);
        assert_eq!(validate_machine_class_ref(&class_ref(params)), Ok(()));
    }

    #[test]
    fn empty_key_is_reported_with_path() {
        let config = ProviderConfig::ValueFrom(ProviderConfigSource {
            machine_class: Some(class_ref(BTreeMap::from([(String::new(), "x".to_string())]))),
        });
        let errors = validate_provider_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::EmptyKey {
                path: "$.valueFrom.machineClass.parameters".to_string()
            }]
        );
    }

    #[test]
    fn parameter_limits_are_enforced() {
        let many = (0..=MAX_PARAMETERS)
            .map(|i| (format!("k{i}"), String::new()))
            .collect();
        let errors = validate_machine_class_ref(&class_ref(many)).unwrap_err();
        assert!(matches!(
            errors[..],
            [ValidationError::TooManyEntries { count: 513, .. }]
        ));

        let big = BTreeMap::from([("blob".to_string(), "x".repeat(MAX_PARAMETERS_SIZE))]);
        let errors = validate_machine_class_ref(&class_ref(big)).unwrap_err();
        assert!(matches!(errors[..], [ValidationError::TooLarge { .. }]));
    }

    #[test]
    fn errors_render_through_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(ValidationError::TooManyEntries {
            path: "$.parameters".to_string(),
            count: 600,
            max: MAX_PARAMETERS,
        });
        assert_eq!(err.to_string(), "Too many entries at $.parameters: 600 (max 512)");
    }

    #[test]
    fn missing_fields_are_collected() {
        let errors = validate_machine_class_ref(&MachineClassRef::default()).unwrap_err();
        let paths: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            paths,
            vec![
                "Missing required field at path $.name",
                "Missing required field at path $.kind",
            ]
        );

        let errors = validate_provider_config(&ProviderConfig::Value(RawExtension::default()))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
