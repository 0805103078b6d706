use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use provider_config::codec::{MsgPackCodec, WireFormat};
use provider_config::validation::validate_provider_config;
use provider_config::{MachineClass, MachineClassRef, Object, ProviderConfig, ProviderConfigCodec};
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "provider-config")]
#[command(about = "Encode, decode and check machine class provider configs")]
struct Cli {
    /// Input file path (use "-" for stdin)
    #[arg(short, long, global = true, default_value = "-", env = "PROVIDER_CONFIG_INPUT")]
    input: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pack a JSON object of a registered kind into a providerConfig
    Encode {
        #[arg(short, long, value_enum)]
        kind: Kind,
    },
    /// Unpack the providerConfig of a MachineClass document
    Decode {
        #[arg(short, long, value_enum, default_value = "MachineClassRef")]
        kind: Kind,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Check a providerConfig document against its documented limits
    Validate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    #[value(name = "MachineClass")]
    MachineClass,
    #[value(name = "MachineClassRef")]
    MachineClassRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Msgpack,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let input = read_input(&cli.input)?;

    let output = match cli.command {
        Command::Encode { kind } => run_encode(kind, &input)?,
        Command::Decode { kind, format } => run_decode(kind, format, &input)?,
        Command::Validate => run_validate(&input)?,
    };
    io::stdout()
        .write_all(&output)
        .map_err(|e| anyhow!("Failed to write output: {e}"))?;

    Ok(())
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read input file {path}"))
    }
}

/// Packs `input` into a providerConfig and renders it as pretty JSON.
fn run_encode(kind: Kind, input: &str) -> Result<Vec<u8>> {
    let codec = ProviderConfigCodec::new()?;
    let config = match kind {
        Kind::MachineClass => encode::<MachineClass>(&codec, input)?,
        Kind::MachineClassRef => encode::<MachineClassRef>(&codec, input)?,
    };
    let mut json = serde_json::to_string_pretty(&config)
        .map_err(|e| anyhow!("Failed to serialize providerConfig: {e}"))?;
    json.push('\n');
    Ok(json.into_bytes())
}

fn run_decode(kind: Kind, format: OutputFormat, input: &str) -> Result<Vec<u8>> {
    let codec = ProviderConfigCodec::new()?;
    let class: MachineClass = serde_json::from_str(input)
        .map_err(|e| anyhow!("Failed to parse MachineClass JSON: {e}"))?;
    match kind {
        Kind::MachineClass => decode::<MachineClass>(&codec, &class, format),
        Kind::MachineClassRef => decode::<MachineClassRef>(&codec, &class, format),
    }
}

fn run_validate(input: &str) -> Result<Vec<u8>> {
    let config: ProviderConfig = serde_json::from_str(input)
        .map_err(|e| anyhow!("Failed to parse providerConfig JSON: {e}"))?;
    if let Err(errors) = validate_provider_config(&config) {
        let listing: Vec<String> = errors.iter().map(|e| format!("- {e}")).collect();
        return Err(anyhow!(
            "providerConfig has {} problem(s):\n{}",
            errors.len(),
            listing.join("\n")
        ));
    }
    Ok(b"ok\n".to_vec())
}

fn encode<T: Object>(codec: &ProviderConfigCodec, input: &str) -> Result<ProviderConfig> {
    let object: T = serde_json::from_str(input)
        .map_err(|e| anyhow!("Failed to parse {} JSON: {e}", T::KIND))?;
    Ok(codec.encode_to_provider_config(&object)?)
}

fn decode<T: Object + Default>(
    codec: &ProviderConfigCodec,
    class: &MachineClass,
    format: OutputFormat,
) -> Result<Vec<u8>> {
    let mut out = T::default();
    codec
        .decode_from_provider_config(class, &mut out)
        .with_context(|| format!("MachineClass {:?}", class.metadata.name))?;

    match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&out)
                .map_err(|e| anyhow!("Failed to serialize output: {e}"))?;
            json.push('\n');
            Ok(json.into_bytes())
        }
        OutputFormat::Msgpack => MsgPackCodec
            .encode(&out)
            .map_err(|e| anyhow!("Failed to encode output: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const CLASS_REF: &str = r#"{"name": "m1", "parameters": {"zone": "us-east-1a"}, "kind": "aws"}"#;

    fn machine_class_document() -> String {
        let config: Value =
            serde_json::from_slice(&run_encode(Kind::MachineClassRef, CLASS_REF).unwrap()).unwrap();
        json!({
            "apiVersion": "cluster.k8s.io/v1alpha1",
            "kind": "MachineClass",
            "metadata": { "name": "small" },
            "providerConfig": config["value"],
            "provider": "aws"
        })
        .to_string()
    }

    #[test]
    fn encode_prints_an_inline_value() {
        let output = run_encode(Kind::MachineClassRef, CLASS_REF).unwrap();
        let config: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(config["value"]["kind"], "MachineClassRef");
        assert_eq!(config["value"]["object"]["parameters"]["zone"], "us-east-1a");
        assert!(config.get("valueFrom").is_none());
    }

    #[test]
    fn encode_rejects_malformed_input() {
        let err = run_encode(Kind::MachineClassRef, "{").unwrap_err();
        assert!(err.to_string().contains("Failed to parse MachineClassRef JSON"));
    }

    #[test]
    fn decode_unpacks_a_machine_class_document() {
        let output =
            run_decode(Kind::MachineClassRef, OutputFormat::Json, &machine_class_document()).unwrap();
        let decoded: MachineClassRef = serde_json::from_slice(&output).unwrap();
        assert_eq!(decoded.name, "m1");
        assert_eq!(decoded.kind, "aws");
    }

    #[test]
    fn decode_can_emit_msgpack() {
        let output =
            run_decode(Kind::MachineClassRef, OutputFormat::Msgpack, &machine_class_document())
                .unwrap();
        let decoded: MachineClassRef = MsgPackCodec.decode(&output).unwrap();
        assert_eq!(decoded.parameters["zone"], "us-east-1a");
    }

    #[test]
    fn decode_reports_kind_mismatch_with_class_name() {
        let err = run_decode(Kind::MachineClass, OutputFormat::Json, &machine_class_document())
            .unwrap_err();
        assert!(err.to_string().contains("\"small\""));
    }

    #[test]
    fn validate_accepts_and_rejects() {
        let ok = run_validate(r#"{"valueFrom": {"machineClass": {"name": "m1", "kind": "aws"}}}"#)
            .unwrap();
        assert_eq!(ok, b"ok\n");

        let err = run_validate(r#"{"valueFrom": {"machineClass": {"name": "m1"}}}"#).unwrap_err();
        assert!(err
            .to_string()
            .contains("Missing required field at path $.valueFrom.machineClass.kind"));
    }

    #[test]
    fn unknown_output_format_is_refused_by_clap() {
        let parsed = Cli::try_parse_from(["provider-config", "decode", "--format", "yaml"]);
        assert!(parsed.is_err());

        let parsed =
            Cli::try_parse_from(["provider-config", "decode", "--format", "msgpack"]).unwrap();
        assert!(matches!(
            parsed.command,
            Command::Decode {
                format: OutputFormat::Msgpack,
                ..
            }
        ));
    }
}
