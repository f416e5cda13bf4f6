//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{HybridOptArgs, OutputFormat};
use crate::error::Result;
use crate::fusion::FusedHit;
use crate::weighting::QueryFeatures;

/// Result structure for the alpha command.
#[derive(Debug, Serialize, Deserialize)]
pub struct AlphaReport {
    pub query: String,
    pub features: Option<QueryFeatures>,
    pub alpha: f32,
    pub explicit: bool,
    pub corpus_stats: bool,
}

/// Result structure for the quantize command.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuantizationReport {
    pub method: String,
    pub vectors: usize,
    pub dimension: usize,
    pub fitted: bool,
    pub compression_ratio: f32,
    pub memory_saved_percent: f32,
    pub original_bytes: usize,
    pub quantized_bytes: usize,
    pub mean_reconstruction_error: f32,
    pub duration_ms: u64,
    pub output: Option<String>,
}

/// Result structure for the reduce command.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReductionReport {
    pub method: String,
    pub vectors: usize,
    pub input_dim: usize,
    pub output_dim: usize,
    pub fitted: bool,
    pub explained_variance: Option<f32>,
    pub duration_ms: u64,
    pub output: Option<String>,
}

/// Result structure for the fuse command.
#[derive(Debug, Serialize, Deserialize)]
pub struct FusionReport {
    pub lists: usize,
    pub k: u32,
    pub hits: Vec<FusedHit>,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &HybridOptArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &HybridOptArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;

    if std::any::type_name::<T>().ends_with("FusionReport") {
        output_fusion_human(&value)
    } else {
        output_generic_human(&value)
    }
}

/// Output fused hits in human format.
fn output_fusion_human(value: &serde_json::Value) -> Result<()> {
    if let Some(obj) = value.as_object() {
        println!("Fused Results:");
        println!("══════════════");

        if let Some(hits) = obj.get("hits").and_then(|h| h.as_array()) {
            for (i, hit) in hits.iter().enumerate() {
                let id = hit.get("id").and_then(|id| id.as_str()).unwrap_or("unknown");
                let score = hit.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0);
                println!("{:>3}. {id} ({score:.5})", i + 1);
            }
        }

        println!();
        if let Some(lists) = obj.get("lists").and_then(|l| l.as_u64()) {
            println!("Input lists: {lists}");
        }
        if let Some(k) = obj.get("k").and_then(|k| k.as_u64()) {
            println!("k: {k}");
        }
    }
    Ok(())
}

/// Output generic data in human format.
fn output_generic_human(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                match val {
                    serde_json::Value::Object(inner) => {
                        println!("{key}:");
                        for (inner_key, inner_val) in inner {
                            let formatted_val = format_value(inner_val);
                            println!("  {inner_key}: {formatted_val}");
                        }
                    }
                    _ => {
                        let formatted_val = format_value(val);
                        println!("{key}: {formatted_val}");
                    }
                }
            }
        }
        _ => {
            let formatted_value = format_value(value);
            println!("{formatted_value}");
        }
    }
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &HybridOptArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.4}"),
            _ => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "-".to_string(),
    }
}

/// Format bytes into human-readable format.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let unit = UNITS[unit_index];
    if unit_index == 0 {
        format!("{bytes} {unit}")
    } else {
        format!("{size:.1} {unit}")
    }
}
