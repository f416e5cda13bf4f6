//! Command implementations for the hybridopt CLI.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use log::{debug, info};
use serde_json::Value;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::OptimizerConfig;
use crate::error::{HybridOptError, Result};
use crate::fusion::fuse;
use crate::parallel_search::SearchResult;
use crate::quantization::{VectorQuantizer, mean_reconstruction_error};
use crate::reduction::DimensionalityReducer;
use crate::weighting::{AdaptiveWeighting, CorpusStats};

/// Execute a CLI command.
pub fn execute_command(args: HybridOptArgs) -> Result<()> {
    let config = load_config(&args)?;
    match &args.command {
        Command::Alpha(alpha_args) => show_alpha(alpha_args, &config, &args),
        Command::Quantize(quantize_args) => quantize_vectors(quantize_args, &config, &args),
        Command::Reduce(reduce_args) => reduce_vectors(reduce_args, &config, &args),
        Command::Fuse(fuse_args) => fuse_lists(fuse_args, &config, &args),
    }
}

/// Load the optimizer configuration, falling back to defaults.
fn load_config(args: &HybridOptArgs) -> Result<OptimizerConfig> {
    match &args.config {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            OptimizerConfig::from_file(path)
        }
        None => Ok(OptimizerConfig::default()),
    }
}

/// Compute query features and alpha.
fn show_alpha(args: &AlphaArgs, config: &OptimizerConfig, cli_args: &HybridOptArgs) -> Result<()> {
    if let Some(alpha) = args.alpha
        && !alpha.is_finite()
    {
        return Err(HybridOptError::invalid_argument(format!(
            "alpha must be finite, got {alpha}"
        )));
    }

    let weighting = AdaptiveWeighting::new(config.weighting.clone())?;
    let stats = match &args.stats {
        Some(path) => Some(load_corpus_stats(path)?),
        None => None,
    };

    let features = match args.alpha {
        Some(_) => None,
        None => Some(weighting.extract_features(&args.query, stats.as_ref())),
    };
    let alpha = weighting.resolve_alpha(&args.query, args.alpha, stats.as_ref());

    output_result(
        "Query weighting",
        &AlphaReport {
            query: args.query.clone(),
            features,
            alpha,
            explicit: args.alpha.is_some(),
            corpus_stats: stats.is_some(),
        },
        cli_args,
    )
}

/// Fit a quantizer and report its effect.
fn quantize_vectors(
    args: &QuantizeArgs,
    config: &OptimizerConfig,
    cli_args: &HybridOptArgs,
) -> Result<()> {
    let mut quantizer_config = config.quantizer.clone();
    if let Some(method) = args.method {
        quantizer_config.method = method;
    }
    if let Some(bits) = args.bits {
        quantizer_config.bits = bits;
    }
    if let Some(subspaces) = args.subspaces {
        quantizer_config.n_subspaces = subspaces;
    }

    let vectors = load_vectors(&args.vectors)?;
    info!(
        "Loaded {} vectors from {}",
        vectors.len(),
        args.vectors.display()
    );

    let start = Instant::now();
    let mut quantizer = VectorQuantizer::new(quantizer_config)?;
    let fitted = quantizer.fit(&vectors);
    let codes = quantizer.encode(&vectors)?;
    let reconstructed = quantizer.decode(&codes)?;
    let duration_ms = start.elapsed().as_millis() as u64;

    let (ratio, percent) = quantizer.memory_savings(&vectors);
    let original_bytes: usize = vectors.iter().map(|v| v.len() * 4).sum();
    let quantized_bytes = (original_bytes as f32 / ratio).round() as usize;
    info!(
        "Compressed {} to {}",
        format_bytes(original_bytes as u64),
        format_bytes(quantized_bytes as u64)
    );

    if let Some(output) = &args.output {
        fs::write(output, quantizer.to_bytes()?)?;
        info!("Wrote quantizer state to {}", output.display());
    }

    output_result(
        "Quantization complete",
        &QuantizationReport {
            method: quantizer.config().method.to_string(),
            vectors: vectors.len(),
            dimension: vectors.first().map(Vec::len).unwrap_or(0),
            fitted,
            compression_ratio: ratio,
            memory_saved_percent: percent,
            original_bytes,
            quantized_bytes,
            mean_reconstruction_error: mean_reconstruction_error(&vectors, &reconstructed),
            duration_ms,
            output: args.output.as_ref().map(|p| p.display().to_string()),
        },
        cli_args,
    )
}

/// Fit a reducer and optionally write the reduced vectors.
fn reduce_vectors(
    args: &ReduceArgs,
    config: &OptimizerConfig,
    cli_args: &HybridOptArgs,
) -> Result<()> {
    let mut reducer_config = config.reducer.clone();
    if let Some(target_dim) = args.target_dim {
        reducer_config.target_dim = target_dim;
    }
    if let Some(min_samples) = args.min_samples {
        reducer_config.min_samples = min_samples;
    }

    let vectors = load_vectors(&args.vectors)?;
    let input_dim = vectors.first().map(Vec::len).unwrap_or(0);

    let start = Instant::now();
    let mut reducer = DimensionalityReducer::new(reducer_config)?;
    let method = reducer.select_method(vectors.len());
    let reduced = reducer.fit_transform(&vectors);
    let duration_ms = start.elapsed().as_millis() as u64;

    if let Some(output) = &args.output {
        write_vectors(output, &reduced)?;
        info!(
            "Wrote {} reduced vectors to {}",
            reduced.len(),
            output.display()
        );
    }

    output_result(
        "Reduction complete",
        &ReductionReport {
            method: method.to_string(),
            vectors: vectors.len(),
            input_dim,
            output_dim: reducer.output_dim().unwrap_or(input_dim),
            fitted: reducer.is_fitted(),
            explained_variance: reducer.explained_variance(),
            duration_ms,
            output: args.output.as_ref().map(|p| p.display().to_string()),
        },
        cli_args,
    )
}

/// Fuse result lists read from a file.
fn fuse_lists(args: &FuseArgs, config: &OptimizerConfig, cli_args: &HybridOptArgs) -> Result<()> {
    let content = fs::read_to_string(&args.lists)?;
    let lists: Vec<Vec<SearchResult>> = serde_json::from_str(&content)?;
    let k = args.k.unwrap_or(config.fusion.k);

    let mut hits = fuse(&lists, k);
    hits.truncate(args.limit);

    output_result(
        "Fusion complete",
        &FusionReport {
            lists: lists.len(),
            k,
            hits,
        },
        cli_args,
    )
}

fn load_corpus_stats(path: &Path) -> Result<CorpusStats> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load vectors from a JSON array or a JSONL file.
///
/// Each vector is either an array of numbers or an object with a `vector`
/// or `embedding` array.
pub fn load_vectors(path: &Path) -> Result<Vec<Vec<f32>>> {
    let is_jsonl = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jsonl"))
        .unwrap_or(false);

    if is_jsonl {
        let reader = BufReader::new(File::open(path)?);
        let mut vectors = Vec::new();
        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(&line)?;
            vectors.push(parse_vector(&value).map_err(|e| {
                HybridOptError::invalid_argument(format!("line {}: {e}", line_number + 1))
            })?);
        }
        Ok(vectors)
    } else {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        match value {
            Value::Array(items) => items.iter().map(parse_vector).collect(),
            _ => Err(HybridOptError::invalid_argument(
                "expected a JSON array of vectors",
            )),
        }
    }
}

fn parse_vector(value: &Value) -> Result<Vec<f32>> {
    let values = match value {
        Value::Array(values) => values,
        Value::Object(obj) => obj
            .get("vector")
            .or_else(|| obj.get("embedding"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                HybridOptError::invalid_argument("object has no 'vector' or 'embedding' array")
            })?,
        _ => {
            return Err(HybridOptError::invalid_argument(
                "vector must be an array or an object",
            ));
        }
    };

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| HybridOptError::invalid_argument(format!("not a number: {v}")))
        })
        .collect()
}

/// Write vectors as JSONL.
pub fn write_vectors(path: &Path, vectors: &[Vec<f32>]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for vector in vectors {
        serde_json::to_writer(&mut writer, vector)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
