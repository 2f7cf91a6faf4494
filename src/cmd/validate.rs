//! `redirector validate` — check mappings for errors.
//!
//! Parses and validates a mappings file, or the prefixed environment
//! variables when no file is given, and reports errors and warnings in
//! human-readable text or machine-readable JSON.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::model::Config;
use crate::config::sources::{env, parse_config_str};
use crate::config::validation;
use crate::error::{RedirectorError, ValidationError};

fn load(args: &ValidateArgs) -> Result<(Config, String), RedirectorError> {
    let Some(path) = &args.config else {
        let vars = env::prefixed_vars(&args.mapping_prefix);
        let config = env::parse_vars(&args.mapping_prefix, vars)?;
        return Ok((config, format!("{}* environment", args.mapping_prefix)));
    };

    if !path.exists() {
        return Err(RedirectorError::ConfigFileNotFound { path: path.clone() });
    }
    let content = std::fs::read_to_string(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let config = parse_config_str(ext, &content, &path.display().to_string())?;
    Ok((config, path.display().to_string()))
}

fn to_json(issues: &[ValidationError]) -> Vec<serde_json::Value> {
    issues
        .iter()
        .map(|e| {
            serde_json::json!({
                "mapping": e.mapping,
                "field": e.field,
                "message": e.message,
                "suggestion": e.suggestion,
            })
        })
        .collect()
}

pub fn execute(args: &ValidateArgs) -> Result<(), RedirectorError> {
    let (config, label) = load(args)?;

    let mut errors = validation::validate(&config).err().unwrap_or_default();
    let warnings = validation::warnings(&config);
    if args.strict {
        errors.extend(warnings.iter().cloned());
    }

    match args.format {
        ValidateFormat::Text => {
            if errors.is_empty() {
                println!(
                    "\u{2713} {}",
                    validation::format_validation_report(&label, &config)
                );
            } else {
                eprintln!("\u{2717} {label} has {} errors\n", errors.len());
                for error in &errors {
                    eprintln!("{error}");
                }
            }
            if !args.strict && !warnings.is_empty() {
                eprintln!("\n{} warnings:", warnings.len());
                for warning in &warnings {
                    eprintln!("{warning}");
                }
            }
        }
        ValidateFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "valid": errors.is_empty(),
                    "mappings": config.mappings.len(),
                    "targets": config.total_targets(),
                    "errors": to_json(&errors),
                    "warnings": to_json(&warnings),
                })
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(RedirectorError::ConfigValidation { errors })
    }
}
