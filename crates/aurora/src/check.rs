use std::path::Path;

use anyhow::{Context, Result};
use auroraconfig::AuroraConfig;
use renderer::{check_sources, ShaderReport};

use crate::cli::ShaderArgs;
use crate::run::{load_sources, shader_paths};

/// Builds the shader pair with the offline backend and prints the resolved
/// handles. Any compile, link or resolution failure is returned with the
/// compiler diagnostic attached.
pub fn run_check(args: &ShaderArgs, file: &AuroraConfig) -> Result<()> {
    let (vertex, fragment) = shader_paths(args, file);
    let sources = load_sources(args, file)?;
    let report = check_sources(&sources).context("shader check failed")?;

    println!("vertex:   {}", describe_source(vertex.as_deref()));
    println!("fragment: {}", describe_source(fragment.as_deref()));
    print_report(&report);
    Ok(())
}

fn describe_source(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "(bundled)".to_string(),
    }
}

fn print_report(report: &ShaderReport) {
    println!("Resolved handles:");
    for (name, location) in &report.attributes {
        println!("  attribute {name:<12} location={location}");
    }
    for (name, location) in &report.uniforms {
        println!("  uniform   {name:<12} slot={location}");
    }
}
