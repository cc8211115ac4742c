//! CLI for ECDSA signature vulnerability scanning.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sigscan::curve::Curve;
use sigscan::provider::load_inputs;
use sigscan::scanner::{scan_for_vulnerabilities, Finding, ScanReport};
use sigscan::{der, variants};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sigscan")]
#[command(about = "Forensic scanner for weak ECDSA signatures in Bitcoin-style transactions")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a batch of signatures for nonce reuse and malleability issues.
    Scan {
        /// Path to a JSON or CSV batch, or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,
    },
    /// Print the deterministic malleability-variant catalogue for one signature.
    Variants {
        /// DER-encoded signature as hex.
        der: String,
    },
    /// Strict DER decode with canonicality defects.
    Decode {
        /// DER-encoded signature as hex.
        der: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(found_vulnerabilities) => {
            if found_vulnerabilities {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let curve = Curve::secp256k1();
    match cli.command {
        Command::Scan { input } => {
            let inputs = load_inputs(&input)?;
            let report = scan_for_vulnerabilities(&curve, &inputs);
            println!("{}", format_scan(&report, cli.json)?);
            Ok(report.vulnerability_count() > 0)
        }
        Command::Variants { der } => {
            let bytes = hex::decode(der.trim())?;
            let catalogue = variants::generate_variants(&curve, &bytes)?;
            println!("{}", format_variants(&curve, &catalogue, cli.json)?);
            Ok(false)
        }
        Command::Decode { der } => {
            let bytes = hex::decode(der.trim())?;
            let decoded = der::decode(&bytes)?;
            println!("{}", format_decode(&decoded, cli.json)?);
            Ok(false)
        }
    }
}

#[derive(Serialize)]
struct ScanOutput {
    findings: Vec<FindingOutput>,
    summary: SummaryOutput,
}

#[derive(Serialize)]
struct FindingOutput {
    #[serde(rename = "type")]
    finding_type: String,
    severity: String,
    indices: Vec<usize>,
    detail: String,
    recovered_key: Option<RecoveredKeyOutput>,
}

#[derive(Serialize)]
struct RecoveredKeyOutput {
    private_key_hex: String,
    private_key_decimal: String,
    nonce_hex: String,
    confidence: String,
}

#[derive(Serialize)]
struct SummaryOutput {
    total_signatures: usize,
    analyzed: usize,
    could_not_analyze: usize,
    vulnerabilities_found: usize,
    keys_recovered: usize,
}

fn finding_output(finding: &Finding) -> FindingOutput {
    FindingOutput {
        finding_type: finding.kind.as_str().to_string(),
        severity: finding.severity.as_str().to_string(),
        indices: finding.indices.clone(),
        detail: finding.detail.clone(),
        recovered_key: finding.recovered_key.as_ref().map(|key| RecoveredKeyOutput {
            private_key_hex: hex::encode(key.private_key.to_bytes_be()),
            private_key_decimal: key.private_key.value().to_string(),
            nonce_hex: hex::encode(key.nonce.to_bytes_be()),
            confidence: match key.confidence {
                sigscan::scanner::Confidence::High => "high".to_string(),
                sigscan::scanner::Confidence::Low => "low".to_string(),
            },
        }),
    }
}

fn format_scan(report: &ScanReport, json: bool) -> Result<String> {
    let output = ScanOutput {
        findings: report.findings.iter().map(finding_output).collect(),
        summary: SummaryOutput {
            total_signatures: report.total,
            analyzed: report.analyzed.len(),
            could_not_analyze: report.unanalyzable.len(),
            vulnerabilities_found: report.vulnerability_count(),
            keys_recovered: report.keys_recovered(),
        },
    };

    if json {
        return Ok(serde_json::to_string_pretty(&output)?);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Analyzed {} of {} signatures ({} could not be analyzed)\n\n",
        output.summary.analyzed, output.summary.total_signatures, output.summary.could_not_analyze
    ));

    if output.summary.vulnerabilities_found == 0 {
        out.push_str("No vulnerabilities found.\n");
    } else {
        out.push_str(&format!(
            "Found {} vulnerabilities:\n\n",
            output.summary.vulnerabilities_found
        ));
    }

    for (i, finding) in output.findings.iter().enumerate() {
        out.push_str(&format!("Finding #{}\n", i + 1));
        out.push_str(&format!("  Type: {}\n", finding.finding_type));
        out.push_str(&format!("  Severity: {}\n", finding.severity));
        out.push_str(&format!(
            "  Signatures: {}\n",
            finding
                .indices
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        out.push_str(&format!("  Detail: {}\n", finding.detail));
        if let Some(key) = &finding.recovered_key {
            out.push_str(&format!("  Private Key (hex): {}\n", key.private_key_hex));
            out.push_str(&format!(
                "  Private Key (decimal): {}\n",
                key.private_key_decimal
            ));
            out.push_str(&format!("  Nonce (hex): {}\n", key.nonce_hex));
            out.push_str(&format!("  Confidence: {}\n", key.confidence));
        }
        out.push('\n');
    }

    Ok(out)
}

#[derive(Serialize)]
struct VariantOutput {
    category: String,
    bytes: String,
    canonical: bool,
    description: String,
}

fn format_variants(
    curve: &Curve,
    catalogue: &[variants::DerVariant],
    json: bool,
) -> Result<String> {
    let outputs: Vec<VariantOutput> = catalogue
        .iter()
        .map(|v| VariantOutput {
            category: v.kind.as_str().to_string(),
            bytes: hex::encode(&v.bytes),
            canonical: variants::is_canonical(curve, &v.bytes),
            description: v.description.clone(),
        })
        .collect();

    if json {
        return Ok(serde_json::to_string_pretty(&outputs)?);
    }

    let mut out = String::new();
    for variant in &outputs {
        out.push_str(&format!("{}\n", variant.category));
        out.push_str(&format!("  Bytes: {}\n", variant.bytes));
        out.push_str(&format!("  Canonical: {}\n", variant.canonical));
        out.push_str(&format!("  Why: {}\n\n", variant.description));
    }
    Ok(out)
}

#[derive(Serialize)]
struct DecodeOutput {
    r: String,
    s: String,
    canonical: bool,
    defects: Vec<String>,
}

fn format_decode(decoded: &der::DecodedDer, json: bool) -> Result<String> {
    let output = DecodeOutput {
        r: hex::encode(&decoded.r),
        s: hex::encode(&decoded.s),
        canonical: decoded.defects.is_empty(),
        defects: decoded.defects.iter().map(|d| d.to_string()).collect(),
    };

    if json {
        return Ok(serde_json::to_string_pretty(&output)?);
    }

    let mut out = String::new();
    out.push_str(&format!("R: {}\n", output.r));
    out.push_str(&format!("S: {}\n", output.s));
    out.push_str(&format!("Canonical: {}\n", output.canonical));
    for defect in &output.defects {
        out.push_str(&format!("Defect: {defect}\n"));
    }
    Ok(out)
}
