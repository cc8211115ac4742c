//! Input providers for loading signature batches from files or stdin.

use crate::signature::SignatureInput;
use anyhow::{bail, Result};
use std::io::{self, Read};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format {
    Json,
    Csv,
}

pub fn load_inputs(input: &str) -> Result<Vec<SignatureInput>> {
    let content = if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };

    parse_inputs(&content)
}

pub fn parse_inputs(content: &str) -> Result<Vec<SignatureInput>> {
    let content = content.strip_prefix(BOM).unwrap_or(content);
    match detect_format(content)? {
        Format::Json => parse_json(content),
        Format::Csv => parse_csv(content),
    }
}

const BOM: &str = "\u{FEFF}";

pub fn detect_format(content: &str) -> Result<Format> {
    let trimmed = content.strip_prefix(BOM).unwrap_or(content).trim_start();

    if trimmed.starts_with('[') {
        return Ok(Format::Json);
    }

    if let Some(first_line) = trimmed.lines().next() {
        let columns: Vec<String> = first_line
            .split(',')
            .map(|c| c.trim().to_lowercase())
            .collect();
        if columns.iter().any(|c| c == "der") {
            return Ok(Format::Csv);
        }
    }

    bail!("Unable to detect input format. Use a JSON array or CSV with a der column.")
}

fn parse_json(content: &str) -> Result<Vec<SignatureInput>> {
    Ok(serde_json::from_str(content)?)
}

fn parse_csv(content: &str) -> Result<Vec<SignatureInput>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut inputs = Vec::new();
    for result in reader.deserialize() {
        inputs.push(result?);
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_inputs() {
        let json = r#"[{"der": "3006020101020101", "z": "", "pubkey": ""}]"#;
        let inputs = parse_inputs(json).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].der, "3006020101020101");
        assert!(inputs[0].z.is_none());
    }

    #[test]
    fn test_parse_csv_inputs() {
        let csv = "der,z,pubkey\n3006020101020101,,\n";
        let inputs = parse_inputs(csv).unwrap();
        assert_eq!(inputs.len(), 1);
        assert!(inputs[0].pubkey.is_none());
    }

    #[test]
    fn test_auto_detect_json() {
        let json = r#"  [{"der": "30"}]"#;
        assert_eq!(detect_format(json).unwrap(), Format::Json);
    }

    #[test]
    fn test_auto_detect_csv() {
        let csv = "der,z\n30,aa";
        assert_eq!(detect_format(csv).unwrap(), Format::Csv);
    }

    #[test]
    fn test_bom_is_tolerated() {
        let csv = "\u{FEFF}der,z\n30,aa";
        assert_eq!(detect_format(csv).unwrap(), Format::Csv);
    }

    #[test]
    fn test_invalid_input_error() {
        assert!(parse_inputs("not a batch").is_err());
    }
}
