//! Three-column `.dat` curve files.
//!
//! ```text
//! ### DATA:
//!
//! 3
//! Q I(Q) Error
//! 1e-2 1.5e3 2e0
//! ...
//!
//! ### HEADER:
//!
//! { "label": ..., "history": [...], "counters": {...} }
//! ```
//!
//! Values are written in the shortest scientific notation that parses back
//! to the same `f64`, so a saved curve loads bit-for-bit identical.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::{Curve, HistoryEntry, Layer, Provenance};
use crate::error::{Result, SaxsError};

const DATA_MARKER: &str = "### DATA";
const HEADER_MARKER: &str = "### HEADER";

/// JSON block stored after the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveHeader {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub counters: BTreeMap<String, f64>,
}

/// Write the active selected range of `curve` and its identity.
pub fn write_dat<W: Write>(mut out: W, curve: &Curve) -> Result<()> {
    let (q, i, err) = (curve.q(), curve.i(), curve.err());
    writeln!(out, "{}:", DATA_MARKER)?;
    writeln!(out)?;
    writeln!(out, "{}", q.len())?;
    writeln!(out, "Q I(Q) Error")?;
    for k in 0..q.len() {
        writeln!(out, "{:e} {:e} {:e}", q[k], i[k], err[k])?;
    }
    writeln!(out)?;
    writeln!(out, "{}:", HEADER_MARKER)?;
    writeln!(out)?;

    let header = CurveHeader {
        label: Some(curve.label().to_string()),
        history: curve.provenance().history().to_vec(),
        counters: curve.counters().clone(),
    };
    serde_json::to_writer_pretty(&mut out, &header)?;
    writeln!(out)?;
    Ok(())
}

pub fn save_dat(path: impl AsRef<Path>, curve: &Curve) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_dat(&mut writer, curve)?;
    writer.flush()?;
    debug!("wrote {} points of `{}` to {}", curve.len(), curve.label(), path.display());
    Ok(())
}

/// Parse the text of a curve file.
///
/// Lines whose first token is not a number are skipped until the header
/// marker. A lone integer is the declared point count and must match the
/// rows read. Files without a header take `default_label`.
pub fn parse_dat(text: &str, default_label: &str) -> Result<Curve> {
    let mut layer = Layer::default();
    let mut declared: Option<usize> = None;
    let mut header_text: Option<String> = None;

    let mut lines = text.lines().enumerate();
    while let Some((index, line)) = lines.next() {
        let trimmed = line.trim();
        if trimmed.starts_with(HEADER_MARKER) {
            let rest: Vec<&str> = lines.by_ref().map(|(_, l)| l).collect();
            header_text = Some(rest.join("\n"));
            break;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens[0].parse::<f64>().is_err() {
            continue;
        }
        if tokens.len() == 1 {
            let count = tokens[0].parse::<usize>().map_err(|_| SaxsError::Format {
                line: index + 1,
                reason: format!("expected a point count, found `{}`", tokens[0]),
            })?;
            declared = Some(count);
            continue;
        }
        if tokens.len() < 3 {
            return Err(SaxsError::Format {
                line: index + 1,
                reason: "expected q, intensity and error columns".to_string(),
            });
        }
        let mut values = [0.0; 3];
        for (slot, token) in values.iter_mut().zip(&tokens) {
            *slot = token.parse::<f64>().map_err(|_| SaxsError::Format {
                line: index + 1,
                reason: format!("`{}` is not a number", token),
            })?;
        }
        layer.q.push(values[0]);
        layer.i.push(values[1]);
        layer.err.push(values[2]);
    }

    if layer.is_empty() {
        return Err(SaxsError::Format {
            line: 0,
            reason: "no data rows".to_string(),
        });
    }
    if let Some(count) = declared {
        if count != layer.len() {
            return Err(SaxsError::Format {
                line: 0,
                reason: format!("declared {} points but read {}", count, layer.len()),
            });
        }
    }

    let header = match header_text.as_deref().map(str::trim) {
        Some(json) if !json.is_empty() => serde_json::from_str::<CurveHeader>(json)?,
        _ => CurveHeader::default(),
    };
    let provenance = Provenance::with_history(
        header.label.unwrap_or_else(|| default_label.to_string()),
        header.history,
    );

    let mut curve = Curve::with_provenance(provenance, layer);
    for (name, value) in header.counters {
        curve.set_counter(name, value);
    }
    Ok(curve)
}

/// Load a curve file, labelled by its stem unless the header says otherwise.
pub fn load_dat(path: impl AsRef<Path>) -> Result<Curve> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_dat(&text, &stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::subtract;
    use crate::data::Operation;

    fn sample() -> Curve {
        let q: Vec<f64> = (1..=20).map(|k| 0.0137 * k as f64).collect();
        let i = q.iter().map(|v| 1.0 / (1.0 + v * v) + 0.1).collect();
        let e = q.iter().map(|v| 0.01 + v / 7.0).collect();
        Curve::new("lyso", q, i, e).unwrap()
    }

    #[test]
    fn test_round_trip_through_file() {
        let curve = sample();
        let buffer = Curve::new("buf", curve.q().to_vec(), vec![0.1; 20], vec![0.01; 20]).unwrap();
        let mut subtracted = subtract(&curve, &buffer, false).unwrap();
        subtracted.set_counter("I1", 1250.5);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dat");
        save_dat(&path, &subtracted).unwrap();
        let loaded = load_dat(&path).unwrap();

        assert_eq!(loaded.q(), subtracted.q());
        assert_eq!(loaded.i(), subtracted.i());
        assert_eq!(loaded.err(), subtracted.err());
        assert_eq!(loaded.provenance(), subtracted.provenance());
        assert_eq!(loaded.counters(), subtracted.counters());
        assert_eq!(loaded.provenance().last_operation(), Some(Operation::Subtract));
    }

    #[test]
    fn test_writes_selected_active_range() {
        let mut curve = sample();
        curve.set_scale(2.0);
        curve.set_q_range(2, 5).unwrap();
        let mut out = Vec::new();
        write_dat(&mut out, &curve).unwrap();

        let loaded = parse_dat(std::str::from_utf8(&out).unwrap(), "x").unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.i(), curve.i());
        assert_eq!(loaded.label(), "lyso");
    }

    #[test]
    fn test_plain_columns_use_default_label() {
        let text = "# exported\nq I err\n0.01 10 1\n0.02 9 1\n0.03 8 1\n";
        let curve = parse_dat(text, "plain").unwrap();
        assert_eq!(curve.label(), "plain");
        assert_eq!(curve.q(), &[0.01, 0.02, 0.03]);
        assert!(curve.provenance().history().is_empty());
    }

    #[test]
    fn test_malformed_files() {
        assert!(matches!(
            parse_dat("0.01 10\n", "x"),
            Err(SaxsError::Format { line: 1, .. })
        ));
        assert!(matches!(
            parse_dat("0.01 10 abc\n", "x"),
            Err(SaxsError::Format { .. })
        ));
        assert!(matches!(
            parse_dat("### DATA:\n\n3\nQ I E\n0.1 1 1\n", "x"),
            Err(SaxsError::Format { .. })
        ));
        assert!(matches!(parse_dat("", "x"), Err(SaxsError::Format { .. })));
        assert!(matches!(
            parse_dat("0.1 1 1\n### HEADER:\n{not json", "x"),
            Err(SaxsError::Json(_))
        ));
    }
}
