//! GNOM output parsing and the DATGNOM/GNOM command-line runner.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info, warn};

use super::{Dmax, PddfResult, PddfService};
use crate::data::Curve;
use crate::error::{Result, SaxsError};
use crate::io::save_dat;

/// Messages after which retrying DATGNOM without an Rg hint may help.
const RETRY_MESSAGES: [&str; 2] = ["Cannot define Dmax", "Could not find Rg"];

/// Messages that mean the run produced nothing usable.
const FAILURE_MESSAGES: [&str; 4] = [
    "Cannot define Dmax",
    "Could not find Rg",
    "No intensity values (positive) found",
    "LOADATF --E- No data lines recognized.",
];

/// Lines skipped between the "Distance distribution" title and the first row.
const TABLE_SKIP: usize = 4;

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || c == '=' || c == ':' || c == ',')
        .filter(|t| !t.is_empty())
}

/// Numbers following the first occurrence of `key` in `line`.
fn numbers_after(line: &str, key: &str) -> Vec<f64> {
    match line.find(key) {
        Some(at) => tokens(&line[at + key.len()..])
            .map_while(|t| if t == "+-" { Some(None) } else { t.parse::<f64>().ok().map(Some) })
            .flatten()
            .collect(),
        None => Vec::new(),
    }
}

fn parse_row(line: &str) -> Option<(f64, f64, f64)> {
    let values: Vec<f64> = line
        .split_whitespace()
        .map(|t| t.parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    if values.len() < 3 {
        return None;
    }
    Some((values[0], values[1], values[2]))
}

/// Parse the text of a GNOM `.out` file.
pub fn parse_gnom_out(text: &str) -> Result<PddfResult> {
    let failed = |what: &str| SaxsError::ExternalToolFailed(format!("GNOM output has no {}", what));
    let lines: Vec<&str> = text.lines().collect();

    let title = lines
        .iter()
        .position(|l| l.contains("Distance distribution"))
        .ok_or_else(|| failed("distance distribution"))?;
    let (mut r, mut pr, mut pr_err) = (Vec::new(), Vec::new(), Vec::new());
    for line in lines.iter().skip(title + 1 + TABLE_SKIP) {
        if line.trim().is_empty() && r.is_empty() {
            continue;
        }
        match parse_row(line) {
            Some((a, b, c)) => {
                r.push(a);
                pr.push(b);
                pr_err.push(c);
            }
            None => break,
        }
    }
    if r.is_empty() {
        return Err(failed("P(r) rows"));
    }

    let mut real: Option<(Vec<f64>, Vec<f64>)> = None;
    let mut reciprocal: Option<(f64, f64)> = None;
    let mut total_estimate = None;
    let mut quality = None;
    let mut chi_squared = None;

    for line in &lines {
        let normalized = line.split_whitespace().collect::<Vec<_>>().join(" ");
        let lower = normalized.to_ascii_lowercase();

        if lower.starts_with("real space") {
            let rg = numbers_after(&normalized, "Rg");
            let i0 = numbers_after(&normalized, "I(0)");
            if !rg.is_empty() && !i0.is_empty() {
                real = Some((rg, i0));
            }
        } else if lower.starts_with("reciprocal space") {
            let rg = numbers_after(&normalized, "Rg");
            let i0 = numbers_after(&normalized, "I(0)");
            if let (Some(rg), Some(i0)) = (rg.first(), i0.first()) {
                reciprocal = Some((*rg, *i0));
            }
        } else if let Some(at) = lower.find("total estimate") {
            let rest = normalized[at + "total estimate".len()..]
                .trim_start_matches(|c: char| c == ':' || c.is_whitespace());
            let (number, tail) = rest.split_once(' ').unwrap_or((rest, ""));
            total_estimate = number.parse::<f64>().ok();
            let verdict = tail
                .trim()
                .trim_start_matches("which is")
                .trim()
                .trim_matches(|c| c == '(' || c == ')')
                .trim();
            if !verdict.is_empty() {
                quality = Some(verdict.to_string());
            }
        } else if normalized.starts_with("Current ") {
            chi_squared = tokens(&normalized).nth(1).and_then(|t| t.parse().ok());
        }
    }

    let (real_rg, real_i0) = real.ok_or_else(|| failed("real-space Rg"))?;
    if real_rg.len() < 2 || real_i0.len() < 2 {
        return Err(failed("real-space Rg and I(0) with errors"));
    }
    let (reciprocal_rg, reciprocal_i0) = reciprocal.ok_or_else(|| failed("reciprocal-space Rg"))?;
    let dmax = r.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(PddfResult {
        r,
        pr,
        pr_err,
        dmax,
        rg: real_rg[0],
        rg_err: real_rg[1],
        i0: real_i0[0],
        i0_err: real_i0[1],
        reciprocal_rg,
        reciprocal_i0,
        total_estimate,
        quality,
        chi_squared,
    })
}

/// Runs ATSAS `datgnom` (automatic Dmax) or `gnom` (explicit Dmax).
#[derive(Debug, Clone)]
pub struct DatgnomService {
    atsas_dir: PathBuf,
    rg_hint: Option<f64>,
}

impl DatgnomService {
    pub fn new(atsas_dir: impl Into<PathBuf>) -> Self {
        Self {
            atsas_dir: atsas_dir.into(),
            rg_hint: None,
        }
    }

    /// Pass `-r <rg>` to DATGNOM. Non-positive values are ignored.
    pub fn with_rg_hint(mut self, rg: f64) -> Self {
        self.rg_hint = (rg > 0.0).then_some(rg);
        self
    }

    fn binary(&self, name: &str) -> Result<PathBuf> {
        let file = if cfg!(windows) {
            format!("{}.exe", name)
        } else {
            name.to_string()
        };
        let path = self.atsas_dir.join(file);
        if path.is_file() {
            Ok(path)
        } else {
            Err(SaxsError::ExternalToolUnavailable(format!(
                "{} not found",
                path.display()
            )))
        }
    }

    /// Run `program` and return its trimmed stderr.
    fn run(program: &Path, args: &[String]) -> Result<String> {
        debug!("running {} {}", program.display(), args.join(" "));
        let output = Command::new(program).args(args).output().map_err(|e| {
            SaxsError::ExternalToolUnavailable(format!("{}: {}", program.display(), e))
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            warn!("{} exited with {}: {}", program.display(), output.status, stderr);
        }
        Ok(stderr)
    }

    fn run_datgnom(&self, input: &Path, output: &Path) -> Result<String> {
        let program = self.binary("datgnom")?;
        let base = vec![
            input.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];
        let Some(rg) = self.rg_hint else {
            return Self::run(&program, &base);
        };

        let mut hinted = base.clone();
        hinted.push("-r".to_string());
        hinted.push(format!("{}", rg));
        let stderr = Self::run(&program, &hinted)?;
        if RETRY_MESSAGES.contains(&stderr.as_str()) {
            info!("datgnom: `{}` with Rg {}, retrying without it", stderr, rg);
            return Self::run(&program, &base);
        }
        Ok(stderr)
    }

    fn run_gnom(&self, input: &Path, output: &Path, dmax: f64) -> Result<String> {
        if !(dmax > 0.0 && dmax.is_finite()) {
            return Err(SaxsError::invalid("dmax", format!("{} is not a positive length", dmax)));
        }
        let program = self.binary("gnom")?;
        let args = vec![
            format!("--rmax={}", dmax),
            format!("--output={}", output.display()),
            input.display().to_string(),
        ];
        Self::run(&program, &args)
    }
}

impl PddfService for DatgnomService {
    fn compute(&self, curve: &Curve, dmax: Dmax) -> Result<PddfResult> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("pddf_input.dat");
        let output = scratch.path().join("pddf_input.out");
        save_dat(&input, curve)?;

        let stderr = match dmax {
            Dmax::Auto => self.run_datgnom(&input, &output)?,
            Dmax::Explicit(d) => self.run_gnom(&input, &output, d)?,
        };
        if FAILURE_MESSAGES.contains(&stderr.as_str()) {
            warn!("{}: PDDF program failed: {}", curve.label(), stderr);
            return Err(SaxsError::ExternalToolFailed(stderr));
        }
        if !output.is_file() {
            return Err(SaxsError::ExternalToolFailed(format!(
                "no output file was written for `{}`",
                curve.label()
            )));
        }

        let result = parse_gnom_out(&std::fs::read_to_string(&output)?)?;
        info!(
            "{}: Dmax {:.2}, real-space Rg {:.3} +- {:.3}",
            curve.label(),
            result.dmax,
            result.rg,
            result.rg_err
        );
        Ok(result)
    }
}
