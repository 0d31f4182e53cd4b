//! TSV and NPY I/O for the causality pipeline.
//!
//! Readers: whitespace/tab-delimited subject time series (with the all-NaN
//! sentinel first column dropped), the combined long-format score table, and
//! per-pair numerical tables.
//!
//! Writers: the same tables plus a minimal NPY v1.0 writer/reader (no
//! dependency on an npy crate — we only need C-order `<f8` / `<i8` arrays).
use anyhow::{bail, Context, Result};
use ndarray::{Array2, Array3};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Column header of the combined per-subject table. The `SymetricGCS`
/// spelling is part of the on-disk format and is kept as-is.
pub const LONG_TABLE_HEADER: &str = "time-lags\tROIx\tROIy\tSymetricGCS\tGCS";

/// One row of the combined long-format table: the directed score for
/// `roi_x --> roi_y` at `lag`, plus the (currently always zero) symmetric
/// placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct PairScoreRow {
    pub lag: i64,
    pub roi_x: usize,
    pub roi_y: usize,
    pub symmetric: f64,
    pub directed: f64,
}

/// Subject identifier derived from a file or directory name: everything
/// before the first `.` and then before the first `_`
/// (`sub-0001_TS.txt` → `sub-0001`).
pub fn subject_name(file_name: &str) -> String {
    file_name
        .split('.')
        .next()
        .unwrap_or(file_name)
        .split('_')
        .next()
        .unwrap_or(file_name)
        .to_string()
}

// ── Subject time series ───────────────────────────────────────────────────────

/// Load a subject time-series matrix (time-points × ROIs) from a
/// whitespace/tab-delimited text file.
///
/// Some exports carry an all-NaN first column as a placeholder; it is
/// detected and dropped here so callers always see real ROI columns.
pub fn load_time_series(path: &Path) -> Result<Array2<f64>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading time series {}", path.display()))?;

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (ln, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row: Vec<f64> = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>()
                    .with_context(|| format!("{}:{}: bad value {tok:?}", path.display(), ln + 1))
            })
            .collect::<Result<_>>()?;
        if let Some(first) = rows.first() {
            if row.len() != first.len() {
                bail!(
                    "{}:{}: ragged row ({} values, expected {})",
                    path.display(),
                    ln + 1,
                    row.len(),
                    first.len()
                );
            }
        }
        rows.push(row);
    }
    if rows.is_empty() {
        bail!("{}: empty time-series file", path.display());
    }

    let n_t = rows.len();
    let mut n_roi = rows[0].len();
    let drop_first = rows.iter().all(|r| r[0].is_nan());
    let offset = if drop_first {
        n_roi -= 1;
        1
    } else {
        0
    };
    if n_roi == 0 {
        bail!("{}: no ROI columns left after sentinel drop", path.display());
    }

    let mut out = Array2::<f64>::zeros((n_t, n_roi));
    for (t, row) in rows.iter().enumerate() {
        for c in 0..n_roi {
            out[[t, c]] = row[c + offset];
        }
    }
    Ok(out)
}

// ── Combined long-format table ────────────────────────────────────────────────

/// Write the combined per-subject table (overwrites any previous run).
pub fn write_long_table(path: &Path, rows: &[PairScoreRow]) -> Result<()> {
    let mut buf = String::with_capacity(32 * (rows.len() + 1));
    buf.push_str(LONG_TABLE_HEADER);
    buf.push('\n');
    for r in rows {
        buf.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\n",
            r.lag, r.roi_x, r.roi_y, r.symmetric, r.directed
        ));
    }
    fs::write(path, buf).with_context(|| format!("writing table {}", path.display()))
}

/// Read a combined per-subject table back into rows.
///
/// ROI columns are parsed as floats first: tables written by other tooling
/// store them as `1.0`-style floats.
pub fn read_long_table(path: &Path) -> Result<Vec<PairScoreRow>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading table {}", path.display()))?;
    let mut lines = text.lines();
    let header = lines.next().context("empty table")?;
    let cols: Vec<&str> = header.split('\t').map(str::trim).collect();
    if cols != LONG_TABLE_HEADER.split('\t').collect::<Vec<_>>() {
        bail!("{}: unexpected header {header:?}", path.display());
    }

    let mut rows = Vec::new();
    for (ln, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let f: Vec<&str> = line.split('\t').collect();
        if f.len() != 5 {
            bail!("{}:{}: expected 5 fields, got {}", path.display(), ln + 2, f.len());
        }
        let num = |s: &str| -> Result<f64> {
            s.trim()
                .parse::<f64>()
                .with_context(|| format!("{}:{}: bad value {s:?}", path.display(), ln + 2))
        };
        rows.push(PairScoreRow {
            lag: num(f[0])? as i64,
            roi_x: num(f[1])? as usize,
            roi_y: num(f[2])? as usize,
            symmetric: num(f[3])?,
            directed: num(f[4])?,
        });
    }
    Ok(rows)
}

// ── Per-pair numerical tables ─────────────────────────────────────────────────

/// Contents of one `Numerical/<subject>_GC_rois-<x>vs<y>.tsv` file.
///
/// `symmetric` is only present in RCC-style files (`<prefix> x <--> y`
/// column); GC files carry the two directed columns and `symmetric` is
/// filled with zeros on read.
#[derive(Debug, Clone)]
pub struct PairTable {
    pub roi_x: usize,
    pub roi_y: usize,
    pub lags: Vec<i64>,
    pub symmetric: Vec<f64>,
    pub forward: Vec<f64>,
    pub backward: Vec<f64>,
}

/// Write a GC per-pair table: `time-lags`, `GCS x --> y`, `GCS y --> x`.
pub fn write_pair_table(path: &Path, t: &PairTable, prefix: &str) -> Result<()> {
    let mut buf = String::new();
    buf.push_str(&format!(
        "time-lags\t{prefix} {x} --> {y}\t{prefix} {y} --> {x}\n",
        x = t.roi_x,
        y = t.roi_y
    ));
    for k in 0..t.lags.len() {
        buf.push_str(&format!("{}\t{}\t{}\n", t.lags[k], t.forward[k], t.backward[k]));
    }
    fs::write(path, buf).with_context(|| format!("writing pair table {}", path.display()))
}

/// Parse a per-pair table, recovering the ROI indices from the score-column
/// headers (`<prefix> <x> --> <y>` / `<prefix> <x> <--> <y>`).
pub fn read_pair_table(path: &Path, prefix: &str) -> Result<PairTable> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading pair table {}", path.display()))?;
    let mut lines = text.lines();
    let header = lines.next().context("empty pair table")?;
    let cols: Vec<&str> = header.split('\t').map(str::trim).collect();
    if cols.first() != Some(&"time-lags") {
        bail!("{}: first column must be time-lags", path.display());
    }

    // (roi_a, roi_b, symmetric?) per score column.
    struct Col {
        a: usize,
        b: usize,
        sym: bool,
    }
    let mut parsed: Vec<Col> = Vec::new();
    for col in &cols[1..] {
        let tok: Vec<&str> = col.split(' ').collect();
        if tok.len() != 4 || tok[0] != prefix {
            bail!("{}: unexpected score column {col:?}", path.display());
        }
        let a: usize = tok[1].parse().with_context(|| format!("bad ROI in {col:?}"))?;
        let b: usize = tok[3].parse().with_context(|| format!("bad ROI in {col:?}"))?;
        let sym = match tok[2] {
            "-->" => false,
            "<-->" => true,
            other => bail!("{}: unexpected arrow {other:?} in {col:?}", path.display()),
        };
        parsed.push(Col { a, b, sym });
    }
    let first = parsed.first().context("pair table has no score columns")?;
    let (roi_x, roi_y) = (first.a, first.b);

    let mut lags = Vec::new();
    let mut data: Vec<Vec<f64>> = vec![Vec::new(); parsed.len()];
    for (ln, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let f: Vec<&str> = line.split('\t').collect();
        if f.len() != cols.len() {
            bail!("{}:{}: expected {} fields", path.display(), ln + 2, cols.len());
        }
        lags.push(
            f[0].trim()
                .parse::<f64>()
                .with_context(|| format!("{}:{}: bad lag", path.display(), ln + 2))?
                as i64,
        );
        for (c, v) in f[1..].iter().enumerate() {
            data[c].push(
                v.trim()
                    .parse::<f64>()
                    .with_context(|| format!("{}:{}: bad value {v:?}", path.display(), ln + 2))?,
            );
        }
    }

    let n = lags.len();
    let mut symmetric = vec![0.0; n];
    let mut forward = vec![0.0; n];
    let mut backward = vec![0.0; n];
    for (col, values) in parsed.iter().zip(data.into_iter()) {
        if col.sym {
            symmetric = values;
        } else if col.a == roi_x && col.b == roi_y {
            forward = values;
        } else if col.a == roi_y && col.b == roi_x {
            backward = values;
        } else {
            bail!("{}: score column for foreign pair {}-{}", path.display(), col.a, col.b);
        }
    }

    Ok(PairTable { roi_x, roi_y, lags, symmetric, forward, backward })
}

// ── Minimal NPY v1.0 ──────────────────────────────────────────────────────────
//
// Layout: b"\x93NUMPY" + version (1, 0) + u16 LE header length + a Python
// dict literal padded with spaces to 64-byte alignment, ending in '\n',
// then the raw C-order data.

fn npy_header(descr: &str, shape: &[usize]) -> Vec<u8> {
    let shape_str = match shape.len() {
        1 => format!("({},)", shape[0]),
        _ => format!(
            "({})",
            shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    };
    let dict = format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape_str}, }}");
    let unpadded = 10 + dict.len() + 1; // magic+version+len field, dict, '\n'
    let pad = (64 - unpadded % 64) % 64;
    let header_len = dict.len() + pad + 1;

    let mut out = Vec::with_capacity(10 + header_len);
    out.extend_from_slice(b"\x93NUMPY\x01\x00");
    out.extend_from_slice(&(header_len as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.extend(std::iter::repeat(b' ').take(pad));
    out.push(b'\n');
    out
}

fn write_npy(path: &Path, descr: &str, shape: &[usize], data: &[u8]) -> Result<()> {
    let mut f =
        fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    f.write_all(&npy_header(descr, shape))?;
    f.write_all(data)?;
    Ok(())
}

/// Write a C-order `<f8` array.
pub fn write_npy_f64(path: &Path, shape: &[usize], data: &[f64]) -> Result<()> {
    let n: usize = shape.iter().product();
    if n != data.len() {
        bail!("shape {shape:?} does not match {} elements", data.len());
    }
    let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    write_npy(path, "<f8", shape, &bytes)
}

/// Write a 1-D `<i8` (64-bit integer) array.
pub fn write_npy_i64(path: &Path, data: &[i64]) -> Result<()> {
    let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    write_npy(path, "<i8", &[data.len()], &bytes)
}

fn read_npy(path: &Path, want_descr: &str) -> Result<(Vec<usize>, Vec<u8>)> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if bytes.len() < 10 || &bytes[..6] != b"\x93NUMPY" {
        bail!("{}: not an NPY file", path.display());
    }
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    if bytes.len() < 10 + header_len {
        bail!("{}: truncated NPY header", path.display());
    }
    let header = std::str::from_utf8(&bytes[10..10 + header_len])
        .with_context(|| format!("{}: non-UTF8 NPY header", path.display()))?;

    let grab = |key: &str| -> Result<&str> {
        let at = header
            .find(key)
            .with_context(|| format!("{}: NPY header missing {key}", path.display()))?;
        Ok(header[at + key.len()..].trim_start())
    };
    let descr = grab("'descr':")?;
    if !descr.starts_with(&format!("'{want_descr}'")) {
        bail!("{}: expected dtype {want_descr}, header {header:?}", path.display());
    }
    let order = grab("'fortran_order':")?;
    if !order.starts_with("False") {
        bail!("{}: fortran-order arrays unsupported", path.display());
    }
    let shape_src = grab("'shape':")?;
    let close = shape_src
        .find(')')
        .with_context(|| format!("{}: malformed shape", path.display()))?;
    let shape: Vec<usize> = shape_src[1..close]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().context("bad shape entry"))
        .collect::<Result<_>>()?;

    Ok((shape, bytes[10 + header_len..].to_vec()))
}

/// Read a C-order `<f8` array of any rank.
pub fn read_npy_f64(path: &Path) -> Result<(Vec<usize>, Vec<f64>)> {
    let (shape, raw) = read_npy(path, "<f8")?;
    let n: usize = shape.iter().product();
    if raw.len() < n * 8 {
        bail!("{}: truncated NPY payload", path.display());
    }
    let data = raw
        .chunks_exact(8)
        .take(n)
        .map(|b| f64::from_le_bytes(b.try_into().unwrap()))
        .collect();
    Ok((shape, data))
}

/// Read a 1-D `<i8` array.
pub fn read_npy_i64(path: &Path) -> Result<Vec<i64>> {
    let (shape, raw) = read_npy(path, "<i8")?;
    let n: usize = shape.iter().product();
    if raw.len() < n * 8 {
        bail!("{}: truncated NPY payload", path.display());
    }
    Ok(raw
        .chunks_exact(8)
        .take(n)
        .map(|b| i64::from_le_bytes(b.try_into().unwrap()))
        .collect())
}

/// Persist an effective-connectivity tensor (lags × ROIs × ROIs).
pub fn save_tensor(path: &Path, tensor: &Array3<f64>) -> Result<()> {
    let data: Vec<f64> = tensor.iter().copied().collect();
    write_npy_f64(path, tensor.shape(), &data)
}

/// Load a 3-D tensor written by [`save_tensor`].
pub fn load_tensor(path: &Path) -> Result<Array3<f64>> {
    let (shape, data) = read_npy_f64(path)?;
    if shape.len() != 3 {
        bail!("{}: expected a 3-D tensor, got shape {shape:?}", path.display());
    }
    Ok(Array3::from_shape_vec((shape[0], shape[1], shape[2]), data)?)
}
