//! Skeleton centerline text format.
//!
//! One point per line as three whitespace-separated numbers. A blank line
//! ends the current branch:
//!
//! ```text
//! 0.0 0.0 0.0
//! 0.0 0.0 0.01
//!
//! 0.0 0.0 0.0
//! 0.01 0.0 0.0
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use nalgebra::Point3;
use tracing::debug;

use crate::{Branch, VesselError, VesselResult};

/// Parse branches from skeleton text.
///
/// A final branch without a trailing blank line is kept. Runs of blank
/// lines never produce empty branches.
///
/// # Errors
///
/// Returns [`VesselError::Parse`] with a 1-based line number for a line that
/// is not exactly three numbers, and [`VesselError::Io`] if reading fails.
///
/// # Example
///
/// ```
/// use vessel_model::parse_skeleton;
///
/// let text = "0 0 0\n0 0 1\n\n1 0 0\n2 0 0\n";
/// let branches = parse_skeleton(text.as_bytes()).unwrap();
/// assert_eq!(branches.len(), 2);
/// assert_eq!(branches[1].len(), 2);
/// ```
pub fn parse_skeleton<R: BufRead>(reader: R) -> VesselResult<Vec<Branch>> {
    let mut branches = Vec::new();
    let mut current: Branch = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if !current.is_empty() {
                branches.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(parse_point(trimmed, i + 1)?);
    }

    if !current.is_empty() {
        branches.push(current);
    }

    debug!(branches = branches.len(), "Parsed skeleton");
    Ok(branches)
}

fn parse_point(text: &str, line: usize) -> VesselResult<Point3<f64>> {
    let mut coords = [0.0; 3];
    let mut count = 0;

    for token in text.split_whitespace() {
        if count == 3 {
            return Err(VesselError::Parse {
                line,
                message: format!("expected 3 coordinates, found more in '{text}'"),
            });
        }
        coords[count] = token.parse::<f64>().map_err(|e| VesselError::Parse {
            line,
            message: format!("invalid coordinate '{token}': {e}"),
        })?;
        count += 1;
    }

    if count < 3 {
        return Err(VesselError::Parse {
            line,
            message: format!("expected 3 coordinates, found {count}"),
        });
    }

    Ok(Point3::new(coords[0], coords[1], coords[2]))
}

/// Load branches from a skeleton file.
///
/// # Errors
///
/// Returns [`VesselError::FileNotFound`] if the file does not exist, and the
/// errors of [`parse_skeleton`] otherwise.
pub fn load_skeleton<P: AsRef<Path>>(path: P) -> VesselResult<Vec<Branch>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            VesselError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            VesselError::Io(e)
        }
    })?;
    parse_skeleton(BufReader::new(file))
}

/// Write branches in skeleton format, one blank line after each branch.
///
/// # Errors
///
/// Returns [`VesselError::Io`] if writing fails.
pub fn write_skeleton<W: Write>(mut writer: W, branches: &[Branch]) -> VesselResult<()> {
    for branch in branches {
        for p in branch {
            writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}
