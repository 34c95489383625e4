//! Field-path grammar and string machinery.
//!
//! Paths address one node inside a document tree:
//!
//! ```text
//! path    := "$" segment*
//! segment := "." name | "[" idx "]"
//! idx     := integer | "*"
//! ```
//!
//! `[*]` marks the array-expansion point and is only legal inside an
//! expansion group (see `project::expansion`). The bracket forms `[-]` and
//! `[min:max]` belong to display names produced by field discovery, never to
//! resolution paths.

use crate::error::QuernError;
use once_cell::sync::Lazy;
use regex::Regex;

static PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$(?:\.[^.\[\]]+|\[(?:\d+|\*)\])*$").unwrap());

static RANGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+):(\d+)$").unwrap());

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Descend into the named member of a record.
    Child(String),
    /// Select the element at a zero-based array index.
    Index(usize),
    /// The `[*]` array-expansion marker.
    Expand,
}

/// Parse a `$`-rooted path into segments.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, QuernError> {
    if !PATH_RE.is_match(path) {
        return Err(QuernError::InvalidPath(path.to_string()));
    }

    let bytes = path.as_bytes();
    let mut segments = Vec::new();
    let mut i = 1; // skip the '$' root
    while i < bytes.len() {
        match bytes[i] {
            b'.' => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end] != b'.' && bytes[end] != b'[' {
                    end += 1;
                }
                segments.push(PathSegment::Child(path[start..end].to_string()));
                i = end;
            }
            b'[' => {
                let close = path[i..]
                    .find(']')
                    .map(|off| i + off)
                    .ok_or_else(|| QuernError::InvalidPath(path.to_string()))?;
                let inner = &path[i + 1..close];
                if inner == "*" {
                    segments.push(PathSegment::Expand);
                } else {
                    let idx = inner
                        .parse::<usize>()
                        .map_err(|_| QuernError::InvalidPath(path.to_string()))?;
                    segments.push(PathSegment::Index(idx));
                }
                i = close + 1;
            }
            _ => return Err(QuernError::InvalidPath(path.to_string())),
        }
    }

    Ok(segments)
}

/// Replace any `.` inside `${...}` variable references with `_` so that dots
/// outside references are unambiguous path separators.
///
/// Idempotent; text outside variable references is untouched. An unclosed
/// `${` leaves the remainder of the string as-is.
pub fn cleanse_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    loop {
        let Some(start) = rest.find("${") else {
            out.push_str(rest);
            return out;
        };
        let body = start + 2;
        let Some(end) = rest[body..].find('}') else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..body]);
        out.push_str(&rest[body..body + end].replace('.', "_"));
        rest = &rest[body + end..];
    }
}

/// Number of bracketed array parts in a path or display name.
pub fn bracket_count(s: &str) -> usize {
    s.matches('[').count()
}

/// Rewrite the `[-]` placeholders in a discovery path to the minimum index
/// recorded in the corresponding `[min:max]` range of the display name.
///
/// A concrete `[k]` bracket in the path terminates the rewrite; the rest of
/// the path is kept verbatim.
pub fn set_min_array_indexes(name: &str, path: &str) -> String {
    if !name.contains('[') {
        return path.to_string();
    }

    let mut out = String::with_capacity(path.len());
    let mut temp = path;
    let mut comp = name;
    while let Some(open) = temp.find('[') {
        let close = match temp.find(']') {
            Some(c) if c > open => c,
            _ => break,
        };
        if &temp[open + 1..close] != "-" {
            break;
        }
        let (copen, cclose) = match (comp.find('['), comp.find(']')) {
            (Some(o), Some(c)) if c > o => (o, c),
            _ => break,
        };
        let range = &comp[copen + 1..cclose];
        let min = range.split(':').next().unwrap_or(range);

        out.push_str(&temp[..open]);
        out.push('[');
        out.push_str(min);
        out.push(']');
        temp = &temp[close + 1..];
        comp = &comp[cclose + 1..];
    }
    out.push_str(temp);
    out
}

/// Merge the array ranges observed in `update` (each `[i:i]`) into the ranged
/// display name `name`, raising each range's upper bound where the update
/// exceeds it. Lower bounds are retained.
///
/// A rangeless bracket in `name` terminates the merge with the remainder kept
/// verbatim. Unequal bracket counts are a shape mismatch.
pub fn update_max_array_indexes(name: &str, update: &str) -> Result<String, QuernError> {
    if !name.contains('[') {
        return Ok(name.to_string());
    }
    if bracket_count(name) != bracket_count(update) {
        return Err(QuernError::ArrayShapeMismatch {
            name: name.to_string(),
            update: update.to_string(),
        });
    }

    let mut out = String::with_capacity(name.len());
    let mut temp = name;
    let mut comp = update;
    while let Some(open) = temp.find('[') {
        let close = match temp.find(']') {
            Some(c) if c > open => c,
            _ => break,
        };
        let inner = &temp[open + 1..close];
        let Some(orig) = RANGE_RE.captures(inner) else {
            break;
        };

        let (copen, cclose) = match (comp.find('['), comp.find(']')) {
            (Some(o), Some(c)) if c > o => (o, c),
            _ => {
                return Err(QuernError::ArrayShapeMismatch {
                    name: name.to_string(),
                    update: update.to_string(),
                })
            }
        };
        let comp_inner = &comp[copen + 1..cclose];
        let comp_max = match RANGE_RE.captures(comp_inner) {
            Some(caps) => caps[2].parse::<u64>().unwrap_or(0),
            None => comp_inner.parse::<u64>().unwrap_or(0),
        };

        let orig_min = orig[1].parse::<u64>().unwrap_or(0);
        let orig_max = orig[2].parse::<u64>().unwrap_or(0);

        out.push_str(&temp[..open]);
        out.push('[');
        if comp_max > orig_max {
            out.push_str(&format!("{}:{}", orig_min, comp_max));
        } else {
            out.push_str(inner);
        }
        out.push(']');
        temp = &temp[close + 1..];
        comp = &comp[cclose + 1..];
    }
    out.push_str(temp);
    Ok(out)
}
