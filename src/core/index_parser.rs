//! Parsing of user-provided line lists.
//!
//! This module provides [`IndexParser`] which turns input like "1 3-5,8" into a
//! sorted, deduplicated list of view line numbers and validates it against the
//! size of the current view.
//!
//! # Public API
//! - [`IndexParser`]: Parser with static methods for parsing and validation
//!
//! # Supported Formats
//! - **Single lines**: `1`, `3`, `5`
//! - **Space-separated**: `1 3 5`
//! - **Comma-separated**: `1,3,5`
//! - **Ranges**: `3-6` (expands to 3,4,5,6)
//! - **Mixed combinations**: `1 3-5,8` (expands to 1,3,4,5,8)

use crate::core::error::{DashboardError, Result};
use std::collections::BTreeSet;

pub struct IndexParser;

impl IndexParser {
    pub fn parse(input: &str) -> Result<Vec<usize>> {
        let mut lines = BTreeSet::new();

        for part in input.split([' ', ',']).map(str::trim).filter(|s| !s.is_empty()) {
            match part.split_once('-') {
                Some((start, end)) => {
                    if end.contains('-') {
                        return Err(DashboardError::invalid_range_format(part));
                    }
                    let start: usize = start
                        .parse()
                        .map_err(|_| DashboardError::invalid_range_number(start))?;
                    let end: usize = end
                        .parse()
                        .map_err(|_| DashboardError::invalid_range_number(end))?;
                    if start > end {
                        return Err(DashboardError::invalid_range_order(start, end));
                    }
                    lines.extend(start..=end);
                }
                None => {
                    let line: usize = part
                        .parse()
                        .map_err(|_| DashboardError::invalid_number(part))?;
                    lines.insert(line);
                }
            }
        }

        Ok(lines.into_iter().collect())
    }

    /// Parse and require at least one line, all within `1..=max_line`
    pub fn parse_lines(input: &str, max_line: usize) -> Result<Vec<usize>> {
        let lines = Self::parse(input)?;
        if lines.is_empty() {
            return Err(DashboardError::NoIndicesProvided);
        }
        Self::validate(&lines, max_line)?;
        Ok(lines)
    }

    pub fn validate(lines: &[usize], max_line: usize) -> Result<()> {
        for &line in lines {
            if line == 0 {
                return Err(DashboardError::ZeroIndex);
            }
            if line > max_line {
                return Err(DashboardError::line_out_of_range(line, max_line));
            }
        }
        Ok(())
    }
}
