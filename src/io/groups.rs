//! Station group lists.
//!
//! One station per line; a line reading `99999999` closes the current group.
//! Blank lines and `#` comments are ignored, as is anything after the first
//! whitespace-separated token on a line. Stations after the last terminator form a
//! final group; an empty trailing group is dropped.

use std::fs;
use std::path::Path;

use crate::domain::StationGroup;
use crate::error::AppError;

/// Line that ends a group.
pub const GROUP_TERMINATOR: &str = "99999999";

/// Parse a station group list.
pub fn parse_station_groups(text: &str) -> Vec<StationGroup> {
    let mut groups = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in text.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        if token == GROUP_TERMINATOR {
            if !current.is_empty() {
                groups.push(StationGroup::new(std::mem::take(&mut current)));
            }
        } else {
            current.push(token.to_string());
        }
    }
    if !current.is_empty() {
        groups.push(StationGroup::new(current));
    }
    groups
}

/// Read a station group list from disk.
pub fn read_station_groups(path: &Path) -> Result<Vec<StationGroup>, AppError> {
    let text = fs::read_to_string(path).map_err(|e| {
        AppError::config(format!("Failed to read station list '{}': {e}", path.display()))
    })?;
    let groups = parse_station_groups(&text);
    if groups.is_empty() {
        return Err(AppError::config(format!(
            "Station list '{}' contains no stations.",
            path.display()
        )));
    }
    Ok(groups)
}
