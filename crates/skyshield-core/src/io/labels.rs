use std::fs;
use std::path::Path;

use crate::error::Result;

/// Read a ground-truth label file. A missing file means "no streaks" and
/// gives `None`; other read failures are errors.
pub fn read_label_file(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
