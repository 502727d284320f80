//! Synthesized source dumps
//!
//! Writing is best effort: failures are logged and never fail a proxy
//! creation request.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::proxy::synth::GeneratedUnit;

/// Write `unit` to `<dir>/<file name>`, creating `dir` when missing
///
/// Returns the written path, or `None` when writing failed.
pub fn dump_source(dir: &Path, unit: &GeneratedUnit) -> Option<PathBuf> {
    let path = dir.join(&unit.file_name);
    let result = fs::create_dir_all(dir).and_then(|()| fs::write(&path, &unit.source));
    match result {
        Ok(()) => {
            debug!(type_name = %unit.type_name, path = %path.display(), "dumped proxy source");
            Some(path)
        }
        Err(err) => {
            warn!(
                type_name = %unit.type_name,
                path = %path.display(),
                error = %err,
                "failed to dump proxy source"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> GeneratedUnit {
        GeneratedUnit {
            type_name: "demo.$Proxy0".to_string(),
            file_name: "$Proxy0.veil".to_string(),
            source: "package demo;\n".to_string(),
        }
    }

    #[test]
    fn test_dump_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("nested").join("proxies");
        let path = dump_source(&dir, &unit()).unwrap();
        assert_eq!(path, dir.join("$Proxy0.veil"));
        assert_eq!(fs::read_to_string(path).unwrap(), "package demo;\n");
    }

    #[test]
    fn test_dump_failure_is_not_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // A regular file where the directory should be
        assert_eq!(dump_source(&blocker.join("sub"), &unit()), None);
    }
}
