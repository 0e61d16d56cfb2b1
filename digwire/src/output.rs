//! Output writing for the generated wiring module.

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::{Dir, OpenOptions};
use std::io::Write;

use crate::error::DigwireError;

/// Writes the rendered module to `path`, truncating any previous run's
/// output. The parent directory is created when missing.
pub fn write_module(path: &Utf8Path, content: &str) -> Result<(), DigwireError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| DigwireError::io(path, std::io::Error::from(std::io::ErrorKind::InvalidInput)))?;

    let dir = ensure_dir(parent)?;
    let mut file = dir
        .open_with(
            file_name,
            OpenOptions::new().write(true).create(true).truncate(true),
        )
        .map_err(|io_err| DigwireError::io(path, io_err))?;
    file.write_all(content.as_bytes())
        .map_err(|io_err| DigwireError::io(path, io_err))
}

/// Reads one source file for scanning.
pub fn read_source(path: &Utf8Path) -> Result<String, DigwireError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| DigwireError::io(path, std::io::Error::from(std::io::ErrorKind::InvalidInput)))?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|io_err| DigwireError::io(path, io_err))?;
    dir.read_to_string(file_name)
        .map_err(|io_err| DigwireError::io(path, io_err))
}

fn ensure_dir(path: &Utf8Path) -> Result<Dir, DigwireError> {
    match Dir::open_ambient_dir(path, ambient_authority()) {
        Ok(dir) => Ok(dir),
        Err(open_err) if open_err.kind() == std::io::ErrorKind::NotFound => {
            Dir::create_ambient_dir_all(path, ambient_authority())
                .map_err(|io_err| DigwireError::io(path, io_err))?;
            Dir::open_ambient_dir(path, ambient_authority())
                .map_err(|io_err| DigwireError::io(path, io_err))
        }
        Err(open_err) => Err(DigwireError::io(path, open_err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 tempdir");
        let path = root.join("nested/digwire_gen.rs");

        write_module(&path, "// first\n").expect("writes");
        write_module(&path, "// second\n").expect("overwrites");
        assert_eq!(read_source(&path).expect("reads"), "// second\n");
    }
}
