//! CLI entrypoint for `digwire`.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use tracing::info;

use digwire::cli::Args;
use digwire::error::DigwireError;
use digwire::metadata::WorkspaceIndex;
use digwire::{generate, output};

fn main() -> Result<(), DigwireError> {
    let args = Args::parse();
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(output = %args.output, "digwire generation starting");
    let index = WorkspaceIndex::from_cargo()?;
    let files = collect_sources(&args.scans, &args.output)?;
    let rendered = generate::generate(&index, &files, &args.output, args.tag.as_deref())?;
    output::write_module(&args.output, &rendered)?;
    info!(files = files.len(), output = %args.output, "digwire generation finished");
    Ok(())
}

/// Collects every `.rs` file under the scan directories in sorted order,
/// leaving out the output file itself.
fn collect_sources(
    scans: &[Utf8PathBuf],
    output: &Utf8Path,
) -> Result<Vec<Utf8PathBuf>, DigwireError> {
    let mut files = Vec::new();
    for scan in scans {
        for entry in walkdir::WalkDir::new(scan).sort_by_file_name() {
            let entry = entry.map_err(|err| DigwireError::io(scan.clone(), err.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = Utf8PathBuf::from_path_buf(entry.into_path()).map_err(|_| {
                DigwireError::io(
                    scan.clone(),
                    std::io::Error::from(std::io::ErrorKind::InvalidData),
                )
            })?;
            if path.extension() == Some("rs") && path != output {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
