//! Command-line interface definitions for `digwire`.

use camino::Utf8PathBuf;
use clap::Parser;

/// Parsed CLI arguments for `digwire`.
#[derive(Debug, Parser)]
#[command(name = "digwire")]
#[command(about = "Generate container wiring from annotated declarations")]
#[command(version)]
pub struct Args {
    /// Directories to scan for annotated declarations, comma-separated.
    #[arg(long, value_name = "dir", value_delimiter = ',', default_value = "src")]
    pub scans: Vec<Utf8PathBuf>,
    /// Path of the generated wiring module.
    #[arg(long, value_name = "path", default_value = "src/digwire_gen.rs")]
    pub output: Utf8PathBuf,
    /// Build-tag filter (`tag` or `!tag`).
    #[arg(long, value_name = "tag")]
    pub tag: Option<String>,
    /// Enable debug logging.
    #[arg(long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_conventional_layout() {
        let args = Args::parse_from(["digwire"]);
        assert_eq!(args.scans, vec![Utf8PathBuf::from("src")]);
        assert_eq!(args.output, Utf8PathBuf::from("src/digwire_gen.rs"));
        assert!(args.tag.is_none());
    }

    #[test]
    fn scans_split_on_commas() {
        let args = Args::parse_from(["digwire", "--scans", "src,internal", "--tag", "!debug"]);
        assert_eq!(
            args.scans,
            vec![Utf8PathBuf::from("src"), Utf8PathBuf::from("internal")]
        );
        assert_eq!(args.tag.as_deref(), Some("!debug"));
    }
}
