//! Validate command implementation.
//!
//! Builds every discovered document and reports the ones that fail.

use std::path::PathBuf;

use clap::Args;
use log::warn;

use crate::discovery::{discover, discover_paths, ImageMode};
use crate::error::{GraphError, Result};
use crate::output::{display_path, plural, Printer};

/// Build documents without printing them
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Files or directories to validate (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Image loading mode (default from tilegraph.yaml, else deferred)
    #[arg(long, value_enum)]
    pub images: Option<ImageMode>,
}

pub fn run(args: ValidateArgs, printer: &Printer) -> Result<()> {
    let discovery = if args.paths.is_empty() {
        discover(".")?
    } else {
        discover_paths(&args.paths)?
    };

    let documents = discovery.documents();
    if documents.is_empty() {
        printer.warning("Skipping", "no documents found");
        return Ok(());
    }

    let loader = args.images.unwrap_or(discovery.manifest.images).loader();
    let mut failed = 0;

    for path in &documents {
        match crate::load(path, loader.as_ref()) {
            Ok(node) => {
                let tag = printer.dim(&format!("<{}>", node.kind().tag()));
                printer.status("Checked", &format!("{} {}", display_path(path), tag));
            }
            Err(err) => {
                failed += 1;
                warn!("{}: {:?}", path.display(), err);
                printer.error("Failed", &format!("{}: {}", display_path(path), err));
            }
        }
    }

    let checked = plural(documents.len(), "document", "documents");
    if failed > 0 {
        return Err(GraphError::Source {
            message: format!("{} of {} failed to build", failed, checked),
            help: Some("Run `tilegraph dump <file>` for the full diagnostic".to_string()),
        });
    }

    printer.success("Finished", &format!("{} valid", checked));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn args(paths: Vec<PathBuf>) -> ValidateArgs {
        ValidateArgs { paths, images: None }
    }

    #[test]
    fn test_validate_accepts_good_documents() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("ok.tmx"),
            r#"<map width="1" height="1"><layer><data encoding="csv">0</data></layer></map>"#,
        )
        .unwrap();
        fs::write(dir.path().join("ok.tmj"), r#"{"width": 1, "height": 1, "layers": []}"#).unwrap();

        run(args(vec![dir.path().to_path_buf()]), &Printer::plain()).unwrap();
    }

    #[test]
    fn test_validate_reports_failures() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ok.tmx"), r#"<map width="1" height="1"/>"#).unwrap();
        fs::write(dir.path().join("bad.tmx"), r#"<map><wangsets/></map>"#).unwrap();

        let err = run(args(vec![dir.path().to_path_buf()]), &Printer::plain()).unwrap_err();
        assert!(err.to_string().contains("1 of 2 documents failed"));
    }

    #[test]
    fn test_validate_empty_directory_is_ok() {
        let dir = tempdir().unwrap();
        run(args(vec![dir.path().to_path_buf()]), &Printer::plain()).unwrap();
    }
}
