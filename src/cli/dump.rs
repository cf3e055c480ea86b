//! Dump command implementation.
//!
//! Builds one document and prints its projection.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use log::debug;

use crate::discovery::{find_manifest, ImageMode, OutputFormat};
use crate::error::{GraphError, Result};
use crate::output::{display_path, Printer};

/// Print the projection of a document
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Map, tileset or template document
    pub file: PathBuf,

    /// Output format (default from tilegraph.yaml, else json)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Image loading mode (default from tilegraph.yaml, else deferred)
    #[arg(long, value_enum)]
    pub images: Option<ImageMode>,

    /// Write to a file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn run(args: DumpArgs, printer: &Printer) -> Result<()> {
    let manifest = find_manifest(args.file.parent().unwrap_or_else(|| Path::new(".")))?
        .unwrap_or_default();
    let format = args.format.unwrap_or(manifest.format);
    let mode = args.images.unwrap_or(manifest.images);
    debug!("dump {} as {:?} with {:?} images", args.file.display(), format, mode);

    let loader = mode.loader();
    let node = crate::load(&args.file, loader.as_ref())?;
    let rendered = render(&node.project(), format)?;

    match &args.output {
        Some(path) => {
            fs::write(path, rendered).map_err(|e| GraphError::Io {
                path: path.clone(),
                message: format!("Failed to write output: {}", e),
            })?;
            printer.success("Wrote", &display_path(path));
        }
        None => println!("{}", rendered.trim_end()),
    }

    Ok(())
}

/// Serialize a projection in the requested format.
pub fn render(value: &serde_json::Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value).map_err(|e| GraphError::Source {
            message: format!("Failed to serialize JSON: {}", e),
            help: None,
        }),
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| GraphError::Source {
            message: format!("Failed to serialize YAML: {}", e),
            help: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_json_is_pretty() {
        let out = render(&json!({"width": 2}), OutputFormat::Json).unwrap();
        assert_eq!(out, "{\n  \"width\": 2\n}");
    }

    #[test]
    fn test_render_yaml() {
        let out = render(&json!({"width": 2}), OutputFormat::Yaml).unwrap();
        assert_eq!(out.trim(), "width: 2");
    }

    #[test]
    fn test_dump_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let map = dir.path().join("level.tmx");
        fs::write(
            &map,
            r#"<map width="2" height="1"><layer name="g"><data encoding="csv">1,0</data></layer></map>"#,
        )
        .unwrap();
        let out = dir.path().join("level.json");

        let args = DumpArgs {
            file: map,
            format: Some(OutputFormat::Json),
            images: None,
            output: Some(out.clone()),
        };
        run(args, &Printer::plain()).unwrap();

        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(written["width"], 2);
        assert_eq!(written["layers"][0]["data"]["grid"], json!([[1, 0]]));
    }
}
