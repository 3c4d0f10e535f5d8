//! Delete command implementation.
//!
//! Removes one image from the newest index build by its ID.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use dim_index::{DeleteOutcome, ImageIndex, IndexConfig};

/// Arguments for the delete command.
#[derive(Args)]
pub struct DeleteArgs {
    /// Image ID (configuration digest, e.g. `sha256:...`)
    pub id: String,

    /// Root directory of the index builds
    #[arg(long, env = "DIM_INDEX_PATH", default_value = "dim.index")]
    pub index_path: PathBuf,
}

/// Runs the delete command.
///
/// # Errors
///
/// Returns an error if no index build exists under the index path, the
/// build is being written by another process, or the deletion fails.
pub fn run(args: &DeleteArgs) -> Result<()> {
    let config = IndexConfig::builder().root_dir(&args.index_path).build();
    let images = ImageIndex::open_latest_writable(&config)
        .with_context(|| format!("No writable index under {}", args.index_path.display()))?;

    let outcome = images
        .delete_image(&args.id)
        .with_context(|| format!("Failed to delete image {}", args.id))?;
    images.shutdown().context("Failed to close index")?;

    println!("{}", describe(&args.id, &outcome));
    Ok(())
}

fn describe(id: &str, outcome: &DeleteOutcome) -> String {
    match outcome {
        DeleteOutcome::NotFound => format!("No indexed image has ID {id}"),
        DeleteOutcome::Deleted { full_name } => format!("Deleted {full_name}"),
        DeleteOutcome::Ambiguous { matches } => {
            format!("{matches} images have ID {id}, nothing deleted")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dim_core::{ImageConfig, ImageDescriptor, IndexedImage};
    use dim_index::TantivyIndex;

    use super::*;

    fn args(root: &std::path::Path, id: &str) -> DeleteArgs {
        DeleteArgs {
            id: id.to_string(),
            index_path: root.to_path_buf(),
        }
    }

    #[test]
    fn test_describe_outcomes() {
        assert_eq!(
            describe("sha256:a", &DeleteOutcome::NotFound),
            "No indexed image has ID sha256:a"
        );
        assert_eq!(
            describe(
                "sha256:a",
                &DeleteOutcome::Deleted {
                    full_name: "library/nginx:latest".to_string()
                }
            ),
            "Deleted library/nginx:latest"
        );
        assert_eq!(
            describe("sha256:a", &DeleteOutcome::Ambiguous { matches: 2 }),
            "2 images have ID sha256:a, nothing deleted"
        );
    }

    #[test]
    fn test_delete_without_index_fails() {
        let root = tempfile::tempdir().unwrap();
        assert!(run(&args(root.path(), "sha256:a")).is_err());
    }

    #[test]
    fn test_delete_from_latest_build() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("20240101000000.000");
        let images = ImageIndex::new(
            Arc::new(TantivyIndex::create_in_dir(&dir, 15_000_000).unwrap()),
            1,
        );
        for (digest, tag) in [("sha256:a", "1.0"), ("sha256:b", "latest")] {
            let descriptor = ImageDescriptor::new(digest, tag, ImageConfig::default());
            images
                .index_image(&IndexedImage::parse("library/nginx", &descriptor))
                .unwrap();
        }
        images.shutdown().unwrap();

        assert!(run(&args(root.path(), "sha256:a")).is_ok());
        assert!(run(&args(root.path(), "sha256:a")).is_ok());

        let remaining = TantivyIndex::open(&dir).unwrap();
        assert_eq!(remaining.num_docs(), 1);
    }
}
