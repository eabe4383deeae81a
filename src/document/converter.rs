use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Convert a docx file to markdown with the external converter CLI.
/// Returns the path of the generated markdown file.
pub async fn convert_to_markdown(
    converter_bin: &str,
    input: &Path,
    output_dir: &Path,
) -> Result<PathBuf> {
    if !input.exists() {
        return Err(anyhow!("File {} does not exist", input.display()));
    }

    log::info!(
        "Converting {} to markdown with {}",
        input.display(),
        converter_bin
    );

    let output = Command::new(converter_bin)
        .arg(input)
        .arg("--to")
        .arg("md")
        .arg("--output")
        .arg(output_dir)
        .output()
        .await
        .with_context(|| format!("Failed to run converter '{}'", converter_bin))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "Converter failed for {}: {}",
            input.display(),
            stderr.trim()
        ));
    }

    let stem = input
        .file_stem()
        .ok_or_else(|| anyhow!("Input path {} has no file stem", input.display()))?;
    let md_path = output_dir.join(stem).with_extension("md");

    if !md_path.exists() {
        return Err(anyhow!(
            "Converter reported success but {} was not created",
            md_path.display()
        ));
    }

    Ok(md_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_input_is_an_error() {
        let dir = tempdir().unwrap();
        let result =
            convert_to_markdown("true", &dir.path().join("missing.docx"), dir.path()).await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("does not exist"));
    }

    #[tokio::test]
    async fn test_success_without_output_file_is_an_error() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("doc.docx");
        std::fs::write(&input, b"stub").unwrap();

        // "true" exits 0 but writes nothing
        let result = convert_to_markdown("true", &input, dir.path()).await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("was not created"));
    }

    #[tokio::test]
    async fn test_returns_markdown_path_when_created() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("doc.docx");
        std::fs::write(&input, b"stub").unwrap();
        std::fs::write(dir.path().join("doc.md"), "# Title").unwrap();

        let md_path = convert_to_markdown("true", &input, dir.path()).await.unwrap();
        assert_eq!(md_path, dir.path().join("doc.md"));
    }

    #[tokio::test]
    async fn test_unknown_binary_is_an_error() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("doc.docx");
        std::fs::write(&input, b"stub").unwrap();

        let result = convert_to_markdown("no-such-converter-bin", &input, dir.path()).await;
        assert!(result.is_err());
    }
}
