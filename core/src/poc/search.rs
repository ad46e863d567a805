use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use super::Poc;
use crate::error::PocError;

/// Summary of one POC file found during discovery.
#[derive(Debug, Clone)]
pub struct PocFileInfo {
    /// File name, e.g. `git-config-exposure.yml`.
    pub name: String,
    pub path: PathBuf,
    /// Human-readable summary extracted from the definition, empty when the
    /// file failed to parse.
    pub description: String,
}

/// Lists every `.yml` POC file under `dir`, recursively.
pub fn list_pocs(dir: &Path) -> Result<Vec<PocFileInfo>, PocError> {
    if !dir.is_dir() {
        return Err(PocError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("POC directory not found: {}", dir.display()),
        )));
    }

    let mut files = Vec::new();
    collect_yml_files(dir, &mut files)?;

    Ok(files
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let description = match describe_poc(&path) {
                Ok(text) => text,
                Err(e) => {
                    debug!("no description for {}: {}", path.display(), e);
                    String::new()
                }
            };
            PocFileInfo {
                name,
                path,
                description,
            }
        })
        .collect())
}

/// Lists the POC files whose file name contains `keyword`,
/// case-insensitively.
pub fn search_pocs(dir: &Path, keyword: &str) -> Result<Vec<PocFileInfo>, PocError> {
    let keyword = keyword.to_lowercase();
    Ok(list_pocs(dir)?
        .into_iter()
        .filter(|info| info.name.to_lowercase().contains(&keyword))
        .collect())
}

/// Recursive walk collecting `.yml` files. Entries are sorted per directory
/// so listings come out in a stable order.
fn collect_yml_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<io::Result<_>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_yml_files(&path, out)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false)
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Builds a "name - description (author: ...)" line from a parsed definition.
fn describe_poc(path: &Path) -> Result<String, PocError> {
    let poc = Poc::from_file(path)?;

    let mut description = poc.name;
    if !poc.detail.description.is_empty() {
        if !description.is_empty() {
            description.push_str(" - ");
        }
        description.push_str(&poc.detail.description);
    }
    if !poc.detail.author.is_empty() && !description.is_empty() {
        description.push_str(" (author: ");
        description.push_str(&poc.detail.author);
        description.push(')');
    }
    Ok(description)
}
