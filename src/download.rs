use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

use crate::protocol::ResultArtifact;
use crate::transport::Transport;
use crate::viewer::{download_offered, download_url};

pub fn save_artifact<T: Transport>(
    transport: &T,
    artifact: &ResultArtifact,
    dir: &Path,
) -> Result<PathBuf> {
    if !download_offered(artifact) {
        bail!("{} has no downloadable file", artifact.name);
    }
    let Some(url) = download_url(artifact) else {
        bail!("{} has no retrievable file", artifact.name);
    };

    let reply = transport
        .get(url)
        .map_err(|err| anyhow!(err))
        .with_context(|| format!("download of {} failed", artifact.name))?;
    if !reply.is_success() {
        bail!("http {} while downloading {}", reply.status, artifact.name);
    }

    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = available_path(dir, &local_file_name(artifact));
    let tmp = path.with_extension("part");
    fs::write(&tmp, &reply.body).context("write download")?;
    fs::rename(&tmp, &path).context("finalize download")?;
    Ok(path)
}

/// Display name turned into a safe file name. The URL's extension is used
/// when the display name has none.
pub fn local_file_name(artifact: &ResultArtifact) -> String {
    let (stem, ext) = split_ext(&artifact.name);
    let ext = ext.or_else(|| {
        let last = artifact.url.rsplit('/').next().unwrap_or_default();
        split_ext(last).1
    });

    let mut clean: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if clean.is_empty() {
        clean.push_str("artifact");
    }
    match ext {
        Some(ext) => format!("{clean}.{ext}"),
        None => clean,
    }
}

/// `dir/name`, or `dir/stem_2.ext`, `dir/stem_3.ext`, ... when taken.
fn available_path(dir: &Path, name: &str) -> PathBuf {
    let first = dir.join(name);
    if !first.exists() {
        return first;
    }
    let (stem, ext) = split_ext(name);
    (2..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem}_{n}.{ext}")),
            None => dir.join(format!("{stem}_{n}")),
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

fn split_ext(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (stem, Some(ext))
        }
        _ => (name, None),
    }
}
