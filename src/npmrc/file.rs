use std::{
    io,
    path::{Path, PathBuf},
};

use super::{MergeIntent, ParsedConfig};

#[derive(Debug, thiserror::Error)]
pub enum RcError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One configuration file on disk.
///
/// Updates read the whole file, transform it in memory, and replace the file
/// by renaming a fully written sibling temp file over it. A failure at any
/// step leaves the original content in place.
#[derive(Debug, Clone)]
pub struct RcFile {
    path: PathBuf,
    marker: char,
    mode: Option<u32>,
}

impl RcFile {
    pub fn new(path: impl Into<PathBuf>, marker: char) -> Self {
        Self {
            path: path.into(),
            marker,
            mode: None,
        }
    }

    /// Unix permission bits applied on every write, e.g. `0o600` for files
    /// holding credentials. Without it an existing file keeps its permissions.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Read and parse the file. A missing file is an empty config.
    pub async fn read(&self) -> Result<ParsedConfig, RcError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(ParsedConfig::parse(&text, self.marker)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ParsedConfig::default()),
            Err(source) => Err(RcError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Replace the file's content with `config`.
    pub async fn write(&self, config: &ParsedConfig) -> Result<(), RcError> {
        let content = config.render(self.marker);
        write_file_atomic(&self.path, content.as_bytes(), self.mode)
            .await
            .map_err(|source| RcError::Write {
                path: self.path.clone(),
                source,
            })
    }

    /// Read, apply `intent`, and write back.
    pub async fn merge(&self, intent: &MergeIntent) -> Result<ParsedConfig, RcError> {
        self.update(|config| intent.apply(config)).await
    }

    /// Read, transform, and write back. Returns what was written.
    pub async fn update<F>(&self, transform: F) -> Result<ParsedConfig, RcError>
    where
        F: FnOnce(ParsedConfig) -> ParsedConfig,
    {
        let current = self.read().await?;
        let updated = transform(current);
        self.write(&updated).await?;

        tracing::info!(path = %self.path.display(), lines = updated.len(), "Config file updated");
        Ok(updated)
    }
}

/// Replace `path` with `content` via a sibling temp file and a rename.
///
/// A symlink at `path` is followed so the link survives and its target is
/// replaced. The temp file is created exclusively with its final permissions
/// before any content is written: `mode` when given, else the existing file's
/// mode. On failure the temp file is removed and the target is untouched.
pub(crate) async fn write_file_atomic(
    path: &Path,
    content: &[u8],
    mode: Option<u32>,
) -> io::Result<()> {
    let target = resolve_target(path).await?;
    let existing = match tokio::fs::metadata(&target).await {
        Ok(metadata) => Some(metadata.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };
    let temp_path = temp_path(&target);

    let result = async {
        write_synced(&temp_path, content, mode, existing).await?;
        tokio::fs::rename(&temp_path, &target).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp_path).await;
    }
    result
}

/// The file a write to `path` should land on.
async fn resolve_target(path: &Path) -> io::Result<PathBuf> {
    match tokio::fs::canonicalize(path).await {
        Ok(resolved) => Ok(resolved),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            // A dangling link still names the file to create
            match tokio::fs::read_link(path).await {
                Ok(link) => Ok(match path.parent() {
                    Some(parent) => parent.join(link),
                    None => link,
                }),
                Err(_) => Ok(path.to_path_buf()),
            }
        }
        Err(e) => Err(e),
    }
}

/// `{name}.{pid}.{random}.tmp` beside `path`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(format!(
        ".{}.{:08x}.tmp",
        std::process::id(),
        rand::random::<u32>()
    ));
    path.with_file_name(name)
}

async fn write_synced(
    path: &Path,
    content: &[u8],
    mode: Option<u32>,
    existing: Option<std::fs::Permissions>,
) -> io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    let mode = {
        use std::os::unix::fs::PermissionsExt;
        mode.or_else(|| existing.as_ref().map(|p| p.mode() & 0o7777))
    };
    #[cfg(unix)]
    options.mode(mode.unwrap_or(0o666));

    let mut file = options.open(path).await?;

    // The creation mode is narrowed by the umask; set the exact bits before
    // any content is written.
    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(mode))
            .await?;
    }
    #[cfg(not(unix))]
    let _ = (mode, existing);

    file.write_all(content).await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let file = RcFile::new(dir.path().join(".npmrc"), '#');

        let config = file.read().await.unwrap();
        assert!(config.is_empty());
    }

    #[tokio::test]
    async fn test_merge_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".npmrc");
        let file = RcFile::new(&path, '#');

        file.merge(&MergeIntent::comment_and_replace("registry", "https://t1"))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "registry = https://t1\n"
        );
        assert!(!dir.path().join(".npmrc.tmp").exists());
    }

    #[tokio::test]
    async fn test_merge_preserves_unrelated_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".npmrc");
        std::fs::write(&path, "# personal settings\nsave-exact=true\nregistry=https://old\n")
            .unwrap();

        RcFile::new(&path, '#')
            .merge(&MergeIntent::comment_and_replace("registry", "https://new"))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# personal settings\nsave-exact = true\n# registry = https://old\nregistry = https://new\n"
        );
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_target_and_no_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory at the target makes the final rename fail
        // after the new content has been written out.
        let path = dir.path().join(".npmrc");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "original").unwrap();

        let config = ParsedConfig::parse("registry=https://new\n", '#');
        let err = RcFile::new(&path, '#').write(&config).await.unwrap_err();

        assert!(matches!(err, RcError::Write { .. }), "{err:?}");
        assert_eq!(std::fs::read_to_string(path.join("keep")).unwrap(), "original");
        assert_eq!(entries(dir.path()), [".npmrc"]);
    }

    #[tokio::test]
    async fn test_existing_tmp_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".npmrc");
        std::fs::write(dir.path().join(".npmrc.tmp"), "mine").unwrap();

        RcFile::new(&path, '#')
            .merge(&MergeIntent::replace("registry", "https://new"))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join(".npmrc.tmp")).unwrap(),
            "mine"
        );
        assert_eq!(entries(dir.path()), [".npmrc", ".npmrc.tmp"]);
    }

    #[test]
    fn test_temp_paths_are_unique_siblings() {
        let path = Path::new("/home/dev/.npmrc");
        let a = temp_path(path);
        let b = temp_path(path);

        assert_ne!(a, b);
        assert_eq!(a.parent(), path.parent());
        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".npmrc."), "{name}");
        assert!(name.ends_with(".tmp"), "{name}");
    }

    #[tokio::test]
    async fn test_read_error_aborts_update() {
        let dir = TempDir::new().unwrap();
        // Reading a directory as a file fails with something other than NotFound.
        let path = dir.path().join("npmrc-dir");
        std::fs::create_dir(&path).unwrap();

        let mut called = false;
        let err = RcFile::new(&path, '#')
            .update(|config| {
                called = true;
                config
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RcError::Read { .. }), "{err:?}");
        assert!(!called);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_mode_applied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".npmrc");
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        RcFile::new(&path, '#')
            .with_mode(0o600)
            .merge(&MergeIntent::replace("//host/:_authToken", "abc"))
            .await
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_existing_permissions_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".npmrc");
        std::fs::write(&path, "a=1\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        RcFile::new(&path, '#')
            .merge(&MergeIntent::replace("b", "2"))
            .await
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_is_followed_and_kept() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("dotfiles-npmrc");
        let link = dir.path().join(".npmrc");
        std::fs::write(&real, "save-exact=true\n").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        RcFile::new(&link, '#')
            .with_mode(0o600)
            .merge(&MergeIntent::replace("//h/:_authToken", "abc"))
            .await
            .unwrap();

        assert!(
            std::fs::symlink_metadata(&link)
                .unwrap()
                .file_type()
                .is_symlink()
        );
        assert_eq!(
            std::fs::read_to_string(&real).unwrap(),
            "save-exact = true\n//h/:_authToken = abc\n"
        );
        assert_eq!(entries(dir.path()), [".npmrc", "dotfiles-npmrc"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_creates_target() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join(".npmrc");
        std::os::unix::fs::symlink("dotfiles-npmrc", &link).unwrap();

        RcFile::new(&link, '#')
            .merge(&MergeIntent::replace("registry", "https://t1"))
            .await
            .unwrap();

        assert!(
            std::fs::symlink_metadata(&link)
                .unwrap()
                .file_type()
                .is_symlink()
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("dotfiles-npmrc")).unwrap(),
            "registry = https://t1\n"
        );
    }
}
