//! Exports [`load`], which reads every file in a directory that passes a
//! filter into memory. Posts and templates are both loaded this way.

use crate::fs::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::debug;

/// A file read into memory by [`load`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// The file's name, including its extension.
    pub name: String,

    /// The path the file was read from (`dir` joined with `name`).
    pub path: PathBuf,

    /// The directory that was listed to find the file.
    pub dir: PathBuf,

    /// The file's UTF-8 contents.
    pub content: String,
}

impl SourceFile {
    /// The file name with its last extension removed.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.name)
    }
}

/// A filter that accepts every file.
pub fn accept_all(_: &str) -> bool {
    true
}

/// Lists the direct entries of `dir` and reads each regular file whose name
/// passes `filter`. Subdirectories are skipped rather than descended into, and
/// names that aren't valid UTF-8 are skipped with a debug message.
///
/// All reads run concurrently. If any of them fails, the reads still in
/// flight are aborted and the first failure observed is returned, so callers
/// never see a partial listing. The order of the returned files is
/// unspecified.
pub async fn load<F>(dir: &Path, filter: F) -> Result<Vec<SourceFile>>
where
    F: Fn(&str) -> bool,
{
    let read_dir_err = |err| Error::ReadDir {
        path: dir.to_owned(),
        err,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_dir_err)?;

    let mut reads = JoinSet::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => {
                debug!(?name, "skipping entry with non UTF-8 name");
                continue;
            }
        };
        if !filter(&name) {
            continue;
        }
        let path = entry.path();
        // follows symlinks, so a link to a directory is skipped too
        let metadata = tokio::fs::metadata(&path).await.map_err(|err| Error::Stat {
            path: path.clone(),
            err,
        })?;
        if metadata.is_dir() {
            debug!(path = %path.display(), "skipping subdirectory");
            continue;
        }

        let dir = dir.to_owned();
        reads.spawn(async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => Ok(SourceFile {
                    name,
                    path,
                    dir,
                    content,
                }),
                Err(err) => Err(Error::Read { path, err }),
            }
        });
    }

    let mut files = Vec::with_capacity(reads.len());
    while let Some(joined) = reads.join_next().await {
        match joined? {
            Ok(file) => {
                debug!(path = %file.path.display(), "loaded");
                files.push(file);
            }
            Err(err) => {
                reads.abort_all();
                return Err(err);
            }
        }
    }
    Ok(files)
}

#[cfg(test)]
mod test {
    use super::*;

    fn names(files: &[SourceFile]) -> Vec<&str> {
        let mut names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_load_filters() -> Result<()> {
        let tmp = tempfile::tempdir().unwrap();
        for name in &["c.md", "b.txt", "a.md"] {
            std::fs::write(tmp.path().join(name), name).unwrap();
        }

        let files = load(tmp.path(), |name| name.ends_with(".md")).await?;
        assert_eq!(vec!["a.md", "c.md"], names(&files));
        for file in &files {
            assert_eq!(file.name, file.content);
            assert_eq!(tmp.path().join(&file.name), file.path);
            assert_eq!(tmp.path(), file.dir);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_load_skips_subdirectories() -> Result<()> {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.md"), "a").unwrap();
        std::fs::create_dir(tmp.path().join("nested.md")).unwrap();
        std::fs::write(tmp.path().join("nested.md").join("b.md"), "b").unwrap();

        let files = load(tmp.path(), accept_all).await?;
        assert_eq!(vec!["a.md"], names(&files));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_load_skips_symlinked_directories() -> Result<()> {
        let tmp = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.md"), "a").unwrap();
        std::os::unix::fs::symlink(elsewhere.path(), tmp.path().join("drafts.md")).unwrap();

        let files = load(tmp.path(), |name| name.ends_with(".md")).await?;
        assert_eq!(vec!["a.md"], names(&files));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_fails_fast() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 1..=5 {
            let path = tmp.path().join(format!("{}.md", i));
            if i == 3 {
                // not UTF-8, so reading it as text fails
                std::fs::write(path, [0xff, 0xfe, 0xfd]).unwrap();
            } else {
                std::fs::write(path, "ok").unwrap();
            }
        }

        match load(tmp.path(), |name| name.ends_with(".md")).await {
            Err(Error::Read { path, .. }) => {
                assert_eq!(tmp.path().join("3.md"), path);
            }
            other => panic!("wanted a read error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        match load(&missing, accept_all).await {
            Err(Error::ReadDir { path, err }) => {
                assert_eq!(missing, path);
                assert_eq!(std::io::ErrorKind::NotFound, err.kind());
            }
            other => panic!("wanted a read-dir error, got {:?}", other),
        }
    }

    #[test]
    fn test_stem() {
        let file = SourceFile {
            name: "universal.html".to_owned(),
            path: PathBuf::from("templates/universal.html"),
            dir: PathBuf::from("templates"),
            content: String::new(),
        };
        assert_eq!("universal", file.stem());
    }
}
