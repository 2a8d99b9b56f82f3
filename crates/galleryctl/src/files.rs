use std::path::{Path, PathBuf};

use futures_util::FutureExt;
use gallery_core::{ReadFuture, UploadSource};
use walkdir::WalkDir;

/// An upload candidate backed by a file on disk. Type comes from the file
/// extension and size from metadata; contents are read on commit.
#[derive(Clone, Debug)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
    mime: String,
    size: u64,
}

impl DiskFile {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let size = std::fs::metadata(path)?.len();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            path: path.to_path_buf(),
            name,
            mime,
            size,
        })
    }
}

impl UploadSource for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime(&self) -> &str {
        &self.mime
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read(&self) -> ReadFuture {
        let path = self.path.clone();
        async move { tokio::fs::read(path).await }.boxed()
    }
}

#[derive(Debug)]
pub struct CollectWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Expands directories into their files, sorted by path within each root.
pub fn collect_files(inputs: &[PathBuf]) -> (Vec<DiskFile>, Vec<CollectWarning>) {
    let mut files = Vec::new();
    let mut warnings = Vec::new();

    for input in inputs {
        if !input.exists() {
            warnings.push(CollectWarning {
                path: input.clone(),
                message: "path does not exist".to_string(),
            });
            continue;
        }

        let mut entries: Vec<PathBuf> = WalkDir::new(input)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();
        entries.sort();

        for path in entries {
            match DiskFile::open(&path) {
                Ok(file) => files.push(file),
                Err(err) => warnings.push(CollectWarning {
                    path,
                    message: err.to_string(),
                }),
            }
        }
    }

    (files, warnings)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use gallery_core::UploadSource;

    use super::collect_files;

    #[test]
    fn collects_directory_contents_with_guessed_types() {
        let dir = std::env::temp_dir().join(format!("galleryctl-files-{}", std::process::id()));
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("b.png"), [1u8, 2]).unwrap();
        fs::write(dir.join("nested").join("a.txt"), b"hello").unwrap();

        let (files, warnings) = collect_files(&[dir.clone(), dir.join("missing")]);
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(warnings.len(), 1);
        let summary: Vec<(&str, &str, u64)> = files
            .iter()
            .map(|file| (file.name(), file.mime(), file.size()))
            .collect();
        assert_eq!(
            summary,
            vec![("b.png", "image/png", 2), ("a.txt", "text/plain", 5)]
        );
    }

    #[tokio::test]
    async fn disk_file_reads_contents() {
        let path = std::env::temp_dir().join(format!("galleryctl-read-{}.jpg", std::process::id()));
        fs::write(&path, [9u8, 8, 7]).unwrap();
        let file = super::DiskFile::open(&path).unwrap();
        let bytes = file.read().await.unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(bytes, vec![9, 8, 7]);
        assert_eq!(file.mime(), "image/jpeg");
    }
}
