use crate::errors::ArchiveError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// What went into an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZipSummary {
    pub files: usize,
    pub dirs: usize,
    pub symlinks: usize,
}

/// Compress the tree under `src` into a zip at `dest`.
///
/// Entry names are rooted at the directory's own name (`datadir/...`). Symlinks
/// are stored as links, not followed. Any other kind of entry (socket, fifo,
/// device) fails the whole archive so the source is never deleted short.
pub fn zip_directory(src: &Path, dest: &Path) -> Result<ZipSummary, ArchiveError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ArchiveError::Io { path, source }
    };
    let zip_err = |source: zip::result::ZipError| ArchiveError::Zip {
        path: dest.to_path_buf(),
        source,
    };

    let base = src.parent().unwrap_or(Path::new(""));
    let file = File::create(dest).map_err(io_err(dest))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut summary = ZipSummary {
        files: 0,
        dirs: 0,
        symlinks: 0,
    };

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            ArchiveError::Io {
                path,
                source: e.into(),
            }
        })?;
        let path = entry.path();
        let name = entry_name(path.strip_prefix(base).unwrap_or(path));

        let file_type = entry.file_type();
        if file_type.is_dir() {
            writer
                .add_directory(format!("{}/", name), options)
                .map_err(zip_err)?;
            summary.dirs += 1;
        } else if file_type.is_file() {
            let len = entry.metadata().map(|m| m.len()).unwrap_or(0);
            writer
                .start_file(name, options.large_file(len >= u32::MAX as u64))
                .map_err(zip_err)?;
            let mut input = File::open(path).map_err(io_err(path))?;
            std::io::copy(&mut input, &mut writer).map_err(io_err(path))?;
            summary.files += 1;
        } else if file_type.is_symlink() {
            let target = std::fs::read_link(path).map_err(io_err(path))?;
            writer
                .add_symlink(name, target.to_string_lossy().into_owned(), options)
                .map_err(zip_err)?;
            summary.symlinks += 1;
        } else {
            return Err(ArchiveError::UnsupportedEntry {
                path: path.to_path_buf(),
            });
        }
    }

    let buffered = writer.finish().map_err(zip_err)?;
    let mut file = buffered
        .into_inner()
        .map_err(|e| io_err(dest)(e.into_error()))?;
    file.flush().map_err(io_err(dest))?;
    file.sync_all().map_err(io_err(dest))?;

    Ok(summary)
}

/// Zip entry name: path components joined with `/`.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
