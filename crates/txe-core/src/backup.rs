use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::files::FileStore;

/// `<dir>/<stem>_<YYYYmmdd-HHMMSS>.zip`
pub fn backup_path(path: &Path, at: DateTime<Local>) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("document");
    let ts = at.format("%Y%m%d-%H%M%S");
    parent.join(format!("{}_{}.zip", stem, ts))
}

// First free name: `backup_path`, then `<stem>_<ts>-2.zip`, `-3`, ...
fn free_backup_path<F: FileStore + ?Sized>(files: &F, path: &Path, at: DateTime<Local>) -> PathBuf {
    let first = backup_path(path, at);
    if !files.exists(&first) {
        return first;
    }
    let stem = first.file_stem().and_then(|s| s.to_str()).unwrap_or("backup").to_string();
    (2..)
        .map(|n| first.with_file_name(format!("{stem}-{n}.zip")))
        .find(|p| !files.exists(p))
        .unwrap_or(first)
}

// Zip backup of one document next to it (non-destructive)
pub fn zip_backup<F: FileStore + ?Sized>(files: &F, path: &Path) -> io::Result<PathBuf> {
    zip_backup_at(files, path, Local::now())
}

fn zip_backup_at<F: FileStore + ?Sized>(
    files: &F,
    path: &Path,
    at: DateTime<Local>,
) -> io::Result<PathBuf> {
    let data = files.read(path)?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string();
    let dest = free_backup_path(files, path, at);

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    zip.start_file(name, options)?;
    zip.write_all(&data)?;
    let archive = zip.finish()?.into_inner();
    files.write(&dest, &archive)?;
    info!(backup = %dest.display(), "backup written");
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::MemoryFs;
    use chrono::TimeZone;
    use std::io::Read;

    #[test]
    fn backup_name_uses_stem_and_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let p = backup_path(Path::new("mission/db/types.xml"), at);
        assert_eq!(p, Path::new("mission/db/types_20240309-140507.zip"));
    }

    #[test]
    fn backup_contains_the_document() {
        let fs = MemoryFs::new();
        let src = Path::new("db/types.xml");
        fs.insert(src, "<types/>");
        let dest = zip_backup(&fs, src).unwrap();
        let bytes = fs.get(&dest).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name("types.xml").unwrap();
        let mut s = String::new();
        entry.read_to_string(&mut s).unwrap();
        assert_eq!(s, "<types/>");
    }

    #[test]
    fn backups_within_one_second_do_not_overwrite_each_other() {
        let fs = MemoryFs::new();
        let src = Path::new("db/types.xml");
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        fs.insert(src, "first");
        let a = zip_backup_at(&fs, src, at).unwrap();
        fs.insert(src, "second");
        let b = zip_backup_at(&fs, src, at).unwrap();
        let c = zip_backup_at(&fs, src, at).unwrap();
        assert_eq!(a, Path::new("db/types_20240309-140507.zip"));
        assert_eq!(b, Path::new("db/types_20240309-140507-2.zip"));
        assert_eq!(c, Path::new("db/types_20240309-140507-3.zip"));

        let mut archive = zip::ZipArchive::new(Cursor::new(fs.get(&a).unwrap())).unwrap();
        let mut s = String::new();
        archive.by_name("types.xml").unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "first");
    }

    #[test]
    fn missing_source_is_an_error() {
        let fs = MemoryFs::new();
        assert!(zip_backup(&fs, Path::new("nope.xml")).is_err());
    }
}
