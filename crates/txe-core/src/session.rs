//! The active documents of one editing session.
//!
//! At most one catalogue and one trader document are open at a time; opening
//! another of the same kind replaces it. Every mutating call validates first,
//! changes memory, then rewrites the whole backing file once.
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::backup;
use crate::edit::{self, BulkReport, Generated, Patch, Progress};
use crate::error::{Error, Result};
use crate::files::{FileStore, LocalFs};
use crate::model::{FieldSet, Record};
use crate::store::Catalogue;
use crate::trader::{self, ItemPatch, TraderDocument, TraderHeader};

#[derive(Debug)]
struct Active<T> {
    path: PathBuf,
    doc: T,
}

#[derive(Debug)]
pub struct Session<F: FileStore = LocalFs> {
    files: F,
    backups: bool,
    catalogue: Option<Active<Catalogue>>,
    trader: Option<Active<TraderDocument>>,
}

impl Session<LocalFs> {
    pub fn local() -> Self {
        Self::new(LocalFs)
    }
}

impl<F: FileStore> Session<F> {
    pub fn new(files: F) -> Self {
        Self {
            files,
            backups: false,
            catalogue: None,
            trader: None,
        }
    }

    /// Zip the previous version of a file before each overwrite.
    pub fn with_backups(mut self, on: bool) -> Self {
        self.backups = on;
        self
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    // -------- catalogue --------

    pub fn open_catalogue(&mut self, path: impl Into<PathBuf>) -> Result<&Catalogue> {
        let path = path.into();
        let data = self.files.read(&path).map_err(|e| Error::SourceUnreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let doc = Catalogue::load_bytes(&data)?;
        info!(path = %path.display(), records = doc.len(), "catalogue loaded");
        let active = self.catalogue.insert(Active { path, doc });
        Ok(&active.doc)
    }

    pub fn catalogue(&self) -> Option<&Catalogue> {
        self.catalogue.as_ref().map(|a| &a.doc)
    }

    pub fn catalogue_path(&self) -> Option<&Path> {
        self.catalogue.as_ref().map(|a| a.path.as_path())
    }

    fn active_catalogue(&self) -> Result<&Catalogue> {
        self.catalogue().ok_or(Error::NoActiveDocument)
    }

    pub fn find(&self, name: &str) -> Result<&Record> {
        self.active_catalogue()?.find(name)
    }

    pub fn suggest(&self, query: &str) -> Result<Vec<&str>> {
        Ok(self.active_catalogue()?.suggest(query))
    }

    /// Single-record edit followed by a rewrite of the whole document.
    pub fn edit_record(&mut self, name: &str, patch: &Patch) -> Result<()> {
        let active = self.catalogue.as_mut().ok_or(Error::NoActiveDocument)?;
        edit::edit_record(&mut active.doc, name, patch)?;
        self.flush_catalogue()
    }

    /// Applies `patch` to every found name and writes once. Missing names do
    /// not stop the batch; they are listed in the report.
    pub fn bulk_edit<S: AsRef<str>>(
        &mut self,
        names: &[S],
        patch: &Patch,
        progress: Option<&mut dyn Progress>,
    ) -> Result<BulkReport> {
        let active = self.catalogue.as_mut().ok_or(Error::NoActiveDocument)?;
        let report = edit::bulk_edit(&mut active.doc, names, patch, progress)?;
        if !report.missing.is_empty() {
            warn!(missing = ?report.missing, "some bulk edit targets were not found");
        }
        self.flush_catalogue()?;
        Ok(report)
    }

    /// Generation mode: build a new catalogue from names, write it to
    /// `destination` and make it the active catalogue.
    pub fn generate_catalogue<S: AsRef<str>>(
        &mut self,
        names: &[S],
        fields: &FieldSet,
        destination: impl Into<PathBuf>,
        progress: Option<&mut dyn Progress>,
    ) -> Result<Vec<String>> {
        let Generated {
            catalogue,
            duplicates,
        } = edit::generate(names, fields, progress)?;
        let path = destination.into();
        self.write_catalogue(&catalogue, &path)?;
        self.catalogue = Some(Active {
            path,
            doc: catalogue,
        });
        Ok(duplicates)
    }

    /// Writes the active catalogue to another file, which becomes its backing file.
    pub fn save_catalogue_as(&mut self, destination: impl Into<PathBuf>) -> Result<()> {
        let path = destination.into();
        let doc = self.active_catalogue()?;
        self.write_catalogue(doc, &path)?;
        if let Some(active) = self.catalogue.as_mut() {
            active.path = path;
        }
        Ok(())
    }

    fn flush_catalogue(&self) -> Result<()> {
        let active = self.catalogue.as_ref().ok_or(Error::NoActiveDocument)?;
        self.write_catalogue(&active.doc, &active.path)
    }

    fn write_catalogue(&self, doc: &Catalogue, path: &Path) -> Result<()> {
        self.backup(path)?;
        doc.write(&self.files, path)
    }

    // -------- trader --------

    /// Projects the active catalogue into a new trader document.
    pub fn project_trader(&self, header: &TraderHeader) -> Result<TraderDocument> {
        trader::project(self.active_catalogue()?, header)
    }

    /// Projects from a catalogue file without touching the active catalogue.
    pub fn project_trader_file(&self, source: &Path, header: &TraderHeader) -> Result<TraderDocument> {
        trader::project_file(&self.files, source, header)
    }

    /// Saves a projected document and makes it the active trader document.
    pub fn save_trader(&mut self, doc: TraderDocument, destination: impl Into<PathBuf>) -> Result<()> {
        let path = destination.into();
        self.backup(&path)?;
        doc.write(&self.files, &path)?;
        self.trader = Some(Active { path, doc });
        Ok(())
    }

    pub fn open_trader(&mut self, path: impl Into<PathBuf>) -> Result<&TraderDocument> {
        let path = path.into();
        let data = self.files.read(&path).map_err(|e| Error::SourceUnreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let doc = TraderDocument::from_json(&data)?;
        info!(path = %path.display(), items = doc.items.len(), "trader document loaded");
        let active = self.trader.insert(Active { path, doc });
        Ok(&active.doc)
    }

    pub fn trader(&self) -> Option<&TraderDocument> {
        self.trader.as_ref().map(|a| &a.doc)
    }

    pub fn trader_path(&self) -> Option<&Path> {
        self.trader.as_ref().map(|a| a.path.as_path())
    }

    /// Patches the header and/or one entry, then rewrites the whole file.
    /// Both parts are validated before either is applied.
    pub fn edit_trader(
        &mut self,
        header: Option<&TraderHeader>,
        item: Option<(&str, &ItemPatch)>,
    ) -> Result<()> {
        let active = self.trader.as_mut().ok_or(Error::NoActiveDocument)?;
        let mut doc = active.doc.clone();
        if let Some(h) = header {
            doc.apply_header(h)?;
        }
        if let Some((class_name, patch)) = item {
            doc.apply_item(class_name, patch)?;
        }
        active.doc = doc;
        let active = self.trader.as_ref().ok_or(Error::NoActiveDocument)?;
        self.backup(&active.path)?;
        active.doc.write(&self.files, &active.path)
    }

    pub fn close(&mut self) {
        self.catalogue = None;
        self.trader = None;
    }

    fn backup(&self, path: &Path) -> Result<()> {
        if !self.backups || !self.files.exists(path) {
            return Ok(());
        }
        backup::zip_backup(&self.files, path)
            .map(|_| ())
            .map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::MemoryFs;
    use crate::model::ScalarField;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<types>
    <type name="Apple"><nominal>1</nominal></type>
    <type name="Banana"><nominal>2</nominal></type>
</types>
"#;

    fn session() -> Session<MemoryFs> {
        let fs = MemoryFs::new();
        fs.insert("types.xml", DOC);
        Session::new(fs)
    }

    #[test]
    fn operations_need_an_active_catalogue() {
        let mut s = session();
        assert!(matches!(s.find("Apple"), Err(Error::NoActiveDocument)));
        assert!(matches!(
            s.edit_record("Apple", &Patch::new()),
            Err(Error::NoActiveDocument)
        ));
    }

    #[test]
    fn opening_replaces_the_active_catalogue() {
        let mut s = session();
        s.files().insert("other.xml", "<types><type name=\"Rope\"/></types>");
        s.open_catalogue("types.xml").unwrap();
        s.open_catalogue("other.xml").unwrap();
        assert_eq!(s.catalogue().unwrap().all_names(), ["Rope"]);
        assert_eq!(s.catalogue_path(), Some(Path::new("other.xml")));
    }

    #[test]
    fn foreign_document_is_rejected_and_left_alone() {
        let events = r#"<events><event name="AnimalBear"><nominal>4</nominal></event></events>"#;
        let mut s = session();
        s.files().insert("events.xml", events);
        assert!(matches!(
            s.open_catalogue("events.xml"),
            Err(Error::MalformedDocument(_))
        ));
        assert!(s.catalogue().is_none());
        let patch = Patch::new().scalar(ScalarField::Nominal, "1");
        assert!(matches!(
            s.bulk_edit(&["Ghost"], &patch, None),
            Err(Error::NoActiveDocument)
        ));
        assert_eq!(s.files().get_string(Path::new("events.xml")).unwrap(), events);
    }

    #[test]
    fn failed_write_is_reported_as_io() {
        let mut s = session();
        s.open_catalogue("types.xml").unwrap();
        s.files().fail_writes(true);
        let patch = Patch::new().scalar(ScalarField::Nominal, "9");
        assert!(matches!(
            s.edit_record("Apple", &patch),
            Err(Error::Io { .. })
        ));
        assert_eq!(s.files().get_string(Path::new("types.xml")).unwrap(), DOC);
    }

    #[test]
    fn rejected_trader_edit_changes_nothing() {
        let mut s = session();
        s.open_catalogue("types.xml").unwrap();
        let doc = s.project_trader(&TraderHeader::default()).unwrap();
        s.save_trader(doc, "trader.json").unwrap();
        let before = s.files().get(Path::new("trader.json")).unwrap();
        let header = TraderHeader {
            display_name: "Fruit".into(),
            ..TraderHeader::default()
        };
        let bad = ItemPatch::new().set(trader::ItemField::QuantityPercent, "-3");
        assert!(s.edit_trader(Some(&header), Some(("Apple", &bad))).is_err());
        assert_eq!(s.trader().unwrap().display_name, "My Category Title !");
        assert_eq!(s.files().get(Path::new("trader.json")).unwrap(), before);
    }

    #[test]
    fn backups_are_taken_before_overwrite() {
        let mut s = session().with_backups(true);
        s.open_catalogue("types.xml").unwrap();
        s.edit_record("Apple", &Patch::new().scalar(ScalarField::Cost, "5"))
            .unwrap();
        let zips: Vec<PathBuf> = s
            .files()
            .paths()
            .into_iter()
            .filter(|p| p.extension().is_some_and(|e| e == "zip"))
            .collect();
        assert_eq!(zips.len(), 1);
        assert!(zips[0].to_string_lossy().starts_with("types_"));
    }
}
