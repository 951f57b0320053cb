use std::path::Path;

use indexmap::IndexMap;
use tracing::info;

use crate::codec;
use crate::error::{Error, Result};
use crate::files::FileStore;
use crate::model::Record;

/// Records of one catalogue document, keyed by name, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogue {
    records: IndexMap<String, Record>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(text: &str) -> Result<Self> {
        codec::parse_catalogue(text)
    }

    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        codec::parse_catalogue_bytes(data)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn find(&self, name: &str) -> Result<&Record> {
        self.records
            .get(name)
            .ok_or_else(|| Error::RecordNotFound(name.to_string()))
    }

    pub fn find_mut(&mut self, name: &str) -> Result<&mut Record> {
        self.records
            .get_mut(name)
            .ok_or_else(|| Error::RecordNotFound(name.to_string()))
    }

    pub fn all_names(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Adds a record unless its name is taken; the existing record wins.
    pub fn insert(&mut self, record: Record) -> bool {
        if self.records.contains_key(record.name()) {
            return false;
        }
        self.records.insert(record.name().to_string(), record);
        true
    }

    /// Case-insensitive substring match over names, document order.
    pub fn suggest(&self, query: &str) -> Vec<&str> {
        let q = query.to_lowercase();
        self.records
            .keys()
            .filter(|n| n.to_lowercase().contains(&q))
            .map(String::as_str)
            .collect()
    }

    pub fn to_xml(&self) -> String {
        codec::write_catalogue(self)
    }

    /// Overwrites `dest` with the whole document.
    pub fn write<F: FileStore + ?Sized>(&self, files: &F, dest: &Path) -> Result<()> {
        files
            .write(dest, self.to_xml().as_bytes())
            .map_err(|source| Error::Io {
                path: dest.to_path_buf(),
                source,
            })?;
        info!(path = %dest.display(), records = self.len(), "catalogue written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(names: &[&str]) -> Catalogue {
        let mut s = Catalogue::new();
        for n in names {
            s.insert(Record::new(*n));
        }
        s
    }

    #[test]
    fn names_are_unique_and_ordered() {
        let mut s = store(&["Rope", "Knife"]);
        assert!(!s.insert(Record::new("Rope")));
        assert_eq!(s.all_names(), ["Rope", "Knife"]);
    }

    #[test]
    fn find_is_exact_and_case_sensitive() {
        let s = store(&["Rope"]);
        assert!(s.find("Rope").is_ok());
        assert!(matches!(s.find("rope"), Err(Error::RecordNotFound(n)) if n == "rope"));
    }

    #[test]
    fn suggest_ignores_case() {
        let s = store(&["AKM", "Mag_AKM_30Rnd", "Apple"]);
        assert_eq!(s.suggest("akm"), ["AKM", "Mag_AKM_30Rnd"]);
        assert_eq!(s.suggest("").len(), 3);
    }
}
