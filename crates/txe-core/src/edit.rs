// Edit engine: field patches over catalogue records.
// Highlights:
// - Every numeric field (scalars and flags) must be an integer >= -1.
// - A patch is validated as a whole before anything is written.
// - Collections in a patch replace the record's collections wholesale.
// - Bulk edits skip missing names and report them; generation always creates.
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{FieldSet, Flag, Record, ScalarField};
use crate::store::Catalogue;

/// Sentinel for "unset / no constraint".
pub const SENTINEL: i64 = -1;

/// "N of M processed" sink for front ends. Engine calls work without one.
pub trait Progress {
    fn report(&mut self, done: usize, total: usize);
}

impl<F: FnMut(usize, usize)> Progress for F {
    fn report(&mut self, done: usize, total: usize) {
        self(done, total)
    }
}

fn tick(progress: &mut Option<&mut dyn Progress>, done: usize, total: usize) {
    if let Some(p) = progress.as_deref_mut() {
        p.report(done, total);
    }
}

/// Parses `value` as an integer >= -1. Surrounding whitespace is ignored.
pub fn validate_number(field: &str, value: &str) -> Result<i64> {
    match value.trim().parse::<i64>() {
        Ok(n) if n >= SENTINEL => Ok(n),
        _ => Err(Error::validation(field, value)),
    }
}

/// Rejects empty or whitespace-only text.
pub fn validate_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, value));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub scalars: Vec<(ScalarField, String)>,
    pub flags: Vec<(Flag, String)>,
    pub categories: Option<Vec<String>>,
    pub usages: Option<Vec<String>>,
    pub values: Option<Vec<String>>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, field: ScalarField, value: impl Into<String>) -> Self {
        self.scalars.push((field, value.into()));
        self
    }

    pub fn flag(mut self, flag: Flag, value: impl Into<String>) -> Self {
        self.flags.push((flag, value.into()));
        self
    }

    pub fn categories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn usages<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.usages = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn values<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty()
            && self.flags.is_empty()
            && self.categories.is_none()
            && self.usages.is_none()
            && self.values.is_none()
    }

    /// Checks every numeric field; the first failure is returned.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in &self.scalars {
            validate_number(field.tag(), value)?;
        }
        for (flag, value) in &self.flags {
            validate_number(flag.name(), value)?;
        }
        Ok(())
    }

    /// Writes the patch into `record` without validating it.
    pub fn apply(&self, record: &mut Record) {
        for (field, value) in &self.scalars {
            record.set_scalar(*field, value.trim());
        }
        for (flag, value) in &self.flags {
            record.set_flag(*flag, value.trim());
        }
        if let Some(names) = &self.categories {
            record.replace_categories(names.iter().cloned());
        }
        if let Some(names) = &self.usages {
            record.replace_usages(names.iter().cloned());
        }
        if let Some(names) = &self.values {
            record.replace_values(names.iter().cloned());
        }
    }
}

/// A full patch: every field is written and every collection replaced.
impl From<&FieldSet> for Patch {
    fn from(fs: &FieldSet) -> Self {
        Patch {
            scalars: ScalarField::ALL
                .into_iter()
                .map(|f| (f, fs.scalar(f).to_string()))
                .collect(),
            flags: Flag::ALL
                .into_iter()
                .map(|f| (f, fs.flag(f).to_string()))
                .collect(),
            categories: Some(fs.categories.clone()),
            usages: Some(fs.usages.clone()),
            values: Some(fs.values.clone()),
        }
    }
}

/// Validates, looks up and patches one record. On any error the store is untouched.
pub fn edit_record(store: &mut Catalogue, name: &str, patch: &Patch) -> Result<()> {
    patch.validate()?;
    let record = store.find_mut(name)?;
    patch.apply(record);
    debug!(name, "record patched");
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub applied: Vec<String>,
    pub missing: Vec<String>,
}

impl BulkReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Applies one shared patch to every named record. Missing names are reported
/// and skipped; a validation failure rejects the batch before any record changes.
pub fn bulk_edit<S: AsRef<str>>(
    store: &mut Catalogue,
    names: &[S],
    patch: &Patch,
    mut progress: Option<&mut dyn Progress>,
) -> Result<BulkReport> {
    patch.validate()?;
    let total = names.len();
    let mut report = BulkReport::default();
    for (i, name) in names.iter().enumerate() {
        let name = name.as_ref();
        match store.find_mut(name) {
            Ok(record) => {
                patch.apply(record);
                report.applied.push(name.to_string());
            }
            Err(_) => {
                debug!(name, "bulk edit target not found");
                report.missing.push(name.to_string());
            }
        }
        tick(&mut progress, i + 1, total);
    }
    info!(
        applied = report.applied.len(),
        missing = report.missing.len(),
        "bulk edit applied"
    );
    Ok(report)
}

#[derive(Debug, Clone, Default)]
pub struct Generated {
    pub catalogue: Catalogue,
    /// Names that appeared more than once; only the first occurrence was kept.
    pub duplicates: Vec<String>,
}

/// Builds a fresh catalogue from a name list and one shared field set.
/// The field set is validated once, before any record is created.
pub fn generate<S: AsRef<str>>(
    names: &[S],
    fields: &FieldSet,
    mut progress: Option<&mut dyn Progress>,
) -> Result<Generated> {
    let patch = Patch::from(fields);
    patch.validate()?;
    let total = names.len();
    let mut out = Generated::default();
    for (i, name) in names.iter().enumerate() {
        let name = name.as_ref().trim();
        if !name.is_empty() {
            let mut record = Record::new(name);
            patch.apply(&mut record);
            if !out.catalogue.insert(record) {
                debug!(name, "duplicate name collapsed");
                out.duplicates.push(name.to_string());
            }
        }
        tick(&mut progress, i + 1, total);
    }
    info!(records = out.catalogue.len(), "catalogue generated");
    Ok(out)
}

/// Splits free-form name-list text on commas and any whitespace.
pub fn split_name_list(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
