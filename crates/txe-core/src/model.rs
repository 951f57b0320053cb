// Record model for one item type of a types.xml catalogue.
// Scalars and flags are kept as text; range checks live in `edit`.
use std::fmt;

pub const CATEGORIES: &[&str] = &[
    "Clothes",
    "Containers",
    "Explosives",
    "Food",
    "Tools",
    "Vehicle Parts",
    "Weapons",
];

pub const USAGES: &[&str] = &[
    "Coast",
    "Farm",
    "Firefighter",
    "Hunting",
    "Industrial",
    "Medic",
    "Military",
    "Office",
    "Police",
    "Prison",
    "School",
    "Town",
    "Village",
];

pub const VALUE_TIERS: &[&str] = &["Tier1", "Tier2", "Tier3", "Tier4"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarField {
    Nominal,
    Lifetime,
    Restock,
    Min,
    Quantmin,
    Quantmax,
    Cost,
}

impl ScalarField {
    /// Document order.
    pub const ALL: [ScalarField; 7] = [
        ScalarField::Nominal,
        ScalarField::Lifetime,
        ScalarField::Restock,
        ScalarField::Min,
        ScalarField::Quantmin,
        ScalarField::Quantmax,
        ScalarField::Cost,
    ];

    /// Element name in the catalogue document.
    pub fn tag(self) -> &'static str {
        match self {
            ScalarField::Nominal => "nominal",
            ScalarField::Lifetime => "lifetime",
            ScalarField::Restock => "restock",
            ScalarField::Min => "min",
            ScalarField::Quantmin => "quantmin",
            ScalarField::Quantmax => "quantmax",
            ScalarField::Cost => "cost",
        }
    }

    /// Operator-facing label, also used as the settings key.
    pub fn label(self) -> &'static str {
        match self {
            ScalarField::Nominal => "Nominal",
            ScalarField::Lifetime => "Lifetime",
            ScalarField::Restock => "Restock",
            ScalarField::Min => "Min",
            ScalarField::Quantmin => "Quantmin",
            ScalarField::Quantmax => "Quantmax",
            ScalarField::Cost => "Cost",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.tag() == tag)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    CountInCargo,
    CountInHoarder,
    CountInMap,
    CountInPlayer,
    Crafted,
    Deloot,
}

impl Flag {
    pub const ALL: [Flag; 6] = [
        Flag::CountInCargo,
        Flag::CountInHoarder,
        Flag::CountInMap,
        Flag::CountInPlayer,
        Flag::Crafted,
        Flag::Deloot,
    ];

    /// Attribute name on the `<flags>` element; doubles as the settings key.
    pub fn name(self) -> &'static str {
        match self {
            Flag::CountInCargo => "count_in_cargo",
            Flag::CountInHoarder => "count_in_hoarder",
            Flag::CountInMap => "count_in_map",
            Flag::CountInPlayer => "count_in_player",
            Flag::Crafted => "crafted",
            Flag::Deloot => "deloot",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Known part of a `<type>` that a preserved element followed in its source.
/// The writer emits the element right after that part again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Scalar(ScalarField),
    Flags,
    Category,
    Usage,
    #[default]
    Value,
}

/// Child element of a `<type>` the model does not know about (e.g. `<tag name="floor"/>`).
/// Kept, with everything nested in it, so that a load/save cycle does not drop it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<ExtraElement>,
    /// Only meaningful on direct children of a `<type>`.
    pub after: Anchor,
}

/// Shared field values: the operator's form in generation mode, or the
/// source of a full patch in the editors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    pub scalars: [String; 7],
    pub flags: [String; 6],
    pub categories: Vec<String>,
    pub usages: Vec<String>,
    pub values: Vec<String>,
}

impl FieldSet {
    pub fn generator_defaults() -> Self {
        let mut fs = FieldSet::default();
        fs.set_scalar(ScalarField::Quantmin, "-1");
        fs.set_scalar(ScalarField::Quantmax, "-1");
        fs.set_scalar(ScalarField::Cost, "100");
        for flag in Flag::ALL {
            fs.set_flag(flag, if flag == Flag::CountInMap { "1" } else { "0" });
        }
        fs
    }

    pub fn scalar(&self, field: ScalarField) -> &str {
        &self.scalars[field.index()]
    }
    pub fn set_scalar(&mut self, field: ScalarField, value: impl Into<String>) {
        self.scalars[field.index()] = value.into();
    }
    pub fn flag(&self, flag: Flag) -> &str {
        &self.flags[flag.index()]
    }
    pub fn set_flag(&mut self, flag: Flag, value: impl Into<String>) {
        self.flags[flag.index()] = value.into();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    name: String,
    scalars: [String; 7],
    flags: [String; 6],
    categories: Vec<String>,
    usages: Vec<String>,
    values: Vec<String>,
    extra: Vec<ExtraElement>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scalars: Default::default(),
            flags: Default::default(),
            categories: Vec::new(),
            usages: Vec::new(),
            values: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// Generation mode: every record of a batch gets the same fields.
    pub fn from_fields(name: impl Into<String>, fields: &FieldSet) -> Self {
        let mut r = Self::new(name);
        r.scalars = fields.scalars.clone();
        r.flags = fields.flags.clone();
        r.replace_categories(fields.categories.iter().cloned());
        r.replace_usages(fields.usages.iter().cloned());
        r.replace_values(fields.values.iter().cloned());
        r
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scalar(&self, field: ScalarField) -> &str {
        &self.scalars[field.index()]
    }
    pub fn set_scalar(&mut self, field: ScalarField, value: impl Into<String>) {
        self.scalars[field.index()] = value.into();
    }

    pub fn flag(&self, flag: Flag) -> &str {
        &self.flags[flag.index()]
    }
    pub fn set_flag(&mut self, flag: Flag, value: impl Into<String>) {
        self.flags[flag.index()] = value.into();
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }
    pub fn usages(&self) -> &[String] {
        &self.usages
    }
    pub fn values(&self) -> &[String] {
        &self.values
    }
    pub fn extra(&self) -> &[ExtraElement] {
        &self.extra
    }

    pub fn replace_categories<I: IntoIterator<Item = String>>(&mut self, names: I) {
        self.categories = collect_names(names);
    }
    pub fn replace_usages<I: IntoIterator<Item = String>>(&mut self, names: I) {
        self.usages = collect_names(names);
    }
    pub fn replace_values<I: IntoIterator<Item = String>>(&mut self, names: I) {
        self.values = collect_names(names);
    }

    pub(crate) fn push_extra(&mut self, el: ExtraElement) {
        self.extra.push(el);
    }
}

// Insertion order kept, duplicates and blank names dropped.
fn collect_names<I: IntoIterator<Item = String>>(names: I) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for n in names {
        if n.trim().is_empty() || out.contains(&n) {
            continue;
        }
        out.push(n);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_collapse_duplicates_and_blanks() {
        let mut r = Record::new("Apple");
        r.replace_categories(["Food", "", "Food", "Tools"].map(String::from));
        assert_eq!(r.categories(), ["Food", "Tools"]);
        r.replace_values(["Tier2", " ", "Tier1"].map(String::from));
        assert_eq!(r.values(), ["Tier2", "Tier1"]);
    }

    #[test]
    fn from_fields_copies_shared_values() {
        let mut fs = FieldSet::generator_defaults();
        fs.usages = vec!["Town".into(), "Town".into()];
        let r = Record::from_fields("Rope", &fs);
        assert_eq!(r.name(), "Rope");
        assert_eq!(r.scalar(ScalarField::Quantmax), "-1");
        assert_eq!(r.flag(Flag::CountInMap), "1");
        assert_eq!(r.usages(), ["Town"]);
    }

    #[test]
    fn field_tables_cover_every_identifier() {
        for f in ScalarField::ALL {
            assert_eq!(ScalarField::from_tag(f.tag()), Some(f));
        }
        for f in Flag::ALL {
            assert_eq!(Flag::from_name(f.name()), Some(f));
        }
        assert_eq!(ScalarField::from_tag("flags"), None);
    }

    #[test]
    fn generator_defaults_match_form_defaults() {
        let fs = FieldSet::generator_defaults();
        assert_eq!(fs.scalar(ScalarField::Quantmin), "-1");
        assert_eq!(fs.scalar(ScalarField::Cost), "100");
        assert_eq!(fs.scalar(ScalarField::Nominal), "");
        assert_eq!(fs.flag(Flag::CountInMap), "1");
        assert_eq!(fs.flag(Flag::Deloot), "0");
    }
}
