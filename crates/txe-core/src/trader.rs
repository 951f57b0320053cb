//! Trader category documents (JSON) and their projection from a catalogue.
//!
//! A projection is one-way and lossy: only record names carry over, every
//! entry gets the fixed default thresholds below. Existing trader files are
//! edited through their own load → patch → save cycle.
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::edit::{validate_non_empty, validate_number};
use crate::error::{Error, Result};
use crate::files::FileStore;
use crate::store::Catalogue;

pub const TRADER_VERSION: i64 = 8;

pub const DEFAULT_MAX_PRICE: i64 = 1000;
pub const DEFAULT_MIN_PRICE: i64 = 500;
pub const DEFAULT_SELL_PRICE_PERCENT: i64 = -1;
pub const DEFAULT_MAX_STOCK: i64 = 50;
pub const DEFAULT_MIN_STOCK: i64 = 10;
pub const DEFAULT_QUANTITY_PERCENT: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraderDocument {
    #[serde(rename = "m_Version")]
    pub version: i64,
    pub display_name: String,
    pub icon: String,
    pub color: String,
    pub init_stock_percent: i64,
    pub items: Vec<TraderItem>,
    /// Keys this tool does not manage; written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraderItem {
    pub class_name: String,
    pub max_price_threshold: i64,
    pub min_price_threshold: i64,
    pub sell_price_percent: i64,
    pub max_stock_threshold: i64,
    pub min_stock_threshold: i64,
    pub quantity_percent: i64,
    #[serde(default)]
    pub spawn_attachments: Vec<Value>,
    #[serde(default)]
    pub variants: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TraderItem {
    pub fn with_defaults(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            max_price_threshold: DEFAULT_MAX_PRICE,
            min_price_threshold: DEFAULT_MIN_PRICE,
            sell_price_percent: DEFAULT_SELL_PRICE_PERCENT,
            max_stock_threshold: DEFAULT_MAX_STOCK,
            min_stock_threshold: DEFAULT_MIN_STOCK,
            quantity_percent: DEFAULT_QUANTITY_PERCENT,
            spawn_attachments: Vec::new(),
            variants: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn get(&self, field: ItemField) -> i64 {
        match field {
            ItemField::MaxPriceThreshold => self.max_price_threshold,
            ItemField::MinPriceThreshold => self.min_price_threshold,
            ItemField::SellPricePercent => self.sell_price_percent,
            ItemField::MaxStockThreshold => self.max_stock_threshold,
            ItemField::MinStockThreshold => self.min_stock_threshold,
            ItemField::QuantityPercent => self.quantity_percent,
        }
    }

    fn slot(&mut self, field: ItemField) -> &mut i64 {
        match field {
            ItemField::MaxPriceThreshold => &mut self.max_price_threshold,
            ItemField::MinPriceThreshold => &mut self.min_price_threshold,
            ItemField::SellPricePercent => &mut self.sell_price_percent,
            ItemField::MaxStockThreshold => &mut self.max_stock_threshold,
            ItemField::MinStockThreshold => &mut self.min_stock_threshold,
            ItemField::QuantityPercent => &mut self.quantity_percent,
        }
    }
}

/// The six numeric fields of a trader entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemField {
    MaxPriceThreshold,
    MinPriceThreshold,
    SellPricePercent,
    MaxStockThreshold,
    MinStockThreshold,
    QuantityPercent,
}

impl ItemField {
    pub const ALL: [ItemField; 6] = [
        ItemField::MaxPriceThreshold,
        ItemField::MinPriceThreshold,
        ItemField::SellPricePercent,
        ItemField::MaxStockThreshold,
        ItemField::MinStockThreshold,
        ItemField::QuantityPercent,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ItemField::MaxPriceThreshold => "MaxPriceThreshold",
            ItemField::MinPriceThreshold => "MinPriceThreshold",
            ItemField::SellPricePercent => "SellPricePercent",
            ItemField::MaxStockThreshold => "MaxStockThreshold",
            ItemField::MinStockThreshold => "MinStockThreshold",
            ItemField::QuantityPercent => "QuantityPercent",
        }
    }
}

/// Operator-entered header values, still unvalidated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraderHeader {
    pub display_name: String,
    pub icon: String,
    pub color: String,
    pub init_stock_percent: String,
}

impl Default for TraderHeader {
    fn default() -> Self {
        Self {
            display_name: "My Category Title !".into(),
            icon: "Deliver".into(),
            color: "FBFCFEFF".into(),
            init_stock_percent: "75".into(),
        }
    }
}

impl TraderHeader {
    /// Returns the parsed init-stock percent.
    pub fn validate(&self) -> Result<i64> {
        validate_non_empty("DisplayName", &self.display_name)?;
        validate_non_empty("Icon", &self.icon)?;
        validate_non_empty("Color", &self.color)?;
        if !self.color.trim().chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::validation("Color", self.color.as_str()));
        }
        validate_number("InitStockPercent", &self.init_stock_percent)
    }
}

/// Values for some of the six numeric fields of one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub fields: Vec<(ItemField, String)>,
}

impl ItemPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: ItemField, value: impl Into<String>) -> Self {
        self.fields.push((field, value.into()));
        self
    }

    fn parse(&self) -> Result<Vec<(ItemField, i64)>> {
        self.fields
            .iter()
            .map(|(f, v)| validate_number(f.key(), v).map(|n| (*f, n)))
            .collect()
    }
}

impl TraderDocument {
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| Error::MalformedDocument(e.to_string()))
    }

    /// Pretty JSON with 4-space indentation.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut buf = Vec::new();
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.class_name.as_str()).collect()
    }

    pub fn item(&self, class_name: &str) -> Result<&TraderItem> {
        self.items
            .iter()
            .find(|i| i.class_name == class_name)
            .ok_or_else(|| Error::RecordNotFound(class_name.to_string()))
    }

    pub fn header(&self) -> TraderHeader {
        TraderHeader {
            display_name: self.display_name.clone(),
            icon: self.icon.clone(),
            color: self.color.clone(),
            init_stock_percent: self.init_stock_percent.to_string(),
        }
    }

    pub fn apply_header(&mut self, header: &TraderHeader) -> Result<()> {
        let init = header.validate()?;
        self.display_name = header.display_name.clone();
        self.icon = header.icon.clone();
        self.color = header.color.trim().to_string();
        self.init_stock_percent = init;
        Ok(())
    }

    /// Patches the first entry with `class_name`; nothing changes on error.
    pub fn apply_item(&mut self, class_name: &str, patch: &ItemPatch) -> Result<()> {
        let parsed = patch.parse()?;
        let item = self
            .items
            .iter_mut()
            .find(|i| i.class_name == class_name)
            .ok_or_else(|| Error::RecordNotFound(class_name.to_string()))?;
        for (field, n) in parsed {
            *item.slot(field) = n;
        }
        Ok(())
    }

    /// Overwrites `dest` with the whole document.
    pub fn write<F: FileStore + ?Sized>(&self, files: &F, dest: &Path) -> Result<()> {
        let io_err = |source: io::Error| Error::Io {
            path: dest.to_path_buf(),
            source,
        };
        let json = self.to_json_pretty().map_err(|e| io_err(e.into()))?;
        files.write(dest, json.as_bytes()).map_err(io_err)?;
        info!(path = %dest.display(), items = self.items.len(), "trader document written");
        Ok(())
    }
}

/// One entry per record, in catalogue order, with the default thresholds.
pub fn project(store: &Catalogue, header: &TraderHeader) -> Result<TraderDocument> {
    let init_stock_percent = header.validate()?;
    Ok(TraderDocument {
        version: TRADER_VERSION,
        display_name: header.display_name.clone(),
        icon: header.icon.clone(),
        color: header.color.trim().to_string(),
        init_stock_percent,
        items: store.records().map(|r| TraderItem::with_defaults(r.name())).collect(),
        extra: Map::new(),
    })
}

/// Projects straight from a catalogue file. Read and parse failures of the
/// source are both reported as `SourceUnreadable`.
pub fn project_file<F: FileStore + ?Sized>(
    files: &F,
    source: &Path,
    header: &TraderHeader,
) -> Result<TraderDocument> {
    header.validate()?;
    let unreadable = |reason: String| Error::SourceUnreadable {
        path: source.to_path_buf(),
        reason,
    };
    let data = files.read(source).map_err(|e| unreadable(e.to_string()))?;
    let store = Catalogue::load_bytes(&data).map_err(|e| unreadable(e.to_string()))?;
    project(&store, header)
}
