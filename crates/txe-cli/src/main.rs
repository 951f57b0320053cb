use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use txe_core::model::{CATEGORIES, USAGES, VALUE_TIERS};
use txe_core::{
    Error, FieldSet, Flag, ItemField, ItemPatch, JsonSettings, LocalFs, Patch, ScalarField,
    Session, TraderHeader,
};

#[derive(Parser, Debug)]
#[command(
    name = "txe",
    about = "Generate and edit types.xml catalogues and trader JSON files",
    version
)]
struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Settings file with saved operator defaults
    #[arg(long, global = true, default_value = "settings.json")]
    settings: PathBuf,
    /// Zip the previous version of a file before overwriting it
    #[arg(long, global = true, default_value_t = false)]
    backup: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate a types.xml from a name list and one shared set of fields
    Generate(GenerateArgs),
    /// List type names of a catalogue in document order
    Names(PathArgs),
    /// Show one type
    Show(ShowArgs),
    /// Case-insensitive name search
    Search(SearchArgs),
    /// Edit one type in place
    Edit(EditArgs),
    /// Apply the same fields to many types in place
    BulkEdit(BulkEditArgs),
    /// Generate a trader JSON file from a catalogue
    Trader(TraderArgs),
    /// Edit the header and/or one item of a trader JSON file
    TraderEdit(TraderEditArgs),
    /// Find types.xml catalogues below a directory
    Scan(PathArgs),
    /// Save field defaults to the settings file
    SettingsSave(FieldArgs),
    /// Print the settings file
    SettingsShow,
}

#[derive(ClapArgs, Debug, Default)]
struct FieldArgs {
    #[arg(long, allow_negative_numbers = true)]
    nominal: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    lifetime: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    restock: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    min: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    quantmin: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    quantmax: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    cost: Option<String>,
    /// Flag value, e.g. --flag crafted=1 (repeatable)
    #[arg(long = "flag", value_name = "NAME=VALUE")]
    flags: Vec<String>,
    /// Comma-separated categories; an empty string clears them
    #[arg(long)]
    categories: Option<String>,
    /// Comma-separated usages; an empty string clears them
    #[arg(long)]
    usages: Option<String>,
    /// Comma-separated value tiers; an empty string clears them
    #[arg(long)]
    values: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct GenerateArgs {
    /// Text file with type names separated by commas, spaces or new lines
    names: PathBuf,
    /// Output types.xml path
    #[arg(long, default_value = "types.xml")]
    out: PathBuf,
    /// Ignore the settings file and start from built-in defaults
    #[arg(long, default_value_t = false)]
    no_settings: bool,
    #[command(flatten)]
    fields: FieldArgs,
}

#[derive(ClapArgs, Debug)]
struct PathArgs {
    path: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct ShowArgs {
    path: PathBuf,
    name: String,
}

#[derive(ClapArgs, Debug)]
struct SearchArgs {
    path: PathBuf,
    query: String,
}

#[derive(ClapArgs, Debug)]
struct EditArgs {
    /// types.xml to edit in place
    path: PathBuf,
    /// Type name (exact, case-sensitive)
    name: String,
    #[command(flatten)]
    fields: FieldArgs,
}

#[derive(ClapArgs, Debug)]
struct BulkEditArgs {
    /// types.xml to edit in place
    path: PathBuf,
    /// Type names separated by commas or spaces
    #[arg(long, required_unless_present = "names_file")]
    names: Option<String>,
    /// File with type names separated by commas, spaces or new lines
    #[arg(long)]
    names_file: Option<PathBuf>,
    #[command(flatten)]
    fields: FieldArgs,
}

#[derive(ClapArgs, Debug)]
struct TraderArgs {
    /// Source types.xml
    types: PathBuf,
    /// Output trader JSON path
    #[arg(long, default_value = "trader.json")]
    out: PathBuf,
    #[arg(long, default_value = "My Category Title !")]
    display_name: String,
    #[arg(long, default_value = "Deliver")]
    icon: String,
    #[arg(long, default_value = "FBFCFEFF")]
    color: String,
    #[arg(long, default_value = "75", allow_negative_numbers = true)]
    init_stock: String,
}

#[derive(ClapArgs, Debug)]
struct TraderEditArgs {
    /// Trader JSON to edit in place
    path: PathBuf,
    #[arg(long)]
    display_name: Option<String>,
    #[arg(long)]
    icon: Option<String>,
    #[arg(long)]
    color: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    init_stock: Option<String>,
    /// ClassName of the item to patch
    #[arg(long)]
    item: Option<String>,
    #[arg(long, requires = "item", allow_negative_numbers = true)]
    max_price: Option<String>,
    #[arg(long, requires = "item", allow_negative_numbers = true)]
    min_price: Option<String>,
    #[arg(long, requires = "item", allow_negative_numbers = true)]
    sell_price: Option<String>,
    #[arg(long, requires = "item", allow_negative_numbers = true)]
    max_stock: Option<String>,
    #[arg(long, requires = "item", allow_negative_numbers = true)]
    min_stock: Option<String>,
    #[arg(long, requires = "item", allow_negative_numbers = true)]
    qty_percent: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let session = Session::local().with_backups(cli.backup);
    let settings = cli.settings;
    match cli.cmd {
        Cmd::Generate(a) => cmd_generate(session, &settings, a),
        Cmd::Names(a) => cmd_names(session, a),
        Cmd::Show(a) => cmd_show(session, a),
        Cmd::Search(a) => cmd_search(session, a),
        Cmd::Edit(a) => cmd_edit(session, a),
        Cmd::BulkEdit(a) => cmd_bulk_edit(session, a),
        Cmd::Trader(a) => cmd_trader(session, a),
        Cmd::TraderEdit(a) => cmd_trader_edit(session, a),
        Cmd::Scan(a) => cmd_scan(a),
        Cmd::SettingsSave(a) => cmd_settings_save(&settings, a),
        Cmd::SettingsShow => cmd_settings_show(&settings),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(e: &Error) -> i32 {
    match e {
        Error::MalformedDocument(_) | Error::SourceUnreadable { .. } => 2,
        Error::RecordNotFound(_) | Error::NoActiveDocument => 3,
        Error::Validation { .. } => 4,
        Error::Io { .. } => 5,
    }
}

fn die(e: Error) -> ! {
    eprintln!("error: {}", e);
    std::process::exit(exit_code(&e));
}

fn die_usage(msg: String) -> ! {
    eprintln!("error: {}", msg);
    std::process::exit(4);
}

fn progress_line(done: usize, total: usize) {
    eprint!("\rprocessed {}/{}", done, total);
    if done == total {
        eprintln!();
    }
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(str::to_string)
        .collect()
}

fn check_vocabulary(kind: &str, names: &[String], known: &[&str]) {
    for n in names {
        if !known.contains(&n.as_str()) {
            warn!(name = %n, "unknown {}", kind);
        }
    }
}

impl FieldArgs {
    fn scalars(&self) -> [(ScalarField, Option<&String>); 7] {
        [
            (ScalarField::Nominal, self.nominal.as_ref()),
            (ScalarField::Lifetime, self.lifetime.as_ref()),
            (ScalarField::Restock, self.restock.as_ref()),
            (ScalarField::Min, self.min.as_ref()),
            (ScalarField::Quantmin, self.quantmin.as_ref()),
            (ScalarField::Quantmax, self.quantmax.as_ref()),
            (ScalarField::Cost, self.cost.as_ref()),
        ]
    }

    fn flags(&self) -> Result<Vec<(Flag, String)>, String> {
        self.flags
            .iter()
            .map(|kv| {
                let (k, v) = kv
                    .split_once('=')
                    .ok_or_else(|| format!("--flag expects NAME=VALUE, got {:?}", kv))?;
                let flag = Flag::from_name(k.trim())
                    .ok_or_else(|| format!("unknown flag {:?}", k))?;
                Ok((flag, v.trim().to_string()))
            })
            .collect()
    }

    fn collections(&self) -> [Option<Vec<String>>; 3] {
        let cats = self.categories.as_deref().map(split_csv);
        let uses = self.usages.as_deref().map(split_csv);
        let vals = self.values.as_deref().map(split_csv);
        if let Some(c) = &cats {
            check_vocabulary("category", c, CATEGORIES);
        }
        if let Some(u) = &uses {
            check_vocabulary("usage", u, USAGES);
        }
        if let Some(v) = &vals {
            check_vocabulary("value tier", v, VALUE_TIERS);
        }
        [cats, uses, vals]
    }

    /// Only the given options; absent collections stay untouched.
    fn to_patch(&self) -> Result<Patch, String> {
        let mut patch = Patch::new();
        for (field, v) in self.scalars() {
            if let Some(v) = v {
                patch = patch.scalar(field, v.as_str());
            }
        }
        patch.flags = self.flags()?;
        let [cats, uses, vals] = self.collections();
        patch.categories = cats;
        patch.usages = uses;
        patch.values = vals;
        Ok(patch)
    }

    fn apply_to(&self, fs: &mut FieldSet) -> Result<(), String> {
        for (field, v) in self.scalars() {
            if let Some(v) = v {
                fs.set_scalar(field, v.as_str());
            }
        }
        for (flag, v) in self.flags()? {
            fs.set_flag(flag, v);
        }
        let [cats, uses, vals] = self.collections();
        if let Some(c) = cats {
            fs.categories = c;
        }
        if let Some(u) = uses {
            fs.usages = u;
        }
        if let Some(v) = vals {
            fs.values = v;
        }
        Ok(())
    }
}

fn read_names(path: &Path) -> Vec<String> {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
        die(Error::SourceUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    });
    txe_core::split_name_list(&text)
}

fn load_settings(path: &Path) -> JsonSettings {
    JsonSettings::load(&LocalFs, path).unwrap_or_else(|e| die(e))
}

fn cmd_generate(mut session: Session, settings: &Path, args: GenerateArgs) {
    let names = read_names(&args.names);
    let mut fields = FieldSet::generator_defaults();
    if !args.no_settings && settings.is_file() {
        fields.load_settings(&load_settings(settings));
    }
    args.fields.apply_to(&mut fields).unwrap_or_else(|e| die_usage(e));
    let mut sink = progress_line;
    let dups = session
        .generate_catalogue(&names, &fields, &args.out, Some(&mut sink))
        .unwrap_or_else(|e| die(e));
    for d in &dups {
        warn!(name = %d, "duplicate name skipped");
    }
    println!(
        "generated {} types at {}",
        names.len() - dups.len(),
        args.out.display()
    );
}

fn cmd_names(mut session: Session, args: PathArgs) {
    let store = session.open_catalogue(&args.path).unwrap_or_else(|e| die(e));
    for n in store.all_names() {
        println!("{}", n);
    }
}

fn cmd_show(mut session: Session, args: ShowArgs) {
    session.open_catalogue(&args.path).unwrap_or_else(|e| die(e));
    let r = session.find(&args.name).unwrap_or_else(|e| die(e));
    println!("name\t{}", r.name());
    for f in ScalarField::ALL {
        println!("{}\t{}", f.tag(), r.scalar(f));
    }
    for f in Flag::ALL {
        println!("{}\t{}", f.name(), r.flag(f));
    }
    println!("categories\t{}", r.categories().join(","));
    println!("usages\t{}", r.usages().join(","));
    println!("values\t{}", r.values().join(","));
}

fn cmd_search(mut session: Session, args: SearchArgs) {
    session.open_catalogue(&args.path).unwrap_or_else(|e| die(e));
    for n in session.suggest(&args.query).unwrap_or_else(|e| die(e)) {
        println!("{}", n);
    }
}

fn cmd_edit(mut session: Session, args: EditArgs) {
    let patch = args.fields.to_patch().unwrap_or_else(|e| die_usage(e));
    if patch.is_empty() {
        die_usage("nothing to change".into());
    }
    session.open_catalogue(&args.path).unwrap_or_else(|e| die(e));
    session
        .edit_record(&args.name, &patch)
        .unwrap_or_else(|e| die(e));
    println!("saved {} to {}", args.name, args.path.display());
}

fn cmd_bulk_edit(mut session: Session, args: BulkEditArgs) {
    let mut names = args
        .names
        .as_deref()
        .map(txe_core::split_name_list)
        .unwrap_or_default();
    if let Some(p) = &args.names_file {
        names.extend(read_names(p));
    }
    let patch = args.fields.to_patch().unwrap_or_else(|e| die_usage(e));
    session.open_catalogue(&args.path).unwrap_or_else(|e| die(e));
    let mut sink = progress_line;
    let report = session
        .bulk_edit(&names, &patch, Some(&mut sink))
        .unwrap_or_else(|e| die(e));
    for n in &report.missing {
        eprintln!("not found: {}", n);
    }
    println!(
        "updated {} of {} types in {}",
        report.applied.len(),
        names.len(),
        args.path.display()
    );
    if !report.is_complete() {
        std::process::exit(3);
    }
}

fn cmd_trader(mut session: Session, args: TraderArgs) {
    let header = TraderHeader {
        display_name: args.display_name,
        icon: args.icon,
        color: args.color,
        init_stock_percent: args.init_stock,
    };
    let doc = session
        .project_trader_file(&args.types, &header)
        .unwrap_or_else(|e| die(e));
    let count = doc.items.len();
    session.save_trader(doc, &args.out).unwrap_or_else(|e| die(e));
    println!("generated trader with {} items at {}", count, args.out.display());
}

fn cmd_trader_edit(mut session: Session, args: TraderEditArgs) {
    let current = session
        .open_trader(&args.path)
        .unwrap_or_else(|e| die(e))
        .header();
    let header_given = args.display_name.is_some()
        || args.icon.is_some()
        || args.color.is_some()
        || args.init_stock.is_some();
    let header = TraderHeader {
        display_name: args.display_name.unwrap_or(current.display_name),
        icon: args.icon.unwrap_or(current.icon),
        color: args.color.unwrap_or(current.color),
        init_stock_percent: args.init_stock.unwrap_or(current.init_stock_percent),
    };
    let mut patch = ItemPatch::new();
    for (field, v) in [
        (ItemField::MaxPriceThreshold, args.max_price),
        (ItemField::MinPriceThreshold, args.min_price),
        (ItemField::SellPricePercent, args.sell_price),
        (ItemField::MaxStockThreshold, args.max_stock),
        (ItemField::MinStockThreshold, args.min_stock),
        (ItemField::QuantityPercent, args.qty_percent),
    ] {
        if let Some(v) = v {
            patch = patch.set(field, v);
        }
    }
    if !header_given && args.item.is_none() {
        die_usage("nothing to change".into());
    }
    let item = args.item.as_deref().map(|name| (name, &patch));
    session
        .edit_trader(header_given.then_some(&header), item)
        .unwrap_or_else(|e| die(e));
    println!("saved {}", args.path.display());
}

fn cmd_scan(args: PathArgs) {
    for p in txe_core::scan::find_catalogues(&args.path) {
        println!("{}", p.display());
    }
}

fn cmd_settings_save(settings: &Path, args: FieldArgs) {
    let mut fields = FieldSet::generator_defaults();
    if settings.is_file() {
        fields.load_settings(&load_settings(settings));
    }
    args.apply_to(&mut fields).unwrap_or_else(|e| die_usage(e));
    let mut s = load_settings(settings);
    fields.store_settings(&mut s);
    s.save(&LocalFs, settings).unwrap_or_else(|e| die(e));
    println!("settings saved to {}", settings.display());
}

fn cmd_settings_show(settings: &Path) {
    for (k, v) in load_settings(settings).iter() {
        println!("{}\t{}", k, v);
    }
}
