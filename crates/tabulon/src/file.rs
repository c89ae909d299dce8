//! The workbook aggregate
//!
//! A [`File`] owns the package of an opened or new workbook and decodes its
//! parts on first use: each worksheet through the [`WorksheetStore`], the
//! shared strings, the styles and the calc chain through load-once slots.
//! Saving re-encodes whatever was decoded and copies every other part as is.

use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use log::{debug, warn};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tabulon_core::{
    CalcChain, SharedStringTable, SharedWorksheet, StyleTable, Worksheet, WorksheetStore,
};
use tabulon_xlsx::content_types::{
    ContentTypes, CT_SHARED_STRINGS, CT_WORKSHEET,
};
use tabulon_xlsx::relationships::{
    rels_path, relative_target, resolve_target, Relationships, REL_CALC_CHAIN,
    REL_OFFICE_DOCUMENT, REL_SHARED_STRINGS, REL_STYLES, REL_WORKSHEET,
};
use tabulon_xlsx::template::{blank_package, DEFAULT_SHEET_NAME, WORKBOOK_PATH};
use tabulon_xlsx::{
    append_shared_strings, read_calc_chain, read_shared_strings, read_sheets, read_styles,
    read_worksheet, write_calc_chain, write_shared_strings, write_sheets, write_styles,
    write_worksheet, Package, PackageStore, SheetEntry, XlsxError, CONTENT_TYPES_PATH,
};

use crate::error::{Error, Result};
use crate::options::Options;

/// One sheet of the workbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetInfo {
    pub name: String,
    pub sheet_id: u32,
    /// Package path of the worksheet part
    pub path: String,
}

/// The shared string table plus how many of its entries the package
/// already holds
#[derive(Debug, Default)]
pub(crate) struct SharedStrings {
    pub table: SharedStringTable,
    pub known: usize,
}

/// An XLSX workbook.
///
/// `File` is `Send + Sync`; all methods take `&self` and lock the parts they
/// touch. A worksheet lock is always taken before the shared string lock.
#[derive(Debug)]
pub struct File {
    pub(crate) options: Options,
    pub(crate) package: RwLock<Package>,
    pub(crate) workbook_path: String,
    pub(crate) sheets: RwLock<Vec<SheetInfo>>,
    pub(crate) worksheets: WorksheetStore,
    pub(crate) shared_strings: OnceCell<RwLock<SharedStrings>>,
    pub(crate) styles: OnceCell<RwLock<StyleTable>>,
    pub(crate) calc_chain: OnceCell<RwLock<CalcChain>>,
}

impl Default for File {
    fn default() -> Self {
        Self::new()
    }
}

impl File {
    /// A new workbook with one empty sheet named `Sheet1`
    pub fn new() -> Self {
        let path = "xl/worksheets/sheet1.xml".to_string();
        let worksheets = WorksheetStore::new();
        worksheets.insert(&path, Worksheet::new());
        Self {
            options: Options::default(),
            package: RwLock::new(blank_package()),
            workbook_path: WORKBOOK_PATH.to_string(),
            sheets: RwLock::new(vec![SheetInfo {
                name: DEFAULT_SHEET_NAME.to_string(),
                sheet_id: 1,
                path,
            }]),
            worksheets,
            shared_strings: OnceCell::new(),
            styles: OnceCell::new(),
            calc_chain: OnceCell::new(),
        }
    }

    /// Open the workbook at `path` with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, Options::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::open_reader(BufReader::new(file), options)
    }

    /// Read a workbook from any seekable source.
    pub fn open_reader<R: Read + Seek>(reader: R, options: Options) -> Result<Self> {
        let package = Package::read_zip(reader, options.unzip_size_limit)?;
        Self::from_package(package, options)
    }

    fn from_package(package: Package, options: Options) -> Result<Self> {
        let workbook_path = package
            .load("_rels/.rels")
            .map(Relationships::read)
            .transpose()?
            .and_then(|rels| {
                rels.find_by_type(REL_OFFICE_DOCUMENT)
                    .map(|r| resolve_target("", &r.target))
            })
            .unwrap_or_else(|| WORKBOOK_PATH.to_string());
        let workbook = package
            .load(&workbook_path)
            .ok_or_else(|| XlsxError::MissingPart(workbook_path.clone()))?;
        let entries = read_sheets(workbook)?;
        let rels = part_rels(&package, &workbook_path)?;

        let mut sheets = Vec::with_capacity(entries.len());
        for entry in entries {
            match rels.get(&entry.rid) {
                Some(rel) => sheets.push(SheetInfo {
                    name: entry.name,
                    sheet_id: entry.sheet_id,
                    path: resolve_target(&workbook_path, &rel.target),
                }),
                None => warn!(
                    "sheet {:?} points at unknown relationship {}",
                    entry.name, entry.rid
                ),
            }
        }
        debug!("opened workbook with {} sheets", sheets.len());

        Ok(Self {
            options,
            package: RwLock::new(package),
            workbook_path,
            sheets: RwLock::new(sheets),
            worksheets: WorksheetStore::new(),
            shared_strings: OnceCell::new(),
            styles: OnceCell::new(),
            calc_chain: OnceCell::new(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Sheet names in workbook order
    pub fn get_sheet_list(&self) -> Vec<String> {
        self.sheets.read().iter().map(|s| s.name.clone()).collect()
    }

    /// Position of the sheet called `name` (case-insensitive)
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .read()
            .iter()
            .position(|s| s.name.to_lowercase() == name.to_lowercase())
    }

    pub(crate) fn sheet_info(&self, name: &str) -> Result<SheetInfo> {
        let index = self
            .sheet_index(name)
            .ok_or_else(|| tabulon_core::Error::SheetNotFound(name.to_string()))?;
        Ok(self.sheets.read()[index].clone())
    }

    /// Add an empty sheet and return its index. An existing sheet of that
    /// name is returned as is.
    pub fn new_sheet(&self, name: &str) -> Result<usize> {
        if let Some(index) = self.sheet_index(name) {
            return Ok(index);
        }
        let mut sheets = self.sheets.write();
        let sheet_id = sheets.iter().map(|s| s.sheet_id).max().unwrap_or(0) + 1;
        let mut package = self.package.write();
        let mut number = sheets.len() + 1;
        let path = loop {
            let candidate = format!("xl/worksheets/sheet{number}.xml");
            if !package.contains(&candidate) && !sheets.iter().any(|s| s.path == candidate) {
                break candidate;
            }
            number += 1;
        };

        let mut rels = part_rels(&package, &self.workbook_path)?;
        let rid = rels.add(
            REL_WORKSHEET,
            &relative_target(&self.workbook_path, &path),
            None,
        );
        package.store(&rels_path(&self.workbook_path), rels.to_xml().into_bytes());

        let workbook = load_text(&package, &self.workbook_path)?;
        let mut entries = read_sheets(workbook.as_bytes())?;
        entries.push(SheetEntry {
            name: name.to_string(),
            sheet_id,
            rid,
            extra_attrs: Vec::new(),
        });
        let workbook = write_sheets(&workbook, &entries)?;
        package.store(&self.workbook_path, workbook.into_bytes());
        set_content_type(&mut package, &path, CT_WORKSHEET)?;

        self.worksheets.insert(&path, Worksheet::new());
        sheets.push(SheetInfo {
            name: name.to_string(),
            sheet_id,
            path,
        });
        debug!("added sheet {name:?}");
        Ok(sheets.len() - 1)
    }

    /// The decoded worksheet called `sheet`, loaded on first use
    pub(crate) fn worksheet(&self, sheet: &str) -> Result<SharedWorksheet> {
        let path = self.sheet_info(sheet)?.path;
        self.worksheets.get_or_load(&path, || {
            let package = self.package.read();
            let bytes = package
                .load(&path)
                .ok_or_else(|| XlsxError::MissingPart(path.clone()))?;
            Ok::<_, Error>(read_worksheet(bytes)?)
        })
    }

    pub(crate) fn shared_strings(&self) -> Result<&RwLock<SharedStrings>> {
        self.shared_strings.get_or_try_init(|| {
            let package = self.package.read();
            let path = self.part_path(&package, REL_SHARED_STRINGS)?;
            let strings = match path.as_deref().and_then(|p| package.load(p)) {
                Some(bytes) => {
                    let table = read_shared_strings(bytes)?;
                    debug!("loaded {} shared strings", table.len());
                    SharedStrings {
                        known: table.len(),
                        table,
                    }
                }
                None => SharedStrings::default(),
            };
            Ok(RwLock::new(strings))
        })
    }

    pub(crate) fn styles(&self) -> Result<&RwLock<StyleTable>> {
        self.styles.get_or_try_init(|| {
            let package = self.package.read();
            let path = self.part_path(&package, REL_STYLES)?;
            let table = match path.as_deref().and_then(|p| package.load(p)) {
                Some(bytes) => read_styles(bytes)?,
                None => StyleTable::new(),
            };
            Ok(RwLock::new(table))
        })
    }

    pub(crate) fn calc_chain(&self) -> Result<&RwLock<CalcChain>> {
        self.calc_chain.get_or_try_init(|| {
            let package = self.package.read();
            let path = self.part_path(&package, REL_CALC_CHAIN)?;
            let chain = match path.as_deref().and_then(|p| package.load(p)) {
                Some(bytes) => read_calc_chain(bytes)?,
                None => CalcChain::default(),
            };
            Ok(RwLock::new(chain))
        })
    }

    /// Path of the workbook-level part of `rel_type`, if the workbook has one
    fn part_path(&self, package: &Package, rel_type: &str) -> Result<Option<String>> {
        let rels = part_rels(package, &self.workbook_path)?;
        Ok(rels
            .find_by_type(rel_type)
            .map(|r| resolve_target(&self.workbook_path, &r.target)))
    }

    /// Drop the cached values of every formula cell so that spreadsheet
    /// applications recalculate them on open.
    pub fn update_linked_value(&self) -> Result<()> {
        for name in self.get_sheet_list() {
            self.worksheet(&name)?.write().clear_formula_values();
        }
        Ok(())
    }

    /// Write the workbook to `path`.
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut writer = self.write_to(BufWriter::new(file))?;
        writer.flush()?;
        Ok(())
    }

    /// Write the workbook to a seekable sink and hand it back.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        self.flush()?;
        Ok(self.package.read().write_zip(writer)?)
    }

    /// Encode every decoded part back into the package.
    pub(crate) fn flush(&self) -> Result<()> {
        for (path, ws) in self.worksheets.loaded() {
            let xml = write_worksheet(&ws.read())?;
            self.package.write().store(&path, xml.into_bytes());
        }
        let mut package = self.package.write();
        if let Some(strings) = self.shared_strings.get() {
            self.flush_shared_strings(&mut package, &mut strings.write())?;
        }
        if let Some(styles) = self.styles.get() {
            let styles = styles.read();
            if styles.is_dirty() {
                match self.part_path(&package, REL_STYLES)? {
                    Some(path) => {
                        let xml = write_styles(&load_text(&package, &path)?, &styles)?;
                        package.store(&path, xml.into_bytes());
                    }
                    None => warn!("workbook has no styles part, dropping new number formats"),
                }
            }
        }
        if let Some(chain) = self.calc_chain.get() {
            self.flush_calc_chain(&mut package, &chain.read())?;
        }
        Ok(())
    }

    fn flush_shared_strings(&self, package: &mut Package, strings: &mut SharedStrings) -> Result<()> {
        if strings.table.len() == strings.known {
            return Ok(());
        }
        let path = match self.part_path(package, REL_SHARED_STRINGS)? {
            Some(path) => {
                let xml = match package.load(&path) {
                    Some(bytes) => append_shared_strings(
                        &String::from_utf8_lossy(bytes),
                        &strings.table,
                        strings.known,
                    )?,
                    None => write_shared_strings(&strings.table),
                };
                package.store(&path, xml.into_bytes());
                path
            }
            None => {
                let path = resolve_target(&self.workbook_path, "sharedStrings.xml");
                package.store(&path, write_shared_strings(&strings.table).into_bytes());
                self.add_workbook_part(package, REL_SHARED_STRINGS, &path, CT_SHARED_STRINGS)?;
                path
            }
        };
        debug!("wrote {} shared strings to {path}", strings.table.len());
        strings.known = strings.table.len();
        Ok(())
    }

    fn flush_calc_chain(&self, package: &mut Package, chain: &CalcChain) -> Result<()> {
        let Some(path) = self.part_path(package, REL_CALC_CHAIN)? else {
            return Ok(());
        };
        if !chain.is_empty() {
            package.store(&path, write_calc_chain(chain).into_bytes());
            return Ok(());
        }
        // An empty chain is invalid; drop the part with its references.
        package.remove(&path);
        let mut rels = part_rels(package, &self.workbook_path)?;
        let ids: Vec<String> = rels
            .iter()
            .filter(|r| r.rel_type == REL_CALC_CHAIN)
            .map(|r| r.id.clone())
            .collect();
        for id in ids {
            rels.remove(&id);
        }
        package.store(&rels_path(&self.workbook_path), rels.to_xml().into_bytes());
        update_content_types(package, |types| types.remove_override(&path))
    }

    fn add_workbook_part(
        &self,
        package: &mut Package,
        rel_type: &str,
        path: &str,
        content_type: &str,
    ) -> Result<()> {
        let mut rels = part_rels(package, &self.workbook_path)?;
        rels.add(rel_type, &relative_target(&self.workbook_path, path), None);
        package.store(&rels_path(&self.workbook_path), rels.to_xml().into_bytes());
        set_content_type(package, path, content_type)
    }
}

/// Relationships of `part`, empty when it has none
pub(crate) fn part_rels(package: &Package, part: &str) -> Result<Relationships> {
    match package.load(&rels_path(part)) {
        Some(bytes) => Ok(Relationships::read(bytes)?),
        None => Ok(Relationships::new()),
    }
}

fn load_text(package: &Package, path: &str) -> Result<String> {
    let bytes = package
        .load(path)
        .ok_or_else(|| XlsxError::MissingPart(path.to_string()))?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn update_content_types<F: FnOnce(&mut ContentTypes)>(package: &mut Package, f: F) -> Result<()> {
    let mut types = match package.load(CONTENT_TYPES_PATH) {
        Some(bytes) => ContentTypes::read(bytes)?,
        None => ContentTypes::default(),
    };
    f(&mut types);
    package.store(CONTENT_TYPES_PATH, types.to_xml().into_bytes());
    Ok(())
}

fn set_content_type(package: &mut Package, path: &str, content_type: &str) -> Result<()> {
    update_content_types(package, |types| types.set_override(path, content_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn test_new_file_has_one_sheet() {
        let f = File::new();
        assert_eq!(f.get_sheet_list(), vec!["Sheet1".to_string()]);
        assert_eq!(f.sheet_index("sheet1"), Some(0));
        assert!(matches!(
            f.worksheet("Nope"),
            Err(Error::Core(tabulon_core::Error::SheetNotFound(_)))
        ));
    }

    #[test]
    fn test_new_sheet_survives_round_trip() {
        let f = File::new();
        assert_eq!(f.new_sheet("Data").unwrap(), 1);
        assert_eq!(f.new_sheet("data").unwrap(), 1);

        let bytes = f.write_to(Cursor::new(Vec::new())).unwrap().into_inner();
        let reopened = File::open_reader(Cursor::new(bytes), Options::default()).unwrap();
        assert_eq!(
            reopened.get_sheet_list(),
            vec!["Sheet1".to_string(), "Data".to_string()]
        );
        assert_eq!(
            reopened.sheet_info("Data").unwrap().path,
            "xl/worksheets/sheet2.xml"
        );
    }

    #[test]
    fn test_size_limit() {
        let bytes = File::new()
            .write_to(Cursor::new(Vec::new()))
            .unwrap()
            .into_inner();
        let options = Options::default().with_unzip_size_limit(10);
        assert!(matches!(
            File::open_reader(Cursor::new(bytes), options),
            Err(Error::Xlsx(XlsxError::SizeLimit { limit: 10 }))
        ));
    }
}
