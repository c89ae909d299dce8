//! The OPC package: every part of the ZIP container, keyed by path

use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};

use log::debug;
use zip::write::SimpleFileOptions;

use crate::error::{XlsxError, XlsxResult};

pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Storage for package parts.
///
/// Parts not decoded by any codec stay here as bytes and are written back
/// unchanged.
pub trait PackageStore {
    /// Bytes of the part at `path`
    fn load(&self, path: &str) -> Option<&[u8]>;
    /// Add or replace a part
    fn store(&mut self, path: &str, bytes: Vec<u8>);
    /// Remove a part, returning its bytes
    fn remove(&mut self, path: &str) -> Option<Vec<u8>>;
}

/// In-memory package with parts in path order
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl PackageStore for Package {
    fn load(&self, path: &str) -> Option<&[u8]> {
        self.parts.get(normalize_path(path)).map(Vec::as_slice)
    }

    fn store(&mut self, path: &str, bytes: Vec<u8>) {
        self.parts.insert(normalize_path(path).to_string(), bytes);
    }

    fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.parts.remove(normalize_path(path))
    }
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every file of a ZIP archive.
    ///
    /// Fails with [`XlsxError::SizeLimit`] once the uncompressed total would
    /// pass `size_limit`, and with [`XlsxError::InvalidFormat`] when the
    /// archive has no `[Content_Types].xml`.
    pub fn read_zip<R: Read + Seek>(reader: R, size_limit: u64) -> XlsxResult<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let mut package = Self::new();
        let mut total: u64 = 0;

        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().replace('\\', "/");
            total = total.saturating_add(file.size());
            if total > size_limit {
                return Err(XlsxError::SizeLimit { limit: size_limit });
            }
            // The declared size can lie; never read past the remaining budget.
            let budget = size_limit - (total - file.size());
            let mut bytes = Vec::with_capacity(file.size().min(budget) as usize);
            file.take(budget + 1).read_to_end(&mut bytes)?;
            if bytes.len() as u64 > budget {
                return Err(XlsxError::SizeLimit { limit: size_limit });
            }
            package.store(&name, bytes);
        }

        if !package.contains(CONTENT_TYPES_PATH) {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }
        debug!("read package with {} parts", package.len());
        Ok(package)
    }

    /// Write every part to a new ZIP archive, content types first.
    pub fn write_zip<W: Write + Seek>(&self, writer: W) -> XlsxResult<W> {
        let mut zip = zip::ZipWriter::new(writer);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let ordered = self
            .parts
            .get_key_value(CONTENT_TYPES_PATH)
            .into_iter()
            .chain(self.parts.iter().filter(|(p, _)| *p != CONTENT_TYPES_PATH));
        for (path, bytes) in ordered {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(bytes)?;
        }
        Ok(zip.finish()?)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.parts.contains_key(normalize_path(path))
    }

    /// Part paths in order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Part paths are stored without a leading slash.
fn normalize_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Package {
        let mut package = Package::new();
        package.store(CONTENT_TYPES_PATH, b"<Types/>".to_vec());
        package.store("/xl/workbook.xml", b"<workbook/>".to_vec());
        package
    }

    #[test]
    fn test_zip_round_trip() {
        let bytes = sample().write_zip(Cursor::new(Vec::new())).unwrap().into_inner();
        let package = Package::read_zip(Cursor::new(bytes), 1 << 20).unwrap();
        assert_eq!(package.len(), 2);
        assert_eq!(package.load("xl/workbook.xml"), Some(&b"<workbook/>"[..]));
        assert_eq!(package.load("/xl/workbook.xml"), Some(&b"<workbook/>"[..]));
    }

    #[test]
    fn test_size_limit() {
        let bytes = sample().write_zip(Cursor::new(Vec::new())).unwrap().into_inner();
        let err = Package::read_zip(Cursor::new(bytes), 10).unwrap_err();
        assert!(matches!(err, XlsxError::SizeLimit { limit: 10 }));
    }

    #[test]
    fn test_missing_content_types() {
        let mut package = Package::new();
        package.store("xl/workbook.xml", b"<workbook/>".to_vec());
        let bytes = package.write_zip(Cursor::new(Vec::new())).unwrap().into_inner();
        assert!(matches!(
            Package::read_zip(Cursor::new(bytes), 1 << 20),
            Err(XlsxError::InvalidFormat(_))
        ));
    }
}
