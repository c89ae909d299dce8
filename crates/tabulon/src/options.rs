//! Options for opening and reading workbooks

use std::sync::Arc;

use tabulon_core::{BuiltinRenderer, NumberFormatRenderer};

/// Default ceiling on the uncompressed size of an opened package (16 GiB)
pub const UNZIP_SIZE_LIMIT: u64 = 16 << 30;

/// Settings of a [`File`](crate::File)
#[derive(Debug, Clone)]
pub struct Options {
    /// Return stored values as written, without rounding or number formats
    pub raw_cell_value: bool,
    /// Maximum total uncompressed bytes accepted on open
    pub unzip_size_limit: u64,
    /// Renders values through their cell's number format
    pub number_format_renderer: Arc<dyn NumberFormatRenderer>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            raw_cell_value: false,
            unzip_size_limit: UNZIP_SIZE_LIMIT,
            number_format_renderer: Arc::new(BuiltinRenderer),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw_cell_value(mut self, raw: bool) -> Self {
        self.raw_cell_value = raw;
        self
    }

    pub fn with_unzip_size_limit(mut self, limit: u64) -> Self {
        self.unzip_size_limit = limit;
        self
    }

    pub fn with_number_format_renderer<R>(mut self, renderer: R) -> Self
    where
        R: NumberFormatRenderer + 'static,
    {
        self.number_format_renderer = Arc::new(renderer);
        self
    }
}
