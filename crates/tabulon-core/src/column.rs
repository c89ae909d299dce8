//! Column definitions (`<cols>`)

/// One `<col>` entry covering columns `min..=max`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnDef {
    /// First column (1-based)
    pub min: u32,
    /// Last column (inclusive)
    pub max: u32,
    pub width: Option<f64>,
    /// Column-level style index
    pub style: u32,
    pub hidden: bool,
    pub custom_width: bool,
    pub best_fit: bool,
    /// Outline/grouping level (0-7)
    pub outline_level: u8,
    pub collapsed: bool,
}

impl ColumnDef {
    /// Create column data for a range of columns
    pub fn range(min: u32, max: u32) -> Self {
        Self {
            min,
            max,
            ..Default::default()
        }
    }

    pub fn covers(&self, col: u32) -> bool {
        self.min <= col && col <= self.max
    }

    /// Set width
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self.custom_width = true;
        self
    }

    pub fn with_style(mut self, style: u32) -> Self {
        self.style = style;
        self
    }
}
