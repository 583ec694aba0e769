//! Paper stock table and unit conversion.
//!
//! All dimensions in this module are millimeters; the DevTools print API
//! wants inches, so [`mm_to_inch`] sits at the boundary.

use std::sync::LazyLock;

use crate::error::AppError;

/// Millimeters per inch.
const MM_PER_INCH: f64 = 25.4;

/// One entry in the paper stock table.
#[derive(Debug, Clone, PartialEq)]
pub struct Stock {
    /// Short lookup key, e.g. `a4` or `letter`.
    pub key: String,
    /// Sheet height in millimeters.
    pub height_mm: f64,
    /// Sheet width in millimeters.
    pub width_mm: f64,
}

/// ISO series entry: the base sheet is halved along the long edge per step.
fn iso(prefix: &str, base_height: f64, base_width: f64, n: i32) -> Stock {
    let div = 2f64.powi(n - 1);
    Stock {
        key: format!("{prefix}{n}"),
        height_mm: base_height / div,
        width_mm: base_width / div,
    }
}

/// The full paper stock table: ISO A and B series plus named stocks.
pub static STOCKS: LazyLock<Vec<Stock>> = LazyLock::new(|| {
    let mut stocks = Vec::with_capacity(31);
    for n in 0..=10 {
        stocks.push(iso("a", 1189.0, 841.0, n));
    }
    for n in 0..=10 {
        stocks.push(iso("b", 1000.0, 707.0, n));
    }
    let named = [
        ("c5e", 229.0, 163.0),
        ("comm10e", 241.0, 105.0),
        ("dle", 220.0, 110.0),
        ("executive", 254.0, 190.5),
        ("folio", 330.0, 210.0),
        ("ledger", 279.4, 431.8),
        ("legal", 355.6, 215.9),
        ("letter", 279.4, 215.9),
        ("tabloid", 431.8, 279.4),
    ];
    for (key, height_mm, width_mm) in named {
        stocks.push(Stock {
            key: key.to_string(),
            height_mm,
            width_mm,
        });
    }
    stocks
});

/// Look up a paper stock by key (case-insensitive).
#[must_use]
pub fn lookup(key: &str) -> Option<&'static Stock> {
    STOCKS.iter().find(|s| s.key.eq_ignore_ascii_case(key))
}

/// Comma-separated list of all stock keys, for help text and error messages.
#[must_use]
pub fn known_keys() -> String {
    STOCKS
        .iter()
        .map(|s| s.key.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert an optional millimeter value to inches. `None` passes through.
#[must_use]
pub fn mm_to_inch(mm: Option<f64>) -> Option<f64> {
    mm.map(|v| v / MM_PER_INCH)
}

/// Resolve paper dimensions in millimeters.
///
/// Explicit `--paper-width`/`--paper-height` win per axis over the named
/// stock; with neither given, both stay `None` and the browser's own
/// default applies.
///
/// # Errors
///
/// Returns an error when `name` is not in the stock table.
pub fn resolve_paper(
    name: Option<&str>,
    width_mm: Option<f64>,
    height_mm: Option<f64>,
) -> Result<(Option<f64>, Option<f64>), AppError> {
    let stock = match name {
        Some(n) => {
            Some(lookup(n).ok_or_else(|| AppError::unknown_paper(n, &known_keys()))?)
        }
        None => None,
    };
    let width = width_mm.or(stock.map(|s| s.width_mm));
    let height = height_mm.or(stock.map(|s| s.height_mm));
    Ok((width, height))
}

/// Resolved per-side margins in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// Raw margin flags as given on the command line, in millimeters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarginSpec {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub all: Option<f64>,
    pub horiz: Option<f64>,
    pub vert: Option<f64>,
}

impl MarginSpec {
    /// True when no margin flag at all was given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top.is_none()
            && self.bottom.is_none()
            && self.left.is_none()
            && self.right.is_none()
            && self.all.is_none()
            && self.horiz.is_none()
            && self.vert.is_none()
    }

    /// Resolve the per-side values.
    ///
    /// Precedence per side: explicit side flag, then the matching
    /// horiz/vert shorthand, then `--margin-all`, then zero. Returns
    /// `None` when no margin flag was given so the browser default applies.
    #[must_use]
    pub fn resolve(&self) -> Option<Margins> {
        if self.is_empty() {
            return None;
        }
        Some(Margins {
            top: self.top.or(self.vert).or(self.all).unwrap_or(0.0),
            bottom: self.bottom.or(self.vert).or(self.all).unwrap_or(0.0),
            left: self.left.or(self.horiz).or(self.all).unwrap_or(0.0),
            right: self.right.or(self.horiz).or(self.all).unwrap_or(0.0),
        })
    }
}
