//! Feature transforms: column encoding, imputation, standardization.

use crate::error::MlError;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Cell values treated as missing.
const MISSING_TOKENS: &[&str] = &["", "na", "nan", "null", "none"];

pub fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    MISSING_TOKENS.iter().any(|t| cell.eq_ignore_ascii_case(t))
}

/// Parse a numeric cell; infinities and NaN count as missing.
fn parse_finite(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// How a raw column was turned into numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnEncoding {
    Numeric,
    /// Ordinal codes; `categories[code]` is the original value.
    Ordinal { categories: Vec<String> },
}

/// Encode one raw column as `f64`, imputing missing cells with the column mean.
///
/// A column is numeric when every present cell parses as a float; otherwise
/// its distinct values are sorted and replaced by their position. Non-finite
/// numbers (`inf`, `-inf`, `NaN`) are imputed like empty cells.
pub fn encode_column<'a, I>(cells: I) -> (Vec<f64>, ColumnEncoding)
where
    I: IntoIterator<Item = &'a str>,
{
    let cells: Vec<&str> = cells.into_iter().collect();
    let numeric = cells
        .iter()
        .filter(|c| !is_missing(c))
        .all(|c| c.trim().parse::<f64>().is_ok());

    let (encoded, encoding): (Vec<Option<f64>>, ColumnEncoding) = if numeric {
        let values = cells
            .iter()
            .map(|c| {
                if is_missing(c) {
                    None
                } else {
                    parse_finite(c)
                }
            })
            .collect();
        (values, ColumnEncoding::Numeric)
    } else {
        let mut codes: BTreeMap<&str, usize> = BTreeMap::new();
        for cell in cells.iter().filter(|c| !is_missing(c)) {
            codes.insert(cell.trim(), 0);
        }
        for (code, slot) in codes.values_mut().enumerate() {
            *slot = code;
        }
        let values = cells
            .iter()
            .map(|c| {
                if is_missing(c) {
                    None
                } else {
                    codes.get(c.trim()).map(|&code| code as f64)
                }
            })
            .collect();
        let categories = codes.keys().map(|k| k.to_string()).collect();
        (values, ColumnEncoding::Ordinal { categories })
    };

    let present: Vec<f64> = encoded.iter().flatten().copied().collect();
    let fill = if present.is_empty() {
        0.0
    } else {
        let n = present.len() as f64;
        present.iter().map(|v| v / n).sum::<f64>()
    };
    (
        encoded.into_iter().map(|v| v.unwrap_or(fill)).collect(),
        encoding,
    )
}

/// Sort distinct label values: numerically when all of them parse as numbers,
/// lexicographically otherwise.
pub fn sorted_classes<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut distinct: Vec<String> = values.into_iter().map(str::to_string).collect();
    distinct.sort();
    distinct.dedup();

    let numeric: Option<Vec<f64>> = distinct.iter().map(|v| v.parse::<f64>().ok()).collect();
    if let Some(keys) = numeric {
        let mut keyed: Vec<(f64, String)> = keys.into_iter().zip(distinct).collect();
        keyed.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        keyed.into_iter().map(|(_, v)| v).collect()
    } else {
        distinct
    }
}

/// Per-feature standardization to zero mean and unit (population) variance.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self, MlError> {
        if x.nrows() == 0 {
            return Err(MlError::data("cannot fit a scaler on zero rows"));
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| MlError::data("cannot fit a scaler on zero rows"))?;
        let scale = x.std_axis(Axis(0), 0.0).mapv(|s| {
            if s.is_finite() && s > f64::EPSILON {
                s
            } else {
                1.0
            }
        });
        Ok(Self { mean, scale })
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, MlError> {
        if x.ncols() != self.mean.len() {
            return Err(MlError::data(format!(
                "scaler was fit on {} features, got {}",
                self.mean.len(),
                x.ncols()
            )));
        }
        Ok((&x - &self.mean) / &self.scale)
    }

    pub fn fit_transform(x: ArrayView2<'_, f64>) -> Result<(Self, Array2<f64>), MlError> {
        let scaler = Self::fit(x)?;
        let scaled = scaler.transform(x)?;
        Ok((scaler, scaled))
    }
}
