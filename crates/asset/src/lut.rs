//! Scalar-to-color lookup table.

use corelib::Rgba;
use corelib::color::{hsv_to_rgb, lerp};

use crate::error::LutError;
use crate::mesh::{Mesh, RawLookupTable};

/// Hue of the first and last entry of the synthesized table (blue to red).
const DEFAULT_HUE_RANGE: (f64, f64) = (0.667, 0.0);

/// How a normalized scalar picks its color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LookupMode {
    /// Entry at `round(t * (N - 1))`.
    #[default]
    Nearest,
    /// Linear blend of the two neighbouring entries.
    Linear,
}

/// Where the table used for a conversion came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableSource {
    File(String),
    /// Synthesized hue ramp; `requested` names the table that could not be used.
    Default { requested: Option<String> },
}

/// Ordered RGBA palette plus the scalar range it spans. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct LookupTable {
    entries: Vec<Rgba>,
    lo: f64,
    hi: f64,
    nan_color: Rgba,
}

impl LookupTable {
    pub const DEFAULT_SIZE: usize = 256;
    pub const DEFAULT_NAN_COLOR: Rgba = [0.5, 0.0, 0.0, 1.0];

    /// Stores `entries` verbatim.
    pub fn build(entries: Vec<Rgba>, range: (f64, f64)) -> Result<Self, LutError> {
        if entries.is_empty() {
            return Err(LutError::Empty);
        }
        let mut table = Self {
            entries,
            lo: 0.0,
            hi: 1.0,
            nan_color: Self::DEFAULT_NAN_COLOR,
        };
        table.set_range(range.0, range.1)?;
        Ok(table)
    }

    /// `count` entries on a linear hue ramp from blue to red at full
    /// saturation and value, over the range `[0, 1]`.
    pub fn build_default(count: usize) -> Result<Self, LutError> {
        Self::build(hue_ramp(count), (0.0, 1.0))
    }

    /// Table from a parsed `LOOKUP_TABLE` block; an incomplete block is a
    /// [`LutError::CountMismatch`].
    pub fn from_parsed(raw: &RawLookupTable) -> Result<Self, LutError> {
        if raw.declared == 0 {
            return Err(LutError::Empty);
        }
        if !raw.complete {
            return Err(LutError::CountMismatch {
                name: raw.name.clone(),
                declared: raw.declared,
                found: raw.entries.len(),
            });
        }
        Self::build(raw.entries.clone(), (0.0, 1.0))
    }

    /// Table `name` from the mesh, falling back to a `default_size` hue ramp
    /// when it is absent or unusable. A zero `default_size` is raised to one.
    pub fn resolve(mesh: &Mesh, name: Option<&str>, default_size: usize) -> (Self, TableSource) {
        let Some(name) = name else {
            return (Self::fallback(default_size), TableSource::Default { requested: None });
        };

        let parsed = mesh
            .lookup_tables
            .get(name)
            .ok_or_else(|| LutError::NotFound {
                name: name.to_string(),
            })
            .and_then(Self::from_parsed);
        match parsed {
            Ok(table) => {
                log::debug!("Using lookup table '{name}' ({} entries)", table.len());
                (table, TableSource::File(name.to_string()))
            }
            Err(err) => {
                log::warn!("{err}; using a {default_size}-entry default table");
                (
                    Self::fallback(default_size),
                    TableSource::Default {
                        requested: Some(name.to_string()),
                    },
                )
            }
        }
    }

    fn fallback(size: usize) -> Self {
        Self {
            entries: hue_ramp(size.max(1)),
            lo: 0.0,
            hi: 1.0,
            nan_color: Self::DEFAULT_NAN_COLOR,
        }
    }

    /// `lo` must not exceed `hi` and both must be finite.
    pub fn set_range(&mut self, lo: f64, hi: f64) -> Result<(), LutError> {
        if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
            return Err(LutError::InvalidRange { lo, hi });
        }
        self.lo = lo;
        self.hi = hi;
        Ok(())
    }

    pub fn range(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Rgba] {
        &self.entries
    }

    pub fn nan_color(&self) -> Rgba {
        self.nan_color
    }

    pub fn set_nan_color(&mut self, color: Rgba) {
        self.nan_color = color;
    }

    /// Clamped position of `value` in `[0, 1]`; a zero-width range maps to 0.
    fn normalize(&self, value: f64) -> f64 {
        let span = self.hi - self.lo;
        if span <= 0.0 {
            return 0.0;
        }
        ((value.clamp(self.lo, self.hi) - self.lo) / span).clamp(0.0, 1.0)
    }

    /// Nearest-entry lookup.
    pub fn get_color(&self, value: f64) -> Rgba {
        if value.is_nan() {
            return self.nan_color;
        }
        let last = self.entries.len() - 1;
        let idx = (self.normalize(value) * last as f64).round() as usize;
        self.entries[idx.min(last)]
    }

    /// Linear interpolation between the two entries around `value`.
    pub fn get_color_interpolated(&self, value: f64) -> Rgba {
        if value.is_nan() {
            return self.nan_color;
        }
        let last = self.entries.len() - 1;
        let x = self.normalize(value) * last as f64;
        let i = (x.floor() as usize).min(last);
        let j = (i + 1).min(last);
        lerp(self.entries[i], self.entries[j], (x - i as f64) as f32)
    }

    pub fn map(&self, value: f64, mode: LookupMode) -> Rgba {
        match mode {
            LookupMode::Nearest => self.get_color(value),
            LookupMode::Linear => self.get_color_interpolated(value),
        }
    }
}

fn hue_ramp(count: usize) -> Vec<Rgba> {
    let (h0, h1) = DEFAULT_HUE_RANGE;
    (0..count)
        .map(|i| {
            let t = if count > 1 {
                i as f64 / (count - 1) as f64
            } else {
                0.0
            };
            let [r, g, b] = hsv_to_rgb(h0 + (h1 - h0) * t, 1.0, 1.0);
            [r, g, b, 1.0]
        })
        .collect()
}
