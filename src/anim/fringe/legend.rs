//! Legend: mapping from fringe values to colors and tick marks.

use crate::anim::LegendConfig;

const MAX_TICKS: usize = 170;
const GREY: u32 = 0x8888_88ff;
const EPS: f64 = f32::EPSILON as f64;

/// Transform applied to values before normalization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValueMapping {
    #[default]
    Linear,
    Log10,
}

impl ValueMapping {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Linear" => Some(Self::Linear),
            "Log10" => Some(Self::Log10),
            _ => None,
        }
    }

    #[inline]
    fn apply(&self, v: f64) -> f64 {
        match self {
            Self::Linear => v,
            Self::Log10 => v.log10(),
        }
    }
}

/// Normalized value to RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMapping {
    #[default]
    FullColor,
    RedBlue,
    FullColorBw,
    FullColorClipped,
}

impl ColorMapping {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Full color" => Some(Self::FullColor),
            "Red-blue" => Some(Self::RedBlue),
            "Full color B/W limits" => Some(Self::FullColorBw),
            "Full color clipped limits" => Some(Self::FullColorClipped),
            _ => None,
        }
    }

    /// RGBA color (`0xrrggbbaa`) of a normalized value.
    pub fn color(&self, n: f64) -> u32 {
        let (undefined, above, below) = match self {
            Self::FullColor | Self::RedBlue => (GREY, 0xff00_00ff, 0x0000_ffff),
            Self::FullColorBw => (GREY, 0xffff_ffff, 0x0000_00ff),
            Self::FullColorClipped => (0, 0, 0),
        };
        if !n.is_finite() {
            return undefined;
        }
        if n > 1.0 + EPS {
            return above;
        }
        if n < -EPS {
            return below;
        }
        let n = n.clamp(0.0, 1.0);
        match self {
            Self::RedBlue => {
                let r = (n * 255.0) as u32;
                let b = ((1.0 - n) * 255.0) as u32;
                (r << 24) | (b << 8) | 0xff
            }
            _ => rainbow(n),
        }
    }
}

/// Blue-cyan-green-yellow-red ramp over 1024 steps.
fn rainbow(n: f64) -> u32 {
    let c = (n * 1023.0) as u32;
    if c >= 1023 {
        0xff00_00ff
    } else if c >= 767 {
        0xffff_00ff - (c - 767) * 0x0001_0000
    } else if c >= 511 {
        0x00ff_00ff + (c - 511) * 0x0100_0000
    } else if c >= 255 {
        0x00ff_ffff - (c - 255) * 0x0000_0100
    } else {
        0x0000_ffff + c * 0x0001_0000
    }
}

/// Legend tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    /// Position along the legend, 0 to 1.
    pub norm: f64,
    pub value: f64,
}

/// Value interval, mappings and tick layout of a fringe legend.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendMapping {
    min: f64,
    max: f64,
    value_mapping: ValueMapping,
    color_mapping: ColorMapping,
    tick_count: Option<usize>,
    tick_spacing: f64,
}

impl Default for LegendMapping {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.0e6,
            value_mapping: ValueMapping::Linear,
            color_mapping: ColorMapping::FullColor,
            tick_count: Some(5),
            tick_spacing: 1000.0,
        }
    }
}

impl LegendMapping {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max, ..Default::default() }
    }

    /// Legend from configuration. `found` is used when no explicit range is set.
    pub fn from_config(config: &LegendConfig, found: Option<(f64, f64)>) -> Self {
        let (min, max) = config.range.or(found).unwrap_or((0.0, 1.0));
        let value_mapping = ValueMapping::from_name(&config.value_mapping).unwrap_or_default();
        let color_mapping = ColorMapping::from_name(&config.color_mapping).unwrap_or_default();
        Self {
            min,
            max,
            value_mapping,
            color_mapping,
            tick_count: config.tick_count,
            tick_spacing: config.tick_spacing.unwrap_or(1.0),
        }
    }

    /// Set the interval. `min > max` flips the legend.
    pub fn set_range(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max;
    }

    #[inline]
    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    #[inline]
    pub fn is_flipped(&self) -> bool {
        self.min > self.max
    }

    #[inline]
    pub fn value_mapping(&self) -> ValueMapping {
        self.value_mapping
    }

    pub fn set_value_mapping(&mut self, mapping: ValueMapping) {
        self.value_mapping = mapping;
    }

    pub fn set_color_mapping(&mut self, mapping: ColorMapping) {
        self.color_mapping = mapping;
    }

    /// Ticks by count (`Some`) or by spacing (`None`).
    pub fn set_tick_count(&mut self, count: Option<usize>) {
        self.tick_count = count;
    }

    pub fn set_tick_spacing(&mut self, spacing: f64) {
        self.tick_spacing = spacing;
    }

    /// Position of `v` along the legend (0 at `min`, 1 at `max`).
    pub fn normalized(&self, v: f64) -> f64 {
        if !v.is_finite() {
            return v;
        }
        let m = |x: f64| self.value_mapping.apply(x);
        let span = m(self.max) - m(self.min);
        if span == 0.0 || !span.is_finite() {
            return 0.0;
        }
        (m(v) - m(self.min)) / span
    }

    /// RGBA color of `v`.
    #[inline]
    pub fn color(&self, v: f64) -> u32 {
        self.color_mapping.color(self.normalized(v))
    }

    /// Tick marks including both ends, in increasing value order.
    pub fn ticks(&self) -> Vec<Tick> {
        let (lo, hi) = if self.is_flipped() { (self.max, self.min) } else { (self.min, self.max) };
        let mut values = vec![lo];

        match self.tick_count {
            Some(count) => {
                let spacing = (hi - lo) / (count.min(MAX_TICKS) + 1) as f64;
                if spacing > 0.0 {
                    values.extend((1..=count.min(MAX_TICKS)).map(|i| lo + spacing * i as f64));
                }
            }
            None if self.value_mapping == ValueMapping::Log10 => {
                if hi > 0.0 {
                    let lo = lo.max(f64::EPSILON);
                    let step = self.tick_spacing.max(1.0);
                    let mut decade = lo.log10().floor() as i32;
                    while 10f64.powi(decade) < hi && values.len() < MAX_TICKS {
                        let base = 10f64.powi(decade);
                        let mut k = 1.0;
                        while k < 10.0 {
                            let v = k * base;
                            if v > lo && v < hi {
                                values.push(v);
                            }
                            k += step;
                        }
                        decade += 1;
                    }
                }
            }
            None => {
                let mut spacing = self.tick_spacing;
                if spacing > 0.0 {
                    if (hi - lo) / spacing > MAX_TICKS as f64 {
                        spacing = (hi - lo) / MAX_TICKS as f64;
                    }
                    let mut v = lo + (spacing - lo.rem_euclid(spacing));
                    while v < hi {
                        values.push(v);
                        v += spacing;
                    }
                }
            }
        }

        values.push(hi);
        values
            .into_iter()
            .map(|value| Tick { norm: self.normalized(value), value })
            .collect()
    }
}
