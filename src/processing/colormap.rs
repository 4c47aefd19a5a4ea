use ndarray::Array2;
use rayon::prelude::*;

use crate::frame::Frame;
use crate::processing::normalize::V_MAX;

const PALETTE_LEN: usize = V_MAX as usize + 1;

/// Built-in palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColormapKind {
    /// Blue → cyan → green → yellow → red.
    #[default]
    Jet,
    /// Black → red → yellow → white.
    Hot,
    Grayscale,
}

impl ColormapKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Jet => "jet",
            Self::Hot => "hot",
            Self::Grayscale => "gray",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jet" => Some(Self::Jet),
            "hot" => Some(Self::Hot),
            "gray" | "grey" | "grayscale" => Some(Self::Grayscale),
            _ => None,
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Self::Jet => Palette::jet(),
            Self::Hot => Palette::hot(),
            Self::Grayscale => Palette::grayscale(),
        }
    }
}

/// Ordered 256-entry lookup table from normalized intensity to a color.
#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [[u8; 3]; PALETTE_LEN],
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Palette")
            .field("first", &self.entries[0])
            .field("last", &self.entries[PALETTE_LEN - 1])
            .finish()
    }
}

#[inline]
fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl Palette {
    /// Build a palette by sampling `f` at `i / 255` for every entry.
    pub fn from_fn(f: impl Fn(f32) -> [f32; 3]) -> Self {
        let mut entries = [[0u8; 3]; PALETTE_LEN];
        for (i, entry) in entries.iter_mut().enumerate() {
            let [r, g, b] = f(i as f32 / V_MAX as f32);
            *entry = [unit_to_u8(r), unit_to_u8(g), unit_to_u8(b)];
        }
        Palette { entries }
    }

    pub fn jet() -> Self {
        Palette::from_fn(|v| {
            let r = 1.5 - (4.0 * v - 3.0).abs();
            let g = 1.5 - (4.0 * v - 2.0).abs();
            let b = 1.5 - (4.0 * v - 1.0).abs();
            [r, g, b]
        })
    }

    pub fn hot() -> Self {
        Palette::from_fn(|v| [3.0 * v, 3.0 * v - 1.0, 3.0 * v - 2.0])
    }

    pub fn grayscale() -> Self {
        Palette::from_fn(|v| [v, v, v])
    }

    #[inline]
    pub fn get(&self, value: u8) -> [u8; 3] {
        self.entries[value as usize]
    }

    /// Lookup with the optional inversion applied (`V_MAX - value`).
    #[inline]
    pub fn lookup(&self, value: u8, invert: bool) -> [u8; 3] {
        if invert {
            self.get(V_MAX - value)
        } else {
            self.get(value)
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::jet()
    }
}

/// Map each normalized sample through `palette`, producing a frame of the
/// same dimensions (`cols x rows`).
pub fn colorize(normalized: &Array2<u8>, invert: bool, palette: &Palette) -> Frame {
    let (height, width) = normalized.dim();
    let mut data = vec![0u8; width * height * 3];

    if width > 0 {
        data.par_chunks_mut(width * 3)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(3).enumerate() {
                    px.copy_from_slice(&palette.lookup(normalized[[y, x]], invert));
                }
            });
    }

    Frame::from_parts(data, width, height)
}
