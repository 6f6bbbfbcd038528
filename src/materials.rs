use crate::error::{SLabResult, SpringLabError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// An RGB color key as it appears in the material table (`"RRGGBB"`, case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorKey(pub u8, pub u8, pub u8);

impl ColorKey {
    pub const WHITE: ColorKey = ColorKey(255, 255, 255);

    fn from_hex(hex: &str) -> Option<ColorKey> {
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(ColorKey(r, g, b))
    }
}

#[derive(Debug, Deserialize)]
struct MassSpec {
    nominal_mass: f32,
    density: f32,
}

#[derive(Debug, Deserialize)]
struct MaterialEntry {
    color_key: String,
    #[allow(dead_code)]
    name: String,
    mass: MassSpec,
    #[serde(default = "default_stiffness")]
    stiffness: f32,
    #[serde(default)]
    is_fixed: bool,
    #[serde(default)]
    is_bending_probe: bool,
}

fn default_stiffness() -> f32 {
    1.0
}

/// One entry of the color -> material table.
#[derive(Debug, Clone)]
pub struct StructuralMaterial {
    pub name: String,
    pub nominal_mass: f32,
    pub density: f32,
    pub stiffness: f32,
    pub is_fixed: bool,
    pub is_bending_probe: bool,
}

impl StructuralMaterial {
    /// The particle mass: `nominal_mass * density`.
    pub fn mass(&self) -> f32 {
        self.nominal_mass * self.density
    }

    /// `0.0` for a fixed (immovable) point, `1.0` otherwise.
    pub fn frozen_coefficient(&self) -> f32 {
        if self.is_fixed {
            0.0
        } else {
            1.0
        }
    }
}

/// Color-keyed material table, loaded from a JSON array.
#[derive(Debug)]
pub struct MaterialDatabase {
    by_color: HashMap<ColorKey, StructuralMaterial>,
}

impl MaterialDatabase {
    pub fn load_from_file(path: &Path) -> SLabResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SpringLabError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> SLabResult<Self> {
        let entries: Vec<MaterialEntry> = serde_json::from_str(text)?;

        let mut by_color = HashMap::with_capacity(entries.len());
        let mut bending_probe_seen = false;

        for entry in entries {
            let color = ColorKey::from_hex(&entry.color_key.to_uppercase())
                .ok_or_else(|| SpringLabError::InvalidColorKey(entry.color_key.clone()))?;

            if entry.is_bending_probe {
                if bending_probe_seen {
                    return Err(SpringLabError::MultipleBendingProbes);
                }
                bending_probe_seen = true;
            }

            by_color.insert(
                color,
                StructuralMaterial {
                    name: entry.name,
                    nominal_mass: entry.mass.nominal_mass,
                    density: entry.mass.density,
                    stiffness: entry.stiffness,
                    is_fixed: entry.is_fixed,
                    is_bending_probe: entry.is_bending_probe,
                },
            );
        }

        Ok(MaterialDatabase { by_color })
    }

    /// Looks up the material for a pixel color. Returns `None` for both
    /// "white/empty" and genuinely unrecognized colors; callers distinguish
    /// the two by also checking [`ColorKey::WHITE`].
    pub fn find(&self, color: ColorKey) -> Option<&StructuralMaterial> {
        self.by_color.get(&color)
    }
}
