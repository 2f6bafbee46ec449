//! Catalog of named parameter presets.
//!
//! A preset is stored as a flat record
//! `[family, colormap, x0, y0, a, b, ...]`; trailing unused parameters are
//! simply absent. Catalogs are JSON arrays of such records.

use crate::config::{CatalogConfig, DEFAULT_CATALOG_FILE};
use crate::engine::{Point, DEFAULT_SEED};
use crate::families::{family, Attractor};
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::PathBuf;

const BUILTIN_CATALOG: &str = include_str!("../data/attractors.json");

#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub family: String,
    pub colormap: String,
    /// Origin followed by the family parameters in signature order.
    pub values: Vec<f64>,
}

impl Preset {
    pub fn origin(&self) -> Option<Point> {
        match self.values.as_slice() {
            [x, y, ..] => Some(Point::new(*x, *y)),
            _ => None,
        }
    }

    pub fn params(&self) -> &[f64] {
        self.values.get(2..).unwrap_or(&[])
    }

    /// Record order: family, then colormap, then values left to right.
    pub fn cmp_records(&self, other: &Preset) -> Ordering {
        self.family
            .cmp(&other.family)
            .then_with(|| self.colormap.cmp(&other.colormap))
            .then_with(|| {
                self.values
                    .iter()
                    .zip(&other.values)
                    .map(|(a, b)| a.total_cmp(b))
                    .find(|ord| ord.is_ne())
                    .unwrap_or_else(|| self.values.len().cmp(&other.values.len()))
            })
    }

    /// Builds the attractor this record describes. The number of values must
    /// match the family exactly.
    pub fn to_attractor(&self) -> Result<Attractor> {
        let fam = family(&self.family)
            .ok_or_else(|| anyhow!("Unknown attractor family '{}'.", self.family))?;
        let expected = 2 + fam.params.len();
        if self.values.len() != expected {
            bail!(
                "{} presets need {} values (x, y, {}), got {}.",
                fam.name,
                expected,
                fam.param_names().join(", "),
                self.values.len()
            );
        }

        let mut attractor = Attractor::new(fam)?;
        attractor.colormap = self.colormap.clone();
        attractor.origin = Point::new(self.values[0], self.values[1]);
        attractor.set_params(self.params())?;
        Ok(attractor)
    }
}

impl Serialize for Preset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2 + self.values.len()))?;
        seq.serialize_element(&self.family)?;
        seq.serialize_element(&self.colormap)?;
        for value in &self.values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Preset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PresetVisitor;

        impl<'de> Visitor<'de> for PresetVisitor {
            type Value = Preset;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a record [family, colormap, x0, y0, params...]")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Preset, A::Error> {
                let family: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let colormap: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(value) = seq.next_element::<f64>()? {
                    values.push(value);
                }
                Ok(Preset {
                    family,
                    colormap,
                    values,
                })
            }
        }

        deserializer.deserialize_seq(PresetVisitor)
    }
}

/// An ordered list of presets with one of them selected.
pub struct ParameterSets {
    config: CatalogConfig,
    examples: Vec<Preset>,
    current: Option<Preset>,
    rng: StdRng,
}

impl ParameterSets {
    /// Reads the catalog named by `config`.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let mut sets = Self::from_presets(config, Vec::new());
        sets.load()?;
        Ok(sets)
    }

    /// The catalog bundled with the crate, with the default file locations.
    pub fn builtin() -> Result<Self> {
        let presets: Vec<Preset> =
            serde_json::from_str(BUILTIN_CATALOG).context("Bundled preset catalog is invalid.")?;
        Ok(Self::from_presets(CatalogConfig::default(), presets))
    }

    pub fn from_presets(config: CatalogConfig, examples: Vec<Preset>) -> Self {
        let current = examples.first().cloned();
        Self {
            config,
            examples,
            current,
            rng: StdRng::seed_from_u64(DEFAULT_SEED),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn examples(&self) -> &[Preset] {
        &self.examples
    }

    pub fn current(&self) -> Option<&Preset> {
        self.current.as_ref()
    }

    /// Replaces the list with the input file's records and selects the first.
    /// An empty file leaves the current list untouched.
    pub fn load(&mut self) -> Result<()> {
        let path = self.config.input_path();
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read presets from {}", path.display()))?;
        let presets: Vec<Preset> = serde_json::from_str(&text)
            .with_context(|| format!("Invalid preset catalog {}", path.display()))?;
        info!("loaded {} presets from {}", presets.len(), path.display());
        if !presets.is_empty() {
            self.current = presets.first().cloned();
            self.examples = presets;
        }
        Ok(())
    }

    /// Writes the list to the output file. The default catalog and the file
    /// this list was loaded from are never overwritten.
    pub fn save(&self) -> Result<PathBuf> {
        if self.config.output_file == DEFAULT_CATALOG_FILE
            || self.config.output_file == self.config.input_file
        {
            bail!("Cannot override the default attractors file.");
        }
        let path = self.config.output_path();
        let text = serde_json::to_string_pretty(&self.examples)?;
        fs::write(&path, text)
            .with_context(|| format!("Failed to write presets to {}", path.display()))?;
        info!("saved {} presets to {}", self.examples.len(), path.display());
        Ok(path)
    }

    pub fn select(&mut self, index: usize) -> Result<&Preset> {
        let preset = self.examples.get(index).cloned().ok_or_else(|| {
            anyhow!(
                "Preset index {index} out of range ({} presets).",
                self.examples.len()
            )
        })?;
        Ok(&*self.current.insert(preset))
    }

    /// Shuffles the list in place. The selection is unchanged.
    pub fn randomize(&mut self) {
        self.examples.shuffle(&mut self.rng);
        debug!("shuffled {} presets", self.examples.len());
    }

    pub fn sort(&mut self) {
        self.examples.sort_by(Preset::cmp_records);
    }

    /// Appends `preset` and selects it.
    pub fn add(&mut self, preset: Preset) {
        self.examples.push(preset.clone());
        self.current = Some(preset);
    }

    /// Stores the attractor's current settings as a new preset.
    pub fn remember(&mut self, attractor: &Attractor) {
        self.add(attractor.vals());
    }

    /// Every preset of the named family, in list order.
    pub fn args(&self, name: &str) -> Vec<&Preset> {
        self.examples.iter().filter(|p| p.family == name).collect()
    }

    /// The named family set up from its first preset, or from the family
    /// defaults when the list has none.
    pub fn get_attractor(&self, name: &str) -> Result<Attractor> {
        match self.args(name).first() {
            Some(preset) => preset.to_attractor(),
            None => Attractor::named(name),
        }
    }
}
