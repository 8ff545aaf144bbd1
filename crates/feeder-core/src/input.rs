//! Raw input records, one flat record per entity, grouped by kind tag.
//!
//! These are what a YAML/JSON reader produces. Every entity field is optional
//! so that missing required fields are reported by the network builder as
//! [`FeederError::Validation`](crate::FeederError) naming the entity, instead
//! of as an opaque deserializer error.
//!
//! ```yaml
//! Network:
//!   substation_bus: b1
//! Conductor:
//!   - name: cond1
//!     busses: [b1, b2]
//!     r1: 0.301
//!     x1: 0.627
//!     length: 100
//!   - busses: [b2, b3]
//!     template: cond1
//!     length: 200
//! Load:
//!   - bus: b3
//!     kws1: [5.6]
//!     kvars1: [1.2]
//! ```

use serde::{Deserialize, Deserializer, Serialize};

/// All entity records for one network, keyed by kind tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputRecords {
    #[serde(rename = "Network", default)]
    pub network: Option<NetworkInput>,
    #[serde(rename = "Conductor", default, deserialize_with = "opt_one_or_many")]
    pub conductors: Option<Vec<ConductorInput>>,
    #[serde(rename = "Transformer", default, deserialize_with = "one_or_many")]
    pub transformers: Vec<TransformerInput>,
    #[serde(rename = "VoltageRegulator", default, deserialize_with = "one_or_many")]
    pub voltage_regulators: Vec<VoltageRegulatorInput>,
    #[serde(rename = "Load", default, deserialize_with = "one_or_many")]
    pub loads: Vec<LoadInput>,
    #[serde(rename = "ShuntAdmittance", default, deserialize_with = "one_or_many")]
    pub shunt_admittances: Vec<ShuntAdmittanceInput>,
}

/// Network-wide parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInput {
    #[serde(default, deserialize_with = "opt_label")]
    pub substation_bus: Option<String>,
    /// Base apparent power
    #[serde(rename = "Sbase", alias = "sbase", default = "default_base")]
    pub sbase: f64,
    /// Base voltage
    #[serde(rename = "Vbase", alias = "vbase", default = "default_base")]
    pub vbase: f64,
    /// Source (substation) voltage in per-unit
    #[serde(default)]
    pub v0: SourceVoltage,
    #[serde(default = "default_v_lolim")]
    pub v_lolim: f64,
    #[serde(default = "default_v_uplim")]
    pub v_uplim: f64,
    /// Must agree with the Load series lengths when given
    #[serde(rename = "Ntimesteps", alias = "ntimesteps", default)]
    pub ntimesteps: Option<usize>,
}

fn default_base() -> f64 {
    1.0
}

fn default_v_lolim() -> f64 {
    0.9
}

fn default_v_uplim() -> f64 {
    1.1
}

impl Default for NetworkInput {
    fn default() -> Self {
        Self {
            substation_bus: None,
            sbase: default_base(),
            vbase: default_base(),
            v0: SourceVoltage::default(),
            v_lolim: default_v_lolim(),
            v_uplim: default_v_uplim(),
            ntimesteps: None,
        }
    }
}

impl NetworkInput {
    pub fn with_substation(bus: impl Into<String>) -> Self {
        Self {
            substation_bus: Some(bus.into()),
            ..Self::default()
        }
    }
}

/// Substation voltage reference: one value for all phases or one per phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceVoltage {
    Scalar(f64),
    PerPhase(Vec<f64>),
}

impl Default for SourceVoltage {
    fn default() -> Self {
        SourceVoltage::Scalar(1.0)
    }
}

/// Conductor record. Impedances are per unit length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConductorInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_labels")]
    pub busses: Option<Vec<String>>,
    #[serde(default)]
    pub phases: Option<Vec<usize>>,
    #[serde(default)]
    pub r0: Option<f64>,
    #[serde(default)]
    pub x0: Option<f64>,
    #[serde(default)]
    pub r1: Option<f64>,
    #[serde(default)]
    pub x1: Option<f64>,
    /// Lower triangle (or full square) in the order of `phases`
    #[serde(default)]
    pub rmatrix: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub xmatrix: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformerInput {
    #[serde(default, deserialize_with = "opt_labels")]
    pub busses: Option<Vec<String>>,
    #[serde(default)]
    pub high_kv: Option<f64>,
    #[serde(default)]
    pub low_kv: Option<f64>,
    #[serde(default)]
    pub phases: Option<Vec<usize>>,
    #[serde(default)]
    pub resistance: Option<f64>,
    #[serde(default)]
    pub reactance: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoltageRegulatorInput {
    #[serde(default, deserialize_with = "opt_labels")]
    pub busses: Option<Vec<String>>,
    #[serde(default)]
    pub high_kv: Option<f64>,
    #[serde(default)]
    pub low_kv: Option<f64>,
    #[serde(default)]
    pub phases: Option<Vec<usize>>,
    #[serde(default)]
    pub resistance: Option<f64>,
    #[serde(default)]
    pub reactance: Option<f64>,
    #[serde(default)]
    pub vreg_pu: Option<f64>,
    #[serde(default)]
    pub turn_ratio: Option<f64>,
}

/// Load record. Series are per phase; one entry per time step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadInput {
    #[serde(default, deserialize_with = "opt_label")]
    pub bus: Option<String>,
    #[serde(default)]
    pub kws1: Option<Vec<f64>>,
    #[serde(default)]
    pub kvars1: Option<Vec<f64>>,
    #[serde(default)]
    pub kws2: Option<Vec<f64>>,
    #[serde(default)]
    pub kvars2: Option<Vec<f64>>,
    #[serde(default)]
    pub kws3: Option<Vec<f64>>,
    #[serde(default)]
    pub kvars3: Option<Vec<f64>>,
    /// Reactive-to-real power ratio applied to every `kws` series
    #[serde(default)]
    pub q_to_p: Option<f64>,
    /// Path to a CSV with `kws1,kvars1,...` columns
    #[serde(default)]
    pub csv: Option<String>,
}

impl LoadInput {
    /// The real power series for phase 1..=3.
    pub fn kws(&self, phase: usize) -> Option<&Vec<f64>> {
        match phase {
            1 => self.kws1.as_ref(),
            2 => self.kws2.as_ref(),
            3 => self.kws3.as_ref(),
            _ => None,
        }
    }

    /// The reactive power series for phase 1..=3.
    pub fn kvars(&self, phase: usize) -> Option<&Vec<f64>> {
        match phase {
            1 => self.kvars1.as_ref(),
            2 => self.kvars2.as_ref(),
            3 => self.kvars3.as_ref(),
            _ => None,
        }
    }

    /// Set a series by its column name (`kws1` ... `kvars3`). Returns false
    /// for an unknown column.
    pub fn set_series(&mut self, column: &str, values: Vec<f64>) -> bool {
        let slot = match column {
            "kws1" => &mut self.kws1,
            "kvars1" => &mut self.kvars1,
            "kws2" => &mut self.kws2,
            "kvars2" => &mut self.kvars2,
            "kws3" => &mut self.kws3,
            "kvars3" => &mut self.kvars3,
            _ => return false,
        };
        *slot = Some(values);
        true
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShuntAdmittanceInput {
    #[serde(default, deserialize_with = "opt_label")]
    pub bus: Option<String>,
    /// Conductance in siemens
    #[serde(default)]
    pub g: Option<f64>,
    /// Susceptance in siemens
    #[serde(default)]
    pub b: Option<f64>,
}

// Bus labels are often plain numbers in feeder data files.
#[derive(Deserialize)]
#[serde(untagged)]
enum Label {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        match label {
            Label::Text(s) => s,
            Label::Int(i) => i.to_string(),
            Label::Float(f) => f.to_string(),
        }
    }
}

fn opt_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Label>::deserialize(deserializer)?.map(String::from))
}

fn opt_labels<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Label>>::deserialize(deserializer)?
        .map(|labels| labels.into_iter().map(String::from).collect()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<OneOrMany<T>>::deserialize(deserializer)?
        .map(Vec::from)
        .unwrap_or_default())
}

fn opt_one_or_many<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<OneOrMany<T>>::deserialize(deserializer)?.map(Vec::from))
}
