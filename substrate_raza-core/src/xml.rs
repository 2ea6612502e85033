//! Reads the legacy xml configuration format.
//!
//! The file is expected to contain a `<domain>`, an `<overall>` and a `<microenvironment_setup>`
//! section.
//! Every substrate is described by one `<variable>` inside of the `<microenvironment_setup>`.
//! Any other section is ignored.
//! ```
//! # use substrate_raza_core::xml::parse_str;
//! let config = parse_str(r#"
//! <PhysiCell_settings>
//!     <domain>
//!         <x_min>0</x_min><x_max>80</x_max>
//!         <y_min>0</y_min><y_max>80</y_max>
//!         <z_min>-10</z_min><z_max>10</z_max>
//!         <dx>20</dx><dy>20</dy><dz>20</dz>
//!         <use_2D>true</use_2D>
//!     </domain>
//!     <overall>
//!         <dt_diffusion units="min">0.01</dt_diffusion>
//!     </overall>
//!     <microenvironment_setup>
//!         <variable name="oxygen" units="mmHg" ID="0">
//!             <physical_parameter_set>
//!                 <diffusion_coefficient units="micron^2/min">100000.0</diffusion_coefficient>
//!                 <decay_rate units="1/min">0.1</decay_rate>
//!             </physical_parameter_set>
//!             <initial_condition units="mmHg">38.0</initial_condition>
//!         </variable>
//!     </microenvironment_setup>
//! </PhysiCell_settings>
//! "#)?;
//! assert_eq!(config.domain.dims, 2);
//! assert_eq!(config.substrates[0].name, "oxygen");
//! # Ok::<(), substrate_raza_concepts::ConfigError>(())
//! ```
use std::path::Path;

use serde::Deserialize;
use substrate_raza_concepts::ConfigError;

use crate::config::{
    DirichletConfig, DirichletFaceConfig, DomainConfig, MicroenvironmentConfig, SubstrateConfig,
};
use crate::dirichlet::{Axis, Face};
use crate::storage::StorageError;

/// Element with a numeric value and optional units
#[derive(Clone, Debug, Deserialize)]
struct XmlValue {
    #[serde(rename = "@units", default)]
    units: Option<String>,
    #[serde(rename = "$text")]
    value: f64,
}

#[derive(Clone, Debug, Deserialize)]
struct XmlDomain {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    z_min: f64,
    z_max: f64,
    dx: f64,
    dy: f64,
    dz: f64,
    #[serde(rename = "use_2D", default)]
    use_2d: Option<String>,
    #[serde(default)]
    dims: Option<usize>,
}

#[derive(Clone, Debug, Deserialize)]
struct XmlOverall {
    dt_diffusion: XmlValue,
    #[serde(default)]
    time_units: Option<String>,
    #[serde(default)]
    space_units: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct XmlPhysicalParameters {
    diffusion_coefficient: XmlValue,
    decay_rate: XmlValue,
}

#[derive(Clone, Debug, Deserialize)]
struct XmlDirichletCondition {
    #[serde(rename = "@enabled", default)]
    enabled: Option<String>,
    #[serde(rename = "$text")]
    value: f64,
}

#[derive(Clone, Debug, Deserialize)]
struct XmlBoundaryValue {
    #[serde(rename = "@ID")]
    id: String,
    #[serde(rename = "@enabled", default)]
    enabled: Option<String>,
    #[serde(rename = "$text")]
    value: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct XmlDirichletOptions {
    #[serde(rename = "boundary_value", default)]
    boundary_values: Vec<XmlBoundaryValue>,
}

#[derive(Clone, Debug, Deserialize)]
struct XmlVariable {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@units", default)]
    units: Option<String>,
    physical_parameter_set: XmlPhysicalParameters,
    initial_condition: XmlValue,
    #[serde(rename = "Dirichlet_boundary_condition", default)]
    dirichlet_boundary_condition: Option<XmlDirichletCondition>,
    #[serde(rename = "Dirichlet_options", default)]
    dirichlet_options: Option<XmlDirichletOptions>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct XmlOptions {
    #[serde(default)]
    track_internalized_substrates_in_each_agent: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct XmlMicroenvironmentSetup {
    #[serde(rename = "variable", default)]
    variables: Vec<XmlVariable>,
    #[serde(default)]
    options: Option<XmlOptions>,
}

#[derive(Clone, Debug, Deserialize)]
struct XmlSettings {
    domain: XmlDomain,
    overall: XmlOverall,
    microenvironment_setup: XmlMicroenvironmentSetup,
}

/// Accepts the spellings of boolean values found in existing configuration files
fn parse_bool(value: &str, context: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError(format!(
            "expected a boolean value for {} but found \"{}\"",
            context, other
        ))),
    }
}

fn parse_face(id: &str) -> Result<(Axis, Face), ConfigError> {
    match id.trim().to_lowercase().as_str() {
        "xmin" => Ok((Axis::X, Face::Min)),
        "xmax" => Ok((Axis::X, Face::Max)),
        "ymin" => Ok((Axis::Y, Face::Min)),
        "ymax" => Ok((Axis::Y, Face::Max)),
        "zmin" => Ok((Axis::Z, Face::Min)),
        "zmax" => Ok((Axis::Z, Face::Max)),
        other => Err(ConfigError(format!(
            "unknown boundary ID \"{}\"; expected one of xmin, xmax, ymin, ymax, zmin, zmax",
            other
        ))),
    }
}

impl XmlDomain {
    fn convert(self) -> Result<DomainConfig, ConfigError> {
        let dims = match (self.dims, self.use_2d) {
            (Some(dims), _) => dims,
            (None, Some(use_2d)) if parse_bool(&use_2d, "<use_2D>")? => 2,
            (None, _) => 3,
        };
        Ok(DomainConfig {
            min: [self.x_min, self.y_min, self.z_min],
            max: [self.x_max, self.y_max, self.z_max],
            voxel_shape: [self.dx, self.dy, self.dz],
            dims,
        })
    }
}

impl XmlVariable {
    fn convert(self) -> Result<SubstrateConfig, ConfigError> {
        let context = format!("Dirichlet condition of variable \"{}\"", self.name);
        let mut dirichlet = match self.dirichlet_boundary_condition {
            Some(condition) => DirichletConfig {
                value: condition.value,
                enabled: match condition.enabled {
                    Some(enabled) => parse_bool(&enabled, &context)?,
                    None => false,
                },
                faces: Vec::new(),
            },
            None => DirichletConfig::default(),
        };
        for boundary in self
            .dirichlet_options
            .unwrap_or_default()
            .boundary_values
        {
            let (axis, face) = parse_face(&boundary.id)?;
            dirichlet.faces.push(DirichletFaceConfig {
                axis,
                face,
                value: boundary.value,
                enabled: match boundary.enabled {
                    Some(enabled) => parse_bool(&enabled, &context)?,
                    None => true,
                },
            });
        }
        Ok(SubstrateConfig {
            units: self
                .units
                .or(self.initial_condition.units)
                .unwrap_or("dimensionless".to_owned()),
            name: self.name,
            diffusion_coefficient: self.physical_parameter_set.diffusion_coefficient.value,
            decay_rate: self.physical_parameter_set.decay_rate.value,
            initial_condition: self.initial_condition.value,
            dirichlet,
        })
    }
}

impl TryFrom<XmlSettings> for MicroenvironmentConfig {
    type Error = ConfigError;

    fn try_from(settings: XmlSettings) -> Result<Self, Self::Error> {
        let setup = settings.microenvironment_setup;
        if setup.variables.is_empty() {
            return Err(ConfigError(
                "<microenvironment_setup> does not define any <variable>".to_owned(),
            ));
        }
        let track_internalized_substrates = match setup
            .options
            .unwrap_or_default()
            .track_internalized_substrates_in_each_agent
        {
            Some(value) => parse_bool(&value, "<track_internalized_substrates_in_each_agent>")?,
            None => false,
        };
        let config = MicroenvironmentConfig {
            domain: settings.domain.convert()?,
            dt: settings.overall.dt_diffusion.value,
            time_units: settings.overall.time_units.unwrap_or("min".to_owned()),
            space_units: settings.overall.space_units.unwrap_or("micron".to_owned()),
            substrates: setup
                .variables
                .into_iter()
                .map(XmlVariable::convert)
                .collect::<Result<_, _>>()?,
            interior_dirichlet: Vec::new(),
            track_internalized_substrates,
        };
        config.validate()?;
        Ok(config)
    }
}

fn deserialize(xml: &str) -> Result<XmlSettings, StorageError> {
    Ok(quick_xml::de::from_str(xml)?)
}

/// Parses a configuration from a string
pub fn parse_str(xml: &str) -> Result<MicroenvironmentConfig, ConfigError> {
    let settings = deserialize(xml)
        .map_err(|e| ConfigError(format!("malformed xml configuration: {}", e)))?;
    settings.try_into()
}

/// Reads and parses a configuration file
pub fn read_file(path: impl AsRef<Path>) -> Result<MicroenvironmentConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError(format!(
            "could not read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_str(&content).map_err(|e| ConfigError(format!("{}: {}", path.display(), e)))
}
