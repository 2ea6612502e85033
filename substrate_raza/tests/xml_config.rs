use std::io::Write;

use approx::assert_relative_eq;
use substrate_raza::prelude::*;

const SETTINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<PhysiCell_settings version="devel-version">
    <domain>
        <x_min>0</x_min>
        <x_max>100</x_max>
        <y_min>0</y_min>
        <y_max>100</y_max>
        <z_min>-10</z_min>
        <z_max>10</z_max>
        <dx>20</dx>
        <dy>20</dy>
        <dz>20</dz>
        <use_2D>true</use_2D>
    </domain>
    <overall>
        <max_time units="min">1</max_time>
        <time_units>min</time_units>
        <space_units>micron</space_units>
        <dt_diffusion units="min">0.01</dt_diffusion>
    </overall>
    <microenvironment_setup>
        <variable name="oxygen" units="mmHg" ID="0">
            <physical_parameter_set>
                <diffusion_coefficient units="micron^2/min">100000.0</diffusion_coefficient>
                <decay_rate units="1/min">0.1</decay_rate>
            </physical_parameter_set>
            <initial_condition units="mmHg">0.0</initial_condition>
            <Dirichlet_boundary_condition units="mmHg" enabled="True">38.0</Dirichlet_boundary_condition>
            <Dirichlet_options>
                <boundary_value ID="xmax" enabled="False">38.0</boundary_value>
            </Dirichlet_options>
        </variable>
        <variable name="nutrient" units="dimensionless" ID="1">
            <physical_parameter_set>
                <diffusion_coefficient units="micron^2/min">1000</diffusion_coefficient>
                <decay_rate units="1/min">0</decay_rate>
            </physical_parameter_set>
            <initial_condition units="dimensionless">1</initial_condition>
            <Dirichlet_boundary_condition units="dimensionless" enabled="false">0</Dirichlet_boundary_condition>
        </variable>
        <options>
            <track_internalized_substrates_in_each_agent>true</track_internalized_substrates_in_each_agent>
        </options>
    </microenvironment_setup>
</PhysiCell_settings>"#;

#[test]
fn simulate_from_xml_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(SETTINGS.as_bytes())?;
    let config = xml::read_file(file.path())?;
    assert_eq!(config.domain.dims, 2);
    assert!(config.track_internalized_substrates);

    let env = MicroenvironmentBuilder::from_config(config)
        .bulk(UniformBulk::new(2).with_uptake(1, 0.5))
        .build()?;
    assert_eq!(env.grid().n_voxels(), [5, 5, 1]);
    assert_eq!(env.space_units(), "micron");
    assert_eq!(env.substrate_index("nutrient")?, 1);
    assert!(env.track_internalized_substrates());

    let mut simulation =
        SubstrateSimulation::new(env, Settings::default(), &BackendRegistry::with_defaults())?;
    simulation.step(None, ReductionMode::Recompute);

    let env = simulation.env();
    let at = |x: usize, y: usize, s: usize| {
        env.densities()
            .get(env.grid().linear_index(x, y, 0), s)
    };
    // Every face except xmax is pinned
    assert_eq!(at(0, 2, 0), 38.0);
    assert_eq!(at(2, 0, 0), 38.0);
    assert_eq!(at(2, 4, 0), 38.0);
    assert_eq!(at(4, 4, 0), 38.0);
    assert!(at(4, 2, 0) < 38.0);
    // Uniform bulk uptake of the second substrate
    for (x, y) in [(0, 0), (2, 2), (4, 1)] {
        assert_relative_eq!(at(x, y, 1), 1.0 / (1.0 + 0.01 * 0.5), epsilon = 1e-12);
    }
    Ok(())
}

#[test]
fn invalid_settings_are_reported() {
    let broken = SETTINGS.replace("<dx>20</dx>", "<dx>twenty</dx>");
    assert!(xml::parse_str(&broken).is_err());

    let negative = SETTINGS.replace(
        "<diffusion_coefficient units=\"micron^2/min\">1000</diffusion_coefficient>",
        "<diffusion_coefficient units=\"micron^2/min\">-1000</diffusion_coefficient>",
    );
    assert!(xml::parse_str(&negative).is_err());

    let missing = tempfile::tempdir().unwrap();
    assert!(xml::read_file(missing.path().join("settings.xml")).is_err());
}
