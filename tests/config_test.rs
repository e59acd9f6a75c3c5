use approx::assert_relative_eq;
use femlinsys::{Error, SimulationConfig};
use std::fs;

#[test]
fn test_load_config_file() {
    let path = std::env::temp_dir().join(format!("femlinsys_config_{}.toml", std::process::id()));
    fs::write(
        &path,
        r#"
[solver]
conv_ratio = 1e-8

[cloth]
stiff_bend = 5.0
gravity = [0.0, -9.8, 0.0]

[navier_stokes]
rho = 1.0
"#,
    )
    .unwrap();
    let config = SimulationConfig::from_file(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_relative_eq!(config.solver.conv_ratio, 1e-8);
    assert_eq!(config.solver.max_iterations, 1000);

    let cloth = config.cloth();
    assert_relative_eq!(cloth.stiff_bend, 5.0);
    assert_relative_eq!(cloth.stiff_stretch, 500.0);
    assert_eq!(cloth.gravity, [0.0, -9.8, 0.0]);

    let ns = config.navier_stokes();
    assert_relative_eq!(ns.rho, 1.0);
    assert_relative_eq!(ns.dt, 0.1);
    assert_relative_eq!(config.stokes_dynamic().dt, 0.005);
}

#[test]
fn test_rejects_bad_values() {
    let err = SimulationConfig::from_toml_str("[pbd]\nstiffness = 2.0\n").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    let err = SimulationConfig::from_toml_str("[diffuse]\ndt = 0.0\n").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(SimulationConfig::from_toml_str("solver = 3").is_err());
    let err = SimulationConfig::from_toml_str("[diffuse]\ngamma_newmark = 1.5\n").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
