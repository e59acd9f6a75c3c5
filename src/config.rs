//! Configuration management for FEM simulations
//!
//! Reads TOML configuration files with one section per model plus the shared
//! `[solver]` section. Every field has a default, so a file only needs to list
//! what it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::fem::LinearSystem;
use crate::physics::{
    Cloth, Diffuse, NavierStokes2D, Pbd, Poisson, SolidLinearDynamic, SolidLinearEigen, SolidLinearStatic,
    StokesDynamic2D, StokesStatic2D,
};

/// Main simulation configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub solver: SolverConfig,
    pub poisson: PoissonConfig,
    pub diffuse: DiffuseConfig,
    pub solid_static: SolidStaticConfig,
    pub solid_dynamic: SolidDynamicConfig,
    pub solid_eigen: SolidEigenConfig,
    pub cloth: ClothConfig,
    pub stokes_static: StokesStaticConfig,
    pub stokes_dynamic: StokesDynamicConfig,
    pub navier_stokes: NavierStokesConfig,
    pub pbd: PbdConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Iteration cap of PCG / BiCGSTAB
    pub max_iterations: usize,
    /// Relative residual at which the iteration stops
    pub conv_ratio: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self { max_iterations: 1000, conv_ratio: 1e-4 }
    }
}

impl SolverConfig {
    pub fn apply(&self, ls: &mut LinearSystem) {
        ls.max_iterations = self.max_iterations;
        ls.conv_ratio = self.conv_ratio;
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoissonConfig {
    pub alpha: f64,
    pub source: f64,
}

impl Default for PoissonConfig {
    fn default() -> Self {
        Self { alpha: 1.0, source: 0.0 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiffuseConfig {
    pub alpha: f64,
    pub rho: f64,
    pub source: f64,
    pub dt: f64,
    pub gamma_newmark: f64,
}

impl Default for DiffuseConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            rho: 1.0,
            source: 0.0,
            dt: 0.01,
            gamma_newmark: 0.6,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolidStaticConfig {
    /// Lamé shear modulus
    pub myu: f64,
    /// Lamé first parameter
    pub lambda: f64,
    pub rho: f64,
    pub gravity: [f64; 3],
}

impl Default for SolidStaticConfig {
    fn default() -> Self {
        Self {
            myu: 1.0,
            lambda: 0.0,
            rho: 1.0,
            gravity: [0.0; 3],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolidDynamicConfig {
    pub myu: f64,
    pub lambda: f64,
    pub rho: f64,
    pub gravity: [f64; 3],
    pub dt: f64,
    pub gamma_newmark: f64,
    pub beta_newmark: f64,
}

impl Default for SolidDynamicConfig {
    fn default() -> Self {
        Self {
            myu: 1.0,
            lambda: 0.0,
            rho: 1.0,
            gravity: [0.0; 3],
            dt: 0.1,
            gamma_newmark: 0.6,
            beta_newmark: 0.36,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolidEigenConfig {
    pub myu: f64,
    pub lambda: f64,
    pub rho: f64,
    /// Seed of the start vector
    pub seed: u64,
}

impl Default for SolidEigenConfig {
    fn default() -> Self {
        Self {
            myu: 1.0,
            lambda: 0.1,
            rho: 1.0,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClothConfig {
    pub dt: f64,
    pub stiff_stretch: f64,
    pub stiff_bend: f64,
    pub mass_point: f64,
    pub gravity: [f64; 3],
    pub contact_stiffness: f64,
    pub contact_clearance: f64,
}

impl Default for ClothConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            stiff_stretch: 500.0,
            stiff_bend: 10.0,
            mass_point: 1.0,
            gravity: [0.0, 0.0, -1.0],
            contact_stiffness: 10000.0,
            contact_clearance: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StokesStaticConfig {
    /// Dynamic viscosity
    pub myu: f64,
    pub gravity: [f64; 2],
}

impl Default for StokesStaticConfig {
    fn default() -> Self {
        Self { myu: 1.0, gravity: [0.0; 2] }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StokesDynamicConfig {
    pub myu: f64,
    pub rho: f64,
    pub gravity: [f64; 2],
    pub dt: f64,
    pub gamma_newmark: f64,
}

impl Default for StokesDynamicConfig {
    fn default() -> Self {
        Self {
            myu: 1.0,
            rho: 1.0,
            gravity: [0.0; 2],
            dt: 0.005,
            gamma_newmark: 0.6,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NavierStokesConfig {
    pub myu: f64,
    pub rho: f64,
    pub gravity: [f64; 2],
    pub dt: f64,
    pub gamma_newmark: f64,
}

impl Default for NavierStokesConfig {
    fn default() -> Self {
        Self {
            myu: 1.0,
            rho: 1000.0,
            gravity: [0.0; 2],
            dt: 0.1,
            gamma_newmark: 0.6,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PbdConfig {
    pub dt: f64,
    pub stiffness: f64,
    pub loop_count: usize,
}

impl Default for PbdConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            stiffness: 0.5,
            loop_count: 1,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: SimulationConfig =
            toml::from_str(contents).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the models would only fail on later
    pub fn validate(&self) -> Result<()> {
        let steps = [
            ("diffuse.dt", self.diffuse.dt),
            ("solid_dynamic.dt", self.solid_dynamic.dt),
            ("cloth.dt", self.cloth.dt),
            ("stokes_dynamic.dt", self.stokes_dynamic.dt),
            ("navier_stokes.dt", self.navier_stokes.dt),
            ("pbd.dt", self.pbd.dt),
        ];
        for (name, dt) in steps {
            if !(dt > 0.0) {
                return Err(Error::Config(format!("{} must be positive, got {}", name, dt)));
            }
        }
        let gammas = [
            ("diffuse.gamma_newmark", self.diffuse.gamma_newmark),
            ("solid_dynamic.gamma_newmark", self.solid_dynamic.gamma_newmark),
            ("stokes_dynamic.gamma_newmark", self.stokes_dynamic.gamma_newmark),
            ("navier_stokes.gamma_newmark", self.navier_stokes.gamma_newmark),
        ];
        for (name, gamma) in gammas {
            if !(gamma > 0.0 && gamma <= 1.0) {
                return Err(Error::Config(format!("{} must be in (0, 1], got {}", name, gamma)));
            }
        }
        if !(self.solid_dynamic.beta_newmark > 0.0) {
            return Err(Error::Config(format!(
                "solid_dynamic.beta_newmark must be positive, got {}",
                self.solid_dynamic.beta_newmark
            )));
        }
        if !(self.solver.conv_ratio > 0.0) {
            return Err(Error::Config(format!(
                "solver.conv_ratio must be positive, got {}",
                self.solver.conv_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.pbd.stiffness) {
            return Err(Error::Config(format!("pbd.stiffness must be in [0, 1], got {}", self.pbd.stiffness)));
        }
        Ok(())
    }

    pub fn poisson(&self) -> Poisson {
        Poisson::new(self.poisson.alpha, self.poisson.source)
    }

    pub fn diffuse(&self) -> Diffuse {
        let c = &self.diffuse;
        let mut model = Diffuse::new();
        model.alpha = c.alpha;
        model.rho = c.rho;
        model.source = c.source;
        model.dt = c.dt;
        model.gamma_newmark = c.gamma_newmark;
        model
    }

    pub fn solid_static(&self) -> SolidLinearStatic {
        let c = &self.solid_static;
        let mut model = SolidLinearStatic::new(c.gravity);
        model.myu = c.myu;
        model.lambda = c.lambda;
        model.rho = c.rho;
        model
    }

    pub fn solid_dynamic(&self) -> SolidLinearDynamic {
        let c = &self.solid_dynamic;
        let mut model = SolidLinearDynamic::new(c.gravity);
        model.myu = c.myu;
        model.lambda = c.lambda;
        model.rho = c.rho;
        model.dt = c.dt;
        model.gamma_newmark = c.gamma_newmark;
        model.beta_newmark = c.beta_newmark;
        model
    }

    pub fn solid_eigen(&self) -> SolidLinearEigen {
        let c = &self.solid_eigen;
        let mut model = SolidLinearEigen::new();
        model.myu = c.myu;
        model.lambda = c.lambda;
        model.rho = c.rho;
        model.seed = c.seed;
        model
    }

    pub fn cloth(&self) -> Cloth {
        let c = &self.cloth;
        let mut model = Cloth::new();
        model.dt = c.dt;
        model.stiff_stretch = c.stiff_stretch;
        model.stiff_bend = c.stiff_bend;
        model.mass_point = c.mass_point;
        model.gravity = c.gravity;
        model.contact_stiffness = c.contact_stiffness;
        model.contact_clearance = c.contact_clearance;
        model
    }

    pub fn stokes_static(&self) -> StokesStatic2D {
        let mut model = StokesStatic2D::new();
        model.myu = self.stokes_static.myu;
        model.gravity = self.stokes_static.gravity;
        model
    }

    pub fn stokes_dynamic(&self) -> StokesDynamic2D {
        let c = &self.stokes_dynamic;
        let mut model = StokesDynamic2D::new();
        model.myu = c.myu;
        model.rho = c.rho;
        model.gravity = c.gravity;
        model.dt = c.dt;
        model.gamma_newmark = c.gamma_newmark;
        model
    }

    pub fn navier_stokes(&self) -> NavierStokes2D {
        let c = &self.navier_stokes;
        let mut model = NavierStokes2D::new();
        model.myu = c.myu;
        model.rho = c.rho;
        model.gravity = c.gravity;
        model.dt = c.dt;
        model.gamma_newmark = c.gamma_newmark;
        model
    }

    pub fn pbd(&self) -> Pbd {
        let mut model = Pbd::new();
        model.dt = self.pbd.dt;
        model.stiffness = self.pbd.stiffness;
        model.loop_count = self.pbd.loop_count;
        model
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("═══════════════════════════════════════════════════════════════");
        println!("  Simulation Configuration");
        println!("═══════════════════════════════════════════════════════════════");
        println!("Solver:");
        println!("  max_iterations = {}, conv_ratio = {:.1e}", self.solver.max_iterations, self.solver.conv_ratio);
        println!("\nPoisson:        α = {}, source = {}", self.poisson.alpha, self.poisson.source);
        println!("Diffuse:        α = {}, ρ = {}, dt = {}", self.diffuse.alpha, self.diffuse.rho, self.diffuse.dt);
        println!(
            "Solid:          μ = {}, λ = {}, ρ = {}",
            self.solid_static.myu, self.solid_static.lambda, self.solid_static.rho
        );
        println!(
            "Solid dynamic:  dt = {}, γ = {}, β = {}",
            self.solid_dynamic.dt, self.solid_dynamic.gamma_newmark, self.solid_dynamic.beta_newmark
        );
        println!(
            "Cloth:          stretch = {}, bend = {}, contact = {} @ {}",
            self.cloth.stiff_stretch, self.cloth.stiff_bend, self.cloth.contact_stiffness, self.cloth.contact_clearance
        );
        println!(
            "Navier-Stokes:  μ = {}, ρ = {}, dt = {}",
            self.navier_stokes.myu, self.navier_stokes.rho, self.navier_stokes.dt
        );
        println!("PBD:            stiffness = {}, loops = {}", self.pbd.stiffness, self.pbd.loop_count);
        println!("═══════════════════════════════════════════════════════════════\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config.solver.max_iterations, 1000);
        assert_relative_eq!(config.solver.conv_ratio, 1e-4);
        assert_relative_eq!(config.diffuse.dt, 0.01);
        assert_relative_eq!(config.stokes_dynamic.dt, 0.005);
        assert_relative_eq!(config.navier_stokes.rho, 1000.0);
        assert_relative_eq!(config.navier_stokes.dt, 0.1);
        assert_eq!(config.cloth.gravity, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_partial_sections() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [solver]
            conv_ratio = 1e-8

            [navier_stokes]
            rho = 10.0

            [pbd]
            loop_count = 4
            "#,
        )
        .unwrap();
        assert_relative_eq!(config.solver.conv_ratio, 1e-8);
        assert_eq!(config.solver.max_iterations, 1000);
        assert_relative_eq!(config.navier_stokes.rho, 10.0);
        // other fields of an explicit section keep their defaults
        assert_relative_eq!(config.navier_stokes.dt, 0.1);
        assert_eq!(config.pbd().loop_count, 4);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            SimulationConfig::from_toml_str("[cloth]\ndt = -1.0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            SimulationConfig::from_toml_str("[pbd]\nstiffness = 2.0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(SimulationConfig::from_toml_str("[solver"), Err(Error::Config(_))));
        assert!(matches!(
            SimulationConfig::from_toml_str("[solver]\nmax_iterations = \"many\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_invalid_newmark_parameters() {
        for src in [
            "[diffuse]\ngamma_newmark = 1.5",
            "[solid_dynamic]\ngamma_newmark = 0.0",
            "[solid_dynamic]\nbeta_newmark = -0.1",
            "[stokes_dynamic]\ngamma_newmark = 2.0",
            "[navier_stokes]\ngamma_newmark = -0.6",
        ] {
            assert!(matches!(SimulationConfig::from_toml_str(src), Err(Error::Config(_))), "{}", src);
        }
        assert!(SimulationConfig::from_toml_str("[diffuse]\ngamma_newmark = 1.0").is_ok());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SimulationConfig::from_file("/nonexistent/femlinsys.toml"),
            Err(Error::Io(_))
        ));
    }
}
