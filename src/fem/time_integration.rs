//! Time integration of solved increments into field state
//!
//! Models built on the linear-system driver solve for an increment `x` and
//! then update their state with one of these schemes.

use crate::error::{Error, Result};
use crate::mesh::NodalField;

fn check_step(dt: f64, gamma: f64) -> Result<()> {
    if !(dt > 0.0 && dt.is_finite()) {
        return Err(Error::Config(format!("time step must be positive, got {}", dt)));
    }
    if !(gamma > 0.0 && gamma <= 1.0) {
        return Err(Error::Config(format!("Newmark gamma must be in (0, 1], got {}", gamma)));
    }
    Ok(())
}

/// First-order Newmark scheme (generalized trapezoidal rule)
///
/// The increment is the change of the time derivative:
/// - `value += dt·γ·x + dt·velocity`
/// - `velocity += x`
///
/// Used for diffusion and (Navier-)Stokes flow.
#[derive(Debug, Clone, Copy)]
pub struct NewmarkFirstOrder {
    pub dt: f64,
    pub gamma: f64,
}

impl NewmarkFirstOrder {
    pub fn new(dt: f64, gamma: f64) -> Result<Self> {
        check_step(dt, gamma)?;
        Ok(Self { dt, gamma })
    }

    pub fn update(&self, value: &mut NodalField, velocity: &mut NodalField, x: &[f64]) {
        let dtg = self.dt * self.gamma;
        for ((u, v), &dx) in value
            .as_mut_slice()
            .iter_mut()
            .zip(velocity.as_mut_slice().iter_mut())
            .zip(x)
        {
            *u += dtg * dx + self.dt * *v;
            *v += dx;
        }
    }
}

/// Second-order Newmark β/γ scheme
///
/// The increment is the change of acceleration:
/// - `value += dt·v + ½dt²·a + dt²β·x`
/// - `v += dt·γ·x + dt·a`
/// - `a += x`
#[derive(Debug, Clone, Copy)]
pub struct NewmarkSecondOrder {
    pub dt: f64,
    pub gamma: f64,
    pub beta: f64,
}

impl NewmarkSecondOrder {
    pub fn new(dt: f64, gamma: f64, beta: f64) -> Result<Self> {
        check_step(dt, gamma)?;
        if !(beta > 0.0 && beta.is_finite()) {
            return Err(Error::Config(format!("Newmark beta must be positive, got {}", beta)));
        }
        Ok(Self { dt, gamma, beta })
    }

    pub fn update(
        &self,
        value: &mut NodalField,
        velocity: &mut NodalField,
        acceleration: &mut NodalField,
        x: &[f64],
    ) {
        let dt = self.dt;
        let u = value.as_mut_slice();
        let v = velocity.as_mut_slice();
        let a = acceleration.as_mut_slice();
        for i in 0..x.len() {
            u[i] += dt * v[i] + 0.5 * dt * dt * a[i] + dt * dt * self.beta * x[i];
            v[i] += dt * self.gamma * x[i] + dt * a[i];
            a[i] += x[i];
        }
    }
}
