use serde::{Serialize, Deserialize};
use crate::AnyPrimitive;




/**
 * Enum for how a point mass exchanges momentum and energy with the gas it
 * accretes
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkModel {

    /// Gravity only; no mass is removed
    Inactive = 0,

    /// Mass and momentum are removed in proportion, so the sink does not
    /// accelerate the gas
    AccelerationFree = 1,

    /// Only the radial component of the gas velocity, relative to the point
    /// mass, is carried off, preserving the angular momentum of the gas
    /// about the mass
    TorqueFree = 2,

    /// Mass is removed but no momentum, so the sink exerts no force
    ForceFree = 3,
}

impl Default for SinkModel {
    fn default() -> Self {
        SinkModel::Inactive
    }
}




/**
 * A gravitating, accreting point mass
 */
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointMass {

    /// Position
    pub x: f64,
    pub y: f64,

    /// Velocity
    pub vx: f64,
    pub vy: f64,

    /// Gravitating mass (G = 1)
    pub mass: f64,

    /// Radius below which the gravitational potential is regularized
    pub softening_length: f64,

    /// Nominal mass removal rate at the sink center
    pub sink_rate: f64,

    /// Radial scale of the sink kernel
    pub sink_radius: f64,

    #[serde(default)]
    pub sink_model: SinkModel,
}




// ============================================================================
impl PointMass {

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mass < 0.0 {
            anyhow::bail!("point mass must be non-negative")
        }
        if self.softening_length <= 0.0 {
            anyhow::bail!("softening_length must be positive")
        }
        if self.sink_rate < 0.0 {
            anyhow::bail!("sink_rate must be non-negative")
        }
        if self.sink_model != SinkModel::Inactive && self.sink_rate > 0.0 && self.sink_radius <= 0.0 {
            anyhow::bail!("an active sink requires a positive sink_radius")
        }
        Ok(())
    }

    /**
     * The local mass removal rate at displacement (dx, dy) from this mass.
     * The kernel is a fourth-order super-Gaussian, truncated outside four
     * sink radii.
     */
    pub fn sink_kernel(&self, dx: f64, dy: f64) -> f64 {
        let r2 = dx * dx + dy * dy;
        let s2 = self.sink_radius * self.sink_radius;

        if r2 < s2 * 16.0 {
            self.sink_rate * f64::exp(-(r2 / s2).powi(2))
        } else {
            0.0
        }
    }

    /**
     * The gas velocity seen by the torque-free sink model: the component of
     * the velocity relative to this mass is projected onto the radial
     * direction, so the removed material carries no angular momentum about
     * the mass.
     */
    pub fn torque_free_velocity(&self, x: f64, y: f64, vx: f64, vy: f64) -> (f64, f64) {
        let dx = x - self.x;
        let dy = y - self.y;
        let r = f64::sqrt(dx * dx + dy * dy);

        if r == 0.0 {
            return (self.vx, self.vy)
        }
        let rhat_x = dx / r;
        let rhat_y = dy / r;
        let dvr = (vx - self.vx) * rhat_x + (vy - self.vy) * rhat_y;
        (self.vx + dvr * rhat_x, self.vy + dvr * rhat_y)
    }
}




/**
 * The total softened gravitational potential of a list of point masses
 */
pub fn gravitational_potential(masses: &[PointMass], x: f64, y: f64) -> f64 {
    masses.iter().map(|mass| {
        let dx = x - mass.x;
        let dy = y - mass.y;
        let s2 = mass.softening_length * mass.softening_length;
        -mass.mass / f64::sqrt(dx * dx + dy * dy + s2)
    }).sum()
}




/**
 * Enum for the ramp shape applied over the buffer onset annulus
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnsetRamp {

    /// Rate grows linearly from zero at the onset radius to the full
    /// driving rate at the outer radius
    Linear,

    /// Historical form: rate is scaled by max(r, 1)
    LegacyRadius,
}

impl Default for OnsetRamp {
    fn default() -> Self {
        OnsetRamp::Linear
    }
}




/**
 * Enum for the outer damping zone, which emulates an open outer boundary
 * by relaxing the solution toward a stationary reference state
 */
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferZone {

    None,

    /// Drive toward a circular-Keplerian flow around a central mass
    Keplerian {
        surface_density: f64,
        surface_pressure: f64,
        central_mass: f64,
        driving_rate: f64,
        outer_radius: f64,
        onset_width: f64,
        #[serde(default)]
        onset_ramp: OnsetRamp,
    },
}




// ============================================================================
impl BufferZone {

    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            BufferZone::None => Ok(()),
            BufferZone::Keplerian { surface_density, central_mass, driving_rate, outer_radius, onset_width, .. } => {
                if *surface_density <= 0.0 {
                    anyhow::bail!("buffer surface_density must be positive")
                }
                if *central_mass <= 0.0 {
                    anyhow::bail!("buffer central_mass must be positive")
                }
                if *driving_rate < 0.0 {
                    anyhow::bail!("buffer driving_rate must be non-negative")
                }
                if *onset_width <= 0.0 || *onset_width >= *outer_radius {
                    anyhow::bail!("buffer onset_width must be positive and less than outer_radius")
                }
                Ok(())
            }
        }
    }

    /**
     * The reference state the buffer drives toward at position (x, y),
     * together with the local damping rate, or None where the buffer is
     * not acting.
     */
    pub fn driving_target(&self, x: f64, y: f64) -> Option<(AnyPrimitive, f64)> {
        match *self {
            BufferZone::None => None,
            BufferZone::Keplerian {
                surface_density,
                surface_pressure,
                central_mass,
                driving_rate,
                outer_radius,
                onset_width,
                onset_ramp,
            } => {
                let rc = f64::sqrt(x * x + y * y);
                let onset_radius = outer_radius - onset_width;

                if rc <= onset_radius {
                    return None
                }
                let vp = f64::sqrt(central_mass / rc);
                let omega_outer = f64::sqrt(central_mass / onset_radius.powi(3));
                let ramp = match onset_ramp {
                    OnsetRamp::Linear => (rc - onset_radius) / onset_width,
                    OnsetRamp::LegacyRadius => f64::max(rc, 1.0),
                };
                let target = AnyPrimitive {
                    velocity_x: vp * (-y / rc),
                    velocity_y: vp * (x / rc),
                    mass_density: surface_density,
                    gas_pressure: surface_pressure,
                };
                Some((target, driving_rate * omega_outer * ramp))
            }
        }
    }
}
