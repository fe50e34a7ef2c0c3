//! Per-zone solver kernels for compressible gas dynamics on structured
//! patches: a 2D isothermal and a 2D adiabatic finite-volume solver for
//! thin-disk problems, a 1D special-relativistic solver, and an
//! experimental discontinuous-Galerkin variant of the isothermal solver.
//! Drivers own the storage and the time loop; the kernels here read
//! guard-zone patches and write updated states in place.

pub mod cbdisodg_2d;
pub mod eos;
pub mod error;
pub mod euler2d;
pub mod execution;
pub mod iso2d;
pub mod mesh;
pub mod patch;
pub mod piecewise_linear;
pub mod runge_kutta;
pub mod source_terms;
pub mod srhd_1d;

pub use error::Error;
pub use execution::ExecutionMode;
pub use mesh::{Coordinates, ScaleFactor, StructuredMesh};
pub use patch::Patch;

use serde::{Serialize, Deserialize};




/**
 * Enum for the cardinal mesh axes
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    X,
    Y,
}

impl Direction {
    pub(crate) fn along(self, other: Direction) -> f64 {
        if self == other {
            1.0
        } else {
            0.0
        }
    }
}




/**
 * Enum for Riemann solver type
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiemannSolver {
    HLLE,
    HLLC,
}




/**
 * Primitive variable state that is agnostic to the hydrodynamics system
 */
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct AnyPrimitive {

    /// Velocity along x
    pub velocity_x: f64,

    /// Velocity along y
    pub velocity_y: f64,

    /// Mass (surface) density
    pub mass_density: f64,

    /// Gas pressure
    pub gas_pressure: f64,
}




// ============================================================================
impl Into<[f64; 4]> for AnyPrimitive {
    fn into(self) -> [f64; 4] {
        [self.velocity_x, self.velocity_y, self.mass_density, self.gas_pressure]
    }
}

impl From<[f64; 4]> for AnyPrimitive {
    fn from(d: [f64; 4]) -> Self {
        AnyPrimitive {
            velocity_x: d[0],
            velocity_y: d[1],
            mass_density: d[2],
            gas_pressure: d[3],
        }
    }
}
