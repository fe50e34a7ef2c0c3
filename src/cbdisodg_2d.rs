//! Experimental discontinuous-Galerkin rendition of the isothermal
//! thin-disk solver. Each zone carries modal weights of the conserved
//! state in a 2D scaled-Legendre basis truncated at total order < 3.
//! Volume and surface integrals are evaluated with 3-point tensor-product
//! Gauss quadrature, which is exact to polynomial degree 5, and the
//! pointwise flux, equation-of-state, and source-term layers are shared
//! with the finite-volume isothermal solver. Weight buffers carry one
//! guard zone and NCONS * NPOLY fields per zone, with the basis index
//! varying fastest.

use serde::{Serialize, Deserialize};
use crate::Direction;
use crate::eos::{EquationOfState, SoundSpeedLaw};
use crate::error::Error;
use crate::execution::ExecutionMode;
use crate::iso2d::{self, point_mass_source_term};
use crate::mesh::StructuredMesh;
use crate::patch::Patch;
use crate::source_terms::{BufferZone, PointMass};

pub const NCONS: usize = 3;
pub const NPOLY: usize = 6;

/// Gauss-Legendre nodes and weights on [-1, 1]
const GAUSS_NODES: [f64; 3] = [-0.7745966692414834, 0.0, 0.7745966692414834];
const GAUSS_WEIGHTS: [f64; 3] = [5.0 / 9.0, 8.0 / 9.0, 5.0 / 9.0];

/// Polynomial orders (m, n) of each mode
const MODES: [(usize, usize); NPOLY] = [(0, 0), (1, 0), (0, 1), (1, 1), (2, 0), (0, 2)];




/**
 * Runtime parameters for the discontinuous-Galerkin solver
 */
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameters {

    /// Largest velocity magnitude admitted at a quadrature point
    pub velocity_ceiling: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            velocity_ceiling: 1e16,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.velocity_ceiling <= 0.0 {
            anyhow::bail!("velocity_ceiling must be positive")
        }
        Ok(())
    }
}




// ============================================================================
/**
 * Legendre polynomials scaled to be orthonormal with respect to the cell
 * average inner product, (1/2) int_-1^1 p_m p_n dx = delta_mn
 */
fn scaled_legendre(n: usize, x: f64) -> f64 {
    match n {
        0 => 1.0,
        1 => f64::sqrt(3.0) * x,
        _ => f64::sqrt(5.0) * 0.5 * (3.0 * x * x - 1.0),
    }
}

fn scaled_legendre_prime(n: usize, x: f64) -> f64 {
    match n {
        0 => 0.0,
        1 => f64::sqrt(3.0),
        _ => f64::sqrt(5.0) * 3.0 * x,
    }
}

fn basis(l: usize, x: f64, y: f64) -> f64 {
    let (m, n) = MODES[l];
    scaled_legendre(m, x) * scaled_legendre(n, y)
}

fn basis_dx(l: usize, x: f64, y: f64) -> f64 {
    let (m, n) = MODES[l];
    scaled_legendre_prime(m, x) * scaled_legendre(n, y)
}

fn basis_dy(l: usize, x: f64, y: f64) -> f64 {
    let (m, n) = MODES[l];
    scaled_legendre(m, x) * scaled_legendre_prime(n, y)
}




/**
 * The modal weights of one zone
 */
#[derive(Clone, Copy, Debug, Default)]
pub struct Weights(pub [[f64; NPOLY]; NCONS]);

impl Weights {

    pub fn from_slice(data: &[f64]) -> Self {
        let mut w = Self::default();
        for q in 0..NCONS {
            for l in 0..NPOLY {
                w.0[q][l] = data[q * NPOLY + l];
            }
        }
        w
    }

    pub fn write_to_slice(&self, data: &mut [f64]) {
        for q in 0..NCONS {
            for l in 0..NPOLY {
                data[q * NPOLY + l] = self.0[q][l];
            }
        }
    }

    /// The conserved state at a point (x, y) of the unit cell [-1, 1]^2
    pub fn evaluate(&self, x: f64, y: f64) -> iso2d::Conserved {
        let mut u = [0.0; NCONS];
        for q in 0..NCONS {
            for l in 0..NPOLY {
                u[q] += self.0[q][l] * basis(l, x, y);
            }
        }
        iso2d::Conserved::new(u[0], u[1], u[2])
    }

    /// The zone average of the conserved state, which is the l = 0 weight
    pub fn cell_average(&self) -> iso2d::Conserved {
        iso2d::Conserved::new(self.0[0][0], self.0[1][0], self.0[2][0])
    }
}




// ============================================================================
/**
 * Compute the per-zone maximum signal speed from the zone averages, for
 * the driver's CFL condition.
 */
pub fn max_wavespeed(
    mesh: &StructuredMesh,
    weights: &Patch,
    wavespeed: &mut Patch,
    eos: &EquationOfState,
    masses: &[PointMass],
    parameters: &Parameters,
    mode: ExecutionMode) -> Result<(), Error>
{
    let cs = eos.sound_speed_law(masses)?;

    if !weights.has_extent([-1, -1], [mesh.ni as usize + 2, mesh.nj as usize + 2], NCONS * NPOLY) {
        return Err(Error::InvalidPatchLayout { name: "weights" })
    }
    if !wavespeed.has_extent([0, 0], mesh.shape(), 1) {
        return Err(Error::InvalidPatchLayout { name: "wavespeed" })
    }

    wavespeed.try_for_each_row_mut(mode, |i, row| {
        for j in 0..mesh.nj {
            let w = Weights::from_slice(weights.get_slice([i, j]));
            let p = w.cell_average().to_primitive(parameters.velocity_ceiling);
            let (x, y) = mesh.cell_coordinates(i, j);
            row[j as usize] = p.max_signal_speed(cs.sound_speed_squared(x, y));
        }
        Ok(())
    })
}




/**
 * Advance the modal weights by one Runge-Kutta stage. Each zone
 * accumulates the volume integral of the flux against the basis
 * gradients, the surface integral of the HLLE flux against the basis
 * traces on its four faces, and the basis projection of the point-mass
 * and buffer source terms, then combines with the cached weights.
 */
pub fn advance_rk(
    mesh: &StructuredMesh,
    weights_rk: &Patch,
    weights_rd: &Patch,
    weights_wr: &mut Patch,
    eos: &EquationOfState,
    buffer: &BufferZone,
    masses: &[PointMass],
    parameters: &Parameters,
    rk_param: f64,
    dt: f64,
    mode: ExecutionMode) -> Result<(), Error>
{
    let cs = eos.sound_speed_law(masses)?;
    let guarded = [mesh.ni as usize + 2, mesh.nj as usize + 2];

    if !weights_rd.has_extent([-1, -1], guarded, NCONS * NPOLY) {
        return Err(Error::InvalidPatchLayout { name: "weights_rd" })
    }
    if !weights_wr.has_extent([-1, -1], guarded, NCONS * NPOLY) {
        return Err(Error::InvalidPatchLayout { name: "weights_wr" })
    }
    if !weights_rk.has_extent([0, 0], mesh.shape(), NCONS * NPOLY) {
        return Err(Error::InvalidPatchLayout { name: "weights_rk" })
    }

    weights_wr.try_for_each_row_mut(mode, |i, row| {
        if i < 0 || i >= mesh.ni {
            return Ok(())
        }
        for j in 0..mesh.nj {
            let nf = NCONS * NPOLY;
            let out = &mut row[(j + 1) as usize * nf..(j + 2) as usize * nf];
            advance_rk_zone(mesh, weights_rk, weights_rd, &cs, buffer, masses, parameters, rk_param, dt, (i, j), out);
        }
        Ok(())
    })
}

fn advance_rk_zone(
    mesh: &StructuredMesh,
    weights_rk: &Patch,
    weights_rd: &Patch,
    cs: &SoundSpeedLaw,
    buffer: &BufferZone,
    masses: &[PointMass],
    parameters: &Parameters,
    rk_param: f64,
    dt: f64,
    index: (i64, i64),
    out: &mut [f64])
{
    let (i, j) = index;
    let (xc, yc) = mesh.cell_coordinates(i, j);
    let dx = mesh.dx;
    let dy = mesh.dy;
    let ceiling = parameters.velocity_ceiling;

    let wcc = Weights::from_slice(weights_rd.get_slice([i, j]));
    let wli = Weights::from_slice(weights_rd.get_slice([i - 1, j]));
    let wri = Weights::from_slice(weights_rd.get_slice([i + 1, j]));
    let wlj = Weights::from_slice(weights_rd.get_slice([i, j - 1]));
    let wrj = Weights::from_slice(weights_rd.get_slice([i, j + 1]));

    let mut delta = [[0.0; NPOLY]; NCONS];

    // volume term and source projection at the interior quadrature points
    for ii in 0..3 {
        for jj in 0..3 {
            let qx = GAUSS_NODES[ii];
            let qy = GAUSS_NODES[jj];
            let wq = GAUSS_WEIGHTS[ii] * GAUSS_WEIGHTS[jj];
            let x = xc + 0.5 * qx * dx;
            let y = yc + 0.5 * qy * dy;

            let u = wcc.evaluate(qx, qy);
            let p = u.to_primitive(ceiling);
            let cs2 = cs.sound_speed_squared(x, y);
            let fx = p.flux_vector(Direction::X, cs2).as_array();
            let fy = p.flux_vector(Direction::Y, cs2).as_array();

            let mut source = [0.0; NCONS];
            for mass in masses {
                let s = point_mass_source_term(mass, x, y, &p).as_array();
                for q in 0..NCONS {
                    source[q] += s[q];
                }
            }
            if let Some((target, rate)) = buffer.driving_target(x, y) {
                let u0 = iso2d::Primitive::new(target.mass_density, target.velocity_x, target.velocity_y)
                    .to_conserved()
                    .as_array();
                let ua = u.as_array();
                for q in 0..NCONS {
                    source[q] -= (ua[q] - u0[q]) * rate;
                }
            }

            for q in 0..NCONS {
                for l in 0..NPOLY {
                    delta[q][l] += wq * (fx[q] * basis_dx(l, qx, qy) * 0.5 * dy + fy[q] * basis_dy(l, qx, qy) * 0.5 * dx);
                    delta[q][l] += wq * source[q] * basis(l, qx, qy) * 0.25 * dx * dy;
                }
            }
        }
    }

    // surface term, one face at a time
    for n in 0..3 {
        let q1 = GAUSS_NODES[n];
        let wn = GAUSS_WEIGHTS[n];
        let y = yc + 0.5 * q1 * dy;
        let x = xc + 0.5 * q1 * dx;

        let fxl = iso2d::riemann_hlle(
            wli.evaluate(1.0, q1).to_primitive(ceiling),
            wcc.evaluate(-1.0, q1).to_primitive(ceiling),
            Direction::X,
            cs.sound_speed_squared(xc - 0.5 * dx, y)).as_array();

        let fxr = iso2d::riemann_hlle(
            wcc.evaluate(1.0, q1).to_primitive(ceiling),
            wri.evaluate(-1.0, q1).to_primitive(ceiling),
            Direction::X,
            cs.sound_speed_squared(xc + 0.5 * dx, y)).as_array();

        let fyl = iso2d::riemann_hlle(
            wlj.evaluate(q1, 1.0).to_primitive(ceiling),
            wcc.evaluate(q1, -1.0).to_primitive(ceiling),
            Direction::Y,
            cs.sound_speed_squared(x, yc - 0.5 * dy)).as_array();

        let fyr = iso2d::riemann_hlle(
            wcc.evaluate(q1, 1.0).to_primitive(ceiling),
            wrj.evaluate(q1, -1.0).to_primitive(ceiling),
            Direction::Y,
            cs.sound_speed_squared(x, yc + 0.5 * dy)).as_array();

        for q in 0..NCONS {
            for l in 0..NPOLY {
                delta[q][l] += wn * fxl[q] * basis(l, -1.0, q1) * 0.5 * dy;
                delta[q][l] -= wn * fxr[q] * basis(l, 1.0, q1) * 0.5 * dy;
                delta[q][l] += wn * fyl[q] * basis(l, q1, -1.0) * 0.5 * dx;
                delta[q][l] -= wn * fyr[q] * basis(l, q1, 1.0) * 0.5 * dx;
            }
        }
    }

    let wrk = Weights::from_slice(weights_rk.get_slice([i, j]));
    let mut wout = Weights::default();
    for q in 0..NCONS {
        for l in 0..NPOLY {
            let w_new = wcc.0[q][l] + delta[q][l] * dt / (dx * dy);
            wout.0[q][l] = w_new * (1.0 - rk_param) + wrk.0[q][l] * rk_param;
        }
    }
    wout.write_to_slice(out)
}
