//! Special-relativistic hydrodynamics in 1D cartesian or spherical
//! coordinates, with units where c = 1. The radial velocity is carried as
//! the four-velocity component u = W v. Face positions are comoving and
//! may expand homologously; conserved quantities are volume-integrated, so
//! the primitive and conserved maps depend on the scale factor through the
//! zone volumes. The conserved-to-primitive inversion is a Newton
//! iteration on the gas pressure.

use derive_more::{Add, Sub, Mul, Div};
use serde::{Serialize, Deserialize};
use crate::RiemannSolver;
use crate::error::Error;
use crate::execution::{self, ExecutionMode};
use crate::mesh::{Coordinates, ScaleFactor};
use crate::piecewise_linear::plm_gradient;

pub const NCONS: usize = 4;

const NEWTON_ITER_MAX: usize = 500;




/**
 * Runtime parameters for the relativistic solver
 */
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameters {

    /// Index for the gamma-law equation of state
    pub gamma_law_index: f64,

    /// Parameter for gradient estimation: [1, 2]
    pub plm_theta: f64,

    /// Riemann solver: [HLLE | HLLC]
    pub riemann_solver: RiemannSolver,

    /// Largest Mach number the pressure recovery will admit
    pub mach_ceiling: f64,

    /// Skip the update of the first interior zone
    pub fix_i0: bool,

    /// Skip the update of the last interior zone
    pub fix_i1: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            gamma_law_index: 4.0 / 3.0,
            plm_theta: 2.0,
            riemann_solver: RiemannSolver::HLLC,
            mach_ceiling: 1e6,
            fix_i0: false,
            fix_i1: false,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.gamma_law_index <= 1.0 {
            anyhow::bail!("gamma_law_index must be greater than 1")
        }
        if self.plm_theta < 1.0 || self.plm_theta > 2.0 {
            anyhow::bail!("plm_theta must be in the range [1, 2]")
        }
        if self.mach_ceiling <= 0.0 {
            anyhow::bail!("mach_ceiling must be positive")
        }
        Ok(())
    }
}




// ============================================================================
#[derive(Clone, Copy, Debug, Default, PartialEq, Add, Sub, Mul, Div)]
pub struct Primitive(f64, f64, f64, f64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Add, Sub, Mul, Div)]
pub struct Conserved(f64, f64, f64, f64);

/**
 * Enum for the outcome of the pressure recovery in one zone
 */
#[derive(Clone, Copy, Debug)]
pub enum RecoveredPrimitive {
    Success(Primitive),
    NegativeDensity(f64),
    NegativeEnergyDensity(f64),
    NegativePressure(f64),
    RootFinderFailed { residual: f64 },
}




// ============================================================================
impl Primitive {

    pub fn new(rho: f64, gamma_beta: f64, pressure: f64, scalar: f64) -> Self {
        Self(rho, gamma_beta, pressure, scalar)
    }

    pub fn from_slice(prim: &[f64]) -> Self {
        Self(prim[0], prim[1], prim[2], prim[3])
    }

    pub fn write_to_slice(&self, prim: &mut [f64]) {
        prim[0] = self.0;
        prim[1] = self.1;
        prim[2] = self.2;
        prim[3] = self.3;
    }

    /// Comoving rest-mass density
    pub fn mass_density(&self) -> f64 {
        self.0
    }

    /// Radial four-velocity component, u = W v
    pub fn gamma_beta(&self) -> f64 {
        self.1
    }

    pub fn gas_pressure(&self) -> f64 {
        self.2
    }

    /// Passive scalar concentration
    pub fn scalar(&self) -> f64 {
        self.3
    }

    pub fn lorentz_factor_squared(&self) -> f64 {
        1.0 + self.1 * self.1
    }

    pub fn lorentz_factor(&self) -> f64 {
        self.lorentz_factor_squared().sqrt()
    }

    /// Coordinate three-velocity
    pub fn beta(&self) -> f64 {
        self.1 / self.lorentz_factor()
    }

    pub fn specific_internal_energy(&self, gamma_law_index: f64) -> f64 {
        self.2 / self.0 / (gamma_law_index - 1.0)
    }

    pub fn specific_enthalpy(&self, gamma_law_index: f64) -> f64 {
        1.0 + self.specific_internal_energy(gamma_law_index) + self.2 / self.0
    }

    pub fn sound_speed_squared(&self, gamma_law_index: f64) -> f64 {
        gamma_law_index * self.2 / (self.0 * self.specific_enthalpy(gamma_law_index))
    }

    pub fn to_conserved(&self, gamma_law_index: f64) -> Conserved {
        let w = self.lorentz_factor();
        let h = self.specific_enthalpy(gamma_law_index);
        let d = self.0 * w;
        let s = self.0 * h * w * self.1;
        let tau = self.0 * h * w * w - self.2 - d;
        Conserved(d, s, tau, d * self.3)
    }

    pub fn flux_vector(&self, gamma_law_index: f64) -> Conserved {
        let vn = self.beta();
        let u = self.to_conserved(gamma_law_index);
        Conserved(
            vn * u.0,
            vn * u.1 + self.2,
            u.1 - vn * u.0,
            vn * u.3,
        )
    }

    /**
     * The fastest left- and right-going characteristic speeds.
     */
    pub fn outer_wavespeeds(&self, gamma_law_index: f64) -> (f64, f64) {
        let a2 = self.sound_speed_squared(gamma_law_index);
        let vn = self.beta();
        let v2 = vn * vn;
        let k0 = f64::sqrt(a2 * (1.0 - v2) * (1.0 - v2 * a2 - vn * vn * (1.0 - a2)));
        (
            (vn * (1.0 - a2) - k0) / (1.0 - v2 * a2),
            (vn * (1.0 - a2) + k0) / (1.0 - v2 * a2),
        )
    }

    pub fn max_signal_speed(&self, gamma_law_index: f64) -> f64 {
        let (am, ap) = self.outer_wavespeeds(gamma_law_index);
        f64::max(am.abs(), ap.abs())
    }

    /**
     * This state as seen from a frame moving radially at the given
     * velocity (exact relativistic velocity subtraction).
     */
    pub fn with_radial_boost(&self, grid_velocity: f64) -> Primitive {
        let v = self.beta();
        let vp = (v - grid_velocity) / (1.0 - v * grid_velocity);
        let up = vp / f64::sqrt(1.0 - vp * vp);
        Primitive(self.0, up, self.2, self.3)
    }
}




// ============================================================================
impl Conserved {

    pub fn from_slice(cons: &[f64]) -> Self {
        Self(cons[0], cons[1], cons[2], cons[3])
    }

    pub fn write_to_slice(&self, cons: &mut [f64]) {
        cons[0] = self.0;
        cons[1] = self.1;
        cons[2] = self.2;
        cons[3] = self.3;
    }

    /// Lab-frame mass density, D = rho W
    pub fn lab_frame_density(&self) -> f64 {
        self.0
    }

    /// Radial momentum density
    pub fn momentum(&self) -> f64 {
        self.1
    }

    /// Energy density, less the mass density
    pub fn energy_density(&self) -> f64 {
        self.2
    }

    pub fn scalar_mass(&self) -> f64 {
        self.3
    }

    /**
     * Recover the primitive state by Newton iteration on the gas pressure,
     * seeded with the previous pressure value. The iteration is on the
     * density-like (volume-divided) conserved state.
     */
    pub fn to_primitive(&self, gamma_law_index: f64, pressure_guess: f64, mach_ceiling: f64) -> RecoveredPrimitive {
        let gm = gamma_law_index;
        let d = self.0;
        let tau = self.2;
        let ss = self.1 * self.1;

        if !(d > 0.0) {
            return RecoveredPrimitive::NegativeDensity(d)
        }
        if !(tau > 0.0) {
            return RecoveredPrimitive::NegativeEnergyDensity(tau)
        }
        let error_tolerance = 1e-12 * (d + tau);
        let mut iteration = 0;
        let mut p = pressure_guess;
        let mut w;

        loop {
            let et = tau + p + d;
            let b2 = f64::min(ss / (et * et), 1.0 - 1e-10);
            let w2 = 1.0 / (1.0 - b2);
            w = w2.sqrt();
            let rho = d / w;
            let de = (tau + d * (1.0 - w) + p * (1.0 - w2)) / (d * w);
            let h = 1.0 + de + p / rho;
            let a2 = gm * p / (rho * h);
            let f = rho * de * (gm - 1.0) - p;
            let g = b2 * a2 - 1.0;
            p -= f / g;
            iteration += 1;

            if f64::abs(f) < error_tolerance {
                break
            }
            if iteration >= NEWTON_ITER_MAX {
                return RecoveredPrimitive::RootFinderFailed { residual: f }
            }
        }

        let et = tau + p + d;
        let u = w * self.1 / et;
        let rho = d / w;

        // mach ceiling: keep the specific internal energy above the level
        // implied by the largest admissible Mach number
        let e = p / (rho * (gm - 1.0));
        let e_min = u * u / (1.0 + u * u) / (mach_ceiling * mach_ceiling);
        if e < e_min {
            p = rho * e_min * (gm - 1.0);
        }
        if !(p > 0.0) {
            return RecoveredPrimitive::NegativePressure(p)
        }
        RecoveredPrimitive::Success(Primitive(rho, u, p, self.3 / self.0))
    }
}




/**
 * Componentwise PLM gradient of three neighboring primitive states
 */
fn plm_gradient4(theta: f64, a: &Primitive, b: &Primitive, c: &Primitive) -> Primitive {
    Primitive(
        plm_gradient(theta, a.0, b.0, c.0),
        plm_gradient(theta, a.1, b.1, c.1),
        plm_gradient(theta, a.2, b.2, c.2),
        plm_gradient(theta, a.3, b.3, c.3),
    )
}




/**
 * HLLE flux through a face moving at the given velocity. Outside the
 * signal cone the flux is the pure upwind one.
 */
pub fn riemann_hlle(pl: Primitive, pr: Primitive, face_velocity: f64, gamma_law_index: f64) -> Conserved {
    let gm = gamma_law_index;
    let ul = pl.to_conserved(gm);
    let ur = pr.to_conserved(gm);
    let fl = pl.flux_vector(gm);
    let fr = pr.flux_vector(gm);

    let (alm, alp) = pl.outer_wavespeeds(gm);
    let (arm, arp) = pr.outer_wavespeeds(gm);
    let am = f64::min(alm, arm);
    let ap = f64::max(alp, arp);
    let vf = face_velocity;

    if vf <= am {
        fl - ul * vf
    } else if vf >= ap {
        fr - ur * vf
    } else {
        let u_hll = (ur * ap - ul * am + (fl - fr)) / (ap - am);
        let f_hll = (fl * ap - fr * am + (ur - ul) * ap * am) / (ap - am);
        f_hll - u_hll * vf
    }
}




/**
 * HLLC flux through a face moving at the given velocity. The contact
 * speed is the physically admissible root of a quadratic in the HLL state,
 * and the star states follow from the jump conditions across the outer
 * waves.
 */
pub fn riemann_hllc(pl: Primitive, pr: Primitive, face_velocity: f64, gamma_law_index: f64) -> Conserved {
    let gm = gamma_law_index;
    let ul = pl.to_conserved(gm);
    let ur = pr.to_conserved(gm);
    let fl = pl.flux_vector(gm);
    let fr = pr.flux_vector(gm);

    let (alm, alp) = pl.outer_wavespeeds(gm);
    let (arm, arp) = pr.outer_wavespeeds(gm);
    let am = f64::min(alm, arm);
    let ap = f64::max(alp, arp);
    let vf = face_velocity;

    if vf <= am {
        return fl - ul * vf
    }
    if vf >= ap {
        return fr - ur * vf
    }
    let u_hll = (ur * ap - ul * am + (fl - fr)) / (ap - am);
    let f_hll = (fl * ap - fr * am + (ur - ul) * ap * am) / (ap - am);

    // contact speed: a v*^2 + b v* + c = 0, taking the minus-root unless
    // the quadratic degenerates to linear
    let a = f_hll.energy_density() + f_hll.lab_frame_density();
    let b = -(u_hll.energy_density() + u_hll.lab_frame_density() + f_hll.momentum());
    let c = u_hll.momentum();
    let vstar = if a.abs() < 1e-10 {
        -c / b
    } else {
        (-b - f64::sqrt(b * b - 4.0 * a * c)) / (2.0 * a)
    };
    let pstar = -a * vstar + f_hll.momentum();

    let (uk, fk, ak, pk) = if vf < vstar {
        (ul, fl, am, pl)
    } else {
        (ur, fr, ap, pr)
    };
    let vk = pk.beta();
    let pg = pk.gas_pressure();
    let dk = uk.lab_frame_density();
    let sk = uk.momentum();
    let ek = uk.energy_density() + dk;

    let dstar = dk * (ak - vk) / (ak - vstar);
    let sstar = (sk * (ak - vk) + pstar - pg) / (ak - vstar);
    let estar = (ek * (ak - vk) + pstar * vstar - pg * vk) / (ak - vstar);
    let ustar = Conserved(dstar, sstar, estar - dstar, dstar * pk.scalar());

    fk + (ustar - uk) * ak - ustar * vf
}




// ============================================================================
/**
 * Convert primitive data to volume-integrated conserved data, pointwise
 * over the interior zones.
 */
pub fn primitive_to_conserved(
    faces: &[f64],
    primitive: &[f64],
    conserved: &mut [f64],
    scale: &ScaleFactor,
    time: f64,
    coords: Coordinates,
    parameters: &Parameters,
    mode: ExecutionMode) -> Result<(), Error>
{
    let ni = num_zones(faces)?;
    let gm = parameters.gamma_law_index;
    let a = scale.at(time);

    if primitive.len() != ni * NCONS {
        return Err(Error::InvalidPatchLayout { name: "primitive" })
    }
    if conserved.len() != ni * NCONS {
        return Err(Error::InvalidPatchLayout { name: "conserved" })
    }

    execution::try_for_each_chunk_mut(conserved, NCONS, mode, |i, cons| {
        let dv = coords.cell_volume(a * faces[i], a * faces[i + 1]);
        let p = Primitive::from_slice(&primitive[i * NCONS..(i + 1) * NCONS]);
        (p.to_conserved(gm) * dv).write_to_slice(cons);
        Ok(())
    })
}




/**
 * Recover primitive data from volume-integrated conserved data, pointwise
 * over the interior zones. The incoming pressure is used to seed the
 * Newton iteration, so the primitive buffer is read as well as written.
 * Failures are fatal and carry the physical zone position.
 */
pub fn conserved_to_primitive(
    faces: &[f64],
    conserved: &[f64],
    primitive: &mut [f64],
    scale: &ScaleFactor,
    time: f64,
    coords: Coordinates,
    parameters: &Parameters,
    mode: ExecutionMode) -> Result<(), Error>
{
    let ni = num_zones(faces)?;
    let gm = parameters.gamma_law_index;
    let a = scale.at(time);

    if primitive.len() != ni * NCONS {
        return Err(Error::InvalidPatchLayout { name: "primitive" })
    }
    if conserved.len() != ni * NCONS {
        return Err(Error::InvalidPatchLayout { name: "conserved" })
    }

    execution::try_for_each_chunk_mut(primitive, NCONS, mode, |i, prim| {
        let xl = a * faces[i];
        let xr = a * faces[i + 1];
        let dv = coords.cell_volume(xl, xr);
        let u = Conserved::from_slice(&conserved[i * NCONS..(i + 1) * NCONS]) / dv;
        let position = 0.5 * (xl + xr);

        match u.to_primitive(gm, prim[2], parameters.mach_ceiling) {
            RecoveredPrimitive::Success(p) => {
                p.write_to_slice(prim);
                Ok(())
            }
            RecoveredPrimitive::NegativeDensity(_) => {
                Err(Error::UnphysicalState { position, reason: "negative lab-frame density" })
            }
            RecoveredPrimitive::NegativeEnergyDensity(_) => {
                Err(Error::UnphysicalState { position, reason: "negative energy density" })
            }
            RecoveredPrimitive::NegativePressure(_) => {
                Err(Error::UnphysicalState { position, reason: "negative pressure after recovery" })
            }
            RecoveredPrimitive::RootFinderFailed { residual } => {
                Err(Error::RootFinderFailed { position, residual })
            }
        }
    })
}




/**
 * Compute the per-zone maximum signal speed, in the frame of the local
 * grid motion, for the driver's CFL condition.
 */
pub fn max_wavespeed(
    faces: &[f64],
    primitive: &[f64],
    wavespeed: &mut [f64],
    scale: &ScaleFactor,
    parameters: &Parameters,
    mode: ExecutionMode) -> Result<(), Error>
{
    let ni = num_zones(faces)?;
    let gm = parameters.gamma_law_index;

    if primitive.len() != ni * NCONS {
        return Err(Error::InvalidPatchLayout { name: "primitive" })
    }
    if wavespeed.len() != ni {
        return Err(Error::InvalidPatchLayout { name: "wavespeed" })
    }

    execution::try_for_each_chunk_mut(wavespeed, 1, mode, |i, out| {
        let p = Primitive::from_slice(&primitive[i * NCONS..(i + 1) * NCONS]);
        let grid_velocity = scale.rate() * 0.5 * (faces[i] + faces[i + 1]);
        out[0] = p.with_radial_boost(grid_velocity).max_signal_speed(gm);
        Ok(())
    })
}




/**
 * Advance the solution by one Runge-Kutta stage. The primitive read buffer
 * carries two guard zones at each end; the conserved buffers are interior
 * only and volume-integrated. Faces move at the homologous rate, and the
 * Riemann flux is evaluated in the moving-face frame.
 */
pub fn advance_rk(
    faces: &[f64],
    conserved_rk: &[f64],
    primitive_rd: &[f64],
    conserved_wr: &mut [f64],
    scale: &ScaleFactor,
    time: f64,
    dt: f64,
    rk_param: f64,
    coords: Coordinates,
    parameters: &Parameters,
    mode: ExecutionMode) -> Result<(), Error>
{
    let ni = num_zones(faces)?;
    let gm = parameters.gamma_law_index;
    let theta = parameters.plm_theta;
    let a = scale.at(time);
    let adot = scale.rate();

    if primitive_rd.len() != (ni + 4) * NCONS {
        return Err(Error::InvalidPatchLayout { name: "primitive_rd" })
    }
    if conserved_rk.len() != ni * NCONS {
        return Err(Error::InvalidPatchLayout { name: "conserved_rk" })
    }
    if conserved_wr.len() != ni * NCONS {
        return Err(Error::InvalidPatchLayout { name: "conserved_wr" })
    }

    execution::try_for_each_chunk_mut(conserved_wr, NCONS, mode, |i, out| {
        let prim = |k: i64| {
            let m = (i as i64 + 2 + k) as usize * NCONS;
            Primitive::from_slice(&primitive_rd[m..m + NCONS])
        };
        let yl = faces[i];
        let yr = faces[i + 1];
        let xl = a * yl;
        let xr = a * yr;
        let dv = coords.cell_volume(xl, xr);
        let pcc = prim(0);

        let mut ucc = pcc.to_conserved(gm) * dv;

        let pinned = (parameters.fix_i0 && i == 0) || (parameters.fix_i1 && i == ni - 1);
        if !pinned {
            let pli = prim(-1);
            let pri = prim(1);
            let gl = plm_gradient4(theta, &prim(-2), &pli, &pcc);
            let gc = plm_gradient4(theta, &pli, &pcc, &pri);
            let gr = plm_gradient4(theta, &pcc, &pri, &prim(2));

            let riemann = |pl: Primitive, pr: Primitive, vf: f64| {
                match parameters.riemann_solver {
                    RiemannSolver::HLLE => riemann_hlle(pl, pr, vf, gm),
                    RiemannSolver::HLLC => riemann_hllc(pl, pr, vf, gm),
                }
            };
            let fl = riemann(pli + gl * 0.5, pcc - gc * 0.5, adot * yl);
            let fr = riemann(pcc + gc * 0.5, pri - gr * 0.5, adot * yr);

            let dal = coords.face_area(xl);
            let dar = coords.face_area(xr);

            // gradient-of-face-area pressure term; vanishes in cartesian
            let geometric = Conserved(0.0, pcc.gas_pressure() * (dar - dal), 0.0, 0.0);

            ucc = ucc + (fl * dal - fr * dar + geometric) * dt;
        }

        let urk = Conserved::from_slice(&conserved_rk[i * NCONS..(i + 1) * NCONS]);
        (ucc * (1.0 - rk_param) + urk * rk_param).write_to_slice(out);
        Ok(())
    })
}

fn num_zones(faces: &[f64]) -> Result<usize, Error> {
    if faces.len() < 2 {
        Err(Error::InvalidPatchLayout { name: "faces" })
    } else {
        Ok(faces.len() - 1)
    }
}
