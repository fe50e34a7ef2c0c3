//! Isothermal (or locally isothermal) finite-volume solver for thin-disk
//! problems in 2D planar cartesian coordinates. The conserved state is the
//! surface density and the momentum per unit area; the pressure is closed
//! by the sound-speed law, so there is no energy equation. Source terms
//! cover point-mass gravity and sinks, an outer buffer damping zone, and
//! an optional constant-nu viscous stress.

use derive_more::{Add, Sub, Mul, Div};
use serde::{Serialize, Deserialize};
use crate::Direction;
use crate::eos::{EquationOfState, SoundSpeedLaw};
use crate::error::Error;
use crate::execution::ExecutionMode;
use crate::mesh::StructuredMesh;
use crate::patch::Patch;
use crate::piecewise_linear::plm_gradient;
use crate::source_terms::{BufferZone, PointMass, SinkModel};

pub const NCONS: usize = 3;




/**
 * Runtime parameters for the isothermal solver
 */
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameters {

    /// Parameter for gradient estimation: [1, 2]
    pub plm_theta: f64,

    /// Constant kinematic viscosity; zero disables the viscous flux
    pub nu: f64,

    /// Largest velocity magnitude the conserved-to-primitive map will admit
    pub velocity_ceiling: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            plm_theta: 1.5,
            nu: 0.0,
            velocity_ceiling: 1e16,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.plm_theta < 1.0 || self.plm_theta > 2.0 {
            anyhow::bail!("plm_theta must be in the range [1, 2]")
        }
        if self.nu < 0.0 {
            anyhow::bail!("nu must be non-negative")
        }
        if self.velocity_ceiling <= 0.0 {
            anyhow::bail!("velocity_ceiling must be positive")
        }
        Ok(())
    }
}




// ============================================================================
#[derive(Clone, Copy, Debug, Default, PartialEq, Add, Sub, Mul, Div)]
pub struct Primitive(f64, f64, f64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Add, Sub, Mul, Div)]
pub struct Conserved(f64, f64, f64);




// ============================================================================
impl Primitive {

    pub fn new(sigma: f64, vx: f64, vy: f64) -> Self {
        Self(sigma, vx, vy)
    }

    pub fn from_slice(prim: &[f64]) -> Self {
        Self(prim[0], prim[1], prim[2])
    }

    pub fn write_to_slice(&self, prim: &mut [f64]) {
        prim[0] = self.0;
        prim[1] = self.1;
        prim[2] = self.2;
    }

    pub fn surface_density(&self) -> f64 {
        self.0
    }

    pub fn velocity_x(&self) -> f64 {
        self.1
    }

    pub fn velocity_y(&self) -> f64 {
        self.2
    }

    pub fn velocity(&self, direction: Direction) -> f64 {
        match direction {
            Direction::X => self.1,
            Direction::Y => self.2,
        }
    }

    pub fn velocity_squared(&self) -> f64 {
        self.1 * self.1 + self.2 * self.2
    }

    pub fn to_conserved(&self) -> Conserved {
        Conserved(self.0, self.0 * self.1, self.0 * self.2)
    }

    pub fn flux_vector(&self, direction: Direction, cs2: f64) -> Conserved {
        let pg = self.0 * cs2;
        let vn = self.velocity(direction);
        let u = self.to_conserved();

        Conserved(
            u.0 * vn,
            u.1 * vn + pg * direction.along(Direction::X),
            u.2 * vn + pg * direction.along(Direction::Y),
        )
    }

    pub fn outer_wavespeeds(&self, direction: Direction, cs2: f64) -> (f64, f64) {
        let cs = cs2.sqrt();
        let vn = self.velocity(direction);
        (vn - cs, vn + cs)
    }

    pub fn max_signal_speed(&self, cs2: f64) -> f64 {
        f64::max(self.1.abs(), self.2.abs()) + cs2.sqrt()
    }
}




// ============================================================================
impl Conserved {

    pub fn new(sigma: f64, px: f64, py: f64) -> Self {
        Self(sigma, px, py)
    }

    pub fn from_slice(cons: &[f64]) -> Self {
        Self(cons[0], cons[1], cons[2])
    }

    pub fn write_to_slice(&self, cons: &mut [f64]) {
        cons[0] = self.0;
        cons[1] = self.1;
        cons[2] = self.2;
    }

    pub fn as_array(&self) -> [f64; NCONS] {
        [self.0, self.1, self.2]
    }

    pub fn surface_density(&self) -> f64 {
        self.0
    }

    pub fn momentum_x(&self) -> f64 {
        self.1
    }

    pub fn momentum_y(&self) -> f64 {
        self.2
    }

    pub fn to_primitive(&self, velocity_ceiling: f64) -> Primitive {
        let vx = f64::clamp(self.1 / self.0, -velocity_ceiling, velocity_ceiling);
        let vy = f64::clamp(self.2 / self.0, -velocity_ceiling, velocity_ceiling);
        Primitive(self.0, vx, vy)
    }
}




/**
 * Componentwise PLM gradient of three neighboring primitive states
 */
fn plm_gradient3(theta: f64, a: &Primitive, b: &Primitive, c: &Primitive) -> Primitive {
    Primitive(
        plm_gradient(theta, a.0, b.0, c.0),
        plm_gradient(theta, a.1, b.1, c.1),
        plm_gradient(theta, a.2, b.2, c.2),
    )
}




/**
 * HLLE flux at the interface between two primitive states. The outer
 * wavespeeds are clamped around zero so the flux degrades to upwind at a
 * stagnation point.
 */
pub fn riemann_hlle(pl: Primitive, pr: Primitive, direction: Direction, cs2: f64) -> Conserved {
    let ul = pl.to_conserved();
    let ur = pr.to_conserved();
    let fl = pl.flux_vector(direction, cs2);
    let fr = pr.flux_vector(direction, cs2);

    let (alm, alp) = pl.outer_wavespeeds(direction, cs2);
    let (arm, arp) = pr.outer_wavespeeds(direction, cs2);
    let ap = f64::max(0.0, f64::max(alp, arp));
    let am = f64::min(0.0, f64::min(alm, arm));

    (fl * ap - fr * am + (ur - ul) * ap * am) / (ap - am)
}




/**
 * Rate of change of the conserved state due to one point mass: softened
 * gravity, plus mass (and per the sink model, momentum) removal.
 */
pub(crate) fn point_mass_source_term(mass: &PointMass, x: f64, y: f64, prim: &Primitive) -> Conserved {
    let dx = x - mass.x;
    let dy = y - mass.y;
    let r2 = dx * dx + dy * dy;
    let s2 = mass.softening_length * mass.softening_length;

    let sigma = prim.surface_density();
    let g = sigma * mass.mass * (r2 + s2).powf(-1.5);
    let fx = -g * dx;
    let fy = -g * dy;
    let mdot = -sigma * mass.sink_kernel(dx, dy);

    match mass.sink_model {
        SinkModel::Inactive => {
            Conserved(0.0, fx, fy)
        }
        SinkModel::AccelerationFree => {
            Conserved(mdot, mdot * prim.velocity_x() + fx, mdot * prim.velocity_y() + fy)
        }
        SinkModel::TorqueFree => {
            let (vx, vy) = mass.torque_free_velocity(x, y, prim.velocity_x(), prim.velocity_y());
            Conserved(mdot, mdot * vx + fx, mdot * vy + fy)
        }
        SinkModel::ForceFree => {
            Conserved(mdot, fx, fy)
        }
    }
}




// ============================================================================
/**
 * Convert a patch of primitive data to conserved data, pointwise over the
 * index space of the output patch.
 */
pub fn primitive_to_conserved(
    primitive: &Patch,
    conserved: &mut Patch,
    mode: ExecutionMode) -> Result<(), Error>
{
    if primitive.num_fields() != NCONS || !primitive.covers(conserved) {
        return Err(Error::InvalidPatchLayout { name: "primitive" })
    }
    let start = conserved.start();
    let count = conserved.count();

    conserved.try_for_each_row_mut(mode, |i, row| {
        for n in 0..count[1] {
            let j = start[1] + n as i64;
            let p = Primitive::from_slice(primitive.get_slice([i, j]));
            p.to_conserved().write_to_slice(&mut row[n * NCONS..(n + 1) * NCONS]);
        }
        Ok(())
    })
}




/**
 * Compute the per-zone maximum signal speed, for the driver's CFL
 * condition.
 */
pub fn max_wavespeed(
    mesh: &StructuredMesh,
    primitive: &Patch,
    wavespeed: &mut Patch,
    eos: &EquationOfState,
    masses: &[PointMass],
    mode: ExecutionMode) -> Result<(), Error>
{
    let cs = eos.sound_speed_law(masses)?;

    if !primitive.has_extent([-2, -2], [mesh.ni as usize + 4, mesh.nj as usize + 4], NCONS) {
        return Err(Error::InvalidPatchLayout { name: "primitive" })
    }
    if !wavespeed.has_extent([0, 0], mesh.shape(), 1) {
        return Err(Error::InvalidPatchLayout { name: "wavespeed" })
    }

    wavespeed.try_for_each_row_mut(mode, |i, row| {
        for j in 0..mesh.nj {
            let p = Primitive::from_slice(primitive.get_slice([i, j]));
            let (x, y) = mesh.cell_coordinates(i, j);
            row[j as usize] = p.max_signal_speed(cs.sound_speed_squared(x, y));
        }
        Ok(())
    })
}




/**
 * Advance the solution by one Runge-Kutta stage: the zone kernel forms PLM
 * interface states, HLLE fluxes (plus the viscous stress when nu > 0),
 * integrates the source terms, applies the flux divergence, averages with
 * the cached conserved state, and writes the updated primitive in place.
 */
pub fn advance_rk(
    mesh: &StructuredMesh,
    conserved_rk: &Patch,
    primitive_rd: &Patch,
    primitive_wr: &mut Patch,
    eos: &EquationOfState,
    buffer: &BufferZone,
    masses: &[PointMass],
    parameters: &Parameters,
    rk_param: f64,
    dt: f64,
    mode: ExecutionMode) -> Result<(), Error>
{
    let cs = eos.sound_speed_law(masses)?;
    let guarded = [mesh.ni as usize + 4, mesh.nj as usize + 4];

    if !primitive_rd.has_extent([-2, -2], guarded, NCONS) {
        return Err(Error::InvalidPatchLayout { name: "primitive_rd" })
    }
    if !primitive_wr.has_extent([-2, -2], guarded, NCONS) {
        return Err(Error::InvalidPatchLayout { name: "primitive_wr" })
    }
    if !conserved_rk.has_extent([0, 0], mesh.shape(), NCONS) {
        return Err(Error::InvalidPatchLayout { name: "conserved_rk" })
    }

    primitive_wr.try_for_each_row_mut(mode, |i, row| {
        if i < 0 || i >= mesh.ni {
            return Ok(())
        }
        for j in 0..mesh.nj {
            let out = &mut row[(j + 2) as usize * NCONS..(j + 3) as usize * NCONS];
            advance_rk_zone(mesh, conserved_rk, primitive_rd, &cs, buffer, masses, parameters, rk_param, dt, (i, j), out);
        }
        Ok(())
    })
}

fn advance_rk_zone(
    mesh: &StructuredMesh,
    conserved_rk: &Patch,
    primitive_rd: &Patch,
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
    let (x, y) = mesh.cell_coordinates(i, j);
    let dx = mesh.dx;
    let dy = mesh.dy;
    let theta = parameters.plm_theta;
    let nu = parameters.nu;

    let prim = |di: i64, dj: i64| Primitive::from_slice(primitive_rd.get_slice([i + di, j + dj]));

    let pcc = prim(0, 0);
    let pli = prim(-1, 0);
    let pri = prim(1, 0);
    let plj = prim(0, -1);
    let prj = prim(0, 1);

    let gxli = plm_gradient3(theta, &prim(-2, 0), &pli, &pcc);
    let gxcc = plm_gradient3(theta, &pli, &pcc, &pri);
    let gxri = plm_gradient3(theta, &pcc, &pri, &prim(2, 0));
    let gylj = plm_gradient3(theta, &prim(0, -2), &plj, &pcc);
    let gycc = plm_gradient3(theta, &plj, &pcc, &prj);
    let gyrj = plm_gradient3(theta, &pcc, &prj, &prim(0, 2));

    let cs2_xl = cs.sound_speed_squared(x - 0.5 * dx, y);
    let cs2_xr = cs.sound_speed_squared(x + 0.5 * dx, y);
    let cs2_yl = cs.sound_speed_squared(x, y - 0.5 * dy);
    let cs2_yr = cs.sound_speed_squared(x, y + 0.5 * dy);

    let mut fxl = riemann_hlle(pli + gxli * 0.5, pcc - gxcc * 0.5, Direction::X, cs2_xl);
    let mut fxr = riemann_hlle(pcc + gxcc * 0.5, pri - gxri * 0.5, Direction::X, cs2_xr);
    let mut fyl = riemann_hlle(plj + gylj * 0.5, pcc - gycc * 0.5, Direction::Y, cs2_yl);
    let mut fyr = riemann_hlle(pcc + gycc * 0.5, prj - gyrj * 0.5, Direction::Y, cs2_yr);

    if nu > 0.0 {
        // trace-free strain rate, with the stress averaged across each face
        let strain = |di: i64, dj: i64| {
            let pc = prim(di, dj);
            let pw = prim(di - 1, dj);
            let pe = prim(di + 1, dj);
            let ps = prim(di, dj - 1);
            let pn = prim(di, dj + 1);
            let dvx_dx = plm_gradient(theta, pw.velocity_x(), pc.velocity_x(), pe.velocity_x()) / dx;
            let dvy_dx = plm_gradient(theta, pw.velocity_y(), pc.velocity_y(), pe.velocity_y()) / dx;
            let dvx_dy = plm_gradient(theta, ps.velocity_x(), pc.velocity_x(), pn.velocity_x()) / dy;
            let dvy_dy = plm_gradient(theta, ps.velocity_y(), pc.velocity_y(), pn.velocity_y()) / dy;
            let sxx = 4.0 / 3.0 * dvx_dx - 2.0 / 3.0 * dvy_dy;
            let syy = 4.0 / 3.0 * dvy_dy - 2.0 / 3.0 * dvx_dx;
            let sxy = dvx_dy + dvy_dx;
            let sigma = pc.surface_density();
            (nu * sigma * sxx, nu * sigma * syy, nu * sigma * sxy)
        };
        let (txx_cc, tyy_cc, txy_cc) = strain(0, 0);
        let (txx_li, _, txy_li) = strain(-1, 0);
        let (txx_ri, _, txy_ri) = strain(1, 0);
        let (_, tyy_lj, txy_lj) = strain(0, -1);
        let (_, tyy_rj, txy_rj) = strain(0, 1);

        fxl.1 -= 0.5 * (txx_li + txx_cc);
        fxl.2 -= 0.5 * (txy_li + txy_cc);
        fxr.1 -= 0.5 * (txx_cc + txx_ri);
        fxr.2 -= 0.5 * (txy_cc + txy_ri);
        fyl.1 -= 0.5 * (txy_lj + txy_cc);
        fyl.2 -= 0.5 * (tyy_lj + tyy_cc);
        fyr.1 -= 0.5 * (txy_cc + txy_rj);
        fyr.2 -= 0.5 * (tyy_cc + tyy_rj);
    }

    let mut ucc = pcc.to_conserved();

    for mass in masses {
        ucc = ucc + point_mass_source_term(mass, x, y, &pcc) * dt;
    }
    if let Some((target, rate)) = buffer.driving_target(x, y) {
        let u0 = Primitive(target.mass_density, target.velocity_x, target.velocity_y).to_conserved();
        ucc = ucc - (ucc - u0) * rate * dt;
    }
    ucc = ucc - (fxr - fxl) * (dt / dx) - (fyr - fyl) * (dt / dy);

    let urk = Conserved::from_slice(conserved_rk.get_slice([i, j]));
    let uout = ucc * (1.0 - rk_param) + urk * rk_param;

    uout.to_primitive(parameters.velocity_ceiling).write_to_slice(out)
}




// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_conserved_round_trip_is_exact() {
        let p0 = Primitive(2.5, -0.3, 0.7);
        let p1 = p0.to_conserved().to_primitive(1e16);
        assert!(f64::abs(p0.surface_density() - p1.surface_density()) < 1e-12);
        assert!(f64::abs(p0.velocity_x() - p1.velocity_x()) < 1e-12);
        assert!(f64::abs(p0.velocity_y() - p1.velocity_y()) < 1e-12);
    }

    #[test]
    fn velocity_ceiling_clamps_the_inverse_map() {
        let u = Conserved(1e-12, 1.0, -1.0);
        let p = u.to_primitive(10.0);
        assert_eq!(p.velocity_x(), 10.0);
        assert_eq!(p.velocity_y(), -10.0);
    }

    #[test]
    fn hlle_flux_is_consistent_for_equal_states() {
        let p = Primitive(1.5, 0.2, -0.1);
        let f = riemann_hlle(p, p, Direction::X, 1.0);
        let f0 = p.flux_vector(Direction::X, 1.0);
        assert!(f64::abs(f.0 - f0.0) < 1e-14);
        assert!(f64::abs(f.1 - f0.1) < 1e-14);
        assert!(f64::abs(f.2 - f0.2) < 1e-14);
    }

    #[test]
    fn inactive_sink_model_only_gravitates() {
        let mass = PointMass {
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            mass: 1.0,
            softening_length: 0.01,
            sink_rate: 5.0,
            sink_radius: 0.1,
            sink_model: SinkModel::Inactive,
        };
        let p = Primitive(1.0, 0.0, 0.0);
        let s = point_mass_source_term(&mass, 0.05, 0.0, &p);
        assert_eq!(s.surface_density(), 0.0);
        assert!(s.momentum_x() < 0.0);
    }

    #[test]
    fn force_free_sink_removes_mass_but_not_momentum() {
        let mass = PointMass {
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            mass: 0.0,
            softening_length: 0.01,
            sink_rate: 5.0,
            sink_radius: 0.1,
            sink_model: SinkModel::ForceFree,
        };
        let p = Primitive(2.0, 0.4, 0.0);
        let s = point_mass_source_term(&mass, 0.0, 0.0, &p);
        assert!(f64::abs(s.surface_density() + 2.0 * 5.0) < 1e-12);
        assert_eq!(s.momentum_x(), 0.0);
        assert_eq!(s.momentum_y(), 0.0);
    }
}
