//! Adiabatic gamma-law finite-volume solver for thin-disk problems in 2D
//! planar cartesian coordinates. Extends the isothermal solver with an
//! energy equation, a beta-cooling source, and an alpha-viscosity whose
//! kinematic coefficient follows the local disk scale height.

use derive_more::{Add, Sub, Mul, Div};
use serde::{Serialize, Deserialize};
use crate::Direction;
use crate::eos::EquationOfState;
use crate::error::Error;
use crate::execution::ExecutionMode;
use crate::mesh::StructuredMesh;
use crate::patch::Patch;
use crate::piecewise_linear::plm_gradient;
use crate::source_terms::{BufferZone, PointMass, SinkModel};

pub const NCONS: usize = 4;




/**
 * Runtime parameters for the adiabatic solver
 */
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameters {

    /// Parameter for gradient estimation: [1, 2]
    pub plm_theta: f64,

    /// Alpha-viscosity coefficient; zero disables the viscous flux
    pub alpha: f64,

    /// Beta-cooling coefficient; zero disables cooling
    pub cooling_coefficient: f64,

    /// Smallest surface density the conserved-to-primitive map will admit
    pub density_floor: f64,

    /// Smallest gas pressure the conserved-to-primitive map will admit
    pub pressure_floor: f64,

    /// Largest velocity magnitude the conserved-to-primitive map will admit
    pub velocity_ceiling: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            plm_theta: 1.5,
            alpha: 0.0,
            cooling_coefficient: 0.0,
            density_floor: 1e-10,
            pressure_floor: 1e-10,
            velocity_ceiling: 1e16,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.plm_theta < 1.0 || self.plm_theta > 2.0 {
            anyhow::bail!("plm_theta must be in the range [1, 2]")
        }
        if self.alpha < 0.0 {
            anyhow::bail!("alpha must be non-negative")
        }
        if self.cooling_coefficient < 0.0 {
            anyhow::bail!("cooling_coefficient must be non-negative")
        }
        if self.density_floor <= 0.0 || self.pressure_floor <= 0.0 {
            anyhow::bail!("the density and pressure floors must be positive")
        }
        if self.velocity_ceiling <= 0.0 {
            anyhow::bail!("velocity_ceiling must be positive")
        }
        Ok(())
    }
}




// ============================================================================
#[derive(Clone, Copy, Debug, Default, PartialEq, Add, Sub, Mul, Div)]
pub struct Primitive(f64, f64, f64, f64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Add, Sub, Mul, Div)]
pub struct Conserved(f64, f64, f64, f64);




// ============================================================================
impl Primitive {

    pub fn new(sigma: f64, vx: f64, vy: f64, pg: f64) -> Self {
        Self(sigma, vx, vy, pg)
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

    pub fn surface_density(&self) -> f64 {
        self.0
    }

    pub fn velocity_x(&self) -> f64 {
        self.1
    }

    pub fn velocity_y(&self) -> f64 {
        self.2
    }

    pub fn gas_pressure(&self) -> f64 {
        self.3
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

    pub fn sound_speed_squared(&self, gamma_law_index: f64) -> f64 {
        gamma_law_index * self.3 / self.0
    }

    pub fn specific_internal_energy(&self, gamma_law_index: f64) -> f64 {
        self.3 / self.0 / (gamma_law_index - 1.0)
    }

    pub fn to_conserved(&self, gamma_law_index: f64) -> Conserved {
        Conserved(
            self.0,
            self.0 * self.1,
            self.0 * self.2,
            self.3 / (gamma_law_index - 1.0) + 0.5 * self.0 * self.velocity_squared(),
        )
    }

    pub fn flux_vector(&self, direction: Direction, gamma_law_index: f64) -> Conserved {
        let pg = self.3;
        let vn = self.velocity(direction);
        let u = self.to_conserved(gamma_law_index);

        Conserved(
            u.0 * vn,
            u.1 * vn + pg * direction.along(Direction::X),
            u.2 * vn + pg * direction.along(Direction::Y),
            (u.3 + pg) * vn,
        )
    }

    pub fn outer_wavespeeds(&self, direction: Direction, gamma_law_index: f64) -> (f64, f64) {
        let cs = self.sound_speed_squared(gamma_law_index).sqrt();
        let vn = self.velocity(direction);
        (vn - cs, vn + cs)
    }

    pub fn max_signal_speed(&self, gamma_law_index: f64) -> f64 {
        f64::max(self.1.abs(), self.2.abs()) + self.sound_speed_squared(gamma_law_index).sqrt()
    }
}




// ============================================================================
impl Conserved {

    pub fn new(sigma: f64, px: f64, py: f64, energy: f64) -> Self {
        Self(sigma, px, py, energy)
    }

    pub fn from_slice(cons: &[f64]) -> Self {
        Self(cons[0], cons[1], cons[2], cons[3])
    }

    pub fn write_to_slice(&self, cons: &mut [f64]) {
        cons[0] = self.0;
        cons[1] = self.1;
        cons[2] = self.2;
        cons[3] = self.3;
    }

    pub fn as_array(&self) -> [f64; NCONS] {
        [self.0, self.1, self.2, self.3]
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

    pub fn total_energy(&self) -> f64 {
        self.3
    }

    /**
     * Recover the primitive state, clamping the density, the velocity
     * magnitude, and then the pressure to their admissible ranges.
     */
    pub fn to_primitive(&self, gamma_law_index: f64, parameters: &Parameters) -> Primitive {
        let sigma = f64::max(self.0, parameters.density_floor);
        let ceiling = parameters.velocity_ceiling;
        let vx = f64::clamp(self.1 / sigma, -ceiling, ceiling);
        let vy = f64::clamp(self.2 / sigma, -ceiling, ceiling);
        let pg = (self.3 - 0.5 * sigma * (vx * vx + vy * vy)) * (gamma_law_index - 1.0);
        Primitive(sigma, vx, vy, f64::max(pg, parameters.pressure_floor))
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
 * HLLE flux at the interface between two primitive states, with the outer
 * wavespeeds clamped around zero.
 */
pub fn riemann_hlle(pl: Primitive, pr: Primitive, direction: Direction, gamma_law_index: f64) -> Conserved {
    let ul = pl.to_conserved(gamma_law_index);
    let ur = pr.to_conserved(gamma_law_index);
    let fl = pl.flux_vector(direction, gamma_law_index);
    let fr = pr.flux_vector(direction, gamma_law_index);

    let (alm, alp) = pl.outer_wavespeeds(direction, gamma_law_index);
    let (arm, arp) = pr.outer_wavespeeds(direction, gamma_law_index);
    let ap = f64::max(0.0, f64::max(alp, arp));
    let am = f64::min(0.0, f64::min(alm, arm));

    (fl * ap - fr * am + (ur - ul) * ap * am) / (ap - am)
}




/**
 * Rate of change of the conserved state due to one point mass. The energy
 * row carries the gravitational power and the internal plus kinetic energy
 * advected out through the sink.
 */
fn point_mass_source_term(mass: &PointMass, x: f64, y: f64, prim: &Primitive, gamma_law_index: f64) -> Conserved {
    let dx = x - mass.x;
    let dy = y - mass.y;
    let r2 = dx * dx + dy * dy;
    let s2 = mass.softening_length * mass.softening_length;

    let sigma = prim.surface_density();
    let vx = prim.velocity_x();
    let vy = prim.velocity_y();
    let g = sigma * mass.mass * (r2 + s2).powf(-1.5);
    let fx = -g * dx;
    let fy = -g * dy;
    let power = fx * vx + fy * vy;
    let mdot = -sigma * mass.sink_kernel(dx, dy);
    let epsilon = prim.specific_internal_energy(gamma_law_index);

    match mass.sink_model {
        SinkModel::Inactive => {
            Conserved(0.0, fx, fy, power)
        }
        SinkModel::AccelerationFree => {
            let e = epsilon + 0.5 * prim.velocity_squared();
            Conserved(mdot, mdot * vx + fx, mdot * vy + fy, mdot * e + power)
        }
        SinkModel::TorqueFree => {
            let (wx, wy) = mass.torque_free_velocity(x, y, vx, vy);
            let e = epsilon + 0.5 * (wx * wx + wy * wy);
            Conserved(mdot, mdot * wx + fx, mdot * wy + fy, mdot * e + power)
        }
        SinkModel::ForceFree => {
            let e = epsilon + 0.5 * prim.velocity_squared();
            Conserved(mdot, fx, fy, mdot * e + power)
        }
    }
}




/**
 * Energy removed over one time step by beta-cooling: the specific internal
 * energy is relaxed implicitly, so arbitrarily fast cooling stays stable.
 */
fn cooling_source_term(prim: &Primitive, gamma_law_index: f64, cooling_coefficient: f64, dt: f64) -> f64 {
    let sigma = prim.surface_density();
    let ep = prim.specific_internal_energy(gamma_law_index);
    let ep_cooled = ep * (1.0 + 3.0 * cooling_coefficient * ep.powi(3) * dt / (sigma * sigma)).powf(-1.0 / 3.0);
    sigma * (ep_cooled - ep)
}




// ============================================================================
/**
 * Convert a patch of primitive data to conserved data, pointwise over the
 * index space of the output patch.
 */
pub fn primitive_to_conserved(
    primitive: &Patch,
    conserved: &mut Patch,
    eos: &EquationOfState,
    mode: ExecutionMode) -> Result<(), Error>
{
    let gamma_law_index = eos.gamma_law_index()?;

    if primitive.num_fields() != NCONS || !primitive.covers(conserved) {
        return Err(Error::InvalidPatchLayout { name: "primitive" })
    }
    let start = conserved.start();
    let count = conserved.count();

    conserved.try_for_each_row_mut(mode, |i, row| {
        for n in 0..count[1] {
            let j = start[1] + n as i64;
            let p = Primitive::from_slice(primitive.get_slice([i, j]));
            p.to_conserved(gamma_law_index).write_to_slice(&mut row[n * NCONS..(n + 1) * NCONS]);
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
    mode: ExecutionMode) -> Result<(), Error>
{
    let gamma_law_index = eos.gamma_law_index()?;

    if !primitive.has_extent([-2, -2], [mesh.ni as usize + 4, mesh.nj as usize + 4], NCONS) {
        return Err(Error::InvalidPatchLayout { name: "primitive" })
    }
    if !wavespeed.has_extent([0, 0], mesh.shape(), 1) {
        return Err(Error::InvalidPatchLayout { name: "wavespeed" })
    }

    wavespeed.try_for_each_row_mut(mode, |i, row| {
        for j in 0..mesh.nj {
            let p = Primitive::from_slice(primitive.get_slice([i, j]));
            row[j as usize] = p.max_signal_speed(gamma_law_index);
        }
        Ok(())
    })
}




/**
 * Advance the solution by one Runge-Kutta stage. The zone kernel order is
 * reconstruction, inviscid flux, viscous flux, source terms, flux
 * divergence, the convex combination with the cached conserved state, and
 * the trailing conserved-to-primitive conversion.
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
    let gamma_law_index = eos.gamma_law_index()?;
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
            advance_rk_zone(mesh, conserved_rk, primitive_rd, gamma_law_index, buffer, masses, parameters, rk_param, dt, (i, j), out);
        }
        Ok(())
    })
}

fn advance_rk_zone(
    mesh: &StructuredMesh,
    conserved_rk: &Patch,
    primitive_rd: &Patch,
    gamma_law_index: f64,
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
    let gm = gamma_law_index;

    let prim = |di: i64, dj: i64| Primitive::from_slice(primitive_rd.get_slice([i + di, j + dj]));

    let pcc = prim(0, 0);
    let pli = prim(-1, 0);
    let pri = prim(1, 0);
    let plj = prim(0, -1);
    let prj = prim(0, 1);

    let gxli = plm_gradient4(theta, &prim(-2, 0), &pli, &pcc);
    let gxcc = plm_gradient4(theta, &pli, &pcc, &pri);
    let gxri = plm_gradient4(theta, &pcc, &pri, &prim(2, 0));
    let gylj = plm_gradient4(theta, &prim(0, -2), &plj, &pcc);
    let gycc = plm_gradient4(theta, &plj, &pcc, &prj);
    let gyrj = plm_gradient4(theta, &pcc, &prj, &prim(0, 2));

    let mut fxl = riemann_hlle(pli + gxli * 0.5, pcc - gxcc * 0.5, Direction::X, gm);
    let mut fxr = riemann_hlle(pcc + gxcc * 0.5, pri - gxri * 0.5, Direction::X, gm);
    let mut fyl = riemann_hlle(plj + gylj * 0.5, pcc - gycc * 0.5, Direction::Y, gm);
    let mut fyr = riemann_hlle(pcc + gycc * 0.5, prj - gyrj * 0.5, Direction::Y, gm);

    if parameters.alpha > 0.0 {
        // kinematic viscosity from the local scale height, nu = alpha h cs,
        // with the orbital frequency set by the softened point masses
        let stress = |di: i64, dj: i64| {
            let pc = prim(di, dj);
            let pw = prim(di - 1, dj);
            let pe = prim(di + 1, dj);
            let ps = prim(di, dj - 1);
            let pn = prim(di, dj + 1);
            let (xc, yc) = mesh.cell_coordinates(i + di, j + dj);

            let omega2: f64 = masses.iter().map(|mass| {
                let mdx = xc - mass.x;
                let mdy = yc - mass.y;
                let s2 = mass.softening_length * mass.softening_length;
                mass.mass * (mdx * mdx + mdy * mdy + s2).powf(-1.5)
            }).sum();

            let sigma = pc.surface_density();
            let cs2 = pc.gas_pressure() / sigma;
            let nu = if omega2 > 0.0 {
                parameters.alpha * cs2 / omega2.sqrt()
            } else {
                0.0
            };
            let dvx_dx = plm_gradient(theta, pw.velocity_x(), pc.velocity_x(), pe.velocity_x()) / dx;
            let dvy_dx = plm_gradient(theta, pw.velocity_y(), pc.velocity_y(), pe.velocity_y()) / dx;
            let dvx_dy = plm_gradient(theta, ps.velocity_x(), pc.velocity_x(), pn.velocity_x()) / dy;
            let dvy_dy = plm_gradient(theta, ps.velocity_y(), pc.velocity_y(), pn.velocity_y()) / dy;
            let sxx = 4.0 / 3.0 * dvx_dx - 2.0 / 3.0 * dvy_dy;
            let syy = 4.0 / 3.0 * dvy_dy - 2.0 / 3.0 * dvx_dx;
            let sxy = dvx_dy + dvy_dx;
            (nu * sigma * sxx, nu * sigma * syy, nu * sigma * sxy, pc.velocity_x(), pc.velocity_y())
        };
        let (txx_cc, tyy_cc, txy_cc, vx_cc, vy_cc) = stress(0, 0);
        let (txx_li, _, txy_li, vx_li, vy_li) = stress(-1, 0);
        let (txx_ri, _, txy_ri, vx_ri, vy_ri) = stress(1, 0);
        let (_, tyy_lj, txy_lj, vx_lj, vy_lj) = stress(0, -1);
        let (_, tyy_rj, txy_rj, vx_rj, vy_rj) = stress(0, 1);

        fxl.1 -= 0.5 * (txx_li + txx_cc);
        fxl.2 -= 0.5 * (txy_li + txy_cc);
        fxl.3 -= 0.5 * (vx_li * txx_li + vy_li * txy_li + vx_cc * txx_cc + vy_cc * txy_cc);
        fxr.1 -= 0.5 * (txx_cc + txx_ri);
        fxr.2 -= 0.5 * (txy_cc + txy_ri);
        fxr.3 -= 0.5 * (vx_cc * txx_cc + vy_cc * txy_cc + vx_ri * txx_ri + vy_ri * txy_ri);
        fyl.1 -= 0.5 * (txy_lj + txy_cc);
        fyl.2 -= 0.5 * (tyy_lj + tyy_cc);
        fyl.3 -= 0.5 * (vx_lj * txy_lj + vy_lj * tyy_lj + vx_cc * txy_cc + vy_cc * tyy_cc);
        fyr.1 -= 0.5 * (txy_cc + txy_rj);
        fyr.2 -= 0.5 * (tyy_cc + tyy_rj);
        fyr.3 -= 0.5 * (vx_cc * txy_cc + vy_cc * tyy_cc + vx_rj * txy_rj + vy_rj * tyy_rj);
    }

    let mut ucc = pcc.to_conserved(gm);

    for mass in masses {
        ucc = ucc + point_mass_source_term(mass, x, y, &pcc, gm) * dt;
    }
    if parameters.cooling_coefficient > 0.0 {
        ucc.3 += cooling_source_term(&pcc, gm, parameters.cooling_coefficient, dt);
    }
    if let Some((target, rate)) = buffer.driving_target(x, y) {
        let u0 = Primitive(target.mass_density, target.velocity_x, target.velocity_y, target.gas_pressure).to_conserved(gm);
        ucc = ucc - (ucc - u0) * rate * dt;
    }
    ucc = ucc - (fxr - fxl) * (dt / dx) - (fyr - fyl) * (dt / dy);

    let urk = Conserved::from_slice(conserved_rk.get_slice([i, j]));
    let uout = ucc * (1.0 - rk_param) + urk * rk_param;

    uout.to_primitive(gm, parameters).write_to_slice(out)
}
