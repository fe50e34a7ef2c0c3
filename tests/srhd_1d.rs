use num::ToPrimitive;
use spinnaker::{Coordinates, ExecutionMode, RiemannSolver, ScaleFactor};
use spinnaker::runge_kutta::RungeKuttaOrder;
use spinnaker::srhd_1d;

const NCONS: usize = 4;




// ============================================================================
struct Simulation {
    faces: Vec<f64>,
    conserved: Vec<f64>,
    primitive: Vec<f64>,
    time: f64,
    coords: Coordinates,
    scale: ScaleFactor,
    parameters: srhd_1d::Parameters,
}

impl Simulation {

    fn new<F>(faces: Vec<f64>, coords: Coordinates, parameters: srhd_1d::Parameters, initial: F) -> Self
    where
        F: Fn(f64) -> [f64; NCONS],
    {
        let ni = faces.len() - 1;
        let scale = ScaleFactor::default();
        let mut primitive = vec![0.0; (ni + 4) * NCONS];
        let mut interior = vec![0.0; ni * NCONS];

        for i in 0..ni {
            let x = 0.5 * (faces[i] + faces[i + 1]);
            interior[i * NCONS..(i + 1) * NCONS].copy_from_slice(&initial(x));
        }
        let mut conserved = vec![0.0; ni * NCONS];
        srhd_1d::primitive_to_conserved(
            &faces,
            &interior,
            &mut conserved,
            &scale,
            0.0,
            coords,
            &parameters,
            ExecutionMode::CPU,
        )
        .unwrap();

        for i in 0..ni {
            primitive[(i + 2) * NCONS..(i + 3) * NCONS].copy_from_slice(&interior[i * NCONS..(i + 1) * NCONS]);
        }
        let mut sim = Self {
            faces,
            conserved,
            primitive,
            time: 0.0,
            coords,
            scale,
            parameters,
        };
        sim.apply_outflow_bc();
        sim
    }

    fn num_zones(&self) -> usize {
        self.faces.len() - 1
    }

    fn apply_outflow_bc(&mut self) {
        let ni = self.num_zones();
        for q in 0..NCONS {
            let inner = self.primitive[2 * NCONS + q];
            let outer = self.primitive[(ni + 1) * NCONS + q];
            self.primitive[q] = inner;
            self.primitive[NCONS + q] = inner;
            self.primitive[(ni + 2) * NCONS + q] = outer;
            self.primitive[(ni + 3) * NCONS + q] = outer;
        }
    }

    fn recover_primitive(&mut self) {
        let ni = self.num_zones();
        let mut interior = vec![0.0; ni * NCONS];
        for i in 0..ni {
            interior[i * NCONS..(i + 1) * NCONS]
                .copy_from_slice(&self.primitive[(i + 2) * NCONS..(i + 3) * NCONS]);
        }
        srhd_1d::conserved_to_primitive(
            &self.faces,
            &self.conserved,
            &mut interior,
            &self.scale,
            self.time,
            self.coords,
            &self.parameters,
            ExecutionMode::CPU,
        )
        .unwrap();
        for i in 0..ni {
            self.primitive[(i + 2) * NCONS..(i + 3) * NCONS]
                .copy_from_slice(&interior[i * NCONS..(i + 1) * NCONS]);
        }
        self.apply_outflow_bc();
    }

    fn step(&mut self, order: RungeKuttaOrder, dt: f64) {
        let conserved_rk = self.conserved.clone();
        for b in order.stage_parameters() {
            self.recover_primitive();
            let mut conserved_wr = vec![0.0; self.conserved.len()];
            srhd_1d::advance_rk(
                &self.faces,
                &conserved_rk,
                &self.primitive,
                &mut conserved_wr,
                &self.scale,
                self.time,
                dt,
                b.to_f64().unwrap(),
                self.coords,
                &self.parameters,
                ExecutionMode::CPU,
            )
            .unwrap();
            self.conserved = conserved_wr;
        }
        self.time += dt;
        self.recover_primitive();
    }

    fn primitive_at(&self, i: usize) -> srhd_1d::Primitive {
        srhd_1d::Primitive::from_slice(&self.primitive[(i + 2) * NCONS..(i + 3) * NCONS])
    }

    fn zone_center(&self, i: usize) -> f64 {
        0.5 * (self.faces[i] + self.faces[i + 1]) * self.scale.at(self.time)
    }

    fn total_rest_mass(&self) -> f64 {
        (0..self.num_zones()).map(|i| self.conserved[i * NCONS]).sum()
    }
}

fn uniform_faces(x0: f64, x1: f64, ni: usize) -> Vec<f64> {
    (0..=ni).map(|i| x0 + (x1 - x0) * i as f64 / ni as f64).collect()
}




// ============================================================================
#[test]
fn relativistic_blast_wave_produces_the_expected_shell() {
    let parameters = srhd_1d::Parameters {
        riemann_solver: RiemannSolver::HLLC,
        ..srhd_1d::Parameters::default()
    };
    let mut sim = Simulation::new(
        uniform_faces(0.0, 1.0, 400),
        Coordinates::Cartesian,
        parameters,
        |x| {
            if x < 0.5 {
                [1.0, 0.0, 1000.0, 1.0]
            } else {
                [1.0, 0.0, 0.01, 0.0]
            }
        },
    );

    let mass0 = sim.total_rest_mass();
    let dt = 7.5e-4;
    while sim.time < 0.4 {
        sim.step(RungeKuttaOrder::RK2, dt);
    }

    let ni = sim.num_zones();
    let mut u_max: f64 = 0.0;
    let mut rho_max: f64 = 0.0;
    for i in 0..ni {
        let p = sim.primitive_at(i);
        assert!(p.mass_density() > 0.0 && p.mass_density().is_finite());
        assert!(p.gas_pressure() > 0.0 && p.gas_pressure().is_finite());
        u_max = u_max.max(p.gamma_beta());
        rho_max = rho_max.max(p.mass_density());
    }

    // the shocked shell is thin, fast, and dense
    assert!(u_max > 2.0 && u_max < 7.0, "peak four-velocity {}", u_max);
    assert!(rho_max > 2.0, "peak shell density {}", rho_max);

    // the contact (tracked by the passive scalar) has moved well into the
    // right half of the domain but has not reached the boundary
    let contact = (0..ni)
        .find(|&i| sim.primitive_at(i).scalar() < 0.5)
        .unwrap();
    let x_contact = sim.zone_center(contact);
    assert!(x_contact > 0.7 && x_contact < 0.95, "contact at {}", x_contact);

    // nothing has left the domain, so rest mass is conserved
    let mass1 = sim.total_rest_mass();
    assert!(f64::abs(mass1 - mass0) < 1e-10 * mass0);
}

#[test]
fn spherical_explosion_drives_an_outgoing_shock() {
    let parameters = srhd_1d::Parameters::default();
    let mut sim = Simulation::new(
        uniform_faces(0.1, 1.0, 200),
        Coordinates::Spherical,
        parameters,
        |x| {
            if x < 0.2 {
                [1.0, 0.0, 1.0, 0.0]
            } else {
                [1.0, 0.0, 1e-4, 0.0]
            }
        },
    );

    let shock_radius = |sim: &Simulation| -> f64 {
        let mut r = 0.0;
        let mut u_peak = 0.0;
        for i in 0..sim.num_zones() {
            let u = sim.primitive_at(i).gamma_beta();
            if u > u_peak {
                u_peak = u;
                r = sim.zone_center(i);
            }
        }
        r
    };

    let dt = 1e-3;
    while sim.time < 0.15 {
        sim.step(RungeKuttaOrder::RK2, dt);
    }
    let r1 = shock_radius(&sim);
    while sim.time < 0.3 {
        sim.step(RungeKuttaOrder::RK2, dt);
    }
    let r2 = shock_radius(&sim);

    assert!(r1 > 0.2, "shock has left the bubble, r1 = {}", r1);
    assert!(r2 > r1, "shock keeps moving out: {} -> {}", r1, r2);
    assert!(r2 < 0.9, "shock has not reached the outer edge, r2 = {}", r2);

    for i in 0..sim.num_zones() {
        let p = sim.primitive_at(i);
        assert!(p.mass_density() > 0.0 && p.mass_density().is_finite());
        assert!(p.gas_pressure() > 0.0 && p.gas_pressure().is_finite());
    }
}

#[test]
fn pinned_end_zones_do_not_evolve() {
    let parameters = srhd_1d::Parameters {
        fix_i0: true,
        fix_i1: true,
        riemann_solver: RiemannSolver::HLLE,
        ..srhd_1d::Parameters::default()
    };
    let mut sim = Simulation::new(
        uniform_faces(0.0, 1.0, 50),
        Coordinates::Cartesian,
        parameters,
        |x| {
            if x < 0.5 {
                [1.0, 0.0, 10.0, 0.0]
            } else {
                [0.5, 0.0, 1.0, 0.0]
            }
        },
    );

    let ni = sim.num_zones();
    let first: Vec<f64> = sim.conserved[..NCONS].to_vec();
    let last: Vec<f64> = sim.conserved[(ni - 1) * NCONS..].to_vec();
    let middle: Vec<f64> = sim.conserved[(ni / 2) * NCONS..(ni / 2 + 1) * NCONS].to_vec();

    for _ in 0..5 {
        sim.step(RungeKuttaOrder::RK2, 1e-3);
    }

    for q in 0..NCONS {
        assert!(f64::abs(sim.conserved[q] - first[q]) < 1e-9 * (1.0 + first[q].abs()));
        assert!(f64::abs(sim.conserved[(ni - 1) * NCONS + q] - last[q]) < 1e-9 * (1.0 + last[q].abs()));
    }

    // the jump at the middle of the domain does evolve
    let moved = (0..NCONS).any(|q| {
        f64::abs(sim.conserved[(ni / 2) * NCONS + q] - middle[q]) > 1e-6
    });
    assert!(moved);
}

#[test]
fn expanding_coordinates_preserve_a_comoving_state_map() {
    // primitive -> conserved -> primitive round trips through the volume
    // factors of an expanded mesh
    let parameters = srhd_1d::Parameters::default();
    let faces = uniform_faces(0.1, 1.0, 20);
    let scale = ScaleFactor { a0: 1.0, adot: 0.5 };
    let time = 1.2;
    let ni = 20;

    let mut primitive = vec![0.0; ni * NCONS];
    for i in 0..ni {
        primitive[i * NCONS..(i + 1) * NCONS].copy_from_slice(&[1.0 + 0.1 * i as f64, 0.3, 2.0, 1.0]);
    }
    let mut conserved = vec![0.0; ni * NCONS];
    srhd_1d::primitive_to_conserved(
        &faces,
        &primitive,
        &mut conserved,
        &scale,
        time,
        Coordinates::Spherical,
        &parameters,
        ExecutionMode::CPU,
    )
    .unwrap();

    let mut recovered = primitive.clone();
    srhd_1d::conserved_to_primitive(
        &faces,
        &conserved,
        &mut recovered,
        &scale,
        time,
        Coordinates::Spherical,
        &parameters,
        ExecutionMode::CPU,
    )
    .unwrap();

    for (a, b) in primitive.iter().zip(recovered.iter()) {
        assert!(f64::abs(a - b) < 1e-9 * (1.0 + a.abs()));
    }
}

#[test]
fn wavespeed_uses_the_grid_frame_under_expansion() {
    let parameters = srhd_1d::Parameters::default();
    let faces = uniform_faces(0.9, 1.1, 2);
    let ni = 2;

    // gas moving with the homologous flow: u = W v with v = adot y
    let scale = ScaleFactor { a0: 1.0, adot: 0.5 };
    let mut primitive = vec![0.0; ni * NCONS];
    for i in 0..ni {
        let y = 0.5 * (faces[i] + faces[i + 1]);
        let v: f64 = 0.5 * y;
        let u = v / (1.0 - v * v).sqrt();
        primitive[i * NCONS..(i + 1) * NCONS].copy_from_slice(&[1.0, u, 1e-6, 0.0]);
    }

    let mut wavespeed = vec![0.0; ni];
    srhd_1d::max_wavespeed(
        &faces,
        &primitive,
        &mut wavespeed,
        &scale,
        &parameters,
        ExecutionMode::CPU,
    )
    .unwrap();

    // in the grid frame the gas is at rest, so the signal speed is just
    // the sound speed, far below the lab-frame flow speed
    let p = srhd_1d::Primitive::from_slice(&primitive[..NCONS]);
    let cs = p.sound_speed_squared(parameters.gamma_law_index).sqrt();
    for &a in &wavespeed {
        assert!(a < 2.0 * cs, "wavespeed {} should be near the sound speed {}", a, cs);
        assert!(a > 0.0);
    }
}
