use approx::assert_relative_eq;
use num::ToPrimitive;
use spinnaker::{ExecutionMode, Patch, StructuredMesh};
use spinnaker::eos::EquationOfState;
use spinnaker::euler2d;
use spinnaker::runge_kutta::RungeKuttaOrder;
use spinnaker::source_terms::BufferZone;

const NCONS: usize = 4;
const GAMMA: f64 = 5.0 / 3.0;




// ============================================================================
fn periodic_mesh(n: u32) -> StructuredMesh {
    StructuredMesh {
        ni: n as i64,
        nj: n as i64,
        x0: 0.0,
        y0: 0.0,
        dx: 1.0 / n as f64,
        dy: 1.0 / n as f64,
    }
}

fn apply_periodic_bc(patch: &mut Patch, mesh: &StructuredMesh) {
    for i in -2..mesh.ni + 2 {
        for j in -2..mesh.nj + 2 {
            if 0 <= i && i < mesh.ni && 0 <= j && j < mesh.nj {
                continue
            }
            let src = patch.get_slice([i.rem_euclid(mesh.ni), j.rem_euclid(mesh.nj)]).to_vec();
            patch.get_slice_mut([i, j]).copy_from_slice(&src);
        }
    }
}

fn guarded_primitive<F>(mesh: &StructuredMesh, f: F) -> Patch
where
    F: Fn(f64, f64) -> [f64; NCONS],
{
    Patch::from_fn([-2, -2], [mesh.ni as usize + 4, mesh.nj as usize + 4], NCONS, |(i, j), prim| {
        let (x, y) = mesh.cell_coordinates(i, j);
        prim.copy_from_slice(&f(x, y));
    })
}

fn advance(
    mesh: &StructuredMesh,
    primitive: &mut Patch,
    eos: &EquationOfState,
    parameters: &euler2d::Parameters,
    order: RungeKuttaOrder,
    dt: f64)
{
    let mut conserved_rk = Patch::zeros([0, 0], mesh.shape(), NCONS);
    apply_periodic_bc(primitive, mesh);
    euler2d::primitive_to_conserved(primitive, &mut conserved_rk, eos, ExecutionMode::CPU).unwrap();

    for b in order.stage_parameters() {
        apply_periodic_bc(primitive, mesh);
        let mut primitive_wr = primitive.clone();
        euler2d::advance_rk(
            mesh,
            &conserved_rk,
            primitive,
            &mut primitive_wr,
            eos,
            &BufferZone::None,
            &[],
            parameters,
            b.to_f64().unwrap(),
            dt,
            ExecutionMode::CPU,
        )
        .unwrap();
        *primitive = primitive_wr;
    }
}

fn total_conserved(mesh: &StructuredMesh, primitive: &Patch) -> [f64; NCONS] {
    let mut tot = [0.0; NCONS];
    for i in 0..mesh.ni {
        for j in 0..mesh.nj {
            let u = euler2d::Primitive::from_slice(primitive.get_slice([i, j])).to_conserved(GAMMA);
            for (t, u) in tot.iter_mut().zip(u.as_array().iter()) {
                *t += u * mesh.dx * mesh.dy;
            }
        }
    }
    tot
}




// ============================================================================
#[test]
fn static_atmosphere_is_preserved_to_machine_precision() {
    let mesh = periodic_mesh(64);
    let eos = EquationOfState::GammaLaw { gamma_law_index: GAMMA };
    let parameters = euler2d::Parameters::default();
    let mut primitive = guarded_primitive(&mesh, |_, _| [1.0, 0.0, 0.0, 1.0]);

    for _ in 0..10 {
        advance(&mesh, &mut primitive, &eos, &parameters, RungeKuttaOrder::RK3, 1e-2);
    }

    for i in 0..mesh.ni {
        for j in 0..mesh.nj {
            let p = euler2d::Primitive::from_slice(primitive.get_slice([i, j]));
            assert!(f64::abs(p.surface_density() - 1.0) < 1e-12);
            assert!(f64::abs(p.velocity_x()) < 1e-12);
            assert!(f64::abs(p.velocity_y()) < 1e-12);
            assert!(f64::abs(p.gas_pressure() - 1.0) < 1e-12);
        }
    }
}

#[test]
fn conserved_totals_are_invariant_without_sources() {
    let mesh = periodic_mesh(32);
    let eos = EquationOfState::GammaLaw { gamma_law_index: GAMMA };
    let parameters = euler2d::Parameters::default();
    let k = 2.0 * std::f64::consts::PI;
    let mut primitive = guarded_primitive(&mesh, |x, y| {
        [
            1.0 + 0.2 * (k * x).sin() * (k * y).sin(),
            0.1 * (k * y).cos(),
            -0.1 * (k * x).sin(),
            1.0 + 0.1 * (k * x).cos(),
        ]
    });

    let before = total_conserved(&mesh, &primitive);
    for _ in 0..3 {
        advance(&mesh, &mut primitive, &eos, &parameters, RungeKuttaOrder::RK3, 1e-3);
    }
    let after = total_conserved(&mesh, &primitive);

    for q in 0..NCONS {
        assert_relative_eq!(after[q], before[q], epsilon = 1e-12, max_relative = 1e-12);
    }
}

#[test]
fn floors_keep_a_blast_wave_positive() {
    let mesh = periodic_mesh(32);
    let eos = EquationOfState::GammaLaw { gamma_law_index: GAMMA };
    let parameters = euler2d::Parameters::default();
    let mut primitive = guarded_primitive(&mesh, |x, y| {
        let r2 = (x - 0.5).powi(2) + (y - 0.5).powi(2);
        let pg = if r2 < 0.01 { 10.0 } else { 0.01 };
        [1.0, 0.0, 0.0, pg]
    });

    for _ in 0..20 {
        advance(&mesh, &mut primitive, &eos, &parameters, RungeKuttaOrder::RK2, 2e-4);
    }

    for i in 0..mesh.ni {
        for j in 0..mesh.nj {
            let p = euler2d::Primitive::from_slice(primitive.get_slice([i, j]));
            assert!(p.surface_density() >= parameters.density_floor);
            assert!(p.gas_pressure() >= parameters.pressure_floor);
            assert!(p.surface_density().is_finite());
            assert!(p.gas_pressure().is_finite());
        }
    }
}

#[test]
fn beta_cooling_reduces_the_total_energy_only() {
    let mesh = periodic_mesh(16);
    let eos = EquationOfState::GammaLaw { gamma_law_index: GAMMA };
    let parameters = euler2d::Parameters {
        cooling_coefficient: 1.0,
        ..euler2d::Parameters::default()
    };
    let mut primitive = guarded_primitive(&mesh, |_, _| [1.0, 0.0, 0.0, 1.0]);

    let before = total_conserved(&mesh, &primitive);
    advance(&mesh, &mut primitive, &eos, &parameters, RungeKuttaOrder::RK1, 1e-2);
    let after = total_conserved(&mesh, &primitive);

    assert!(f64::abs(after[0] - before[0]) < 1e-14);
    assert!(f64::abs(after[1]) < 1e-14);
    assert!(f64::abs(after[2]) < 1e-14);
    assert!(after[3] < before[3]);
}

#[test]
fn alpha_viscosity_damps_shear() {
    let mesh = periodic_mesh(32);
    let eos = EquationOfState::GammaLaw { gamma_law_index: GAMMA };

    // a heavily softened central mass sets the orbital frequency for the
    // alpha prescription while contributing only a weak direct force
    let star = spinnaker::source_terms::PointMass {
        x: 0.5,
        y: 0.5,
        vx: 0.0,
        vy: 0.0,
        mass: 4.0,
        softening_length: 2.0,
        sink_rate: 0.0,
        sink_radius: 1.0,
        sink_model: spinnaker::source_terms::SinkModel::Inactive,
    };
    let parameters = euler2d::Parameters {
        alpha: 0.1,
        ..euler2d::Parameters::default()
    };
    let k = 2.0 * std::f64::consts::PI;
    let mut primitive = guarded_primitive(&mesh, |_, y| {
        [1.0, 0.2 * (k * y).sin(), 0.0, 1.0]
    });

    let shear_amplitude = |p: &Patch| -> f64 {
        (0..mesh.nj)
            .map(|j| euler2d::Primitive::from_slice(p.get_slice([0, j])).velocity_x().abs())
            .fold(0.0, f64::max)
    };
    let before = shear_amplitude(&primitive);
    let mut conserved_rk = Patch::zeros([0, 0], mesh.shape(), NCONS);

    for _ in 0..10 {
        apply_periodic_bc(&mut primitive, &mesh);
        euler2d::primitive_to_conserved(&primitive, &mut conserved_rk, &eos, ExecutionMode::CPU).unwrap();
        let mut primitive_wr = primitive.clone();
        euler2d::advance_rk(
            &mesh,
            &conserved_rk,
            &primitive,
            &mut primitive_wr,
            &eos,
            &BufferZone::None,
            &[star],
            &parameters,
            0.0,
            1e-3,
            ExecutionMode::CPU,
        )
        .unwrap();
        primitive = primitive_wr;
    }

    let after = shear_amplitude(&primitive);
    assert!(after < before);
}
