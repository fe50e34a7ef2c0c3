use num::rational::Rational64;
use serde::{Serialize, Deserialize};




/**
 * Enum for the Runge-Kutta time integration order. The strong-stability
 * preserving schemes are written as a sequence of forward-Euler updates,
 * each one followed by a convex combination with the conserved state
 * cached at the start of the full step,
 *
 * ```text
 * u' = (1 - b) * (u + du) + b * u_cached
 * ```
 *
 * where b is the stage parameter returned by `stage_parameters`.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RungeKuttaOrder {
    RK1,
    RK2,
    RK3,
}




// ============================================================================
impl RungeKuttaOrder {

    pub fn number_of_stages(self) -> usize {
        match self {
            RungeKuttaOrder::RK1 => 1,
            RungeKuttaOrder::RK2 => 2,
            RungeKuttaOrder::RK3 => 3,
        }
    }

    /**
     * Return the convex-combination parameter for each stage, as an exact
     * rational number.
     */
    pub fn stage_parameters(self) -> Vec<Rational64> {
        match self {
            RungeKuttaOrder::RK1 => vec![
                Rational64::new(0, 1),
            ],
            RungeKuttaOrder::RK2 => vec![
                Rational64::new(0, 1),
                Rational64::new(1, 2),
            ],
            RungeKuttaOrder::RK3 => vec![
                Rational64::new(0, 1),
                Rational64::new(3, 4),
                Rational64::new(1, 3),
            ],
        }
    }
}
