use serde::{Serialize, Deserialize};
use crate::error::Error;
use crate::source_terms::{PointMass, gravitational_potential};




/**
 * Enum for the equation of state
 */
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub enum EquationOfState {

    /// Globally uniform sound speed
    Isothermal { sound_speed_squared: f64 },

    /// Sound speed set by a fixed Mach number and the local gravitational
    /// potential of the point masses
    LocallyIsothermal { mach_number_squared: f64 },

    /// Adiabatic gamma-law gas
    GammaLaw { gamma_law_index: f64 },
}




// ============================================================================
impl EquationOfState {

    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            EquationOfState::Isothermal { sound_speed_squared } => {
                if *sound_speed_squared <= 0.0 {
                    anyhow::bail!("sound_speed_squared must be positive")
                }
            }
            EquationOfState::LocallyIsothermal { mach_number_squared } => {
                if *mach_number_squared <= 0.0 {
                    anyhow::bail!("mach_number_squared must be positive")
                }
            }
            EquationOfState::GammaLaw { gamma_law_index } => {
                if *gamma_law_index <= 1.0 {
                    anyhow::bail!("gamma_law_index must be greater than 1")
                }
            }
        }
        Ok(())
    }

    /**
     * Resolve this equation of state into a pointwise sound-speed law for
     * the isothermal solvers. The gamma-law variant has no pointwise sound
     * speed and is rejected here, ahead of the zone loop.
     */
    pub(crate) fn sound_speed_law<'a>(&self, masses: &'a [PointMass]) -> Result<SoundSpeedLaw<'a>, Error> {
        match *self {
            EquationOfState::Isothermal { sound_speed_squared } => {
                Ok(SoundSpeedLaw::Uniform { sound_speed_squared })
            }
            EquationOfState::LocallyIsothermal { mach_number_squared } => {
                Ok(SoundSpeedLaw::Keplerian { mach_number_squared, masses })
            }
            EquationOfState::GammaLaw { .. } => {
                Err(Error::InvalidEquationOfState("an isothermal solver cannot use the gamma_law equation of state"))
            }
        }
    }

    /// The adiabatic index, if this is a gamma-law equation of state
    pub(crate) fn gamma_law_index(&self) -> Result<f64, Error> {
        match self {
            EquationOfState::GammaLaw { gamma_law_index } => Ok(*gamma_law_index),
            _ => Err(Error::InvalidEquationOfState("an adiabatic solver requires the gamma_law equation of state")),
        }
    }
}




/**
 * Pointwise sound-speed law, resolved from the equation of state before a
 * zone loop begins
 */
#[derive(Clone, Copy)]
pub(crate) enum SoundSpeedLaw<'a> {
    Uniform { sound_speed_squared: f64 },
    Keplerian { mach_number_squared: f64, masses: &'a [PointMass] },
}

impl SoundSpeedLaw<'_> {
    pub fn sound_speed_squared(&self, x: f64, y: f64) -> f64 {
        match self {
            SoundSpeedLaw::Uniform { sound_speed_squared } => {
                *sound_speed_squared
            }
            SoundSpeedLaw::Keplerian { mach_number_squared, masses } => {
                -gravitational_potential(masses, x, y) / mach_number_squared
            }
        }
    }
}
