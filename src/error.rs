// ============================================================================
#[derive(thiserror::Error, Debug)]
pub enum Error {

    #[error("pressure root finder failed to converge at x = {position:.8e} (residual = {residual:.3e})")]
    RootFinderFailed { position: f64, residual: f64 },

    #[error("unphysical conserved state at x = {position:.8e}: {reason}")]
    UnphysicalState { position: f64, reason: &'static str },

    #[error("{0}")]
    InvalidEquationOfState(&'static str),

    #[error("the {name} buffer does not span the index space required by this mesh")]
    InvalidPatchLayout { name: &'static str },

    #[error("gpu execution mode is not available in this build")]
    GpuModeUnavailable,
}
