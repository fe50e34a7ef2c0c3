use serde::{Serialize, Deserialize};
use crate::error::Error;




/**
 * Enum for the strategy used to dispatch a kernel over a patch
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {

    /// Single iteration over the index space
    CPU,

    /// The outer loop is data-parallel over worker threads
    OMP,

    /// One thread per zone on an accelerator device
    GPU,
}




// ============================================================================
/**
 * Apply a fallible kernel to equal-sized chunks of a mutable buffer, either
 * serially or in parallel. Chunks are disjoint by construction, so the
 * parallel arm needs no synchronization.
 */
pub(crate) fn try_for_each_chunk_mut<F>(
    data: &mut [f64],
    chunk_len: usize,
    mode: ExecutionMode,
    f: F) -> Result<(), Error>
where
    F: Fn(usize, &mut [f64]) -> Result<(), Error> + Send + Sync,
{
    match mode {
        ExecutionMode::CPU => {
            for (n, chunk) in data.chunks_mut(chunk_len).enumerate() {
                f(n, chunk)?
            }
            Ok(())
        }
        ExecutionMode::OMP => {
            use rayon::prelude::*;
            data.par_chunks_mut(chunk_len)
                .enumerate()
                .try_for_each(|(n, chunk)| f(n, chunk))
        }
        ExecutionMode::GPU => {
            Err(Error::GpuModeUnavailable)
        }
    }
}
