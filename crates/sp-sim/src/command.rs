//! Step command with seeded noise.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sp_core::Real;
use sp_project::CommandDef;

/// Drive function for the command: `amplitude` once `t > step_time_s`,
/// plus uniform noise in `[-noise_amplitude, noise_amplitude]`.
///
/// The noise sequence depends only on the seed, so two runs of the same
/// scenario produce identical commands.
pub fn step_command(def: &CommandDef) -> impl FnMut(Real) -> Real + use<> {
    let step_time = def.step_time_s;
    let amplitude = def.amplitude;
    let noise = def.noise_amplitude;
    let mut rng = ChaCha8Rng::seed_from_u64(def.seed);

    move |t| {
        let level = if t > step_time { amplitude } else { 0.0 };
        if noise > 0.0 {
            level + rng.gen_range(-noise..=noise)
        } else {
            level
        }
    }
}
