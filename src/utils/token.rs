use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub const ACCESS_TOKEN_LENGTH: usize = 32;

/// Random alphanumeric secret handed to a candidate when an attempt starts.
pub fn generate_access_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ACCESS_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
