use rand::{distributions::Alphanumeric, Rng};

/// Length of the opaque bearer tokens handed to clients.
pub const TOKEN_LENGTH: usize = 48;

/// Mints a fresh opaque bearer token. The token itself carries no meaning;
/// the binding to a user lives only in the access_tokens table.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
