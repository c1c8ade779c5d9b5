use crate::config::Config;
use crate::generation::client::GenerationClient;

/// Handler state. Holds no per-user data; interview history arrives with each request.
#[derive(Clone)]
pub struct AppState {
    /// Stateless and cheap to clone; every handler shares the same transport.
    pub generation: GenerationClient,
    pub config: Config,
}
