pub mod config;
pub mod error;

/// User-Agent sent on every outbound request — probes, cookie validation and
/// listing-site fetches alike. Some listing sites serve an empty table to
/// clients without a browser UA.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Uniform pick from a slice of stored members.
pub(crate) fn pick_uniform(members: &[String]) -> Option<String> {
    use rand::prelude::*;
    if members.is_empty() {
        return None;
    }
    let mut rng = rand::rng();
    members.get(rng.random_range(0..members.len())).cloned()
}
