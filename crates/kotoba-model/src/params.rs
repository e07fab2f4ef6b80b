#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl GenerationParams {
    /// Minimal params for reachability and permission probes.
    pub fn probe() -> Self {
        Self {
            max_output_tokens: 16,
            temperature: 0.0,
        }
    }
}
