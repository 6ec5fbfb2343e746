/// Environment hooks for the textual IR backend.
pub trait Env {
    /// Whether `name` may be emitted as an externally visible symbol.
    fn is_exportable_name(name: &str) -> bool {
        !name.is_empty()
    }
}

/// The default environment, which accepts every name.
pub struct Generic;

impl Env for Generic {}
