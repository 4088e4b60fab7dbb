use core::time::Duration;

/// Per-call override of the configured request timeout.
///
/// - `Inherit`: keep the client's timeout.
/// - `Set(d)`: use `d` for this call only.
///
/// There is no way to clear the deadline: every dispatch stays bounded.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum TimeoutOverride {
    #[default]
    Inherit,
    Set(Duration),
}

impl TimeoutOverride {
    #[inline]
    pub fn resolve(self, inherited: Duration) -> Duration {
        match self {
            TimeoutOverride::Inherit => inherited,
            TimeoutOverride::Set(d) => d,
        }
    }
}
