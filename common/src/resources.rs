use serde::{Deserialize, Serialize};

/// A resource that stores the tick (i.e: physics) time.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct Time(pub f64);

impl Time {
    pub fn add_seconds(self, seconds: f64) -> Self { Self(self.0 + seconds) }
}

/// A resource that stores the time since the previous physics tick.
#[derive(Copy, Clone, Debug, Default)]
pub struct DeltaTime(pub f32);

/// A resource that stores how far between the last two physics ticks the
/// current render frame lies, in `[0, 1)`.
#[derive(Copy, Clone, Debug, Default)]
pub struct TickAlpha(pub f32);

/// Number of physics ticks simulated so far.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickCount(pub u64);
