pub mod indicate;
pub mod power_button;
pub mod supervise;

use embassy_time::Instant;

/// Milliseconds since boot, wrapping at `u32::MAX`
pub fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}
