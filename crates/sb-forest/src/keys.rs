use sb_core::ScriptKey;

/// Keys are drawn from `[0, KEY_SPACE)`.
pub const KEY_SPACE: u32 = 99_999_999;
/// Draws attempted before allocation gives up.
pub const MAX_KEY_DRAWS: usize = 4096;

/// Largest multiple of `KEY_SPACE` that fits in a `u32` draw; anything at or above it
/// is redrawn so every key is equally likely.
const ACCEPT_BELOW: u64 = (u32::MAX as u64 + 1) / KEY_SPACE as u64 * KEY_SPACE as u64;

/// Seeded source of candidate script keys. The same seed yields the same sequence.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    state: u32,
}

impl KeyGenerator {
    pub fn new(seed: u32) -> Self {
        // xorshift is stuck at zero
        let state = if seed == 0 { 0x9e37_79b9 } else { seed };
        Self { state }
    }

    /// Next candidate key. Callers check it against the keys in use.
    pub fn draw(&mut self) -> ScriptKey {
        self.draw_with(Self::step)
    }

    fn draw_with<F>(&mut self, mut step: F) -> ScriptKey
    where
        F: FnMut(&mut Self) -> u32,
    {
        loop {
            let raw = step(self);
            if u64::from(raw) < ACCEPT_BELOW {
                return ScriptKey((raw % KEY_SPACE) as i32);
            }
        }
    }

    fn step(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}
