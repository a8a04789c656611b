use std::sync::Mutex;

use rand::Rng;

/// Alphabet in ASCII order, so generated keys sort by creation time.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 12;

/// Generates 20-character child keys: 8 characters of millisecond timestamp
/// followed by 12 random characters. Keys generated within the same
/// millisecond increment the random part, and a clock that steps backwards is
/// held at the last seen time, so keys are strictly increasing per process.
pub struct PushIdGenerator {
    state: Mutex<State>,
}

struct State {
    last_ms: i64,
    last_rand: [u8; RANDOM_LEN],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                last_ms: i64::MIN,
                last_rand: [0; RANDOM_LEN],
            }),
        }
    }

    pub fn next(&self, now_ms: i64) -> String {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let now_ms = now_ms.max(state.last_ms);
        if now_ms == state.last_ms {
            increment(&mut state.last_rand);
        } else {
            state.last_ms = now_ms;
            let mut rng = rand::rng();
            for digit in state.last_rand.iter_mut() {
                *digit = rng.random_range(0..64);
            }
        }

        let mut id = String::with_capacity(8 + RANDOM_LEN);
        let mut ts = now_ms.max(0) as u64;
        let mut ts_chars = [0u8; 8];
        for slot in ts_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(ts % 64) as usize];
            ts /= 64;
        }
        id.extend(ts_chars.iter().map(|&c| c as char));
        id.extend(state.last_rand.iter().map(|&d| PUSH_CHARS[d as usize] as char));
        id
    }
}

impl Default for PushIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn increment(digits: &mut [u8; RANDOM_LEN]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
