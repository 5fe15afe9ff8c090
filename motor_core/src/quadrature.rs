//! Lock-free quadrature decoder.
//!
//! State is one `AtomicI64` word: bits 2.. hold the signed position, bits 0..2
//! hold the last sampled (A, B) levels (A = bit 0, B = bit 1). Edge handlers on
//! the notification thread and readers on the control thread only ever touch
//! the word through compare-and-swap, so a transition is never half-applied.
//!
//! Two bits go to the phase, so positions are limited to
//! `MIN_POSITION..=MAX_POSITION` (62-bit signed); writes and edges saturate there.

use std::sync::atomic::{AtomicI64, Ordering};

use motor_traits::Channel;

const PHASE_MASK: i64 = 0b11;

/// Largest position the decoder can hold.
pub const MAX_POSITION: i64 = i64::MAX >> 2;
/// Smallest position the decoder can hold.
pub const MIN_POSITION: i64 = i64::MIN >> 2;

/// Position delta for a 4-bit transition code `prev_a | prev_b << 1 | a << 2 | b << 3`.
///
/// Codes 3, 12 and 6, 9 are both channels flipping at once, counted as two
/// steps. Codes 0, 5, 10, 15 (no change) never move the position.
#[inline]
pub const fn transition_delta(code: u8) -> i64 {
    match code & 0x0f {
        1 | 7 | 8 | 14 => 1,
        2 | 4 | 11 | 13 => -1,
        3 | 12 => 2,
        6 | 9 => -2,
        _ => 0,
    }
}

#[inline]
const fn levels_to_bits(a: bool, b: bool) -> i64 {
    (a as i64) | ((b as i64) << 1)
}

#[inline]
const fn pack(position: i64, phase: i64) -> i64 {
    let position = if position > MAX_POSITION {
        MAX_POSITION
    } else if position < MIN_POSITION {
        MIN_POSITION
    } else {
        position
    };
    (position << 2) | (phase & PHASE_MASK)
}

/// Position counter fed by quadrature edges, saturating at
/// `MIN_POSITION` / `MAX_POSITION`.
#[derive(Debug, Default)]
pub struct QuadratureDecoder {
    word: AtomicI64,
}

impl QuadratureDecoder {
    /// Decoder at position 0 with the given initial (A, B) levels.
    pub fn new(a: bool, b: bool) -> Self {
        Self {
            word: AtomicI64::new(pack(0, levels_to_bits(a, b))),
        }
    }

    /// Current position in ticks.
    #[inline]
    pub fn read(&self) -> i64 {
        self.word.load(Ordering::Acquire) >> 2
    }

    /// Overwrite the position, keeping the phase history. Out-of-range values saturate.
    pub fn write(&self, position: i64) {
        let mut cur = self.word.load(Ordering::Acquire);
        loop {
            let next = pack(position, cur);
            match self
                .word
                .compare_exchange_weak(cur, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Last sampled levels as two bits (A = bit 0, B = bit 1).
    #[inline]
    pub fn phase(&self) -> u8 {
        (self.word.load(Ordering::Acquire) & PHASE_MASK) as u8
    }

    /// Edge on either channel with both levels sampled. Returns the applied delta.
    pub fn on_edge(&self, a: bool, b: bool) -> i64 {
        let current = levels_to_bits(a, b);
        self.apply(|_| current)
    }

    /// Edge on one channel; the other channel keeps its last known level.
    pub fn on_channel_edge(&self, channel: Channel, level: bool) -> i64 {
        self.apply(|prev| {
            let bit = match channel {
                Channel::A => 0b01,
                Channel::B => 0b10,
            };
            if level { prev | bit } else { prev & !bit }
        })
    }

    fn apply(&self, current_from_prev: impl Fn(i64) -> i64) -> i64 {
        let mut cur = self.word.load(Ordering::Acquire);
        loop {
            let prev = cur & PHASE_MASK;
            let now = current_from_prev(prev) & PHASE_MASK;
            let code = (prev | (now << 2)) as u8;
            let delta = transition_delta(code);
            let next = pack((cur >> 2).saturating_add(delta), now);
            match self
                .word
                .compare_exchange_weak(cur, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return delta,
                Err(actual) => cur = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_known_codes() {
        let forward: i64 = [1u8, 7, 8, 14].iter().map(|&c| transition_delta(c)).sum();
        assert_eq!(forward, 4);
        let reverse: i64 = [2u8, 4, 11, 13].iter().map(|&c| transition_delta(c)).sum();
        assert_eq!(reverse, -4);
        assert_eq!(transition_delta(3), 2);
        assert_eq!(transition_delta(12), 2);
        assert_eq!(transition_delta(6), -2);
        assert_eq!(transition_delta(9), -2);
        for idle in [0u8, 5, 10, 15] {
            assert_eq!(transition_delta(idle), 0);
        }
    }

    #[test]
    fn write_keeps_phase_bits() {
        let d = QuadratureDecoder::new(true, false);
        d.write(-1234);
        assert_eq!(d.read(), -1234);
        assert_eq!(d.phase(), 0b01);
        // Next edge decodes against the preserved phase: 01 -> 00 is code 1.
        assert_eq!(d.on_edge(false, false), 1);
        assert_eq!(d.read(), -1233);
    }

    #[test]
    fn channel_edge_uses_stored_level_of_other_channel() {
        let d = QuadratureDecoder::new(false, false);
        assert_eq!(d.on_channel_edge(Channel::B, true), 1); // code 8
        assert_eq!(d.on_channel_edge(Channel::A, true), 1); // code 14
        assert_eq!(d.phase(), 0b11);
        assert_eq!(d.read(), 2);
    }

    #[test]
    fn negative_positions_survive_packing() {
        let d = QuadratureDecoder::new(false, false);
        d.write(i64::MIN >> 2);
        assert_eq!(d.read(), i64::MIN >> 2);
        d.write(-1);
        d.on_edge(true, false); // code 4
        assert_eq!(d.read(), -2);
    }

    #[test]
    fn out_of_range_writes_saturate() {
        let d = QuadratureDecoder::new(true, true);
        d.write(1 << 62);
        assert_eq!(d.read(), MAX_POSITION);
        d.write(i64::MAX);
        assert_eq!(d.read(), MAX_POSITION);
        assert_eq!(d.phase(), 0b11);
        d.write(i64::MIN);
        assert_eq!(d.read(), MIN_POSITION);
    }

    #[test]
    fn edges_saturate_at_the_limits() {
        let d = QuadratureDecoder::new(false, false);
        d.write(MAX_POSITION);
        d.on_edge(false, true); // code 8, forward
        assert_eq!(d.read(), MAX_POSITION);
        d.on_edge(true, false); // code 6, two steps back
        assert_eq!(d.read(), MAX_POSITION - 2);
        d.write(MIN_POSITION);
        d.on_edge(true, true); // 01 -> 11 is code 13, back
        assert_eq!(d.read(), MIN_POSITION);
    }
}
