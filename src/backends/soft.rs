//! Portable ChaCha block function.
//!
//! Uses the original "djb" state layout: a 64-bit block counter in words 12
//! and 13 followed by a 64-bit nonce in words 14 and 15.

use crate::{core::ChaChaCore, ChaChaVariant, CONSTANTS, STATE_WORDS};
use cipher::{Block, BlockSizeUser, ParBlocksSizeUser, StreamBackend};

/// The software backend for the reference cipher.
pub struct Backend<'a, V: ChaChaVariant>(pub(crate) &'a mut ChaChaCore<V>);

impl<'a, V: ChaChaVariant> BlockSizeUser for Backend<'a, V> {
    type BlockSize = cipher::consts::U64;
}

impl<'a, V: ChaChaVariant> ParBlocksSizeUser for Backend<'a, V> {
    type ParBlocksSize = cipher::consts::U1;
}

impl<'a, V: ChaChaVariant> StreamBackend for Backend<'a, V> {
    #[inline(always)]
    fn gen_ks_block(&mut self, block: &mut Block<Self>) {
        let res = run_rounds(&self.0.state, V::ROUNDS);
        let next = counter(&self.0.state).wrapping_add(1);
        set_counter(&mut self.0.state, next);

        for (chunk, val) in block.chunks_exact_mut(4).zip(res.iter()) {
            chunk.copy_from_slice(&val.to_le_bytes());
        }
    }
}

/// Builds the initial state for `key` and `nonce` with a zero counter.
pub(crate) fn init_state(key: &[u8; 32], nonce: &[u8; 8]) -> [u32; STATE_WORDS] {
    let mut state = [0u32; STATE_WORDS];
    state[..4].copy_from_slice(&CONSTANTS);

    for (val, chunk) in state[4..12].iter_mut().zip(key.chunks_exact(4)) {
        *val = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    for (val, chunk) in state[14..16].iter_mut().zip(nonce.chunks_exact(4)) {
        *val = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    state
}

#[inline(always)]
pub(crate) fn counter(state: &[u32; STATE_WORDS]) -> u64 {
    u64::from(state[12]) | (u64::from(state[13]) << 32)
}

#[inline(always)]
pub(crate) fn set_counter(state: &mut [u32; STATE_WORDS], counter: u64) {
    state[12] = counter as u32;
    state[13] = (counter >> 32) as u32;
}

/// Runs `rounds` ChaCha rounds (two per iteration) and adds the input state.
///
/// `rounds` must be even; an odd count drops the trailing half round.
#[inline(always)]
pub(crate) fn run_rounds(state: &[u32; STATE_WORDS], rounds: u8) -> [u32; STATE_WORDS] {
    let mut res = *state;

    for _ in 0..rounds / 2 {
        // column rounds
        quarter_round(0, 4, 8, 12, &mut res);
        quarter_round(1, 5, 9, 13, &mut res);
        quarter_round(2, 6, 10, 14, &mut res);
        quarter_round(3, 7, 11, 15, &mut res);

        // diagonal rounds
        quarter_round(0, 5, 10, 15, &mut res);
        quarter_round(1, 6, 11, 12, &mut res);
        quarter_round(2, 7, 8, 13, &mut res);
        quarter_round(3, 4, 9, 14, &mut res);
    }

    for (s1, s0) in res.iter_mut().zip(state.iter()) {
        *s1 = s1.wrapping_add(*s0);
    }
    res
}

/// Serializes one keystream block for `counter` in wire order.
pub(crate) fn keystream_block(
    key: &[u8; 32],
    nonce: &[u8; 8],
    counter: u64,
    rounds: u8,
) -> [u8; 64] {
    let mut state = init_state(key, nonce);
    set_counter(&mut state, counter);
    let res = run_rounds(&state, rounds);

    let mut out = [0u8; 64];
    for (chunk, val) in out.chunks_exact_mut(4).zip(res.iter()) {
        chunk.copy_from_slice(&val.to_le_bytes());
    }
    out
}

/// The ChaCha quarter round function
#[inline(always)]
fn quarter_round(a: usize, b: usize, c: usize, d: usize, state: &mut [u32; STATE_WORDS]) {
    state[a] = state[a].wrapping_add(state[b]);
    state[d] ^= state[a];
    state[d] = state[d].rotate_left(16);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] ^= state[c];
    state[b] = state[b].rotate_left(12);

    state[a] = state[a].wrapping_add(state[b]);
    state[d] ^= state[a];
    state[d] = state[d].rotate_left(8);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] ^= state[c];
    state[b] = state[b].rotate_left(7);
}
