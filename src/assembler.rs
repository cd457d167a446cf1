//! Inbound block assembly.
//!
//! The assembler is always ready: it takes every byte the link offers,
//! whatever phase the controller is in. Each slot keeps a receive index that
//! saturates at [`BLOCK_SIZE`]; a saturated slot drops further bytes until it
//! is released after its last ciphertext byte has been accepted.
//!
//! With [`Buffering::Double`] a second slot absorbs the next block while the
//! combiner still owns the first, so bytes sent back to back are neither lost
//! nor written over plaintext that is still pending emission.

use crate::config::Buffering;
use crate::{Block, BLOCK_SIZE};
use tracing::warn;
use zeroize::Zeroize;

/// Index of a plaintext slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotId(usize);

/// Outcome of offering one inbound byte
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accept {
    Stored { slot: SlotId, index: usize },
    Dropped,
}

#[derive(Clone)]
struct Slot {
    bytes: Block,
    len: usize,
    owned: bool,
}

impl Slot {
    fn empty() -> Self {
        Self {
            bytes: [0u8; BLOCK_SIZE],
            len: 0,
            owned: false,
        }
    }

    fn is_free(&self) -> bool {
        self.len == 0 && !self.owned
    }

    fn is_full(&self) -> bool {
        self.len == BLOCK_SIZE
    }
}

/// Accumulates inbound bytes into 64-byte plaintext blocks
pub struct BlockAssembler {
    slots: Vec<Slot>,
    /// Slot receiving inbound bytes
    write: usize,
    /// Oldest slot not yet handed to the combiner
    read: usize,
    dropped: u64,
}

impl BlockAssembler {
    pub fn new(buffering: Buffering) -> Self {
        let count = match buffering {
            Buffering::Single => 1,
            Buffering::Double => 2,
        };
        Self {
            slots: vec![Slot::empty(); count],
            write: 0,
            read: 0,
            dropped: 0,
        }
    }

    pub fn buffering(&self) -> Buffering {
        if self.slots.len() == 1 {
            Buffering::Single
        } else {
            Buffering::Double
        }
    }

    /// Offers one inbound byte.
    pub fn accept(&mut self, byte: u8) -> Accept {
        if self.slots[self.write].is_full() {
            let next = (self.write + 1) % self.slots.len();
            if next != self.write && self.slots[next].is_free() {
                self.write = next;
            } else {
                self.dropped += 1;
                warn!(
                    dropped = self.dropped,
                    "Inbound byte dropped: receive window saturated"
                );
                return Accept::Dropped;
            }
        }

        let slot = &mut self.slots[self.write];
        let index = slot.len;
        slot.bytes[index] = byte;
        slot.len += 1;
        Accept::Stored {
            slot: SlotId(self.write),
            index,
        }
    }

    /// Receive index of the slot currently being filled.
    pub fn rx_index(&self) -> usize {
        self.slots[self.write].len
    }

    /// True when the oldest unclaimed slot holds a complete block.
    pub fn has_full_block(&self) -> bool {
        let slot = &self.slots[self.read];
        slot.is_full() && !slot.owned
    }

    /// Hands the oldest complete block to the combiner.
    pub fn claim(&mut self) -> Option<SlotId> {
        if !self.has_full_block() {
            return None;
        }
        self.slots[self.read].owned = true;
        Some(SlotId(self.read))
    }

    /// Returns a claimed block to the queue without consuming it.
    pub fn unclaim(&mut self, slot: SlotId) {
        self.slots[slot.0].owned = false;
    }

    pub fn plaintext(&self, slot: SlotId) -> &Block {
        &self.slots[slot.0].bytes
    }

    /// Clears a slot once its last ciphertext byte has been accepted.
    pub fn release(&mut self, slot: SlotId) {
        let s = &mut self.slots[slot.0];
        s.bytes.zeroize();
        s.len = 0;
        s.owned = false;
        if self.write != slot.0 && self.slots[self.write].is_full() {
            self.write = slot.0;
        }
        // Bytes in the other slot arrived after the released block, so that
        // slot is next in line. Otherwise the next block lands in `write`.
        let next = (slot.0 + 1) % self.slots.len();
        self.read = if next != slot.0 && self.slots[next].len > 0 {
            next
        } else {
            self.write
        };
    }

    /// Number of inbound bytes dropped since construction or the last reset.
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped
    }

    /// Clears all slots and indices.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.bytes.zeroize();
            slot.len = 0;
            slot.owned = false;
        }
        self.write = 0;
        self.read = 0;
        self.dropped = 0;
    }
}

impl Drop for BlockAssembler {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            slot.bytes.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(asm: &mut BlockAssembler, start: u8, count: usize) {
        for i in 0..count {
            asm.accept(start.wrapping_add(i as u8));
        }
    }

    #[test]
    fn single_slot_saturates_and_drops() {
        let mut asm = BlockAssembler::new(Buffering::Single);
        fill(&mut asm, 0, BLOCK_SIZE);
        assert_eq!(asm.rx_index(), BLOCK_SIZE);
        assert!(asm.has_full_block());

        assert_eq!(asm.accept(0xff), Accept::Dropped);
        assert_eq!(asm.dropped_bytes(), 1);
    }

    #[test]
    fn single_slot_drops_while_block_in_flight() {
        let mut asm = BlockAssembler::new(Buffering::Single);
        fill(&mut asm, 0, BLOCK_SIZE);
        let slot = asm.claim().unwrap();
        assert!(!asm.has_full_block());

        fill(&mut asm, 0xa0, 5);
        assert_eq!(asm.dropped_bytes(), 5);
        assert_eq!(asm.plaintext(slot)[0], 0);

        asm.release(slot);
        assert_eq!(asm.rx_index(), 0);
        assert_eq!(
            asm.accept(0x42),
            Accept::Stored {
                slot: SlotId(0),
                index: 0
            }
        );
    }

    #[test]
    fn double_buffer_absorbs_next_block_during_emission() {
        let mut asm = BlockAssembler::new(Buffering::Double);
        fill(&mut asm, 0, BLOCK_SIZE);
        let first = asm.claim().unwrap();

        fill(&mut asm, 0x80, BLOCK_SIZE);
        assert_eq!(asm.dropped_bytes(), 0);
        // Pending plaintext is untouched.
        assert_eq!(asm.plaintext(first)[0], 0);
        assert_eq!(asm.plaintext(first)[63], 63);

        // The second block only becomes claimable after the first is retired.
        assert!(!asm.has_full_block());
        asm.release(first);
        assert!(asm.has_full_block());
        let second = asm.claim().unwrap();
        assert_ne!(first, second);
        assert_eq!(asm.plaintext(second)[0], 0x80);
    }

    #[test]
    fn double_buffer_drops_third_block_while_both_slots_busy() {
        let mut asm = BlockAssembler::new(Buffering::Double);
        fill(&mut asm, 0, BLOCK_SIZE);
        asm.claim().unwrap();
        fill(&mut asm, 0, BLOCK_SIZE);
        assert_eq!(asm.accept(1), Accept::Dropped);
    }

    #[test]
    fn blocks_are_claimed_in_arrival_order() {
        let mut asm = BlockAssembler::new(Buffering::Double);
        fill(&mut asm, 0x10, BLOCK_SIZE);
        fill(&mut asm, 0x20, BLOCK_SIZE);

        let a = asm.claim().unwrap();
        assert_eq!(asm.plaintext(a)[0], 0x10);
        asm.release(a);
        let b = asm.claim().unwrap();
        assert_eq!(asm.plaintext(b)[0], 0x20);
        asm.release(b);

        fill(&mut asm, 0x30, BLOCK_SIZE);
        let c = asm.claim().unwrap();
        assert_eq!(asm.plaintext(c)[0], 0x30);
    }

    #[test]
    fn sequential_blocks_without_overlap_are_claimable() {
        for buffering in [Buffering::Single, Buffering::Double] {
            let mut asm = BlockAssembler::new(buffering);
            for start in [0x10u8, 0x20, 0x30] {
                fill(&mut asm, start, BLOCK_SIZE);
                assert!(asm.has_full_block(), "{buffering:?} block {start:#x}");
                let slot = asm.claim().unwrap();
                assert_eq!(asm.plaintext(slot)[0], start);
                assert_eq!(asm.plaintext(slot)[63], start.wrapping_add(63));
                asm.release(slot);
                assert!(!asm.has_full_block());
                assert_eq!(asm.rx_index(), 0);
            }
            assert_eq!(asm.dropped_bytes(), 0);
        }
    }

    #[test]
    fn partial_next_block_is_claimed_after_release() {
        let mut asm = BlockAssembler::new(Buffering::Double);
        fill(&mut asm, 0x10, BLOCK_SIZE);
        let first = asm.claim().unwrap();
        fill(&mut asm, 0x20, 10);
        asm.release(first);
        assert!(!asm.has_full_block());

        fill(&mut asm, 0x2a, BLOCK_SIZE - 10);
        let second = asm.claim().unwrap();
        assert_eq!(asm.plaintext(second)[0], 0x20);
        assert_eq!(asm.plaintext(second)[63], 0x5f);

        // Third block arrives while the second is in flight.
        fill(&mut asm, 0x40, BLOCK_SIZE);
        asm.release(second);
        let third = asm.claim().unwrap();
        assert_eq!(asm.plaintext(third)[0], 0x40);
        assert_eq!(asm.dropped_bytes(), 0);
    }

    #[test]
    fn unclaim_requeues_block() {
        let mut asm = BlockAssembler::new(Buffering::Double);
        fill(&mut asm, 0, BLOCK_SIZE);
        let slot = asm.claim().unwrap();
        asm.unclaim(slot);
        assert_eq!(asm.claim(), Some(slot));
    }

    #[test]
    fn reset_clears_everything() {
        let mut asm = BlockAssembler::new(Buffering::Double);
        fill(&mut asm, 0, BLOCK_SIZE + 10);
        asm.claim();
        asm.reset();
        assert_eq!(asm.rx_index(), 0);
        assert!(!asm.has_full_block());
        assert_eq!(asm.dropped_bytes(), 0);
    }
}
