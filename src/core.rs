use crate::{backends, ChaChaVariant, STATE_WORDS};
use cipher::{
    BlockSizeUser, Iv, IvSizeUser, Key, KeyIvInit, KeySizeUser, StreamCipherCore,
    StreamCipherSeekCore, StreamClosure,
};
use core::marker::PhantomData;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The core state for the reference ChaCha cipher.
pub struct ChaChaCore<V: ChaChaVariant> {
    /// Internal state of the core function; words 12 and 13 hold the block counter
    pub(crate) state: [u32; STATE_WORDS],
    /// PhantomData to tie the struct to the ChaChaVariant
    pub(crate) _variant: PhantomData<V>,
}

impl<V: ChaChaVariant> KeySizeUser for ChaChaCore<V> {
    type KeySize = cipher::consts::U32;
}

impl<V: ChaChaVariant> IvSizeUser for ChaChaCore<V> {
    type IvSize = cipher::consts::U8;
}

impl<V: ChaChaVariant> BlockSizeUser for ChaChaCore<V> {
    type BlockSize = cipher::consts::U64; // 512-bit blocks
}

impl<V: ChaChaVariant> KeyIvInit for ChaChaCore<V> {
    fn new(key: &Key<Self>, iv: &Iv<Self>) -> Self {
        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(key);
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(iv);

        let state = backends::soft::init_state(&key_bytes, &nonce);
        key_bytes.zeroize();

        Self {
            state,
            _variant: PhantomData,
        }
    }
}

impl<V: ChaChaVariant> StreamCipherCore for ChaChaCore<V> {
    fn process_with_backend(&mut self, f: impl StreamClosure<BlockSize = Self::BlockSize>) {
        f.call(&mut backends::soft::Backend(self));
    }

    // The 64-bit counter wraps like the hardware register it models.
    fn remaining_blocks(&self) -> Option<usize> {
        None
    }
}

impl<V: ChaChaVariant> StreamCipherSeekCore for ChaChaCore<V> {
    type Counter = u64;

    fn get_block_pos(&self) -> Self::Counter {
        backends::soft::counter(&self.state)
    }

    fn set_block_pos(&mut self, pos: Self::Counter) {
        backends::soft::set_counter(&mut self.state, pos);
    }
}

impl<V: ChaChaVariant> Drop for ChaChaCore<V> {
    fn drop(&mut self) {
        self.state.zeroize();
    }
}

impl<V: ChaChaVariant> ZeroizeOnDrop for ChaChaCore<V> {}
