//! Per-tick recording of which sources fired.
//!
//! The buffer is `n_allocated` bitmaps of `word_count` words each. Bitmap `k`
//! marks the sources that fired at least `k + 1` times this tick, so the
//! number of bitmaps in use is the largest event count of the tick. Each
//! flushed record is:
//!
//! ```txt
//! time: u32 | n_used: u32 | bitmaps: u32[n_used * word_count]
//! ```
//!
//! Capacity only grows. At most one write is outstanding at a time: a flush
//! first waits for the previous write to complete.

use crate::Error;
use bytes::{Buf, BufMut, BytesMut};
use futures::channel::oneshot;
use neurocore_codec::{util::at_least, Read, ReadExt, Write};
use neurocore_runtime::Store;
use tracing::{debug, error};

/// Bits per bitmap word.
const WORD_BITS: usize = 32;

/// Number of words needed for one bit per source.
pub fn word_count(n_sources: usize) -> usize {
    n_sources.div_ceil(WORD_BITS)
}

/// Growable event bitmaps and the handshake with the store.
pub struct Recording {
    channel: u8,
    word_count: usize,
    n_allocated: usize,
    n_used: usize,
    bits: Vec<u32>,
    pending: Option<oneshot::Receiver<()>>,
}

impl Recording {
    /// Creates an empty buffer (no sub-buffers allocated) for `n_sources`.
    pub fn new(channel: u8, n_sources: usize) -> Self {
        Self {
            channel,
            word_count: word_count(n_sources),
            n_allocated: 0,
            n_used: 0,
            bits: Vec::new(),
            pending: None,
        }
    }

    /// Number of sub-buffers allocated.
    pub fn allocated(&self) -> usize {
        self.n_allocated
    }

    /// Number of sub-buffers holding events this tick.
    pub fn used(&self) -> usize {
        self.n_used
    }

    /// Returns `true` if sub-buffer `k` marks `index`.
    pub fn is_set(&self, k: usize, index: usize) -> bool {
        if k >= self.n_allocated {
            return false;
        }
        let word = self.bits[k * self.word_count + index / WORD_BITS];
        word & (1 << (index % WORD_BITS)) != 0
    }

    /// Grows capacity to at least `n` sub-buffers, keeping all marked bits.
    pub fn grow(&mut self, n: usize) -> Result<(), Error> {
        if n <= self.n_allocated {
            return Ok(());
        }
        let len = n
            .checked_mul(self.word_count)
            .ok_or(Error::AllocationFailed(n))?;
        if let Err(err) = self.bits.try_reserve_exact(len - self.bits.len()) {
            error!(?err, n, "failed to grow recording buffer");
            return Err(Error::AllocationFailed(n));
        }
        self.bits.resize(len, 0);
        debug!(from = self.n_allocated, to = n, "grew recording buffer");
        self.n_allocated = n;
        Ok(())
    }

    /// Marks that source `index` fired `count` times this tick.
    pub fn mark(&mut self, index: usize, count: u32) -> Result<(), Error> {
        let count = count as usize;
        if count == 0 {
            return Ok(());
        }
        self.grow(count)?;
        let word = index / WORD_BITS;
        let bit = 1 << (index % WORD_BITS);
        for k in 0..count {
            self.bits[k * self.word_count + word] |= bit;
        }
        self.n_used = self.n_used.max(count);
        Ok(())
    }

    /// Waits for the outstanding write (if any) to complete.
    pub async fn wait(&mut self) -> Result<(), Error> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(());
        };
        let result = pending.await;
        self.pending = None;
        if result.is_err() {
            error!(channel = self.channel, "recording write dropped");
            return Err(Error::RecordingFailed(self.channel));
        }
        Ok(())
    }

    /// Writes the marked bitmaps for `time` and clears them.
    ///
    /// Returns `false` without writing if nothing was marked.
    pub async fn flush<S: Store>(&mut self, store: &S, time: u32) -> Result<bool, Error> {
        if self.n_used == 0 {
            return Ok(false);
        }
        self.wait().await?;

        let used = self.n_used * self.word_count;
        let mut record = BytesMut::with_capacity(8 + used * 4);
        time.write(&mut record);
        (self.n_used as u32).write(&mut record);
        for word in &self.bits[..used] {
            word.write(&mut record);
        }
        self.pending = Some(store.record(self.channel, record.freeze())?);

        self.bits[..used].fill(0);
        self.n_used = 0;
        Ok(true)
    }

    /// Clears all marks, keeping capacity.
    pub fn reset(&mut self) {
        self.bits.fill(0);
        self.n_used = 0;
    }
}

/// A decoded recording record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Tick the record describes.
    pub time: u32,
    /// One bitmap of `word_count` words per sub-buffer in use.
    pub bitmaps: Vec<Vec<u32>>,
}

impl Record {
    /// Returns how many times source `index` fired.
    pub fn events(&self, index: usize) -> u32 {
        let word = index / WORD_BITS;
        let bit: u32 = 1 << (index % WORD_BITS);
        self.bitmaps
            .iter()
            .take_while(|bitmap| bitmap.get(word).is_some_and(|w| w & bit != 0))
            .count() as u32
    }
}

impl Read for Record {
    /// Number of sources recorded.
    type Cfg = usize;

    fn read_cfg(buf: &mut impl Buf, n_sources: &usize) -> Result<Self, neurocore_codec::Error> {
        let time = u32::read(buf)?;
        let n_used = u32::read(buf)? as usize;
        let words = word_count(*n_sources);
        let len = n_used
            .checked_mul(words * 4)
            .ok_or(neurocore_codec::Error::InvalidLength(n_used))?;
        at_least(buf, len)?;
        let bitmaps = (0..n_used)
            .map(|_| (0..words).map(|_| u32::read(buf)).collect::<Result<Vec<_>, _>>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { time, bitmaps })
    }
}
