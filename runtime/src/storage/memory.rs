use crate::{Error, Region};
use bytes::Bytes;
use futures::channel::oneshot;
use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex},
};
use tracing::trace;

/// When recording writes signal completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Completion {
    /// Completion is signaled before [crate::Store::record] returns.
    #[default]
    Immediate,
    /// Completion is held until [Store::complete_next] or [Store::complete_all].
    Deferred,
}

/// A fixed-capacity region.
struct Allocation {
    capacity: usize,
    content: Vec<u8>,
}

#[derive(Default)]
struct State {
    regions: BTreeMap<Region, Allocation>,
    channels: BTreeMap<u8, Vec<Bytes>>,
    completion: Completion,
    pending: VecDeque<oneshot::Sender<()>>,
}

/// In-memory bulk store.
///
/// Regions must be allocated before use and never grow past the size they
/// were allocated with. Recording channels are created on first use.
#[derive(Clone, Default)]
pub struct Store {
    state: Arc<Mutex<State>>,
}

impl Store {
    /// Creates an empty store with immediate completions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates `region` with exactly `content`'s length and fills it.
    pub fn allocate(&self, region: Region, content: impl Into<Vec<u8>>) {
        let content = content.into();
        let mut state = self.state.lock().unwrap();
        state.regions.insert(
            region,
            Allocation {
                capacity: content.len(),
                content,
            },
        );
    }

    /// Allocates `region` with `capacity` zeroed bytes.
    pub fn allocate_zeroed(&self, region: Region, capacity: usize) {
        self.allocate(region, vec![0u8; capacity]);
    }

    /// Removes `region`.
    pub fn deallocate(&self, region: Region) {
        self.state.lock().unwrap().regions.remove(&region);
    }

    /// Returns a copy of `region`'s content, if allocated.
    pub fn region(&self, region: Region) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.regions.get(&region).map(|a| a.content.clone())
    }

    /// Changes when future recording writes complete.
    pub fn set_completion(&self, completion: Completion) {
        self.state.lock().unwrap().completion = completion;
    }

    /// Signals the oldest outstanding recording write. Returns `false` if none was pending.
    pub fn complete_next(&self) -> bool {
        let sender = self.state.lock().unwrap().pending.pop_front();
        match sender {
            Some(sender) => {
                let _ = sender.send(());
                true
            }
            None => false,
        }
    }

    /// Signals every outstanding recording write.
    pub fn complete_all(&self) {
        while self.complete_next() {}
    }

    /// Returns the number of recording writes awaiting completion.
    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// Returns all records written to `channel`, oldest first.
    pub fn records(&self, channel: u8) -> Vec<Bytes> {
        let state = self.state.lock().unwrap();
        state.channels.get(&channel).cloned().unwrap_or_default()
    }
}

impl crate::Store for Store {
    fn read(&self, region: Region) -> Result<Bytes, Error> {
        let state = self.state.lock().unwrap();
        let allocation = state
            .regions
            .get(&region)
            .ok_or(Error::RegionMissing(region))?;
        Ok(Bytes::copy_from_slice(&allocation.content))
    }

    fn write(&self, region: Region, data: Bytes) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let allocation = state
            .regions
            .get_mut(&region)
            .ok_or(Error::RegionMissing(region))?;
        if data.len() > allocation.capacity {
            return Err(Error::RegionTooSmall {
                region,
                len: data.len(),
                capacity: allocation.capacity,
            });
        }
        allocation.content[..data.len()].copy_from_slice(&data);
        trace!(%region, len = data.len(), "wrote region");
        Ok(())
    }

    fn record(&self, channel: u8, data: Bytes) -> Result<oneshot::Receiver<()>, Error> {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.state.lock().unwrap();
        trace!(channel, len = data.len(), "recorded");
        state.channels.entry(channel).or_default().push(data);
        match state.completion {
            Completion::Immediate => {
                let _ = sender.send(());
            }
            Completion::Deferred => state.pending.push_back(sender),
        }
        Ok(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store as _;
    use commonware_macros::test_traced;

    #[test_traced]
    fn test_region_read_write() {
        let store = Store::new();
        store.allocate_zeroed(Region::Parameters, 8);
        store
            .write(Region::Parameters, Bytes::from_static(&[1, 2, 3]))
            .unwrap();
        let content = store.read(Region::Parameters).unwrap();
        assert_eq!(&content[..], &[1, 2, 3, 0, 0, 0, 0, 0]);
        assert_eq!(store.region(Region::Parameters), Some(content.to_vec()));

        store.deallocate(Region::Parameters);
        assert_eq!(store.region(Region::Parameters), None);
    }

    #[test_traced]
    fn test_region_missing() {
        let store = Store::new();
        assert_eq!(
            store.read(Region::Provenance),
            Err(Error::RegionMissing(Region::Provenance))
        );
        assert_eq!(
            store.write(Region::Provenance, Bytes::new()),
            Err(Error::RegionMissing(Region::Provenance))
        );
    }

    #[test_traced]
    fn test_region_too_small() {
        let store = Store::new();
        store.allocate_zeroed(Region::Parameters, 2);
        let result = store.write(Region::Parameters, Bytes::from_static(&[0; 3]));
        assert_eq!(
            result,
            Err(Error::RegionTooSmall {
                region: Region::Parameters,
                len: 3,
                capacity: 2
            })
        );
    }

    #[test_traced]
    fn test_record_immediate() {
        let store = Store::new();
        let mut done = store.record(0, Bytes::from_static(b"abc")).unwrap();
        assert_eq!(done.try_recv(), Ok(Some(())));
        assert_eq!(store.records(0), vec![Bytes::from_static(b"abc")]);
        assert!(store.records(1).is_empty());
    }

    #[test_traced]
    fn test_record_deferred() {
        let store = Store::new();
        store.set_completion(Completion::Deferred);
        let mut first = store.record(0, Bytes::from_static(b"a")).unwrap();
        let mut second = store.record(0, Bytes::from_static(b"b")).unwrap();
        assert_eq!(store.pending(), 2);
        assert_eq!(first.try_recv(), Ok(None));

        assert!(store.complete_next());
        assert_eq!(first.try_recv(), Ok(Some(())));
        assert_eq!(second.try_recv(), Ok(None));

        store.complete_all();
        assert_eq!(second.try_recv(), Ok(Some(())));
        assert!(!store.complete_next());
    }
}
