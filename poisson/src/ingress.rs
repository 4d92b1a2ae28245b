use crate::{Error, RunLength, Step};
use bytes::Bytes;
use futures::{
    channel::{mpsc, oneshot},
    SinkExt,
};

/// Rate update carried by a multicast packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Multicast {
    pub key: u32,
    pub payload: u32,
}

/// Timer and lifecycle messages, handled after any pending rate update.
pub enum Message {
    /// Run one tick.
    Tick { responder: oneshot::Sender<Step> },
    /// Continue a paused run with a new run length.
    Resume {
        run_length: RunLength,
        responder: oneshot::Sender<()>,
    },
}

/// Ingress mailbox for [Driver](super::Driver).
#[derive(Clone)]
pub struct Mailbox {
    multicast: mpsc::Sender<Multicast>,
    batch: mpsc::Sender<Bytes>,
    control: mpsc::Sender<Message>,
}

impl Mailbox {
    pub(super) fn new(
        multicast: mpsc::Sender<Multicast>,
        batch: mpsc::Sender<Bytes>,
        control: mpsc::Sender<Message>,
    ) -> Self {
        Self {
            multicast,
            batch,
            control,
        }
    }

    /// Deliver a multicast rate update.
    pub async fn multicast(&mut self, key: u32, payload: u32) -> Result<(), Error> {
        self.multicast
            .send(Multicast { key, payload })
            .await
            .map_err(|_| Error::Closed)
    }

    /// Deliver a batch of rate updates.
    pub async fn batch(&mut self, payload: Bytes) -> Result<(), Error> {
        self.batch.send(payload).await.map_err(|_| Error::Closed)
    }

    /// Request one tick.
    ///
    /// The receiver resolves with the outcome, or is canceled if the driver halts.
    pub async fn tick(&mut self) -> Result<oneshot::Receiver<Step>, Error> {
        let (responder, receiver) = oneshot::channel();
        self.control
            .send(Message::Tick { responder })
            .await
            .map_err(|_| Error::Closed)?;
        Ok(receiver)
    }

    /// Request a resume after the engine suspended.
    pub async fn resume(&mut self, run_length: RunLength) -> Result<oneshot::Receiver<()>, Error> {
        let (responder, receiver) = oneshot::channel();
        self.control
            .send(Message::Resume {
                run_length,
                responder,
            })
            .await
            .map_err(|_| Error::Closed)?;
        Ok(receiver)
    }
}
