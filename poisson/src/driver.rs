//! Event loop serving an [Engine] from a [Mailbox].
//!
//! Pending messages are handled in a fixed priority order: multicast rate
//! updates, then batched rate updates, then ticks and lifecycle requests. A
//! tick therefore always observes every rate update delivered before it was
//! handled. The outstanding recording write needs no event of its own: the
//! next flush awaits it.

use crate::{
    ingress::{Mailbox, Message, Multicast},
    Engine, Error, State, Step,
};
use bytes::Bytes;
use commonware_macros::select;
use futures::{channel::mpsc, StreamExt};
use neurocore_runtime::{Clock, Fabric, Store};
use tracing::{debug, trace, warn};

/// Drives an [Engine] until its [Mailbox] is dropped or a fatal error occurs.
pub struct Driver<C: Clock, S: Store, F: Fabric> {
    engine: Engine<C, S, F>,

    multicast: mpsc::Receiver<Multicast>,
    batch: mpsc::Receiver<Bytes>,
    control: mpsc::Receiver<Message>,
}

impl<C: Clock, S: Store, F: Fabric> Driver<C, S, F> {
    /// Creates a new driver for `engine`.
    /// Returns the driver and a mailbox for sending messages to it.
    pub fn new(engine: Engine<C, S, F>, mailbox_size: usize) -> (Self, Mailbox) {
        let (multicast_sender, multicast) = mpsc::channel(mailbox_size);
        let (batch_sender, batch) = mpsc::channel(mailbox_size);
        let (control_sender, control) = mpsc::channel(mailbox_size);
        let mailbox = Mailbox::new(multicast_sender, batch_sender, control_sender);
        (
            Self {
                engine,
                multicast,
                batch,
                control,
            },
            mailbox,
        )
    }

    /// Runs until every [Mailbox] is dropped, returning the engine.
    ///
    /// A fatal engine error stops the loop and is returned; outstanding
    /// requests are canceled.
    pub async fn run(mut self) -> Result<Engine<C, S, F>, Error> {
        loop {
            select! {
                update = self.multicast.next() => {
                    let Some(update) = update else {
                        break;
                    };
                    self.handle_multicast(update);
                },
                payload = self.batch.next() => {
                    let Some(payload) = payload else {
                        break;
                    };
                    self.handle_batch(payload);
                },
                message = self.control.next() => {
                    let Some(message) = message else {
                        break;
                    };
                    self.handle_control(message).await?;
                },
            }
        }

        // All senders are dropped together, so drain whatever is left in order
        loop {
            if let Ok(Some(update)) = self.multicast.try_next() {
                self.handle_multicast(update);
            } else if let Ok(Some(payload)) = self.batch.try_next() {
                self.handle_batch(payload);
            } else if let Ok(Some(message)) = self.control.try_next() {
                self.handle_control(message).await?;
            } else {
                break;
            }
        }
        debug!(time = self.engine.time(), "mailbox closed");
        Ok(self.engine)
    }

    fn handle_multicast(&mut self, Multicast { key, payload }: Multicast) {
        trace!(key, payload, "mailbox: multicast");
        self.engine.multicast(key, payload);
    }

    fn handle_batch(&mut self, payload: Bytes) {
        trace!(len = payload.len(), "mailbox: batch");
        self.engine.batch(payload);
    }

    async fn handle_control(&mut self, message: Message) -> Result<(), Error> {
        match message {
            Message::Tick { responder } => {
                let step = if self.engine.state() == State::Paused {
                    trace!("dropping tick while paused");
                    Step::Idle
                } else {
                    self.engine.tick().await?
                };
                let _ = responder.send(step);
            }
            Message::Resume {
                run_length,
                responder,
            } => match self.engine.resume(run_length) {
                Ok(()) => {
                    let _ = responder.send(());
                }
                Err(Error::NotPaused) => {
                    warn!("ignoring resume while not paused");
                }
                Err(err) => return Err(err),
            },
        }
        Ok(())
    }
}
