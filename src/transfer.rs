//! Packet hand-off between the producer and consumer contexts
//!
//! One ordered channel per section is the whole transfer protocol: the
//! producer extracts packets and sends them by value, the consumer drains
//! them in order into its proxy. Nothing here blocks, awaits or times out,
//! and no shared mutable state crosses the boundary - the commands own every
//! byte they carry.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::packet::{CreationPacket, PropertyPacket, UpdatePacket};
use crate::proxy::SectionProxy;

/// One packet in flight, owned end to end
#[derive(Debug, Clone)]
pub enum SectionCommand {
    Create(CreationPacket),
    Update(UpdatePacket),
    UpdateProperties(PropertyPacket),
}

/// Producer-side handle of a section's channel
#[derive(Debug, Clone)]
pub struct SectionCommandSender {
    sender: Sender<SectionCommand>,
}

impl SectionCommandSender {
    /// Queue a command for the consumer context
    ///
    /// Returns `false` when the consumer side has been dropped, in which case
    /// the command is discarded.
    pub fn send(&self, command: SectionCommand) -> bool {
        self.sender.send(command).is_ok()
    }
}

/// Consumer-side handle of a section's channel
#[derive(Debug)]
pub struct SectionCommandReceiver {
    receiver: Receiver<SectionCommand>,
}

impl SectionCommandReceiver {
    /// Take the next pending command without blocking
    pub fn try_recv(&self) -> Option<SectionCommand> {
        match self.receiver.try_recv() {
            Ok(command) => Some(command),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Apply every pending command to `proxy` in the order it was produced
    ///
    /// Returns the number of commands applied. A `Create` command replaces the
    /// proxy wholesale (the one legal way a LOD slot moves backward).
    pub fn drain(&self, proxy: &mut SectionProxy) -> usize {
        let mut applied = 0;
        while let Some(command) = self.try_recv() {
            proxy.apply(command);
            applied += 1;
        }
        applied
    }
}

/// Build the ordered one-way channel for a single section
pub fn section_channel() -> (SectionCommandSender, SectionCommandReceiver) {
    let (sender, receiver) = unbounded();
    (
        SectionCommandSender { sender },
        SectionCommandReceiver { receiver },
    )
}

impl SectionProxy {
    /// Dispatch one command to the matching ingestion path
    pub fn apply(&mut self, command: SectionCommand) {
        match command {
            SectionCommand::Create(packet) => {
                *self = SectionProxy::new(self.feature_level(), packet);
            }
            SectionCommand::Update(packet) => self.apply_update(packet),
            SectionCommand::UpdateProperties(packet) => self.apply_properties(packet),
        }
    }
}
