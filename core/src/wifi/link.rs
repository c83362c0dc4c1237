use super::{
    buffers::RX_HEADER_HALFWORDS,
    irqs::Irq,
    regs::{Reg, TxRequests},
    WiFi,
};
use crate::host::Host;
#[cfg(feature = "log")]
use crossbeam_channel::TrySendError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PeerId(pub u32);

impl PeerId {
    fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        PeerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectError {
    SelfConnection,
    AlreadyConnected,
    NotConnected,
}

/// The five transmit queues, in the order they're drained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TxSlot {
    Loc1,
    Cmd,
    Loc2,
    Loc3,
    Beacon,
}

impl TxSlot {
    pub const ALL: [TxSlot; 5] = [
        TxSlot::Loc1,
        TxSlot::Cmd,
        TxSlot::Loc2,
        TxSlot::Loc3,
        TxSlot::Beacon,
    ];

    /// Index of the slot's `W_TXBUF_LOC` entry.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The `W_TXREQ` bit that requests this slot; the beacon slot is sent by the beacon timer
    /// instead.
    #[inline]
    pub fn request(self) -> Option<TxRequests> {
        match self {
            TxSlot::Loc1 => Some(TxRequests::LOC1),
            TxSlot::Cmd => Some(TxRequests::CMD),
            TxSlot::Loc2 => Some(TxRequests::LOC2),
            TxSlot::Loc3 => Some(TxRequests::LOC3),
            TxSlot::Beacon => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameClass {
    Management,
    Beacon,
    Control,
    Data,
}

impl FrameClass {
    /// Classifies a frame by the slot it was sent from and the type field of its frame control
    /// word.
    pub fn new(slot: TxSlot, frame_control: u16) -> Self {
        if slot == TxSlot::Beacon {
            return FrameClass::Beacon;
        }
        match frame_control >> 2 & 3 {
            0 => FrameClass::Management,
            1 => FrameClass::Control,
            _ => FrameClass::Data,
        }
    }

    #[inline]
    pub fn is_beacon(self) -> bool {
        self == FrameClass::Beacon
    }

    /// Frame type reported in bits 0..3 of the RX header flags.
    #[inline]
    pub const fn rx_type(self) -> u16 {
        match self {
            FrameClass::Management => 0x0,
            FrameClass::Beacon => 0x1,
            FrameClass::Control => 0x5,
            FrameClass::Data => 0x8,
        }
    }
}

/// A frame in flight between instances. Its contents are opaque apart from the frame control and
/// destination address words used for routing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub src: PeerId,
    pub slot: TxSlot,
    pub class: FrameClass,
    pub rate: u16,
    /// Length in bytes, without FCS.
    pub len: u16,
    pub data: Box<[u16]>,
}

impl Frame {
    /// Destination MAC address, if the frame is long enough to carry one.
    pub fn dest(&self) -> Option<[u16; 3]> {
        self.data.get(2..5).map(|addr| [addr[0], addr[1], addr[2]])
    }

    pub fn rx_header(&self) -> [u16; RX_HEADER_HALFWORDS as usize] {
        [self.class.rx_type(), 0x0040, 0, self.rate, self.len, 0x0010]
    }

    /// Halfwords the frame occupies in an RX window, header and word padding included.
    pub fn rx_units(&self) -> u16 {
        (RX_HEADER_HALFWORDS + self.data.len() as u16 + 1) & !1
    }
}

/// A non-owning reference to another instance: enough to deliver frames to it, nothing more.
#[derive(Clone, Debug)]
pub struct PeerHandle {
    id: PeerId,
    inbox: Sender<Frame>,
}

impl PeerHandle {
    #[inline]
    pub fn id(&self) -> PeerId {
        self.id
    }
}

/// A queued frame along with the peers that were connected when it was queued.
struct Pending {
    frame: Frame,
    recipients: Vec<PeerId>,
}

#[derive(Default)]
struct LinkState {
    peers: Vec<PeerHandle>,
    pending: Vec<Pending>,
}

/// The part of an instance that's shared with the host environment and, through handles, with
/// peers: the peer set and the outgoing queue behind one mutex, plus the sending end of the
/// instance's inbox.
pub struct Link {
    #[cfg(feature = "log")]
    logger: slog::Logger,
    id: PeerId,
    inbox: Sender<Frame>,
    state: Mutex<LinkState>,
}

impl Link {
    pub(super) fn new(
        inbox_capacity: usize,
        #[cfg(feature = "log")] logger: slog::Logger,
    ) -> (Self, Receiver<Frame>) {
        let (inbox, inbox_rx) = crossbeam_channel::bounded(inbox_capacity);
        (
            Link {
                #[cfg(feature = "log")]
                logger,
                id: PeerId::next(),
                inbox,
                state: Mutex::new(LinkState::default()),
            },
            inbox_rx,
        )
    }

    #[inline]
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// A handle peers can use to deliver frames to this instance.
    pub fn handle(&self) -> PeerHandle {
        PeerHandle {
            id: self.id,
            inbox: self.inbox.clone(),
        }
    }

    /// Starts delivering this instance's frames to `peer`. Only this side of the connection is
    /// updated; the host has to connect the peer back for frames to flow the other way.
    pub fn add_connection(&self, peer: PeerHandle) -> Result<(), ConnectError> {
        if peer.id == self.id {
            return Err(ConnectError::SelfConnection);
        }
        let mut state = self.state.lock();
        if state.peers.iter().any(|p| p.id == peer.id) {
            return Err(ConnectError::AlreadyConnected);
        }
        #[cfg(feature = "log")]
        slog::debug!(self.logger, "Connected to peer {}", peer.id.0);
        state.peers.push(peer);
        Ok(())
    }

    pub fn rem_connection(&self, peer: PeerId) -> Result<(), ConnectError> {
        let mut state = self.state.lock();
        let i = state
            .peers
            .iter()
            .position(|p| p.id == peer)
            .ok_or(ConnectError::NotConnected)?;
        state.peers.remove(i);
        #[cfg(feature = "log")]
        slog::debug!(self.logger, "Disconnected from peer {}", peer.0);
        Ok(())
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.state.lock().peers.iter().map(PeerHandle::id).collect()
    }

    #[inline]
    pub fn has_peers(&self) -> bool {
        !self.state.lock().peers.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Queues `frame` for the peers connected right now. With nobody to hear it, the frame is
    /// dropped instead of being kept until a peer shows up.
    pub(super) fn enqueue(&self, frame: Frame) {
        let mut state = self.state.lock();
        if state.peers.is_empty() {
            #[cfg(feature = "log")]
            slog::trace!(
                self.logger,
                "Dropped {:?} frame from slot {:?}: no peers",
                frame.class,
                frame.slot
            );
            return;
        }
        #[cfg(feature = "log")]
        slog::debug!(
            self.logger,
            "Queued {:?} frame from slot {:?} ({} bytes)",
            frame.class,
            frame.slot,
            frame.len
        );
        let recipients = state.peers.iter().map(PeerHandle::id).collect();
        state.pending.push(Pending { frame, recipients });
    }

    /// Hands a copy of every pending frame to each of its recipients that's still connected, then
    /// empties the queue. Peers that joined after a frame was queued don't get it, and peers whose
    /// inbox is full or gone miss it.
    ///
    /// The lock is held for the whole sweep; delivering never takes a peer's lock.
    pub(super) fn sweep(&self) {
        let mut state = self.state.lock();
        let LinkState { peers, pending } = &mut *state;
        for Pending { frame, recipients } in pending.drain(..) {
            for peer in peers.iter().filter(|p| recipients.contains(&p.id)) {
                let result = peer.inbox.try_send(frame.clone());
                cfg_if::cfg_if! {
                    if #[cfg(feature = "log")] {
                        if let Err(err) = result {
                            slog::trace!(
                                self.logger,
                                "Dropped {:?} frame for peer {}: inbox {}",
                                frame.class,
                                peer.id.0,
                                match err {
                                    TrySendError::Full(_) => "full",
                                    TrySendError::Disconnected(_) => "gone",
                                }
                            );
                        }
                    } else {
                        drop(result);
                    }
                }
            }
        }
    }
}

impl WiFi {
    /// Copies the frame described by a TX slot out of the buffer region and queues it for the next
    /// sweep.
    ///
    /// The description starts with a 12-byte TX header; its length field counts the 4-byte FCS,
    /// which isn't copied. Non-beacon slots are disabled afterwards and report completion.
    pub(crate) fn transfer(&mut self, slot: TxSlot, host: &mut impl Host) {
        let loc = self.regs.tx_slot_loc(slot.index());
        let base = loc.addr() << 1;
        let rate = host.read_ram_16(base.wrapping_add(0x8) & 0x1FFE);
        let len = (host.read_ram_16(base.wrapping_add(0xA) & 0x1FFE) & 0x0FFF).saturating_sub(4);
        let data: Box<[u16]> = (0..(len + 1) / 2)
            .map(|i| host.read_ram_16(base.wrapping_add(0xC + i * 2) & 0x1FFE))
            .collect();
        let class = FrameClass::new(slot, data.first().copied().unwrap_or(0));
        self.link.enqueue(Frame {
            src: self.link.id(),
            slot,
            class,
            rate,
            len,
            data,
        });

        if slot != TxSlot::Beacon {
            host.write_ram_16(base, 0x0001);
            self.regs
                .set_at(Reg::TxbufLoc, slot.index(), loc.with_enabled(false).0);
            self.regs.set(Reg::TxStat, 0x0001 | (slot.index() as u16) << 8);
            self.send_interrupt(Irq::TxComplete, host);
        }
    }

    /// Sends every requested and enabled slot, in slot order.
    pub(super) fn transfer_requested(&mut self, host: &mut impl Host) {
        let requests = self.regs.tx_requests();
        for slot in TxSlot::ALL {
            let Some(request) = slot.request() else {
                continue;
            };
            if requests.contains(request) && self.regs.tx_slot_loc(slot.index()).enabled() {
                self.transfer(slot, host);
            }
        }
    }

    /// Runs one packet bus pass: hands queued frames to the current peers, then commits frames
    /// peers have handed to this instance into its RX window.
    pub fn process_packets(&mut self, host: &mut impl Host) {
        self.link.sweep();
        while let Ok(frame) = self.inbox.try_recv() {
            self.receive_frame(&frame, host);
        }
    }

    #[inline]
    pub fn handle(&self) -> PeerHandle {
        self.link.handle()
    }

    /// Connects this instance to `peer`. The tick isn't armed here: the host is expected to check
    /// [`should_schedule`](Self::should_schedule) afterwards, as it does after every tick.
    #[inline]
    pub fn add_connection(&mut self, peer: PeerHandle) -> Result<(), ConnectError> {
        self.link.add_connection(peer)
    }

    #[inline]
    pub fn rem_connection(&mut self, peer: PeerId) -> Result<(), ConnectError> {
        self.link.rem_connection(peer)
    }
}
