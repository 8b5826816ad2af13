/// Fixed offsets from the shared base port.
///
/// Every host must have `base..=base + 4` free: the client listener on the base port,
/// DCF on `+1`, and the replication data/heartbeat/service triad on `+2..=+4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortScheme {
    base: u16,
}

pub const CONSENSUS_OFFSET: u16 = 1;
pub const DATA_OFFSET: u16 = 2;
pub const HEARTBEAT_OFFSET: u16 = 3;
pub const SERVICE_OFFSET: u16 = 4;

/// Data, heartbeat and service ports of one end of a replication link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTriad {
    pub data: u16,
    pub heartbeat: u16,
    pub service: u16,
}

impl PortScheme {
    /// Only built from a descriptor, whose base port leaves room for `MAX_PORT_OFFSET`.
    pub(crate) fn new(base: u16) -> Self {
        Self { base }
    }

    pub fn consensus(&self) -> u16 {
        self.base + CONSENSUS_OFFSET
    }

    pub fn replication(&self) -> ChannelTriad {
        ChannelTriad {
            data: self.base + DATA_OFFSET,
            heartbeat: self.base + HEARTBEAT_OFFSET,
            service: self.base + SERVICE_OFFSET,
        }
    }
}
