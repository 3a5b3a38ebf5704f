//! Network link status shared between the Wi-Fi connection loop and the
//! tasks that need to know whether requests can go out.

use core::sync::atomic::{AtomicBool, Ordering};

use log::info;

use crate::http::Connectivity;

/// Lock-free link and address flags. Online means both are set.
#[derive(Debug, Default)]
pub struct LinkState {
    link_up: AtomicBool,
    has_ipv4: AtomicBool,
}

impl LinkState {
    pub const fn new() -> Self {
        Self {
            link_up: AtomicBool::new(false),
            has_ipv4: AtomicBool::new(false),
        }
    }

    /// Stores the latest link readings. Returns `true` when this flipped
    /// the online status.
    pub fn update(&self, link_up: bool, has_ipv4: bool) -> bool {
        let was_online = self.is_online();
        self.link_up.store(link_up, Ordering::Release);
        self.has_ipv4.store(has_ipv4, Ordering::Release);
        let online = link_up && has_ipv4;
        if online != was_online {
            info!("net: online={}", online);
        }
        online != was_online
    }

    pub fn mark_disconnected(&self) -> bool {
        self.update(false, false)
    }
}

impl Connectivity for LinkState {
    fn is_online(&self) -> bool {
        self.link_up.load(Ordering::Acquire) && self.has_ipv4.load(Ordering::Acquire)
    }
}
