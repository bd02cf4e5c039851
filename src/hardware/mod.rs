//! Host fact probing.
//!
//! The sequencer only needs three facts about the machine it runs on: the CPU
//! architecture, the free space under the install target, and an address the
//! operator can reach the web UI on. Each probe lives in its own submodule and
//! degrades gracefully where the caller treats the fact as best-effort.

pub mod arch;
pub mod network;
pub mod storage;

pub use arch::{arch_allowed, detect_arch};
pub use network::{parse_default_route_iface, parse_hostname_addrs, primary_ipv4};
pub use storage::{free_space_bytes, gib_to_bytes, mount_for_path};
