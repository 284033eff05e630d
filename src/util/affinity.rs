//! Optional CPU pinning for the owner thread.
//!
//! Linux:
//!   - CPU pin: pthread_setaffinity_np on the current thread.
//! macOS:
//!   - Affinity tag: thread_policy_set(THREAD_AFFINITY_POLICY).
//! Elsewhere pinning is a no-op.

use serde::{Deserialize, Serialize};

/// Where to place the owner thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinConfig {
    /// Logical core to pin the owner thread to (Linux).
    pub core_id: Option<usize>,
    /// Mach thread affinity tag (macOS).
    pub mac_affinity_tag: Option<i32>,
}

impl PinConfig {
    /// Pin to a single logical core.
    pub fn core(core_id: usize) -> Self {
        Self {
            core_id: Some(core_id),
            mac_affinity_tag: None,
        }
    }
}

/// Apply `cfg` to the calling thread. Returns whether the OS accepted it.
///
/// Failure is logged and otherwise ignored: an unpinned owner is slower, not
/// incorrect.
pub fn pin_current_thread(cfg: &PinConfig) -> bool {
    let applied = pin_impl(cfg);
    if !applied && (cfg.core_id.is_some() || cfg.mac_affinity_tag.is_some()) {
        tracing::warn!(?cfg, "thread pinning was not applied");
    }
    applied
}

#[cfg(target_os = "linux")]
fn pin_impl(cfg: &PinConfig) -> bool {
    let Some(core) = cfg.core_id else {
        return false;
    };
    if core >= libc::CPU_SETSIZE as usize {
        return false;
    }
    // SAFETY: cpu_set_t is plain data; CPU_ZERO/CPU_SET only touch the local
    // set, and pthread_self is always a valid thread handle.
    unsafe {
        let mut set: libc::cpu_set_t = core::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);
        libc::pthread_setaffinity_np(
            libc::pthread_self(),
            core::mem::size_of::<libc::cpu_set_t>(),
            &set,
        ) == 0
    }
}

#[cfg(target_os = "macos")]
fn pin_impl(cfg: &PinConfig) -> bool {
    let Some(tag) = cfg.mac_affinity_tag else {
        return false;
    };
    #[repr(C)]
    struct ThreadAffinityPolicy {
        affinity_tag: libc::integer_t,
    }
    unsafe extern "C" {
        fn mach_thread_self() -> libc::mach_port_t;
        fn thread_policy_set(
            thread: libc::mach_port_t,
            flavor: libc::c_int,
            policy_info: *const libc::integer_t,
            count: libc::mach_msg_type_number_t,
        ) -> libc::kern_return_t;
    }
    const THREAD_AFFINITY_POLICY: libc::c_int = 4;
    let policy = ThreadAffinityPolicy {
        affinity_tag: tag as libc::integer_t,
    };
    let count = (core::mem::size_of::<ThreadAffinityPolicy>()
        / core::mem::size_of::<libc::integer_t>()) as libc::mach_msg_type_number_t;
    // SAFETY: the policy struct outlives the call and matches the Mach layout.
    unsafe {
        thread_policy_set(
            mach_thread_self(),
            THREAD_AFFINITY_POLICY,
            (&policy as *const ThreadAffinityPolicy).cast(),
            count,
        ) == 0
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn pin_impl(_cfg: &PinConfig) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_pins_nothing() {
        assert!(!pin_current_thread(&PinConfig::default()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn out_of_range_core_is_rejected() {
        let cfg = PinConfig::core(libc::CPU_SETSIZE as usize + 1);
        assert!(!pin_current_thread(&cfg));
    }
}
