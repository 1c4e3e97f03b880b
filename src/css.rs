// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The compute-subsystem (CSS) power coordinator.
//!
//! The coordinator owns the power-state vector for every core, every
//! cluster, and the CSS as a whole, and sequences the platform's
//! hardware primitives so that no domain is ever in a deeper power state
//! than its parent. Power-down requests walk up the hierarchy
//! (core, cluster, CSS), clamping each level to the shallowest state any
//! of its children still needs; power-up requests walk down it.

use crate::error::{Error, Result};
use crate::platform::{Platform, PlatformImpl};
use crate::steps;
use crate::system::SystemStateMachine;
use num_enum::TryFromPrimitive;
use spin::mutex::SpinMutex;

/// The number of clusters in the compute subsystem.
pub const MAX_CLUSTERS: usize = PlatformImpl::CLUSTER_COUNT;

/// The number of cores in each cluster.
pub const MAX_CORES_PER_CLUSTER: usize = PlatformImpl::CORES_PER_CLUSTER;

/// The coordinated power state of a core, cluster, or the CSS.
///
/// A numerically larger value is a deeper power state, so the
/// partial-order invariant reads `core >= cluster >= css`.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, TryFromPrimitive)]
#[repr(u8)]
pub enum PowerState {
    /// Running.
    On = 0,
    /// Context retained, execution stopped.
    Retention = 1,
    /// Powered off; context is lost.
    Off = 3,
}

struct PowerVector {
    core: [[PowerState; MAX_CORES_PER_CLUSTER]; MAX_CLUSTERS],
    cluster: [PowerState; MAX_CLUSTERS],
    css: PowerState,
    lead_cluster: usize,
    lead_core: usize,
}

/// The power coordinator for the compute subsystem.
pub struct Css {
    state: SpinMutex<PowerVector>,
}

/// The global coordinator instance used by the firmware.
pub static CSS: Css = Css::new();

impl Css {
    /// Creates a coordinator in the boot state: core 0 of cluster 0
    /// running, everything else off.
    pub const fn new() -> Self {
        let mut core = [[PowerState::Off; MAX_CORES_PER_CLUSTER]; MAX_CLUSTERS];
        let mut cluster = [PowerState::Off; MAX_CLUSTERS];
        core[0][0] = PowerState::On;
        cluster[0] = PowerState::On;

        Self {
            state: SpinMutex::new(PowerVector {
                core,
                cluster,
                css: PowerState::On,
                lead_cluster: 0,
                lead_core: 0,
            }),
        }
    }

    /// The coordinated state of the CSS.
    pub fn css_state(&self) -> PowerState {
        self.state.lock().css
    }

    /// The coordinated state of a cluster.
    ///
    /// Panics if the index is out of range.
    pub fn cluster_state(&self, cluster: usize) -> PowerState {
        self.state.lock().cluster[cluster]
    }

    /// The coordinated state of a core.
    ///
    /// Panics if an index is out of range.
    pub fn core_state(&self, cluster: usize, core: usize) -> PowerState {
        self.state.lock().core[cluster][core]
    }

    /// Returns a cluster's state and the bitmap of its online cores.
    ///
    /// Fails with `Invalid` if the cluster index is out of range.
    pub fn get_power_state(&self, cluster: usize) -> Result<(PowerState, u32)> {
        if cluster >= MAX_CLUSTERS {
            return Err(Error::Invalid);
        }

        let state = self.state.lock();
        let mut online = 0;

        for (core, core_state) in state.core[cluster].iter().enumerate() {
            if *core_state != PowerState::Off {
                online |= 1 << core;
            }
        }

        Ok((state.cluster[cluster], online))
    }

    /// Applies a coordinated power-state request for one core.
    ///
    /// Power-down requests may only be sent from the affected core, so
    /// the core and all of its ancestors are known to be on when one
    /// arrives; the cluster and CSS levels are clamped to the shallowest
    /// state a still-active sibling needs before any hardware is
    /// touched. Power-up requests turn the ancestors on first,
    /// regardless of their requested states.
    ///
    /// When coordination powers the whole CSS off, the system state
    /// machine is moved to SUSPEND and the requesting core is remembered
    /// as the lead core for [`Css::resume`].
    ///
    /// Fails with `Invalid` if an index is out of range.
    pub fn set_power_state(
        &self,
        system: &SystemStateMachine,
        cluster: usize,
        core: usize,
        core_state: PowerState,
        mut cluster_state: PowerState,
        mut css_state: PowerState,
    ) -> Result<()> {
        if cluster >= MAX_CLUSTERS || core >= MAX_CORES_PER_CLUSTER {
            return Err(Error::Invalid);
        }

        let mut state = self.state.lock();

        if core_state != PowerState::On {
            steps::record(steps::SUSPEND_CORE);
            PlatformImpl::css_suspend_core(cluster, core, core_state);
            state.core[cluster][core] = core_state;

            // A cluster must be on if any of its cores is on.
            for sibling in state.core[cluster] {
                cluster_state = cluster_state.min(sibling);
            }
            steps::record(steps::SUSPEND_CLUSTER);
            PlatformImpl::css_suspend_cluster(cluster, cluster_state);
            state.cluster[cluster] = cluster_state;

            // The CSS must be on if any of its clusters is on.
            for sibling in state.cluster {
                css_state = css_state.min(sibling);
            }
            steps::record(steps::SUSPEND_CSS);
            PlatformImpl::css_suspend_css(css_state);
            state.css = css_state;

            // Suspend the system when powering off the CSS.
            if css_state == PowerState::Off {
                system.suspend();

                // Remember the last active core.
                state.lead_cluster = cluster;
                state.lead_core = core;
            }
        } else {
            PlatformImpl::css_resume_css(state.css);
            state.css = PowerState::On;

            PlatformImpl::css_resume_cluster(cluster, state.cluster[cluster]);
            state.cluster[cluster] = PowerState::On;

            PlatformImpl::css_resume_core(cluster, core, state.core[cluster][core]);
            state.core[cluster][core] = PowerState::On;
        }

        Ok(())
    }

    /// Resumes execution on the lead core after a system wakeup.
    pub fn resume(&self, system: &SystemStateMachine) {
        steps::record(steps::RESUME_CSS);

        let (cluster, core) = {
            let state = self.state.lock();
            (state.lead_cluster, state.lead_core)
        };

        let _ = self.set_power_state(
            system,
            cluster,
            core,
            PowerState::On,
            PowerState::On,
            PowerState::On,
        );
    }

    /// Wakes any powered-down core with a pending interrupt.
    pub fn poll(&self, system: &SystemStateMachine) {
        let pending = PlatformImpl::css_irq_status();

        if pending == 0 {
            return;
        }

        for cluster in 0..MAX_CLUSTERS {
            for core in 0..MAX_CORES_PER_CLUSTER {
                let bit = 1 << (cluster * MAX_CORES_PER_CLUSTER + core);

                if pending & bit != 0 && self.core_state(cluster, core) == PowerState::Off {
                    let _ = self.set_power_state(
                        system,
                        cluster,
                        core,
                        PowerState::On,
                        PowerState::On,
                        PowerState::On,
                    );
                }
            }
        }
    }

    #[cfg(test)]
    fn assert_partial_order(&self) {
        let state = self.state.lock();

        for cluster in 0..MAX_CLUSTERS {
            assert!(state.cluster[cluster] >= state.css);
            for core in 0..MAX_CORES_PER_CLUSTER {
                assert!(state.core[cluster][core] >= state.cluster[cluster]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::host::{self, CssCall};
    use crate::system::SystemState;

    fn awake_system() -> SystemStateMachine {
        let system = SystemStateMachine::new();
        system.force(SystemState::Awake);
        system
    }

    fn power_up_all(css: &Css, system: &SystemStateMachine) {
        for cluster in 0..MAX_CLUSTERS {
            for core in 0..MAX_CORES_PER_CLUSTER {
                css.set_power_state(
                    system,
                    cluster,
                    core,
                    PowerState::On,
                    PowerState::On,
                    PowerState::On,
                )
                .unwrap();
            }
        }
    }

    #[test]
    fn invalid_indices_are_rejected() {
        let css = Css::new();
        let system = awake_system();

        assert_eq!(
            css.set_power_state(
                &system,
                MAX_CLUSTERS,
                0,
                PowerState::Off,
                PowerState::On,
                PowerState::On
            ),
            Err(Error::Invalid)
        );
        assert_eq!(
            css.set_power_state(
                &system,
                0,
                MAX_CORES_PER_CLUSTER,
                PowerState::Off,
                PowerState::On,
                PowerState::On
            ),
            Err(Error::Invalid)
        );
        assert_eq!(css.get_power_state(MAX_CLUSTERS), Err(Error::Invalid));
    }

    #[test]
    fn boot_state_has_one_core_online() {
        let css = Css::new();

        assert_eq!(css.css_state(), PowerState::On);
        assert_eq!(css.get_power_state(0).unwrap(), (PowerState::On, 1));
        css.assert_partial_order();
    }

    #[test]
    fn single_core_power_down_leaves_parents_on() {
        let _guard = host::test_lock();
        let css = Css::new();
        let system = awake_system();

        power_up_all(&css, &system);

        // Scenario: turn off core 2 while its siblings stay up.
        css.set_power_state(
            &system,
            0,
            2,
            PowerState::Off,
            PowerState::On,
            PowerState::On,
        )
        .unwrap();

        assert_eq!(css.core_state(0, 2), PowerState::Off);
        assert_eq!(css.cluster_state(0), PowerState::On);
        assert_eq!(css.css_state(), PowerState::On);
        assert_eq!(system.state(), SystemState::Awake);
        let (_, online) = css.get_power_state(0).unwrap();
        assert_eq!(online & 1 << 2, 0);
        css.assert_partial_order();
    }

    #[test]
    fn lead_core_power_down_protects_live_siblings() {
        let _guard = host::test_lock();
        let css = Css::new();
        let system = awake_system();

        power_up_all(&css, &system);

        // Core 0 requests a deep state while its siblings are live; the
        // coordinated cluster and CSS states must stay on.
        css.set_power_state(
            &system,
            0,
            0,
            PowerState::Off,
            PowerState::Off,
            PowerState::Off,
        )
        .unwrap();

        assert_eq!(css.core_state(0, 0), PowerState::Off);
        assert_eq!(css.cluster_state(0), PowerState::On);
        assert_eq!(css.css_state(), PowerState::On);
        assert_eq!(system.state(), SystemState::Awake);
        css.assert_partial_order();
    }

    #[test]
    fn last_core_off_suspends_the_system_and_resume_restores() {
        let _guard = host::test_lock();
        let css = Css::new();
        let system = awake_system();

        power_up_all(&css, &system);

        // Power down every core, last one requesting a full power-off.
        for cluster in 0..MAX_CLUSTERS {
            for core in 0..MAX_CORES_PER_CLUSTER {
                css.set_power_state(
                    &system,
                    cluster,
                    core,
                    PowerState::Off,
                    PowerState::Off,
                    PowerState::Off,
                )
                .unwrap();
                css.assert_partial_order();
            }
        }

        assert_eq!(css.css_state(), PowerState::Off);
        assert_eq!(system.state(), SystemState::Suspend);

        // Wake up through the state machine's transition pair.
        system.force(SystemState::Resume);
        css.resume(&system);

        let last_cluster = MAX_CLUSTERS - 1;
        let last_core = MAX_CORES_PER_CLUSTER - 1;
        assert_eq!(css.css_state(), PowerState::On);
        assert_eq!(css.cluster_state(last_cluster), PowerState::On);
        assert_eq!(css.core_state(last_cluster, last_core), PowerState::On);
        css.assert_partial_order();
    }

    #[test]
    fn power_down_then_up_round_trips_the_vector() {
        let _guard = host::test_lock();
        let css = Css::new();
        let system = awake_system();

        power_up_all(&css, &system);

        css.set_power_state(
            &system,
            0,
            1,
            PowerState::Off,
            PowerState::Off,
            PowerState::Off,
        )
        .unwrap();
        css.set_power_state(&system, 0, 1, PowerState::On, PowerState::On, PowerState::On)
            .unwrap();

        for cluster in 0..MAX_CLUSTERS {
            assert_eq!(css.cluster_state(cluster), PowerState::On);
            for core in 0..MAX_CORES_PER_CLUSTER {
                assert_eq!(css.core_state(cluster, core), PowerState::On);
            }
        }
    }

    #[test]
    fn hardware_ordering_is_bottom_up_then_top_down() {
        let _guard = host::test_lock();
        let css = Css::new();
        let system = awake_system();
        power_up_all(&css, &system);

        host::take_css_calls();
        css.set_power_state(
            &system,
            0,
            3,
            PowerState::Off,
            PowerState::On,
            PowerState::On,
        )
        .unwrap();
        let calls = host::take_css_calls();
        assert_eq!(
            calls,
            [
                CssCall::SuspendCore(0, 3, PowerState::Off),
                CssCall::SuspendCluster(0, PowerState::On),
                CssCall::SuspendCss(PowerState::On),
            ]
        );

        css.set_power_state(&system, 0, 3, PowerState::On, PowerState::On, PowerState::On)
            .unwrap();
        let calls = host::take_css_calls();
        assert_eq!(
            calls,
            [
                CssCall::ResumeCss(PowerState::On),
                CssCall::ResumeCluster(0, PowerState::On),
                CssCall::ResumeCore(0, 3, PowerState::Off),
            ]
        );
    }
}
