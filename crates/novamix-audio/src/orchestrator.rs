//! Virtual Game/Chat sink lifecycle and volume control.
//!
//! The headset's real output is split into two `pw-loopback` routes. Each
//! route exposes an `input.<name>` sink node whose volume follows the
//! chat-mix dial.

use std::thread::sleep;
use std::time::Duration;

use novamix_core::MixBalance;
use tracing::{debug, error, info, warn};

use crate::error::{AudioError, AudioResult};
use crate::listing::{find_pactl_sink, find_pw_sink};
use crate::runner::{ManagedChild, ProcessRunner, SystemRunner};
use crate::strategy::{VolumeStrategy, VolumeTool};

/// Sink name used when the headset cannot be found in any listing.
pub const DEFAULT_SINK: &str = "@DEFAULT_AUDIO_SINK@";
/// Substring identifying the headset's nodes
pub const HEADSET_PATTERN: &str = "SteelSeries_Arctis_Nova";
pub const GAME_SINK: &str = "NovaGame";
pub const CHAT_SINK: &str = "NovaChat";

/// Sink naming and timing.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Substring matched against node names when looking for the headset
    pub headset_pattern: String,
    pub game_sink: String,
    pub chat_sink: String,
    /// Fallback target when the headset is not listed
    pub default_sink: String,
    /// Pause after each loopback spawn so the node can register
    pub settle_delay: Duration,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            headset_pattern: HEADSET_PATTERN.to_string(),
            game_sink: GAME_SINK.to_string(),
            chat_sink: CHAT_SINK.to_string(),
            default_sink: DEFAULT_SINK.to_string(),
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// Which half of the mix a virtual sink carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkRole {
    Game,
    Chat,
}

impl SinkRole {
    fn percent(self, balance: MixBalance) -> u8 {
        match self {
            Self::Game => balance.game_percent(),
            Self::Chat => balance.chat_percent(),
        }
    }
}

struct VirtualSink<C> {
    role: SinkRole,
    name: String,
    process: C,
    /// Last percentage handed to a volume tool
    last_volume: Option<u8>,
}

impl<C> VirtualSink<C> {
    fn node(&self) -> String {
        sink_node(&self.name)
    }
}

fn sink_node(name: &str) -> String {
    format!("input.{name}")
}

/// Creates, drives and removes the virtual sinks.
pub struct SinkOrchestrator<R: ProcessRunner = SystemRunner> {
    runner: R,
    config: AudioConfig,
    real_sink: Option<String>,
    sinks: Vec<VirtualSink<R::Child>>,
    strategy: Option<VolumeStrategy>,
    /// Volume commands launched but not yet reaped
    in_flight: Vec<(VolumeTool, R::Child)>,
    /// Most recent split handed to [`Self::set_volumes`]
    last_requested: Option<MixBalance>,
}

impl<R: ProcessRunner> SinkOrchestrator<R> {
    #[must_use]
    pub fn new(runner: R, config: AudioConfig) -> Self {
        Self {
            runner,
            config,
            real_sink: None,
            sinks: Vec::new(),
            strategy: None,
            in_flight: Vec::new(),
            last_requested: None,
        }
    }

    #[must_use]
    pub fn strategy(&self) -> Option<VolumeStrategy> {
        self.strategy
    }

    #[must_use]
    pub fn real_sink(&self) -> Option<&str> {
        self.real_sink.as_deref()
    }

    /// Names of the virtual sinks currently alive.
    #[must_use]
    pub fn active_sinks(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name.as_str()).collect()
    }

    /// Discover the real sink, create both virtual sinks and pick a volume tool.
    ///
    /// On failure everything created so far is torn down before returning.
    ///
    /// # Errors
    /// Returns [`AudioError::SinkCreation`] or [`AudioError::NoVolumeControl`].
    pub fn start(&mut self) -> AudioResult<VolumeTool> {
        let result = self.try_start();
        if let Err(e) = &result {
            error!(error = %e, "Virtual sink setup failed");
            self.teardown();
        }
        result
    }

    fn try_start(&mut self) -> AudioResult<VolumeTool> {
        let real_sink = self.discover_real_sink();
        self.create_virtual_sinks(&real_sink)?;
        self.probe_volume_tool()
    }

    /// Find the headset's output sink.
    ///
    /// Tries `pw-cli ls Node`, then `pactl list sinks short`, then falls back
    /// to the default sink. The answer is remembered for the process lifetime.
    pub fn discover_real_sink(&mut self) -> String {
        if let Some(sink) = &self.real_sink {
            return sink.clone();
        }

        let sink = self
            .search_listing("pw-cli", &["ls", "Node"], find_pw_sink)
            .or_else(|| self.search_listing("pactl", &["list", "sinks", "short"], find_pactl_sink))
            .unwrap_or_else(|| {
                warn!(sink = %self.config.default_sink, "Headset sink not found, using default sink");
                self.config.default_sink.clone()
            });

        info!(sink = %sink, "Using output sink");
        self.real_sink = Some(sink.clone());
        sink
    }

    fn search_listing(
        &self,
        program: &str,
        args: &[&str],
        find: fn(&str, &str) -> Option<String>,
    ) -> Option<String> {
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        match self.runner.capture(program, &args) {
            Ok(output) if output.success => {
                let found = find(&output.stdout, &self.config.headset_pattern);
                if found.is_none() {
                    debug!(program, "Headset not in listing");
                }
                found
            }
            Ok(_) => {
                debug!(program, "Listing command failed");
                None
            }
            Err(e) => {
                debug!(program, error = %e, "Listing command unavailable");
                None
            }
        }
    }

    /// Spawn the Game and Chat loopback routes towards `real_sink`.
    ///
    /// A route that starts and later dies is only noticed when its volume is set.
    ///
    /// # Errors
    /// Returns [`AudioError::SinkCreation`] if a route cannot be started. Routes
    /// started before the failure stay registered for [`Self::teardown`].
    pub fn create_virtual_sinks(&mut self, real_sink: &str) -> AudioResult<()> {
        let wanted = [
            (SinkRole::Game, self.config.game_sink.clone()),
            (SinkRole::Chat, self.config.chat_sink.clone()),
        ];

        for (role, name) in wanted {
            if self.sinks.iter().any(|s| s.role == role) {
                continue;
            }

            info!(sink = %name, target = real_sink, "Creating virtual sink");
            let args = vec![
                "-P".to_string(),
                real_sink.to_string(),
                "--capture-props=media.class=Audio/Sink".to_string(),
                "-n".to_string(),
                name.clone(),
            ];
            let process = self
                .runner
                .launch("pw-loopback", &args)
                .map_err(|source| AudioError::SinkCreation { name: name.clone(), source })?;

            debug!(sink = %name, pid = process.id(), "Loopback started");
            self.sinks.push(VirtualSink { role, name, process, last_volume: None });
            sleep(self.config.settle_delay);
        }

        Ok(())
    }

    /// Find a tool that can set the Game sink's volume.
    ///
    /// # Errors
    /// Returns [`AudioError::NoVolumeControl`] if neither tool works.
    pub fn probe_volume_tool(&mut self) -> AudioResult<VolumeTool> {
        let node = sink_node(&self.config.game_sink);

        for tool in [VolumeStrategy::PRIMARY, VolumeStrategy::FALLBACK] {
            let (program, args) = tool.command(&node, 100);
            match self.runner.run(program, &args) {
                Ok(true) => {
                    info!(tool = %tool, "Volume control available");
                    self.strategy = Some(VolumeStrategy::new(tool));
                    return Ok(tool);
                }
                Ok(false) => warn!(tool = %tool, "Volume control probe failed"),
                Err(e) => warn!(tool = %tool, error = %e, "Volume control tool unavailable"),
            }
        }

        Err(AudioError::NoVolumeControl)
    }

    /// Apply a game/chat split to the virtual sinks.
    ///
    /// A primary-tool failure downgrades to the fallback tool for the rest of
    /// the session and the same split is retried once. A fallback failure
    /// drops the split. Returns whether the split was handed to a tool.
    pub fn set_volumes(&mut self, balance: MixBalance) -> bool {
        self.reap_volume_commands();
        self.last_requested = Some(balance);

        let Some(strategy) = self.strategy else {
            warn!("No volume control tool selected, dropping sample");
            return false;
        };

        match self.apply(strategy.tool(), balance) {
            Ok(()) => true,
            Err(e) if strategy.is_primary() => {
                warn!(tool = %strategy.tool(), error = %e, "Volume command failed");
                self.downgrade();
                match self.apply(VolumeStrategy::FALLBACK, balance) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "Could not set volumes, dropping sample");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not set volumes, dropping sample");
                false
            }
        }
    }

    fn apply(&mut self, tool: VolumeTool, balance: MixBalance) -> AudioResult<()> {
        for sink in &mut self.sinks {
            let percent = sink.role.percent(balance);
            if sink.last_volume == Some(percent) {
                continue;
            }

            let (program, args) = tool.command(&sink.node(), percent);
            let child = self
                .runner
                .launch(program, &args)
                .map_err(|e| AudioError::VolumeCommand(format!("{program}: {e}")))?;
            self.in_flight.push((tool, child));
            sink.last_volume = Some(percent);
        }
        Ok(())
    }

    fn downgrade(&mut self) -> bool {
        let Some(strategy) = self.strategy.as_mut() else {
            return false;
        };
        if !strategy.downgrade() {
            return false;
        }

        info!(tool = %strategy.tool(), "Switched volume control to fallback tool");
        // The fallback has applied nothing yet
        for sink in &mut self.sinks {
            sink.last_volume = None;
        }
        true
    }

    /// Collect finished volume commands without waiting.
    ///
    /// A primary-tool command that exited with failure downgrades to the
    /// fallback tool, which then reapplies the most recent split once.
    pub fn poll(&mut self) {
        if !self.reap_volume_commands() {
            return;
        }
        let Some(balance) = self.last_requested else {
            return;
        };

        match self.apply(VolumeStrategy::FALLBACK, balance) {
            Ok(()) => debug!(
                game = balance.game_percent(),
                chat = balance.chat_percent(),
                "Reapplied volumes with fallback tool"
            ),
            Err(e) => warn!(error = %e, "Could not reapply volumes with fallback tool"),
        }
    }

    /// Collect finished volume commands. Returns whether a failed
    /// primary-tool exit caused a downgrade.
    fn reap_volume_commands(&mut self) -> bool {
        let mut primary_failed = false;

        self.in_flight.retain_mut(|(tool, child)| match child.try_status() {
            Ok(None) => true,
            Ok(Some(true)) => false,
            Ok(Some(false)) => {
                debug!(tool = %tool, pid = child.id(), "Volume command exited with failure");
                primary_failed |= *tool == VolumeStrategy::PRIMARY;
                false
            }
            Err(e) => {
                debug!(tool = %tool, error = %e, "Lost track of volume command");
                false
            }
        });

        if !primary_failed {
            return false;
        }
        warn!("Primary volume tool reported failure");
        self.downgrade()
    }

    /// Stop both loopback routes. Safe to call repeatedly and after partial setup.
    pub fn teardown(&mut self) {
        for mut sink in self.sinks.drain(..) {
            match sink.process.terminate() {
                Ok(()) => info!(sink = %sink.name, "Virtual sink removed"),
                Err(e) => debug!(sink = %sink.name, error = %e, "Loopback already gone"),
            }
        }

        for (_, mut child) in self.in_flight.drain(..) {
            if let Err(e) = child.terminate() {
                debug!(error = %e, "Volume command already gone");
            }
        }
    }
}

impl<R: ProcessRunner> Drop for SinkOrchestrator<R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
