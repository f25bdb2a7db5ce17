//! Configuration changes as typed messages.
//!
//! The parameter panel and the platform glue never touch the frame driver's
//! parameters directly. They edit their own copy through a [`Configurator`],
//! which classifies each edit and sends a [`ConfigEvent`] carrying the full
//! new snapshot. The driver drains these between frames.

use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, warn};

use crate::params::SimulationParameters;
use crate::viewport::Viewport;

/// What kind of reconfiguration a change requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Only render parameters changed; re-read them next frame.
    Parameter,
    /// The display buffers must be reallocated.
    Resolution,
    /// The particle buffers must be reallocated and re-initialized.
    Count,
}

/// A configuration change, with the complete state after the change.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEvent {
    ParameterChanged(SimulationParameters),
    ResolutionChanged {
        params: SimulationParameters,
        viewport: Viewport,
    },
    CountChanged(SimulationParameters),
}

impl ConfigEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ConfigEvent::ParameterChanged(_) => ChangeKind::Parameter,
            ConfigEvent::ResolutionChanged { .. } => ChangeKind::Resolution,
            ConfigEvent::CountChanged(_) => ChangeKind::Count,
        }
    }

    pub fn params(&self) -> &SimulationParameters {
        match self {
            ConfigEvent::ParameterChanged(params)
            | ConfigEvent::ResolutionChanged { params, .. }
            | ConfigEvent::CountChanged(params) => params,
        }
    }
}

/// Classify an edit. A single edit can require more than one reconfiguration;
/// a plain parameter change is only reported when nothing heavier applies.
pub fn classify(old: &SimulationParameters, new: &SimulationParameters) -> Vec<ChangeKind> {
    let mut kinds = Vec::new();
    if old.canvas_resolution != new.canvas_resolution || old.with_hdpi != new.with_hdpi {
        kinds.push(ChangeKind::Resolution);
    }
    if old.particle_count != new.particle_count {
        kinds.push(ChangeKind::Count);
    }
    if kinds.is_empty() && old != new {
        kinds.push(ChangeKind::Parameter);
    }
    kinds
}

/// Create a connected configurator and event receiver.
pub fn channel(
    params: SimulationParameters,
    viewport: Viewport,
) -> (Configurator, Receiver<ConfigEvent>) {
    let (tx, rx) = mpsc::channel();
    (
        Configurator {
            params,
            viewport,
            tx,
        },
        rx,
    )
}

/// Producer side of the configuration channel.
///
/// Owned by whoever edits the configuration: the panel, keyboard shortcuts,
/// window resize handling.
#[derive(Debug, Clone)]
pub struct Configurator {
    params: SimulationParameters,
    viewport: Viewport,
    tx: Sender<ConfigEvent>,
}

impl Configurator {
    /// Current editable parameters.
    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Replace the parameters and notify the driver of what changed.
    pub fn update(&mut self, params: SimulationParameters) {
        let kinds = classify(&self.params, &params);
        self.params = params;
        for kind in kinds {
            self.send(kind);
        }
    }

    /// Apply an in-place edit, then notify like [`update`](Self::update).
    pub fn edit(&mut self, f: impl FnOnce(&mut SimulationParameters)) {
        let mut params = self.params.clone();
        f(&mut params);
        self.update(params);
    }

    /// Report a new window size or pixel ratio.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.send(ChangeKind::Resolution);
        }
    }

    fn send(&self, kind: ChangeKind) {
        let event = match kind {
            ChangeKind::Parameter => ConfigEvent::ParameterChanged(self.params.clone()),
            ChangeKind::Resolution => ConfigEvent::ResolutionChanged {
                params: self.params.clone(),
                viewport: self.viewport,
            },
            ChangeKind::Count => ConfigEvent::CountChanged(self.params.clone()),
        };
        debug!(?kind, "configuration changed");
        if self.tx.send(event).is_err() {
            warn!("configuration change dropped: frame driver is gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Configurator, Receiver<ConfigEvent>) {
        channel(SimulationParameters::default(), Viewport::new(800, 600, 1.0))
    }

    #[test]
    fn test_generic_change() {
        let (mut config, rx) = setup();
        config.edit(|p| p.point_size = 3.0);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind(), ChangeKind::Parameter);
        assert_eq!(event.params().point_size, 3.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_count_change() {
        let (mut config, rx) = setup();
        config.edit(|p| p.particle_count = 50);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind(), ChangeKind::Count);
        assert_eq!(event.params().particle_count, 50);
    }

    #[test]
    fn test_resolution_and_count_in_one_edit() {
        let (mut config, rx) = setup();
        config.edit(|p| {
            p.canvas_resolution = 25;
            p.particle_count = 10;
        });
        let kinds: Vec<_> = rx.try_iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![ChangeKind::Resolution, ChangeKind::Count]);
    }

    #[test]
    fn test_hdpi_toggle_is_resolution_change() {
        let old = SimulationParameters::default();
        let new = SimulationParameters {
            with_hdpi: !old.with_hdpi,
            ..old.clone()
        };
        assert_eq!(classify(&old, &new), vec![ChangeKind::Resolution]);
    }

    #[test]
    fn test_no_change_no_event() {
        let (mut config, rx) = setup();
        let same = config.params().clone();
        config.update(same);
        config.set_viewport(Viewport::new(800, 600, 1.0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_viewport_change_carries_viewport() {
        let (mut config, rx) = setup();
        config.set_viewport(Viewport::new(1024, 768, 2.0));
        match rx.try_recv().unwrap() {
            ConfigEvent::ResolutionChanged { viewport, .. } => {
                assert_eq!(viewport, Viewport::new(1024, 768, 2.0));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_send_after_driver_dropped() {
        let (mut config, rx) = setup();
        drop(rx);
        config.edit(|p| p.anim_run = false);
        assert!(!config.params().anim_run);
    }
}
