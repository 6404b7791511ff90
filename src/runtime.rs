//! Event loop driving a [`ControlSurface`]
//!
//! MIDI input, the periodic flush and config reloads all arrive on one task,
//! so the surface itself needs no locking.

use crate::config::{ConfigWatcher, SurfaceConfig, TimingConfig};
use crate::surface::ControlSurface;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Why [`SurfaceRunner::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    /// The input port went away
    InputClosed,
}

pub struct SurfaceRunner {
    surface: ControlSurface,
    input_rx: mpsc::Receiver<Vec<u8>>,
    timing: TimingConfig,
}

fn flush_timer(flush_interval_ms: u64) -> Interval {
    let mut timer = interval(Duration::from_millis(flush_interval_ms.max(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

impl SurfaceRunner {
    pub fn new(
        surface: ControlSurface,
        input_rx: mpsc::Receiver<Vec<u8>>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            surface,
            input_rx,
            timing,
        }
    }

    pub fn surface_mut(&mut self) -> &mut ControlSurface {
        &mut self.surface
    }

    /// Initialize the device and process events until `shutdown` completes
    /// or the input channel closes. Returns the surface for inspection.
    pub async fn run(
        mut self,
        mut config_watcher: Option<ConfigWatcher>,
        shutdown: impl Future<Output = ()>,
    ) -> (ControlSurface, StopReason) {
        info!(
            "Starting surface loop (flush every {} ms)",
            self.timing.flush_interval_ms
        );
        self.surface.initialize();
        let mut timer = flush_timer(self.timing.flush_interval_ms);

        tokio::pin!(shutdown);

        let reason = loop {
            tokio::select! {
                received = self.input_rx.recv() => match received {
                    Some(data) => self.surface.handle_midi(&data),
                    None => {
                        warn!("MIDI input closed, stopping surface loop");
                        break StopReason::InputClosed;
                    }
                },

                _ = timer.tick() => {
                    self.surface.flush();
                }

                update = next_config(&mut config_watcher) => match update {
                    Some(config) => {
                        info!("Configuration file changed, applying timing");
                        if config.timing.flush_interval_ms != self.timing.flush_interval_ms {
                            timer = flush_timer(config.timing.flush_interval_ms);
                        }
                        self.timing = config.timing;
                        self.surface.apply_timing(&self.timing);
                    }
                    None => {
                        debug!("Config watcher closed");
                        config_watcher = None;
                    }
                },

                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping surface loop");
                    break StopReason::Shutdown;
                }
            }
        };

        // Last chance to push pending output
        self.surface.flush();
        (self.surface, reason)
    }
}

/// Next reload, or never when hot reload is off
async fn next_config(watcher: &mut Option<ConfigWatcher>) -> Option<SurfaceConfig> {
    match watcher.as_mut() {
        Some(watcher) => watcher.next_config().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{ParameterKnobs, ParameterRenderer};
    use crate::clock::SystemClock;
    use crate::control::ControlKind;
    use crate::devices::{DeviceKind, SurfaceContext};
    use crate::host::memory::MemoryParameter;
    use crate::host::{Parameter, ParameterRef};
    use crate::mode::{Mode, SurfaceRequest};
    use crate::parameter::FixedParameterProvider;
    use crate::transport::MemorySink;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    type Harness = (SurfaceRunner, mpsc::Sender<Vec<u8>>, Arc<MemoryParameter>);

    fn runner(sink: Arc<MemorySink>) -> Harness {
        let timing = TimingConfig {
            flush_interval_ms: 5,
            ..TimingConfig::default()
        };
        let context = SurfaceContext::new(DeviceKind::Mcu.protocol()).unwrap();
        let mut surface =
            ControlSurface::new(context, sink, Arc::new(SystemClock::new()), &timing);

        let volume = MemoryParameter::new("Volume", 0.5);
        let params: Vec<ParameterRef> = vec![Arc::clone(&volume) as ParameterRef];
        let provider = Arc::new(FixedParameterProvider::new(params));
        surface.modes_mut().register(
            "mixer",
            Mode::new()
                .with_knobs(Arc::new(ParameterKnobs::new(provider.clone(), 0.01)))
                .with_renderer(Arc::new(ParameterRenderer::new(provider, ControlKind::Knob))),
        );
        surface.request(SurfaceRequest::SetMode("mixer".into()));

        let (tx, rx) = mpsc::channel(16);
        (SurfaceRunner::new(surface, rx, timing), tx, volume)
    }

    #[tokio::test]
    async fn test_runner_initializes_and_flushes() {
        let sink = MemorySink::new();
        let (runner, _tx, _volume) = runner(sink.clone());
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = stop_tx.send(());
        });

        let (_surface, reason) = runner
            .run(None, async {
                let _ = stop_rx.await;
            })
            .await;
        handle.await.unwrap();

        assert_eq!(reason, StopReason::Shutdown);
        let sent = sink.take();
        assert_eq!(sent[0], vec![0xF0, 0x00, 0x00, 0x66, 0x14, 0x00, 0xF7]);
        assert!(sent.contains(&vec![0xB0, 0x30, 0x26]));
    }

    #[tokio::test]
    async fn test_runner_routes_input_and_stops_when_input_closes() {
        let sink = MemorySink::new();
        let (runner, tx, volume) = runner(sink.clone());

        tx.send(vec![0xB0, 0x10, 0x0A]).await.unwrap();
        drop(tx);

        let (_surface, reason) = runner.run(None, std::future::pending()).await;

        assert_eq!(reason, StopReason::InputClosed);
        assert!((volume.value() - 0.6).abs() < 1e-9);
    }
}
