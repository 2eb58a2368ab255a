use crate::chart::{ChartBackend, ChartSlot};
use crate::chart::config::{price_chart, volume_chart, ChartConfig};
use crate::model::{ChartError, OhlcvFrame, SeriesDescriptor, Timeframe, TimeSeries};
use tracing::{debug, info};

/// A chart that is currently drawn, with the definition it was built from.
#[derive(Debug)]
pub struct LiveChart<H> {
    pub handle: H,
    pub config: ChartConfig,
}

/// The two chart slots of the display. Only `ChartSessionManager` swaps
/// their contents.
#[derive(Debug)]
pub struct ChartSession<H> {
    price: Option<LiveChart<H>>,
    volume: Option<LiveChart<H>>,
}

impl<H> Default for ChartSession<H> {
    fn default() -> Self {
        Self { price: None, volume: None }
    }
}

impl<H> ChartSession<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price(&self) -> Option<&LiveChart<H>> {
        self.price.as_ref()
    }

    pub fn volume(&self) -> Option<&LiveChart<H>> {
        self.volume.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.volume.is_none()
    }
}

pub struct ChartSessionManager<B: ChartBackend> {
    backend: B,
}

impl<B: ChartBackend> ChartSessionManager<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Builds both definitions first, then replaces each slot: the old
    /// instance is destroyed before its successor is created.
    pub fn render(
        &mut self,
        session: &mut ChartSession<B::Handle>,
        base: &OhlcvFrame,
        volume: &TimeSeries,
        overlays: &[SeriesDescriptor],
        timeframe: &Timeframe,
    ) -> Result<(), ChartError> {
        let price_cfg = price_chart(base, overlays, timeframe);
        let volume_cfg = volume_chart(volume, timeframe);
        debug!(
            "Rendering {} price datasets, {} volume bars",
            price_cfg.data.datasets.len(),
            volume.len()
        );

        Self::replace(&mut self.backend, &mut session.price, ChartSlot::Price, price_cfg)?;
        Self::replace(&mut self.backend, &mut session.volume, ChartSlot::Volume, volume_cfg)?;
        Ok(())
    }

    /// Destroys whatever is drawn.
    pub fn clear(&mut self, session: &mut ChartSession<B::Handle>) {
        for slot in [&mut session.price, &mut session.volume] {
            if let Some(old) = slot.take() {
                self.backend.destroy(old.handle);
            }
        }
    }

    fn replace(
        backend: &mut B,
        slot: &mut Option<LiveChart<B::Handle>>,
        which: ChartSlot,
        config: ChartConfig,
    ) -> Result<(), ChartError> {
        if let Some(old) = slot.take() {
            info!("Destroying previous {} chart", which);
            backend.destroy(old.handle);
        }
        let handle = backend.create(which, &config)?;
        *slot = Some(LiveChart { handle, config });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::config::TimeUnit;
    use crate::model::{AxisRange, SeriesKind};
    use crate::resolver::palette;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeSet;

    /// Tracks which handles are alive and the order of calls.
    #[derive(Default)]
    struct RecordingBackend {
        next: u32,
        live: BTreeSet<(u32, &'static str)>,
        calls: Vec<String>,
    }

    impl ChartBackend for RecordingBackend {
        type Handle = (u32, &'static str);

        fn create(&mut self, slot: ChartSlot, _config: &ChartConfig) -> Result<Self::Handle, ChartError> {
            self.next += 1;
            let name = match slot {
                ChartSlot::Price => "price",
                ChartSlot::Volume => "volume",
            };
            let h = (self.next, name);
            self.live.insert(h);
            self.calls.push(format!("create {}#{}", name, self.next));
            Ok(h)
        }

        fn destroy(&mut self, handle: Self::Handle) {
            assert!(self.live.remove(&handle), "destroyed a dead chart");
            self.calls.push(format!("destroy {}#{}", handle.1, handle.0));
        }
    }

    fn frame(n: usize) -> OhlcvFrame {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let v: Vec<f64> = (0..n).map(|i| 1.1 + i as f64 / 1000.0).collect();
        OhlcvFrame {
            time: (0..n).map(|i| start + Duration::hours(i as i64)).collect(),
            open: v.clone(),
            high: v.clone(),
            low: v.clone(),
            close: v.clone(),
            volume: v,
        }
    }

    fn overlays(base: &OhlcvFrame) -> Vec<SeriesDescriptor> {
        vec![
            SeriesDescriptor {
                label: "RSI".into(),
                kind: SeriesKind::BoundedIndicator,
                color: palette::RSI,
                dashed: false,
                data: base.close_series(),
                secondary_axis: Some(AxisRange { min: 0.0, max: 100.0 }),
            },
            SeriesDescriptor {
                label: "Wavelet".into(),
                kind: SeriesKind::Overlay,
                color: palette::method_color("wavelet"),
                dashed: true,
                data: base.close_series(),
                secondary_axis: None,
            },
        ]
    }

    #[test]
    fn second_render_leaves_exactly_one_live_chart_per_slot() {
        let base = frame(10);
        let mut mgr = ChartSessionManager::new(RecordingBackend::default());
        let mut session = ChartSession::new();

        mgr.render(&mut session, &base, &base.volume_series(), &[], &Timeframe::Hour1).unwrap();
        mgr.render(&mut session, &base, &base.volume_series(), &[], &Timeframe::Hour1).unwrap();

        let backend = mgr.backend();
        assert_eq!(backend.live.len(), 2);
        assert_eq!(session.price().unwrap().handle, (3, "price"));
        assert_eq!(session.volume().unwrap().handle, (4, "volume"));
        assert_eq!(
            backend.calls,
            [
                "create price#1",
                "create volume#2",
                "destroy price#1",
                "create price#3",
                "destroy volume#2",
                "create volume#4",
            ]
        );
    }

    #[test]
    fn rendering_twice_gives_identical_definitions() {
        let base = frame(5);
        let extra = overlays(&base);
        let mut mgr = ChartSessionManager::new(RecordingBackend::default());
        let mut session = ChartSession::new();

        mgr.render(&mut session, &base, &base.volume_series(), &extra, &Timeframe::Day1).unwrap();
        let first_price = session.price().unwrap().config.clone();
        let first_volume = session.volume().unwrap().config.clone();
        mgr.render(&mut session, &base, &base.volume_series(), &extra, &Timeframe::Day1).unwrap();

        assert_eq!(session.price().unwrap().config, first_price);
        assert_eq!(session.volume().unwrap().config, first_volume);
        let labels: Vec<_> = first_price.data.datasets.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["Close", "Open", "High", "Low", "RSI", "Wavelet"]);
    }

    #[test]
    fn volume_chart_shares_time_unit() {
        let base = frame(3);
        let mut mgr = ChartSessionManager::new(RecordingBackend::default());
        let mut session = ChartSession::new();
        mgr.render(&mut session, &base, &base.volume_series(), &[], &Timeframe::Min1).unwrap();

        let price = &session.price().unwrap().config;
        let volume = &session.volume().unwrap().config;
        assert_eq!(price.options.scales.x.time.unit, TimeUnit::Minute);
        assert_eq!(volume.options.scales.x.time.unit, TimeUnit::Minute);
        assert_eq!(volume.data.datasets.len(), 1);
        assert_eq!(volume.data.datasets[0].data.len(), 3);
    }

    #[test]
    fn clear_destroys_both_slots() {
        let base = frame(2);
        let mut mgr = ChartSessionManager::new(RecordingBackend::default());
        let mut session = ChartSession::new();
        mgr.render(&mut session, &base, &base.volume_series(), &[], &Timeframe::Hour1).unwrap();
        mgr.clear(&mut session);
        assert!(session.is_empty());
        assert!(mgr.backend().live.is_empty());
    }
}
