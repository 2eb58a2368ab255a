// One fetch-and-render cycle: selection -> request -> gateway -> parse -> resolve -> charts
use crate::chart::{ChartBackend, ChartSession, ChartSessionManager};
use crate::gateway::MarketGateway;
use crate::model::{Diagnostic, PipelineError};
use crate::notifier::Notifier;
use crate::parser::response_parser::Parser;
use crate::parser::ResponseParser;
use crate::request::{RequestBuilder, UiSelection};
use crate::resolver::SeriesResolver;
use crate::storage::SqliteStorage;
use tracing::{info, warn};

/// What a successful cycle drew.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub bars: usize,
    pub overlays: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Pipeline<'a, G, B, N>
where
    G: MarketGateway,
    B: ChartBackend,
    N: Notifier,
{
    pub gateway: &'a G,
    pub storage: Option<&'a SqliteStorage>,
    pub resolver: &'a SeriesResolver,
    pub charts: &'a mut ChartSessionManager<B>,
    pub notifier: &'a N,
}

impl<G, B, N> Pipeline<'_, G, B, N>
where
    G: MarketGateway,
    B: ChartBackend,
    N: Notifier,
{
    /// Runs one cycle. Any fatal error is shown to the user and leaves the
    /// session exactly as it was.
    pub async fn fetch_and_plot(
        &mut self,
        selection: &UiSelection,
        session: &mut ChartSession<B::Handle>,
    ) -> Result<CycleReport, PipelineError> {
        match self.run(selection, session).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!("Cycle failed ({:?}): {}", e.kind(), e);
                self.notifier.alert(&e.user_message());
                Err(e)
            }
        }
    }

    async fn run(
        &mut self,
        selection: &UiSelection,
        session: &mut ChartSession<B::Handle>,
    ) -> Result<CycleReport, PipelineError> {
        if let Some(storage) = self.storage {
            if let Err(e) = storage.save_selection(selection) {
                warn!("Failed to remember selection: {}", e);
            }
        }

        let request = RequestBuilder::new().build(selection)?;
        info!(
            "Fetching {} {} (methods: {:?})",
            request.instrument, request.timeframe, request.denoise_methods
        );

        self.notifier.busy(true);
        let fetched = self.gateway.fetch_data(&request).await;
        self.notifier.busy(false);
        let raw = fetched?;

        let frame = ResponseParser::new().parse(&raw)?;
        info!("Received {} bars", frame.len());

        let resolution = self
            .resolver
            .resolve(&raw, &frame.time, &request.denoise_methods);
        for diag in &resolution.diagnostics {
            self.notifier.notice(&diag.to_string());
        }

        self.charts.render(
            session,
            &frame,
            &frame.volume_series(),
            &resolution.overlays,
            &request.timeframe,
        )?;

        Ok(CycleReport {
            bars: frame.len(),
            overlays: resolution.overlays.iter().map(|o| o.label.clone()).collect(),
            diagnostics: resolution.diagnostics,
        })
    }
}
