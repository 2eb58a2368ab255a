use crate::model::{
    AxisRange, DenoiseMethod, Diagnostic, RawResponse, SeriesDescriptor, SeriesKind, TimeSeries,
};
use crate::parser::key_grammar::{classify, companion_time_key, KeyRole};
use crate::parser::response_parser::{numeric_array, time_array};
use crate::resolver::palette;
use crate::utils::capitalize;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Range of the secondary axis RSI is drawn against.
pub const BOUNDED_RANGE: AxisRange = AxisRange { min: 0.0, max: 100.0 };

const DEFAULT_DENOISED_KEY: &str = "denoised_close";

/// Overlays in draw order plus everything that had to be skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub overlays: Vec<SeriesDescriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    fn push(&mut self, candidate: Result<SeriesDescriptor, Diagnostic>) -> bool {
        match candidate {
            Ok(desc) => {
                self.overlays.push(desc);
                true
            }
            Err(diag) => {
                warn!("Skipping overlay: {}", diag);
                self.diagnostics.push(diag);
                false
            }
        }
    }
}

pub struct SeriesResolver {
    /// Known method names, ascending.
    methods: Vec<String>,
}

impl SeriesResolver {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut methods: Vec<String> = methods.into_iter().map(Into::into).collect();
        methods.sort();
        methods.dedup();
        Self { methods }
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    /// Resolves indicators, then the default denoised curve, then one curve
    /// per known method. Resolution looks only at the response: a method the
    /// request did not ask for is still drawn if the server sent it.
    pub fn resolve(
        &self,
        raw: &RawResponse,
        base_time: &[DateTime<Utc>],
        requested: &[DenoiseMethod],
    ) -> Resolution {
        let mut out = Resolution::default();

        if raw.contains("sma") {
            out.push(pair_with_base(raw, "sma", base_time).map(|data| SeriesDescriptor {
                label: "SMA".into(),
                kind: SeriesKind::Overlay,
                color: palette::SMA,
                dashed: false,
                data,
                secondary_axis: None,
            }));
        }
        if raw.contains("rsi") {
            out.push(pair_with_base(raw, "rsi", base_time).map(|data| SeriesDescriptor {
                label: "RSI".into(),
                kind: SeriesKind::BoundedIndicator,
                color: palette::RSI,
                dashed: false,
                data,
                secondary_axis: Some(BOUNDED_RANGE),
            }));
        }

        if raw.contains(DEFAULT_DENOISED_KEY) {
            out.push(
                pair_with_base(raw, DEFAULT_DENOISED_KEY, base_time).map(|data| SeriesDescriptor {
                    label: "Default Denoised".into(),
                    kind: SeriesKind::Overlay,
                    color: palette::DEFAULT_DENOISED,
                    dashed: true,
                    data,
                    secondary_axis: None,
                }),
            );
        }

        for method in &self.methods {
            // A failed candidate does not use up the method; the next
            // matching key gets a chance.
            for key in raw.keys() {
                let Some(m) = classify(key, &self.methods) else { continue };
                if m.method != method.as_str() || m.role != KeyRole::Value {
                    continue;
                }
                debug!("Found denoised data for method {}, key: {}", method, key);
                if out.push(self.method_overlay(raw, method, key)) {
                    if !requested.iter().any(|r| r.as_str() == method.as_str()) {
                        info!("Server returned {} data that was not requested; drawing it", method);
                    }
                    break;
                }
            }
        }

        out
    }

    fn method_overlay(
        &self,
        raw: &RawResponse,
        method: &str,
        value_key: &str,
    ) -> Result<SeriesDescriptor, Diagnostic> {
        let time_key = companion_time_key(value_key).ok_or_else(|| Diagnostic::MissingPair {
            value_key: value_key.to_string(),
            time_key: String::new(),
        })?;
        let times_raw = raw.get(&time_key).ok_or_else(|| Diagnostic::MissingPair {
            value_key: value_key.to_string(),
            time_key: time_key.clone(),
        })?;
        let times = time_array(times_raw).ok_or_else(|| Diagnostic::BadTimestamps {
            key: time_key.clone(),
        })?;
        let data = pair(raw, value_key, &time_key, &times)?;

        Ok(SeriesDescriptor {
            label: capitalize(method),
            kind: SeriesKind::Overlay,
            color: palette::method_color(method),
            dashed: true,
            data,
            secondary_axis: None,
        })
    }
}

fn pair_with_base(
    raw: &RawResponse,
    key: &str,
    base_time: &[DateTime<Utc>],
) -> Result<TimeSeries, Diagnostic> {
    pair(raw, key, "time", base_time)
}

fn pair(
    raw: &RawResponse,
    value_key: &str,
    time_key: &str,
    times: &[DateTime<Utc>],
) -> Result<TimeSeries, Diagnostic> {
    let values = raw
        .get(value_key)
        .and_then(numeric_array)
        .ok_or_else(|| Diagnostic::NotNumeric { key: value_key.to_string() })?;
    TimeSeries::pair(times, &values).ok_or_else(|| Diagnostic::LengthMismatch {
        value_key: value_key.to_string(),
        time_key: time_key.to_string(),
        values: values.len(),
        times: times.len(),
    })
}
