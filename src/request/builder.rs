use crate::model::{
    AnalysisRequest, DenoiseMethod, DenoiseParams, Indicator, RangeSpec, RequestError, Timeframe,
};
use crate::utils::truncate_to_second;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

/// How the user picked the time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum RangeWindow {
    /// Last `num_candles` bars.
    Bars,
    /// Relative window ending now ("1d", "7d", "30d").
    LastDays(u32),
    /// Explicit `date_from`/`date_to`.
    Custom,
}

impl TryFrom<String> for RangeWindow {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "bars" => Ok(RangeWindow::Bars),
            "custom" => Ok(RangeWindow::Custom),
            other => other
                .strip_suffix('d')
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .map(RangeWindow::LastDays)
                .ok_or_else(|| format!("unknown range window: {}", other)),
        }
    }
}

/// A checkbox plus the parameter inputs shown while it is ticked.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodToggle<F> {
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub fields: F,
}

impl<F: Default> Default for MethodToggle<F> {
    fn default() -> Self {
        Self { enabled: false, fields: F::default() }
    }
}

// Parameter inputs are free text, like the HTML form they replace.

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WaveletFields {
    #[serde(deserialize_with = "text_field")]
    pub level: String,
    #[serde(rename = "type")]
    pub wavelet_type: String,
}

impl Default for WaveletFields {
    fn default() -> Self {
        Self { level: "1".into(), wavelet_type: "db4".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KalmanFields {
    #[serde(deserialize_with = "text_field")]
    pub q: String,
    #[serde(deserialize_with = "text_field")]
    pub r: String,
}

impl Default for KalmanFields {
    fn default() -> Self {
        Self { q: "0.01".into(), r: "0.1".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SsaFields {
    #[serde(deserialize_with = "text_field")]
    pub window: String,
    #[serde(deserialize_with = "text_field")]
    pub groups: String,
}

impl Default for SsaFields {
    fn default() -> Self {
        Self { window: "10".into(), groups: "2".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmdFields {
    #[serde(deserialize_with = "text_field")]
    pub imfs: String,
}

impl Default for EmdFields {
    fn default() -> Self {
        Self { imfs: "2".into() }
    }
}

/// Accepts `"0.01"` as well as `0.01`.
fn text_field<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

/// Everything the selection form holds at the moment the user hits "fetch".
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UiSelection {
    pub instrument: String,
    pub timeframe: Timeframe,
    pub num_candles: u32,
    pub window: RangeWindow,
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
    pub sma: bool,
    pub rsi: bool,
    pub wavelet: MethodToggle<WaveletFields>,
    pub kalman: MethodToggle<KalmanFields>,
    pub ssa: MethodToggle<SsaFields>,
    pub emd: MethodToggle<EmdFields>,
}

impl Default for UiSelection {
    fn default() -> Self {
        Self {
            instrument: String::new(),
            timeframe: Timeframe::default(),
            num_candles: 100,
            window: RangeWindow::Bars,
            date_from: None,
            date_to: None,
            sma: false,
            rsi: false,
            wavelet: MethodToggle::default(),
            kalman: MethodToggle::default(),
            ssa: MethodToggle::default(),
            emd: MethodToggle::default(),
        }
    }
}

impl UiSelection {
    /// Applies remembered values over the form. Without a remembered
    /// instrument an empty form falls back to the first listed symbol.
    pub fn restore(&mut self, last: &LastUsed, symbols: &[String]) {
        if let Some(instrument) = &last.instrument {
            self.instrument = instrument.clone();
        } else if self.instrument.trim().is_empty() {
            if let Some(first) = symbols.first() {
                self.instrument = first.clone();
            }
        }
        if let Some(tf) = &last.timeframe {
            self.timeframe = tf.clone();
        }
        if let Some(n) = last.num_candles {
            self.num_candles = n;
        }
    }
}

/// Values persisted between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastUsed {
    pub instrument: Option<String>,
    pub timeframe: Option<Timeframe>,
    pub num_candles: Option<u32>,
}

pub struct RequestBuilder;

impl RequestBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, sel: &UiSelection) -> Result<AnalysisRequest, RequestError> {
        self.build_at(sel, Utc::now())
    }

    /// Builds the request as of `now`, which anchors relative windows.
    pub fn build_at(
        &self,
        sel: &UiSelection,
        now: DateTime<Utc>,
    ) -> Result<AnalysisRequest, RequestError> {
        let instrument = sel.instrument.trim();
        if instrument.is_empty() {
            return Err(RequestError::EmptyInstrument);
        }

        let range = Self::resolve_range(sel, now)?;

        let mut indicators = Vec::new();
        if sel.sma {
            indicators.push(Indicator::Sma);
        }
        if sel.rsi {
            indicators.push(Indicator::Rsi);
        }

        let (denoise_methods, denoise_params) = Self::denoise_settings(sel)?;

        let request = AnalysisRequest {
            instrument: instrument.to_string(),
            timeframe: sel.timeframe.clone(),
            range,
            indicators,
            denoise_methods,
            denoise_params,
        };
        debug_assert!(request.params_consistent());
        debug!("Built request: {:?}", request);
        Ok(request)
    }

    fn resolve_range(sel: &UiSelection, now: DateTime<Utc>) -> Result<RangeSpec, RequestError> {
        match sel.window {
            RangeWindow::Bars => {
                if sel.num_candles == 0 {
                    return Err(RequestError::ZeroBars);
                }
                Ok(RangeSpec::Bars { bars: sel.num_candles })
            }
            RangeWindow::LastDays(days) => {
                let from = Duration::try_days(i64::from(days))
                    .and_then(|span| now.checked_sub_signed(span))
                    .ok_or(RequestError::WindowOutOfRange { days })?;
                Ok(RangeSpec::Dates {
                    date_from: truncate_to_second(from),
                    date_to: truncate_to_second(now),
                })
            }
            RangeWindow::Custom => match (sel.date_from, sel.date_to) {
                (Some(from), Some(to)) if from > to => Err(RequestError::InvertedDateRange),
                (Some(from), Some(to)) => Ok(RangeSpec::Dates { date_from: from, date_to: to }),
                _ => Err(RequestError::MissingDateRange),
            },
        }
    }

    /// Reads each ticked method's own fields; unticked methods add nothing.
    fn denoise_settings(
        sel: &UiSelection,
    ) -> Result<(Vec<DenoiseMethod>, BTreeMap<DenoiseMethod, DenoiseParams>), RequestError> {
        let mut methods = Vec::new();
        let mut params = BTreeMap::new();

        for method in DenoiseMethod::ALL {
            let p = match method {
                DenoiseMethod::Wavelet if sel.wavelet.enabled => {
                    let f = &sel.wavelet.fields;
                    DenoiseParams::Wavelet {
                        level: field(method, "level", &f.level)?,
                        wavelet_type: f.wavelet_type.trim().to_string(),
                    }
                }
                DenoiseMethod::Kalman if sel.kalman.enabled => {
                    let f = &sel.kalman.fields;
                    DenoiseParams::Kalman {
                        q: field(method, "q", &f.q)?,
                        r: field(method, "r", &f.r)?,
                    }
                }
                DenoiseMethod::Ssa if sel.ssa.enabled => {
                    let f = &sel.ssa.fields;
                    DenoiseParams::Ssa {
                        window: field(method, "window", &f.window)?,
                        groups: field(method, "groups", &f.groups)?,
                    }
                }
                DenoiseMethod::Emd if sel.emd.enabled => DenoiseParams::Emd {
                    imfs: field(method, "imfs", &sel.emd.fields.imfs)?,
                },
                _ => continue,
            };
            methods.push(method);
            params.insert(method, p);
        }

        Ok((methods, params))
    }
}

fn field<T: FromStr>(
    method: DenoiseMethod,
    name: &'static str,
    raw: &str,
) -> Result<T, RequestError> {
    raw.trim().parse::<T>().map_err(|_| RequestError::InvalidParameter {
        method,
        field: name,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ErrorKind, PipelineError};
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 9, 15, 42).unwrap() + Duration::milliseconds(512)
    }

    fn selection(instrument: &str) -> UiSelection {
        UiSelection { instrument: instrument.into(), ..UiSelection::default() }
    }

    #[test]
    fn bars_window_uses_candle_count() {
        let mut sel = selection("EURUSD");
        sel.num_candles = 250;
        let req = RequestBuilder::new().build_at(&sel, now()).unwrap();
        assert_eq!(req.range, RangeSpec::Bars { bars: 250 });
        assert!(req.denoise_methods.is_empty());
        assert!(req.denoise_params.is_empty());
    }

    #[test]
    fn relative_window_ends_now_truncated_to_seconds() {
        let mut sel = selection("EURUSD");
        sel.window = RangeWindow::LastDays(7);
        let req = RequestBuilder::new().build_at(&sel, now()).unwrap();
        let expected_to = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap().and_hms_opt(9, 15, 42).unwrap();
        let expected_from = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap().and_hms_opt(9, 15, 42).unwrap();
        assert_eq!(
            req.range,
            RangeSpec::Dates { date_from: expected_from, date_to: expected_to }
        );
    }

    #[test]
    fn custom_window_requires_both_ends() {
        let mut sel = selection("EURUSD");
        sel.window = RangeWindow::Custom;
        sel.date_from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0);
        let err = RequestBuilder::new().build_at(&sel, now()).unwrap_err();
        assert_eq!(err, RequestError::MissingDateRange);

        sel.date_to = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap().and_hms_opt(0, 0, 0);
        let req = RequestBuilder::new().build_at(&sel, now()).unwrap();
        assert_eq!(
            req.range,
            RangeSpec::Dates { date_from: sel.date_from.unwrap(), date_to: sel.date_to.unwrap() }
        );
    }

    #[test]
    fn empty_instrument_and_zero_bars_are_rejected() {
        let sel = selection("  ");
        assert_eq!(
            RequestBuilder::new().build_at(&sel, now()).unwrap_err(),
            RequestError::EmptyInstrument
        );
        let mut sel = selection("EURUSD");
        sel.num_candles = 0;
        assert_eq!(RequestBuilder::new().build_at(&sel, now()).unwrap_err(), RequestError::ZeroBars);
    }

    #[test]
    fn oversized_day_window_is_an_invalid_request() {
        let sel: UiSelection =
            serde_json::from_value(json!({"instrument": "EURUSD", "window": "4000000000d"})).unwrap();
        let err = RequestBuilder::new().build_at(&sel, now()).unwrap_err();
        assert_eq!(err, RequestError::WindowOutOfRange { days: 4_000_000_000 });
        assert_eq!(PipelineError::from(err).kind(), ErrorKind::InvalidRequest);

        // fits in a Duration but lands before the earliest representable date
        let mut sel = selection("EURUSD");
        sel.window = RangeWindow::LastDays(100_000_000);
        assert_eq!(
            RequestBuilder::new().build_at(&sel, now()).unwrap_err(),
            RequestError::WindowOutOfRange { days: 100_000_000 }
        );
    }

    #[test]
    fn ticked_methods_carry_only_their_own_fields() {
        let mut sel = selection("EURUSD");
        sel.kalman.enabled = true;
        sel.emd.enabled = true;
        sel.emd.fields.imfs = "4".into();
        // filled but unticked
        sel.ssa.fields.window = "30".into();

        let req = RequestBuilder::new().build_at(&sel, now()).unwrap();
        assert_eq!(req.denoise_methods, vec![DenoiseMethod::Kalman, DenoiseMethod::Emd]);
        assert_eq!(
            req.denoise_params.get(&DenoiseMethod::Kalman),
            Some(&DenoiseParams::Kalman { q: 0.01, r: 0.1 })
        );
        assert_eq!(req.denoise_params.get(&DenoiseMethod::Emd), Some(&DenoiseParams::Emd { imfs: 4 }));
        assert!(!req.denoise_params.contains_key(&DenoiseMethod::Ssa));
        assert!(req.params_consistent());
    }

    #[test]
    fn garbage_parameter_names_the_field() {
        let mut sel = selection("EURUSD");
        sel.wavelet.enabled = true;
        sel.wavelet.fields.level = "deep".into();
        let err = RequestBuilder::new().build_at(&sel, now()).unwrap_err();
        assert_eq!(
            err,
            RequestError::InvalidParameter {
                method: DenoiseMethod::Wavelet,
                field: "level",
                value: "deep".into()
            }
        );
    }

    #[test]
    fn indicators_follow_toggles() {
        let mut sel = selection("EURUSD");
        sel.rsi = true;
        let req = RequestBuilder::new().build_at(&sel, now()).unwrap();
        assert_eq!(req.indicators, vec![Indicator::Rsi]);
    }

    #[test]
    fn selection_deserializes_numbers_and_windows() {
        let sel: UiSelection = serde_json::from_value(json!({
            "instrument": "GBPUSD",
            "timeframe": "1d",
            "window": "30d",
            "kalman": {"enabled": true, "q": 0.05, "r": "0.2"}
        }))
        .unwrap();
        assert_eq!(sel.timeframe, Timeframe::Day1);
        assert_eq!(sel.window, RangeWindow::LastDays(30));
        assert_eq!(sel.kalman.fields.q, "0.05");
        assert_eq!(sel.kalman.fields.r, "0.2");
        assert!(!sel.wavelet.enabled);
        assert_eq!(sel.num_candles, 100);
    }

    #[test]
    fn restore_prefers_stored_values_then_first_symbol() {
        let symbols = vec!["AUDUSD".to_string(), "EURUSD".to_string()];

        let mut sel = UiSelection::default();
        sel.restore(&LastUsed::default(), &symbols);
        assert_eq!(sel.instrument, "AUDUSD");

        let last = LastUsed {
            instrument: Some("USDJPY".into()),
            timeframe: Some(Timeframe::Min1),
            num_candles: Some(500),
        };
        let mut sel = UiSelection::default();
        sel.restore(&last, &symbols);
        assert_eq!(sel.instrument, "USDJPY");
        assert_eq!(sel.timeframe, Timeframe::Min1);
        assert_eq!(sel.num_candles, 500);
    }
}
