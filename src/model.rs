// Core structs: AnalysisRequest, TimeSeries, SeriesDescriptor and error kinds
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Bar size requested from the gateway. Unknown values are kept verbatim
/// so a newer server can still be asked for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Timeframe {
    Min1,
    Hour1,
    Day1,
    Other(String),
}

impl Timeframe {
    pub fn as_str(&self) -> &str {
        match self {
            Timeframe::Min1 => "1min",
            Timeframe::Hour1 => "1h",
            Timeframe::Day1 => "1d",
            Timeframe::Other(s) => s,
        }
    }
}

impl From<String> for Timeframe {
    fn from(s: String) -> Self {
        match s.as_str() {
            "1min" => Timeframe::Min1,
            "1h" => Timeframe::Hour1,
            "1d" => Timeframe::Day1,
            _ => Timeframe::Other(s),
        }
    }
}

impl From<&str> for Timeframe {
    fn from(s: &str) -> Self {
        Timeframe::from(s.to_string())
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.as_str().to_string()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::Hour1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Sma,
    Rsi,
}

/// Server-side smoothing algorithms the form can toggle, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenoiseMethod {
    Wavelet,
    Kalman,
    Ssa,
    Emd,
}

impl DenoiseMethod {
    pub const ALL: [DenoiseMethod; 4] = [
        DenoiseMethod::Wavelet,
        DenoiseMethod::Kalman,
        DenoiseMethod::Ssa,
        DenoiseMethod::Emd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DenoiseMethod::Wavelet => "wavelet",
            DenoiseMethod::Kalman => "kalman",
            DenoiseMethod::Ssa => "ssa",
            DenoiseMethod::Emd => "emd",
        }
    }
}

impl fmt::Display for DenoiseMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter object sent under `denoise_settings.<method>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DenoiseParams {
    Wavelet {
        level: u32,
        #[serde(rename = "type")]
        wavelet_type: String,
    },
    Kalman {
        q: f64,
        r: f64,
    },
    Ssa {
        window: u32,
        groups: u32,
    },
    Emd {
        imfs: u32,
    },
}

impl DenoiseParams {
    pub fn method(&self) -> DenoiseMethod {
        match self {
            DenoiseParams::Wavelet { .. } => DenoiseMethod::Wavelet,
            DenoiseParams::Kalman { .. } => DenoiseMethod::Kalman,
            DenoiseParams::Ssa { .. } => DenoiseMethod::Ssa,
            DenoiseParams::Emd { .. } => DenoiseMethod::Emd,
        }
    }
}

/// Either a candle count or an explicit window, flattened into the request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RangeSpec {
    Bars {
        bars: u32,
    },
    Dates {
        #[serde(serialize_with = "second_precision")]
        date_from: NaiveDateTime,
        #[serde(serialize_with = "second_precision")]
        date_to: NaiveDateTime,
    },
}

fn second_precision<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&crate::utils::format_request_time(dt))
}

/// Body of `POST /fetch_data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub instrument: String,
    pub timeframe: Timeframe,
    #[serde(flatten)]
    pub range: RangeSpec,
    pub indicators: Vec<Indicator>,
    pub denoise_methods: Vec<DenoiseMethod>,
    #[serde(rename = "denoise_settings")]
    pub denoise_params: BTreeMap<DenoiseMethod, DenoiseParams>,
}

impl AnalysisRequest {
    /// Checks that every parameter object belongs to a requested method
    /// and carries that method's own fields.
    pub fn params_consistent(&self) -> bool {
        self.denoise_params
            .iter()
            .all(|(m, p)| p.method() == *m && self.denoise_methods.contains(m))
    }
}

/// Decoded `/fetch_data` body; keys keep the order the server wrote them in.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawResponse(pub Map<String, Value>);

impl RawResponse {
    /// Present and not `null`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<Value> for RawResponse {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => RawResponse(map),
            _ => RawResponse::default(),
        }
    }
}

/// Ordered `(instant, value)` pairs. Gaps in the source data are NaN.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    pub points: Vec<(DateTime<Utc>, f64)>,
}

impl TimeSeries {
    /// Pairs a time array with a value array; `None` when the lengths differ.
    pub fn pair(times: &[DateTime<Utc>], values: &[f64]) -> Option<Self> {
        if times.len() != values.len() {
            return None;
        }
        Some(Self {
            points: times.iter().copied().zip(values.iter().copied()).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// Validated base payload: equal-length parallel arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvFrame {
    pub time: Vec<DateTime<Utc>>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl OhlcvFrame {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    fn column(&self, values: &[f64]) -> TimeSeries {
        TimeSeries {
            points: self.time.iter().copied().zip(values.iter().copied()).collect(),
        }
    }

    pub fn open_series(&self) -> TimeSeries {
        self.column(&self.open)
    }

    pub fn high_series(&self) -> TimeSeries {
        self.column(&self.high)
    }

    pub fn low_series(&self) -> TimeSeries {
        self.column(&self.low)
    }

    pub fn close_series(&self) -> TimeSeries {
        self.column(&self.close)
    }

    pub fn volume_series(&self) -> TimeSeries {
        self.column(&self.volume)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeriesKind {
    PriceLine,
    Overlay,
    BoundedIndicator,
}

/// RGB colour with alpha, rendered as `#rrggbb` or `rgba(...)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_css(&self) -> String {
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_css())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

/// A resolved overlay, never mutated after the resolver builds it.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesDescriptor {
    pub label: String,
    pub kind: SeriesKind,
    pub color: Rgba,
    pub dashed: bool,
    pub data: TimeSeries,
    pub secondary_axis: Option<AxisRange>,
}

/// Non-fatal problem with a single overlay candidate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("time data not found for {value_key} (expected {time_key})")]
    MissingPair { value_key: String, time_key: String },
    #[error("{value_key} has {values} values but {time_key} has {times} timestamps")]
    LengthMismatch {
        value_key: String,
        time_key: String,
        values: usize,
        times: usize,
    },
    #[error("{key} is not a numeric array")]
    NotNumeric { key: String },
    #[error("{key} is not a timestamp array")]
    BadTimestamps { key: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("instrument is empty")]
    EmptyInstrument,
    #[error("number of candles must be greater than zero")]
    ZeroBars,
    #[error("custom range requires both a start and an end date")]
    MissingDateRange,
    #[error("date range starts after it ends")]
    InvertedDateRange,
    #[error("a {days}-day window reaches past the supported date range")]
    WindowOutOfRange { days: u32 },
    #[error("invalid {method} parameter {field}: {value:?}")]
    InvalidParameter {
        method: DenoiseMethod,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{0}")]
    ServerError(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to create {slot} chart: {reason}")]
    CreateFailed { slot: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    ServerError,
    MalformedResponse,
    NetworkFailure,
    RenderFailure,
}

/// Fatal outcome of one fetch-and-render cycle.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Network(#[from] GatewayError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Render(#[from] ChartError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Request(_) => ErrorKind::InvalidRequest,
            PipelineError::Network(_) => ErrorKind::NetworkFailure,
            PipelineError::Parse(ParseError::ServerError(_)) => ErrorKind::ServerError,
            PipelineError::Parse(ParseError::MalformedResponse(_)) => ErrorKind::MalformedResponse,
            PipelineError::Render(_) => ErrorKind::RenderFailure,
        }
    }

    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Request(e) => format!("Invalid selection: {}", e),
            PipelineError::Network(e) => format!("Error fetching data: {}", e),
            PipelineError::Parse(ParseError::ServerError(msg)) => format!("Error: {}", msg),
            PipelineError::Parse(ParseError::MalformedResponse(_)) => {
                "OHLC data is missing from the response.".to_string()
            }
            PipelineError::Render(e) => format!("Error drawing charts: {}", e),
        }
    }
}
