//! Stream frame decoding.
//!
//! Wire format: `{"topic": "...", "payload": {...}, "ts": 1700000000}`.
//! Every field is read defensively; missing or mistyped fields are replaced
//! with placeholders here so nothing downstream sees raw wire values.

use hunter_core::{DetectionEntry, LogLevel};
use serde_json::{Map, Value};

use crate::error::{WsError, WsResult};

/// A decoded frame, one variant per topic.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// `detection`: an on-chain event.
    Detection(DetectionEntry),
    /// `log`: a backend log line.
    Log {
        level: LogLevel,
        logger: Option<String>,
        message: String,
    },
    /// `heartbeat`: liveness signal, carries nothing.
    Heartbeat,
    /// `news`: headline or preview text.
    News { summary: String },
    /// `correlation`: rationale text.
    Correlation { detail: String },
    /// `metric`: payload rendered as compact JSON.
    Metric { payload: String },
    /// Any other non-empty topic.
    Unhandled { topic: String },
}

impl StreamFrame {
    /// Decode raw frame text.
    ///
    /// Returns `Ok(None)` for well-formed JSON without a usable topic and
    /// `Err(WsError::ParseError)` when the text is not JSON at all.
    pub fn parse(text: &str, now_ms: i64) -> WsResult<Option<Self>> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| WsError::ParseError(e.to_string()))?;
        Ok(Self::from_value(&value, now_ms))
    }

    /// Classify an already-parsed frame.
    ///
    /// `now_ms` is used as the detection time when the frame carries no
    /// numeric `ts`.
    pub fn from_value(frame: &Value, now_ms: i64) -> Option<Self> {
        let topic = topic_text(frame.get("topic")?)?;

        let empty = Value::Object(Map::new());
        let payload = match frame.get("payload") {
            None | Some(Value::Null) => &empty,
            Some(p) => p,
        };

        let frame = match topic.as_str() {
            "detection" => {
                let ts_ms = frame
                    .get("ts")
                    .and_then(Value::as_f64)
                    .map(seconds_to_ms)
                    .unwrap_or(now_ms);
                Self::Detection(decode_detection(payload, ts_ms))
            }
            "log" => Self::Log {
                level: str_field(payload, "level")
                    .map(LogLevel::from_label)
                    .unwrap_or(LogLevel::Info),
                logger: str_field(payload, "logger")
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                message: str_field(payload, "message")
                    .map(str::to_string)
                    .unwrap_or_else(|| payload.to_string()),
            },
            "heartbeat" => Self::Heartbeat,
            "news" => Self::News {
                summary: str_field(payload, "preview")
                    .or_else(|| str_field(payload, "title"))
                    .unwrap_or("News update")
                    .to_string(),
            },
            "correlation" => Self::Correlation {
                detail: str_field(payload, "rationale")
                    .unwrap_or("Correlation update")
                    .to_string(),
            },
            "metric" => Self::Metric {
                payload: payload.to_string(),
            },
            _ => Self::Unhandled { topic },
        };

        Some(frame)
    }

    /// Bounded label for metrics (unhandled topics collapse into `other`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Detection(_) => "detection",
            Self::Log { .. } => "log",
            Self::Heartbeat => "heartbeat",
            Self::News { .. } => "news",
            Self::Correlation { .. } => "correlation",
            Self::Metric { .. } => "metric",
            Self::Unhandled { .. } => "other",
        }
    }

    /// Console log line produced by this frame, if any.
    pub fn log_line(&self) -> Option<(LogLevel, String)> {
        match self {
            Self::Detection(detection) => Some((LogLevel::Info, detection.summary())),
            Self::Log {
                level,
                logger,
                message,
            } => {
                let text = match logger {
                    Some(name) => format!("[{name}] {message}"),
                    None => message.clone(),
                };
                Some((*level, text))
            }
            Self::Heartbeat => None,
            Self::News { summary } => Some((LogLevel::Info, format!("News: {summary}"))),
            Self::Correlation { detail } => {
                Some((LogLevel::Info, format!("Correlation: {detail}")))
            }
            Self::Metric { payload } => Some((LogLevel::Debug, format!("Metric: {payload}"))),
            Self::Unhandled { topic } => {
                Some((LogLevel::Debug, format!("Unhandled topic: {topic}")))
            }
        }
    }
}

fn decode_detection(payload: &Value, ts_ms: i64) -> DetectionEntry {
    DetectionEntry {
        ts_ms,
        amm: str_field(payload, "amm")
            .unwrap_or(DetectionEntry::UNKNOWN_AMM)
            .to_string(),
        symbol: str_field(payload, "symbol")
            .filter(|s| !s.is_empty())
            .unwrap_or(DetectionEntry::UNKNOWN_SYMBOL)
            .to_string(),
        base_mint: str_field(payload, "base_mint")
            .unwrap_or(DetectionEntry::UNKNOWN_MINT)
            .to_string(),
        quote_mint: str_field(payload, "quote_mint")
            .unwrap_or(DetectionEntry::UNKNOWN_MINT)
            .to_string(),
        slot: payload.get("slot").and_then(Value::as_u64),
        tx: str_field(payload, "tx_signature").unwrap_or("").to_string(),
    }
}

fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

/// Topic as text. Falsy values (`null`, `false`, `0`, `""`) mean no topic.
fn topic_text(topic: &Value) -> Option<String> {
    match topic {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

fn seconds_to_ms(secs: f64) -> i64 {
    (secs * 1000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_800_000_000_000;

    fn decode(value: Value) -> Option<StreamFrame> {
        StreamFrame::from_value(&value, NOW)
    }

    #[test]
    fn test_detection_full_payload() {
        let frame = decode(json!({
            "topic": "detection",
            "ts": 1700000000,
            "payload": {
                "amm": "RaydiumV4",
                "symbol": "FOO",
                "base_mint": "Base111",
                "quote_mint": "Quote111",
                "slot": 123,
                "tx_signature": "Sig1"
            }
        }));

        let expected = DetectionEntry {
            ts_ms: 1_700_000_000_000,
            amm: "RaydiumV4".to_string(),
            symbol: "FOO".to_string(),
            base_mint: "Base111".to_string(),
            quote_mint: "Quote111".to_string(),
            slot: Some(123),
            tx: "Sig1".to_string(),
        };
        assert_eq!(frame, Some(StreamFrame::Detection(expected)));
    }

    #[test]
    fn test_detection_defaults() {
        let frame = decode(json!({
            "topic": "detection",
            "payload": {"symbol": "", "slot": "12", "amm": 7}
        }));

        let Some(StreamFrame::Detection(d)) = frame else {
            panic!("expected detection");
        };
        assert_eq!(d.ts_ms, NOW);
        assert_eq!(d.amm, "Unknown AMM");
        assert_eq!(d.symbol, "Unknown");
        assert_eq!(d.base_mint, "N/A");
        assert_eq!(d.quote_mint, "N/A");
        assert_eq!(d.slot, None);
        assert_eq!(d.tx, "");
    }

    #[test]
    fn test_detection_fractional_ts() {
        let Some(StreamFrame::Detection(d)) =
            decode(json!({"topic": "detection", "ts": 1700000000.25}))
        else {
            panic!("expected detection");
        };
        assert_eq!(d.ts_ms, 1_700_000_000_250);
    }

    #[test]
    fn test_log_frame() {
        let frame = decode(json!({
            "topic": "log",
            "payload": {"level": "WARN", "logger": "scanner", "message": "slow rpc"}
        }))
        .unwrap();
        assert_eq!(
            frame.log_line(),
            Some((LogLevel::Warning, "[scanner] slow rpc".to_string()))
        );

        let frame = decode(json!({"topic": "log", "payload": {"code": 5}})).unwrap();
        assert_eq!(
            frame.log_line(),
            Some((LogLevel::Info, "{\"code\":5}".to_string()))
        );

        let frame = decode(json!({"topic": "log"})).unwrap();
        assert_eq!(frame.log_line(), Some((LogLevel::Info, "{}".to_string())));
    }

    #[test]
    fn test_news_and_correlation_defaults() {
        let news = decode(json!({"topic": "news", "payload": {"title": "Listing"}})).unwrap();
        assert_eq!(
            news.log_line(),
            Some((LogLevel::Info, "News: Listing".to_string()))
        );

        let news = decode(json!({"topic": "news", "payload": {"preview": "p", "title": "t"}}))
            .unwrap();
        assert_eq!(news.log_line().unwrap().1, "News: p");

        let news = decode(json!({"topic": "news"})).unwrap();
        assert_eq!(news.log_line().unwrap().1, "News: News update");

        let corr = decode(json!({"topic": "correlation", "payload": {"rationale": 3}})).unwrap();
        assert_eq!(
            corr.log_line(),
            Some((LogLevel::Info, "Correlation: Correlation update".to_string()))
        );
    }

    #[test]
    fn test_metric_keeps_payload_order() {
        let frame = StreamFrame::parse(
            r#"{"topic":"metric","payload":{"z":1,"a":{"b":true}}}"#,
            NOW,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            frame.log_line(),
            Some((LogLevel::Debug, "Metric: {\"z\":1,\"a\":{\"b\":true}}".to_string()))
        );
    }

    #[test]
    fn test_heartbeat_has_no_log_line() {
        let frame = decode(json!({"topic": "heartbeat"})).unwrap();
        assert_eq!(frame, StreamFrame::Heartbeat);
        assert_eq!(frame.log_line(), None);
    }

    #[test]
    fn test_unknown_and_missing_topics() {
        let frame = decode(json!({"topic": "orderbook", "payload": {}})).unwrap();
        assert_eq!(
            frame.log_line(),
            Some((LogLevel::Debug, "Unhandled topic: orderbook".to_string()))
        );
        assert_eq!(frame.kind(), "other");

        let frame = decode(json!({"topic": 42})).unwrap();
        assert_eq!(frame.log_line().unwrap().1, "Unhandled topic: 42");

        assert_eq!(decode(json!({"payload": {}})), None);
        assert_eq!(decode(json!({"topic": null})), None);
        assert_eq!(decode(json!({"topic": ""})), None);
        assert_eq!(decode(json!(5)), None);
        assert_eq!(decode(json!([1, 2])), None);
    }

    #[test]
    fn test_falsy_topics_are_ignored() {
        assert_eq!(decode(json!({"topic": false})), None);
        assert_eq!(decode(json!({"topic": 0})), None);
        assert_eq!(decode(json!({"topic": 0.0})), None);
        assert_eq!(StreamFrame::parse(r#"{"topic":false}"#, NOW).unwrap(), None);

        let frame = decode(json!({"topic": true})).unwrap();
        assert_eq!(frame.log_line().unwrap().1, "Unhandled topic: true");
        let frame = decode(json!({"topic": -1})).unwrap();
        assert_eq!(frame.log_line().unwrap().1, "Unhandled topic: -1");
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = StreamFrame::parse("not json", NOW).unwrap_err();
        assert!(matches!(err, WsError::ParseError(_)));
        assert!(StreamFrame::parse("{\"topic\":\"x\"", NOW).is_err());
    }
}
