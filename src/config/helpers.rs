use serde::{Deserialize, Deserializer, de};
use std::{fmt, time::Duration};
use url::Url;

/// Custom deserializer for Duration from milliseconds
pub fn deserialize_duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

/// Custom deserializer for Duration from seconds
pub fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

/// Custom deserializer for a websocket URL. Only `ws` and `wss` schemes are
/// accepted.
pub fn deserialize_ws_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let url = Url::parse(&s).map_err(de::Error::custom)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(de::Error::custom(format!("unsupported websocket scheme '{other}'"))),
    }
}

/// Custom deserializer for a keyword list.
///
/// Accepts either a sequence or a single comma-separated string, which is what
/// an environment override produces. Numeric entries (a bare `777` in YAML)
/// are kept as their textual form.
pub fn deserialize_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct KeywordsVisitor;

    impl<'de> de::Visitor<'de> for KeywordsVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of keywords or a comma-separated string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.split(',').map(|k| k.trim().to_string()).collect())
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut keywords = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(Keyword(k)) = seq.next_element()? {
                keywords.push(k.trim().to_string());
            }
            Ok(keywords)
        }
    }

    deserializer.deserialize_any(KeywordsVisitor)
}

/// A single keyword entry that tolerates numeric scalars.
struct Keyword(String);

impl<'de> Deserialize<'de> for Keyword {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeywordVisitor;

        impl de::Visitor<'_> for KeywordVisitor {
            type Value = Keyword;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a keyword")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Keyword, E> {
                Ok(Keyword(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Keyword, E> {
                Ok(Keyword(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Keyword, E> {
                Ok(Keyword(v.to_string()))
            }
        }

        deserializer.deserialize_any(KeywordVisitor)
    }
}
