//! Instrument metadata tags
//!
//! Markets carry free-form `key:value` tags. Four keys are meaningful here:
//! `base`, `quote`, `enactment` and `settlement`.

/// Values extracted from a market's metadata tags; absent keys stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentTags {
    pub base: String,
    pub quote: String,
    /// RFC3339 timestamp
    pub enactment: String,
    /// RFC3339 timestamp
    pub settlement: String,
}

impl InstrumentTags {
    /// Split each tag on its first `:` and keep the value when the key
    /// matches exactly. A repeated key keeps the last value.
    pub fn parse<S: AsRef<str>>(tags: &[S]) -> Self {
        let mut parsed = Self::default();

        for tag in tags {
            let Some((key, value)) = tag.as_ref().split_once(':') else {
                continue;
            };
            let slot = match key {
                "base" => &mut parsed.base,
                "quote" => &mut parsed.quote,
                "enactment" => &mut parsed.enactment,
                "settlement" => &mut parsed.settlement,
                _ => continue,
            };
            *slot = value.to_string();
        }

        parsed
    }
}
