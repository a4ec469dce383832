use serde_json::Value;

/// One JSON value read from or written to an agent's stdio, one per line.
///
/// The discriminator field name is agent-specific (`type`, `sessionUpdate`,
/// `method`, ...) so `ProtocolFrame` keeps the raw value around rather than
/// committing to a single schema; per-dialect decoders in `fleetline-providers`
/// pick the discriminator they expect.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolFrame(Value);

impl ProtocolFrame {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Look up a top-level string field, the common shape for discriminators.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.0.get(name)?.as_str()
    }

    /// Serialise to a single line of newline-delimited JSON (no trailing `\n`).
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        Ok(Self(serde_json::from_str(line)?))
    }
}

impl From<Value> for ProtocolFrame {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
