/// Errors surfaced by configuration validation and encoding.
///
/// Decoding has no error path: every malformed input is absorbed by the
/// state machine and accounted for in [`crate::DecoderStats`].
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The base timing quantum is zero.
    #[error("unit duration must be positive")]
    InvalidUnitDuration,

    /// A unit-count parameter is zero.
    #[error("{0} must be positive")]
    InvalidUnitCount(&'static str),

    /// The payload cap is zero or exceeds the wire-format maximum.
    #[error("max payload {cap} out of range (1..={max})")]
    InvalidPayloadCap { cap: usize, max: usize },

    /// The drift fraction is negative, NaN, or infinite.
    #[error("allowed drift fraction {0} must be finite and non-negative")]
    InvalidDriftFraction(f64),

    /// An Off preamble mark would be indistinguishable from idle.
    #[error("preamble color must not be off")]
    InvalidPreambleColor,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Encoding would exceed the bounded signal-change budget.
    #[error("signal buffer overflow (needs more than {max} changes)")]
    SignalOverflow { max: usize },

    /// A pulse duration does not fit in u32 microseconds.
    #[error("pulse duration overflows u32 microseconds")]
    DurationOverflow,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
