//! Turning one raw log into a `DecodedEvent`.

use chainbind_core::{AbiCodec, BindError, DecodedEvent, FromEventFields, Log};

/// Decode `raw` as an occurrence of `event`.
///
/// topic0 must equal the event's signature hash (not checked for anonymous
/// events); a mismatch is rejected before any field is decoded.
pub fn decode_log<T: FromEventFields>(
    raw: Log,
    event: &str,
    codec: &dyn AbiCodec,
) -> Result<DecodedEvent<T>, BindError> {
    if let Some(expected) = codec.event_topic(event)? {
        match raw.topic0() {
            Some(got) if *got == expected => {}
            got => {
                return Err(BindError::SignatureMismatch {
                    event: event.to_string(),
                    expected: format!("{expected:#x}"),
                    got: got.map_or_else(|| "<no topics>".to_string(), |t| format!("{t:#x}")),
                })
            }
        }
    }

    let fields = codec.decode_log(event, &raw.topics, &raw.data)?;
    let event = T::from_fields(fields)?;
    Ok(DecodedEvent { event, raw })
}
