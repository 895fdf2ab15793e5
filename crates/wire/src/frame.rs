//! `TightBE1`: the one concrete message encoding named in §4.8/§6.2.
//! Big-endian, 4-byte-aligned fixed-width fields; LEB128 varints for counts,
//! handles, and tags; every variable-length field is length-prefixed.

use openrti_buffer::{DecodeCursor, EncodeCursor, ProtocolError, VariableLengthData};

use crate::message::Message;

fn write_string(cursor: &mut EncodeCursor<'_>, s: &str) {
    let bytes = s.as_bytes();
    cursor.write_varint_u64(bytes.len() as u64);
    cursor.write_bytes(bytes);
}

fn read_string(cursor: &mut DecodeCursor<'_>) -> Result<String, ProtocolError> {
    let len = cursor.read_varint_u64()? as usize;
    let bytes = cursor.read_bytes(len)?.to_vec();
    String::from_utf8(bytes).map_err(|e| ProtocolError::other(format!("invalid utf8: {e}")))
}

fn write_blob(cursor: &mut EncodeCursor<'_>, blob: &VariableLengthData) {
    cursor.write_varint_u64(blob.size() as u64);
    cursor.write_bytes(blob.data());
}

fn read_blob(cursor: &mut DecodeCursor<'_>) -> Result<VariableLengthData, ProtocolError> {
    let len = cursor.read_varint_u64()? as usize;
    Ok(VariableLengthData::from_vec(cursor.read_bytes(len)?.to_vec()))
}

fn write_handle_list(cursor: &mut EncodeCursor<'_>, handles: &[u64]) {
    cursor.write_varint_u64(handles.len() as u64);
    for h in handles {
        cursor.write_varint_u64(*h);
    }
}

fn read_handle_list(cursor: &mut DecodeCursor<'_>) -> Result<Vec<u64>, ProtocolError> {
    let count = cursor.read_varint_u64()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        out.push(cursor.read_varint_u64()?);
    }
    Ok(out)
}

fn write_value_map(cursor: &mut EncodeCursor<'_>, values: &[(u64, VariableLengthData)]) {
    cursor.write_varint_u64(values.len() as u64);
    for (handle, value) in values {
        cursor.write_varint_u64(*handle);
        write_blob(cursor, value);
    }
}

fn read_value_map(
    cursor: &mut DecodeCursor<'_>,
) -> Result<Vec<(u64, VariableLengthData)>, ProtocolError> {
    let count = cursor.read_varint_u64()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let handle = cursor.read_varint_u64()?;
        out.push((handle, read_blob(cursor)?));
    }
    Ok(out)
}

fn write_optional_time(cursor: &mut EncodeCursor<'_>, time: &Option<VariableLengthData>) {
    match time {
        Some(t) => {
            cursor.write_u8(1);
            write_blob(cursor, t);
        }
        None => cursor.write_u8(0),
    }
}

fn read_optional_time(
    cursor: &mut DecodeCursor<'_>,
) -> Result<Option<VariableLengthData>, ProtocolError> {
    match cursor.read_u8()? {
        0 => Ok(None),
        _ => Ok(Some(read_blob(cursor)?)),
    }
}

/// Encodes one [`Message`] as a complete `TightBE1` packet: tag varint
/// followed by the variant's fields. Each encoded message is exactly one
/// packet for the stream-buffer packetizer (§4.4/§4.8).
#[must_use]
pub fn encode_message(message: &Message) -> VariableLengthData {
    let mut data = VariableLengthData::new();
    let mut cursor = EncodeCursor::new(&mut data);
    cursor.write_varint_u64(u64::from(message.tag()));
    match message {
        Message::JoinFederationExecutionRequest {
            federate_name,
            federate_type,
            federation_name,
        } => {
            write_string(&mut cursor, federate_name);
            write_string(&mut cursor, federate_type);
            write_string(&mut cursor, federation_name);
        }
        Message::JoinFederationExecutionResponse { federate_handle } => {
            cursor.write_varint_u64(*federate_handle);
        }
        Message::ResignFederationExecutionRequest { federate_handle } => {
            cursor.write_varint_u64(*federate_handle);
        }
        Message::PublishObjectClass {
            federate_handle,
            object_class_handle,
            attribute_handles,
        }
        | Message::SubscribeObjectClass {
            federate_handle,
            object_class_handle,
            attribute_handles,
        } => {
            cursor.write_varint_u64(*federate_handle);
            cursor.write_varint_u64(*object_class_handle);
            write_handle_list(&mut cursor, attribute_handles);
        }
        Message::UpdateAttributeValues {
            object_instance_handle,
            attribute_values,
            time,
        } => {
            cursor.write_varint_u64(*object_instance_handle);
            write_value_map(&mut cursor, attribute_values);
            write_optional_time(&mut cursor, time);
        }
        Message::SendInteraction {
            interaction_class_handle,
            parameter_values,
            time,
        } => {
            cursor.write_varint_u64(*interaction_class_handle);
            write_value_map(&mut cursor, parameter_values);
            write_optional_time(&mut cursor, time);
        }
        Message::TimeAdvanceRequest {
            federate_handle,
            time,
        }
        | Message::TimeAdvanceGrant {
            federate_handle,
            time,
        } => {
            cursor.write_varint_u64(*federate_handle);
            write_blob(&mut cursor, time);
        }
        Message::RegisterFederationSynchronizationPoint { label, tag } => {
            write_string(&mut cursor, label);
            write_blob(&mut cursor, tag);
        }
        Message::SynchronizationPointAchieved {
            federate_handle,
            label,
        } => {
            cursor.write_varint_u64(*federate_handle);
            write_string(&mut cursor, label);
        }
        Message::FederationSynchronized { label } => {
            write_string(&mut cursor, label);
        }
        Message::AttributeOwnershipDivestitureNotification {
            object_instance_handle,
            attribute_handles,
        }
        | Message::AttributeOwnershipAcquisitionNotification {
            object_instance_handle,
            attribute_handles,
        } => {
            cursor.write_varint_u64(*object_instance_handle);
            write_handle_list(&mut cursor, attribute_handles);
        }
        Message::RequestFederationSave { label } | Message::RequestFederationRestore { label } => {
            write_string(&mut cursor, label);
        }
        Message::FederationSaved | Message::FederationRestored => {}
        Message::ConnectionLost { reason } => {
            write_string(&mut cursor, reason);
        }
    }
    data
}

/// Decodes one packet produced by [`encode_message`].
pub fn decode_message(bytes: &[u8]) -> Result<Message, ProtocolError> {
    let mut cursor = DecodeCursor::new(bytes);
    let tag = cursor.read_varint_u64()?;
    let message = match tag {
        0 => Message::JoinFederationExecutionRequest {
            federate_name: read_string(&mut cursor)?,
            federate_type: read_string(&mut cursor)?,
            federation_name: read_string(&mut cursor)?,
        },
        1 => Message::JoinFederationExecutionResponse {
            federate_handle: cursor.read_varint_u64()?,
        },
        2 => Message::ResignFederationExecutionRequest {
            federate_handle: cursor.read_varint_u64()?,
        },
        3 | 4 => {
            let federate_handle = cursor.read_varint_u64()?;
            let object_class_handle = cursor.read_varint_u64()?;
            let attribute_handles = read_handle_list(&mut cursor)?;
            if tag == 3 {
                Message::PublishObjectClass {
                    federate_handle,
                    object_class_handle,
                    attribute_handles,
                }
            } else {
                Message::SubscribeObjectClass {
                    federate_handle,
                    object_class_handle,
                    attribute_handles,
                }
            }
        }
        5 => Message::UpdateAttributeValues {
            object_instance_handle: cursor.read_varint_u64()?,
            attribute_values: read_value_map(&mut cursor)?,
            time: read_optional_time(&mut cursor)?,
        },
        6 => Message::SendInteraction {
            interaction_class_handle: cursor.read_varint_u64()?,
            parameter_values: read_value_map(&mut cursor)?,
            time: read_optional_time(&mut cursor)?,
        },
        7 | 8 => {
            let federate_handle = cursor.read_varint_u64()?;
            let time = read_blob(&mut cursor)?;
            if tag == 7 {
                Message::TimeAdvanceRequest {
                    federate_handle,
                    time,
                }
            } else {
                Message::TimeAdvanceGrant {
                    federate_handle,
                    time,
                }
            }
        }
        9 => Message::RegisterFederationSynchronizationPoint {
            label: read_string(&mut cursor)?,
            tag: read_blob(&mut cursor)?,
        },
        10 => Message::SynchronizationPointAchieved {
            federate_handle: cursor.read_varint_u64()?,
            label: read_string(&mut cursor)?,
        },
        11 => Message::FederationSynchronized {
            label: read_string(&mut cursor)?,
        },
        12 | 13 => {
            let object_instance_handle = cursor.read_varint_u64()?;
            let attribute_handles = read_handle_list(&mut cursor)?;
            if tag == 12 {
                Message::AttributeOwnershipDivestitureNotification {
                    object_instance_handle,
                    attribute_handles,
                }
            } else {
                Message::AttributeOwnershipAcquisitionNotification {
                    object_instance_handle,
                    attribute_handles,
                }
            }
        }
        14 => Message::RequestFederationSave {
            label: read_string(&mut cursor)?,
        },
        15 => Message::FederationSaved,
        16 => Message::RequestFederationRestore {
            label: read_string(&mut cursor)?,
        },
        17 => Message::FederationRestored,
        18 => Message::ConnectionLost {
            reason: read_string(&mut cursor)?,
        },
        other => return Err(ProtocolError::other(format!("unknown message tag {other}"))),
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(message: Message) {
        let encoded = encode_message(&message);
        let decoded = decode_message(encoded.data()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn join_request_round_trips() {
        round_trip(Message::JoinFederationExecutionRequest {
            federate_name: "fed-a".into(),
            federate_type: "Sensor".into(),
            federation_name: "Exercise1".into(),
        });
    }

    #[test]
    fn update_attribute_values_round_trips_with_and_without_time() {
        round_trip(Message::UpdateAttributeValues {
            object_instance_handle: 42,
            attribute_values: vec![(1, VariableLengthData::from_vec(vec![1, 2, 3]))],
            time: Some(VariableLengthData::from_vec(vec![9, 9])),
        });
        round_trip(Message::UpdateAttributeValues {
            object_instance_handle: 42,
            attribute_values: vec![],
            time: None,
        });
    }

    #[test]
    fn connection_lost_round_trips() {
        round_trip(Message::ConnectionLost {
            reason: "peer reset the connection".into(),
        });
    }

    #[test]
    fn unknown_tag_is_a_protocol_error() {
        let mut data = VariableLengthData::new();
        let mut cursor = EncodeCursor::new(&mut data);
        cursor.write_varint_u64(9999);
        assert!(decode_message(data.data()).is_err());
    }
}
