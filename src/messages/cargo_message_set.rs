//! Cargo message sets: batches of encapsulated messages relayed in one cargo.

use chrono::{DateTime, Utc};
use der::asn1::OctetString;
use der::{Decode, Encode};
use futures::{Stream, StreamExt};

use crate::error::{AwalaError, Result};

/// The biggest service data unit a cargo payload may encapsulate, chosen so
/// the ciphertext stays within the RAMF payload cap.
pub const MAX_SDU_PLAINTEXT_LENGTH: usize = 8_322_048;

/// An ASN.1 SEQUENCE of OCTET STRINGs, each an encapsulated message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CargoMessageSet {
    pub messages: Vec<Vec<u8>>,
}

impl CargoMessageSet {
    pub fn new(messages: Vec<Vec<u8>>) -> CargoMessageSet {
        CargoMessageSet { messages }
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let items = self
            .messages
            .iter()
            .map(|message| {
                OctetString::new(message.clone()).map_err(|e| {
                    AwalaError::InvalidMessage(format!("Failed to encode message: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        items
            .to_der()
            .map_err(|e| AwalaError::InvalidMessage(format!("Failed to encode message set: {e}")))
    }

    pub fn deserialize(serialization: &[u8]) -> Result<CargoMessageSet> {
        let items = Vec::<OctetString>::from_der(serialization).map_err(|e| {
            AwalaError::InvalidMessage(format!("Serialization is not a valid CargoMessageSet: {e}"))
        })?;
        Ok(CargoMessageSet {
            messages: items
                .into_iter()
                .map(|item| item.as_bytes().to_vec())
                .collect(),
        })
    }
}

/// An encapsulated message awaiting batching, with the date its enclosing
/// cargo must not outlive.
#[derive(Debug, Clone)]
pub struct CargoMessageWithExpiry {
    pub message_serialized: Vec<u8>,
    pub expiry_date: DateTime<Utc>,
}

/// A serialized CargoMessageSet and the latest expiry date across its
/// messages.
#[derive(Debug, Clone)]
pub struct CargoMessageSetBatch {
    pub message_serialized: Vec<u8>,
    pub expiry_date: DateTime<Utc>,
}

struct BatchState<S> {
    source: S,
    carried: Option<CargoMessageWithExpiry>,
    done: bool,
}

/// Lazily pack messages into cargo message sets.
///
/// Batches are filled greedily until adding the next message would push the
/// serialization past the SDU limit; input order is preserved and each
/// batch's expiry is the maximum across its messages. A single message too
/// large for an empty batch fails the stream.
pub fn batch_messages_serialized<S>(
    messages: S,
) -> impl Stream<Item = Result<CargoMessageSetBatch>>
where
    S: Stream<Item = Result<CargoMessageWithExpiry>> + Unpin,
{
    let state = BatchState {
        source: messages,
        carried: None,
        done: false,
    };
    futures::stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        let mut batch_messages: Vec<Vec<u8>> = Vec::new();
        let mut content_length = 0usize;
        let mut expiry_date: Option<DateTime<Utc>> = None;
        loop {
            let next = match state.carried.take() {
                Some(message) => Some(Ok(message)),
                None => state.source.next().await,
            };
            let Some(next) = next else {
                state.done = true;
                let batch = expiry_date.map(|expiry| build_batch(batch_messages, expiry));
                return batch.map(|batch| (batch, state));
            };
            let message = match next {
                Ok(message) => message,
                Err(error) => {
                    state.done = true;
                    return Some((Err(error), state));
                }
            };

            let item_length = der_tlv_length(message.message_serialized.len());
            if MAX_SDU_PLAINTEXT_LENGTH < der_tlv_length(item_length) {
                state.done = true;
                return Some((
                    Err(AwalaError::RamfSyntax(format!(
                        "Cargo messages must not exceed {MAX_SDU_PLAINTEXT_LENGTH} octets ({} octets given)",
                        message.message_serialized.len()
                    ))),
                    state,
                ));
            }
            if let Some(expiry) = expiry_date {
                if MAX_SDU_PLAINTEXT_LENGTH < der_tlv_length(content_length + item_length) {
                    state.carried = Some(message);
                    return Some((build_batch(batch_messages, expiry), state));
                }
            }

            content_length += item_length;
            expiry_date = Some(match expiry_date {
                Some(current) => current.max(message.expiry_date),
                None => message.expiry_date,
            });
            batch_messages.push(message.message_serialized);
        }
    })
}

fn build_batch(messages: Vec<Vec<u8>>, expiry_date: DateTime<Utc>) -> Result<CargoMessageSetBatch> {
    let message_serialized = CargoMessageSet::new(messages).serialize()?;
    Ok(CargoMessageSetBatch {
        message_serialized,
        expiry_date,
    })
}

/// The DER TLV size of a primitive value with `content_length` content octets.
fn der_tlv_length(content_length: usize) -> usize {
    let length_of_length = if content_length < 0x80 {
        1
    } else {
        1 + (usize::BITS as usize / 8 - (content_length.leading_zeros() as usize / 8))
    };
    1 + length_of_length + content_length
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use futures::stream;

    fn message(payload: Vec<u8>, expiry_offset_secs: i64) -> Result<CargoMessageWithExpiry> {
        Ok(CargoMessageWithExpiry {
            message_serialized: payload,
            expiry_date: Utc::now() + Duration::seconds(expiry_offset_secs),
        })
    }

    #[test]
    fn set_serialization_round_trips() {
        let set = CargoMessageSet::new(vec![vec![1, 2, 3], vec![], vec![0xFF; 300]]);
        let serialization = set.serialize().unwrap();
        assert_eq!(CargoMessageSet::deserialize(&serialization).unwrap(), set);
    }

    #[test]
    fn malformed_set_serialization_is_rejected() {
        assert!(matches!(
            CargoMessageSet::deserialize(b"not a sequence"),
            Err(AwalaError::InvalidMessage(_))
        ));
    }

    #[tokio::test]
    async fn empty_stream_yields_no_batches() {
        let batches: Vec<_> =
            batch_messages_serialized(stream::iter(Vec::<Result<CargoMessageWithExpiry>>::new()))
                .collect()
                .await;
        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn small_messages_share_one_batch_with_max_expiry() {
        let input = vec![message(vec![1; 10], 100), message(vec![2; 20], 500)];
        let expected_expiry = input[1].as_ref().unwrap().expiry_date;
        let batches: Vec<_> = batch_messages_serialized(stream::iter(input)).collect().await;
        assert_eq!(batches.len(), 1);
        let batch = batches[0].as_ref().unwrap();
        assert_eq!(batch.expiry_date, expected_expiry);

        let set = CargoMessageSet::deserialize(&batch.message_serialized).unwrap();
        assert_eq!(set.messages, vec![vec![1; 10], vec![2; 20]]);
    }

    #[tokio::test]
    async fn batches_split_before_exceeding_the_sdu_limit() {
        let big = vec![0u8; MAX_SDU_PLAINTEXT_LENGTH / 2];
        let input = vec![
            message(big.clone(), 10),
            message(big.clone(), 20),
            message(big.clone(), 30),
        ];
        let batches: Vec<_> = batch_messages_serialized(stream::iter(input)).collect().await;
        assert_eq!(batches.len(), 3);
        for batch in &batches {
            let batch = batch.as_ref().unwrap();
            assert!(batch.message_serialized.len() <= MAX_SDU_PLAINTEXT_LENGTH);
        }
    }

    #[tokio::test]
    async fn oversized_message_fails_the_stream() {
        let input = vec![message(vec![0u8; MAX_SDU_PLAINTEXT_LENGTH], 10)];
        let batches: Vec<_> = batch_messages_serialized(stream::iter(input)).collect().await;
        assert_eq!(batches.len(), 1);
        assert!(matches!(
            batches[0],
            Err(AwalaError::RamfSyntax(_))
        ));
    }

    #[tokio::test]
    async fn input_order_is_preserved_across_batches() {
        let almost_full = vec![7u8; MAX_SDU_PLAINTEXT_LENGTH - 100];
        let input = vec![
            message(almost_full.clone(), 10),
            message(vec![1], 20),
            message(vec![2], 5),
        ];
        let batches: Vec<_> = batch_messages_serialized(stream::iter(input)).collect().await;
        assert_eq!(batches.len(), 2);
        let second = CargoMessageSet::deserialize(
            &batches[1].as_ref().unwrap().message_serialized,
        )
        .unwrap();
        assert_eq!(second.messages, vec![vec![1], vec![2]]);
    }
}
