use bytes::BytesMut;
use std::io;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::domain::broker_system_model::intercomponent::protocol::Envelope;

/// Length-delimited framing with bincode-encoded envelopes.
pub struct EnvelopeCodec {
    codec: LengthDelimitedCodec,
}

impl EnvelopeCodec {
    pub fn new() -> Self {
        Self { codec: LengthDelimitedCodec::new() }
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = bincode::serialize(&item).map_err(io::Error::other)?;
        self.codec.encode(bytes::Bytes::from(bytes), dst)
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.codec.decode(src)? {
            Some(bytes) => {
                let item = bincode::deserialize(&bytes).map_err(io::Error::other)?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::broker_system_model::intercomponent::error_translation::{WireCondition, WireError};
    use crate::domain::broker_system_model::intercomponent::protocol::{RemoteMethod, RpcRequest, RpcResponse};
    use crate::domain::broker_system_model::order::order::{OrderState, ResourceType, SystemUser};
    use crate::domain::broker_system_model::utils::id::{MemberId, OrderId};

    #[test]
    fn test_frames_survive_partial_reads() {
        let mut request = RpcRequest::new(RemoteMethod::DeleteOrder);
        request.order_id = Some(OrderId::new("o-1"));
        request.resource_type = Some(ResourceType::Compute);
        request.system_user = Some(SystemUser::new("u", "alice", "ldap"));
        request.new_state = Some(OrderState::Failed);
        let envelope = Envelope::request(MemberId::new("a"), MemberId::new("b"), request);

        let mut codec = EnvelopeCodec::new();
        let mut buffer = BytesMut::new();
        codec.encode(envelope.clone(), &mut buffer).unwrap();

        let mut partial = buffer.split_to(buffer.len() / 2);
        assert!(codec.decode(&mut partial).unwrap().is_none());
        partial.unsplit(buffer);
        assert_eq!(codec.decode(&mut partial).unwrap(), Some(envelope));
    }

    #[test]
    fn test_two_frames_in_one_buffer() {
        let first = Envelope::request(MemberId::new("a"), MemberId::new("b"), RpcRequest::new(RemoteMethod::GetCloudNames));
        let second = first.reply(RpcResponse::failed(WireError { condition: WireCondition::ItemNotFound, message: "gone".to_string() }));

        let mut codec = EnvelopeCodec::new();
        let mut buffer = BytesMut::new();
        codec.encode(first.clone(), &mut buffer).unwrap();
        codec.encode(second.clone(), &mut buffer).unwrap();

        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(first));
        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(second));
        assert!(codec.decode(&mut buffer).unwrap().is_none());
    }
}
