//! The tagged variant over HLA coordination messages carried by the framed
//! message layer (§3 "Message", §4.8). The *complete* field list for each
//! HLA RPC is an external artifact of the omitted federation core; this
//! enum carries the subset of fields the transport core itself must route,
//! name, or react to (join/resign federate identity, synchronization point
//! names, the fault text of a lost connection, ...). Opaque per-message
//! payload the transport never interprets, such as attribute values or
//! encoded logical times, travels as raw bytes.

use openrti_buffer::VariableLengthData;

pub type FederateHandle = u64;
pub type ObjectClassHandle = u64;
pub type InteractionClassHandle = u64;
pub type ObjectInstanceHandle = u64;

/// An opaque, federation-core-interpreted logical time. The core only ever
/// copies these bytes; arithmetic happens behind the logical-time factory
/// interface named in §1.
pub type EncodedLogicalTime = VariableLengthData;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    JoinFederationExecutionRequest {
        federate_name: String,
        federate_type: String,
        federation_name: String,
    },
    JoinFederationExecutionResponse {
        federate_handle: FederateHandle,
    },
    ResignFederationExecutionRequest {
        federate_handle: FederateHandle,
    },
    PublishObjectClass {
        federate_handle: FederateHandle,
        object_class_handle: ObjectClassHandle,
        attribute_handles: Vec<u64>,
    },
    SubscribeObjectClass {
        federate_handle: FederateHandle,
        object_class_handle: ObjectClassHandle,
        attribute_handles: Vec<u64>,
    },
    UpdateAttributeValues {
        object_instance_handle: ObjectInstanceHandle,
        attribute_values: Vec<(u64, VariableLengthData)>,
        time: Option<EncodedLogicalTime>,
    },
    SendInteraction {
        interaction_class_handle: InteractionClassHandle,
        parameter_values: Vec<(u64, VariableLengthData)>,
        time: Option<EncodedLogicalTime>,
    },
    TimeAdvanceRequest {
        federate_handle: FederateHandle,
        time: EncodedLogicalTime,
    },
    TimeAdvanceGrant {
        federate_handle: FederateHandle,
        time: EncodedLogicalTime,
    },
    RegisterFederationSynchronizationPoint {
        label: String,
        tag: VariableLengthData,
    },
    SynchronizationPointAchieved {
        federate_handle: FederateHandle,
        label: String,
    },
    FederationSynchronized {
        label: String,
    },
    AttributeOwnershipDivestitureNotification {
        object_instance_handle: ObjectInstanceHandle,
        attribute_handles: Vec<u64>,
    },
    AttributeOwnershipAcquisitionNotification {
        object_instance_handle: ObjectInstanceHandle,
        attribute_handles: Vec<u64>,
    },
    RequestFederationSave {
        label: String,
    },
    FederationSaved,
    RequestFederationRestore {
        label: String,
    },
    FederationRestored,
    /// Synthesized by the framed-message layer whenever the read side
    /// observes EOF or a parse error (§4.8, §7). Never sent on the wire by
    /// a peer; only injected locally into the server node.
    ConnectionLost {
        reason: String,
    },
}

impl Message {
    /// Stable small integer used as the wire tag. Values are assigned in
    /// declaration order and must never be renumbered once shipped; adding
    /// a new variant always appends.
    #[must_use]
    pub const fn tag(&self) -> u32 {
        match self {
            Self::JoinFederationExecutionRequest { .. } => 0,
            Self::JoinFederationExecutionResponse { .. } => 1,
            Self::ResignFederationExecutionRequest { .. } => 2,
            Self::PublishObjectClass { .. } => 3,
            Self::SubscribeObjectClass { .. } => 4,
            Self::UpdateAttributeValues { .. } => 5,
            Self::SendInteraction { .. } => 6,
            Self::TimeAdvanceRequest { .. } => 7,
            Self::TimeAdvanceGrant { .. } => 8,
            Self::RegisterFederationSynchronizationPoint { .. } => 9,
            Self::SynchronizationPointAchieved { .. } => 10,
            Self::FederationSynchronized { .. } => 11,
            Self::AttributeOwnershipDivestitureNotification { .. } => 12,
            Self::AttributeOwnershipAcquisitionNotification { .. } => 13,
            Self::RequestFederationSave { .. } => 14,
            Self::FederationSaved => 15,
            Self::RequestFederationRestore { .. } => 16,
            Self::FederationRestored => 17,
            Self::ConnectionLost { .. } => 18,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinFederationExecutionRequest { .. } => "JoinFederationExecutionRequest",
            Self::JoinFederationExecutionResponse { .. } => "JoinFederationExecutionResponse",
            Self::ResignFederationExecutionRequest { .. } => "ResignFederationExecutionRequest",
            Self::PublishObjectClass { .. } => "PublishObjectClass",
            Self::SubscribeObjectClass { .. } => "SubscribeObjectClass",
            Self::UpdateAttributeValues { .. } => "UpdateAttributeValues",
            Self::SendInteraction { .. } => "SendInteraction",
            Self::TimeAdvanceRequest { .. } => "TimeAdvanceRequest",
            Self::TimeAdvanceGrant { .. } => "TimeAdvanceGrant",
            Self::RegisterFederationSynchronizationPoint { .. } => {
                "RegisterFederationSynchronizationPoint"
            }
            Self::SynchronizationPointAchieved { .. } => "SynchronizationPointAchieved",
            Self::FederationSynchronized { .. } => "FederationSynchronized",
            Self::AttributeOwnershipDivestitureNotification { .. } => {
                "AttributeOwnershipDivestitureNotification"
            }
            Self::AttributeOwnershipAcquisitionNotification { .. } => {
                "AttributeOwnershipAcquisitionNotification"
            }
            Self::RequestFederationSave { .. } => "RequestFederationSave",
            Self::FederationSaved => "FederationSaved",
            Self::RequestFederationRestore { .. } => "RequestFederationRestore",
            Self::FederationRestored => "FederationRestored",
            Self::ConnectionLost { .. } => "ConnectionLost",
        }
    }
}
