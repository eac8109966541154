pub mod frame;
pub mod record;
pub mod request;

pub use frame::{NodeKey, NodeMap, Side, StructureFrame, StructurePoll, StructureResponse};
pub use record::{display_value, NodePage, NodePoll, NodeRecord, PropertyMap};
pub use request::DiffRequest;
