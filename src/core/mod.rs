pub mod error;
pub mod flat_record;
pub mod key;
pub mod record;
pub mod value;

pub use error::{EnvelopeError, Result};
pub use flat_record::{FlatMap, FlatRecord};
pub use key::KeyValue;
pub use record::KeyedRecord;
pub use value::AttributeValue;
