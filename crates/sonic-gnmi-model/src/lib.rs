//! Shared data model and error taxonomy for the SONiC gNMI data-access
//! layer: the gNMI path grammar, the resolved `TablePath` address, the
//! `Value`/`TypedValue` payload carried through the subscription queue, the
//! `JsonDocument` checkpoint representation, and the `GnmiError` taxonomy
//! every other crate in this workspace returns.

pub mod error;
pub mod json_doc;
pub mod path;
pub mod value;

pub use error::{GnmiError, GnmiResult};
pub use json_doc::JsonDocument;
pub use path::{GnmiPath, PathElem, TablePath, TablePathOp};
pub use value::{TypedValue, Value};
