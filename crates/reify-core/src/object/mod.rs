//! Runtime object model
//!
//! Values, heap objects and their monitors.

pub mod array;
pub mod boxed;
pub mod element;
pub mod instance;
pub mod monitor;
pub mod string;
pub mod value;

pub use array::{ArrayStorage, HostArray};
pub use boxed::BoxedValue;
pub use element::ElementRef;
pub use instance::Instance;
pub use monitor::{Monitor, MonitorGuard, MonitorId};
pub use string::HostString;
pub use value::{ObjectRef, Primitive, StructValue, Value};
