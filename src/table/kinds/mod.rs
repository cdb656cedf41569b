//! Table kinds
//!
//! One leaf kind owning rows and seven composites deriving theirs from
//! referenced handles.

pub mod concatenate;
pub mod container;
pub mod extension;
pub mod joined;
pub mod rearrange;
pub mod slice;
pub mod spec_replacer;
pub mod void;
pub mod wrapped;

pub use concatenate::{ConcatenateTable, DuplicateKeyPolicy};
pub use container::ContainerTable;
pub use extension::{
    ExtensionLoadContext, ExtensionLoader, ExtensionRegistry, ExtensionTable, ExtensionTableImpl,
};
pub use joined::JoinedTable;
pub use rearrange::{ColumnSource, RearrangeColumnsTable};
pub use slice::{RowSliceLoader, RowSliceTable};
pub use spec_replacer::TableSpecReplacerTable;
pub use void::VoidTable;
pub use wrapped::WrappedTable;
